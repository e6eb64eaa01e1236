use thiserror::Error;

/// Fatal engine errors. Probe failures and detection ambiguity are data
/// outcomes carried inside findings, never variants here.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Invalid or unusable configuration. Raised before any measurement
    /// begins; no partial report is persisted.
    #[error("config error: {0}")]
    Config(String),

    /// Report could not be written. The in-memory report is still
    /// returned to the caller.
    #[error("persistence error: {0}")]
    Persistence(String),
}
