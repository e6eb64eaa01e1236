//! Report persistence: a fixed "latest" snapshot plus a timestamped
//! history entry per run. Consumers read `latest.json` for current
//! status and the history files for trends.

use crate::errors::EngineError;
use crate::model::RunReport;
use std::path::{Path, PathBuf};
use tracing::info;

pub const LATEST_FILE: &str = "latest.json";

/// Writes the report to `<dir>/latest.json` and a history file named
/// after the run's UTC timestamp. Concurrent runs may race on the
/// latest pointer; last writer wins, while each run's history entry
/// stays independently preserved.
pub fn write_reports(dir: &Path, report: &RunReport) -> Result<(PathBuf, PathBuf), EngineError> {
    std::fs::create_dir_all(dir)
        .map_err(|e| EngineError::Persistence(format!("create {}: {}", dir.display(), e)))?;

    let body = serde_json::to_string_pretty(report)
        .map_err(|e| EngineError::Persistence(format!("serialize report: {}", e)))?;

    let stamp = chrono::Utc::now().format("%Y%m%dT%H%M%SZ");
    let history = dir.join(format!("report-{}-{}.json", stamp, &report.run_id[..8]));
    std::fs::write(&history, &body)
        .map_err(|e| EngineError::Persistence(format!("write {}: {}", history.display(), e)))?;

    let latest = dir.join(LATEST_FILE);
    std::fs::write(&latest, &body)
        .map_err(|e| EngineError::Persistence(format!("write {}: {}", latest.display(), e)))?;

    info!(latest = %latest.display(), history = %history.display(), "report persisted");
    Ok((latest, history))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ScoreWeights;
    use crate::model::*;

    fn minimal_report() -> RunReport {
        let unknown = ComparisonResult {
            baseline: None,
            current: None,
            diff: 0.0,
            change_pct: 0.0,
            rating: Rating::Unknown,
        };
        RunReport {
            schema_version: REPORT_SCHEMA_VERSION,
            run_id: uuid::Uuid::new_v4().to_string(),
            generated_at: chrono::Utc::now().to_rfc3339(),
            tunnel: TunnelDetection::default(),
            baseline: None,
            latency: None,
            latency_comparison: unknown.clone(),
            throughput_mbps: None,
            throughput_comparison: unknown,
            dns_leak: LeakFinding::clean(LeakKind::Dns, "n/a"),
            ipv6_leak: LeakFinding::clean(LeakKind::Ipv6, "n/a"),
            ad_blocking: None,
            stability: None,
            score: ScoreReport {
                sub_scores: SubScores::default(),
                weights: ScoreWeights::default(),
                overall: 0.0,
                pass_threshold: 70.0,
                verdict: Verdict::Fail,
            },
            warnings: Vec::new(),
        }
    }

    #[test]
    fn writes_latest_and_history() {
        let dir = tempfile::tempdir().expect("tempdir");
        let report = minimal_report();
        let (latest, history) = write_reports(dir.path(), &report).expect("persist");
        assert!(latest.ends_with(LATEST_FILE));
        assert!(latest.exists());
        assert!(history.exists());

        let raw = std::fs::read_to_string(&latest).expect("read latest");
        let loaded: RunReport = serde_json::from_str(&raw).expect("round trip");
        assert_eq!(loaded.run_id, report.run_id);
        assert_eq!(loaded.schema_version, REPORT_SCHEMA_VERSION);
    }

    #[test]
    fn latest_is_superseded_history_is_kept() {
        let dir = tempfile::tempdir().expect("tempdir");
        let first = minimal_report();
        let second = minimal_report();
        let (_, h1) = write_reports(dir.path(), &first).expect("persist first");
        let (latest, h2) = write_reports(dir.path(), &second).expect("persist second");

        assert!(h1.exists());
        assert!(h2.exists());
        let raw = std::fs::read_to_string(latest).expect("read latest");
        let loaded: RunReport = serde_json::from_str(&raw).expect("parse");
        assert_eq!(loaded.run_id, second.run_id);
    }
}
