//! Report data model shared by the testers, the scorer and the
//! persisted JSON format.

use serde::{Deserialize, Serialize};

/// One atomic measurement. Immutable once recorded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbeSample {
    /// Target identifier (host, URL or domain).
    pub target: String,
    /// Human label for the target.
    pub label: String,
    pub success: bool,
    /// Latency in ms, throughput in Mbps, or a resolved value count,
    /// depending on the test that recorded the sample.
    pub value: Option<f64>,
    pub recorded_at: String,
}

impl ProbeSample {
    pub fn new(target: &str, label: &str, success: bool, value: Option<f64>) -> Self {
        Self {
            target: target.to_string(),
            label: label.to_string(),
            success,
            value,
            recorded_at: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Latency statistics over one sampling pass (baseline or with-tunnel).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LatencyStats {
    /// Mean RTT over successful samples, ms.
    pub avg_ms: Option<f64>,
    /// Sample standard deviation of successful RTTs, ms. 0 when fewer
    /// than two samples succeeded.
    pub jitter_ms: f64,
    /// failed / attempted across all targets and samples, percent.
    pub loss_pct: f64,
    pub samples: Vec<ProbeSample>,
}

/// Aggregate captured with the tunnel assumed inactive. Read-only after
/// collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BaselineMetrics {
    pub latency: LatencyStats,
    /// Mean download speed over successful downloads, Mbps. None when
    /// nothing could be measured.
    pub throughput_mbps: Option<f64>,
    /// Tunnel-detection state at collection time, recorded as an
    /// annotation only; the collector does not enforce "no tunnel".
    pub tunnel_active_during_collection: bool,
    pub collected_at: String,
}

/// Categorical rating shared by the comparison and efficacy tiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rating {
    Excellent,
    Good,
    Acceptable,
    Moderate,
    Poor,
    Minimal,
    VeryPoor,
    Unstable,
    Disabled,
    Unknown,
}

impl std::fmt::Display for Rating {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Rating::Excellent => "excellent",
            Rating::Good => "good",
            Rating::Acceptable => "acceptable",
            Rating::Moderate => "moderate",
            Rating::Poor => "poor",
            Rating::Minimal => "minimal",
            Rating::VeryPoor => "very_poor",
            Rating::Unstable => "unstable",
            Rating::Disabled => "disabled",
            Rating::Unknown => "unknown",
        };
        write!(f, "{}", s)
    }
}

/// With-tunnel metric compared against its baseline counterpart.
///
/// When the baseline denominator is zero or missing the percentage
/// fields are 0 and the rating is `unknown`; a comparison against
/// nothing must never manufacture an extreme number.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComparisonResult {
    pub baseline: Option<f64>,
    pub current: Option<f64>,
    pub diff: f64,
    pub change_pct: f64,
    pub rating: Rating,
}

/// Which leak probe produced a finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeakKind {
    Dns,
    Ipv6,
}

/// Severity tiers for leak findings. `Potential` and `Confirmed` are
/// only produced by the IPv6 detector's route-attribution rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeakSeverity {
    None,
    Minor,
    Major,
    Critical,
    Potential,
    Confirmed,
}

impl std::fmt::Display for LeakSeverity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            LeakSeverity::None => "none",
            LeakSeverity::Minor => "minor",
            LeakSeverity::Major => "major",
            LeakSeverity::Critical => "critical",
            LeakSeverity::Potential => "potential",
            LeakSeverity::Confirmed => "confirmed",
        };
        write!(f, "{}", s)
    }
}

/// One leak test's outcome for a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeakFinding {
    pub kind: LeakKind,
    pub detected: bool,
    pub severity: LeakSeverity,
    /// Unexpected resolvers (DNS) or leaking addresses/routes (IPv6).
    pub unexpected: Vec<String>,
    pub recommendation: String,
    /// Optional reason for degraded confidence.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl LeakFinding {
    pub fn clean(kind: LeakKind, recommendation: &str) -> Self {
        Self {
            kind,
            detected: false,
            severity: LeakSeverity::None,
            unexpected: Vec::new(),
            recommendation: recommendation.to_string(),
            note: None,
        }
    }
}

/// Ad/tracker DNS-blocking efficacy counts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlockingFinding {
    pub ads_blocked: u32,
    pub ads_total: u32,
    pub trackers_blocked: u32,
    pub trackers_total: u32,
    /// Domains that resolved to real addresses (leaked through).
    pub leaked_domains: Vec<String>,
    /// Control domains that still resolve. Low values flag
    /// over-blocking; diagnostic only, never folded into the score.
    pub control_accessible: u32,
    pub control_total: u32,
    /// Blocked percentage over both categories, excluding unmeasured
    /// domains.
    pub blocked_pct: f64,
    pub rating: Rating,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

/// One connectivity check inside a stability window.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StabilityCheck {
    pub at: String,
    pub interface_present: bool,
    pub reachable: bool,
    pub connected: bool,
}

/// Ordered connectivity checks over the monitoring window, plus the
/// derived transition counts. Mutated incrementally during the loop,
/// frozen at window end.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StabilityWindow {
    pub checks: Vec<StabilityCheck>,
    /// active -> inactive transitions.
    pub drops: u32,
    /// inactive -> active transitions. May differ from `drops` when the
    /// window starts or ends mid-drop.
    pub reconnections: u32,
    pub reconnect_secs: Vec<f64>,
    pub uptime_pct: f64,
    pub rating: Rating,
}

/// Verdict over the weighted overall score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Verdict {
    Pass,
    Fail,
}

/// Per-category sub-scores. `None` means the test did not run and the
/// category is excluded from the weighted mean entirely.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct SubScores {
    pub latency: Option<f64>,
    pub throughput: Option<f64>,
    pub dns_leak: Option<f64>,
    pub ipv6_leak: Option<f64>,
    pub ad_blocking: Option<f64>,
    pub stability: Option<f64>,
}

/// Final scoring output. Always the last entity constructed in a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoreReport {
    pub sub_scores: SubScores,
    pub weights: crate::config::ScoreWeights,
    pub overall: f64,
    pub pass_threshold: f64,
    pub verdict: Verdict,
}

/// Tunnel-detection metadata attached to a run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TunnelDetection {
    pub active: bool,
    pub interface: Option<String>,
    pub address: Option<String>,
    /// Which detection strategy produced the result.
    pub method: Option<String>,
}

/// Top-level run aggregate; the unit of persistence. Immutable once
/// written to the history log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub schema_version: u32,
    pub run_id: String,
    pub generated_at: String,
    pub tunnel: TunnelDetection,
    pub baseline: Option<BaselineMetrics>,
    pub latency: Option<LatencyStats>,
    pub latency_comparison: ComparisonResult,
    pub throughput_mbps: Option<f64>,
    pub throughput_comparison: ComparisonResult,
    pub dns_leak: LeakFinding,
    pub ipv6_leak: LeakFinding,
    pub ad_blocking: Option<BlockingFinding>,
    pub stability: Option<StabilityWindow>,
    pub score: ScoreReport,
    /// Degradation notes accumulated across stages (probe failures,
    /// persistence problems). Visible in the output, never fatal.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

pub const REPORT_SCHEMA_VERSION: u32 = 1;
