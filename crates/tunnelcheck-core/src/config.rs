//! Engine configuration. All components receive their configuration
//! explicitly; nothing reads ambient global state.

use crate::errors::EngineError;
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const SUPPORTED_CONFIG_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LatencyTarget {
    pub host: String,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DownloadUrl {
    pub url: String,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LatencyConfig {
    pub targets: Vec<LatencyTarget>,
    /// Round-trip samples per target.
    pub count: u32,
    /// Per-ping timeout, seconds.
    pub timeout_secs: u64,
}

impl Default for LatencyConfig {
    fn default() -> Self {
        Self {
            targets: vec![
                LatencyTarget {
                    host: "1.1.1.1".into(),
                    name: "Cloudflare".into(),
                },
                LatencyTarget {
                    host: "8.8.8.8".into(),
                    name: "Google".into(),
                },
                LatencyTarget {
                    host: "9.9.9.9".into(),
                    name: "Quad9".into(),
                },
            ],
            count: 5,
            timeout_secs: 2,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ThroughputConfig {
    pub download_urls: Vec<DownloadUrl>,
    /// Per-download timeout, seconds.
    pub timeout_secs: u64,
}

impl Default for ThroughputConfig {
    fn default() -> Self {
        Self {
            download_urls: vec![DownloadUrl {
                url: "https://speed.cloudflare.com/__down?bytes=10000000".into(),
                name: "Cloudflare 10MB".into(),
            }],
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DnsConfig {
    /// Resolvers the tunnel is expected to use (internal/DoH).
    /// Discovered resolvers outside this list count as unexpected.
    pub expected_resolvers: Vec<String>,
    pub control_domains: Vec<String>,
}

impl Default for DnsConfig {
    fn default() -> Self {
        Self {
            expected_resolvers: Vec::new(),
            control_domains: vec![
                "example.com".into(),
                "wikipedia.org".into(),
                "cloudflare.com".into(),
            ],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StabilityConfig {
    pub duration_secs: u64,
    pub check_interval_secs: u64,
}

impl Default for StabilityConfig {
    fn default() -> Self {
        Self {
            duration_secs: 30,
            check_interval_secs: 2,
        }
    }
}

/// Weights applied to the per-category sub-scores. Categories whose
/// test did not run are excluded from both numerator and denominator.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoreWeights {
    pub latency: f64,
    pub throughput: f64,
    pub dns_leak: f64,
    pub ipv6_leak: f64,
    pub ad_blocking: f64,
    pub stability: f64,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            latency: 25.0,
            throughput: 25.0,
            dns_leak: 20.0,
            ipv6_leak: 10.0,
            ad_blocking: 10.0,
            stability: 10.0,
        }
    }
}

impl ScoreWeights {
    pub fn sum(&self) -> f64 {
        self.latency
            + self.throughput
            + self.dns_leak
            + self.ipv6_leak
            + self.ad_blocking
            + self.stability
    }

    pub fn any_negative(&self) -> bool {
        [
            self.latency,
            self.throughput,
            self.dns_leak,
            self.ipv6_leak,
            self.ad_blocking,
            self.stability,
        ]
        .iter()
        .any(|w| *w < 0.0)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    pub weights: ScoreWeights,
    pub pass_threshold: f64,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            weights: ScoreWeights::default(),
            pass_threshold: 70.0,
        }
    }
}

/// Advisory per-test thresholds, surfaced as annotations in the report.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Thresholds {
    /// Max acceptable latency increase over baseline, percent.
    pub max_latency_increase_pct: f64,
    /// Minimum throughput retention, percent of baseline.
    pub min_throughput_retention_pct: f64,
    /// Max tolerable tunnel drops in the stability window.
    pub max_tunnel_drops: u32,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            max_latency_increase_pct: 50.0,
            min_throughput_retention_pct: 60.0,
            max_tunnel_drops: 2,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub version: u32,
    pub latency: LatencyConfig,
    pub throughput: ThroughputConfig,
    pub dns: DnsConfig,
    pub stability: StabilityConfig,
    pub scoring: ScoringConfig,
    pub thresholds: Thresholds,
}

impl EngineConfig {
    /// Validates before any measurement begins. A bad configuration is
    /// the only condition that aborts a run up front.
    pub fn validate(&self) -> Result<(), EngineError> {
        if self.latency.targets.is_empty() {
            return Err(EngineError::Config("no latency targets configured".into()));
        }
        if self.latency.count == 0 {
            return Err(EngineError::Config("latency.count must be at least 1".into()));
        }
        if self.scoring.weights.any_negative() {
            return Err(EngineError::Config("scoring weights must be non-negative".into()));
        }
        if self.scoring.weights.sum() <= 0.0 {
            return Err(EngineError::Config("scoring weights sum to zero".into()));
        }
        if !(0.0..=100.0).contains(&self.scoring.pass_threshold) {
            return Err(EngineError::Config(format!(
                "pass_threshold {} outside [0,100]",
                self.scoring.pass_threshold
            )));
        }
        if self.stability.duration_secs > 0 && self.stability.check_interval_secs == 0 {
            return Err(EngineError::Config(
                "stability.check_interval_secs must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

pub fn load_config(path: &Path) -> Result<EngineConfig, EngineError> {
    let raw = std::fs::read_to_string(path).map_err(|e| {
        EngineError::Config(format!("failed to read config {}: {}", path.display(), e))
    })?;
    let cfg: EngineConfig = serde_yaml::from_str(&raw)
        .map_err(|e| EngineError::Config(format!("failed to parse YAML: {}", e)))?;
    if cfg.version != 0 && cfg.version != SUPPORTED_CONFIG_VERSION {
        return Err(EngineError::Config(format!(
            "unsupported config version {} (supported: {})",
            cfg.version, SUPPORTED_CONFIG_VERSION
        )));
    }
    cfg.validate()?;
    Ok(cfg)
}

pub const SAMPLE_CONFIG: &str = r#"# tunnelcheck configuration
version: 1

latency:
  targets:
    - host: 1.1.1.1
      name: Cloudflare
    - host: 8.8.8.8
      name: Google
    - host: 9.9.9.9
      name: Quad9
  count: 5
  timeout_secs: 2

throughput:
  download_urls:
    - url: https://speed.cloudflare.com/__down?bytes=10000000
      name: Cloudflare 10MB
  timeout_secs: 30

dns:
  # Resolvers your VPN is supposed to use. Anything else discovered on
  # the system counts as an unexpected resolver.
  expected_resolvers: []
  control_domains: [example.com, wikipedia.org, cloudflare.com]

stability:
  duration_secs: 30
  check_interval_secs: 2

scoring:
  weights:
    latency: 25
    throughput: 25
    dns_leak: 20
    ipv6_leak: 10
    ad_blocking: 10
    stability: 10
  pass_threshold: 70

thresholds:
  max_latency_increase_pct: 50
  min_throughput_retention_pct: 60
  max_tunnel_drops: 2
"#;

pub fn write_sample_config(path: &Path) -> Result<(), EngineError> {
    std::fs::write(path, SAMPLE_CONFIG)
        .map_err(|e| EngineError::Config(format!("failed to write sample config: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        EngineConfig::default().validate().expect("defaults valid");
    }

    #[test]
    fn sample_config_parses_and_validates() {
        let cfg: EngineConfig = serde_yaml::from_str(SAMPLE_CONFIG).expect("sample parses");
        cfg.validate().expect("sample valid");
        assert_eq!(cfg.latency.targets.len(), 3);
        assert_eq!(cfg.scoring.pass_threshold, 70.0);
    }

    #[test]
    fn empty_targets_rejected() {
        let mut cfg = EngineConfig::default();
        cfg.latency.targets.clear();
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn zero_weight_sum_rejected() {
        let mut cfg = EngineConfig::default();
        cfg.scoring.weights = ScoreWeights {
            latency: 0.0,
            throughput: 0.0,
            dns_leak: 0.0,
            ipv6_leak: 0.0,
            ad_blocking: 0.0,
            stability: 0.0,
        };
        assert!(cfg.validate().is_err());
    }
}
