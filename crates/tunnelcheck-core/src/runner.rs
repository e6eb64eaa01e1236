//! Run orchestration: detect -> baseline -> latency -> throughput ->
//! leak tests -> stability -> score -> persist.
//!
//! Stages degrade gracefully: a failed probe or an ambiguous detection
//! shrinks that stage's contribution to "unknown" instead of aborting.
//! Only a configuration error aborts, and it does so before any
//! measurement begins.

use crate::config::EngineConfig;
use crate::errors::EngineError;
use crate::leak::{adblock, dns, ipv6};
use crate::measure;
use crate::model::{
    ComparisonResult, Rating, RunReport, StabilityWindow, SubScores, REPORT_SCHEMA_VERSION,
};
use crate::report::write_reports;
use crate::scoring;
use crate::{detect, stability};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, warn};

/// Per-run options supplied by the caller (CLI flags).
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Skip baseline collection; latency/throughput comparisons report
    /// "unknown" and are excluded from the score.
    pub skip_baseline: bool,
    /// Overrides `stability.duration_secs`. Zero disables monitoring.
    pub stability_duration: Option<Duration>,
    /// Directory for latest.json and the history entries. None skips
    /// persistence.
    pub output_dir: Option<PathBuf>,
}

pub struct Runner {
    config: EngineConfig,
}

impl Runner {
    /// Validates the configuration up front; a bad config never starts
    /// a measurement.
    pub fn new(config: EngineConfig) -> Result<Self, EngineError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Executes all configured stages sequentially and returns the
    /// best-effort report. Persistence failure is downgraded to a
    /// warning carried inside the report.
    pub async fn run(&self, opts: &RunOptions) -> RunReport {
        let cfg = &self.config;
        let latency_timeout = Duration::from_secs(cfg.latency.timeout_secs);
        let mut warnings = Vec::new();

        let tunnel = detect::detect_tunnel().await;
        match &tunnel.interface {
            Some(ifc) => info!(interface = %ifc, "tunnel detected"),
            None => info!("no tunnel detected"),
        }

        // Baseline (assumes the tunnel is inactive; recorded, not
        // enforced).
        let baseline = if opts.skip_baseline {
            info!("baseline collection skipped");
            None
        } else {
            if tunnel.active {
                warnings.push(
                    "baseline collected while a tunnel was active; comparisons may understate the tunnel's cost"
                        .to_string(),
                );
            }
            Some(
                measure::collect_baseline(
                    &cfg.latency.targets,
                    cfg.latency.count,
                    latency_timeout,
                    &cfg.throughput,
                    tunnel.active,
                )
                .await,
            )
        };

        // With-tunnel measurements.
        let latency =
            measure::collect_latency(&cfg.latency.targets, cfg.latency.count, latency_timeout)
                .await;
        let latency_comparison = measure::compare_latency(
            baseline.as_ref().and_then(|b| b.latency.avg_ms),
            latency.avg_ms,
        );

        let (throughput_mbps, _) = measure::collect_throughput(&cfg.throughput).await;
        let throughput_comparison = measure::compare_throughput(
            baseline.as_ref().and_then(|b| b.throughput_mbps),
            throughput_mbps,
        );

        // Leak and efficacy probes.
        let dns_leak = dns::detect_dns_leaks(&cfg.dns, &tunnel).await;
        let ipv6_leak = ipv6::detect_ipv6_leaks(&tunnel).await;
        let ad_blocking = adblock::test_blocking(&cfg.dns, &tunnel).await;

        // Stability window.
        let stability_cfg = {
            let mut s = cfg.stability.clone();
            if let Some(d) = opts.stability_duration {
                s.duration_secs = d.as_secs();
            }
            s
        };
        let stability = if stability_cfg.duration_secs == 0 {
            info!("stability monitoring disabled");
            None
        } else {
            Some(stability::monitor(&stability_cfg, tunnel.interface.as_deref()).await)
        };

        // Scoring.
        let sub_scores = SubScores {
            latency: scoring::comparison_score(latency_comparison.rating),
            throughput: scoring::comparison_score(throughput_comparison.rating),
            dns_leak: Some(scoring::dns_leak_score(dns_leak.severity)),
            ipv6_leak: Some(scoring::ipv6_leak_score(ipv6_leak.severity)),
            // Without a tunnel the blocking test never ran; only then is
            // the category excluded. A measured 0% blocked scores low.
            ad_blocking: if tunnel.active {
                scoring::blocking_score(ad_blocking.rating)
            } else {
                None
            },
            stability: stability
                .as_ref()
                .and_then(|w| scoring::stability_score(w.rating)),
        };
        let score = scoring::score(
            sub_scores,
            cfg.scoring.weights,
            cfg.scoring.pass_threshold,
        );
        info!(overall = score.overall, verdict = ?score.verdict, "run scored");

        if latency_comparison.rating == Rating::Unknown {
            warnings.push("latency comparison is unknown (no baseline or no samples)".to_string());
        }
        if throughput_comparison.rating == Rating::Unknown {
            warnings
                .push("throughput comparison is unknown (no baseline or no downloads)".to_string());
        }
        annotate_thresholds(
            cfg,
            &latency_comparison,
            &throughput_comparison,
            stability.as_ref(),
            &mut warnings,
        );

        let mut report = RunReport {
            schema_version: REPORT_SCHEMA_VERSION,
            run_id: uuid::Uuid::new_v4().to_string(),
            generated_at: chrono::Utc::now().to_rfc3339(),
            tunnel,
            baseline,
            latency: Some(latency),
            latency_comparison,
            throughput_mbps,
            throughput_comparison,
            dns_leak,
            ipv6_leak,
            ad_blocking: Some(ad_blocking),
            stability,
            score,
            warnings,
        };

        if let Some(dir) = &opts.output_dir {
            if let Err(e) = write_reports(dir, &report) {
                // The in-memory report is still returned; losing the
                // trend history is loud, not fatal.
                warn!(error = %e, "failed to persist report");
                report.warnings.push(format!("report not persisted: {}", e));
            }
        }

        report
    }
}

/// Surfaces configured per-test thresholds as warnings when exceeded.
fn annotate_thresholds(
    cfg: &EngineConfig,
    latency: &ComparisonResult,
    throughput: &ComparisonResult,
    stability: Option<&StabilityWindow>,
    warnings: &mut Vec<String>,
) {
    if latency.rating != Rating::Unknown && latency.change_pct > cfg.thresholds.max_latency_increase_pct
    {
        warnings.push(format!(
            "latency increased {:.1}%, above the configured {:.0}% limit",
            latency.change_pct, cfg.thresholds.max_latency_increase_pct
        ));
    }
    if throughput.rating != Rating::Unknown {
        let retained = throughput.change_pct + 100.0;
        if retained < cfg.thresholds.min_throughput_retention_pct {
            warnings.push(format!(
                "throughput retained {:.1}%, below the configured {:.0}% minimum",
                retained, cfg.thresholds.min_throughput_retention_pct
            ));
        }
    }
    if let Some(window) = stability {
        if window.drops > cfg.thresholds.max_tunnel_drops {
            warnings.push(format!(
                "tunnel dropped {} times, above the configured limit of {}",
                window.drops, cfg.thresholds.max_tunnel_drops
            ));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bad_config_never_builds_a_runner() {
        let mut cfg = EngineConfig::default();
        cfg.latency.targets.clear();
        assert!(matches!(Runner::new(cfg), Err(EngineError::Config(_))));
    }

    fn window_with_drops(drops: u32) -> StabilityWindow {
        StabilityWindow {
            checks: Vec::new(),
            drops,
            reconnections: drops,
            reconnect_secs: Vec::new(),
            uptime_pct: 80.0,
            rating: Rating::Poor,
        }
    }

    #[test]
    fn threshold_annotations() {
        let cfg = EngineConfig::default();
        let mut warnings = Vec::new();
        let bad_latency = measure::compare_latency(Some(20.0), Some(45.0)); // +125%
        let bad_throughput = measure::compare_throughput(Some(100.0), Some(30.0)); // 30% retained
        let shaky = window_with_drops(cfg.thresholds.max_tunnel_drops + 1);
        annotate_thresholds(&cfg, &bad_latency, &bad_throughput, Some(&shaky), &mut warnings);
        assert_eq!(warnings.len(), 3);
        assert!(warnings.iter().any(|w| w.contains("tunnel dropped")));

        warnings.clear();
        let ok_latency = measure::compare_latency(Some(20.0), Some(22.0));
        let ok_throughput = measure::compare_throughput(Some(100.0), Some(95.0));
        let steady = window_with_drops(cfg.thresholds.max_tunnel_drops);
        annotate_thresholds(&cfg, &ok_latency, &ok_throughput, Some(&steady), &mut warnings);
        assert!(warnings.is_empty());

        // No window ran: nothing to annotate.
        annotate_thresholds(&cfg, &ok_latency, &ok_throughput, None, &mut warnings);
        assert!(warnings.is_empty());
    }
}
