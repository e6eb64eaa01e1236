//! Latency, jitter and throughput sampling, plus the tiered
//! baseline-versus-tunnel comparisons.

use crate::config::{DownloadUrl, LatencyTarget, ThroughputConfig};
use crate::model::{BaselineMetrics, ComparisonResult, LatencyStats, ProbeSample, Rating};
use crate::probe::{ping_once, run_probe, ProbeSpec};
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Ordered comparison tiers for latency increase, percent over
/// baseline. Evaluated top-down; first threshold the value fits under
/// wins.
pub const LATENCY_TIERS: &[(f64, Rating)] = &[
    (10.0, Rating::Excellent),
    (25.0, Rating::Good),
    (50.0, Rating::Acceptable),
    (100.0, Rating::Poor),
];

/// Ordered tiers for throughput retained, percent of baseline.
pub const THROUGHPUT_TIERS: &[(f64, Rating)] = &[
    (90.0, Rating::Excellent),
    (75.0, Rating::Good),
    (60.0, Rating::Acceptable),
    (40.0, Rating::Poor),
];

/// Sample standard deviation; 0 with fewer than two values.
pub fn sample_std_dev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0);
    variance.sqrt()
}

/// Takes `count` RTT samples per target. Failed pings count toward the
/// loss percentage but contribute nothing to the mean or the jitter.
pub async fn collect_latency(
    targets: &[LatencyTarget],
    count: u32,
    timeout: Duration,
) -> LatencyStats {
    let mut samples = Vec::new();
    let mut successful = Vec::new();
    let mut attempted = 0u32;
    let mut failed = 0u32;

    for target in targets {
        for _ in 0..count {
            attempted += 1;
            let rtt = ping_once(&target.host, timeout).await;
            match rtt {
                Some(ms) => successful.push(ms),
                None => failed += 1,
            }
            samples.push(ProbeSample::new(&target.host, &target.name, rtt.is_some(), rtt));
        }
    }

    let avg_ms = if successful.is_empty() {
        None
    } else {
        Some(successful.iter().sum::<f64>() / successful.len() as f64)
    };
    let stats = LatencyStats {
        avg_ms,
        jitter_ms: sample_std_dev(&successful),
        loss_pct: if attempted == 0 {
            0.0
        } else {
            failed as f64 / attempted as f64 * 100.0
        },
        samples,
    };
    info!(
        avg_ms = ?stats.avg_ms,
        jitter_ms = stats.jitter_ms,
        loss_pct = stats.loss_pct,
        "latency sampling done"
    );
    stats
}

/// Downloads one URL and returns the measured speed in Mbps. Tries
/// curl through the probe adapter first; falls back to a measured
/// reqwest GET when curl is unavailable.
async fn download_speed(url: &DownloadUrl, timeout: Duration) -> Option<f64> {
    let max_time = timeout.as_secs().max(1).to_string();
    let spec = ProbeSpec::new(
        "curl",
        &[
            "-s",
            "-o",
            "/dev/null",
            "-w",
            "%{size_download}",
            "--max-time",
            &max_time,
            &url.url,
        ],
        timeout + Duration::from_secs(2),
    );
    let start = Instant::now();
    let out = run_probe(&spec).await;
    if out.failure.is_none() {
        if !out.succeeded {
            return None;
        }
        let bytes: f64 = out.stdout.trim().parse().ok()?;
        return mbps(bytes, start.elapsed());
    }

    debug!(url = %url.url, "curl unavailable, falling back to http client");
    let client = reqwest::Client::builder().timeout(timeout).build().ok()?;
    let start = Instant::now();
    let resp = client.get(&url.url).send().await.ok()?;
    if !resp.status().is_success() {
        return None;
    }
    let body = resp.bytes().await.ok()?;
    mbps(body.len() as f64, start.elapsed())
}

fn mbps(bytes: f64, elapsed: Duration) -> Option<f64> {
    let secs = elapsed.as_secs_f64();
    if bytes <= 0.0 || secs <= 0.0 {
        return None;
    }
    Some(bytes * 8.0 / secs / 1_000_000.0)
}

/// Mean download speed over successful downloads. A failed download is
/// excluded from the mean rather than counted as zero, so "could not
/// measure" never masquerades as "measured zero".
pub async fn collect_throughput(cfg: &ThroughputConfig) -> (Option<f64>, Vec<ProbeSample>) {
    let timeout = Duration::from_secs(cfg.timeout_secs);
    let mut speeds = Vec::new();
    let mut samples = Vec::new();
    for url in &cfg.download_urls {
        let speed = download_speed(url, timeout).await;
        if let Some(mbps) = speed {
            speeds.push(mbps);
        }
        samples.push(ProbeSample::new(&url.url, &url.name, speed.is_some(), speed));
    }
    let mean = if speeds.is_empty() {
        None
    } else {
        Some(speeds.iter().sum::<f64>() / speeds.len() as f64)
    };
    info!(throughput_mbps = ?mean, urls = cfg.download_urls.len(), "throughput sampling done");
    (mean, samples)
}

/// Collects the no-tunnel reference measurements. The caller is
/// responsible for the tunnel actually being down; the detection state
/// is recorded as an annotation only.
pub async fn collect_baseline(
    latency_targets: &[LatencyTarget],
    count: u32,
    latency_timeout: Duration,
    throughput: &ThroughputConfig,
    tunnel_active: bool,
) -> BaselineMetrics {
    let latency = collect_latency(latency_targets, count, latency_timeout).await;
    let (throughput_mbps, _) = collect_throughput(throughput).await;
    BaselineMetrics {
        latency,
        throughput_mbps,
        tunnel_active_during_collection: tunnel_active,
        collected_at: chrono::Utc::now().to_rfc3339(),
    }
}

fn unknown_comparison(baseline: Option<f64>, current: Option<f64>) -> ComparisonResult {
    ComparisonResult {
        baseline,
        current,
        diff: 0.0,
        change_pct: 0.0,
        rating: Rating::Unknown,
    }
}

/// Rates a with-tunnel latency against the baseline. Higher is worse.
pub fn compare_latency(baseline: Option<f64>, current: Option<f64>) -> ComparisonResult {
    let (Some(base), Some(cur)) = (baseline, current) else {
        return unknown_comparison(baseline, current);
    };
    if base <= 0.0 {
        return unknown_comparison(baseline, current);
    }
    let diff = cur - base;
    let change_pct = diff / base * 100.0;
    let rating = LATENCY_TIERS
        .iter()
        .find(|(limit, _)| change_pct <= *limit)
        .map(|(_, r)| *r)
        .unwrap_or(Rating::VeryPoor);
    ComparisonResult {
        baseline,
        current,
        diff,
        change_pct,
        rating,
    }
}

/// Rates a with-tunnel throughput against the baseline. Rating is on
/// the percentage retained; the reported change is signed.
pub fn compare_throughput(baseline: Option<f64>, current: Option<f64>) -> ComparisonResult {
    let (Some(base), Some(cur)) = (baseline, current) else {
        return unknown_comparison(baseline, current);
    };
    if base <= 0.0 {
        return unknown_comparison(baseline, current);
    }
    let retained_pct = cur / base * 100.0;
    let rating = THROUGHPUT_TIERS
        .iter()
        .find(|(floor, _)| retained_pct >= *floor)
        .map(|(_, r)| *r)
        .unwrap_or(Rating::VeryPoor);
    ComparisonResult {
        baseline,
        current,
        diff: cur - base,
        change_pct: retained_pct - 100.0,
        rating,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn jitter_zero_for_identical_rtts() {
        assert_eq!(sample_std_dev(&[20.0, 20.0, 20.0]), 0.0);
    }

    #[test]
    fn jitter_zero_below_two_samples() {
        assert_eq!(sample_std_dev(&[]), 0.0);
        assert_eq!(sample_std_dev(&[42.0]), 0.0);
    }

    #[test]
    fn jitter_is_sample_std_dev() {
        // Sample (n-1) standard deviation of [10, 20] is sqrt(50).
        let j = sample_std_dev(&[10.0, 20.0]);
        assert!((j - 50.0f64.sqrt()).abs() < 1e-9);
        assert!(j >= 0.0);
    }

    #[test]
    fn latency_tier_boundaries() {
        assert_eq!(compare_latency(Some(20.0), Some(22.0)).rating, Rating::Excellent); // +10%
        assert_eq!(compare_latency(Some(20.0), Some(25.0)).rating, Rating::Good); // +25%
        assert_eq!(compare_latency(Some(20.0), Some(30.0)).rating, Rating::Acceptable); // +50%
        assert_eq!(compare_latency(Some(20.0), Some(40.0)).rating, Rating::Poor); // +100%
        assert_eq!(compare_latency(Some(20.0), Some(41.0)).rating, Rating::VeryPoor);
        // Decreases are also excellent.
        assert_eq!(compare_latency(Some(20.0), Some(15.0)).rating, Rating::Excellent);
    }

    #[test]
    fn throughput_tier_boundaries() {
        assert_eq!(compare_throughput(Some(100.0), Some(95.0)).rating, Rating::Excellent);
        assert_eq!(compare_throughput(Some(100.0), Some(90.0)).rating, Rating::Excellent);
        assert_eq!(compare_throughput(Some(100.0), Some(75.0)).rating, Rating::Good);
        assert_eq!(compare_throughput(Some(100.0), Some(60.0)).rating, Rating::Acceptable);
        assert_eq!(compare_throughput(Some(100.0), Some(40.0)).rating, Rating::Poor);
        assert_eq!(compare_throughput(Some(100.0), Some(39.0)).rating, Rating::VeryPoor);
    }

    #[test]
    fn zero_or_missing_baseline_is_unknown_not_a_fault() {
        for cmp in [
            compare_latency(Some(0.0), Some(30.0)),
            compare_latency(None, Some(30.0)),
            compare_latency(Some(20.0), None),
            compare_throughput(Some(0.0), Some(50.0)),
            compare_throughput(None, None),
        ] {
            assert_eq!(cmp.rating, Rating::Unknown);
            assert_eq!(cmp.change_pct, 0.0);
            assert_eq!(cmp.diff, 0.0);
        }
    }

    #[test]
    fn mbps_conversion() {
        // 1 MB in one second is 8 Mbps.
        let v = mbps(1_000_000.0, Duration::from_secs(1)).expect("speed");
        assert!((v - 8.0).abs() < 1e-9);
        assert!(mbps(0.0, Duration::from_secs(1)).is_none());
    }
}
