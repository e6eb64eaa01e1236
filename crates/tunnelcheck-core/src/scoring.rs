//! Scoring: maps each category's categorical result onto a 0–100
//! sub-score, then reduces the sub-scores to a weighted overall score
//! and a PASS/FAIL verdict. Pure functions throughout; re-scoring the
//! same inputs yields the same report.

use crate::config::ScoreWeights;
use crate::model::{
    LeakSeverity, Rating, ScoreReport, SubScores, Verdict,
};

fn clamp_score(v: f64) -> f64 {
    v.clamp(0.0, 100.0)
}

/// Numeric ladder for the latency/throughput comparison ratings.
pub fn comparison_score(rating: Rating) -> Option<f64> {
    match rating {
        Rating::Excellent => Some(100.0),
        Rating::Good => Some(80.0),
        Rating::Acceptable => Some(60.0),
        Rating::Poor => Some(40.0),
        Rating::VeryPoor => Some(20.0),
        // Test not run or baseline missing: excluded from the mean.
        _ => None,
    }
}

/// Numeric ladder for DNS leak severities.
pub fn dns_leak_score(severity: LeakSeverity) -> f64 {
    match severity {
        LeakSeverity::None => 100.0,
        LeakSeverity::Minor => 60.0,
        LeakSeverity::Major => 30.0,
        _ => 0.0,
    }
}

/// Numeric ladder for IPv6 leak severities.
pub fn ipv6_leak_score(severity: LeakSeverity) -> f64 {
    match severity {
        LeakSeverity::None => 100.0,
        LeakSeverity::Potential => 50.0,
        _ => 0.0,
    }
}

/// Numeric ladder for the ad/tracker blocking rating. `Disabled` here
/// means the test ran and measured zero blocking, which scores low but
/// still counts; a run where the test never happened (no tunnel) must
/// not reach this function at all.
pub fn blocking_score(rating: Rating) -> Option<f64> {
    match rating {
        Rating::Excellent => Some(100.0),
        Rating::Good => Some(80.0),
        Rating::Moderate => Some(60.0),
        Rating::Minimal => Some(40.0),
        Rating::Disabled => Some(20.0),
        _ => None,
    }
}

/// Numeric ladder for the stability rating.
pub fn stability_score(rating: Rating) -> Option<f64> {
    match rating {
        Rating::Excellent => Some(100.0),
        Rating::Good => Some(80.0),
        Rating::Acceptable => Some(60.0),
        Rating::Poor => Some(40.0),
        Rating::Unstable => Some(0.0),
        _ => None,
    }
}

/// Weighted mean over the present sub-scores. Missing categories are
/// excluded from numerator and denominator, which renormalizes the
/// remaining weights. Verdict is PASS iff overall >= threshold.
pub fn score(sub_scores: SubScores, weights: ScoreWeights, pass_threshold: f64) -> ScoreReport {
    let pairs = [
        (sub_scores.latency, weights.latency),
        (sub_scores.throughput, weights.throughput),
        (sub_scores.dns_leak, weights.dns_leak),
        (sub_scores.ipv6_leak, weights.ipv6_leak),
        (sub_scores.ad_blocking, weights.ad_blocking),
        (sub_scores.stability, weights.stability),
    ];

    let mut numerator = 0.0;
    let mut denominator = 0.0;
    for (sub, weight) in pairs {
        if let Some(s) = sub {
            numerator += clamp_score(s) * weight;
            denominator += weight;
        }
    }

    let overall = if denominator > 0.0 {
        clamp_score(numerator / denominator)
    } else {
        0.0
    };

    ScoreReport {
        sub_scores,
        weights,
        overall,
        pass_threshold,
        verdict: if overall >= pass_threshold {
            Verdict::Pass
        } else {
            Verdict::Fail
        },
    }
}
