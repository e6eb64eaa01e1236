//! Ad/tracker DNS-blocking efficacy.
//!
//! A domain counts as blocked when resolution fails outright or every
//! returned address is a known sinkhole. A failed resolution is only
//! counted after a control-domain re-probe confirms the resolver itself
//! is still answering; otherwise the sample is unmeasured, so a flaky
//! resolver never inflates the blocked percentage.

use crate::config::DnsConfig;
use crate::model::{BlockingFinding, Rating, TunnelDetection};
use crate::probe::{resolve, Resolution};
use std::net::IpAddr;
use std::time::Duration;
use tracing::{debug, info};

const RESOLVE_TIMEOUT: Duration = Duration::from_secs(4);

/// Well-known advertising domains.
pub const AD_DOMAINS: &[&str] = &[
    "doubleclick.net",
    "googlesyndication.com",
    "adservice.google.com",
    "ads.pubmatic.com",
    "adnxs.com",
    "taboola.com",
    "outbrain.com",
    "criteo.com",
];

/// Well-known tracking/analytics domains.
pub const TRACKER_DOMAINS: &[&str] = &[
    "google-analytics.com",
    "scorecardresearch.com",
    "pixel.facebook.com",
    "hotjar.com",
    "mixpanel.com",
    "segment.io",
    "amplitude.com",
    "quantserve.com",
];

/// Ordered efficacy tiers on the overall blocked percentage.
pub const BLOCKING_TIERS: &[(f64, Rating)] = &[
    (90.0, Rating::Excellent),
    (70.0, Rating::Good),
    (50.0, Rating::Moderate),
];

/// Sinkhole addresses blocking resolvers answer with instead of
/// NXDOMAIN.
pub fn is_sinkhole(addr: &str) -> bool {
    match addr.parse::<IpAddr>() {
        Ok(ip) => ip.is_unspecified() || ip.is_loopback(),
        Err(_) => false,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DomainOutcome {
    Blocked,
    Leaked,
    /// Resolution failed and the control re-probe also failed; excluded
    /// from both numerator and denominator.
    Unmeasured,
}

async fn classify_domain(domain: &str, control: Option<&str>) -> DomainOutcome {
    match resolve(domain, None, RESOLVE_TIMEOUT).await {
        Resolution::Answers(addrs) => {
            if addrs.iter().all(|a| is_sinkhole(a)) {
                DomainOutcome::Blocked
            } else {
                DomainOutcome::Leaked
            }
        }
        Resolution::Empty => DomainOutcome::Blocked,
        Resolution::Failed => {
            // Distinguish "the resolver blocked it" from "the resolver
            // is down".
            let Some(control) = control else {
                return DomainOutcome::Unmeasured;
            };
            match resolve(control, None, RESOLVE_TIMEOUT).await {
                Resolution::Answers(_) => DomainOutcome::Blocked,
                _ => DomainOutcome::Unmeasured,
            }
        }
    }
}

async fn run_category(
    domains: &'static [&'static str],
    control: Option<&str>,
) -> (u32, Vec<String>, u32) {
    let mut blocked = 0u32;
    let mut leaked = Vec::new();
    let mut unmeasured = 0u32;
    for domain in domains {
        match classify_domain(domain, control).await {
            DomainOutcome::Blocked => blocked += 1,
            DomainOutcome::Leaked => leaked.push(domain.to_string()),
            DomainOutcome::Unmeasured => unmeasured += 1,
        }
    }
    (blocked, leaked, unmeasured)
}

pub fn blocking_rating(blocked_pct: f64, any_measured: bool) -> Rating {
    if !any_measured || blocked_pct <= 0.0 {
        return Rating::Disabled;
    }
    BLOCKING_TIERS
        .iter()
        .find(|(floor, _)| blocked_pct >= *floor)
        .map(|(_, r)| *r)
        .unwrap_or(Rating::Minimal)
}

/// Runs the blocking test over both categories plus the control list.
pub async fn test_blocking(cfg: &DnsConfig, tunnel: &TunnelDetection) -> BlockingFinding {
    if !tunnel.active {
        return BlockingFinding {
            ads_blocked: 0,
            ads_total: AD_DOMAINS.len() as u32,
            trackers_blocked: 0,
            trackers_total: TRACKER_DOMAINS.len() as u32,
            leaked_domains: Vec::new(),
            control_accessible: 0,
            control_total: cfg.control_domains.len() as u32,
            blocked_pct: 0.0,
            rating: Rating::Disabled,
            note: Some("no tunnel detected; blocking not evaluated".to_string()),
        };
    }

    let control = cfg.control_domains.first().map(String::as_str);

    let mut leaked_domains = Vec::new();
    let mut unmeasured = 0u32;

    let (ads_blocked, ads_leaked, ads_unmeasured) = run_category(AD_DOMAINS, control).await;
    let (trackers_blocked, trackers_leaked, trackers_unmeasured) =
        run_category(TRACKER_DOMAINS, control).await;
    leaked_domains.extend(ads_leaked);
    leaked_domains.extend(trackers_leaked);
    unmeasured += ads_unmeasured + trackers_unmeasured;

    // Over-blocking legitimate sites is a failure mode worth surfacing,
    // but it is diagnostic only and never penalized in the score.
    let mut control_accessible = 0u32;
    for domain in &cfg.control_domains {
        if let Resolution::Answers(addrs) = resolve(domain, None, RESOLVE_TIMEOUT).await {
            if !addrs.iter().all(|a| is_sinkhole(a)) {
                control_accessible += 1;
            }
        }
    }

    let total = (AD_DOMAINS.len() + TRACKER_DOMAINS.len()) as u32;
    let measured = total.saturating_sub(unmeasured);
    let blocked = ads_blocked + trackers_blocked;
    let blocked_pct = if measured == 0 {
        0.0
    } else {
        blocked as f64 / measured as f64 * 100.0
    };
    debug!(blocked, measured, unmeasured, "blocking classification done");

    let finding = BlockingFinding {
        ads_blocked,
        ads_total: AD_DOMAINS.len() as u32,
        trackers_blocked,
        trackers_total: TRACKER_DOMAINS.len() as u32,
        leaked_domains,
        control_accessible,
        control_total: cfg.control_domains.len() as u32,
        blocked_pct,
        rating: blocking_rating(blocked_pct, measured > 0),
        note: if unmeasured > 0 {
            Some(format!("{} domains could not be measured", unmeasured))
        } else {
            None
        },
    };
    info!(blocked_pct = finding.blocked_pct, rating = %finding.rating, "ad blocking test done");
    finding
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sinkhole_addresses() {
        assert!(is_sinkhole("0.0.0.0"));
        assert!(is_sinkhole("127.0.0.1"));
        assert!(is_sinkhole("::"));
        assert!(is_sinkhole("::1"));
        assert!(!is_sinkhole("142.250.74.78"));
        assert!(!is_sinkhole("not-an-ip"));
    }

    #[test]
    fn rating_tiers() {
        assert_eq!(blocking_rating(100.0, true), Rating::Excellent);
        assert_eq!(blocking_rating(90.0, true), Rating::Excellent);
        assert_eq!(blocking_rating(70.0, true), Rating::Good);
        assert_eq!(blocking_rating(50.0, true), Rating::Moderate);
        assert_eq!(blocking_rating(10.0, true), Rating::Minimal);
        assert_eq!(blocking_rating(0.0, true), Rating::Disabled);
        assert_eq!(blocking_rating(100.0, false), Rating::Disabled);
    }

    #[test]
    fn categories_are_roughly_equal() {
        assert_eq!(AD_DOMAINS.len(), TRACKER_DOMAINS.len());
    }

    #[tokio::test]
    async fn no_tunnel_is_disabled() {
        let finding = test_blocking(&DnsConfig::default(), &TunnelDetection::default()).await;
        assert_eq!(finding.rating, Rating::Disabled);
        assert!(finding.note.expect("note").contains("no tunnel"));
    }
}
