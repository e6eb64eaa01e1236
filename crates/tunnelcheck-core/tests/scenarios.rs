//! End-to-end scoring scenarios driven through the pure pipeline:
//! comparisons, findings and tier tables feeding the aggregator.

use tunnelcheck_core::config::{DnsConfig, ScoreWeights};
use tunnelcheck_core::leak::ipv6::{classify, Ipv6Facts};
use tunnelcheck_core::leak::{adblock, dns};
use tunnelcheck_core::measure::{compare_latency, compare_throughput};
use tunnelcheck_core::model::{LeakSeverity, Rating, SubScores, Verdict};
use tunnelcheck_core::scoring;
use tunnelcheck_core::stability::stability_rating;

fn facts(global: &[&str], route_dev: Option<&str>, reachable: bool) -> Ipv6Facts {
    Ipv6Facts {
        global_addrs: global.iter().map(|s| s.to_string()).collect(),
        default_route_dev: route_dev.map(String::from),
        reachable,
    }
}

#[test]
fn scenario_leak_free_run_passes_with_high_score() {
    // 20ms baseline vs 22ms with tunnel: +10%, still excellent.
    let latency = compare_latency(Some(20.0), Some(22.0));
    assert_eq!(latency.rating, Rating::Excellent);

    // 100 Mbps baseline vs 95 Mbps: 95% retained, excellent.
    let throughput = compare_throughput(Some(100.0), Some(95.0));
    assert_eq!(throughput.rating, Rating::Excellent);

    // No unexpected resolvers, no IPv6 reachability, perfect window.
    let dns_severity = dns::severity_for(0);
    assert_eq!(dns_severity, LeakSeverity::None);
    let ipv6 = classify(true, Some("wg0"), &facts(&[], None, false));
    assert_eq!(ipv6.severity, LeakSeverity::None);
    let stability = stability_rating(0, 100.0);
    assert_eq!(stability, Rating::Excellent);
    let blocking = adblock::blocking_rating(95.0, true);
    assert_eq!(blocking, Rating::Excellent);

    let subs = SubScores {
        latency: scoring::comparison_score(latency.rating),
        throughput: scoring::comparison_score(throughput.rating),
        dns_leak: Some(scoring::dns_leak_score(dns_severity)),
        ipv6_leak: Some(scoring::ipv6_leak_score(ipv6.severity)),
        ad_blocking: scoring::blocking_score(blocking),
        stability: scoring::stability_score(stability),
    };
    let report = scoring::score(subs, ScoreWeights::default(), 70.0);
    assert!(report.overall >= 90.0);
    assert_eq!(report.verdict, Verdict::Pass);
}

#[test]
fn scenario_confirmed_ipv6_leak() {
    // Tunnel up, IPv6 globally reachable, default route via eth0.
    let finding = classify(
        true,
        Some("wg0"),
        &facts(&["2001:db8::5"], Some("eth0"), true),
    );
    assert!(finding.detected);
    assert_eq!(finding.severity, LeakSeverity::Confirmed);
    assert_eq!(scoring::ipv6_leak_score(finding.severity), 0.0);
}

#[test]
fn scenario_dns_leak_with_two_unexpected_resolvers_is_major() {
    let severity = dns::severity_for(2);
    assert_eq!(severity, LeakSeverity::Major);
    assert_eq!(scoring::dns_leak_score(severity), 30.0);
}

#[test]
fn scenario_unstable_tunnel_subscore_at_most_twenty() {
    // 4 drops over a 30s window at 2s intervals, 73% uptime.
    let rating = stability_rating(4, 73.0);
    assert_eq!(rating, Rating::Unstable);
    let sub = scoring::stability_score(rating).expect("stability ran");
    assert!(sub <= 20.0);
}

#[test]
fn scenario_skip_baseline_renormalizes_over_remaining_categories() {
    // Without a baseline, both comparisons are unknown.
    let latency = compare_latency(None, Some(25.0));
    let throughput = compare_throughput(None, Some(80.0));
    assert_eq!(latency.rating, Rating::Unknown);
    assert_eq!(throughput.rating, Rating::Unknown);

    let subs = SubScores {
        latency: scoring::comparison_score(latency.rating),
        throughput: scoring::comparison_score(throughput.rating),
        dns_leak: Some(100.0),
        ipv6_leak: Some(100.0),
        ad_blocking: Some(80.0),
        stability: Some(100.0),
    };
    assert!(subs.latency.is_none());
    assert!(subs.throughput.is_none());

    let report = scoring::score(subs, ScoreWeights::default(), 70.0);
    // Weighted over dns 20, ipv6 10, ad 10, stability 10 only:
    // (100*20 + 100*10 + 80*10 + 100*10) / 50 = 96.
    assert!((report.overall - 96.0).abs() < 1e-9);
    assert_eq!(report.verdict, Verdict::Pass);
}

#[test]
fn control_domain_guard_is_diagnostic_only() {
    // A config with control domains does not change the score ladder;
    // over-blocking shows up in the finding, not the sub-score.
    let cfg = DnsConfig::default();
    assert!(!cfg.control_domains.is_empty());
    assert_eq!(adblock::blocking_rating(100.0, true), Rating::Excellent);
}
