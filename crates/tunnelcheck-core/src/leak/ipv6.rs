//! IPv6 leak detection.
//!
//! The detection logic is an ordered decision table over three
//! independently gathered facts: locally bound global IPv6 addresses,
//! the IPv6 default route's outbound device, and direct reachability of
//! public IPv6 targets. Later rules only apply once earlier ones are
//! ruled out.

use crate::detect::is_tunnel_name;
use crate::model::{LeakFinding, LeakKind, LeakSeverity, TunnelDetection};
use crate::probe::{ping6_once, run_probe, ProbeSpec};
use std::time::Duration;
use tracing::{debug, info};

const PROBE_TIMEOUT: Duration = Duration::from_secs(2);

/// Public IPv6 anycast resolvers used as reachability targets.
const REACHABILITY_TARGETS: &[&str] = &["2606:4700:4700::1111", "2001:4860:4860::8888"];

/// Facts gathered before classification.
#[derive(Debug, Clone, Default)]
pub struct Ipv6Facts {
    /// Globally scoped (non-link-local) addresses bound locally.
    pub global_addrs: Vec<String>,
    /// Outbound device of the IPv6 default route, when one exists.
    pub default_route_dev: Option<String>,
    /// Whether any public IPv6 target answered a ping.
    pub reachable: bool,
}

/// Parses `ip -o -6 addr show scope global` output into addresses.
pub fn parse_global_addrs(stdout: &str) -> Vec<String> {
    stdout
        .lines()
        .filter_map(|line| {
            let mut fields = line.split_whitespace();
            while let Some(f) = fields.next() {
                if f == "inet6" {
                    return fields
                        .next()
                        .map(|cidr| cidr.split('/').next().unwrap_or(cidr).to_string());
                }
            }
            None
        })
        .filter(|a| !a.starts_with("fe80"))
        .collect()
}

async fn gather_facts() -> Ipv6Facts {
    let mut facts = Ipv6Facts::default();

    let out = run_probe(&ProbeSpec::new(
        "ip",
        &["-o", "-6", "addr", "show", "scope", "global"],
        PROBE_TIMEOUT,
    ))
    .await;
    if out.succeeded {
        facts.global_addrs = parse_global_addrs(&out.stdout);
    }

    let out = run_probe(&ProbeSpec::new(
        "ip",
        &["-6", "route", "show", "default"],
        PROBE_TIMEOUT,
    ))
    .await;
    if out.succeeded {
        let mut fields = out.stdout.split_whitespace();
        while let Some(f) = fields.next() {
            if f == "dev" {
                facts.default_route_dev = fields.next().map(String::from);
                break;
            }
        }
    }

    for target in REACHABILITY_TARGETS {
        if ping6_once(target, PROBE_TIMEOUT).await.is_some() {
            facts.reachable = true;
            break;
        }
    }

    debug!(
        global_addrs = facts.global_addrs.len(),
        route_dev = ?facts.default_route_dev,
        reachable = facts.reachable,
        "ipv6 facts gathered"
    );
    facts
}

/// The ordered decision table. Pure so that every row is testable
/// without touching the network.
pub fn classify(tunnel_active: bool, tunnel_interface: Option<&str>, facts: &Ipv6Facts) -> LeakFinding {
    if !tunnel_active {
        return LeakFinding::clean(
            LeakKind::Ipv6,
            "No tunnel detected; connect the VPN before evaluating IPv6 leaks.",
        );
    }

    let has_global = !facts.global_addrs.is_empty();

    if !has_global && !facts.reachable {
        return LeakFinding::clean(LeakKind::Ipv6, "No IPv6 connectivity; nothing to leak.");
    }

    if has_global && !facts.reachable {
        return LeakFinding::clean(
            LeakKind::Ipv6,
            "IPv6 is configured but unreachable; the tunnel is blackholing it correctly.",
        );
    }

    // IPv6 is reachable from here on.
    if let Some(dev) = &facts.default_route_dev {
        let via_tunnel =
            tunnel_interface.map(|t| t == dev).unwrap_or(false) || is_tunnel_name(dev);
        if via_tunnel {
            return LeakFinding::clean(LeakKind::Ipv6, "IPv6 is carried inside the tunnel.");
        } else {
            return LeakFinding {
                kind: LeakKind::Ipv6,
                detected: true,
                severity: LeakSeverity::Confirmed,
                unexpected: facts
                    .global_addrs
                    .iter()
                    .cloned()
                    .chain(std::iter::once(format!("default route via {}", dev)))
                    .collect(),
                recommendation:
                    "IPv6 traffic routes around the tunnel; disable IPv6 or enable the VPN's IPv6 support."
                        .to_string(),
                note: None,
            };
        }
    }

    // Reachable, but route attribution did not rule a leak in or out.
    LeakFinding {
        kind: LeakKind::Ipv6,
        detected: true,
        severity: LeakSeverity::Potential,
        unexpected: facts.global_addrs.clone(),
        recommendation:
            "IPv6 is reachable but its route could not be attributed; verify manually which interface carries IPv6."
                .to_string(),
        note: Some("route attribution ambiguous".to_string()),
    }
}

/// Runs the IPv6 leak test against the live system.
pub async fn detect_ipv6_leaks(tunnel: &TunnelDetection) -> LeakFinding {
    let facts = if tunnel.active {
        gather_facts().await
    } else {
        Ipv6Facts::default()
    };
    let finding = classify(tunnel.active, tunnel.interface.as_deref(), &facts);
    info!(severity = %finding.severity, "ipv6 leak test done");
    finding
}

#[cfg(test)]
mod tests {
    use super::*;

    fn facts(global: &[&str], route_dev: Option<&str>, reachable: bool) -> Ipv6Facts {
        Ipv6Facts {
            global_addrs: global.iter().map(|s| s.to_string()).collect(),
            default_route_dev: route_dev.map(String::from),
            reachable,
        }
    }

    #[test]
    fn no_tunnel_is_none() {
        let f = classify(false, None, &facts(&["2001:db8::1"], Some("eth0"), true));
        assert_eq!(f.severity, LeakSeverity::None);
        assert!(!f.detected);
    }

    #[test]
    fn no_ipv6_at_all_is_none() {
        let f = classify(true, Some("wg0"), &facts(&[], None, false));
        assert_eq!(f.severity, LeakSeverity::None);
    }

    #[test]
    fn blackholed_ipv6_is_none() {
        let f = classify(true, Some("wg0"), &facts(&["2001:db8::1"], Some("eth0"), false));
        assert_eq!(f.severity, LeakSeverity::None);
    }

    #[test]
    fn reachable_via_non_tunnel_route_is_confirmed() {
        let f = classify(true, Some("wg0"), &facts(&["2001:db8::1"], Some("eth0"), true));
        assert_eq!(f.severity, LeakSeverity::Confirmed);
        assert!(f.detected);
        assert!(f.unexpected.iter().any(|u| u.contains("eth0")));
    }

    #[test]
    fn reachable_via_tunnel_route_is_clean() {
        let f = classify(true, Some("wg0"), &facts(&["2001:db8::1"], Some("wg0"), true));
        assert_eq!(f.severity, LeakSeverity::None);
        assert!(!f.detected);
    }

    #[test]
    fn reachable_without_route_attribution_is_potential() {
        let f = classify(true, Some("wg0"), &facts(&["2001:db8::1"], None, true));
        assert_eq!(f.severity, LeakSeverity::Potential);
        assert!(f.note.is_some());
    }

    #[test]
    fn parses_global_addrs() {
        let out = "2: eth0    inet6 2001:db8:1::2/64 scope global dynamic\n\
                   2: eth0    inet6 fe80::1/64 scope link\n";
        assert_eq!(parse_global_addrs(out), vec!["2001:db8:1::2"]);
    }
}
