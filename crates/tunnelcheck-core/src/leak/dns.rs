//! DNS leak detection: resolver discovery across several configuration
//! sources, allowlist diffing and a resolver-identity probe.

use crate::config::DnsConfig;
use crate::model::{LeakFinding, LeakKind, LeakSeverity, TunnelDetection};
use crate::probe::{resolve, run_probe, ProbeSpec, Resolution};
use std::net::IpAddr;
use std::time::Duration;
use tracing::{debug, info};

const DISCOVERY_TIMEOUT: Duration = Duration::from_secs(2);
const RESOLVE_TIMEOUT: Duration = Duration::from_secs(4);

/// Domain whose authoritative answer echoes the address of the resolver
/// that asked, exposing what actually serves this host's queries.
const IDENTITY_PROBE_DOMAIN: &str = "whoami.akamai.net";

/// Discovered resolver set plus the source that produced it.
#[derive(Debug, Clone)]
pub struct DiscoveredResolvers {
    pub servers: Vec<String>,
    pub source: &'static str,
}

/// Parses `nameserver` entries out of resolv.conf content.
pub fn parse_resolv_conf(content: &str) -> Vec<String> {
    content
        .lines()
        .filter_map(|line| {
            let line = line.trim();
            if line.starts_with('#') || line.starts_with(';') {
                return None;
            }
            let mut fields = line.split_whitespace();
            if fields.next()? != "nameserver" {
                return None;
            }
            let addr = fields.next()?;
            addr.parse::<IpAddr>().ok().map(|_| addr.to_string())
        })
        .collect()
}

fn parse_resolvectl(stdout: &str) -> Vec<String> {
    let mut servers = Vec::new();
    for line in stdout.lines() {
        let line = line.trim();
        let rest = line
            .strip_prefix("Current DNS Server:")
            .or_else(|| line.strip_prefix("DNS Servers:"));
        if let Some(rest) = rest {
            for tok in rest.split_whitespace() {
                if tok.parse::<IpAddr>().is_ok() && !servers.contains(&tok.to_string()) {
                    servers.push(tok.to_string());
                }
            }
        }
    }
    servers
}

fn parse_nmcli(stdout: &str) -> Vec<String> {
    let mut servers = Vec::new();
    for line in stdout.lines() {
        let line = line.trim();
        if !line.starts_with("IP4.DNS") && !line.starts_with("IP6.DNS") {
            continue;
        }
        if let Some(addr) = line.split(':').nth(1) {
            let addr = addr.trim();
            if addr.parse::<IpAddr>().is_ok() && !servers.contains(&addr.to_string()) {
                servers.push(addr.to_string());
            }
        }
    }
    servers
}

/// Reads the system's configured resolvers, falling back across
/// discovery mechanisms since the configuration location varies by
/// host: resolv.conf, then resolvectl, then NetworkManager.
pub async fn discover_resolvers() -> DiscoveredResolvers {
    if let Ok(content) = std::fs::read_to_string("/etc/resolv.conf") {
        let servers = parse_resolv_conf(&content);
        if !servers.is_empty() {
            return DiscoveredResolvers {
                servers,
                source: "resolv.conf",
            };
        }
    }

    let out = run_probe(&ProbeSpec::new("resolvectl", &["status"], DISCOVERY_TIMEOUT)).await;
    if out.succeeded {
        let servers = parse_resolvectl(&out.stdout);
        if !servers.is_empty() {
            return DiscoveredResolvers {
                servers,
                source: "resolvectl",
            };
        }
    }

    let out = run_probe(&ProbeSpec::new("nmcli", &["dev", "show"], DISCOVERY_TIMEOUT)).await;
    if out.succeeded {
        let servers = parse_nmcli(&out.stdout);
        if !servers.is_empty() {
            return DiscoveredResolvers {
                servers,
                source: "nmcli",
            };
        }
    }

    DiscoveredResolvers {
        servers: Vec::new(),
        source: "none",
    }
}

fn is_loopback(addr: &str) -> bool {
    addr.parse::<IpAddr>().map(|ip| ip.is_loopback()).unwrap_or(false)
}

/// Maps an unexpected-resolver count onto a severity tier.
pub fn severity_for(unexpected: usize) -> LeakSeverity {
    match unexpected {
        0 => LeakSeverity::None,
        1 => LeakSeverity::Minor,
        2..=3 => LeakSeverity::Major,
        _ => LeakSeverity::Critical,
    }
}

fn recommendation_for(severity: LeakSeverity) -> &'static str {
    match severity {
        LeakSeverity::None => "DNS is handled by the expected resolvers.",
        LeakSeverity::Minor => {
            "One resolver outside the tunnel was found; check for a lingering DHCP-assigned DNS server."
        }
        _ => "DNS queries are reaching resolvers outside the tunnel; enable the VPN's DNS enforcement or block port 53 egress.",
    }
}

/// Runs the DNS leak test. A leak finding is only meaningful relative
/// to an active tunnel, so with no tunnel the severity is forced to
/// none with a "connect first" recommendation.
pub async fn detect_dns_leaks(cfg: &DnsConfig, tunnel: &TunnelDetection) -> LeakFinding {
    if !tunnel.active {
        return LeakFinding::clean(
            LeakKind::Dns,
            "No tunnel detected; connect the VPN before evaluating DNS leaks.",
        );
    }

    let discovered = discover_resolvers().await;
    debug!(source = discovered.source, servers = ?discovered.servers, "resolver discovery");

    // Loopback entries are local stub daemons, not upstreams; the
    // identity probe below covers whatever sits behind them.
    let mut unexpected: Vec<String> = discovered
        .servers
        .iter()
        .filter(|s| !is_loopback(s) && !cfg.expected_resolvers.contains(s))
        .cloned()
        .collect();

    // Ask the resolver to identify itself as seen from the outside.
    if let Resolution::Answers(addrs) =
        resolve(IDENTITY_PROBE_DOMAIN, None, RESOLVE_TIMEOUT).await
    {
        for addr in addrs {
            if addr.parse::<IpAddr>().is_ok()
                && !cfg.expected_resolvers.contains(&addr)
                && !unexpected.contains(&addr)
            {
                unexpected.push(addr);
            }
        }
    }

    // Control-domain resolution failures degrade confidence but are not
    // leak evidence.
    let mut unreachable_controls = 0u32;
    for domain in &cfg.control_domains {
        if !matches!(resolve(domain, None, RESOLVE_TIMEOUT).await, Resolution::Answers(_)) {
            unreachable_controls += 1;
        }
    }

    let severity = severity_for(unexpected.len());
    let finding = LeakFinding {
        kind: LeakKind::Dns,
        detected: severity != LeakSeverity::None,
        severity,
        unexpected,
        recommendation: recommendation_for(severity).to_string(),
        note: if unreachable_controls > 0 {
            Some(format!(
                "{}/{} control domains failed to resolve; results may be degraded",
                unreachable_controls,
                cfg.control_domains.len()
            ))
        } else {
            None
        },
    };
    info!(severity = %finding.severity, unexpected = finding.unexpected.len(), "dns leak test done");
    finding
}
