//! Tunnel interface detection.
//!
//! No single OS primitive covers userspace WireGuard, kernel WireGuard,
//! generic TUN/TAP and legacy PPP, so detection is an ordered list of
//! strategies tried until one yields a result. Each strategy returns
//! `None` when it is inapplicable on this host (tool missing, no
//! matching interface), never an error.

use crate::model::TunnelDetection;
use crate::probe::{run_probe, ProbeSpec};
use async_trait::async_trait;
use regex::Regex;
use std::time::Duration;
use tracing::debug;

/// Interface-name prefixes associated with tunnel drivers.
pub const TUNNEL_PREFIXES: &[&str] = &["wg", "tun", "tap", "utun", "ppp"];

const PROBE_TIMEOUT: Duration = Duration::from_millis(800);

pub fn is_tunnel_name(name: &str) -> bool {
    TUNNEL_PREFIXES.iter().any(|p| name.starts_with(p))
}

#[async_trait]
trait DetectStrategy: Send + Sync {
    fn name(&self) -> &'static str;
    async fn probe(&self) -> Option<TunnelDetection>;
}

/// Strategy 1: interfaces of the wireguard link type.
struct WireguardLinkType;

#[async_trait]
impl DetectStrategy for WireguardLinkType {
    fn name(&self) -> &'static str {
        "ip-link-type-wireguard"
    }

    async fn probe(&self) -> Option<TunnelDetection> {
        let out = run_probe(&ProbeSpec::new(
            "ip",
            &["-o", "link", "show", "type", "wireguard"],
            PROBE_TIMEOUT,
        ))
        .await;
        if !out.succeeded {
            return None;
        }
        parse_link_lines(&out.stdout)
            .into_iter()
            .next()
            .map(|ifc| found(self.name(), ifc.name))
    }
}

/// Strategy 2: the wireguard daemon's own interface listing.
struct WgShow;

#[async_trait]
impl DetectStrategy for WgShow {
    fn name(&self) -> &'static str {
        "wg-show-interfaces"
    }

    async fn probe(&self) -> Option<TunnelDetection> {
        let out = run_probe(&ProbeSpec::new("wg", &["show", "interfaces"], PROBE_TIMEOUT)).await;
        if !out.succeeded {
            return None;
        }
        out.stdout
            .split_whitespace()
            .next()
            .map(|ifc| found(self.name(), ifc.to_string()))
    }
}

/// Strategy 3: scan all interfaces for tunnel-driver name prefixes,
/// preferring ones administratively up.
struct PrefixScan;

#[async_trait]
impl DetectStrategy for PrefixScan {
    fn name(&self) -> &'static str {
        "interface-prefix-scan"
    }

    async fn probe(&self) -> Option<TunnelDetection> {
        let out = run_probe(&ProbeSpec::new("ip", &["-o", "link", "show"], PROBE_TIMEOUT)).await;
        if !out.succeeded {
            return None;
        }
        let candidates: Vec<LinkLine> = parse_link_lines(&out.stdout)
            .into_iter()
            .filter(|l| is_tunnel_name(&l.name))
            .collect();
        candidates
            .iter()
            .find(|l| l.up)
            .or_else(|| candidates.first())
            .map(|l| found(self.name(), l.name.clone()))
    }
}

/// Strategy 4: the default route's outbound device, if it looks like a
/// tunnel.
struct DefaultRouteDevice;

#[async_trait]
impl DetectStrategy for DefaultRouteDevice {
    fn name(&self) -> &'static str {
        "default-route-device"
    }

    async fn probe(&self) -> Option<TunnelDetection> {
        let out = run_probe(&ProbeSpec::new(
            "ip",
            &["route", "show", "default"],
            PROBE_TIMEOUT,
        ))
        .await;
        if !out.succeeded {
            return None;
        }
        let dev = parse_route_device(&out.stdout)?;
        if is_tunnel_name(&dev) {
            Some(found(self.name(), dev))
        } else {
            None
        }
    }
}

fn found(method: &str, interface: String) -> TunnelDetection {
    TunnelDetection {
        active: true,
        interface: Some(interface),
        address: None,
        method: Some(method.to_string()),
    }
}

#[derive(Debug, Clone)]
struct LinkLine {
    name: String,
    up: bool,
}

/// Parses `ip -o link show` output lines of the form
/// `3: wg0: <POINTOPOINT,NOARP,UP,LOWER_UP> mtu 1420 ...`.
fn parse_link_lines(stdout: &str) -> Vec<LinkLine> {
    // `@` suffixes (wg0@NONE) are part of the display name only.
    let re = Regex::new(r"^\d+:\s*([^:@\s]+)(?:@\S+)?:\s*<([^>]*)>").expect("static regex");
    stdout
        .lines()
        .filter_map(|line| {
            let caps = re.captures(line.trim())?;
            let name = caps[1].to_string();
            if name == "lo" {
                return None;
            }
            let flags = &caps[2];
            let up = flags.split(',').any(|f| f == "UP" || f == "LOWER_UP");
            Some(LinkLine { name, up })
        })
        .collect()
}

/// Extracts the `dev` argument from an `ip route` line.
fn parse_route_device(stdout: &str) -> Option<String> {
    let mut fields = stdout.split_whitespace();
    while let Some(f) = fields.next() {
        if f == "dev" {
            return fields.next().map(String::from);
        }
    }
    None
}

/// Resolves the first IPv4 address assigned to `ifc`, when any.
async fn interface_address(ifc: &str) -> Option<String> {
    let out = run_probe(&ProbeSpec::new(
        "ip",
        &["-o", "-4", "addr", "show", "dev", ifc],
        PROBE_TIMEOUT,
    ))
    .await;
    if !out.succeeded {
        return None;
    }
    // `2: wg0    inet 10.64.0.2/32 scope global wg0`
    let mut fields = out.stdout.split_whitespace();
    while let Some(f) = fields.next() {
        if f == "inet" {
            return fields
                .next()
                .map(|cidr| cidr.split('/').next().unwrap_or(cidr).to_string());
        }
    }
    None
}

/// Runs the detection strategies in priority order. Cheap and free of
/// side effects; safe to call repeatedly (the stability monitor does).
pub async fn detect_tunnel() -> TunnelDetection {
    let strategies: [&dyn DetectStrategy; 4] = [
        &WireguardLinkType,
        &WgShow,
        &PrefixScan,
        &DefaultRouteDevice,
    ];
    for strategy in strategies {
        if let Some(mut det) = strategy.probe().await {
            if let Some(ifc) = det.interface.clone() {
                det.address = interface_address(&ifc).await;
            }
            debug!(method = strategy.name(), interface = ?det.interface, "tunnel detected");
            return det;
        }
    }
    debug!("no tunnel interface detected");
    TunnelDetection::default()
}

/// Fast presence check for a specific interface, used by the stability
/// monitor between full detections.
pub async fn interface_present(ifc: &str) -> bool {
    let out = run_probe(&ProbeSpec::new(
        "ip",
        &["-o", "link", "show", "dev", ifc],
        PROBE_TIMEOUT,
    ))
    .await;
    out.succeeded && !out.stdout.trim().is_empty()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tunnel_name_prefixes() {
        assert!(is_tunnel_name("wg0"));
        assert!(is_tunnel_name("tun1"));
        assert!(is_tunnel_name("utun4"));
        assert!(is_tunnel_name("ppp0"));
        assert!(!is_tunnel_name("eth0"));
        assert!(!is_tunnel_name("enp3s0"));
    }

    #[test]
    fn parses_link_lines_with_flags() {
        let out = "1: lo: <LOOPBACK,UP,LOWER_UP> mtu 65536\n\
                   2: eth0: <BROADCAST,MULTICAST,UP,LOWER_UP> mtu 1500\n\
                   3: wg0: <POINTOPOINT,NOARP,UP,LOWER_UP> mtu 1420\n\
                   4: tun0@NONE: <POINTOPOINT,MULTICAST,NOARP> mtu 1500\n";
        let links = parse_link_lines(out);
        assert_eq!(links.len(), 3); // lo skipped
        assert_eq!(links[1].name, "wg0");
        assert!(links[1].up);
        assert_eq!(links[2].name, "tun0");
        assert!(!links[2].up);
    }

    #[test]
    fn parses_route_device() {
        let out = "default via 192.168.1.1 dev eth0 proto dhcp metric 100\n";
        assert_eq!(parse_route_device(out).as_deref(), Some("eth0"));
        assert_eq!(parse_route_device("anything without a device"), None);
    }
}
