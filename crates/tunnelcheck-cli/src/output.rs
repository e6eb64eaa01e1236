//! Text rendering of a run report.

use tunnelcheck_core::model::{RunReport, Verdict};

fn fmt_opt(v: Option<f64>, unit: &str) -> String {
    match v {
        Some(v) => format!("{:.1} {}", v, unit),
        None => "n/a".to_string(),
    }
}

pub fn format_report(report: &RunReport) -> String {
    let mut out = String::new();
    let mut line = |s: String| {
        out.push_str(&s);
        out.push('\n');
    };

    line(format!("tunnelcheck run {}", report.run_id));
    line(format!("generated at   {}", report.generated_at));
    line(String::new());

    match &report.tunnel.interface {
        Some(ifc) => line(format!(
            "Tunnel         {} ({})",
            ifc,
            report.tunnel.address.as_deref().unwrap_or("no address")
        )),
        None => line("Tunnel         not detected".to_string()),
    }

    if let Some(b) = &report.baseline {
        line(format!(
            "Baseline       {} latency, {:.1} ms jitter, {:.1}% loss, {} throughput",
            fmt_opt(b.latency.avg_ms, "ms"),
            b.latency.jitter_ms,
            b.latency.loss_pct,
            fmt_opt(b.throughput_mbps, "Mbps"),
        ));
    } else {
        line("Baseline       skipped".to_string());
    }

    if let Some(l) = &report.latency {
        line(format!(
            "Latency        {} ({:+.1}% vs baseline, {})",
            fmt_opt(l.avg_ms, "ms"),
            report.latency_comparison.change_pct,
            report.latency_comparison.rating,
        ));
    }
    line(format!(
        "Throughput     {} ({:+.1}% vs baseline, {})",
        fmt_opt(report.throughput_mbps, "Mbps"),
        report.throughput_comparison.change_pct,
        report.throughput_comparison.rating,
    ));

    line(format!(
        "DNS leak       {} ({} unexpected resolvers)",
        report.dns_leak.severity,
        report.dns_leak.unexpected.len(),
    ));
    line(format!("IPv6 leak      {}", report.ipv6_leak.severity));

    if let Some(b) = &report.ad_blocking {
        line(format!(
            "Ad blocking    {} ({:.0}% blocked, {}/{} control domains reachable)",
            b.rating, b.blocked_pct, b.control_accessible, b.control_total,
        ));
    }

    if let Some(s) = &report.stability {
        line(format!(
            "Stability      {} ({} drops, {} reconnects, {:.1}% uptime)",
            s.rating,
            s.drops,
            s.reconnections,
            s.uptime_pct,
        ));
    }

    line(String::new());
    let verdict = match report.score.verdict {
        Verdict::Pass => "PASS",
        Verdict::Fail => "FAIL",
    };
    line(format!(
        "Overall        {:.1}/100 (threshold {:.0}): {}",
        report.score.overall, report.score.pass_threshold, verdict
    ));

    for w in &report.warnings {
        line(format!("warning: {}", w));
    }

    out
}
