//! Process probe adapter: every external diagnostic command goes
//! through here so that timeout policy and failure semantics are
//! enforced in one place.
//!
//! A timeout, a missing executable or a non-zero exit is a data outcome
//! (`succeeded == false`), never an error. Callers treat probe failure
//! identically to a negative or empty measurement.

use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::process::Command;
use tracing::debug;

#[derive(Debug, Clone)]
pub struct ProbeSpec {
    pub program: String,
    pub args: Vec<String>,
    pub timeout: Duration,
}

impl ProbeSpec {
    pub fn new(program: &str, args: &[&str], timeout: Duration) -> Self {
        Self {
            program: program.to_string(),
            args: args.iter().map(|a| a.to_string()).collect(),
            timeout,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ProbeOutcome {
    pub succeeded: bool,
    pub stdout: String,
    pub stderr: String,
    pub exit_code: Option<i32>,
    pub elapsed: Duration,
    /// Set when the probe failed before producing output (timeout,
    /// missing executable).
    pub failure: Option<String>,
}

impl ProbeOutcome {
    fn failed(reason: String, elapsed: Duration) -> Self {
        Self {
            succeeded: false,
            stdout: String::new(),
            stderr: String::new(),
            exit_code: None,
            elapsed,
            failure: Some(reason),
        }
    }
}

/// Runs a short-lived external command with a hard deadline. The
/// deadline is enforced at the process-supervision layer; a hung
/// command is killed, not waited on.
pub async fn run_probe(spec: &ProbeSpec) -> ProbeOutcome {
    let start = Instant::now();
    let fut = Command::new(&spec.program)
        .args(&spec.args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .output();

    match tokio::time::timeout(spec.timeout, fut).await {
        Ok(Ok(out)) => {
            let outcome = ProbeOutcome {
                succeeded: out.status.success(),
                stdout: String::from_utf8_lossy(&out.stdout).into_owned(),
                stderr: String::from_utf8_lossy(&out.stderr).into_owned(),
                exit_code: out.status.code(),
                elapsed: start.elapsed(),
                failure: None,
            };
            debug!(
                program = %spec.program,
                ok = outcome.succeeded,
                elapsed_ms = outcome.elapsed.as_millis() as u64,
                "probe finished"
            );
            outcome
        }
        Ok(Err(e)) => {
            debug!(program = %spec.program, error = %e, "probe could not start");
            ProbeOutcome::failed(format!("{}: {}", spec.program, e), start.elapsed())
        }
        Err(_) => {
            debug!(program = %spec.program, timeout_ms = spec.timeout.as_millis() as u64, "probe timed out");
            ProbeOutcome::failed(
                format!("{} timed out after {:?}", spec.program, spec.timeout),
                start.elapsed(),
            )
        }
    }
}

/// Sends one ICMP echo to `host` and returns the RTT in ms, or None on
/// any failure.
pub async fn ping_once(host: &str, timeout: Duration) -> Option<f64> {
    let wait_secs = timeout.as_secs().max(1).to_string();
    let spec = ProbeSpec::new(
        "ping",
        &["-c", "1", "-W", &wait_secs, host],
        timeout + Duration::from_secs(1),
    );
    let out = run_probe(&spec).await;
    if !out.succeeded {
        return None;
    }
    parse_ping_time(&out.stdout)
}

/// Same as [`ping_once`] but over IPv6.
pub async fn ping6_once(host: &str, timeout: Duration) -> Option<f64> {
    let wait_secs = timeout.as_secs().max(1).to_string();
    let spec = ProbeSpec::new(
        "ping",
        &["-6", "-c", "1", "-W", &wait_secs, host],
        timeout + Duration::from_secs(1),
    );
    let out = run_probe(&spec).await;
    if !out.succeeded {
        return None;
    }
    parse_ping_time(&out.stdout)
}

/// Extracts `time=NN.N ms` from ping output.
pub fn parse_ping_time(stdout: &str) -> Option<f64> {
    let idx = stdout.find("time=")?;
    let rest = &stdout[idx + 5..];
    let end = rest
        .find(|c: char| !c.is_ascii_digit() && c != '.')
        .unwrap_or(rest.len());
    rest[..end].parse::<f64>().ok()
}

/// Resolution outcome for a single domain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// At least one answer came back.
    Answers(Vec<String>),
    /// The resolver answered but had no records (NXDOMAIN or empty).
    Empty,
    /// The query itself failed (resolver unreachable, tool missing).
    Failed,
}

/// Resolves `domain` with `dig +short`, optionally against a specific
/// server, falling back to `nslookup` when dig is unavailable.
pub async fn resolve(domain: &str, server: Option<&str>, timeout: Duration) -> Resolution {
    let mut args: Vec<String> = vec![
        "+short".into(),
        "+time=2".into(),
        "+tries=1".into(),
        domain.into(),
    ];
    if let Some(s) = server {
        args.push(format!("@{}", s));
    }
    let arg_refs: Vec<&str> = args.iter().map(String::as_str).collect();
    let out = run_probe(&ProbeSpec::new("dig", &arg_refs, timeout)).await;

    if out.failure.is_none() {
        if !out.succeeded {
            return Resolution::Failed;
        }
        let answers: Vec<String> = out
            .stdout
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty() && !l.starts_with(';'))
            .map(String::from)
            .collect();
        return if answers.is_empty() {
            Resolution::Empty
        } else {
            Resolution::Answers(answers)
        };
    }

    // dig is missing; nslookup's exit codes are unreliable, so parse
    // regardless of status.
    let mut args: Vec<&str> = vec![domain];
    if let Some(s) = server {
        args.push(s);
    }
    let out = run_probe(&ProbeSpec::new("nslookup", &args, timeout)).await;
    if out.failure.is_some() {
        return Resolution::Failed;
    }
    let answers = parse_nslookup(&out.stdout);
    if answers.is_empty() {
        if out.stdout.contains("NXDOMAIN") || out.stdout.contains("can't find") {
            Resolution::Empty
        } else {
            Resolution::Failed
        }
    } else {
        Resolution::Answers(answers)
    }
}

/// Pulls answer addresses out of nslookup output, skipping the server
/// banner lines at the top.
pub fn parse_nslookup(stdout: &str) -> Vec<String> {
    let mut answers = Vec::new();
    let mut in_answer = false;
    for line in stdout.lines() {
        let line = line.trim();
        if line.starts_with("Name:") {
            in_answer = true;
            continue;
        }
        if let Some(addr) = line.strip_prefix("Address:") {
            if in_answer {
                let addr = addr.trim();
                if !addr.is_empty() {
                    // Strip "#53" port suffixes printed by some builds.
                    let addr = addr.split('#').next().unwrap_or(addr);
                    answers.push(addr.to_string());
                }
            }
        }
    }
    answers
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_ping_time() {
        let out = "64 bytes from 1.1.1.1: icmp_seq=1 ttl=57 time=12.4 ms\n";
        assert_eq!(parse_ping_time(out), Some(12.4));
    }

    #[test]
    fn parses_integer_ping_time() {
        let out = "64 bytes from 8.8.8.8: icmp_seq=1 ttl=57 time=9 ms\n";
        assert_eq!(parse_ping_time(out), Some(9.0));
    }

    #[test]
    fn missing_time_is_none() {
        assert_eq!(parse_ping_time("Request timeout for icmp_seq 0\n"), None);
    }

    #[test]
    fn parses_nslookup_answers() {
        let out = "Server:\t\t127.0.0.53\nAddress:\t127.0.0.53#53\n\n\
                   Non-authoritative answer:\nName:\texample.com\nAddress: 93.184.216.34\n";
        assert_eq!(parse_nslookup(out), vec!["93.184.216.34".to_string()]);
    }

    #[tokio::test]
    async fn missing_executable_is_a_failed_outcome() {
        let spec = ProbeSpec::new(
            "definitely-not-a-real-binary-6f1c",
            &[],
            Duration::from_secs(1),
        );
        let out = run_probe(&spec).await;
        assert!(!out.succeeded);
        assert!(out.failure.is_some());
    }

    #[tokio::test]
    async fn timeout_is_a_failed_outcome() {
        let spec = ProbeSpec::new("sleep", &["5"], Duration::from_millis(100));
        let out = run_probe(&spec).await;
        assert!(!out.succeeded);
        assert!(out.failure.expect("timeout reason").contains("timed out"));
    }
}
