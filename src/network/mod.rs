pub mod host;
pub mod tls;

use chrono::Utc;
use serde::Serialize;
use std::collections::HashSet;
use std::time::{Duration, Instant};
use tokio::net::TcpStream;
use tracing::{error, info, warn};

use self::host::{host_and_port, is_plain_http};
use self::tls::{evaluate_chain, ChainVerdict};

/// Which step of the run produced an outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckKind {
    Dns,
    Tcp,
    Tls,
    Connectivity,
    Token,
    TenantProbe,
}

impl std::fmt::Display for CheckKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CheckKind::Dns => write!(f, "DNS"),
            CheckKind::Tcp => write!(f, "TCP"),
            CheckKind::Tls => write!(f, "TLS"),
            CheckKind::Connectivity => write!(f, "Connectivity"),
            CheckKind::Token => write!(f, "Token"),
            CheckKind::TenantProbe => write!(f, "Tenant API"),
        }
    }
}

/// Severity of a single check result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeStatus {
    Success,
    /// Failed, logged, run continues
    Advisory,
    /// Failed and ended the run
    Fatal,
    /// Not attempted
    Skipped,
}

/// Result of one diagnostic or pipeline check
#[derive(Debug, Clone, Serialize)]
pub struct CheckOutcome {
    pub check: CheckKind,
    pub target: String,
    pub status: OutcomeStatus,
    pub message: String,
    pub duration_ms: u64,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub details: Vec<String>,
}

impl CheckOutcome {
    fn new(check: CheckKind, target: &str, status: OutcomeStatus, message: String) -> Self {
        Self {
            check,
            target: target.to_string(),
            status,
            message,
            duration_ms: 0,
            details: Vec::new(),
        }
    }

    pub fn success(check: CheckKind, target: &str, message: impl Into<String>) -> Self {
        Self::new(check, target, OutcomeStatus::Success, message.into())
    }

    pub fn advisory(check: CheckKind, target: &str, message: impl Into<String>) -> Self {
        Self::new(check, target, OutcomeStatus::Advisory, message.into())
    }

    pub fn fatal(check: CheckKind, target: &str, message: impl Into<String>) -> Self {
        Self::new(check, target, OutcomeStatus::Fatal, message.into())
    }

    pub fn skipped(check: CheckKind, target: &str, message: impl Into<String>) -> Self {
        Self::new(check, target, OutcomeStatus::Skipped, message.into())
    }

    pub fn with_duration(mut self, start: Instant) -> Self {
        self.duration_ms = start.elapsed().as_millis() as u64;
        self
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.details.push(detail.into());
        self
    }

    pub fn is_success(&self) -> bool {
        self.status == OutcomeStatus::Success
    }

    /// Emit the outcome as a log record.
    pub fn log(&self) {
        match self.status {
            OutcomeStatus::Success => {
                info!(check = %self.check, endpoint = %self.target, "[OK] {}", self.message)
            }
            OutcomeStatus::Skipped => {
                info!(check = %self.check, endpoint = %self.target, "[SKIP] {}", self.message)
            }
            OutcomeStatus::Advisory => {
                warn!(check = %self.check, endpoint = %self.target, "[WARN] {}", self.message)
            }
            OutcomeStatus::Fatal => {
                error!(check = %self.check, endpoint = %self.target, "[FAIL] {}", self.message)
            }
        }
    }
}

/// A named endpoint to run the network checks against
#[derive(Debug, Clone)]
pub struct DiagnosticTarget {
    pub label: String,
    pub url: String,
}

impl DiagnosticTarget {
    pub fn new(label: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            url: url.into(),
        }
    }
}

/// Resolve `host` to at least one address.
pub async fn check_dns(host: &str, port: u16, timeout: Duration) -> CheckOutcome {
    let start = Instant::now();

    match tokio::time::timeout(timeout, tokio::net::lookup_host((host, port))).await {
        Ok(Ok(addrs)) => {
            let addresses: Vec<String> = addrs.map(|a| a.ip().to_string()).collect();
            if addresses.is_empty() {
                CheckOutcome::advisory(
                    CheckKind::Dns,
                    host,
                    format!("DNS resolution for {} returned no addresses", host),
                )
                .with_duration(start)
            } else {
                let mut outcome = CheckOutcome::success(
                    CheckKind::Dns,
                    host,
                    format!("DNS resolution successful for {}", host),
                );
                for addr in addresses {
                    outcome = outcome.with_detail(addr);
                }
                outcome.with_duration(start)
            }
        }
        Ok(Err(e)) => CheckOutcome::advisory(
            CheckKind::Dns,
            host,
            format!("DNS resolution failed for {}: {}", host, e),
        )
        .with_duration(start),
        Err(_) => CheckOutcome::advisory(
            CheckKind::Dns,
            host,
            format!("DNS resolution for {} timed out", host),
        )
        .with_duration(start),
    }
}

/// Dial `host:port` with a bounded timeout.
pub async fn check_tcp(host: &str, port: u16, timeout: Duration) -> CheckOutcome {
    let start = Instant::now();
    let target = format!("{}:{}", host, port);

    match tokio::time::timeout(timeout, TcpStream::connect((host, port))).await {
        Ok(Ok(stream)) => {
            drop(stream);
            CheckOutcome::success(
                CheckKind::Tcp,
                &target,
                format!("Network connectivity successful to {} on port {}", host, port),
            )
            .with_duration(start)
        }
        Ok(Err(e)) => CheckOutcome::advisory(
            CheckKind::Tcp,
            &target,
            format!("Connection to {} on port {} failed: {}", host, port, e),
        )
        .with_duration(start),
        Err(_) => CheckOutcome::advisory(
            CheckKind::Tcp,
            &target,
            format!(
                "Connection to {} on port {} timed out after {}s",
                host,
                port,
                timeout.as_secs()
            ),
        )
        .with_duration(start),
    }
}

/// Inspect the certificate chain presented by `host:port`.
pub async fn check_tls(host: &str, port: u16, timeout: Duration) -> CheckOutcome {
    let start = Instant::now();
    let target = format!("{}:{}", host, port);

    let inspection = match tls::inspect(host, port, timeout).await {
        Ok(i) => i,
        Err(e) => {
            return CheckOutcome::advisory(CheckKind::Tls, &target, e.to_string())
                .with_duration(start)
        }
    };

    let mut outcome = match evaluate_chain(&inspection.chain, Utc::now()) {
        ChainVerdict::Valid => {
            let mut outcome = CheckOutcome::success(
                CheckKind::Tls,
                &target,
                format!("Certificate chain for {} is within its validity period", host),
            );
            for cert in &inspection.chain {
                outcome = outcome.with_detail(format!(
                    "{} (valid from {} to {})",
                    cert.subject, cert.not_before, cert.not_after
                ));
            }
            outcome
        }
        ChainVerdict::Empty => CheckOutcome::advisory(
            CheckKind::Tls,
            &target,
            format!("{} presented no certificates", host),
        ),
        ChainVerdict::Expired { subject, not_after } => CheckOutcome::advisory(
            CheckKind::Tls,
            &target,
            format!("Certificate '{}' expired on {}", subject, not_after),
        ),
        ChainVerdict::NotYetValid {
            subject,
            not_before,
        } => CheckOutcome::advisory(
            CheckKind::Tls,
            &target,
            format!("Certificate '{}' not valid before {}", subject, not_before),
        ),
    };

    if let Some(protocol) = inspection.protocol {
        outcome = outcome.with_detail(format!("Protocol: {}", protocol));
    }

    if let Some(trust_error) = inspection.trust_error {
        if outcome.is_success() {
            outcome.status = OutcomeStatus::Advisory;
            outcome.message = format!("Certificate chain for {} is not trusted", host);
        }
        outcome = outcome.with_detail(format!("Verification: {}", trust_error));
    }

    outcome.with_duration(start)
}

/// Run DNS, TCP and TLS checks for each target. Every failure is advisory.
///
/// Targets sharing a host and port are checked once.
pub async fn run_diagnostics(
    targets: &[DiagnosticTarget],
    default_port: u16,
    timeout: Duration,
) -> Vec<CheckOutcome> {
    let mut outcomes = Vec::new();
    let mut seen = HashSet::new();

    for target in targets {
        let (host, port) = match host_and_port(&target.url, default_port) {
            Ok(hp) => hp,
            Err(e) => {
                let outcome = CheckOutcome::advisory(
                    CheckKind::Dns,
                    &target.url,
                    format!("Skipping network checks for {}: {}", target.label, e),
                );
                outcome.log();
                outcomes.push(outcome);
                continue;
            }
        };

        if !seen.insert((host.clone(), port)) {
            continue;
        }

        info!(label = %target.label, host = %host, port, "Running network diagnostics");

        let dns = check_dns(&host, port, timeout).await;
        dns.log();
        outcomes.push(dns);

        let tcp = check_tcp(&host, port, timeout).await;
        tcp.log();
        outcomes.push(tcp);

        let tls = if is_plain_http(&target.url) {
            CheckOutcome::skipped(
                CheckKind::Tls,
                &format!("{}:{}", host, port),
                format!("{} uses plain HTTP, no certificate to inspect", target.label),
            )
        } else {
            check_tls(&host, port, timeout).await
        };
        tls.log();
        outcomes.push(tls);
    }

    outcomes
}
