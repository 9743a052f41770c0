use crate::config::OutputFormat;
use crate::error::{AppError, ExitCode};
use crate::network::{CheckOutcome, OutcomeStatus};
use crate::runner::Stage;
use chrono::{DateTime, Utc};
use console::{style, Style};
use serde::Serialize;
use std::io::Write;
use uuid::Uuid;

/// Outcome counts of a run
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunSummary {
    pub total: usize,
    pub passed: usize,
    pub warnings: usize,
    pub failed: usize,
    pub skipped: usize,
}

/// Fatal error that ended a run
#[derive(Debug, Clone, Serialize)]
pub struct Failure {
    /// Last stage reached before the failure
    pub after: Stage,
    pub kind: &'static str,
    pub message: String,
    pub exit_code: i32,
    #[serde(skip)]
    code: ExitCode,
}

/// Complete record of one run
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub total_duration_ms: u64,
    pub stage: Stage,
    pub summary: RunSummary,
    pub checks: Vec<CheckOutcome>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<Failure>,
}

impl RunReport {
    pub fn start() -> Self {
        Self {
            run_id: Uuid::new_v4(),
            started_at: Utc::now(),
            finished_at: None,
            total_duration_ms: 0,
            stage: Stage::Init,
            summary: RunSummary::default(),
            checks: Vec::new(),
            failure: None,
        }
    }

    pub fn advance(&mut self, stage: Stage) {
        self.stage = stage;
    }

    pub fn record(&mut self, outcome: CheckOutcome) {
        self.checks.push(outcome);
    }

    pub fn record_all(&mut self, outcomes: impl IntoIterator<Item = CheckOutcome>) {
        self.checks.extend(outcomes);
    }

    pub fn fail(&mut self, error: &AppError) {
        let code = error.exit_code();
        self.failure = Some(Failure {
            after: self.stage,
            kind: error.kind(),
            message: error.to_string(),
            exit_code: code.into(),
            code,
        });
    }

    /// Stamp the end time and count outcomes.
    pub fn finish(&mut self) {
        let now = Utc::now();
        self.total_duration_ms = (now - self.started_at).num_milliseconds().max(0) as u64;
        self.finished_at = Some(now);

        let mut summary = RunSummary {
            total: self.checks.len(),
            ..RunSummary::default()
        };
        for check in &self.checks {
            match check.status {
                OutcomeStatus::Success => summary.passed += 1,
                OutcomeStatus::Advisory => summary.warnings += 1,
                OutcomeStatus::Fatal => summary.failed += 1,
                OutcomeStatus::Skipped => summary.skipped += 1,
            }
        }
        self.summary = summary;
    }

    pub fn succeeded(&self) -> bool {
        self.failure.is_none()
    }

    pub fn exit_code(&self) -> ExitCode {
        self.failure
            .as_ref()
            .map(|f| f.code)
            .unwrap_or(ExitCode::Success)
    }
}

/// Output formatter trait
pub trait OutputFormatter {
    fn format(&self, report: &RunReport) -> String;
}

/// Human-readable console output formatter
pub struct HumanFormatter {
    use_colors: bool,
}

impl HumanFormatter {
    pub fn new(use_colors: bool) -> Self {
        Self { use_colors }
    }

    fn mark(&self, status: OutcomeStatus) -> String {
        let (plain, symbol, look) = match status {
            OutcomeStatus::Success => ("[PASS]", "\u{2713}", Style::new().green()), // ✓
            OutcomeStatus::Advisory => ("[WARN]", "!", Style::new().yellow()),
            OutcomeStatus::Fatal => ("[FAIL]", "\u{2717}", Style::new().red()), // ✗
            OutcomeStatus::Skipped => ("[SKIP]", "\u{25CB}", Style::new().dim()), // ○
        };
        if self.use_colors {
            look.apply_to(symbol).to_string()
        } else {
            plain.to_string()
        }
    }

    fn dim(&self, text: &str) -> String {
        if self.use_colors {
            style(text).dim().to_string()
        } else {
            text.to_string()
        }
    }
}

impl OutputFormatter for HumanFormatter {
    fn format(&self, report: &RunReport) -> String {
        let mut output = String::new();

        output.push_str("\nION API Connectivity Check\n");
        output.push_str("==================================================\n");
        output.push_str(&format!("Run {}\n\n", self.dim(&report.run_id.to_string())));

        for check in &report.checks {
            output.push_str(&format!(
                "  {} {:<12} {} ({}ms)\n",
                self.mark(check.status),
                check.check.to_string(),
                check.message,
                check.duration_ms
            ));
            for detail in &check.details {
                for line in detail.lines() {
                    output.push_str(&format!("      {}\n", self.dim(line)));
                }
            }
        }
        output.push('\n');

        output.push_str("Summary\n");
        if self.use_colors {
            output.push_str(&format!(
                "  Total: {} | {} | {} | {} | {}\n",
                style(report.summary.total).bold(),
                style(format!("Passed: {}", report.summary.passed)).green(),
                style(format!("Warnings: {}", report.summary.warnings)).yellow(),
                style(format!("Failed: {}", report.summary.failed)).red(),
                style(format!("Skipped: {}", report.summary.skipped)).dim()
            ));
        } else {
            output.push_str(&format!(
                "  Total: {} | Passed: {} | Warnings: {} | Failed: {} | Skipped: {}\n",
                report.summary.total,
                report.summary.passed,
                report.summary.warnings,
                report.summary.failed,
                report.summary.skipped
            ));
        }
        output.push_str(&format!("  Duration: {}ms\n", report.total_duration_ms));

        match &report.failure {
            None => {
                let result = "Result: passed";
                if self.use_colors {
                    output.push_str(&format!("  {}\n", style(result).green().bold()));
                } else {
                    output.push_str(&format!("  {}\n", result));
                }
            }
            Some(failure) => {
                let result = format!("Result: failed after stage '{}'", failure.after);
                if self.use_colors {
                    output.push_str(&format!("  {}\n", style(result).red().bold()));
                    output.push_str(&format!(
                        "    {} {}\n",
                        style("\u{2192}").dim(), // →
                        style(&failure.message).red()
                    ));
                } else {
                    output.push_str(&format!("  {}\n", result));
                    output.push_str(&format!("    -> {}\n", failure.message));
                }
            }
        }

        output
    }
}

/// JSON output formatter
pub struct JsonFormatter {
    pretty: bool,
}

impl JsonFormatter {
    pub fn new(pretty: bool) -> Self {
        Self { pretty }
    }
}

impl OutputFormatter for JsonFormatter {
    fn format(&self, report: &RunReport) -> String {
        let rendered = if self.pretty {
            serde_json::to_string_pretty(report)
        } else {
            serde_json::to_string(report)
        };
        let mut output = rendered.unwrap_or_else(|e| format!("{{\"error\": \"{}\"}}", e));
        output.push('\n');
        output
    }
}

/// Get formatter based on output format
pub fn get_formatter(format: OutputFormat, use_colors: bool) -> Box<dyn OutputFormatter> {
    match format {
        OutputFormat::Human => Box::new(HumanFormatter::new(use_colors)),
        OutputFormat::Json => Box::new(JsonFormatter::new(true)),
    }
}

/// Write the formatted report to stdout
pub fn write_output(output: &str) -> std::io::Result<()> {
    let mut stdout = std::io::stdout().lock();
    stdout.write_all(output.as_bytes())?;
    stdout.flush()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::CheckKind;

    fn create_report(failed: bool) -> RunReport {
        let mut report = RunReport::start();
        report.advance(Stage::CredentialsLoaded);
        report.record(
            CheckOutcome::success(
                CheckKind::Dns,
                "mingle-ionapi.inforcloudsuite.com",
                "DNS resolution successful",
            )
            .with_detail("203.0.113.7"),
        );
        report.record(CheckOutcome::advisory(
            CheckKind::Tls,
            "mingle-ionapi.inforcloudsuite.com:443",
            "Certificate 'CN=old' expired on 2020-01-01 00:00:00 UTC",
        ));
        report.advance(Stage::DiagnosticsRun);
        report.advance(Stage::GatewayReachable);
        if failed {
            report.record(CheckOutcome::fatal(
                CheckKind::Token,
                "https://mingle-sso.inforcloudsuite.com:443/ACME_PRD/as/token.oauth2",
                "Token request failed: HTTP status 403 Forbidden",
            ));
            report.fail(&AppError::TokenExchange {
                reason: "HTTP status 403 Forbidden".to_string(),
            });
        } else {
            report.advance(Stage::Done);
        }
        report.finish();
        report
    }

    #[test]
    fn test_summary_counts() {
        let report = create_report(true);
        assert_eq!(report.summary.total, 3);
        assert_eq!(report.summary.passed, 1);
        assert_eq!(report.summary.warnings, 1);
        assert_eq!(report.summary.failed, 1);
        assert!(report.finished_at.is_some());
    }

    #[test]
    fn test_exit_code_follows_failure() {
        assert_eq!(create_report(false).exit_code(), ExitCode::Success);
        let report = create_report(true);
        assert!(!report.succeeded());
        assert_eq!(report.exit_code(), ExitCode::AuthFailure);
        let failure = report.failure.unwrap();
        assert_eq!(failure.after, Stage::GatewayReachable);
        assert_eq!(failure.kind, "token_exchange");
    }

    #[test]
    fn test_human_formatter() {
        let report = create_report(true);
        let output = HumanFormatter::new(false).format(&report);

        assert!(output.contains("ION API Connectivity Check"));
        assert!(output.contains("[PASS] DNS"));
        assert!(output.contains("[WARN] TLS"));
        assert!(output.contains("[FAIL] Token"));
        assert!(output.contains("203.0.113.7"));
        assert!(output.contains("Result: failed after stage 'gateway reachable'"));
        assert!(output.contains("-> Token request failed: HTTP status 403 Forbidden"));
    }

    #[test]
    fn test_human_formatter_success() {
        let output = HumanFormatter::new(false).format(&create_report(false));
        assert!(output.contains("Result: passed"));
        assert!(!output.contains("[FAIL]"));
    }

    #[test]
    fn test_json_formatter() {
        let report = create_report(true);
        let output = JsonFormatter::new(true).format(&report);

        let parsed: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(parsed["summary"]["total"], 3);
        assert_eq!(parsed["stage"], "gateway_reachable");
        assert_eq!(parsed["checks"][1]["status"], "advisory");
        assert_eq!(parsed["failure"]["exit_code"], 2);
        assert_eq!(parsed["run_id"], report.run_id.to_string());
    }

    #[test]
    fn test_json_formatter_omits_failure_on_success() {
        let output = JsonFormatter::new(false).format(&create_report(false));
        let parsed: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert!(parsed.get("failure").is_none());
        assert_eq!(parsed["stage"], "done");
    }
}
