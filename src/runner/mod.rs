//! Sequencing of the diagnostic and token acquisition run.
//!
//! Stages run strictly in order:
//!
//! `Init -> CredentialsLoaded -> DiagnosticsRun -> GatewayReachable -> TokenAcquired -> [ProbeRun] -> Done`
//!
//! DNS, TCP and TLS findings are advisory. An unreachable gateway or
//! authorization server, a failed token exchange and a failed requested tenant
//! probe end the run.

use serde::Serialize;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing::{debug, error, info};

use crate::auth::{api_client, fetch_token, AccessToken};
use crate::config::Config;
use crate::connectivity::{self, probe_client};
use crate::credentials::Credentials;
use crate::error::Result;
use crate::logging::SECRET_TARGET;
use crate::network::host::{extract_host, host_matches_domain};
use crate::network::{run_diagnostics, CheckKind, CheckOutcome, DiagnosticTarget};
use crate::output::RunReport;
use crate::tenant::{call_tenant_endpoint, tenant_url, TenantEndpoint};

pub const GATEWAY_LABEL: &str = "ION API Gateway";
pub const AUTH_SERVER_LABEL: &str = "Authorization Server";

/// Progress marker of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Init,
    CredentialsLoaded,
    DiagnosticsRun,
    GatewayReachable,
    TokenAcquired,
    ProbeRun,
    Done,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Stage::Init => write!(f, "init"),
            Stage::CredentialsLoaded => write!(f, "credentials loaded"),
            Stage::DiagnosticsRun => write!(f, "diagnostics run"),
            Stage::GatewayReachable => write!(f, "gateway reachable"),
            Stage::TokenAcquired => write!(f, "token acquired"),
            Stage::ProbeRun => write!(f, "tenant probe run"),
            Stage::Done => write!(f, "done"),
        }
    }
}

/// Resolved settings for one run
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    /// Path of the `.ionapi` file
    pub credential_file: PathBuf,
    /// Dump intermediate values
    pub debug: bool,
    /// Tenant endpoints to call after the token is acquired
    pub tenant_probes: Vec<TenantEndpoint>,
    /// Timeout for token and tenant requests
    pub request_timeout: Duration,
    /// Timeout for diagnostics and reachability probes
    pub diagnostic_timeout: Duration,
    pub default_port: u16,
    pub production_domains: Vec<String>,
}

impl RunnerConfig {
    /// Combine the settings file with command line values
    pub fn from_config(
        config: &Config,
        credential_file: PathBuf,
        debug: bool,
        tenant_probes: Vec<TenantEndpoint>,
    ) -> Self {
        Self {
            credential_file,
            debug,
            tenant_probes,
            request_timeout: Duration::from_secs(config.global.request_timeout_seconds),
            diagnostic_timeout: Duration::from_secs(config.global.diagnostic_timeout_seconds),
            default_port: config.gateway.default_port,
            production_domains: config.gateway.production_domains.clone(),
        }
    }
}

/// Drives a single run and records every outcome in a [`RunReport`]
pub struct Runner {
    config: RunnerConfig,
}

impl Runner {
    pub fn new(config: RunnerConfig) -> Self {
        Self { config }
    }

    /// Execute all stages. The report is returned on success and on failure.
    pub async fn run(&self) -> RunReport {
        let mut report = RunReport::start();

        match self.execute(&mut report).await {
            Ok(()) => {
                report.advance(Stage::Done);
                info!("All checks completed successfully");
            }
            Err(e) => {
                error!(stage = %report.stage, "{}", e);
                report.fail(&e);
            }
        }

        report.finish();
        report
    }

    async fn execute(&self, report: &mut RunReport) -> Result<()> {
        let credentials = Credentials::from_file(&self.config.credential_file)?;
        report.advance(Stage::CredentialsLoaded);
        info!(
            file = %self.config.credential_file.display(),
            tenant = %credentials.tenant_id,
            "Credential file loaded"
        );
        if self.config.debug {
            dump_credentials(&credentials);
        }

        let targets = [
            DiagnosticTarget::new(GATEWAY_LABEL, credentials.gateway_base_url.as_str()),
            DiagnosticTarget::new(AUTH_SERVER_LABEL, credentials.token_base_url.as_str()),
        ];

        let outcomes = run_diagnostics(
            &targets,
            self.config.default_port,
            self.config.diagnostic_timeout,
        )
        .await;
        report.record_all(outcomes);
        report.advance(Stage::DiagnosticsRun);

        let reachability = [
            DiagnosticTarget::new(GATEWAY_LABEL, credentials.gateway_base_url.as_str()),
            DiagnosticTarget::new(AUTH_SERVER_LABEL, credentials.token_url()),
        ];
        self.check_reachability(&reachability, report).await?;
        report.advance(Stage::GatewayReachable);

        let client = api_client(self.config.request_timeout)?;
        let token = self.acquire_token(&client, &credentials, report).await?;
        report.advance(Stage::TokenAcquired);

        self.run_tenant_probes(&client, &token, &credentials, report)
            .await
    }

    async fn check_reachability(
        &self,
        targets: &[DiagnosticTarget],
        report: &mut RunReport,
    ) -> Result<()> {
        let client = probe_client(self.config.diagnostic_timeout)?;

        for target in targets {
            let result = connectivity::probe(&client, &target.url, &target.label).await;
            let outcome = result.to_outcome();
            outcome.log();
            report.record(outcome);

            if !result.reachable {
                return Err(result.to_error());
            }
        }

        Ok(())
    }

    async fn acquire_token(
        &self,
        client: &reqwest::Client,
        credentials: &Credentials,
        report: &mut RunReport,
    ) -> Result<AccessToken> {
        let token_url = credentials.token_url();
        let start = Instant::now();

        match fetch_token(client, credentials).await {
            Ok(token) => {
                let outcome = CheckOutcome::success(
                    CheckKind::Token,
                    &token_url,
                    "Token acquired successfully",
                )
                .with_duration(start);
                outcome.log();
                report.record(outcome);

                if self.config.debug {
                    debug!(target: SECRET_TARGET, token = %token.secret(), "Access token");
                }
                Ok(token)
            }
            Err(e) => {
                report.record(
                    CheckOutcome::fatal(CheckKind::Token, &token_url, e.to_string())
                        .with_duration(start),
                );
                Err(e)
            }
        }
    }

    async fn run_tenant_probes(
        &self,
        client: &reqwest::Client,
        token: &AccessToken,
        credentials: &Credentials,
        report: &mut RunReport,
    ) -> Result<()> {
        if self.config.tenant_probes.is_empty() {
            info!("No tenant probe requested, skipping");
            return Ok(());
        }

        let gateway = &credentials.gateway_base_url;
        if !host_matches_domain(gateway, &self.config.production_domains) {
            let host = extract_host(gateway).unwrap_or_else(|_| gateway.clone());
            for endpoint in &self.config.tenant_probes {
                let outcome = CheckOutcome::skipped(
                    CheckKind::TenantProbe,
                    gateway,
                    format!(
                        "{} is not in a production domain ({}), skipping {} check",
                        host,
                        self.config.production_domains.join(", "),
                        endpoint
                    ),
                );
                outcome.log();
                report.record(outcome);
            }
            return Ok(());
        }

        for endpoint in &self.config.tenant_probes {
            let start = Instant::now();
            let target = tenant_url(gateway, &credentials.tenant_id, endpoint.path());

            match call_tenant_endpoint(
                client,
                token,
                gateway,
                &credentials.tenant_id,
                endpoint.path(),
            )
            .await
            {
                Ok(response) => {
                    let outcome = CheckOutcome::success(
                        CheckKind::TenantProbe,
                        &response.url,
                        format!("{} call succeeded (HTTP {})", endpoint, response.status),
                    )
                    .with_detail(response.body)
                    .with_duration(start);
                    outcome.log();
                    report.record(outcome);
                }
                Err(e) => {
                    report.record(
                        CheckOutcome::fatal(CheckKind::TenantProbe, &target, e.to_string())
                            .with_duration(start),
                    );
                    return Err(e);
                }
            }
        }

        report.advance(Stage::ProbeRun);
        Ok(())
    }
}

fn dump_credentials(credentials: &Credentials) {
    debug!(
        target: SECRET_TARGET,
        client_id = %credentials.client_id,
        client_secret = %credentials.client_secret,
        username = %credentials.username,
        password = %credentials.password,
        "Service account credentials"
    );
    debug!(
        token_base_url = %credentials.token_base_url,
        token_path = %credentials.token_path,
        token_url = %credentials.token_url(),
        gateway_base_url = %credentials.gateway_base_url,
        tenant_id = %credentials.tenant_id,
        "Credential endpoints"
    );
}
