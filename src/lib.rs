//! ION API Gateway Connectivity Check
//!
//! A CLI tool that validates an `.ionapi` credential file against the ION API
//! gateway before a client application attempts real integration work.
//!
//! # Run sequence
//!
//! - **Credentials** - load and validate the eight-key credential bundle
//! - **Diagnostics** - DNS, TCP and TLS checks of the gateway and authorization server (advisory)
//! - **Reachability** - HEAD probes of the gateway and authorization server (fatal)
//! - **Token** - OAuth2 password grant against the authorization server (fatal)
//! - **Tenant probe** - optional bearer-authenticated call to a tenant endpoint
//!
//! # Example Usage
//!
//! ```bash
//! # Check connectivity and acquire a token
//! ionapi-probe ACME_PRD.ionapi
//!
//! # Also call the M3 version endpoint, with verbose logging
//! ionapi-probe ACME_PRD.ionapi --check_m3 --debug
//!
//! # Machine-readable report
//! ionapi-probe ACME_PRD.ionapi --output json
//! ```

pub mod auth;
pub mod cli;
pub mod config;
pub mod connectivity;
pub mod credentials;
pub mod error;
pub mod logging;
pub mod network;
pub mod output;
pub mod runner;
pub mod tenant;

pub use cli::Cli;
pub use config::{Config, OutputFormat};
pub use credentials::Credentials;
pub use error::{AppError, ExitCode, Result};
pub use output::{get_formatter, RunReport};
pub use runner::{Runner, RunnerConfig, Stage};
pub use tenant::TenantEndpoint;
