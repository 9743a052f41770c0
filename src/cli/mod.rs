use clap::{Parser, ValueEnum};
use std::path::PathBuf;

use crate::tenant::TenantEndpoint;

/// ION API gateway connectivity and token acquisition check
#[derive(Parser, Debug)]
#[command(name = "ionapi-probe")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to the .ionapi credential file
    pub credential_file: PathBuf,

    /// Log intermediate values, including secrets on the console
    #[arg(long, default_value_t = false)]
    pub debug: bool,

    /// Call the M3 version endpoint after acquiring a token
    #[arg(long = "check_m3", default_value_t = false)]
    pub check_m3: bool,

    /// Call the OS portal applications endpoint after acquiring a token
    #[arg(long = "check_portal", default_value_t = false)]
    pub check_portal: bool,

    /// Path to configuration file
    #[arg(short, long, env = "IONAPI_PROBE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Log file (appended to)
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// Report format
    #[arg(short, long, value_enum)]
    pub output: Option<OutputFormatArg>,

    /// Timeout in seconds for token and tenant API requests
    #[arg(long)]
    pub timeout: Option<u64>,
}

impl Cli {
    /// Tenant endpoints requested on the command line, in run order.
    pub fn tenant_probes(&self) -> Vec<TenantEndpoint> {
        let mut probes = Vec::new();
        if self.check_m3 {
            probes.push(TenantEndpoint::M3Version);
        }
        if self.check_portal {
            probes.push(TenantEndpoint::PortalApplications);
        }
        probes
    }
}

#[derive(ValueEnum, Clone, Debug, Default)]
pub enum OutputFormatArg {
    #[default]
    Human,
    Json,
}

impl From<OutputFormatArg> for crate::config::OutputFormat {
    fn from(arg: OutputFormatArg) -> Self {
        match arg {
            OutputFormatArg::Human => crate::config::OutputFormat::Human,
            OutputFormatArg::Json => crate::config::OutputFormat::Json,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::error::ErrorKind;

    #[test]
    fn test_minimal_invocation() {
        let cli = Cli::try_parse_from(["ionapi-probe", "ACME.ionapi"]).unwrap();
        assert_eq!(cli.credential_file, PathBuf::from("ACME.ionapi"));
        assert!(!cli.debug);
        assert!(cli.tenant_probes().is_empty());
        assert!(cli.output.is_none());
    }

    #[test]
    fn test_flags_keep_underscore_names() {
        let cli = Cli::try_parse_from([
            "ionapi-probe",
            "ACME.ionapi",
            "--debug",
            "--check_portal",
            "--check_m3",
        ])
        .unwrap();
        assert!(cli.debug);
        assert_eq!(
            cli.tenant_probes(),
            vec![TenantEndpoint::M3Version, TenantEndpoint::PortalApplications]
        );
    }

    #[test]
    fn test_options() {
        let cli = Cli::try_parse_from([
            "ionapi-probe",
            "ACME.ionapi",
            "--output",
            "json",
            "--timeout",
            "10",
            "--log-file",
            "/tmp/run.log",
        ])
        .unwrap();
        assert!(matches!(cli.output, Some(OutputFormatArg::Json)));
        assert_eq!(cli.timeout, Some(10));
        assert_eq!(cli.log_file, Some(PathBuf::from("/tmp/run.log")));
    }

    #[test]
    fn test_missing_credential_file_is_usage_error() {
        let err = Cli::try_parse_from(["ionapi-probe"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MissingRequiredArgument);
    }
}
