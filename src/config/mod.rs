use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::error::{AppError, Result};

/// Output format for the run report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Human,
    Json,
}

/// Global configuration settings
#[derive(Debug, Clone, Deserialize)]
pub struct GlobalConfig {
    /// Timeout for token and tenant API requests
    #[serde(default = "default_request_timeout")]
    pub request_timeout_seconds: u64,
    /// Timeout for DNS, TCP, TLS and reachability checks
    #[serde(default = "default_diagnostic_timeout")]
    pub diagnostic_timeout_seconds: u64,
    #[serde(default = "default_log_file")]
    pub log_file: PathBuf,
    #[serde(default)]
    pub output_format: OutputFormat,
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            request_timeout_seconds: default_request_timeout(),
            diagnostic_timeout_seconds: default_diagnostic_timeout(),
            log_file: default_log_file(),
            output_format: OutputFormat::Human,
        }
    }
}

fn default_request_timeout() -> u64 {
    30
}

fn default_diagnostic_timeout() -> u64 {
    5
}

fn default_log_file() -> PathBuf {
    PathBuf::from("ionapi-probe.log")
}

/// Gateway-specific settings
#[derive(Debug, Clone, Deserialize)]
pub struct GatewayConfig {
    /// Domain suffixes on which tenant probes are attempted
    #[serde(default = "default_production_domains")]
    pub production_domains: Vec<String>,
    /// Port used when a URL carries neither an explicit nor a scheme port
    #[serde(default = "default_port")]
    pub default_port: u16,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            production_domains: default_production_domains(),
            default_port: default_port(),
        }
    }
}

fn default_production_domains() -> Vec<String> {
    vec!["inforcloudsuite.com".to_string()]
}

fn default_port() -> u16 {
    443
}

/// Complete application configuration
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub global: GlobalConfig,
    #[serde(default)]
    pub gateway: GatewayConfig,
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                AppError::FileNotFound(path.display().to_string())
            } else {
                AppError::Io(e)
            }
        })?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Create a default configuration
    pub fn default_config() -> Self {
        Config::default()
    }

    /// Apply environment variable overrides
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        self.apply_overrides(|name| std::env::var(name).ok())
    }

    fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(path) = lookup("IONAPI_PROBE_LOG_FILE") {
            self.global.log_file = PathBuf::from(path);
        }

        if let Some(timeout) = lookup("IONAPI_PROBE_REQUEST_TIMEOUT") {
            self.global.request_timeout_seconds = timeout.trim().parse().map_err(|_| {
                AppError::Config(format!(
                    "IONAPI_PROBE_REQUEST_TIMEOUT must be a number of seconds, got '{}'",
                    timeout
                ))
            })?;
        }

        if let Some(domains) = lookup("IONAPI_PROBE_PRODUCTION_DOMAINS") {
            self.gateway.production_domains = domains
                .split(',')
                .map(str::trim)
                .filter(|d| !d.is_empty())
                .map(String::from)
                .collect();
        }

        Ok(())
    }

    /// Reject settings the runner cannot work with.
    pub fn validate(&self) -> Result<()> {
        if self.global.request_timeout_seconds == 0 {
            return Err(AppError::Config(
                "request_timeout_seconds must be greater than zero".to_string(),
            ));
        }
        if self.global.diagnostic_timeout_seconds == 0 {
            return Err(AppError::Config(
                "diagnostic_timeout_seconds must be greater than zero".to_string(),
            ));
        }
        if self.gateway.production_domains.is_empty() {
            return Err(AppError::Config(
                "at least one production domain is required".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = Config::default_config();
        assert_eq!(config.global.request_timeout_seconds, 30);
        assert_eq!(config.global.diagnostic_timeout_seconds, 5);
        assert_eq!(config.global.log_file, PathBuf::from("ionapi-probe.log"));
        assert_eq!(config.gateway.production_domains, vec!["inforcloudsuite.com"]);
        assert_eq!(config.gateway.default_port, 443);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_unknown_output_format_in_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[global]\noutput_format = \"junit\"").unwrap();

        let err = Config::from_file(file.path()).unwrap_err();
        assert!(matches!(err, AppError::TomlParse(_)));
        assert_eq!(err.kind(), "config");
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[global]\nrequest_timeout_seconds = 10\noutput_format = \"json\"\n\n[gateway]\nproduction_domains = [\"example.net\"]"
        )
        .unwrap();

        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.global.request_timeout_seconds, 10);
        assert_eq!(config.global.diagnostic_timeout_seconds, 5);
        assert_eq!(config.global.output_format, OutputFormat::Json);
        assert_eq!(config.gateway.production_domains, vec!["example.net"]);
        assert_eq!(config.gateway.default_port, 443);
    }

    #[test]
    fn test_missing_file() {
        let err = Config::from_file(Path::new("/nonexistent/ionapi-probe.toml")).unwrap_err();
        assert!(matches!(err, AppError::FileNotFound(_)));
    }

    #[test]
    fn test_overrides() {
        let env: HashMap<&str, &str> = [
            ("IONAPI_PROBE_LOG_FILE", "/tmp/probe.log"),
            ("IONAPI_PROBE_REQUEST_TIMEOUT", " 12 "),
            ("IONAPI_PROBE_PRODUCTION_DOMAINS", "inforcloudsuite.com, 127.0.0.1,,"),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default_config();
        config
            .apply_overrides(|name| env.get(name).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.global.log_file, PathBuf::from("/tmp/probe.log"));
        assert_eq!(config.global.request_timeout_seconds, 12);
        assert_eq!(
            config.gateway.production_domains,
            vec!["inforcloudsuite.com", "127.0.0.1"]
        );
    }

    #[test]
    fn test_bad_timeout_override() {
        let mut config = Config::default_config();
        let err = config
            .apply_overrides(|name| (name == "IONAPI_PROBE_REQUEST_TIMEOUT").then(|| "soon".to_string()))
            .unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
    }

    #[test]
    fn test_validate_rejects_zero_timeout_and_empty_domains() {
        let mut config = Config::default_config();
        config.global.request_timeout_seconds = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default_config();
        config.gateway.production_domains.clear();
        assert!(config.validate().is_err());
    }
}
