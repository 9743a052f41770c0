use thiserror::Error;

/// Exit codes for the CLI
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCode {
    /// Every required stage completed
    Success = 0,
    /// Usage, credential load, configuration or log setup failure
    Fatal = 1,
    /// Token exchange failed or returned an unusable response
    AuthFailure = 2,
    /// Gateway or authorization server unreachable
    NetworkFailure = 3,
    /// Requested tenant probe failed
    ProbeFailure = 4,
}

impl From<ExitCode> for i32 {
    fn from(code: ExitCode) -> i32 {
        code as i32
    }
}

/// Main error type for the application
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Failed to load credential file: {0}")]
    Load(String),

    #[error("Credential file is missing required fields: {}", .0.join(", "))]
    MissingFields(Vec<&'static str>),

    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("Invalid URL '{url}': {reason}")]
    Parse { url: String, reason: String },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Cannot reach {label} ({url}): {reason}")]
    Connectivity {
        label: String,
        url: String,
        reason: String,
    },

    #[error("Token request failed: {reason}")]
    TokenExchange { reason: String },

    #[error("Malformed token response: {0}")]
    MalformedResponse(String),

    #[error("Tenant API request to {url} failed: {reason}")]
    Probe { url: String, reason: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Logging setup failed: {0}")]
    Logging(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),
}

impl AppError {
    pub fn exit_code(&self) -> ExitCode {
        match self {
            AppError::Load(_)
            | AppError::MissingFields(_)
            | AppError::FileNotFound(_)
            | AppError::Config(_)
            | AppError::Logging(_)
            | AppError::TomlParse(_)
            | AppError::Io(_) => ExitCode::Fatal,
            AppError::TokenExchange { .. } | AppError::MalformedResponse(_) => {
                ExitCode::AuthFailure
            }
            AppError::Network(_) | AppError::Connectivity { .. } | AppError::Parse { .. } => {
                ExitCode::NetworkFailure
            }
            AppError::Probe { .. } => ExitCode::ProbeFailure,
        }
    }

    /// Short machine-readable name used in reports.
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::Load(_) | AppError::MissingFields(_) | AppError::FileNotFound(_) => "load",
            AppError::Parse { .. } => "parse",
            AppError::Network(_) => "network",
            AppError::Connectivity { .. } => "connectivity",
            AppError::TokenExchange { .. } => "token_exchange",
            AppError::MalformedResponse(_) => "malformed_response",
            AppError::Probe { .. } => "probe",
            AppError::Config(_) | AppError::TomlParse(_) => "config",
            AppError::Logging(_) => "logging",
            AppError::Io(_) => "io",
        }
    }
}

pub type Result<T> = std::result::Result<T, AppError>;

/// Short description of a failed HTTP exchange.
pub fn describe_request_error(error: &reqwest::Error) -> String {
    if error.is_timeout() {
        "request timed out".to_string()
    } else if error.is_connect() {
        format!("connection failed: {}", error)
    } else if error.is_body() || error.is_decode() {
        format!("failed to read response body: {}", error)
    } else {
        error.to_string()
    }
}
