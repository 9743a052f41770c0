//! The `.ionapi` credential bundle.
//!
//! The file is a JSON object using the abbreviated keys issued by the ION API
//! administration console. All eight keys are required and must be non-empty.

use serde::Deserialize;
use std::fmt;
use std::path::Path;

use crate::error::{AppError, Result};

/// Parsed `.ionapi` credential bundle. Read-only once loaded.
#[derive(Clone, Deserialize)]
pub struct Credentials {
    /// Client id of the calling application
    #[serde(rename = "ci", default)]
    pub client_id: String,
    /// Client secret of the calling application
    #[serde(rename = "cs", default)]
    pub client_secret: String,
    /// Authorization server base URL
    #[serde(rename = "pu", default)]
    pub token_base_url: String,
    /// Token path appended to `token_base_url`
    #[serde(rename = "ot", default)]
    pub token_path: String,
    /// Service account access key, used as the password-grant username
    #[serde(rename = "saak", default)]
    pub username: String,
    /// Service account secret key, used as the password-grant password
    #[serde(rename = "sask", default)]
    pub password: String,
    /// ION API gateway base URL
    #[serde(rename = "iu", default)]
    pub gateway_base_url: String,
    /// Tenant identifier
    #[serde(rename = "ti", default)]
    pub tenant_id: String,
}

impl Credentials {
    /// Load and validate a credential file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                AppError::FileNotFound(path.display().to_string())
            } else {
                AppError::Load(format!("{}: {}", path.display(), e))
            }
        })?;
        Self::from_json(&content)
    }

    /// Parse and validate credential JSON.
    pub fn from_json(content: &str) -> Result<Self> {
        let credentials: Credentials =
            serde_json::from_str(content).map_err(|e| AppError::Load(e.to_string()))?;
        credentials.validate()?;
        Ok(credentials)
    }

    fn validate(&self) -> Result<()> {
        let fields = [
            ("ci", &self.client_id),
            ("cs", &self.client_secret),
            ("pu", &self.token_base_url),
            ("ot", &self.token_path),
            ("saak", &self.username),
            ("sask", &self.password),
            ("iu", &self.gateway_base_url),
            ("ti", &self.tenant_id),
        ];

        let missing: Vec<&'static str> = fields
            .iter()
            .filter(|(_, value)| value.is_empty())
            .map(|(key, _)| *key)
            .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(AppError::MissingFields(missing))
        }
    }

    /// Token endpoint: `pu` followed directly by `ot`.
    ///
    /// No separator is inserted; the operator is responsible for the slashes.
    pub fn token_url(&self) -> String {
        format!("{}{}", self.token_base_url, self.token_path)
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("token_base_url", &self.token_base_url)
            .field("token_path", &self.token_path)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("gateway_base_url", &self.gateway_base_url)
            .field("tenant_id", &self.tenant_id)
            .finish()
    }
}
