//! OAuth2 resource-owner password grant against the ION authorization server.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use reqwest::header::AUTHORIZATION;
use reqwest::Client;
use serde::Serialize;
use std::fmt;
use std::time::Duration;
use tracing::debug;

use crate::credentials::Credentials;
use crate::error::{describe_request_error, AppError, Result};
use crate::logging::SECRET_TARGET;

/// Bearer token issued by the authorization server. Never persisted.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken(String);

impl AccessToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// The raw token value.
    pub fn secret(&self) -> &str {
        &self.0
    }

    /// `Authorization` header value.
    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.0)
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AccessToken(<{} chars>)", self.0.len())
    }
}

/// Form body of the password grant request
#[derive(Serialize)]
struct PasswordGrantForm<'a> {
    grant_type: &'static str,
    username: &'a str,
    password: &'a str,
    scope: &'static str,
}

impl<'a> PasswordGrantForm<'a> {
    fn new(credentials: &'a Credentials) -> Self {
        Self {
            grant_type: "password",
            username: &credentials.username,
            password: &credentials.password,
            scope: "",
        }
    }

    fn encode(&self) -> Result<String> {
        serde_urlencoded::to_string(self)
            .map_err(|e| AppError::Load(format!("Failed to encode token request: {}", e)))
    }

    /// Encoded body with the password masked, for debug output.
    fn encode_masked(&self) -> Result<String> {
        PasswordGrantForm {
            password: "********",
            ..*self
        }
        .encode()
    }
}

/// Build the client used for token and tenant requests.
pub fn api_client(timeout: Duration) -> Result<Client> {
    Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| AppError::Network(e.to_string()))
}

/// `Basic base64(client_id:client_secret)`
pub fn basic_authorization(client_id: &str, client_secret: &str) -> String {
    let encoded = BASE64.encode(format!("{}:{}", client_id, client_secret));
    format!("Basic {}", encoded)
}

/// Exchange the service-account credentials for a bearer token.
///
/// A single attempt is made; any failure is returned to the caller.
pub async fn fetch_token(client: &Client, credentials: &Credentials) -> Result<AccessToken> {
    let token_url = credentials.token_url();
    let form = PasswordGrantForm::new(credentials);

    debug!(url = %token_url, form = %form.encode_masked()?, "Sending token request");

    let response = client
        .post(&token_url)
        .header(
            AUTHORIZATION,
            basic_authorization(&credentials.client_id, &credentials.client_secret),
        )
        .form(&form)
        .send()
        .await
        .map_err(|e| token_error(&e))?;

    let status = response.status();
    if status != reqwest::StatusCode::OK {
        return Err(AppError::TokenExchange {
            reason: format!("HTTP status {}", status),
        });
    }

    let raw = response.text().await.map_err(|e| token_error(&e))?;
    debug!(target: SECRET_TARGET, response = %raw, "Raw token response");

    parse_token_response(&raw)
}

fn token_error(error: &reqwest::Error) -> AppError {
    AppError::TokenExchange {
        reason: describe_request_error(error),
    }
}

/// Pull `access_token` out of a token endpoint response body.
pub fn parse_token_response(raw: &str) -> Result<AccessToken> {
    let value: serde_json::Value = serde_json::from_str(raw)
        .map_err(|e| AppError::MalformedResponse(format!("response is not JSON: {}", e)))?;

    if !value.is_object() {
        return Err(AppError::MalformedResponse(
            "response is not a JSON object".to_string(),
        ));
    }

    value
        .get("access_token")
        .and_then(serde_json::Value::as_str)
        .filter(|token| !token.is_empty())
        .map(AccessToken::new)
        .ok_or_else(|| AppError::MalformedResponse("no access_token found in response".to_string()))
}
