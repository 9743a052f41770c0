use reqwest::Client;
use std::time::{Duration, Instant};

use crate::error::{describe_request_error, AppError, Result};
use crate::network::{CheckKind, CheckOutcome};

/// Result of a reachability probe
#[derive(Debug, Clone)]
pub struct ConnectivityResult {
    pub label: String,
    pub url: String,
    pub reachable: bool,
    pub status: Option<u16>,
    pub duration_ms: u64,
    pub error: Option<String>,
}

impl ConnectivityResult {
    /// Convert into a pipeline outcome; unreachable endpoints are fatal.
    pub fn to_outcome(&self) -> CheckOutcome {
        let status = self
            .status
            .map(|s| format!(" (HTTP {})", s))
            .unwrap_or_default();

        let mut outcome = if self.reachable {
            CheckOutcome::success(
                CheckKind::Connectivity,
                &self.url,
                format!("Successfully connected to {}{}", self.label, status),
            )
        } else {
            CheckOutcome::fatal(
                CheckKind::Connectivity,
                &self.url,
                format!("Cannot reach {}{}", self.label, status),
            )
        };
        outcome.duration_ms = self.duration_ms;
        if let Some(error) = &self.error {
            outcome = outcome.with_detail(error.clone());
        }
        outcome
    }

    /// Error describing why the endpoint is unreachable.
    pub fn to_error(&self) -> AppError {
        let reason = match (&self.error, self.status) {
            (Some(error), _) => error.clone(),
            (None, Some(status)) => format!("unexpected status {}", status),
            (None, None) => "no response".to_string(),
        };
        AppError::Connectivity {
            label: self.label.clone(),
            url: self.url.clone(),
            reason,
        }
    }
}

/// Statuses in `[200, 400)` count as reachable.
pub fn is_reachable_status(status: u16) -> bool {
    (200..400).contains(&status)
}

/// Build the short-timeout client used for reachability probes.
pub fn probe_client(timeout: Duration) -> Result<Client> {
    Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| AppError::Network(e.to_string()))
}

/// Issue a HEAD request to `url` and classify the response.
pub async fn probe(client: &Client, url: &str, label: &str) -> ConnectivityResult {
    let start = Instant::now();

    let (status, error) = match client.head(url).send().await {
        Ok(response) => (Some(response.status().as_u16()), None),
        Err(e) => (e.status().map(|s| s.as_u16()), Some(describe_request_error(&e))),
    };

    ConnectivityResult {
        label: label.to_string(),
        url: url.to_string(),
        reachable: error.is_none() && status.map(is_reachable_status).unwrap_or(false),
        status,
        duration_ms: start.elapsed().as_millis() as u64,
        error,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::OutcomeStatus;
    use httpmock::prelude::*;

    #[test]
    fn test_status_classification() {
        for status in [200, 201, 204, 301, 302, 304, 399] {
            assert!(is_reachable_status(status), "{} should be reachable", status);
        }
        for status in [100, 199, 400, 401, 403, 404, 405, 500, 503] {
            assert!(!is_reachable_status(status), "{} should be unreachable", status);
        }
    }

    #[tokio::test]
    async fn test_probe_classifies_live_statuses() {
        let server = MockServer::start_async().await;
        let cases = [
            ("/ok", 200, true),
            ("/empty", 204, true),
            ("/unchanged", 304, true),
            ("/missing", 404, false),
            ("/denied", 403, false),
            ("/broken", 500, false),
        ];
        for (path, status, _) in cases {
            server
                .mock_async(|when, then| {
                    when.method("HEAD").path(path);
                    then.status(status);
                })
                .await;
        }

        let client = probe_client(Duration::from_secs(5)).unwrap();
        for (path, status, expected) in cases {
            let result = probe(&client, &server.url(path), "ION API Gateway").await;
            assert_eq!(result.status, Some(status));
            assert_eq!(result.reachable, expected, "status {}", status);
        }
    }

    #[tokio::test]
    async fn test_probe_transport_error_is_unreachable() {
        let client = probe_client(Duration::from_secs(2)).unwrap();
        let result = probe(&client, "http://127.0.0.1:1/", "Authorization Server").await;
        assert!(!result.reachable);
        assert!(result
            .error
            .as_deref()
            .is_some_and(|e| e.starts_with("connection failed")));

        let outcome = result.to_outcome();
        assert_eq!(outcome.status, OutcomeStatus::Fatal);
        assert!(outcome.message.contains("Authorization Server"));
        assert!(matches!(result.to_error(), AppError::Connectivity { .. }));
    }

    #[tokio::test]
    async fn test_reachable_outcome_mentions_status() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method("HEAD").path("/");
                then.status(200);
            })
            .await;

        let client = probe_client(Duration::from_secs(5)).unwrap();
        let result = probe(&client, &server.url("/"), "ION API Gateway").await;
        let outcome = result.to_outcome();
        assert!(outcome.is_success());
        assert!(outcome.message.contains("HTTP 200"));
    }
}
