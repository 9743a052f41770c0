use reqwest::header::{ACCEPT, AUTHORIZATION};
use reqwest::Client;
use tracing::debug;

use crate::auth::AccessToken;
use crate::error::{describe_request_error, AppError, Result};
use crate::logging::SECRET_TARGET;

/// Fixed tenant-scoped endpoints that can be probed after token acquisition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TenantEndpoint {
    /// M3 version check through the M3 REST API
    M3Version,
    /// Application list of the OS portal
    PortalApplications,
}

impl TenantEndpoint {
    pub fn path(&self) -> &'static str {
        match self {
            TenantEndpoint::M3Version => {
                "M3/m3api-rest/v2/execute/CMS535MI/FpwVersion?dateformat=YMD8&excludeempty=false&righttrim=true&format=PRETTY&extendedresult=false"
            }
            TenantEndpoint::PortalApplications => "OSPORTAL/admin/v1/user/applications",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            TenantEndpoint::M3Version => "M3 API",
            TenantEndpoint::PortalApplications => "OS Portal API",
        }
    }
}

impl std::fmt::Display for TenantEndpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// Raw response of a tenant probe
#[derive(Debug, Clone)]
pub struct TenantResponse {
    pub url: String,
    pub status: u16,
    pub body: String,
}

/// `{gateway}/{tenant}/{path}` with one slash at each join.
pub fn tenant_url(gateway_base_url: &str, tenant_id: &str, path: &str) -> String {
    format!(
        "{}/{}/{}",
        gateway_base_url.trim_end_matches('/'),
        tenant_id,
        path.trim_start_matches('/')
    )
}

/// GET a tenant endpoint with the bearer token. Anything but 200 fails.
pub async fn call_tenant_endpoint(
    client: &Client,
    token: &AccessToken,
    gateway_base_url: &str,
    tenant_id: &str,
    path: &str,
) -> Result<TenantResponse> {
    let url = tenant_url(gateway_base_url, tenant_id, path);

    debug!(url = %url, "Sending tenant API request");

    let response = client
        .get(&url)
        .header(AUTHORIZATION, token.bearer())
        .header(ACCEPT, "application/json")
        .send()
        .await
        .map_err(|e| AppError::Probe {
            url: url.clone(),
            reason: describe_request_error(&e),
        })?;

    let status = response.status();
    if status != reqwest::StatusCode::OK {
        return Err(AppError::Probe {
            url,
            reason: format!("HTTP status {}", status),
        });
    }

    let body = response.text().await.map_err(|e| AppError::Probe {
        url: url.clone(),
        reason: describe_request_error(&e),
    })?;
    debug!(target: SECRET_TARGET, url = %url, body = %body, "Tenant API response");

    Ok(TenantResponse {
        url,
        status: status.as_u16(),
        body,
    })
}
