//! Access token refresh
//!
//! POSTs the stored refresh token to the backend's refresh endpoint and
//! returns the new access token. This call goes straight to reqwest and never
//! through the client's interceptor chain, so a 401 from the refresh endpoint
//! can't queue behind the refresh it belongs to.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::constants::REFRESH_PATH;
use crate::error::{Error, Result};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RefreshRequest<'a> {
    refresh_token: &'a str,
}

/// Response body of the refresh endpoint.
#[derive(Debug, Deserialize, Serialize)]
pub struct RefreshResponse {
    pub token: String,
}

/// Full refresh URL for a base URL (trailing slashes tolerated).
pub fn refresh_url(base_url: &str) -> String {
    format!("{}{}", base_url.trim_end_matches('/'), REFRESH_PATH)
}

/// Exchange a refresh token for a new access token.
pub async fn refresh_access_token(
    client: &reqwest::Client,
    base_url: &str,
    refresh: &str,
    timeout: Duration,
) -> Result<RefreshResponse> {
    let response = client
        .post(refresh_url(base_url))
        .timeout(timeout)
        .json(&RefreshRequest {
            refresh_token: refresh,
        })
        .send()
        .await
        .map_err(|e| {
            if e.is_timeout() {
                Error::Timeout(e.to_string())
            } else {
                Error::Network(e.to_string())
            }
        })?;

    let status = response.status();
    if !status.is_success() {
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| String::from("<no body>"));
        return Err(Error::Rejected {
            status: status.as_u16(),
            body,
        });
    }

    let parsed = response
        .json::<RefreshResponse>()
        .await
        .map_err(|e| Error::InvalidResponse(e.to_string()))?;

    if parsed.token.is_empty() {
        return Err(Error::InvalidResponse("empty token".into()));
    }
    Ok(parsed)
}
