// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Server-to-server OAuth token acquisition for the QSS websocket.
//!
//! See <https://developers.zoom.us/docs/internal-apps/>.

use std::time::Duration;

use base64::Engine;
use serde::Deserialize;
use tracing::debug;

use crate::error::OAuthError;

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

/// Client for the account-credentials grant.
#[derive(Debug, Clone)]
pub struct TokenClient {
    client: reqwest::Client,
    oauth_url: String,
    account_id: String,
    client_id: String,
    client_secret: String,
}

impl TokenClient {
    pub fn new(
        oauth_url: String,
        account_id: String,
        client_id: String,
        client_secret: String,
        timeout: Duration,
    ) -> Result<Self, OAuthError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(TokenClient {
            client,
            oauth_url,
            account_id,
            client_id,
            client_secret,
        })
    }

    /// Requests a fresh access token.
    pub async fn fetch_access_token(&self) -> Result<String, OAuthError> {
        let params = [
            ("grant_type", "account_credentials"),
            ("account_id", self.account_id.as_str()),
        ];
        let resp = self
            .client
            .post(&self.oauth_url)
            .header(
                reqwest::header::AUTHORIZATION,
                format!("Basic {}", self.basic_credentials()),
            )
            .form(&params)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(OAuthError::Status(status.as_u16()));
        }
        let token: TokenResponse = resp.json().await?;
        debug!("OAUTH | Acquired QSS access token");
        Ok(token.access_token)
    }

    fn basic_credentials(&self) -> String {
        base64::engine::general_purpose::STANDARD
            .encode(format!("{}:{}", self.client_id, self.client_secret))
    }
}

/// Appends the access token to the subscription websocket url.
#[must_use]
pub fn websocket_uri(wss_url: &str, access_token: &str) -> String {
    let separator = if wss_url.contains('?') { '&' } else { '?' };
    format!("{wss_url}{separator}access_token={access_token}")
}
