// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Delivery of packed payloads to the LogScale ingest API.
//!
//! Each payload gets exactly one POST. Transport failures are returned to
//! the caller; any non-200 response is logged as a warning and the payload
//! is dropped, so a misbehaving endpoint never stalls the feed.

use std::fmt;
use std::str::FromStr;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::StatusCode;
use tracing::{debug, error, warn};

use crate::error::IngestError;

/// Named ingest paths of the LogScale API.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestEndpoint {
    /// HTTP Event Collector, newline-delimited JSON records.
    Hec,
    /// Humio structured ingestion.
    Structured,
}

impl IngestEndpoint {
    #[must_use]
    pub fn path(&self) -> &'static str {
        match self {
            IngestEndpoint::Hec => "api/v1/ingest/hec",
            IngestEndpoint::Structured => "api/v1/ingest/humio-structured",
        }
    }

    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            IngestEndpoint::Hec => "hec",
            IngestEndpoint::Structured => "api-structured",
        }
    }
}

impl FromStr for IngestEndpoint {
    type Err = IngestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "hec" => Ok(IngestEndpoint::Hec),
            "api-structured" => Ok(IngestEndpoint::Structured),
            other => Err(IngestError::UnknownEndpoint(other.to_string())),
        }
    }
}

impl fmt::Display for IngestEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[async_trait]
pub trait Forwarder: Send + Sync {
    /// Performs one delivery attempt of an already packed payload.
    ///
    /// Only transport failures are errors. Rejected payloads are logged and
    /// reported as delivered.
    async fn send(&self, endpoint: IngestEndpoint, payload: &str) -> Result<(), IngestError>;

    /// Like [`Forwarder::send`], resolving the endpoint by name first.
    ///
    /// Unknown names fail before any request is made.
    async fn send_event(&self, endpoint: &str, payload: &str) -> Result<(), IngestError> {
        let endpoint = endpoint.parse::<IngestEndpoint>()?;
        self.send(endpoint, payload).await
    }
}

/// reqwest-backed forwarder for one LogScale host.
#[derive(Debug, Clone)]
pub struct IngestApi {
    client: reqwest::Client,
    base_url: String,
    headers: HeaderMap,
}

impl IngestApi {
    /// Creates a forwarder posting to `https://<host>/<endpoint path>`.
    pub fn new(host: &str, ingest_token: &str, timeout: Duration) -> Result<Self, IngestError> {
        Self::with_base_url(format!("https://{host}"), ingest_token, timeout)
    }

    /// Creates a forwarder posting under an explicit base url.
    pub fn with_base_url(
        base_url: String,
        ingest_token: &str,
        timeout: Duration,
    ) -> Result<Self, IngestError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| IngestError::Client(e.to_string()))?;

        let mut headers = HeaderMap::new();
        let bearer = HeaderValue::from_str(&format!("Bearer {ingest_token}"))
            .map_err(|e| IngestError::Client(format!("invalid ingest token: {e}")))?;
        headers.insert(AUTHORIZATION, bearer);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        Ok(IngestApi {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            headers,
        })
    }

    #[must_use]
    pub fn url(&self, endpoint: IngestEndpoint) -> String {
        format!("{}/{}", self.base_url, endpoint.path())
    }
}

#[async_trait]
impl Forwarder for IngestApi {
    async fn send(&self, endpoint: IngestEndpoint, payload: &str) -> Result<(), IngestError> {
        let url = self.url(endpoint);
        let time = Instant::now();
        let resp = self
            .client
            .post(&url)
            .headers(self.headers.clone())
            .body(payload.to_owned())
            .send()
            .await;
        let elapsed = time.elapsed();

        match resp {
            Ok(resp) => {
                let status = resp.status();
                if status == StatusCode::OK {
                    debug!(
                        "INGEST | Sent {} bytes to {endpoint} in {} ms",
                        payload.len(),
                        elapsed.as_millis()
                    );
                    return Ok(());
                }
                let reason = status.canonical_reason().unwrap_or_default();
                let text = resp.text().await.unwrap_or_default();
                warn!(
                    "INGEST | Post status code: {} - Reason: {} - Text: {}",
                    status.as_u16(),
                    reason,
                    text
                );
                Ok(())
            }
            Err(e) => {
                error!(
                    "INGEST | Exception sending payload to {url} after {} ms: {e}",
                    elapsed.as_millis()
                );
                Err(IngestError::Send(e))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use duplicate::duplicate_item;
    use mockito::Server;
    use tracing_test::traced_test;

    const TIMEOUT: Duration = Duration::from_secs(5);

    #[duplicate_item(
        test_name                   name                endpoint                        expected_path;
        [test_hec_endpoint]         ["hec"]             [IngestEndpoint::Hec]           ["api/v1/ingest/hec"];
        [test_structured_endpoint]  ["api-structured"]  [IngestEndpoint::Structured]    ["api/v1/ingest/humio-structured"];
    )]
    #[test]
    fn test_name() {
        let parsed: IngestEndpoint = name.parse().unwrap();
        assert_eq!(parsed, endpoint);
        assert_eq!(parsed.path(), expected_path);
        assert_eq!(parsed.to_string(), name);
    }

    #[test]
    fn test_unknown_endpoint() {
        let err = "raw".parse::<IngestEndpoint>().unwrap_err();
        assert!(matches!(err, IngestError::UnknownEndpoint(name) if name == "raw"));
    }

    #[test]
    fn test_url_from_host() {
        let api = IngestApi::new("cloud.community.humio.com", "token", TIMEOUT).unwrap();
        assert_eq!(
            api.url(IngestEndpoint::Hec),
            "https://cloud.community.humio.com/api/v1/ingest/hec"
        );
    }

    #[test]
    fn test_invalid_token_is_rejected() {
        let err = IngestApi::new("host", "bad\ntoken", TIMEOUT).unwrap_err();
        assert!(matches!(err, IngestError::Client(_)));
    }

    #[tokio::test]
    async fn test_send_posts_payload_with_headers() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/api/v1/ingest/hec")
            .match_header("Authorization", "Bearer ingest-token")
            .match_header("Content-Type", "application/json")
            .match_body("{\"a\":1}\n{\"a\":2}")
            .with_status(200)
            .create_async()
            .await;

        let api = IngestApi::with_base_url(server.url(), "ingest-token", TIMEOUT).unwrap();
        api.send(IngestEndpoint::Hec, "{\"a\":1}\n{\"a\":2}")
            .await
            .unwrap();

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_send_event_by_name() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/api/v1/ingest/humio-structured")
            .with_status(200)
            .create_async()
            .await;

        let api = IngestApi::with_base_url(server.url(), "ingest-token", TIMEOUT).unwrap();
        api.send_event("api-structured", "[]").await.unwrap();

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_send_event_unknown_endpoint_makes_no_request() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", mockito::Matcher::Any)
            .expect(0)
            .create_async()
            .await;

        let api = IngestApi::with_base_url(server.url(), "ingest-token", TIMEOUT).unwrap();
        let err = api.send_event("raw", "{}").await.unwrap_err();

        assert!(matches!(err, IngestError::UnknownEndpoint(_)));
        mock.assert_async().await;
    }

    #[tokio::test]
    #[traced_test]
    async fn test_non_200_is_logged_not_raised() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/api/v1/ingest/hec")
            .with_status(401)
            .with_body("invalid token")
            .expect(1)
            .create_async()
            .await;

        let api = IngestApi::with_base_url(server.url(), "ingest-token", TIMEOUT).unwrap();
        let result = api.send(IngestEndpoint::Hec, "{}").await;

        assert!(result.is_ok());
        mock.assert_async().await;
        assert!(logs_contain("Post status code: 401"));
        assert!(logs_contain("Unauthorized"));
        assert!(logs_contain("invalid token"));
    }

    #[tokio::test]
    async fn test_accepted_status_is_not_success() {
        // Only 200 counts as delivered; anything else is logged and dropped.
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/api/v1/ingest/hec")
            .with_status(202)
            .expect(1)
            .create_async()
            .await;

        let api = IngestApi::with_base_url(server.url(), "ingest-token", TIMEOUT).unwrap();
        assert!(api.send(IngestEndpoint::Hec, "{}").await.is_ok());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_transport_failure_is_raised() {
        let api =
            IngestApi::with_base_url("http://127.0.0.1:9".to_string(), "ingest-token", TIMEOUT)
                .unwrap();
        let err = api.send(IngestEndpoint::Hec, "{}").await.unwrap_err();
        assert!(matches!(err, IngestError::Send(_)));
    }
}
