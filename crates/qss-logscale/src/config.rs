// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use std::env;
use std::time::Duration;

use crate::constants::{
    DEFAULT_FLUSH_TIMEOUT, DEFAULT_HEARTBEAT_INTERVAL, DEFAULT_OAUTH_URL, DEFAULT_SOURCE,
    DEFAULT_SOURCETYPE,
};
use crate::error::ConfigError;

#[derive(Debug, Clone)]
pub struct Config {
    pub logscale_host: String,
    pub logscale_repository: String,
    pub logscale_ingest_token: String,
    /// overrides `https://<logscale_host>` as the ingest base url
    pub logscale_ingest_url: Option<String>,
    pub zoom_account_id: String,
    pub zoom_client_id: String,
    pub zoom_client_secret: String,
    pub zoom_wss_url: String,
    pub zoom_oauth_url: String,
    pub heartbeat_interval: Duration,
    /// timeout for each ingest and token request
    pub flush_timeout: Duration,
    pub source: String,
    pub sourcetype: String,
    pub log_level: String,
}

impl Config {
    pub fn new() -> Result<Config, ConfigError> {
        Ok(Config {
            logscale_host: required("LOGSCALE_HOST")?,
            logscale_repository: required("LOGSCALE_REPOSITORY")?,
            logscale_ingest_token: required("LOGSCALE_INGEST_TOKEN")?,
            logscale_ingest_url: env::var("LOGSCALE_INGEST_URL").ok(),
            zoom_account_id: required("ZOOM_ACCOUNT_ID")?,
            zoom_client_id: required("ZOOM_CLIENT_ID")?,
            zoom_client_secret: required("ZOOM_CLIENT_SECRET")?,
            zoom_wss_url: required("ZOOM_WSS_URL")?,
            zoom_oauth_url: env::var("ZOOM_OAUTH_URL")
                .unwrap_or_else(|_| DEFAULT_OAUTH_URL.to_string()),
            heartbeat_interval: seconds("QSS_HEARTBEAT_INTERVAL")
                .unwrap_or(DEFAULT_HEARTBEAT_INTERVAL),
            flush_timeout: seconds("QSS_FLUSH_TIMEOUT").unwrap_or(DEFAULT_FLUSH_TIMEOUT),
            source: env::var("QSS_SOURCE").unwrap_or_else(|_| DEFAULT_SOURCE.to_string()),
            sourcetype: env::var("QSS_SOURCETYPE")
                .unwrap_or_else(|_| DEFAULT_SOURCETYPE.to_string()),
            log_level: env::var("QSS_LOG_LEVEL")
                .map(|val| val.to_lowercase())
                .unwrap_or_else(|_| "info".to_string()),
        })
    }
}

fn required(name: &'static str) -> Result<String, ConfigError> {
    match env::var(name) {
        Ok(val) if !val.is_empty() => Ok(val),
        _ => Err(ConfigError::Missing(name)),
    }
}

fn seconds(name: &str) -> Option<Duration> {
    env::var(name)
        .ok()
        .and_then(|val| val.parse::<u64>().ok())
        .filter(|secs| *secs > 0)
        .map(Duration::from_secs)
}
