// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Error taxonomy of the bridge.
//!
//! Every [`SessionError`] ends the session. Non-200 ingestion responses are
//! not errors at all: the forwarder logs them and the batch is dropped.

use tokio_tungstenite::tungstenite;

/// Errors raised while flattening an event envelope.
#[derive(Debug, thiserror::Error)]
pub enum TransformError {
    #[error("Unrecognized event type: {0}")]
    UnrecognizedEvent(String),

    #[error("Event {event} is missing field {path}")]
    MissingField { event: String, path: &'static str },

    #[error("Event {event} has a malformed {path} array: {source}")]
    Malformed {
        event: String,
        path: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("Event {0} carries an empty data array")]
    EmptyData(String),
}

/// Errors raised by the ingestion forwarder.
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("Unknown ingest endpoint: {0}")]
    UnknownEndpoint(String),

    #[error("Failed to build ingest client: {0}")]
    Client(String),

    #[error("Failed to send payload: {0}")]
    Send(#[from] reqwest::Error),
}

/// Errors raised while acquiring the QSS access token.
#[derive(Debug, thiserror::Error)]
pub enum OAuthError {
    #[error("Token request failed with status {0}")]
    Status(u16),

    #[error("Token request failed: {0}")]
    Request(#[from] reqwest::Error),
}

/// Errors raised while loading configuration from the environment.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} environment variable is not set")]
    Missing(&'static str),
}

/// Fatal errors that close a websocket session.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("Failed to open websocket: {0}")]
    Connect(#[source] tungstenite::Error),

    #[error("Websocket connection was rejected by the server")]
    Rejected,

    #[error("Unexpected connection message: {0}")]
    UnexpectedModule(String),

    #[error("Websocket closed before the connection was established")]
    ClosedDuringHandshake,

    #[error("Unexpected websocket message: {0}")]
    UnexpectedMessage(String),

    #[error("Malformed websocket message: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("Event message without an event type")]
    MissingEvent,

    #[error(transparent)]
    Transform(#[from] TransformError),

    #[error(transparent)]
    Ingest(#[from] IngestError),

    #[error("Websocket transport failed: {0}")]
    Transport(#[from] tungstenite::Error),

    #[error("Heartbeat failed: {0}")]
    Heartbeat(#[source] tungstenite::Error),

    #[error("Heartbeat task aborted: {0}")]
    HeartbeatAborted(String),
}
