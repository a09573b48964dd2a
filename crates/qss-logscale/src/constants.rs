// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Limits and protocol constants shared across the pipeline.
//!
//! Payload limits follow the LogScale ingest API best practices:
//! <https://library.humio.com/falcon-logscale/api-ingest.html#api-ingest-best-practices>

use std::time::Duration;

/// Maximum size of a single POST payload in bytes (5MB).
///
/// A payload is considered full once its encoded size reaches this value.
/// The record that crosses the limit is still part of the payload.
pub const MAX_POST_BYTES: usize = 5 * 1_024 * 1_024;

/// Maximum number of records batched into a single POST payload.
pub const MAX_POST_EVENTS: usize = 5000;

/// Separator placed between serialized records in a payload.
pub const RECORD_SEPARATOR: char = '\n';

/// Default interval between outbound heartbeat frames.
pub const DEFAULT_HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);

/// Default timeout applied to each ingestion request.
pub const DEFAULT_FLUSH_TIMEOUT: Duration = Duration::from_secs(30);

/// Module tag of the handshake frame sent once after the socket opens.
pub const MODULE_BUILD_CONNECTION: &str = "build_connection";

/// Module tag of heartbeat frames, both inbound and outbound.
pub const MODULE_HEARTBEAT: &str = "heartbeat";

/// Module tag of event-bearing frames.
pub const MODULE_MESSAGE: &str = "message";

/// Default `source` field of every HEC record.
pub const DEFAULT_SOURCE: &str = "zoom_websocket";

/// Default `sourcetype` field of every HEC record; must name the LogScale parser.
pub const DEFAULT_SOURCETYPE: &str = "zoom_qss";

/// Default Zoom OAuth token endpoint.
pub const DEFAULT_OAUTH_URL: &str = "https://zoom.us/oauth/token";
