// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! LogScale HEC records.
//!
//! See <https://library.humio.com/humio-server/log-shippers-hec.html>.

use std::time::{SystemTime, UNIX_EPOCH};

use serde::Serialize;
use serde_json::{Map, Value};

/// One normalized record as accepted by the HEC endpoint.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LogRecord {
    /// Seconds since the epoch, fractional.
    pub time: f64,
    pub source: String,
    pub sourcetype: String,
    pub host: String,
    pub index: String,
    pub event: Value,
    pub fields: Map<String, Value>,
}

/// Fixed fields stamped onto every record of a session.
#[derive(Debug, Clone)]
pub struct HecEvent {
    index: String,
    host: String,
    source: String,
    sourcetype: String,
}

impl HecEvent {
    #[must_use]
    pub fn new(index: String, host: String, source: String, sourcetype: String) -> Self {
        HecEvent {
            index,
            host,
            source,
            sourcetype,
        }
    }

    /// Wraps `event` into a record timestamped with the current wall clock.
    #[must_use]
    pub fn create(&self, event: Value) -> LogRecord {
        self.create_at(now_secs(), event)
    }

    #[must_use]
    pub fn create_at(&self, time: f64, event: Value) -> LogRecord {
        LogRecord {
            time,
            source: self.source.clone(),
            sourcetype: self.sourcetype.clone(),
            host: self.host.clone(),
            index: self.index.clone(),
            event,
            fields: Map::new(),
        }
    }
}

fn now_secs() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or_default()
}
