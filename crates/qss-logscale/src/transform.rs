// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Flattening of QSS participant arrays into keyed objects.
//!
//! QSS reports participant telemetry as arrays that are awkward to query
//! once ingested. Two event families are recognized by their type:
//!
//! - `*_qos` events carry `payload.object.participant.qos`, a list of
//!   `{type, details, date_time?}` entries. It becomes an object keyed by
//!   `type`, with `date_time` merged into each `details` object.
//! - `*_data` events carry `payload.object.participant.data`, a list with a
//!   single object. It becomes that object.
//!
//! ```text
//! qos: [{"type":"audio_input","details":{"bitrate":"28kbps"}}]
//!   => qos: {"audio_input":{"bitrate":"28kbps"}}
//! ```

use serde::Deserialize;
use serde_json::{Map, Value};

use crate::error::TransformError;
use crate::message::EventEnvelope;

const PARTICIPANT_PATH: [&str; 3] = ["payload", "object", "participant"];
const QOS_FIELD: &str = "qos";
const DATA_FIELD: &str = "data";
const QOS_PATH: &str = "payload.object.participant.qos";
const DATA_PATH: &str = "payload.object.participant.data";

/// Transformation rule selected by an event type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventCategory {
    Qos,
    Data,
}

impl EventCategory {
    /// Matches the event type against the known families, QoS first.
    #[must_use]
    pub fn classify(event: &str) -> Option<Self> {
        if event.contains("_qos") {
            Some(EventCategory::Qos)
        } else if event.contains("_data") {
            Some(EventCategory::Data)
        } else {
            None
        }
    }
}

/// One entry of a participant QoS array.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct QosEntry {
    #[serde(rename = "type")]
    pub kind: String,
    pub details: Map<String, Value>,
    #[serde(default)]
    pub date_time: Option<Value>,
}

/// Maps each QoS entry type to its details.
///
/// A later entry with the same type replaces an earlier one.
#[must_use]
pub fn flatten_qos(entries: Vec<QosEntry>) -> Map<String, Value> {
    let mut qos = Map::new();
    for entry in entries {
        let mut details = entry.details;
        if let Some(date_time) = entry.date_time {
            details.insert("date_time".to_string(), date_time);
        }
        qos.insert(entry.kind, Value::Object(details));
    }
    qos
}

/// Copies the keys of the first data element. Further elements are ignored.
#[must_use]
pub fn flatten_data(entries: &[Map<String, Value>]) -> Option<Map<String, Value>> {
    entries.first().cloned()
}

/// Replaces the participant array of `envelope` with its flattened form.
///
/// Every other envelope field passes through untouched.
pub fn transform(mut envelope: EventEnvelope) -> Result<EventEnvelope, TransformError> {
    let event = envelope.event().to_string();
    let category = EventCategory::classify(&event)
        .ok_or_else(|| TransformError::UnrecognizedEvent(event.clone()))?;

    let (field, path) = match category {
        EventCategory::Qos => (QOS_FIELD, QOS_PATH),
        EventCategory::Data => (DATA_FIELD, DATA_PATH),
    };

    let participant = participant_mut(envelope.body_mut())
        .ok_or_else(|| TransformError::MissingField {
            event: event.clone(),
            path,
        })?;
    let array = participant
        .remove(field)
        .ok_or_else(|| TransformError::MissingField {
            event: event.clone(),
            path,
        })?;

    let flattened = match category {
        EventCategory::Qos => {
            let entries: Vec<QosEntry> =
                serde_json::from_value(array).map_err(|source| TransformError::Malformed {
                    event: event.clone(),
                    path,
                    source,
                })?;
            flatten_qos(entries)
        }
        EventCategory::Data => {
            let entries: Vec<Map<String, Value>> =
                serde_json::from_value(array).map_err(|source| TransformError::Malformed {
                    event: event.clone(),
                    path,
                    source,
                })?;
            flatten_data(&entries).ok_or_else(|| TransformError::EmptyData(event.clone()))?
        }
    };

    participant.insert(field.to_string(), Value::Object(flattened));
    Ok(envelope)
}

fn participant_mut(body: &mut Map<String, Value>) -> Option<&mut Map<String, Value>> {
    let mut current = body;
    for key in PARTICIPANT_PATH {
        current = current.get_mut(key)?.as_object_mut()?;
    }
    Some(current)
}
