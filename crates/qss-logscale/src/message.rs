// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! QSS websocket frames.
//!
//! Every text frame is a JSON object tagged by `module`:
//!
//! ```json
//! {"module": "build_connection", "success": true}
//! {"module": "heartbeat"}
//! {"module": "message", "content": "{\"event\":\"meeting.participant_qos\",...}"}
//! ```
//!
//! The `content` of an event frame is itself a JSON document encoded as a
//! string. It is decoded into an [`EventEnvelope`] before transformation.

use serde_json::{Map, Value};

use crate::constants::{MODULE_BUILD_CONNECTION, MODULE_HEARTBEAT, MODULE_MESSAGE};
use crate::error::SessionError;

/// Frames that drive the connection rather than carry events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Control {
    BuildConnection { success: bool },
    Heartbeat,
}

/// A parsed inbound text frame.
#[derive(Debug, Clone, PartialEq)]
pub enum RawMessage {
    Control(Control),
    Event(EventMessage),
    /// Any frame whose module is not part of the protocol.
    Unknown(String),
}

impl RawMessage {
    /// Parses a text frame into its tagged variant.
    ///
    /// Frames that are not JSON objects, or that lack a string `module`,
    /// are malformed. Frames with an unknown module parse as
    /// [`RawMessage::Unknown`] so the caller decides how fatal they are.
    pub fn parse(text: &str) -> Result<Self, SessionError> {
        let mut frame: Map<String, Value> = serde_json::from_str(text)?;
        let module = match frame.get("module") {
            Some(Value::String(module)) => module.clone(),
            _ => return Err(SessionError::UnexpectedMessage(text.to_string())),
        };

        match module.as_str() {
            MODULE_BUILD_CONNECTION => {
                let success = frame
                    .get("success")
                    .and_then(Value::as_bool)
                    .unwrap_or(false);
                Ok(RawMessage::Control(Control::BuildConnection { success }))
            }
            MODULE_HEARTBEAT => Ok(RawMessage::Control(Control::Heartbeat)),
            MODULE_MESSAGE => match frame.remove("content") {
                Some(Value::String(content)) => Ok(RawMessage::Event(EventMessage {
                    metadata: frame,
                    content,
                })),
                _ => Err(SessionError::UnexpectedMessage(text.to_string())),
            },
            _ => Ok(RawMessage::Unknown(module)),
        }
    }

    /// Module tag for logging.
    #[must_use]
    pub fn module(&self) -> &str {
        match self {
            RawMessage::Control(Control::BuildConnection { .. }) => MODULE_BUILD_CONNECTION,
            RawMessage::Control(Control::Heartbeat) => MODULE_HEARTBEAT,
            RawMessage::Event(_) => MODULE_MESSAGE,
            RawMessage::Unknown(module) => module.as_str(),
        }
    }
}

/// An event frame: its metadata fields plus the still-encoded content.
#[derive(Debug, Clone, PartialEq)]
pub struct EventMessage {
    /// Every frame field except `content`, `module` included.
    pub metadata: Map<String, Value>,
    pub content: String,
}

impl EventMessage {
    /// Decodes the content into an envelope.
    pub fn envelope(&self) -> Result<EventEnvelope, SessionError> {
        EventEnvelope::parse(&self.content)
    }

    /// Rebuilds the frame with `content` replaced by the given envelope.
    #[must_use]
    pub fn into_value(self, envelope: EventEnvelope) -> Value {
        let mut frame = self.metadata;
        frame.insert("content".to_string(), envelope.into_value());
        Value::Object(frame)
    }
}

/// The decoded business event carried by an event frame.
#[derive(Debug, Clone, PartialEq)]
pub struct EventEnvelope {
    event: String,
    body: Map<String, Value>,
}

impl EventEnvelope {
    /// Decodes envelope JSON, requiring a non-empty string `event` field.
    pub fn parse(content: &str) -> Result<Self, SessionError> {
        let body: Map<String, Value> = serde_json::from_str(content)?;
        Self::from_map(body)
    }

    pub fn from_map(body: Map<String, Value>) -> Result<Self, SessionError> {
        let event = match body.get("event") {
            Some(Value::String(event)) if !event.is_empty() => event.clone(),
            _ => return Err(SessionError::MissingEvent),
        };
        Ok(EventEnvelope { event, body })
    }

    /// The discriminator selecting the transformation rule.
    #[must_use]
    pub fn event(&self) -> &str {
        &self.event
    }

    pub(crate) fn body_mut(&mut self) -> &mut Map<String, Value> {
        &mut self.body
    }

    #[must_use]
    pub fn into_value(self) -> Value {
        Value::Object(self.body)
    }
}
