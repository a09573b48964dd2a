// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Size- and count-bounded batching of HEC records.
//!
//! Records are serialized to JSON and joined with newlines, which is the
//! body format the HEC endpoint accepts:
//!
//! ```text
//! {"time":1700000000.5,"event":{...}}
//! {"time":1700000001.2,"event":{...}}
//! ```
//!
//! Unlike a queue-and-drain aggregator, the payload never refuses a record.
//! Callers pack first and check [`Payload::full`] afterwards, so the record
//! that crosses a limit is shipped with the batch it overflowed.

use serde::Serialize;

use crate::constants::{MAX_POST_BYTES, MAX_POST_EVENTS, RECORD_SEPARATOR};

/// Newline-joined batch of serialized records with running counters.
#[derive(Debug, Clone)]
pub struct Payload {
    packed: String,
    event_count: usize,
    size_bytes: usize,
    max_size_bytes: usize,
    max_events: usize,
}

impl Default for Payload {
    fn default() -> Self {
        Payload::new(MAX_POST_BYTES, MAX_POST_EVENTS)
    }
}

impl Payload {
    /// Creates a payload with custom limits.
    ///
    /// Production code should use [`Payload::default()`], which applies the
    /// LogScale ingest limits.
    #[must_use]
    pub fn new(max_size_bytes: usize, max_events: usize) -> Self {
        Payload {
            packed: String::new(),
            event_count: 0,
            size_bytes: 0,
            max_size_bytes,
            max_events,
        }
    }

    /// Serializes `record` and appends it to the batch.
    ///
    /// The size is recomputed from the whole encoded payload, separators
    /// included, so it always equals the number of bytes that will be sent.
    pub fn pack<T: Serialize>(&mut self, record: &T) -> Result<(), serde_json::Error> {
        let serialized = serde_json::to_string(record)?;
        if self.event_count > 0 {
            self.packed.push(RECORD_SEPARATOR);
        }
        self.packed.push_str(&serialized);
        self.event_count += 1;
        self.size_bytes = self.packed.len();
        Ok(())
    }

    /// Clears the batch after it was flushed or deliberately abandoned.
    pub fn reset(&mut self) {
        self.packed.clear();
        self.event_count = 0;
        self.size_bytes = 0;
    }

    #[must_use]
    pub fn packed(&self) -> &str {
        &self.packed
    }

    #[must_use]
    pub fn event_count(&self) -> usize {
        self.event_count
    }

    #[must_use]
    pub fn size_bytes(&self) -> usize {
        self.size_bytes
    }

    /// True once either limit is reached, inclusive.
    #[must_use]
    pub fn full(&self) -> bool {
        self.size_bytes >= self.max_size_bytes || self.event_count >= self.max_events
    }

    #[must_use]
    pub fn empty(&self) -> bool {
        self.size_bytes == 0
    }
}
