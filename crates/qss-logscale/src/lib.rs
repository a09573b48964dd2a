// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Streaming bridge from the Zoom QSS websocket feed to LogScale HEC ingestion.
//!
//! ```text
//!   websocket frame ──> message ──> transform ──> hec ──> payload ──> ingest
//!                          ^                                             │
//!                          └──────────── session (receive loop) ─────────┘
//! ```
//!
//! A [`session::Session`] owns one websocket connection and drives two
//! activities: a heartbeat task and the receive loop. Event frames are
//! flattened by [`transform`], wrapped into HEC records by [`hec`], packed
//! into a bounded [`payload::Payload`] and shipped by an [`ingest::Forwarder`]
//! whenever the payload fills up.

#![cfg_attr(not(test), deny(clippy::panic))]
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]
#![cfg_attr(not(test), deny(clippy::todo))]
#![cfg_attr(not(test), deny(clippy::unimplemented))]

pub mod config;
pub mod constants;
pub mod error;
pub mod hec;
pub mod ingest;
pub mod logger;
pub mod message;
pub mod oauth;
pub mod payload;
pub mod session;
pub mod transform;
