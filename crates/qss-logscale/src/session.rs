// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! One QSS websocket session.
//!
//! ```text
//!   Connecting ──build_connection{success:true}──> Open ──close──> Closed(Normal)
//!       │                                            │
//!       └──────────── any violation ─────────────────┴───────────> Closed(Fatal)
//! ```
//!
//! Once open, the session runs two activities over the same socket:
//!
//! - a spawned heartbeat task that owns the write half and sends
//!   `{"module":"heartbeat"}` every interval, and
//! - the receive loop, which owns the read half, the payload and the
//!   forwarder.
//!
//! The receive loop awaits each flush before reading the next frame, so a
//! slow ingest endpoint throttles consumption instead of growing a queue.
//! Either activity failing ends the session.

use std::time::Duration;

use futures_util::stream::SplitSink;
use futures_util::{SinkExt, Stream, StreamExt};
use serde_json::json;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_tungstenite::{connect_async, WebSocketStream};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::constants::MODULE_HEARTBEAT;
use crate::error::SessionError;
use crate::hec::HecEvent;
use crate::ingest::{Forwarder, IngestEndpoint};
use crate::message::{Control, EventMessage, RawMessage};
use crate::payload::Payload;
use crate::transform::transform;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Closure {
    Normal,
    Fatal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Connecting,
    Open,
    Closed(Closure),
}

pub struct Session<F> {
    forwarder: F,
    hec_event: HecEvent,
    payload: Payload,
    heartbeat_interval: Duration,
    state: SessionState,
}

impl<F: Forwarder> Session<F> {
    #[must_use]
    pub fn new(forwarder: F, hec_event: HecEvent, heartbeat_interval: Duration) -> Self {
        Session {
            forwarder,
            hec_event,
            payload: Payload::default(),
            heartbeat_interval,
            state: SessionState::Connecting,
        }
    }

    /// Replaces the payload, e.g. to use custom limits.
    #[must_use]
    pub fn with_payload(mut self, payload: Payload) -> Self {
        self.payload = payload;
        self
    }

    #[must_use]
    pub fn state(&self) -> SessionState {
        self.state
    }

    #[must_use]
    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    /// Opens the websocket at `uri` and runs the session until it closes.
    pub async fn connect(&mut self, uri: &str) -> Result<(), SessionError> {
        self.state = SessionState::Connecting;
        match connect_async(uri).await {
            Ok((stream, _)) => self.run(stream).await,
            Err(e) => {
                self.state = SessionState::Closed(Closure::Fatal);
                error!("SESSION | Failed to open websocket: {e}");
                Err(SessionError::Connect(e))
            }
        }
    }

    /// Runs the session over an already opened websocket.
    ///
    /// Returns `Ok` when the peer closes the socket. Every error is fatal.
    pub async fn run<S>(&mut self, stream: WebSocketStream<S>) -> Result<(), SessionError>
    where
        S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    {
        self.state = SessionState::Connecting;
        let result = self.drive(stream).await;
        match &result {
            Ok(()) => {
                self.state = SessionState::Closed(Closure::Normal);
                info!(
                    "SESSION | Websocket closed, {} events pending",
                    self.payload.event_count()
                );
            }
            Err(e) => {
                self.state = SessionState::Closed(Closure::Fatal);
                error!("SESSION | Session failed: {e}");
            }
        }
        result
    }

    /// Ships whatever is left in the payload.
    pub async fn flush_remaining(&mut self) -> Result<(), SessionError> {
        if self.payload.empty() {
            return Ok(());
        }
        self.flush().await
    }

    async fn drive<S>(&mut self, stream: WebSocketStream<S>) -> Result<(), SessionError>
    where
        S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    {
        let (sink, mut source) = stream.split();
        self.handshake(&mut source).await?;

        let cancel = CancellationToken::new();
        let mut heartbeat = tokio::spawn(heartbeat(
            sink,
            self.heartbeat_interval,
            cancel.clone(),
        ));
        self.state = SessionState::Open;
        info!("SESSION | Connection established, waiting for events");

        tokio::select! {
            result = self.receive_loop(&mut source) => {
                cancel.cancel();
                if let Err(e) = heartbeat.await {
                    debug!("SESSION | Heartbeat task did not stop cleanly: {e}");
                }
                result
            }
            result = &mut heartbeat => match result {
                Ok(Ok(())) => Ok(()),
                Ok(Err(e)) => Err(SessionError::Heartbeat(e)),
                Err(e) => Err(SessionError::HeartbeatAborted(e.to_string())),
            },
        }
    }

    async fn handshake<St>(&mut self, source: &mut St) -> Result<(), SessionError>
    where
        St: Stream<Item = Result<Message, tungstenite::Error>> + Unpin,
    {
        let Some(text) = next_text(source).await? else {
            return Err(SessionError::ClosedDuringHandshake);
        };
        match RawMessage::parse(&text)? {
            RawMessage::Control(Control::BuildConnection { success: true }) => Ok(()),
            RawMessage::Control(Control::BuildConnection { success: false }) => {
                Err(SessionError::Rejected)
            }
            other => Err(SessionError::UnexpectedModule(other.module().to_string())),
        }
    }

    async fn receive_loop<St>(&mut self, source: &mut St) -> Result<(), SessionError>
    where
        St: Stream<Item = Result<Message, tungstenite::Error>> + Unpin,
    {
        while let Some(text) = next_text(source).await? {
            match RawMessage::parse(&text)? {
                RawMessage::Control(Control::Heartbeat) => debug!("SESSION | Heartbeat received"),
                RawMessage::Event(message) => self.process_event(message).await?,
                _ => return Err(SessionError::UnexpectedMessage(text)),
            }
        }
        Ok(())
    }

    async fn process_event(&mut self, message: EventMessage) -> Result<(), SessionError> {
        let envelope = transform(message.envelope()?)?;
        let record = self.hec_event.create(message.into_value(envelope));
        self.payload.pack(&record)?;

        if self.payload.full() {
            self.flush().await?;
        }
        Ok(())
    }

    async fn flush(&mut self) -> Result<(), SessionError> {
        debug!(
            "SESSION | Post events: {}, payload: {} bytes",
            self.payload.event_count(),
            self.payload.size_bytes()
        );
        self.forwarder
            .send(IngestEndpoint::Hec, self.payload.packed())
            .await?;
        self.payload.reset();
        Ok(())
    }
}

/// Reads frames until a text frame arrives. `None` means the peer closed.
async fn next_text<St>(source: &mut St) -> Result<Option<String>, SessionError>
where
    St: Stream<Item = Result<Message, tungstenite::Error>> + Unpin,
{
    loop {
        match source.next().await {
            Some(Ok(Message::Text(text))) => return Ok(Some(text)),
            // answered by tungstenite itself
            Some(Ok(Message::Ping(_) | Message::Pong(_))) => continue,
            Some(Ok(Message::Close(frame))) => {
                debug!("SESSION | Close frame received: {frame:?}");
                return Ok(None);
            }
            None => return Ok(None),
            Some(Ok(Message::Binary(bytes))) => {
                return Err(SessionError::UnexpectedMessage(format!(
                    "binary frame of {} bytes",
                    bytes.len()
                )))
            }
            Some(Ok(Message::Frame(_))) => {
                return Err(SessionError::UnexpectedMessage("raw frame".to_string()))
            }
            Some(Err(e)) => return Err(SessionError::Transport(e)),
        }
    }
}

async fn heartbeat<S>(
    mut sink: SplitSink<WebSocketStream<S>, Message>,
    interval: Duration,
    cancel: CancellationToken,
) -> Result<(), tungstenite::Error>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let frame = json!({ "module": MODULE_HEARTBEAT }).to_string();
    loop {
        tokio::select! {
            () = cancel.cancelled() => {
                // the peer may already be gone
                let _ = sink.close().await;
                return Ok(());
            }
            () = tokio::time::sleep(interval) => {}
        }
        sink.send(Message::Text(frame.clone())).await?;
        debug!("SESSION | Heartbeat sent");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::stream;

    #[tokio::test]
    async fn test_next_text_skips_control_frames() {
        let mut source = stream::iter(vec![
            Ok(Message::Ping(vec![1])),
            Ok(Message::Pong(vec![])),
            Ok(Message::Text("hello".to_string())),
        ]);
        assert_eq!(
            next_text(&mut source).await.unwrap(),
            Some("hello".to_string())
        );
        assert_eq!(next_text(&mut source).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_next_text_close_frame_ends_stream() {
        let mut source = stream::iter(vec![
            Ok(Message::Close(None)),
            Ok(Message::Text("after close".to_string())),
        ]);
        assert_eq!(next_text(&mut source).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_next_text_rejects_binary() {
        let mut source = stream::iter(vec![Ok(Message::Binary(vec![0, 1, 2]))]);
        let err = next_text(&mut source).await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "Unexpected websocket message: binary frame of 3 bytes"
        );
    }

    #[tokio::test]
    async fn test_next_text_transport_error() {
        let mut source = stream::iter(vec![Err(tungstenite::Error::ConnectionClosed)]);
        let err = next_text(&mut source).await.unwrap_err();
        assert!(matches!(err, SessionError::Transport(_)));
    }
}
