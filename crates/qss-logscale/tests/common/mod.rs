// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

#![allow(dead_code)]

use std::future::Future;
use std::io;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};
use std::time::Duration;

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use qss_logscale::error::IngestError;
use qss_logscale::hec::HecEvent;
use qss_logscale::ingest::{Forwarder, IngestEndpoint};
use serde_json::json;
use tokio::io::{AsyncRead, AsyncWrite, DuplexStream, ReadBuf};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{accept_async, WebSocketStream};

pub type ServerStream = WebSocketStream<TcpStream>;

/// Forwarder keeping every payload it is asked to send.
#[derive(Clone, Default)]
pub struct RecordingForwarder {
    batches: Arc<Mutex<Vec<(IngestEndpoint, String)>>>,
    fail: bool,
}

impl RecordingForwarder {
    pub fn failing() -> Self {
        RecordingForwarder {
            fail: true,
            ..Default::default()
        }
    }

    pub fn batches(&self) -> Vec<(IngestEndpoint, String)> {
        self.batches.lock().unwrap().clone()
    }
}

#[async_trait]
impl Forwarder for RecordingForwarder {
    async fn send(&self, endpoint: IngestEndpoint, payload: &str) -> Result<(), IngestError> {
        if self.fail {
            return Err(IngestError::Client("ingest unavailable".to_string()));
        }
        self.batches
            .lock()
            .unwrap()
            .push((endpoint, payload.to_string()));
        Ok(())
    }
}

pub fn hec_event() -> HecEvent {
    HecEvent::new(
        "qss".to_string(),
        "logscale.example.com".to_string(),
        "zoom_websocket".to_string(),
        "zoom_qss".to_string(),
    )
}

pub fn build_connection(success: bool) -> String {
    json!({"module": "build_connection", "success": success}).to_string()
}

pub fn heartbeat() -> String {
    json!({"module": "heartbeat"}).to_string()
}

pub fn qos_event(i: usize) -> String {
    let content = json!({
        "event": "meeting.participant_qos",
        "event_ts": i,
        "payload": {
            "account_id": "account",
            "object": {
                "id": "meeting",
                "participant": {
                    "user_id": format!("user-{i}"),
                    "qos": [
                        {"type": "audio_input", "details": {"bitrate": "28kbps"}, "date_time": "2024-01-01T00:00:00Z"},
                        {"type": "cpu_usage", "details": {"zoom_avg_cpu_usage": "2%"}}
                    ]
                }
            }
        }
    });
    json!({"module": "message", "content": content.to_string()}).to_string()
}

pub fn data_event(i: usize) -> String {
    let content = json!({
        "event": "meeting.participant_data",
        "event_ts": i,
        "payload": {"object": {"participant": {"data": [{"network_type": "wifi"}, {"ignored": true}]}}}
    });
    json!({"module": "message", "content": content.to_string()}).to_string()
}

pub fn event_with(content: serde_json::Value) -> String {
    json!({"module": "message", "content": content.to_string()}).to_string()
}

/// Accepts a single websocket client and hands it to `script`.
pub async fn spawn_server<S, Fut, T>(script: S) -> (String, JoinHandle<T>)
where
    S: FnOnce(ServerStream) -> Fut + Send + 'static,
    Fut: Future<Output = T> + Send + 'static,
    T: Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let handle = tokio::spawn(async move {
        let (tcp, _) = listener.accept().await.unwrap();
        let ws = accept_async(tcp).await.unwrap();
        script(ws).await
    });
    (format!("ws://{addr}/ws?subscriptionId=test"), handle)
}

/// Sends `frames` in order, closes the socket and returns what the client sent.
pub async fn serve_frames(frames: Vec<String>) -> (String, JoinHandle<Vec<String>>) {
    spawn_server(move |mut ws| async move {
        for frame in frames {
            if ws.send(Message::Text(frame)).await.is_err() {
                break;
            }
        }
        let _ = ws.close(None).await;
        drain(&mut ws).await
    })
    .await
}

/// Collects text frames until the client goes away.
pub async fn drain(ws: &mut ServerStream) -> Vec<String> {
    let mut received = Vec::new();
    while let Ok(Some(Ok(msg))) = tokio::time::timeout(Duration::from_secs(2), ws.next()).await {
        if let Message::Text(text) = msg {
            received.push(text);
        }
    }
    received
}

/// Socket whose reads come from a duplex pipe and whose writes always fail.
pub struct BrokenWrites(pub DuplexStream);

impl AsyncRead for BrokenWrites {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        Pin::new(&mut self.0).poll_read(cx, buf)
    }
}

impl AsyncWrite for BrokenWrites {
    fn poll_write(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        _buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        Poll::Ready(Err(io::Error::new(
            io::ErrorKind::BrokenPipe,
            "connection reset",
        )))
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }
}
