//! Common Test Utilities
//!
//! Shared helpers, fixtures, and test infrastructure.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    Router,
};
use futures::{SinkExt, StreamExt};
use parking_lot::Mutex;
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio::sync::{mpsc, Semaphore};
use tokio_tungstenite::tungstenite::Message;
use tower::ServiceExt;

use autotyper::config::Settings;
use autotyper::infrastructure::platform::MessageSender;
use autotyper::startup::{build_router, AppState};

const BOUNDARY: &str = "autotyper-test-boundary";

/// Test application around the real router
pub struct TestApp {
    pub router: Router,
    pub state: AppState,
}

impl TestApp {
    /// Build an app whose sends go to `sender` and whose gateway is `gateway_url`
    pub fn new(sender: Arc<dyn MessageSender>, gateway_url: &str) -> Self {
        let mut settings = Settings::defaults().expect("default settings");
        settings.platform.gateway_url = gateway_url.to_string();
        settings.gateway.handshake_timeout_secs = 5;
        settings.gateway.connect_grace_secs = 5;
        settings.gateway.disconnect_timeout_secs = 2;

        let state = AppState::new(settings, sender);
        let router = build_router(state.clone());
        Self { router, state }
    }

    /// App with a sender that accepts everything and no reachable gateway
    pub fn with_sender(sender: Arc<dyn MessageSender>) -> Self {
        Self::new(sender, "ws://127.0.0.1:1/")
    }

    async fn call(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = serde_json::from_slice(&bytes)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()));
        (status, body)
    }

    /// Make a GET request
    pub async fn get(&self, uri: &str) -> (StatusCode, Value) {
        self.call(Request::get(uri).body(Body::empty()).unwrap()).await
    }

    /// Make a POST request with JSON body
    pub async fn post_json(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        self.call(
            Request::post(uri)
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
    }

    /// Make a POST request without a body
    pub async fn post_empty(&self, uri: &str) -> (StatusCode, Value) {
        self.call(Request::post(uri).body(Body::empty()).unwrap()).await
    }

    /// Post a multipart form with text `fields` and an optional uploaded file
    pub async fn post_form(
        &self,
        uri: &str,
        fields: &[(&str, &str)],
        file: Option<&[u8]>,
    ) -> (StatusCode, Value) {
        let mut body = Vec::new();
        for (name, value) in fields {
            body.extend_from_slice(
                format!(
                    "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
                )
                .as_bytes(),
            );
        }
        if let Some(bytes) = file {
            body.extend_from_slice(
                format!(
                    "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"lines.txt\"\r\nContent-Type: text/plain\r\n\r\n"
                )
                .as_bytes(),
            );
            body.extend_from_slice(bytes);
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

        self.call(
            Request::post(uri)
                .header(
                    header::CONTENT_TYPE,
                    format!("multipart/form-data; boundary={BOUNDARY}"),
                )
                .body(Body::from(body))
                .unwrap(),
        )
        .await
    }

    /// Start a typing job and return its id
    pub async fn start_job(&self, content: &str, delay: &str) -> String {
        let (status, body) = self
            .post_form(
                "/start",
                &[("token", "user-token"), ("channel_id", "42"), ("delay", delay)],
                Some(content.as_bytes()),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "start failed: {body}");
        body["job_id"].as_str().unwrap().to_string()
    }

    /// Poll `/status/{job_id}` until the job reaches `status`
    pub async fn wait_for_job_status(&self, job_id: &str, status: &str) -> Value {
        let mut last = Value::Null;
        for _ in 0..100 {
            last = self.get(&format!("/status/{job_id}")).await.1;
            if last["status"] == status {
                return last;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        panic!("job {job_id} never reached {status}, last seen {last}");
    }

    /// Poll `/vc/status/{connection_id}` until the session reaches `status`
    pub async fn wait_for_session_status(&self, connection_id: &str, status: &str) {
        let mut last = Value::Null;
        for _ in 0..250 {
            last = self.get(&format!("/vc/status/{connection_id}")).await.1;
            if last["status"] == status {
                return;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        panic!("session {connection_id} never reached {status}, last seen {last}");
    }
}

/// Message sender that records every line and can fail at one index or
/// hold sends until released.
#[derive(Default)]
pub struct ScriptedSender {
    sent: Mutex<Vec<String>>,
    fail_at: Option<usize>,
    gate: Option<Arc<Semaphore>>,
}

impl ScriptedSender {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Fail the send of the line at `index` (zero based)
    pub fn failing_at(index: usize) -> Arc<Self> {
        Arc::new(Self {
            fail_at: Some(index),
            ..Self::default()
        })
    }

    /// Each send waits for one permit on `gate`
    pub fn gated(gate: Arc<Semaphore>) -> Arc<Self> {
        Arc::new(Self {
            gate: Some(gate),
            ..Self::default()
        })
    }

    pub fn sent(&self) -> Vec<String> {
        self.sent.lock().clone()
    }
}

#[async_trait]
impl MessageSender for ScriptedSender {
    async fn send_message(&self, _token: &str, _channel_id: &str, content: &str) -> bool {
        if let Some(gate) = &self.gate {
            if let Ok(permit) = gate.acquire().await {
                permit.forget();
            }
        }
        let index = {
            let mut sent = self.sent.lock();
            sent.push(content.to_string());
            sent.len() - 1
        };
        self.fail_at != Some(index)
    }
}

/// How the fake gateway answers a client
#[derive(Debug, Clone, Copy)]
pub enum GatewayScript {
    /// Hello, READY after identify, one extra dispatch, heartbeat acks
    Normal { heartbeat_ms: u64 },
    /// Hello, then invalid session in answer to identify
    InvalidSession,
    /// Like `Normal`, but closes the socket once the voice state update arrives
    CloseAfterVoiceJoin,
    /// Answers identify with a heartbeat ack and two other dispatches (s=1, s=2)
    /// before READY (s=3)
    NoiseBeforeReady { heartbeat_ms: u64 },
}

/// What the fake gateway observed
#[derive(Debug, Clone)]
pub enum GatewayEvent {
    Accepted,
    Frame(Value),
    Closed,
}

/// In-process websocket server speaking the gateway protocol
pub struct FakeGateway {
    pub url: String,
    events: mpsc::UnboundedReceiver<GatewayEvent>,
}

impl FakeGateway {
    pub async fn start(script: GatewayScript) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind gateway");
        let url = format!("ws://{}/", listener.local_addr().expect("gateway addr"));
        let (tx, events) = mpsc::unbounded_channel();

        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                let tx = tx.clone();
                tokio::spawn(async move {
                    let Ok(ws) = tokio_tungstenite::accept_async(stream).await else {
                        return;
                    };
                    let _ = tx.send(GatewayEvent::Accepted);
                    serve(ws, script, tx).await;
                });
            }
        });

        Self { url, events }
    }

    /// Next observed event, or `None` after `within`
    pub async fn next_event(&mut self, within: Duration) -> Option<GatewayEvent> {
        tokio::time::timeout(within, self.events.recv()).await.ok().flatten()
    }

    /// Wait for a client frame matching `pred`
    pub async fn wait_for_frame(&mut self, pred: impl Fn(&Value) -> bool) -> Value {
        loop {
            match self.next_event(Duration::from_secs(5)).await {
                Some(GatewayEvent::Frame(frame)) if pred(&frame) => return frame,
                Some(_) => continue,
                None => panic!("gateway never received the expected frame"),
            }
        }
    }

    /// Wait for the first client frame with opcode `op`
    pub async fn wait_for_op(&mut self, op: u64) -> Value {
        self.wait_for_frame(|frame| frame["op"] == op).await
    }

    /// Wait until the client side of a connection is gone
    pub async fn wait_for_close(&mut self) {
        loop {
            match self.next_event(Duration::from_secs(5)).await {
                Some(GatewayEvent::Closed) => return,
                Some(_) => continue,
                None => panic!("gateway connection was never closed"),
            }
        }
    }

    /// Drain events for `within` and count accepted connections
    pub async fn count_accepted(&mut self, within: Duration) -> usize {
        let mut accepted = 0;
        while let Some(event) = self.next_event(within).await {
            if matches!(event, GatewayEvent::Accepted) {
                accepted += 1;
            }
        }
        accepted
    }
}

async fn serve(
    ws: tokio_tungstenite::WebSocketStream<tokio::net::TcpStream>,
    script: GatewayScript,
    tx: mpsc::UnboundedSender<GatewayEvent>,
) {
    let (mut sink, mut stream) = ws.split();
    let heartbeat_ms = match script {
        GatewayScript::Normal { heartbeat_ms }
        | GatewayScript::NoiseBeforeReady { heartbeat_ms } => heartbeat_ms,
        _ => 41_250,
    };

    let hello = json!({ "op": 10, "d": { "heartbeat_interval": heartbeat_ms } });
    if sink.send(Message::text(hello.to_string())).await.is_err() {
        let _ = tx.send(GatewayEvent::Closed);
        return;
    }

    while let Some(message) = stream.next().await {
        let frame: Value = match message {
            Ok(Message::Text(text)) => match serde_json::from_str(&text) {
                Ok(frame) => frame,
                Err(_) => continue,
            },
            Ok(Message::Close(_)) | Err(_) => break,
            Ok(_) => continue,
        };
        let _ = tx.send(GatewayEvent::Frame(frame.clone()));

        let replies = match (frame["op"].as_u64(), script) {
            (Some(1), _) => vec![json!({ "op": 11 })],
            (Some(2), GatewayScript::InvalidSession) => vec![json!({ "op": 9, "d": false })],
            (Some(2), GatewayScript::NoiseBeforeReady { .. }) => vec![
                json!({ "op": 11 }),
                json!({ "op": 0, "t": "SESSIONS_REPLACE", "s": 1, "d": [] }),
                json!({ "op": 0, "t": "PRESENCE_UPDATE", "s": 2, "d": {} }),
                json!({ "op": 0, "t": "READY", "s": 3, "d": { "session_id": "abc" } }),
            ],
            (Some(2), _) => vec![
                json!({ "op": 0, "t": "READY", "s": 1, "d": { "session_id": "abc" } }),
                json!({ "op": 0, "t": "SESSIONS_REPLACE", "s": 2, "d": [] }),
            ],
            (Some(4), GatewayScript::CloseAfterVoiceJoin) => {
                let _ = sink.send(Message::Close(None)).await;
                break;
            }
            _ => vec![],
        };
        for reply in replies {
            if sink.send(Message::text(reply.to_string())).await.is_err() {
                break;
            }
        }
    }

    let _ = tx.send(GatewayEvent::Closed);
}
