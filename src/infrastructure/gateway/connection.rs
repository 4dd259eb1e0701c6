//! Gateway Connection
//!
//! An open WebSocket to the gateway together with the tasks bound to it: a
//! writer fed through an unbounded channel and at most one heartbeat loop.
//! Dropping the connection aborts both tasks and releases the socket, so a
//! connection abandoned on an error path never leaks.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::stream::SplitStream;
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

use super::error::GatewayError;
use super::messages::{GatewayReceive, GatewaySend};
use crate::infrastructure::metrics;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Upper bound on flushing the close frame during an orderly shutdown
const CLOSE_TIMEOUT: Duration = Duration::from_secs(2);

pub struct GatewayConnection {
    connection_id: String,
    outbound: mpsc::UnboundedSender<Message>,
    inbound: SplitStream<WsStream>,
    writer: Option<JoinHandle<()>>,
    heartbeat: Option<JoinHandle<()>>,
    /// Last dispatch sequence received, 0 while none has been seen
    last_sequence: Arc<AtomicU64>,
}

impl GatewayConnection {
    /// Open the WebSocket and start the writer task.
    pub async fn open(url: &str, connection_id: &str) -> Result<Self, GatewayError> {
        let (stream, _response) = tokio_tungstenite::connect_async(url).await?;
        let (mut sink, inbound) = stream.split();
        let (outbound, mut rx) = mpsc::unbounded_channel::<Message>();

        let writer_id = connection_id.to_string();
        let writer = tokio::spawn(async move {
            while let Some(message) = rx.recv().await {
                let closing = matches!(message, Message::Close(_));
                if let Err(e) = sink.send(message).await {
                    tracing::debug!(session_id = %writer_id, error = %e, "Gateway write failed");
                    break;
                }
                if closing {
                    break;
                }
            }
            let _ = sink.close().await;
        });

        tracing::debug!(session_id = %connection_id, "Gateway socket opened");

        Ok(Self {
            connection_id: connection_id.to_string(),
            outbound,
            inbound,
            writer: Some(writer),
            heartbeat: None,
            last_sequence: Arc::new(AtomicU64::new(0)),
        })
    }

    /// Queue a frame for the writer task.
    pub fn send(&self, frame: &GatewaySend) -> Result<(), GatewayError> {
        let text = serde_json::to_string(frame)?;
        self.outbound
            .send(Message::text(text))
            .map_err(|_| GatewayError::Closed(Some("writer stopped".into())))
    }

    /// Receive the next JSON frame, skipping ping/pong and binary frames.
    ///
    /// A close frame or end of stream is reported as `GatewayError::Closed`.
    pub async fn recv(&mut self) -> Result<GatewayReceive, GatewayError> {
        loop {
            match self.inbound.next().await {
                Some(Ok(Message::Text(text))) => {
                    let frame: GatewayReceive = serde_json::from_str(&text)?;
                    if let Some(sequence) = frame.s {
                        self.last_sequence.fetch_max(sequence, Ordering::Relaxed);
                    }
                    return Ok(frame);
                }
                Some(Ok(Message::Close(close))) => {
                    let reason = close.map(|c| format!("{} {}", u16::from(c.code), &*c.reason));
                    return Err(GatewayError::Closed(reason));
                }
                Some(Ok(_)) => continue,
                Some(Err(e)) => return Err(e.into()),
                None => return Err(GatewayError::Closed(None)),
            }
        }
    }

    /// Start the heartbeat loop, replacing any loop already bound to this connection.
    pub fn start_heartbeat(&mut self, every: Duration) {
        if let Some(previous) = self.heartbeat.take() {
            previous.abort();
        }
        self.heartbeat = Some(tokio::spawn(heartbeat_loop(
            self.outbound.clone(),
            every,
            self.last_sequence.clone(),
            self.connection_id.clone(),
        )));
    }

    pub fn last_sequence(&self) -> Option<u64> {
        match self.last_sequence.load(Ordering::Relaxed) {
            0 => None,
            s => Some(s),
        }
    }

    /// Stop the heartbeat, send a close frame and wait (bounded) for the writer to finish.
    pub async fn close(mut self) {
        if let Some(heartbeat) = self.heartbeat.take() {
            heartbeat.abort();
        }
        let _ = self.outbound.send(Message::Close(None));

        if let Some(mut writer) = self.writer.take() {
            if tokio::time::timeout(CLOSE_TIMEOUT, &mut writer).await.is_err() {
                writer.abort();
            }
        }
        tracing::debug!(session_id = %self.connection_id, "Gateway socket closed");
    }
}

impl Drop for GatewayConnection {
    fn drop(&mut self) {
        if let Some(heartbeat) = self.heartbeat.take() {
            heartbeat.abort();
        }
        if let Some(writer) = self.writer.take() {
            writer.abort();
        }
    }
}

/// Send a heartbeat every `every`, first one after a full interval.
///
/// Ends as soon as the writer is gone: either a send fails or the channel
/// reports closed while waiting for the next tick.
pub(crate) async fn heartbeat_loop(
    outbound: mpsc::UnboundedSender<Message>,
    every: Duration,
    last_sequence: Arc<AtomicU64>,
    connection_id: String,
) {
    let mut ticker = interval_at(Instant::now() + every, every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = outbound.closed() => {
                tracing::debug!(session_id = %connection_id, "Connection gone, heartbeat stopped");
                return;
            }
        }

        let sequence = match last_sequence.load(Ordering::Relaxed) {
            0 => None,
            s => Some(s),
        };
        let text = match serde_json::to_string(&GatewaySend::heartbeat(sequence)) {
            Ok(text) => text,
            Err(e) => {
                tracing::error!(session_id = %connection_id, error = %e, "Failed to encode heartbeat");
                return;
            }
        };

        if outbound.send(Message::text(text)).is_err() {
            tracing::debug!(session_id = %connection_id, "Heartbeat send failed, heartbeat stopped");
            return;
        }
        metrics::GATEWAY_HEARTBEATS_TOTAL.inc();
        tracing::trace!(session_id = %connection_id, "Heartbeat sent");
    }
}
