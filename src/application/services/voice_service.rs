//! Voice Service
//!
//! Opens gateway sessions that join a voice channel and keeps each one on a
//! supervised task until it is disconnected or the connection fails.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::oneshot;

use crate::config::Settings;
use crate::domain::{SessionStatus, VoiceSession};
use crate::infrastructure::gateway::{
    self, GatewayClientConfig, GatewayError, OpCode, VoiceTarget,
};
use crate::infrastructure::metrics;
use crate::infrastructure::registry::{self, ConnectionRegistry, SessionClaim, SessionEntry};

/// Voice service trait
#[async_trait]
pub trait VoiceService: Send + Sync {
    /// Join a voice channel, or report the live session already holding it
    async fn connect(&self, request: ConnectVoiceDto) -> ConnectOutcome;

    /// Mark the session disconnected and wait (bounded) for its connection to be released
    async fn disconnect(&self, connection_id: &str) -> Result<VoiceSession, VoiceError>;

    /// Current status of a session
    fn status(&self, connection_id: &str) -> Result<SessionStatus, VoiceError>;
}

/// Connect request
#[derive(Clone)]
pub struct ConnectVoiceDto {
    pub token: String,
    pub guild_id: String,
    pub channel_id: String,
}

impl From<ConnectVoiceDto> for VoiceTarget {
    fn from(dto: ConnectVoiceDto) -> Self {
        Self {
            token: dto.token,
            guild_id: dto.guild_id,
            channel_id: dto.channel_id,
        }
    }
}

/// Result of a connect request
#[derive(Debug, Clone)]
pub struct ConnectOutcome {
    pub connection_id: String,
    pub status: SessionStatus,
    /// The slot was already held by a connected session; nothing new was started
    pub already_connected: bool,
    pub error: Option<String>,
}

/// Voice service errors
#[derive(Debug, thiserror::Error)]
pub enum VoiceError {
    #[error("Connection not found")]
    NotFound,
}

/// VoiceService implementation
pub struct VoiceServiceImpl {
    registry: Arc<ConnectionRegistry>,
    client: GatewayClientConfig,
    connect_grace: Duration,
    disconnect_timeout: Duration,
}

impl VoiceServiceImpl {
    pub fn new(registry: Arc<ConnectionRegistry>, settings: &Settings) -> Self {
        Self {
            registry,
            client: GatewayClientConfig::from_settings(settings),
            connect_grace: settings.gateway.connect_grace(),
            disconnect_timeout: settings.gateway.disconnect_timeout(),
        }
    }
}

#[async_trait]
impl VoiceService for VoiceServiceImpl {
    async fn connect(&self, request: ConnectVoiceDto) -> ConnectOutcome {
        let (entry, replaced) = match self
            .registry
            .claim_session(&request.guild_id, &request.channel_id)
        {
            SessionClaim::Existing(entry) => {
                let session = entry.snapshot();
                tracing::debug!(
                    session_id = %session.connection_id,
                    status = %session.status,
                    "Session already live, not starting another handshake"
                );
                return ConnectOutcome {
                    connection_id: session.connection_id,
                    status: session.status,
                    already_connected: session.status == SessionStatus::Connected,
                    error: None,
                };
            }
            SessionClaim::Created { entry, replaced } => (entry, replaced),
        };

        if let Some(previous) = replaced {
            let timeout = self.disconnect_timeout;
            tokio::spawn(async move {
                previous.shutdown(timeout).await;
            });
        }

        let (ready_tx, ready_rx) = oneshot::channel();
        let handle = tokio::spawn(run_session(
            entry.clone(),
            self.client.clone(),
            request.into(),
            ready_tx,
        ));
        entry.attach(handle);

        // Wait for the handshake outcome, never longer than the grace bound.
        if tokio::time::timeout(self.connect_grace, ready_rx).await.is_err() {
            tracing::debug!(session_id = %entry.id(), "Handshake still in progress after grace period");
        }

        let session = entry.snapshot();
        ConnectOutcome {
            connection_id: session.connection_id,
            status: session.status,
            already_connected: false,
            error: session.error,
        }
    }

    async fn disconnect(&self, connection_id: &str) -> Result<VoiceSession, VoiceError> {
        let entry = self
            .registry
            .session(connection_id)
            .ok_or(VoiceError::NotFound)?;

        entry.update(VoiceSession::mark_disconnected);
        if !entry.shutdown(self.disconnect_timeout).await {
            tracing::warn!(session_id = %connection_id, "Connection release timed out, task aborted");
        }
        tracing::info!(session_id = %connection_id, "Voice session disconnected");

        Ok(entry.snapshot())
    }

    fn status(&self, connection_id: &str) -> Result<SessionStatus, VoiceError> {
        self.registry
            .session(connection_id)
            .map(|entry| entry.status())
            .ok_or(VoiceError::NotFound)
    }
}

/// Why the steady-state receive loop ended
enum LoopExit {
    /// Disconnect requested, or the record left `connected`
    Requested,
    /// Gateway closed the socket
    RemoteClosed(Option<String>),
    /// Receive failed
    Failed(GatewayError),
}

/// Owning task of one gateway session.
///
/// Runs the handshake, publishes the outcome through `ready`, then consumes
/// inbound frames until the record stops being `connected`, shutdown is
/// requested, or the connection fails. The connection is released on every
/// path: explicitly via `close`, or by drop when the handshake fails.
pub async fn run_session(
    entry: Arc<SessionEntry>,
    client: GatewayClientConfig,
    target: VoiceTarget,
    ready: oneshot::Sender<SessionStatus>,
) {
    let connection_id = entry.id();
    let mut shutdown = entry.shutdown_requested();

    let handshake = tokio::select! {
        result = tokio::time::timeout(
            client.handshake_timeout,
            gateway::handshake(&client, &target, &connection_id),
        ) => result.unwrap_or(Err(GatewayError::Timeout(client.handshake_timeout))),
        _ = registry::raised(&mut shutdown) => Err(GatewayError::Cancelled),
    };

    let mut connection = match handshake {
        Ok(connection) => connection,
        Err(e) => {
            if !matches!(e, GatewayError::Cancelled) {
                metrics::GATEWAY_HANDSHAKE_FAILURES_TOTAL.inc();
            }
            let message = e.to_string();
            entry.update(|session| session.mark_error(message.as_str()));
            tracing::warn!(session_id = %connection_id, error = %e, "Gateway handshake failed");
            let _ = ready.send(entry.status());
            return;
        }
    };

    if !entry.update(VoiceSession::mark_connected) {
        // Disconnected while the handshake was finishing.
        connection.close().await;
        let _ = ready.send(entry.status());
        return;
    }

    let _active = metrics::ActiveSessionGuard::acquire();
    tracing::info!(
        session_id = %connection_id,
        guild_id = %target.guild_id,
        channel_id = %target.channel_id,
        "Joined voice channel"
    );
    let _ = ready.send(SessionStatus::Connected);

    let exit = loop {
        if entry.status() != SessionStatus::Connected {
            break LoopExit::Requested;
        }

        tokio::select! {
            _ = registry::raised(&mut shutdown) => break LoopExit::Requested,
            frame = connection.recv() => match frame {
                Ok(frame) => {
                    if matches!(frame.opcode(), Some(OpCode::Reconnect | OpCode::InvalidSession)) {
                        tracing::debug!(session_id = %connection_id, op = frame.op, "Gateway asked for a new session");
                    }
                }
                Err(GatewayError::Malformed(e)) => {
                    tracing::debug!(session_id = %connection_id, error = %e, "Skipping malformed frame");
                }
                Err(GatewayError::Closed(reason)) => break LoopExit::RemoteClosed(reason),
                Err(e) => break LoopExit::Failed(e),
            },
        }
    };

    match exit {
        LoopExit::Requested => {}
        LoopExit::RemoteClosed(reason) => {
            tracing::info!(session_id = %connection_id, reason = ?reason, "Gateway closed the connection");
            entry.update(|session| {
                session.status == SessionStatus::Connected && session.mark_disconnected()
            });
        }
        LoopExit::Failed(e) => {
            tracing::warn!(session_id = %connection_id, error = %e, "Gateway connection failed");
            let message = e.to_string();
            entry.update(|session| {
                session.status == SessionStatus::Connected && session.mark_error(message.as_str())
            });
        }
    }

    connection.close().await;
    tracing::info!(session_id = %connection_id, "Gateway connection released");
}
