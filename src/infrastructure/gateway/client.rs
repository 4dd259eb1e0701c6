//! Gateway handshake: hello, heartbeat start, identify, ready, voice join.

use std::time::Duration;

use super::connection::GatewayConnection;
use super::error::GatewayError;
use super::messages::{
    GatewaySend, IdentifyPayload, IdentifyProperties, OpCode, PresencePayload, VoiceStatePayload,
};
use crate::config::Settings;

/// Static parameters for opening gateway sessions.
#[derive(Debug, Clone)]
pub struct GatewayClientConfig {
    pub gateway_url: String,
    pub properties: IdentifyProperties,
    pub handshake_timeout: Duration,
}

impl GatewayClientConfig {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            gateway_url: settings.platform.gateway_url.clone(),
            properties: IdentifyProperties {
                os: settings.gateway.client_os.clone(),
                browser: settings.gateway.client_browser.clone(),
                device: settings.gateway.client_device.clone(),
            },
            handshake_timeout: settings.gateway.handshake_timeout(),
        }
    }
}

/// Who connects, and to which voice channel.
#[derive(Clone)]
pub struct VoiceTarget {
    pub token: String,
    pub guild_id: String,
    pub channel_id: String,
}

impl std::fmt::Debug for VoiceTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VoiceTarget")
            .field("token", &"[REDACTED]")
            .field("guild_id", &self.guild_id)
            .field("channel_id", &self.channel_id)
            .finish()
    }
}

/// Run the session bootstrap and return the connection once the voice
/// state update has been queued.
///
/// Frames that arrive between identify and READY are discarded. On any
/// error the partially opened connection is dropped, which releases it.
pub async fn handshake(
    config: &GatewayClientConfig,
    target: &VoiceTarget,
    connection_id: &str,
) -> Result<GatewayConnection, GatewayError> {
    let mut connection = GatewayConnection::open(&config.gateway_url, connection_id).await?;

    let hello = connection.recv().await?;
    let interval_ms = hello
        .hello_interval()
        .ok_or_else(|| GatewayError::Protocol(format!("expected hello, got op {}", hello.op)))?;
    if interval_ms == 0 {
        return Err(GatewayError::Protocol("hello carried a zero heartbeat interval".into()));
    }
    connection.start_heartbeat(Duration::from_millis(interval_ms));
    tracing::debug!(session_id = %connection_id, interval_ms, "Received hello");

    connection.send(&GatewaySend::identify(&IdentifyPayload {
        token: target.token.clone(),
        properties: config.properties.clone(),
        presence: PresencePayload::online(),
    })?)?;

    loop {
        let frame = connection.recv().await?;
        if frame.is_ready() {
            break;
        }
        if frame.opcode() == Some(OpCode::InvalidSession) {
            return Err(GatewayError::InvalidSession);
        }
        tracing::trace!(session_id = %connection_id, op = frame.op, "Discarding frame before READY");
    }
    tracing::debug!(session_id = %connection_id, "Session ready");

    connection.send(&GatewaySend::voice_state_update(&VoiceStatePayload {
        guild_id: target.guild_id.clone(),
        channel_id: target.channel_id.clone(),
        self_mute: true,
        self_deaf: true,
    })?)?;

    Ok(connection)
}
