//! Voice session record.
//!
//! `connecting -> connected -> {disconnected | error}`. There is no
//! reconnect: a terminal record is replaced by a fresh one on the next
//! connect request for the same guild and channel.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle of a gateway voice session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Connecting,
    Connected,
    Error,
    Disconnected,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Error => "error",
            Self::Disconnected => "disconnected",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Error | Self::Disconnected)
    }

    /// A handshake is in flight or established; a new connect must not start another.
    pub fn is_live(&self) -> bool {
        matches!(self, Self::Connecting | Self::Connected)
    }
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Identifier for the session bound to a guild voice channel.
///
/// Deterministic so repeated connect requests address the same record.
pub fn session_id(guild_id: &str, channel_id: &str) -> String {
    format!("vc_{}_{}", guild_id, channel_id)
}

/// Gateway session record, as exposed to status polls.
#[derive(Debug, Clone, Serialize)]
pub struct VoiceSession {
    pub connection_id: String,
    pub status: SessionStatus,
    pub guild_id: String,
    pub channel_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip)]
    pub finished_at: Option<DateTime<Utc>>,
}

impl VoiceSession {
    pub fn new(guild_id: impl Into<String>, channel_id: impl Into<String>) -> Self {
        let guild_id = guild_id.into();
        let channel_id = channel_id.into();
        let now = Utc::now();
        Self {
            connection_id: session_id(&guild_id, &channel_id),
            status: SessionStatus::Connecting,
            guild_id,
            channel_id,
            error: None,
            created_at: now,
            updated_at: now,
            finished_at: None,
        }
    }

    /// `connecting -> connected`
    pub fn mark_connected(&mut self) -> bool {
        if self.status != SessionStatus::Connecting {
            return false;
        }
        self.status = SessionStatus::Connected;
        self.updated_at = Utc::now();
        true
    }

    /// `connecting | connected -> error`
    pub fn mark_error(&mut self, message: impl Into<String>) -> bool {
        if !self.status.is_live() {
            return false;
        }
        self.status = SessionStatus::Error;
        self.error = Some(message.into());
        self.finish();
        true
    }

    /// Any state -> `disconnected`. Returns false if already disconnected.
    pub fn mark_disconnected(&mut self) -> bool {
        if self.status == SessionStatus::Disconnected {
            return false;
        }
        self.status = SessionStatus::Disconnected;
        self.finish();
        true
    }

    fn finish(&mut self) {
        self.updated_at = Utc::now();
        self.finished_at = Some(self.updated_at);
    }
}
