//! Gateway Frame Types
//!
//! JSON control frames exchanged with the platform gateway.

use serde::{Deserialize, Serialize};

/// Gateway opcodes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum OpCode {
    /// Event dispatch
    Dispatch = 0,
    /// Heartbeat
    Heartbeat = 1,
    /// Identify
    Identify = 2,
    /// Presence update
    PresenceUpdate = 3,
    /// Voice state update
    VoiceStateUpdate = 4,
    /// Resume
    Resume = 6,
    /// Reconnect
    Reconnect = 7,
    /// Request guild members
    RequestGuildMembers = 8,
    /// Invalid session
    InvalidSession = 9,
    /// Hello
    Hello = 10,
    /// Heartbeat ACK
    HeartbeatAck = 11,
}

impl OpCode {
    pub fn from_u8(op: u8) -> Option<Self> {
        Some(match op {
            0 => Self::Dispatch,
            1 => Self::Heartbeat,
            2 => Self::Identify,
            3 => Self::PresenceUpdate,
            4 => Self::VoiceStateUpdate,
            6 => Self::Resume,
            7 => Self::Reconnect,
            8 => Self::RequestGuildMembers,
            9 => Self::InvalidSession,
            10 => Self::Hello,
            11 => Self::HeartbeatAck,
            _ => return None,
        })
    }
}

/// Dispatch event name that marks the session as ready
pub const READY_EVENT: &str = "READY";

/// Incoming gateway frame
#[derive(Debug, Clone, Deserialize)]
pub struct GatewayReceive {
    pub op: u8,
    #[serde(default)]
    pub d: Option<serde_json::Value>,
    #[serde(default)]
    pub s: Option<u64>,
    #[serde(default)]
    pub t: Option<String>,
}

impl GatewayReceive {
    pub fn opcode(&self) -> Option<OpCode> {
        OpCode::from_u8(self.op)
    }

    pub fn is_ready(&self) -> bool {
        self.opcode() == Some(OpCode::Dispatch) && self.t.as_deref() == Some(READY_EVENT)
    }

    /// Heartbeat interval from a hello frame
    pub fn hello_interval(&self) -> Option<u64> {
        if self.opcode() != Some(OpCode::Hello) {
            return None;
        }
        let d = self.d.clone()?;
        serde_json::from_value::<HelloPayload>(d)
            .ok()
            .map(|hello| hello.heartbeat_interval)
    }
}

/// Outgoing gateway frame. `d` is always present, `null` included.
#[derive(Debug, Clone, Serialize)]
pub struct GatewaySend {
    pub op: u8,
    pub d: serde_json::Value,
}

impl GatewaySend {
    fn new<T: Serialize>(op: OpCode, payload: &T) -> Result<Self, serde_json::Error> {
        Ok(Self {
            op: op as u8,
            d: serde_json::to_value(payload)?,
        })
    }

    /// Heartbeat carrying the last dispatch sequence seen, if any
    pub fn heartbeat(last_sequence: Option<u64>) -> Self {
        Self {
            op: OpCode::Heartbeat as u8,
            d: last_sequence.map_or(serde_json::Value::Null, serde_json::Value::from),
        }
    }

    pub fn identify(payload: &IdentifyPayload) -> Result<Self, serde_json::Error> {
        Self::new(OpCode::Identify, payload)
    }

    pub fn voice_state_update(payload: &VoiceStatePayload) -> Result<Self, serde_json::Error> {
        Self::new(OpCode::VoiceStateUpdate, payload)
    }
}

/// Hello payload (op 10)
#[derive(Debug, Deserialize, Serialize)]
pub struct HelloPayload {
    pub heartbeat_interval: u64,
}

/// Identify payload (op 2)
#[derive(Debug, Serialize)]
pub struct IdentifyPayload {
    pub token: String,
    pub properties: IdentifyProperties,
    pub presence: PresencePayload,
}

/// Identify connection properties
#[derive(Debug, Clone, Serialize)]
pub struct IdentifyProperties {
    pub os: String,
    pub browser: String,
    pub device: String,
}

/// Initial presence announced with identify
#[derive(Debug, Serialize)]
pub struct PresencePayload {
    pub status: &'static str,
    pub since: Option<u64>,
    pub activities: Vec<serde_json::Value>,
    pub afk: bool,
}

impl PresencePayload {
    pub fn online() -> Self {
        Self {
            status: "online",
            since: None,
            activities: Vec::new(),
            afk: false,
        }
    }
}

/// Voice state update payload (op 4)
#[derive(Debug, Serialize)]
pub struct VoiceStatePayload {
    pub guild_id: String,
    pub channel_id: String,
    pub self_mute: bool,
    pub self_deaf: bool,
}
