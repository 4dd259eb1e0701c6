//! Gateway Client
//!
//! Persistent real-time connection used to hold a voice channel presence.

pub mod client;
pub mod connection;
pub mod error;
pub mod messages;

pub use client::{handshake, GatewayClientConfig, VoiceTarget};
pub use connection::GatewayConnection;
pub use error::GatewayError;
pub use messages::{GatewayReceive, GatewaySend, OpCode};
