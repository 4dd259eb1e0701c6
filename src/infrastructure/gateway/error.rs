//! Gateway client errors.

use std::time::Duration;

use tokio_tungstenite::tungstenite;

#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("WebSocket error: {0}")]
    Transport(#[from] tungstenite::Error),

    #[error("Connection closed by gateway{}", .0.as_deref().map(|r| format!(": {r}")).unwrap_or_default())]
    Closed(Option<String>),

    #[error("Malformed gateway frame: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Gateway rejected the session (invalid session)")]
    InvalidSession,

    #[error("Handshake timed out after {}s", .0.as_secs())]
    Timeout(Duration),

    #[error("Cancelled before the handshake completed")]
    Cancelled,
}
