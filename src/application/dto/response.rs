//! Response DTOs
//!
//! Data structures for API response bodies.

use serde::Serialize;

use crate::application::services::ConnectOutcome;
use crate::domain::{JobStatus, SessionStatus};

/// Job created
#[derive(Debug, Serialize)]
pub struct StartJobResponse {
    pub job_id: String,
    pub total_lines: usize,
}

/// Job stop acknowledged
#[derive(Debug, Serialize)]
pub struct StopJobResponse {
    pub message: &'static str,
    pub status: JobStatus,
}

/// Plain acknowledgement
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}

/// Voice connect result.
///
/// A live duplicate is reported as `{"status": "already_connected", ...}`.
#[derive(Debug, Serialize)]
pub struct ConnectVoiceResponse {
    pub connection_id: String,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<ConnectOutcome> for ConnectVoiceResponse {
    fn from(outcome: ConnectOutcome) -> Self {
        let status = if outcome.already_connected {
            "already_connected".to_string()
        } else {
            outcome.status.as_str().to_string()
        };
        Self {
            connection_id: outcome.connection_id,
            status,
            error: outcome.error,
        }
    }
}

/// Voice session status poll
#[derive(Debug, Serialize)]
pub struct VoiceStatusResponse {
    pub status: &'static str,
}

impl From<SessionStatus> for VoiceStatusResponse {
    fn from(status: SessionStatus) -> Self {
        Self {
            status: status.as_str(),
        }
    }
}

impl VoiceStatusResponse {
    pub fn not_found() -> Self {
        Self { status: "not_found" }
    }
}
