//! Request DTOs
//!
//! Data structures for API request bodies.

use serde::Deserialize;
use validator::Validate;

use crate::application::services::ConnectVoiceDto;

/// Voice connect request. Fields are optional so that a missing one is
/// reported with the same message as an empty one.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct ConnectVoiceRequest {
    #[serde(default)]
    #[validate(length(max = 512, message = "Token is too long"))]
    pub token: Option<String>,

    #[serde(default)]
    #[validate(length(max = 32, message = "Guild ID is too long"))]
    pub guild_id: Option<String>,

    #[serde(default)]
    #[validate(length(max = 32, message = "Channel ID is too long"))]
    pub channel_id: Option<String>,
}

impl ConnectVoiceRequest {
    /// All three fields present and non-empty.
    pub fn into_dto(self) -> Option<ConnectVoiceDto> {
        let present = |value: Option<String>| value.filter(|v| !v.trim().is_empty());
        Some(ConnectVoiceDto {
            token: present(self.token)?,
            guild_id: present(self.guild_id)?.trim().to_string(),
            channel_id: present(self.channel_id)?.trim().to_string(),
        })
    }
}

/// Voice disconnect request
#[derive(Debug, Default, Deserialize)]
pub struct DisconnectVoiceRequest {
    #[serde(default)]
    pub connection_id: Option<String>,
}

/// Fields collected from the multipart `/start` form
#[derive(Debug, Default)]
pub struct StartTypingForm {
    pub token: Option<String>,
    pub channel_id: Option<String>,
    pub delay: Option<String>,
    pub file: Option<Vec<u8>>,
}
