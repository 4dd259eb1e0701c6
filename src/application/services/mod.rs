//! Application Services
//!
//! Business logic that coordinates the registry, the platform REST client
//! and the gateway client.
//!
//! ## Available Services
//!
//! - **TypingService**: line-by-line message posting jobs
//! - **VoiceService**: gateway sessions holding a voice channel

pub mod typing_service;
pub mod voice_service;

// Re-export typing service types
pub use typing_service::{CreateJobDto, TypingError, TypingService, TypingServiceImpl};

// Re-export voice service types
pub use voice_service::{ConnectOutcome, ConnectVoiceDto, VoiceError, VoiceService, VoiceServiceImpl};
