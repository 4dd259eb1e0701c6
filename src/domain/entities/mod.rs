//! # Domain Entities
//!
//! Records tracked for each unit of background work.
//!
//! - **TypingJob**: progress of posting a list of lines into a channel
//! - **VoiceSession**: state of a gateway connection holding a voice channel

mod typing_job;
mod voice_session;

pub use typing_job::{JobStatus, TypingJob};
pub use voice_session::{session_id, SessionStatus, VoiceSession};
