//! # Domain Layer
//!
//! Records and state machines for typing jobs and voice sessions.
//! Independent of the HTTP surface and of the remote platform.
//!
//! ## Design Principles
//!
//! - No dependencies on infrastructure or presentation layers
//! - State transitions live on the entities; callers only ask for them

pub mod entities;

pub use entities::*;
