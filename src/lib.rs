//! # Autotyper Library
//!
//! A small control service for one chat-platform account:
//! - Typing jobs that post the lines of an uploaded file to a text channel
//!   one at a time with a fixed delay
//! - Voice presence sessions that keep a gateway connection joined to a
//!   voice channel until told to leave
//!
//! ## Architecture
//!
//! - **Domain Layer**: Job and session records with their lifecycle rules
//! - **Application Layer**: Typing and voice services, request/response DTOs
//! - **Infrastructure Layer**: Platform REST client, gateway protocol,
//!   connection registry, metrics
//! - **Presentation Layer**: HTTP handlers and middleware
//!
//! ## Module Structure
//!
//! ```text
//! autotyper/
//! +-- config/         Configuration management
//! +-- domain/         Job and session entities
//! +-- application/    Services and DTOs
//! +-- infrastructure/ Gateway, platform client, registry, metrics
//! +-- presentation/   HTTP routes and middleware
//! +-- shared/         Common utilities (errors, job ids, validation)
//! ```

// Configuration module
pub mod config;

// Domain layer - Core business logic
pub mod domain;

// Application layer - Business services
pub mod application;

// Infrastructure layer - External implementations
pub mod infrastructure;

// Presentation layer - HTTP handlers
pub mod presentation;

// Shared utilities
pub mod shared;

// Application startup and state management
pub mod startup;

// Telemetry and observability
pub mod telemetry;
