//! # Infrastructure Layer
//!
//! Implementations that talk to the outside world or hold process state:
//! - `platform`: REST client for posting channel messages
//! - `gateway`: persistent real-time connection and handshake
//! - `registry`: in-memory job and session store
//! - `metrics`: Prometheus metrics

pub mod gateway;
pub mod metrics;
pub mod platform;
pub mod registry;
