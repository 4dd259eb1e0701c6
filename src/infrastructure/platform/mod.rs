//! Remote platform REST client.

pub mod rest;

pub use rest::{HttpMessageSender, MessageSender};
