//! Minimal chat client for the Twitch IRC gateway.
//!
//! Architecture:
//! - Consumer thread: owns a [`ChatClient`], drains events on its own
//!   schedule, and owns the bounded chat buffer
//! - Backend thread: runs a Tokio runtime driving the socket, registration,
//!   line dispatch, and the rate-limited outbound queue
//! - Communication via crossbeam channels (lock-free, sync-safe)

pub mod backend;
pub mod buffer;
pub mod client;
pub mod config;
pub mod error;
pub mod parser;
pub mod protocol;
pub mod queue;
pub mod validation;

#[cfg(test)]
mod backend_tests;

pub use buffer::{ChatBuffer, ChatEntry};
pub use client::{ChatClient, ChatObserver};
pub use config::ClientConfig;
pub use error::ClientError;
pub use protocol::{ClientEvent, Credentials, StatusKind};
