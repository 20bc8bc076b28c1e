//! Relay Test - Shared test utilities for the Telegram relay.
//!
//! This crate provides a recording [`MockTransport`] and fixtures for
//! building a [`Relay`](relay_core::Relay) without a real chat service.
//!
//! # Usage
//!
//! ```toml
//! [dev-dependencies]
//! relay-test.workspace = true
//! ```
//!
//! ```rust,ignore
//! use relay_test::{MockTransport, inbound_text, test_relay};
//!
//! #[tokio::test]
//! async fn queues_plain_text() {
//!     let mock = MockTransport::new();
//!     let relay = test_relay(&mock);
//!
//!     relay.handle_text(inbound_text("hello")).await;
//!
//!     assert_eq!(relay.queue().len(), 1);
//!     assert_eq!(mock.sent_texts(), vec!["Message queued. Qoder will pick it up."]);
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]

pub mod fixtures;
pub mod harness;
pub mod mocks;

pub use fixtures::*;
pub use harness::*;
pub use mocks::*;
