//! Relay Gateway - the HTTP surface of the relay.
//!
//! This crate provides:
//! - `GET /health` with queue and connection counts
//! - `GET /sse` + `POST /messages` carrying MCP sessions over Server-Sent Events
//! - `POST /webhook` for Telegram webhook delivery
//! - Graceful shutdown that ends open SSE streams

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod error;
pub mod routes;
pub mod server;
pub mod session;
pub mod state;

pub use error::{GatewayError, GatewayResult};
pub use routes::{HealthResponse, router};
pub use server::{bind, serve};
pub use session::SessionRegistry;
pub use state::GatewayState;
