//! Relay Telemetry - Logging for the Telegram relay.
//!
//! Logs go to stderr by default: in stdio transport mode stdout carries the
//! MCP JSON-RPC stream and must stay clean.
//!
//! # Example
//!
//! ```rust,no_run
//! use relay_telemetry::{LogConfig, LogFormat, setup_logging};
//!
//! # fn main() -> Result<(), relay_telemetry::TelemetryError> {
//! let config = LogConfig::new("debug")
//!     .with_format(LogFormat::Compact)
//!     .with_directive("teloxide=warn");
//!
//! setup_logging(&config)?;
//! tracing::info!("Relay starting");
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

mod error;
mod logging;

pub use error::{TelemetryError, TelemetryResult};
pub use logging::{LogConfig, LogFormat, LogTarget, setup_logging};
