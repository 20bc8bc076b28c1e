//! Relay Config - Layered configuration for the Telegram relay.
//!
//! Sources, lowest to highest priority:
//!
//! 1. Embedded `defaults.toml`
//! 2. A TOML file (`--config`, `$RELAY_CONFIG`, or the user config dir)
//! 3. Environment variables, only for fields the file left unset
//! 4. Command-line overrides
//!
//! The merged [`Config`] is validated into typed [`Settings`].
//!
//! # Example
//!
//! ```rust,no_run
//! use relay_config::{Overrides, load};
//!
//! let settings = load(None, &Overrides::default())?;
//! println!("listening on {}", settings.listen_addr);
//! # Ok::<(), relay_config::ConfigError>(())
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

mod env;
mod error;
mod loader;
mod merge;
mod types;
mod validate;

pub use env::collect_env_vars;
pub use error::{ConfigError, ConfigResult};
pub use loader::{CONFIG_ENV_VAR, Overrides, load, load_with_env, user_config_path};
pub use types::{
    Config, LoggingSection, RawChatId, RelaySection, ServerSection, TelegramSection,
    TransportMode,
};
pub use validate::{Settings, validate};
