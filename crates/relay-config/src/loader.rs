//! Config file discovery and layered loading.
//!
//! 1. Parse `defaults.toml` → base
//! 2. Merge the config file (`--config`, `$RELAY_CONFIG`, or user config dir)
//! 3. Apply env var fallbacks for fields the file left unset
//! 4. Apply command-line overrides
//! 5. Deserialize → [`Config`], validate → [`Settings`]

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::env::{apply_env_fallbacks, collect_env_vars, set_field};
use crate::error::{ConfigError, ConfigResult};
use crate::merge::{FileFields, merge_tracking};
use crate::types::{Config, TransportMode};
use crate::validate::{Settings, validate};

/// Embedded default configuration.
const DEFAULTS_TOML: &str = include_str!("defaults.toml");

/// Maximum allowed config file size (1 MB).
const MAX_CONFIG_FILE_SIZE: u64 = 1_048_576;

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV_VAR: &str = "RELAY_CONFIG";

/// Values given on the command line. They beat every other layer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Overrides {
    /// `--transport`
    pub transport: Option<TransportMode>,
    /// `--port`
    pub port: Option<u16>,
}

/// Load settings from the process environment.
///
/// # Errors
///
/// Returns a [`ConfigError`] if a file cannot be read or parsed, an env var
/// is malformed, or the merged configuration fails validation.
pub fn load(config_path: Option<&Path>, overrides: &Overrides) -> ConfigResult<Settings> {
    load_with_env(config_path, overrides, &collect_env_vars())
}

/// Load settings with an explicit environment map.
///
/// # Errors
///
/// See [`load`].
pub fn load_with_env<S: ::std::hash::BuildHasher>(
    config_path: Option<&Path>,
    overrides: &Overrides,
    env_vars: &HashMap<String, String, S>,
) -> ConfigResult<Settings> {
    let config = load_config(config_path, overrides, env_vars)?;
    validate(&config)
}

fn load_config<S: ::std::hash::BuildHasher>(
    config_path: Option<&Path>,
    overrides: &Overrides,
    env_vars: &HashMap<String, String, S>,
) -> ConfigResult<Config> {
    let mut merged: toml::Value =
        toml::from_str(DEFAULTS_TOML).map_err(|e| ConfigError::ParseError {
            path: "<embedded defaults>".to_owned(),
            source: e,
        })?;
    let mut set_by_file = FileFields::new();

    // An explicitly named file must exist; the user config file is optional.
    let explicit = config_path
        .map(Path::to_path_buf)
        .or_else(|| env_vars.get(CONFIG_ENV_VAR).map(PathBuf::from));
    let file = match explicit {
        Some(path) => Some((read_file(&path)?, path)),
        None => match user_config_path() {
            Some(path) => try_load_file(&path)?.map(|overlay| (overlay, path)),
            None => None,
        },
    };
    if let Some((overlay, path)) = file {
        merge_tracking(&mut merged, &overlay, "", &mut set_by_file);
        info!(path = %path.display(), "loaded config file");
    }

    let env_count = apply_env_fallbacks(&mut merged, &set_by_file, env_vars)?;
    if env_count > 0 {
        debug!(count = env_count, "applied environment variable fallbacks");
    }

    if let Some(transport) = overrides.transport {
        set_field(
            &mut merged,
            "server.transport",
            toml::Value::String(transport.as_str().to_owned()),
        );
    }
    if let Some(port) = overrides.port {
        set_field(&mut merged, "server.port", toml::Value::Integer(port.into()));
    }

    merged
        .try_into()
        .map_err(|e: toml::de::Error| ConfigError::ParseError {
            path: "<merged config>".to_owned(),
            source: e,
        })
}

/// `config.toml` in the platform config directory, e.g.
/// `~/.config/telegram-relay/config.toml`.
#[must_use]
pub fn user_config_path() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "telegram-relay")
        .map(|dirs| dirs.config_dir().join("config.toml"))
}

fn read_file(path: &Path) -> ConfigResult<toml::Value> {
    try_load_file(path)?.ok_or_else(|| ConfigError::ReadError {
        path: path.display().to_string(),
        source: std::io::Error::from(std::io::ErrorKind::NotFound),
    })
}

/// Try to load a file, returning `None` if the file doesn't exist.
///
/// Reads once and checks the size afterwards, so there is no window between
/// a metadata check and the read.
fn try_load_file(path: &Path) -> ConfigResult<Option<toml::Value>> {
    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "config file not found, skipping");
            return Ok(None);
        },
        Err(e) => {
            return Err(ConfigError::ReadError {
                path: path.display().to_string(),
                source: e,
            });
        },
    };

    if content.len() as u64 > MAX_CONFIG_FILE_SIZE {
        return Err(ConfigError::ValidationError {
            field: path.display().to_string(),
            message: format!(
                "config file is {} bytes, exceeding the {} byte limit",
                content.len(),
                MAX_CONFIG_FILE_SIZE
            ),
        });
    }

    let value: toml::Value = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
        path: path.display().to_string(),
        source: e,
    })?;

    Ok(Some(value))
}
