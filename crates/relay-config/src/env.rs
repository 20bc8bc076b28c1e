//! Environment variable fallbacks.
//!
//! Env vars are **fallback**, not override: each is applied only when the
//! config file did not set the field it maps to.

use std::collections::HashMap;

use tracing::debug;

use crate::error::{ConfigError, ConfigResult};
use crate::merge::FileFields;

/// Mapping from environment variable name to config field path.
struct EnvMapping {
    var_name: &'static str,
    field_path: &'static str,
}

const ENV_MAPPINGS: &[EnvMapping] = &[
    EnvMapping {
        var_name: "TELEGRAM_BOT_TOKEN",
        field_path: "telegram.bot_token",
    },
    EnvMapping {
        var_name: "TELEGRAM_CHAT_ID",
        field_path: "telegram.chat_id",
    },
    EnvMapping {
        var_name: "WEBHOOK_URL",
        field_path: "telegram.webhook_url",
    },
    EnvMapping {
        var_name: "TRANSPORT_MODE",
        field_path: "server.transport",
    },
    EnvMapping {
        var_name: "PORT",
        field_path: "server.port",
    },
    EnvMapping {
        var_name: "RELAY_BIND",
        field_path: "server.bind",
    },
    EnvMapping {
        var_name: "RELAY_AGENT_NAME",
        field_path: "relay.agent_name",
    },
    EnvMapping {
        var_name: "RELAY_APPROVAL_TIMEOUT_SECS",
        field_path: "relay.approval_timeout_secs",
    },
    EnvMapping {
        var_name: "RELAY_PROMPT_TIMEOUT_SECS",
        field_path: "relay.prompt_timeout_secs",
    },
    EnvMapping {
        var_name: "RELAY_LOG_LEVEL",
        field_path: "logging.level",
    },
    EnvMapping {
        var_name: "RELAY_LOG_FORMAT",
        field_path: "logging.format",
    },
];

/// Fields stored as TOML integers.
const INTEGER_FIELDS: &[&str] = &[
    "telegram.chat_id",
    "server.port",
    "relay.approval_timeout_secs",
    "relay.prompt_timeout_secs",
];

/// Apply env fallbacks to fields not in `set_by_file`.
///
/// Empty values are treated as unset. Returns the number applied.
pub(crate) fn apply_env_fallbacks<S: ::std::hash::BuildHasher>(
    merged: &mut toml::Value,
    set_by_file: &FileFields,
    env_vars: &HashMap<String, String, S>,
) -> ConfigResult<usize> {
    let mut count: usize = 0;

    for mapping in ENV_MAPPINGS {
        if set_by_file.contains(mapping.field_path) {
            continue;
        }
        let Some(raw) = env_vars.get(mapping.var_name) else {
            continue;
        };
        let val = raw.trim();
        if val.is_empty() {
            continue;
        }

        debug!(
            var = mapping.var_name,
            field = mapping.field_path,
            "applying env var fallback"
        );
        let toml_val = coerce(mapping, val)?;
        set_field(merged, mapping.field_path, toml_val);
        count = count.saturating_add(1);
    }

    Ok(count)
}

fn coerce(mapping: &EnvMapping, val: &str) -> ConfigResult<toml::Value> {
    if INTEGER_FIELDS.contains(&mapping.field_path) {
        return val
            .parse::<i64>()
            .map(toml::Value::Integer)
            .map_err(|_| ConfigError::EnvError {
                var_name: mapping.var_name.to_owned(),
                message: format!("expected an integer, got '{val}'"),
            });
    }
    Ok(toml::Value::String(val.to_owned()))
}

/// Set a dotted `path` in the tree, creating intermediate tables.
pub(crate) fn set_field(root: &mut toml::Value, path: &str, val: toml::Value) {
    let mut segments = path.split('.').peekable();
    let mut current = root;

    while let Some(segment) = segments.next() {
        let Some(table) = current.as_table_mut() else {
            return;
        };
        if segments.peek().is_none() {
            table.insert(segment.to_owned(), val);
            return;
        }
        current = table
            .entry(segment.to_owned())
            .or_insert_with(|| toml::Value::Table(toml::map::Map::new()));
    }
}

/// Collect all current environment variables into a map.
#[must_use]
pub fn collect_env_vars() -> HashMap<String, String> {
    std::env::vars().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect()
    }

    fn empty_tree() -> toml::Value {
        toml::Value::Table(toml::map::Map::new())
    }

    #[test]
    fn applies_unset_fields() {
        let mut tree = empty_tree();
        let env = make_env(&[
            ("TELEGRAM_BOT_TOKEN", "123:abc"),
            ("TELEGRAM_CHAT_ID", "-100"),
            ("PORT", "8080"),
        ]);

        let count = apply_env_fallbacks(&mut tree, &FileFields::new(), &env).unwrap();

        assert_eq!(count, 3);
        assert_eq!(tree["telegram"]["bot_token"].as_str(), Some("123:abc"));
        assert_eq!(tree["telegram"]["chat_id"].as_integer(), Some(-100));
        assert_eq!(tree["server"]["port"].as_integer(), Some(8080));
    }

    #[test]
    fn file_values_win() {
        let mut tree: toml::Value = toml::from_str("[server]\nport = 9000\n").unwrap();
        let mut set = FileFields::new();
        set.insert("server.port".to_owned());
        let env = make_env(&[("PORT", "8080")]);

        let count = apply_env_fallbacks(&mut tree, &set, &env).unwrap();

        assert_eq!(count, 0);
        assert_eq!(tree["server"]["port"].as_integer(), Some(9000));
    }

    #[test]
    fn env_overrides_defaults() {
        let mut tree: toml::Value = toml::from_str("[server]\ntransport = \"stdio\"\n").unwrap();
        let env = make_env(&[("TRANSPORT_MODE", "http")]);

        apply_env_fallbacks(&mut tree, &FileFields::new(), &env).unwrap();

        assert_eq!(tree["server"]["transport"].as_str(), Some("http"));
    }

    #[test]
    fn empty_values_are_unset() {
        let mut tree = empty_tree();
        let env = make_env(&[("WEBHOOK_URL", "  ")]);
        assert_eq!(
            apply_env_fallbacks(&mut tree, &FileFields::new(), &env).unwrap(),
            0
        );
        assert!(tree.get("telegram").is_none());
    }

    #[test]
    fn non_numeric_port_is_env_error() {
        let mut tree = empty_tree();
        let env = make_env(&[("PORT", "eighty")]);
        let err = apply_env_fallbacks(&mut tree, &FileFields::new(), &env).unwrap_err();
        assert!(matches!(err, ConfigError::EnvError { ref var_name, .. } if var_name == "PORT"));
    }

    #[test]
    fn non_numeric_chat_id_is_env_error() {
        let mut tree = empty_tree();
        let env = make_env(&[("TELEGRAM_CHAT_ID", "@my_channel")]);
        let err = apply_env_fallbacks(&mut tree, &FileFields::new(), &env).unwrap_err();
        assert!(
            matches!(err, ConfigError::EnvError { ref var_name, .. } if var_name == "TELEGRAM_CHAT_ID")
        );
        assert!(tree.get("telegram").is_none());
    }

    #[test]
    fn set_field_creates_tables() {
        let mut tree = empty_tree();
        set_field(&mut tree, "a.b.c", toml::Value::Boolean(true));
        assert_eq!(tree["a"]["b"]["c"].as_bool(), Some(true));
    }
}
