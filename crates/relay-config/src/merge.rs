//! Deep merge of TOML layers with tracking of which leaves a file set.

use std::collections::HashSet;

/// Dotted paths of leaf values set by the config file.
pub(crate) type FileFields = HashSet<String>;

/// Merge `overlay` into `base`. Tables merge recursively; any other value
/// replaces what was there and its path is recorded in `set_by_file`.
pub(crate) fn merge_tracking(
    base: &mut toml::Value,
    overlay: &toml::Value,
    prefix: &str,
    set_by_file: &mut FileFields,
) {
    let (Some(base_table), toml::Value::Table(overlay_table)) = (base.as_table_mut(), overlay)
    else {
        *base = overlay.clone();
        set_by_file.insert(prefix.to_owned());
        return;
    };

    for (key, value) in overlay_table {
        let path = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{prefix}.{key}")
        };
        match base_table.get_mut(key) {
            Some(existing) if existing.is_table() && value.is_table() => {
                merge_tracking(existing, value, &path, set_by_file);
            },
            _ => {
                base_table.insert(key.clone(), value.clone());
                record_leaves(value, &path, set_by_file);
            },
        }
    }
}

fn record_leaves(value: &toml::Value, path: &str, set_by_file: &mut FileFields) {
    match value {
        toml::Value::Table(table) => {
            for (key, child) in table {
                record_leaves(child, &format!("{path}.{key}"), set_by_file);
            }
        },
        _ => {
            set_by_file.insert(path.to_owned());
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overlay_replaces_leaves_and_records_them() {
        let mut base: toml::Value =
            toml::from_str("[server]\nport = 3000\nbind = \"0.0.0.0\"\n").unwrap();
        let overlay: toml::Value = toml::from_str("[server]\nport = 8080\n").unwrap();
        let mut set = FileFields::new();

        merge_tracking(&mut base, &overlay, "", &mut set);

        assert_eq!(base["server"]["port"].as_integer(), Some(8080));
        assert_eq!(base["server"]["bind"].as_str(), Some("0.0.0.0"));
        assert!(set.contains("server.port"));
        assert!(!set.contains("server.bind"));
    }

    #[test]
    fn new_tables_record_every_leaf() {
        let mut base: toml::Value = toml::from_str("[server]\nport = 1\n").unwrap();
        let overlay: toml::Value =
            toml::from_str("[telegram]\nbot_token = \"t\"\nchat_id = 5\n").unwrap();
        let mut set = FileFields::new();

        merge_tracking(&mut base, &overlay, "", &mut set);

        assert!(set.contains("telegram.bot_token"));
        assert!(set.contains("telegram.chat_id"));
        assert_eq!(base["telegram"]["chat_id"].as_integer(), Some(5));
    }
}
