use crate::config::Config;
use crate::errors::{AppError, AppResult};
use serde_yaml::{Mapping, Value};
use std::fs;
use std::path::Path;

/// Keys renamed since the first releases: (old, new).
const RENAMED_KEYS: &[(&str, &str)] = &[("server_url", "api_base_url"), ("token", "api_token")];

fn read_mapping(path: &Path) -> AppResult<Mapping> {
    let content = fs::read_to_string(path)?;
    match serde_yaml::from_str::<Value>(&content)? {
        Value::Mapping(m) => Ok(m),
        Value::Null => Ok(Mapping::new()),
        _ => Err(AppError::Config(format!(
            "{} is not a YAML mapping",
            path.display()
        ))),
    }
}

fn default_mapping() -> AppResult<Mapping> {
    match serde_yaml::to_value(Config::default())? {
        Value::Mapping(m) => Ok(m),
        _ => Err(AppError::Other("default config is not a mapping".into())),
    }
}

/// Keys present in the current schema but absent from the file at `path`.
pub fn missing_keys(path: &Path) -> AppResult<Vec<String>> {
    let current = read_mapping(path)?;
    let defaults = default_mapping()?;

    Ok(defaults
        .keys()
        .filter(|k| !current.contains_key(*k))
        .filter_map(|k| k.as_str().map(str::to_string))
        .collect())
}

/// Rename legacy keys and add every missing key with its default value.
/// Existing values are never overwritten.
///   Returns the list of keys that were added or renamed (empty → no change).
pub fn migrate_config_file(path: &Path) -> AppResult<Vec<String>> {
    let mut current = read_mapping(path)?;
    let mut changed = Vec::new();

    for (old, new) in RENAMED_KEYS {
        let old_key = Value::String((*old).to_string());
        let new_key = Value::String((*new).to_string());
        if let Some(v) = current.remove(&old_key) {
            if !current.contains_key(&new_key) {
                current.insert(new_key, v);
            }
            changed.push(format!("{old} → {new}"));
        }
    }

    for (k, v) in default_mapping()? {
        if !current.contains_key(&k) {
            if let Some(name) = k.as_str() {
                changed.push(name.to_string());
            }
            current.insert(k, v);
        }
    }

    if !changed.is_empty() {
        let yaml = serde_yaml::to_string(&Value::Mapping(current))
            .map_err(|_| AppError::ConfigSave)?;
        fs::write(path, yaml)?;
    }

    Ok(changed)
}
