//! Config file loading.
//!
//! `load_file()` algorithm:
//! 1. Parse `defaults.toml` → base
//! 2. Normalize camelCase keys, then deep-merge the file over the base
//! 3. For fields the file left unset, apply `WEBSTORE_*` env fallbacks
//! 4. Deserialize merged tree → `WebStorageConfig`
//! 5. Validate

use std::collections::HashMap;
use std::path::Path;

use tracing::{debug, info};

use crate::error::{ConfigError, ConfigResult};
use crate::types::WebStorageConfig;
use crate::validate;

/// Embedded default configuration.
const DEFAULTS_TOML: &str = include_str!("defaults.toml");

/// Maximum allowed config file size (1 MB).
const MAX_CONFIG_FILE_SIZE: u64 = 1_048_576;

/// camelCase spellings accepted for JSON-style configs, and their canonical
/// names.
const KEY_ALIASES: &[(&str, &str)] = &[("notifyOn", "notify_on"), ("removeAll", "remove_all")];

/// Environment variables consulted for top-level fields, and the field each
/// one fills.
const ENV_FALLBACKS: &[(&str, &str)] = &[
    ("WEBSTORE_PREFIX", "prefix"),
    ("WEBSTORE_PROVIDER", "provider"),
];

/// Load configuration from `path`, or from defaults and environment alone
/// when `path` is `None`.
///
/// # Errors
///
/// Returns a [`ConfigError`] if the file cannot be read or parsed, or the
/// result fails validation.
pub fn load(path: Option<&Path>) -> ConfigResult<WebStorageConfig> {
    load_with_env(path, &collect_env_vars())
}

/// Load configuration from `path` with environment fallbacks.
///
/// # Errors
///
/// Returns a [`ConfigError`] if the file cannot be read or parsed, or the
/// result fails validation.
pub fn load_file(path: &Path) -> ConfigResult<WebStorageConfig> {
    load(Some(path))
}

/// [`load`] with an explicit environment, for callers that manage their own.
///
/// # Errors
///
/// Returns a [`ConfigError`] if the file cannot be read or parsed, or the
/// result fails validation.
pub fn load_with_env(
    path: Option<&Path>,
    env_vars: &HashMap<String, String>,
) -> ConfigResult<WebStorageConfig> {
    let mut merged: toml::Value =
        toml::from_str(DEFAULTS_TOML).map_err(|e| ConfigError::ParseError {
            path: "<embedded defaults>".to_owned(),
            source: e,
        })?;

    let overlay = match path {
        Some(p) => {
            let mut overlay = read_toml(p)?;
            normalize_keys(&mut overlay);
            info!(path = %p.display(), "loaded webstore config");
            overlay
        },
        None => toml::Value::Table(toml::map::Map::new()),
    };

    deep_merge(&mut merged, &overlay);
    let applied = apply_env_fallbacks(&mut merged, &overlay, env_vars);
    if applied > 0 {
        debug!(count = applied, "applied environment variable fallbacks");
    }

    let config: WebStorageConfig =
        merged
            .try_into()
            .map_err(|e: toml::de::Error| ConfigError::ParseError {
                path: "<merged config>".to_owned(),
                source: e,
            })?;

    validate::validate(&config)?;
    Ok(config)
}

/// Recursively deep-merge `overlay` into `base`.
///
/// - Tables merge recursively per-field.
/// - Scalars and arrays from the overlay **replace** the base value.
pub fn deep_merge(base: &mut toml::Value, overlay: &toml::Value) {
    match (base, overlay) {
        (toml::Value::Table(base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                if let Some(base_val) = base_table.get_mut(key) {
                    deep_merge(base_val, overlay_val);
                } else {
                    base_table.insert(key.clone(), overlay_val.clone());
                }
            }
        },
        (base, overlay) => {
            *base = overlay.clone();
        },
    }
}

/// Rename aliased keys to their canonical form, recursively. A canonical key
/// already present wins over its alias.
fn normalize_keys(value: &mut toml::Value) {
    let toml::Value::Table(table) = value else {
        return;
    };
    for (alias, canonical) in KEY_ALIASES {
        if let Some(aliased) = table.remove(*alias)
            && !table.contains_key(*canonical)
        {
            table.insert((*canonical).to_owned(), aliased);
        }
    }
    for (_, nested) in table.iter_mut() {
        normalize_keys(nested);
    }
}

/// Fill fields the overlay did not set from the environment.
fn apply_env_fallbacks(
    merged: &mut toml::Value,
    overlay: &toml::Value,
    env_vars: &HashMap<String, String>,
) -> usize {
    let Some(table) = merged.as_table_mut() else {
        return 0;
    };

    let mut applied = 0usize;
    for (var, field) in ENV_FALLBACKS {
        if overlay.get(field).is_some() {
            continue;
        }
        if let Some(value) = env_vars.get(*var) {
            table.insert((*field).to_owned(), toml::Value::String(value.clone()));
            applied = applied.saturating_add(1);
        }
    }
    applied
}

fn collect_env_vars() -> HashMap<String, String> {
    std::env::vars()
        .filter(|(k, _)| k.starts_with("WEBSTORE_"))
        .collect()
}

fn read_toml(path: &Path) -> ConfigResult<toml::Value> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
        path: path.display().to_string(),
        source: e,
    })?;

    // Check size after reading to avoid TOCTOU between stat and read.
    if content.len() as u64 > MAX_CONFIG_FILE_SIZE {
        return Err(ConfigError::invalid(
            path.display().to_string(),
            format!(
                "file is {} bytes, over the {MAX_CONFIG_FILE_SIZE} byte limit",
                content.len()
            ),
        ));
    }

    toml::from_str(&content).map_err(|e| ConfigError::ParseError {
        path: path.display().to_string(),
        source: e,
    })
}
