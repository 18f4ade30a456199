//! Test fixtures for common types.

use std::sync::Arc;

use webstore_config::{NotifyOptions, WebStorageConfig};
use webstore_storage::{LOCAL_STORAGE, MemoryStore, SESSION_STORAGE, StorageHost};
use webstore_telemetry::{LogConfig, LogFormat, setup_logging};

/// Default configuration (`__` prefix, `localStorage`).
#[must_use]
pub fn test_config() -> WebStorageConfig {
    WebStorageConfig::default()
}

/// Default configuration with every notification enabled.
#[must_use]
pub fn test_config_notify_all() -> WebStorageConfig {
    WebStorageConfig::default().with_notify_on(NotifyOptions::all())
}

/// Default configuration with every notification disabled.
#[must_use]
pub fn test_config_silent() -> WebStorageConfig {
    WebStorageConfig::default().with_notify_on(NotifyOptions::none())
}

/// Host with independent in-memory `localStorage` and `sessionStorage`.
#[must_use]
pub fn test_host() -> StorageHost {
    StorageHost::in_memory()
}

/// Host whose `localStorage` rejects every write over `quota` bytes.
///
/// A quota of `0` fails the writability probe.
#[must_use]
pub fn test_host_with_quota(quota: usize) -> StorageHost {
    StorageHost::new()
        .with_store(LOCAL_STORAGE, Arc::new(MemoryStore::new().with_quota(quota)))
        .with_store(SESSION_STORAGE, Arc::new(MemoryStore::new()))
}

/// Host exposing no stores at all.
#[must_use]
pub fn test_empty_host() -> StorageHost {
    StorageHost::new()
}

/// Install a compact log subscriber for test output.
///
/// Uses `RUST_LOG` as the level (default `warn`). Safe to call from many
/// tests: only the first call installs anything.
pub fn init_test_logging() {
    let level = std::env::var("RUST_LOG").unwrap_or_else(|_| "warn".to_owned());
    let config = LogConfig::new(level)
        .with_format(LogFormat::Compact)
        .without_ansi();
    let _ = setup_logging(&config);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_host_fixture_has_builtins() {
        let host = test_host();
        assert!(host.contains(LOCAL_STORAGE));
        assert!(host.contains(SESSION_STORAGE));
        assert!(!test_empty_host().contains(LOCAL_STORAGE));
    }

    #[test]
    fn test_quota_host_rejects_writes() {
        let host = test_host_with_quota(0);
        let store = host.store(LOCAL_STORAGE).unwrap();
        assert!(store.set_item("k", "v").is_err());
    }

    #[test]
    fn test_config_fixtures() {
        assert!(test_config_notify_all().notify_on.remove_all);
        assert!(!test_config_silent().notify_on.set);
        assert_eq!(test_config().prefix, "__");
    }
}
