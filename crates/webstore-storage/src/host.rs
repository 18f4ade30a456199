//! The host environment: named storage areas injected into providers.
//!
//! Browsers hang `localStorage` and `sessionStorage` off the global window.
//! Here the same lookup is an explicit value, so providers never reach for
//! ambient state and tests can substitute in-memory fakes.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use crate::error::StorageResult;
use crate::file::JsonFileStore;
use crate::provider::{LOCAL_STORAGE, SESSION_STORAGE};
use crate::store::{BackingStore, MemoryStore};

/// A set of named backing stores exposed by the execution environment.
#[derive(Clone, Default)]
pub struct StorageHost {
    stores: HashMap<String, Arc<dyn BackingStore>>,
}

impl std::fmt::Debug for StorageHost {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<&String> = self.stores.keys().collect();
        names.sort();
        f.debug_struct("StorageHost")
            .field("stores", &names)
            .finish()
    }
}

impl StorageHost {
    /// An environment exposing no storage at all.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// An environment with independent in-memory local and session stores.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::new()
            .with_store(LOCAL_STORAGE, Arc::new(MemoryStore::new()))
            .with_store(SESSION_STORAGE, Arc::new(MemoryStore::new()))
    }

    /// An environment whose local store persists under `dir`.
    ///
    /// Session storage stays in memory and dies with the process.
    ///
    /// # Errors
    ///
    /// Returns an error if the local store file exists but cannot be loaded.
    pub fn persistent(dir: impl AsRef<Path>) -> StorageResult<Self> {
        let local = JsonFileStore::open(dir.as_ref().join(format!("{LOCAL_STORAGE}.json")))?;
        Ok(Self::new()
            .with_store(LOCAL_STORAGE, Arc::new(local))
            .with_store(SESSION_STORAGE, Arc::new(MemoryStore::new())))
    }

    /// Expose `store` under `name`, replacing any previous store of that name.
    #[must_use]
    pub fn with_store(mut self, name: impl Into<String>, store: Arc<dyn BackingStore>) -> Self {
        self.stores.insert(name.into(), store);
        self
    }

    /// Look up the store exposed under `name`.
    #[must_use]
    pub fn store(&self, name: &str) -> Option<Arc<dyn BackingStore>> {
        self.stores.get(name).map(Arc::clone)
    }

    /// Whether the environment exposes a store under `name`.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.stores.contains_key(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_in_memory_host_exposes_both_scopes() {
        let host = StorageHost::in_memory();
        assert!(host.contains(LOCAL_STORAGE));
        assert!(host.contains(SESSION_STORAGE));
        assert!(!host.contains("indexedDB"));
    }

    #[test]
    fn test_scopes_are_independent() {
        let host = StorageHost::in_memory();
        let local = host.store(LOCAL_STORAGE).unwrap();
        let session = host.store(SESSION_STORAGE).unwrap();

        local.set_item("k", "local").unwrap();
        assert!(session.get_item("k").is_none());
    }

    #[test]
    fn test_lookups_share_the_same_store() {
        let host = StorageHost::in_memory();
        host.store(LOCAL_STORAGE).unwrap().set_item("k", "v").unwrap();
        assert_eq!(
            host.store(LOCAL_STORAGE).unwrap().get_item("k").as_deref(),
            Some("v")
        );
    }

    #[test]
    fn test_persistent_host_reloads_local_scope() {
        let dir = tempfile::tempdir().unwrap();
        StorageHost::persistent(dir.path())
            .unwrap()
            .store(LOCAL_STORAGE)
            .unwrap()
            .set_item("k", "v")
            .unwrap();

        let host = StorageHost::persistent(dir.path()).unwrap();
        assert_eq!(
            host.store(LOCAL_STORAGE).unwrap().get_item("k").as_deref(),
            Some("v")
        );
        assert!(host.store(SESSION_STORAGE).unwrap().is_empty());
    }
}
