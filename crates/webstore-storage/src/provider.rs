//! Storage providers: named adapters binding the façade to one backing store.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::error::{StorageError, StorageResult};
use crate::host::StorageHost;
use crate::store::BackingStore;

/// Name of the built-in persistent provider.
pub const LOCAL_STORAGE: &str = "localStorage";

/// Name of the built-in per-session provider.
pub const SESSION_STORAGE: &str = "sessionStorage";

/// A source of a [`BackingStore`] plus a check that it is usable.
///
/// Custom providers only need to implement this trait.
#[async_trait]
pub trait StorageProvider: Send + Sync {
    /// Provider name, for logging and relay tagging.
    fn name(&self) -> &str;

    /// The backing store, if the environment exposes one.
    fn get(&self) -> Option<Arc<dyn BackingStore>>;

    /// Probe availability and writability.
    ///
    /// Resolves with the store when it is safe to use.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Unavailable`] or [`StorageError::NotWritable`]
    /// when the probe fails.
    async fn validate(&self) -> StorageResult<Arc<dyn BackingStore>>;
}

/// Provider backed by a named store of a [`StorageHost`].
///
/// Both built-ins (`localStorage`, `sessionStorage`) are instances of this.
#[derive(Debug, Clone)]
pub struct HostStorageProvider {
    name: String,
    host: StorageHost,
}

impl HostStorageProvider {
    /// Bind the store `name` of `host`.
    #[must_use]
    pub fn new(name: impl Into<String>, host: StorageHost) -> Self {
        Self {
            name: name.into(),
            host,
        }
    }

    /// The built-in `localStorage` provider.
    #[must_use]
    pub fn local(host: StorageHost) -> Self {
        Self::new(LOCAL_STORAGE, host)
    }

    /// The built-in `sessionStorage` provider.
    #[must_use]
    pub fn session(host: StorageHost) -> Self {
        Self::new(SESSION_STORAGE, host)
    }

    fn sentinel_key(&self) -> String {
        format!("__test_{}__", self.name)
    }

    /// Write then delete a sentinel key.
    fn probe_writable(&self, store: &dyn BackingStore) -> StorageResult<()> {
        let sentinel = self.sentinel_key();
        let result = store
            .set_item(&sentinel, &sentinel)
            .and_then(|()| store.remove_item(&sentinel));

        result.map_err(|e| StorageError::NotWritable {
            provider: self.name.clone(),
            reason: e.to_string(),
        })
    }
}

#[async_trait]
impl StorageProvider for HostStorageProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn get(&self) -> Option<Arc<dyn BackingStore>> {
        self.host.store(&self.name)
    }

    async fn validate(&self) -> StorageResult<Arc<dyn BackingStore>> {
        let Some(store) = self.get() else {
            warn!(provider = %self.name, "storage is not available in this environment");
            return Err(StorageError::Unavailable {
                provider: self.name.clone(),
            });
        };

        if let Err(e) = self.probe_writable(store.as_ref()) {
            warn!(provider = %self.name, error = %e, "storage failed writability probe");
            return Err(e);
        }

        debug!(provider = %self.name, "storage validated");
        Ok(store)
    }
}
