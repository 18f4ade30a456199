//! Name-to-provider registry.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use tracing::debug;

use crate::error::{StorageError, StorageResult};
use crate::host::StorageHost;
use crate::provider::{HostStorageProvider, StorageProvider};
use crate::store::BackingStore;

#[derive(Default)]
struct Entries {
    order: Vec<String>,
    providers: HashMap<String, Arc<dyn StorageProvider>>,
}

/// Registry of named storage providers.
///
/// Providers are registered once and never removed. Registering a name twice
/// is rejected and the original provider stays in place.
#[derive(Default)]
pub struct ProviderRegistry {
    entries: RwLock<Entries>,
}

impl std::fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderRegistry")
            .field("providers", &self.names())
            .finish()
    }
}

impl ProviderRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry holding the built-in `localStorage` and
    /// `sessionStorage` providers for `host`.
    #[must_use]
    pub fn with_defaults(host: &StorageHost) -> Self {
        let registry = Self::new();
        for provider in [
            HostStorageProvider::local(host.clone()),
            HostStorageProvider::session(host.clone()),
        ] {
            let name = provider.name().to_owned();
            // Fresh registry: names cannot collide.
            let _ = registry.register(name, Arc::new(provider));
        }
        registry
    }

    /// Register `provider` under `name`.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::ProviderExists`] if `name` is taken.
    pub fn register(
        &self,
        name: impl Into<String>,
        provider: Arc<dyn StorageProvider>,
    ) -> StorageResult<()> {
        let name = name.into();
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        if entries.providers.contains_key(&name) {
            return Err(StorageError::ProviderExists(name));
        }

        debug!(provider = %name, "provider registered");
        entries.order.push(name.clone());
        entries.providers.insert(name, provider);
        Ok(())
    }

    /// Look up a provider by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<Arc<dyn StorageProvider>> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .providers
            .get(name)
            .map(Arc::clone)
    }

    /// Whether `name` is registered.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .providers
            .contains_key(name)
    }

    /// Registered names, in registration order.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .order
            .clone()
    }

    /// Number of registered providers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .order
            .len()
    }

    /// Whether no provider is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Validate the provider registered under `name`.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::UnknownProvider`] if `name` is not registered,
    /// otherwise whatever the provider's validation yields.
    pub async fn activate(&self, name: &str) -> StorageResult<Arc<dyn BackingStore>> {
        // Clone out so no lock is held across the validation await.
        let provider = self
            .get(name)
            .ok_or_else(|| StorageError::UnknownProvider(name.to_owned()))?;
        provider.validate().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::{LOCAL_STORAGE, SESSION_STORAGE};

    #[test]
    fn test_defaults_registered_in_order() {
        let registry = ProviderRegistry::with_defaults(&StorageHost::in_memory());
        assert_eq!(registry.names(), vec![LOCAL_STORAGE, SESSION_STORAGE]);
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_duplicate_registration_rejected() {
        let host = StorageHost::in_memory();
        let registry = ProviderRegistry::new();
        assert!(registry.is_empty());

        registry
            .register("custom", Arc::new(HostStorageProvider::local(host.clone())))
            .unwrap();
        let err = registry
            .register("custom", Arc::new(HostStorageProvider::session(host)))
            .unwrap_err();

        assert_eq!(err, StorageError::ProviderExists("custom".into()));
        assert_eq!(registry.len(), 1);
        // The original provider is kept.
        assert_eq!(registry.get("custom").unwrap().name(), LOCAL_STORAGE);
    }

    #[tokio::test]
    async fn test_activate_unknown_provider() {
        let registry = ProviderRegistry::with_defaults(&StorageHost::in_memory());
        let err = registry.activate("indexedDB").await.err().unwrap();
        assert_eq!(err, StorageError::UnknownProvider("indexedDB".into()));
    }

    #[tokio::test]
    async fn test_activate_validates_provider() {
        let registry = ProviderRegistry::with_defaults(&StorageHost::new());
        assert!(registry.contains(LOCAL_STORAGE));

        let err = registry.activate(LOCAL_STORAGE).await.err().unwrap();
        assert!(matches!(err, StorageError::Unavailable { .. }));
    }

    #[tokio::test]
    async fn test_activate_returns_store() {
        let registry = ProviderRegistry::with_defaults(&StorageHost::in_memory());
        let store = registry.activate(SESSION_STORAGE).await.unwrap();
        assert!(store.is_empty());
    }
}
