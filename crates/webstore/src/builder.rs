//! Fluent construction of a [`WebStorage`].

use std::sync::Arc;

use webstore_config::{ConfigPatch, NotifyOptions, WebStorageConfig};
use webstore_events::{ContextRelay, DEFAULT_CHANNEL_CAPACITY, NotificationBus};
use webstore_storage::{ProviderRegistry, StorageHost, StorageProvider};

use crate::service::WebStorage;

/// Builder for [`WebStorage`].
///
/// ```rust
/// use webstore::WebStorage;
/// use webstore_storage::{StorageHost, SESSION_STORAGE};
///
/// let storage = WebStorage::builder()
///     .host(StorageHost::in_memory())
///     .prefix("app")
///     .provider(SESSION_STORAGE)
///     .build();
///
/// assert_eq!(storage.active_provider().as_deref(), Some(SESSION_STORAGE));
/// ```
pub struct WebStorageBuilder {
    config: WebStorageConfig,
    host: Option<StorageHost>,
    providers: Vec<(String, Arc<dyn StorageProvider>)>,
    relay: Option<Arc<dyn ContextRelay>>,
    capacity: usize,
}

impl std::fmt::Debug for WebStorageBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let providers: Vec<&str> = self.providers.iter().map(|(n, _)| n.as_str()).collect();
        f.debug_struct("WebStorageBuilder")
            .field("config", &self.config)
            .field("host", &self.host)
            .field("providers", &providers)
            .field("relay", &self.relay.is_some())
            .field("capacity", &self.capacity)
            .finish()
    }
}

impl Default for WebStorageBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl WebStorageBuilder {
    /// Start from the default configuration and an in-memory host.
    #[must_use]
    pub fn new() -> Self {
        Self {
            config: WebStorageConfig::default(),
            host: None,
            providers: Vec::new(),
            relay: None,
            capacity: DEFAULT_CHANNEL_CAPACITY,
        }
    }

    /// Replace the whole configuration.
    #[must_use]
    pub fn config(mut self, config: WebStorageConfig) -> Self {
        self.config = config;
        self
    }

    /// Merge a partial configuration.
    #[must_use]
    pub fn patch(mut self, patch: &ConfigPatch) -> Self {
        self.config = self.config.merge(patch);
        self
    }

    /// Set the key prefix.
    #[must_use]
    pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
        self.config.prefix = prefix.into();
        self
    }

    /// Set the provider activated on build.
    #[must_use]
    pub fn provider(mut self, name: impl Into<String>) -> Self {
        self.config.provider = name.into();
        self
    }

    /// Set the notification toggles.
    #[must_use]
    pub fn notify_on(mut self, notify_on: NotifyOptions) -> Self {
        self.config.notify_on = notify_on;
        self
    }

    /// Use `host` for the built-in providers.
    #[must_use]
    pub fn host(mut self, host: StorageHost) -> Self {
        self.host = Some(host);
        self
    }

    /// Register a custom provider alongside the built-ins.
    #[must_use]
    pub fn with_provider(
        mut self,
        name: impl Into<String>,
        provider: Arc<dyn StorageProvider>,
    ) -> Self {
        self.providers.push((name.into(), provider));
        self
    }

    /// Forward `set`, `remove` and `remove_all` events through `relay`.
    #[must_use]
    pub fn relay(mut self, relay: Arc<dyn ContextRelay>) -> Self {
        self.relay = Some(relay);
        self
    }

    /// Buffer size of async watchers on the notification bus.
    #[must_use]
    pub fn channel_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    /// Build and start activating the configured provider
    /// (fire-and-forget, see [`WebStorage::new`]).
    #[must_use]
    pub fn build(self) -> WebStorage {
        let storage = self.assemble();
        let provider = storage.config().provider;
        storage.use_provider(&provider);
        storage
    }

    /// Build and wait for the configured provider to validate.
    pub async fn connect(self) -> WebStorage {
        let storage = self.assemble();
        let provider = storage.config().provider;
        storage.activate(&provider).await;
        storage
    }

    fn assemble(self) -> WebStorage {
        let host = self.host.unwrap_or_else(StorageHost::in_memory);
        let storage = WebStorage::from_parts(
            self.config,
            ProviderRegistry::with_defaults(&host),
            NotificationBus::with_capacity(self.capacity),
        );
        if let Some(relay) = self.relay {
            storage.events().attach_relay(relay);
        }
        for (name, provider) in self.providers {
            storage.add_provider(&name, provider, false);
        }
        storage
    }
}
