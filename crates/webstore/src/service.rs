//! The façade service.
//!
//! Every storage-touching operation runs the same pipeline on entry: prefix
//! the key, check that a provider is active, then run its body. When no
//! provider is active the operation reports `PROVIDER_NOT_SET` on the error
//! channel and returns its documented default. Nothing here returns an
//! error to the caller; failures are observable only through
//! [`NotificationBus::on_error`] and [`NotificationBus::last_error`].

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use futures::FutureExt;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use tracing::{debug, info, trace, warn};
use webstore_config::{ConfigPatch, NotifyOptions, WebStorageConfig};
use webstore_events::{
    ContextRelay, ErrorEvent, EventKind, EventMetadata, NotificationBus, StorageEvent,
};
use webstore_storage::{
    BackingStore, KeyCodec, ProviderRegistry, StorageError, StorageHost, StorageProvider,
    StorageResult,
};

use crate::builder::WebStorageBuilder;
use crate::codec::{Fallback, ValueCodec};
use crate::deferred::AsyncWebStorage;
use crate::state::ProviderState;

/// Whether `notify` enables events of `kind`.
#[must_use]
pub fn notify_enabled(notify: &NotifyOptions, kind: EventKind) -> bool {
    match kind {
        EventKind::Set => notify.set,
        EventKind::Get => notify.get,
        EventKind::Remove => notify.remove,
        EventKind::RemoveAll => notify.remove_all,
    }
}

/// The currently selected store.
#[derive(Default)]
struct ActiveStore {
    state: ProviderState,
    /// Provider being validated or in use.
    provider: Option<String>,
    store: Option<Arc<dyn BackingStore>>,
}

struct Settings {
    config: WebStorageConfig,
    keys: KeyCodec,
}

impl Settings {
    fn new(config: WebStorageConfig) -> Self {
        let keys = KeyCodec::new(&config.prefix);
        Self { config, keys }
    }
}

/// Snapshot taken when an operation passes the active check.
struct Scope {
    store: Arc<dyn BackingStore>,
    keys: KeyCodec,
    provider: String,
    notify: NotifyOptions,
}

impl Scope {
    fn notifies(&self, kind: EventKind) -> bool {
        notify_enabled(&self.notify, kind)
    }
}

struct Inner {
    settings: RwLock<Settings>,
    registry: ProviderRegistry,
    active: RwLock<ActiveStore>,
    bus: NotificationBus,
    /// Bumped by every activation; a validation that finishes after a newer
    /// one started is discarded.
    generation: AtomicU64,
}

/// Prefixed, validated, notifying key/value storage.
///
/// Cloning is cheap and clones share state.
///
/// # Example
///
/// ```rust
/// use webstore::WebStorage;
/// use webstore_config::WebStorageConfig;
/// use webstore_storage::StorageHost;
///
/// // Without a tokio runtime, activation completes before `new` returns.
/// let storage = WebStorage::new(WebStorageConfig::default(), StorageHost::in_memory());
///
/// storage.set("key", &"val");
/// assert_eq!(storage.get::<String>("key").as_deref(), Some("val"));
/// assert_eq!(storage.remove::<String>("key").as_deref(), Some("val"));
/// assert_eq!(storage.len(), 0);
/// ```
#[derive(Clone)]
pub struct WebStorage {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for WebStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let active = self.inner.active.read().unwrap_or_else(PoisonError::into_inner);
        f.debug_struct("WebStorage")
            .field("config", &self.config())
            .field("state", &active.state)
            .field("provider", &active.provider)
            .field("registry", &self.inner.registry)
            .finish_non_exhaustive()
    }
}

impl WebStorage {
    /// Create a façade over `host` and start activating the configured
    /// provider.
    ///
    /// Activation is fire-and-forget: inside a tokio runtime it is spawned,
    /// otherwise it is polled on this thread and, if validation has to wait,
    /// finished on a background thread. Failures are reported on the error
    /// channel.
    #[must_use]
    pub fn new(config: WebStorageConfig, host: StorageHost) -> Self {
        let registry = ProviderRegistry::with_defaults(&host);
        let storage = Self::from_parts(config, registry, NotificationBus::new());
        storage.init();
        storage
    }

    /// Create a façade over `host` and wait for the configured provider to
    /// validate.
    ///
    /// The façade is returned either way; check [`is_active`](Self::is_active)
    /// or the error channel to see whether activation succeeded.
    pub async fn connect(config: WebStorageConfig, host: StorageHost) -> Self {
        let registry = ProviderRegistry::with_defaults(&host);
        let storage = Self::from_parts(config, registry, NotificationBus::new());
        let provider = storage.config().provider;
        storage.activate(&provider).await;
        storage
    }

    /// Start building a façade.
    #[must_use]
    pub fn builder() -> WebStorageBuilder {
        WebStorageBuilder::new()
    }

    pub(crate) fn from_parts(
        config: WebStorageConfig,
        registry: ProviderRegistry,
        bus: NotificationBus,
    ) -> Self {
        debug!(prefix = %config.prefix, provider = %config.provider, "creating web storage");
        Self {
            inner: Arc::new(Inner {
                settings: RwLock::new(Settings::new(config)),
                registry,
                active: RwLock::new(ActiveStore::default()),
                bus,
                generation: AtomicU64::new(0),
            }),
        }
    }

    /// Attach a relay forwarding `set`, `remove` and `remove_all` events to
    /// other contexts.
    #[must_use]
    pub fn with_relay(self, relay: Arc<dyn ContextRelay>) -> Self {
        self.inner.bus.attach_relay(relay);
        self
    }

    /// Async twins of the storage operations.
    #[must_use]
    pub fn deferred(&self) -> AsyncWebStorage {
        AsyncWebStorage::new(self.clone())
    }

    // ── Configuration & providers ────────────────────────────────────

    /// Current configuration.
    #[must_use]
    pub fn config(&self) -> WebStorageConfig {
        self.inner
            .settings
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .config
            .clone()
    }

    /// The notification bus.
    #[must_use]
    pub fn events(&self) -> &NotificationBus {
        &self.inner.bus
    }

    /// The provider registry.
    #[must_use]
    pub fn providers(&self) -> &ProviderRegistry {
        &self.inner.registry
    }

    /// Current activation state.
    #[must_use]
    pub fn state(&self) -> ProviderState {
        self.inner
            .active
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .state
    }

    /// Whether a validated store is in use.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.state().is_active()
    }

    /// Name of the provider in use, if any.
    #[must_use]
    pub fn active_provider(&self) -> Option<String> {
        let active = self.inner.active.read().unwrap_or_else(PoisonError::into_inner);
        if active.state.is_active() {
            active.provider.clone()
        } else {
            None
        }
    }

    /// Merge `patch` into the configuration and re-activate the configured
    /// provider (fire-and-forget, like [`use_provider`](Self::use_provider)).
    pub fn setup(&self, patch: &ConfigPatch) {
        self.apply_patch(patch);
        self.init();
    }

    /// Merge `patch` into the configuration and wait for the configured
    /// provider to validate. Returns whether it did.
    pub async fn reconfigure(&self, patch: &ConfigPatch) -> bool {
        self.apply_patch(patch);
        let provider = self.config().provider;
        self.activate(&provider).await
    }

    /// Register `provider` under `name`, optionally switching to it.
    ///
    /// A duplicate `name` is reported as `PROVIDER_EXISTS` and the original
    /// provider is kept. Returns whether the provider was registered.
    pub fn add_provider(
        &self,
        name: &str,
        provider: Arc<dyn StorageProvider>,
        use_immediately: bool,
    ) -> bool {
        if let Err(e) = self.inner.registry.register(name, provider) {
            self.report(&e, None);
            return false;
        }
        if use_immediately {
            self.use_provider(name);
        }
        true
    }

    /// Switch to the provider `name`.
    ///
    /// The current store is released immediately; the new one is in use once
    /// its validation succeeds. Inside a tokio runtime the validation is
    /// spawned. Otherwise it is polled on this thread, so a provider that
    /// validates without waiting is in use before this returns, and a pending
    /// validation moves to a background thread. Safe to call from event
    /// handlers and from inside another executor.
    pub fn use_provider(&self, name: &str) {
        let generation = self.begin_activation(name);
        let storage = self.clone();
        let provider = name.to_owned();
        let task = async move {
            let outcome = AssertUnwindSafe(storage.finish_activation(generation, &provider))
                .catch_unwind()
                .await;
            if outcome.is_err() {
                storage.abandon_activation(generation, &provider, "validation panicked");
            }
        };
        if let Err(e) = run_detached(task) {
            self.abandon_activation(generation, name, &e.to_string());
        }
    }

    /// Switch to the provider `name` and wait for its validation. Returns
    /// whether the provider is now in use.
    pub async fn activate(&self, name: &str) -> bool {
        let generation = self.begin_activation(name);
        self.finish_activation(generation, name).await
    }

    fn init(&self) {
        let provider = self.config().provider;
        self.use_provider(&provider);
    }

    fn apply_patch(&self, patch: &ConfigPatch) {
        let mut settings = self
            .inner
            .settings
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let merged = settings.config.merge(patch);
        debug!(prefix = %merged.prefix, provider = %merged.provider, "configuration updated");
        *settings = Settings::new(merged);
    }

    fn begin_activation(&self, name: &str) -> u64 {
        let mut active = self.inner.active.write().unwrap_or_else(PoisonError::into_inner);
        let generation = self
            .inner
            .generation
            .fetch_add(1, Ordering::SeqCst)
            .wrapping_add(1);
        *active = ActiveStore {
            state: ProviderState::Activating,
            provider: Some(name.to_owned()),
            store: None,
        };
        debug!(provider = %name, generation, "activating provider");
        generation
    }

    async fn finish_activation(&self, generation: u64, name: &str) -> bool {
        let result = self.inner.registry.activate(name).await;

        let mut active = self.inner.active.write().unwrap_or_else(PoisonError::into_inner);
        if self.inner.generation.load(Ordering::SeqCst) != generation {
            debug!(provider = %name, generation, "discarding superseded activation");
            return false;
        }

        match result {
            Ok(store) => {
                *active = ActiveStore {
                    state: ProviderState::Active,
                    provider: Some(name.to_owned()),
                    store: Some(store),
                };
                drop(active);
                info!(provider = %name, "storage provider active");
                true
            },
            Err(e) => {
                *active = ActiveStore::default();
                drop(active);
                warn!(provider = %name, error = %e, "storage provider rejected");
                self.emit_error(&e, None, Some(name));
                false
            },
        }
    }

    /// Reset a validation that will never finish, unless a newer one has
    /// started since.
    fn abandon_activation(&self, generation: u64, name: &str, reason: &str) {
        let mut active = self.inner.active.write().unwrap_or_else(PoisonError::into_inner);
        if self.inner.generation.load(Ordering::SeqCst) != generation {
            return;
        }
        *active = ActiveStore::default();
        drop(active);

        let error = StorageError::ActivationAborted {
            provider: name.to_owned(),
            reason: reason.to_owned(),
        };
        warn!(provider = %name, error = %error, "storage provider activation aborted");
        self.emit_error(&error, None, Some(name));
    }

    // ── Storage operations ───────────────────────────────────────────

    /// Read `key`, or `None` if it is missing, undecodable or no provider is
    /// active.
    #[must_use]
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.get_or(key, Fallback::none())
    }

    /// Read `key`, falling back to `default`.
    ///
    /// Emits a `get` notification when enabled.
    pub fn get_or<T: DeserializeOwned>(&self, key: &str, default: impl Into<Fallback<T>>) -> T {
        let default = default.into();
        let Some(scope) = self.enter("get", Some(key)) else {
            return default.resolve(None);
        };
        self.read(&scope, key, default)
    }

    /// Write `value` under `key` as JSON.
    ///
    /// Emits a `set` notification carrying the previous value when enabled.
    /// Encoding and write failures are reported on the error channel. Returns
    /// whether the value was written.
    pub fn set<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> bool {
        self.set_with(key, value, ValueCodec::encode)
    }

    /// Write `value` under `key` using a custom `encoder`.
    ///
    /// The notification carries the encoded text parsed as JSON, or as a
    /// plain string when it is not JSON.
    pub fn set_with<T, F>(&self, key: &str, value: &T, encoder: F) -> bool
    where
        T: ?Sized,
        F: FnOnce(&T) -> StorageResult<String>,
    {
        let Some(scope) = self.enter("set", Some(key)) else {
            return false;
        };
        let physical = scope.keys.to_physical(key);

        let old_value = if scope.notifies(EventKind::Set) {
            scope
                .store
                .get_item(&physical)
                .and_then(|raw| ValueCodec::decode::<Value>(&raw).ok())
        } else {
            None
        };

        let encoded = match encoder(value) {
            Ok(encoded) => encoded,
            Err(e) => {
                self.report_in(&scope, &e, Some(key));
                return false;
            },
        };

        if let Err(e) = scope.store.set_item(&physical, &encoded) {
            self.report_in(&scope, &e, Some(key));
            return false;
        }
        trace!(key, provider = %scope.provider, "stored value");

        if scope.notifies(EventKind::Set) {
            let new_value =
                ValueCodec::decode::<Value>(&encoded).unwrap_or(Value::String(encoded));
            self.notify(&scope, StorageEvent::set(key, new_value, old_value));
        }
        true
    }

    /// Read then delete `key`. Not atomic.
    ///
    /// Emits `get` then `remove` notifications when enabled.
    #[must_use]
    pub fn pull<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.pull_or(key, Fallback::none())
    }

    /// [`pull`](Self::pull) with a default for the read.
    pub fn pull_or<T: DeserializeOwned>(&self, key: &str, default: impl Into<Fallback<T>>) -> T {
        let value = self.get_or(key, default);
        self.remove::<Value>(key);
        value
    }

    /// Whether `key` holds a non-null value.
    ///
    /// Reads through [`get`](Self::get), so it emits a `get` notification
    /// (or `PROVIDER_NOT_SET`) like any other read.
    #[must_use]
    pub fn has(&self, key: &str) -> bool {
        self.get::<Value>(key).is_some()
    }

    /// Delete `key`, returning the value it held.
    ///
    /// Emits a `remove` notification when enabled.
    pub fn remove<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let scope = self.enter("remove", Some(key))?;
        match self.delete(&scope, key) {
            Ok(old) => old.and_then(|old| {
                self.decode_in(&scope, key, ValueCodec::from_value::<Option<T>>(old))
                    .flatten()
            }),
            Err(e) => {
                self.report_in(&scope, &e, Some(key));
                None
            },
        }
    }

    /// Delete every entry under the prefix and return how many were removed.
    ///
    /// Each deletion emits its own `remove` notification, followed by one
    /// aggregate `remove_all` notification; each when enabled.
    pub fn remove_all(&self) -> usize {
        let Some(scope) = self.enter("remove_all", None) else {
            return 0;
        };

        let mut keys = Vec::new();
        self.walk(&scope, &Value::Null, |_, key| keys.push(key.to_owned()));

        let mut removed = 0usize;
        for key in &keys {
            match self.delete(&scope, key) {
                Ok(_) => removed = removed.saturating_add(1),
                Err(e) => self.report_in(&scope, &e, Some(key)),
            }
        }

        debug!(removed, provider = %scope.provider, "removed all entries");
        if scope.notifies(EventKind::RemoveAll) {
            self.notify(&scope, StorageEvent::remove_all(removed));
        }
        removed
    }

    /// Call `f(value, key)` for every entry under the prefix, in the backing
    /// store's enumeration order.
    ///
    /// Entries are read through the same path as [`get`](Self::get), so each
    /// emits a `get` notification when enabled. Missing or undecodable entries
    /// yield `null`.
    pub fn for_each<F>(&self, f: F)
    where
        F: FnMut(Value, &str),
    {
        self.for_each_or(&Value::Null, f);
    }

    /// [`for_each`](Self::for_each) with `default` for unusable entries.
    pub fn for_each_or<F>(&self, default: &Value, f: F)
    where
        F: FnMut(Value, &str),
    {
        if let Some(scope) = self.enter("for_each", None) {
            self.walk(&scope, default, f);
        }
    }

    /// Logical keys under the prefix, in enumeration order.
    #[must_use]
    pub fn keys(&self) -> Vec<String> {
        let mut keys = Vec::new();
        self.for_each(|_, key| keys.push(key.to_owned()));
        keys
    }

    /// Every entry under the prefix.
    #[must_use]
    pub fn get_all(&self) -> Map<String, Value> {
        let mut all = Map::new();
        self.for_each(|value, key| {
            all.insert(key.to_owned(), value);
        });
        all
    }

    /// Number of entries under the prefix. Not cached: every call enumerates.
    #[must_use]
    pub fn len(&self) -> usize {
        self.keys().len()
    }

    /// Whether no entries exist under the prefix.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // ── Pipeline ─────────────────────────────────────────────────────

    /// Snapshot the key codec and active store, or report `PROVIDER_NOT_SET`.
    fn enter(&self, operation: &'static str, key: Option<&str>) -> Option<Scope> {
        let (keys, notify) = {
            let settings = self
                .inner
                .settings
                .read()
                .unwrap_or_else(PoisonError::into_inner);
            (settings.keys.clone(), settings.config.notify_on)
        };

        let scope = {
            let active = self.inner.active.read().unwrap_or_else(PoisonError::into_inner);
            match (&active.store, &active.provider) {
                (Some(store), Some(provider)) if active.state.is_active() => Some(Scope {
                    store: Arc::clone(store),
                    keys,
                    provider: provider.clone(),
                    notify,
                }),
                _ => None,
            }
        };

        if scope.is_none() {
            trace!(operation, "no active provider");
            self.report(&StorageError::ProviderNotSet, key);
        }
        scope
    }

    fn read<T: DeserializeOwned>(&self, scope: &Scope, key: &str, default: Fallback<T>) -> T {
        let raw = scope.store.get_item(&scope.keys.to_physical(key));
        let value = raw
            .as_deref()
            .and_then(|text| self.decode_in::<Value>(scope, key, ValueCodec::decode(text)));

        if scope.notifies(EventKind::Get) {
            self.notify(scope, StorageEvent::get(key, value.clone()));
        }

        match value.map(ValueCodec::from_value::<Option<T>>) {
            Some(Ok(Some(decoded))) => decoded,
            Some(Ok(None)) | None => default.resolve(raw),
            Some(Err(e)) => {
                self.report_in(scope, &e, Some(key));
                default.resolve(raw)
            },
        }
    }

    /// Delete `key` and emit `remove`. Returns the decoded old value.
    fn delete(&self, scope: &Scope, key: &str) -> StorageResult<Option<Value>> {
        let physical = scope.keys.to_physical(key);
        let old = scope
            .store
            .get_item(&physical)
            .and_then(|raw| self.decode_in::<Value>(scope, key, ValueCodec::decode(&raw)));

        scope.store.remove_item(&physical)?;
        trace!(key, provider = %scope.provider, "removed value");

        if scope.notifies(EventKind::Remove) {
            self.notify(scope, StorageEvent::remove(key, old.clone()));
        }
        Ok(old)
    }

    fn walk<F>(&self, scope: &Scope, default: &Value, mut f: F)
    where
        F: FnMut(Value, &str),
    {
        // Enumerate first: the callback may mutate the store.
        let physical_keys = scope.store.keys();
        for physical in &physical_keys {
            let Some(key) = scope.keys.to_logical(physical) else {
                continue;
            };
            let value = self.read(scope, key, Fallback::Value(default.clone()));
            f(value, key);
        }
    }

    fn decode_in<T: DeserializeOwned>(
        &self,
        scope: &Scope,
        key: &str,
        decoded: StorageResult<T>,
    ) -> Option<T> {
        match decoded {
            Ok(value) => Some(value),
            Err(e) => {
                self.report_in(scope, &e, Some(key));
                None
            },
        }
    }

    fn metadata(&self, provider: Option<&str>) -> EventMetadata {
        let metadata = EventMetadata::new().with_origin(self.inner.bus.origin());
        match provider {
            Some(provider) => metadata.with_provider(provider),
            None => metadata,
        }
    }

    fn notify(&self, scope: &Scope, event: StorageEvent) {
        let event = event.with_metadata(self.metadata(Some(&scope.provider)));
        self.inner.bus.emit(event);
    }

    fn report_in(&self, scope: &Scope, error: &StorageError, key: Option<&str>) {
        self.emit_error(error, key, Some(&scope.provider));
    }

    fn report(&self, error: &StorageError, key: Option<&str>) {
        let provider = self.active_provider();
        self.emit_error(error, key, provider.as_deref());
    }

    fn emit_error(&self, error: &StorageError, key: Option<&str>, provider: Option<&str>) {
        let mut event = ErrorEvent::from(error).with_metadata(self.metadata(provider));
        if let Some(key) = key {
            event = event.with_key(key);
        }
        self.inner.bus.emit_error(event);
    }
}

/// Run `task` without waiting for it.
///
/// On a tokio runtime the task is spawned. Without one it is polled once on
/// this thread and, if still pending, handed to a short-lived thread. No
/// executor is entered on the calling thread, which may already be inside
/// one.
fn run_detached<F>(task: F) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    if let Ok(handle) = tokio::runtime::Handle::try_current() {
        handle.spawn(task);
        return Ok(());
    }

    let mut task = Box::pin(task);
    if task.as_mut().now_or_never().is_some() {
        return Ok(());
    }

    trace!("activation pending, finishing on a background thread");
    std::thread::Builder::new()
        .name("webstore-activation".into())
        .spawn(move || futures::executor::block_on(task))
        .map(drop)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use std::collections::HashMap;
    use webstore_storage::{ErrorCode, LOCAL_STORAGE, SESSION_STORAGE};
    use webstore_test::{EventRecorder, test_config, test_host, test_host_with_quota};

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Preferences {
        theme: String,
        font_size: u8,
        pinned: Vec<String>,
    }

    fn local(host: &StorageHost) -> Arc<dyn BackingStore> {
        host.store(LOCAL_STORAGE).unwrap()
    }

    #[test]
    fn test_new_activates_inline_without_runtime() {
        let storage = WebStorage::new(test_config(), test_host());
        assert_eq!(storage.state(), ProviderState::Active);
        assert_eq!(storage.active_provider().as_deref(), Some(LOCAL_STORAGE));
    }

    #[test]
    fn test_structured_round_trip() {
        let storage = WebStorage::new(test_config(), test_host());
        let prefs = Preferences {
            theme: "dark".into(),
            font_size: 14,
            pinned: vec!["inbox".into()],
        };

        assert!(storage.set("prefs", &prefs));
        assert_eq!(storage.get::<Preferences>("prefs"), Some(prefs));
    }

    #[test]
    fn test_entries_are_stored_under_prefix_as_json() {
        let host = test_host();
        let storage = WebStorage::new(test_config(), host.clone());

        storage.set("key", &"val");
        assert_eq!(local(&host).get_item("__:key").as_deref(), Some("\"val\""));
    }

    #[test]
    fn test_enumeration_ignores_foreign_entries() {
        let host = test_host();
        let store = local(&host);
        store.set_item("unrelated", "1").unwrap();
        store.set_item("other:a", "1").unwrap();
        store.set_item("__x:a", "1").unwrap();

        let storage = WebStorage::new(test_config(), host);
        storage.set("a", &1);

        assert_eq!(storage.keys(), vec!["a"]);
        assert_eq!(storage.len(), 1);
        assert_eq!(storage.remove_all(), 1);
        assert_eq!(store.len(), 3);
    }

    #[test]
    fn test_missing_key_resolves_fallback() {
        let storage = WebStorage::new(test_config(), test_host());

        assert_eq!(storage.get::<i64>("missing"), None);
        assert_eq!(storage.get_or("missing", 5i64), 5);
        let computed: String = storage.get_or(
            "missing",
            Fallback::with(|raw: Option<String>| format!("raw={raw:?}")),
        );
        assert_eq!(computed, "raw=None");
    }

    #[test]
    fn test_undecodable_entry_reports_and_falls_back() {
        let host = test_host();
        local(&host).set_item("__:broken", "{not json").unwrap();
        let storage = WebStorage::new(test_config(), host);
        let recorder = EventRecorder::attach(storage.events());

        let value: String = storage.get_or(
            "broken",
            Fallback::with(|raw: Option<String>| raw.unwrap_or_default()),
        );

        assert_eq!(value, "{not json");
        assert_eq!(recorder.error_codes(), vec![ErrorCode::DecodingFailed]);
        assert_eq!(recorder.errors()[0].key.as_deref(), Some("broken"));
    }

    #[test]
    fn test_type_mismatch_reports_decoding_failure() {
        let storage = WebStorage::new(test_config(), test_host());
        storage.set("n", &"not a number");
        let recorder = EventRecorder::attach(storage.events());

        assert_eq!(storage.get_or("n", 0u32), 0);
        assert_eq!(recorder.error_codes(), vec![ErrorCode::DecodingFailed]);
    }

    #[test]
    fn test_encoding_failure_is_redirected() {
        let storage = WebStorage::new(test_config(), test_host());
        let recorder = EventRecorder::attach(storage.events());

        let mut map = HashMap::new();
        map.insert((1, 2), "tuple keys are not JSON");

        assert!(!storage.set("map", &map));
        assert!(!storage.has("map"));
        assert_eq!(recorder.error_codes(), vec![ErrorCode::EncodingFailed]);
        assert!(!recorder.kinds().contains(&EventKind::Set));
    }

    #[test]
    fn test_write_failure_is_redirected() {
        // Large enough for the writability probe only.
        let storage = WebStorage::new(test_config(), test_host_with_quota(64));
        assert!(storage.is_active());
        let recorder = EventRecorder::attach(storage.events());

        assert!(!storage.set("big", &"x".repeat(128)));
        assert_eq!(recorder.error_codes(), vec![ErrorCode::WriteFailed]);
        assert_eq!(storage.len(), 0);
    }

    #[test]
    fn test_custom_encoder() {
        let host = test_host();
        let storage = WebStorage::new(test_config(), host.clone());
        let recorder = EventRecorder::attach(storage.events());

        assert!(storage.set_with("csv", &[1, 2, 3][..], |v: &[i32]| {
            Ok(v.iter().map(ToString::to_string).collect::<Vec<_>>().join(","))
        }));

        assert_eq!(local(&host).get_item("__:csv").as_deref(), Some("1,2,3"));
        let event = &recorder.changes()[0];
        assert_eq!(event.new_value, Some(Value::from("1,2,3")));
    }

    #[test]
    fn test_failing_custom_encoder_is_redirected() {
        let storage = WebStorage::new(test_config(), test_host());
        let recorder = EventRecorder::attach(storage.events());

        let written = storage.set_with("k", &1, |_| {
            Err(StorageError::Encoding("unsupported".into()))
        });

        assert!(!written);
        assert_eq!(recorder.error_codes(), vec![ErrorCode::EncodingFailed]);
    }

    #[test]
    fn test_setup_merges_and_reactivates() {
        let host = test_host();
        let storage = WebStorage::new(test_config(), host.clone());
        storage.set("a", &1);

        storage.setup(&ConfigPatch::new().provider(SESSION_STORAGE));
        assert_eq!(storage.active_provider().as_deref(), Some(SESSION_STORAGE));
        assert_eq!(storage.config().prefix, "__");
        assert!(storage.is_empty());

        storage.setup(&ConfigPatch::new().prefix("app"));
        storage.set("b", &2);
        assert_eq!(
            host.store(SESSION_STORAGE).unwrap().get_item("app:b").as_deref(),
            Some("2")
        );
        assert_eq!(local(&host).get_item("__:a").as_deref(), Some("1"));
    }

    #[test]
    fn test_has_reads_through_get() {
        let storage = WebStorage::new(test_config(), test_host());
        storage.set("present", &true);
        storage.set("null", &Value::Null);
        let recorder = EventRecorder::attach(storage.events());

        assert!(storage.has("present"));
        assert!(!storage.has("null"));
        assert!(!storage.has("absent"));
        assert_eq!(recorder.kinds(), vec![EventKind::Get; 3]);
    }

    #[test]
    fn test_for_each_uses_default_for_undecodable_entries() {
        let host = test_host();
        let storage = WebStorage::new(test_config(), host.clone());
        storage.set("good", &1);
        local(&host).set_item("__:bad", "{").unwrap();

        let mut seen = Vec::new();
        storage.for_each_or(&Value::from("fallback"), |value, key| {
            seen.push((key.to_owned(), value));
        });

        assert_eq!(
            seen,
            vec![
                ("good".to_owned(), Value::from(1)),
                ("bad".to_owned(), Value::from("fallback")),
            ]
        );
    }

    #[test]
    fn test_for_each_callback_may_mutate() {
        let storage = WebStorage::new(test_config(), test_host());
        for (i, key) in ["a", "b", "c"].into_iter().enumerate() {
            storage.set(key, &i);
        }

        let mut visited = Vec::new();
        storage.for_each(|_, key| {
            visited.push(key.to_owned());
            storage.remove::<Value>(key);
        });

        assert_eq!(visited, vec!["a", "b", "c"]);
        assert!(storage.is_empty());
    }

    #[test]
    fn test_events_carry_origin_and_provider() {
        let storage = WebStorage::new(test_config(), test_host());
        let recorder = EventRecorder::attach(storage.events());

        storage.set("k", &1);
        let event = &recorder.changes()[0];
        assert_eq!(event.metadata.origin, Some(storage.events().origin()));
        assert_eq!(event.metadata.provider.as_deref(), Some(LOCAL_STORAGE));
    }

    #[test]
    fn test_clones_share_state() {
        let storage = WebStorage::new(test_config(), test_host());
        let clone = storage.clone();

        clone.set("shared", &"yes");
        assert_eq!(storage.get::<String>("shared").as_deref(), Some("yes"));
        clone.use_provider(SESSION_STORAGE);
        assert_eq!(storage.active_provider().as_deref(), Some(SESSION_STORAGE));
    }

    #[test]
    fn test_notify_enabled_mapping() {
        let notify = NotifyOptions::default();
        assert!(notify_enabled(&notify, EventKind::Set));
        assert!(notify_enabled(&notify, EventKind::Get));
        assert!(notify_enabled(&notify, EventKind::Remove));
        assert!(!notify_enabled(&notify, EventKind::RemoveAll));
        assert!(EventKind::ALL
            .iter()
            .all(|k| !notify_enabled(&NotifyOptions::none(), *k)));
    }

    #[test]
    fn test_debug_output_names_state() {
        let storage = WebStorage::new(test_config(), test_host());
        let debug = format!("{storage:?}");
        assert!(debug.contains("Active"));
        assert!(debug.contains(LOCAL_STORAGE));
    }
}
