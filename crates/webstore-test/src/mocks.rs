//! Mock implementations for testing.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::Notify;
use webstore_events::{ErrorEvent, EventKind, Notification, NotificationBus, StorageEvent};
use webstore_storage::{
    BackingStore, ErrorCode, MemoryStore, StorageError, StorageProvider, StorageResult,
};

/// In-memory store whose writes and deletions can be made to fail.
#[derive(Debug, Default)]
pub struct FlakyStore {
    inner: MemoryStore,
    fail_writes: AtomicBool,
    fail_removes: AtomicBool,
}

impl FlakyStore {
    /// Create a store that behaves normally until told otherwise.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent `set_item` fail (or succeed again).
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Make every subsequent `remove_item` fail (or succeed again).
    pub fn fail_removes(&self, fail: bool) {
        self.fail_removes.store(fail, Ordering::SeqCst);
    }
}

impl BackingStore for FlakyStore {
    fn len(&self) -> usize {
        self.inner.len()
    }

    fn get_item(&self, key: &str) -> Option<String> {
        self.inner.get_item(key)
    }

    fn set_item(&self, key: &str, value: &str) -> StorageResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StorageError::Io(format!("injected write failure for {key}")));
        }
        self.inner.set_item(key, value)
    }

    fn remove_item(&self, key: &str) -> StorageResult<()> {
        if self.fail_removes.load(Ordering::SeqCst) {
            return Err(StorageError::Io(format!("injected remove failure for {key}")));
        }
        self.inner.remove_item(key)
    }

    fn clear(&self) -> StorageResult<()> {
        self.inner.clear()
    }

    fn key(&self, index: usize) -> Option<String> {
        self.inner.key(index)
    }
}

/// Configurable [`StorageProvider`].
///
/// Counts validations, can be told to reject or panic, and can hold
/// validation until a gate is opened to observe the activating state.
pub struct MockProvider {
    name: String,
    store: Option<Arc<dyn BackingStore>>,
    rejection: Option<StorageError>,
    gate: Option<Arc<Notify>>,
    panics: bool,
    validations: AtomicUsize,
}

impl std::fmt::Debug for MockProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockProvider")
            .field("name", &self.name)
            .field("has_store", &self.store.is_some())
            .field("rejection", &self.rejection)
            .field("gated", &self.gate.is_some())
            .field("panics", &self.panics)
            .field("validations", &self.validations())
            .finish()
    }
}

impl MockProvider {
    /// A provider that validates successfully with `store`.
    #[must_use]
    pub fn new(name: impl Into<String>, store: Arc<dyn BackingStore>) -> Self {
        Self {
            name: name.into(),
            store: Some(store),
            rejection: None,
            gate: None,
            panics: false,
            validations: AtomicUsize::new(0),
        }
    }

    /// A provider backed by a fresh [`MemoryStore`].
    #[must_use]
    pub fn in_memory(name: impl Into<String>) -> Self {
        Self::new(name, Arc::new(MemoryStore::new()))
    }

    /// A provider whose environment exposes no store.
    #[must_use]
    pub fn unavailable(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            rejection: Some(StorageError::Unavailable {
                provider: name.clone(),
            }),
            name,
            store: None,
            gate: None,
            panics: false,
            validations: AtomicUsize::new(0),
        }
    }

    /// Reject validation with `error`.
    #[must_use]
    pub fn rejecting(mut self, error: StorageError) -> Self {
        self.rejection = Some(error);
        self
    }

    /// Hold validation until `gate` is notified.
    #[must_use]
    pub fn gated(mut self, gate: Arc<Notify>) -> Self {
        self.gate = Some(gate);
        self
    }

    /// Panic inside `validate`.
    #[must_use]
    pub fn panicking(mut self) -> Self {
        self.panics = true;
        self
    }

    /// Number of times `validate` was called.
    #[must_use]
    pub fn validations(&self) -> usize {
        self.validations.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl StorageProvider for MockProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn get(&self) -> Option<Arc<dyn BackingStore>> {
        self.store.clone()
    }

    async fn validate(&self) -> StorageResult<Arc<dyn BackingStore>> {
        self.validations.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        assert!(!self.panics, "{} validation panicked", self.name);
        if let Some(error) = &self.rejection {
            return Err(error.clone());
        }
        self.store.clone().ok_or_else(|| StorageError::Unavailable {
            provider: self.name.clone(),
        })
    }
}

/// Records every notification a bus delivers to synchronous handlers, in
/// delivery order.
///
/// The error channel replays its latest event on subscription, so a recorder
/// attached after an error has been reported starts with that error.
#[derive(Debug, Clone, Default)]
pub struct EventRecorder {
    log: Arc<Mutex<Vec<Notification>>>,
}

impl EventRecorder {
    /// Subscribe to every channel of `bus`.
    #[must_use]
    pub fn attach(bus: &NotificationBus) -> Self {
        let recorder = Self::default();
        for kind in EventKind::ALL {
            let log = Arc::clone(&recorder.log);
            bus.on(kind, move |event: &StorageEvent| {
                if let Ok(mut log) = log.lock() {
                    log.push(Notification::Change(event.clone()));
                }
            });
        }
        let log = Arc::clone(&recorder.log);
        bus.on_error(move |error: &ErrorEvent| {
            if let Ok(mut log) = log.lock() {
                log.push(Notification::Error(error.clone()));
            }
        });
        recorder
    }

    /// Everything recorded so far.
    #[must_use]
    pub fn notifications(&self) -> Vec<Notification> {
        self.log.lock().map(|g| g.clone()).unwrap_or_default()
    }

    /// Change events only.
    #[must_use]
    pub fn changes(&self) -> Vec<StorageEvent> {
        self.notifications()
            .into_iter()
            .filter_map(|n| match n {
                Notification::Change(event) => Some(event),
                Notification::Error(_) => None,
            })
            .collect()
    }

    /// Kinds of the change events, in order.
    #[must_use]
    pub fn kinds(&self) -> Vec<EventKind> {
        self.changes().iter().map(|e| e.kind).collect()
    }

    /// Error events only.
    #[must_use]
    pub fn errors(&self) -> Vec<ErrorEvent> {
        self.notifications()
            .into_iter()
            .filter_map(|n| match n {
                Notification::Error(error) => Some(error),
                Notification::Change(_) => None,
            })
            .collect()
    }

    /// Codes of the error events, in order.
    #[must_use]
    pub fn error_codes(&self) -> Vec<ErrorCode> {
        self.errors().iter().map(|e| e.code).collect()
    }

    /// Forget everything recorded so far.
    pub fn clear(&self) {
        if let Ok(mut log) = self.log.lock() {
            log.clear();
        }
    }
}
