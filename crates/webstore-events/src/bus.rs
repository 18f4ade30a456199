//! The notification bus: one channel per operation kind plus errors.

use std::sync::{Arc, PoisonError, RwLock};

use tokio::sync::broadcast;
use tracing::{debug, trace, warn};
use uuid::Uuid;

use crate::channel::{Channel, ReplayChannel, SubscriptionId};
use crate::event::{ErrorEvent, EventKind, Notification, StorageEvent};
use crate::relay::{ContextRelay, RelayMessage};

/// Default channel capacity for async watchers and relays.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1024;

/// Per-kind broadcast channels for storage notifications.
///
/// - Synchronous handlers registered with [`on`](Self::on) and
///   [`on_error`](Self::on_error) run in subscription order before `emit`
///   returns.
/// - The error channel replays its latest event to new handlers.
/// - [`watch`](Self::watch) hands out async receivers of everything.
/// - With a relay attached, `set`, `remove` and `remove_all` events are also
///   forwarded to other contexts.
pub struct NotificationBus {
    origin: Uuid,
    set: Channel<StorageEvent>,
    get: Channel<StorageEvent>,
    remove: Channel<StorageEvent>,
    remove_all: Channel<StorageEvent>,
    errors: ReplayChannel<ErrorEvent>,
    sender: broadcast::Sender<Arc<Notification>>,
    relay: RwLock<Option<Arc<dyn ContextRelay>>>,
}

impl std::fmt::Debug for NotificationBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotificationBus")
            .field("origin", &self.origin)
            .field("set", &self.set)
            .field("get", &self.get)
            .field("remove", &self.remove)
            .field("remove_all", &self.remove_all)
            .field("errors", &self.errors)
            .field("has_relay", &self.has_relay())
            .finish()
    }
}

impl NotificationBus {
    /// Create a bus with default watcher capacity.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    /// Create a bus whose async watchers buffer up to `capacity` events.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            origin: Uuid::new_v4(),
            set: Channel::new("set"),
            get: Channel::new("get"),
            remove: Channel::new("remove"),
            remove_all: Channel::new("remove_all"),
            errors: ReplayChannel::new("error"),
            sender,
            relay: RwLock::new(None),
        }
    }

    /// Identifier of this context, used to tag relayed events.
    #[must_use]
    pub fn origin(&self) -> Uuid {
        self.origin
    }

    fn channel(&self, kind: EventKind) -> &Channel<StorageEvent> {
        match kind {
            EventKind::Set => &self.set,
            EventKind::Get => &self.get,
            EventKind::Remove => &self.remove,
            EventKind::RemoveAll => &self.remove_all,
        }
    }

    /// Register a handler for events of `kind`.
    pub fn on<F>(&self, kind: EventKind, handler: F) -> SubscriptionId
    where
        F: Fn(&StorageEvent) + Send + Sync + 'static,
    {
        self.channel(kind).subscribe(handler)
    }

    /// Remove a handler registered for `kind`.
    pub fn off(&self, kind: EventKind, id: SubscriptionId) -> bool {
        self.channel(kind).unsubscribe(id)
    }

    /// Register an error handler. The most recent error, if any, is
    /// delivered immediately.
    pub fn on_error<F>(&self, handler: F) -> SubscriptionId
    where
        F: Fn(&ErrorEvent) + Send + Sync + 'static,
    {
        self.errors.subscribe(handler)
    }

    /// Remove an error handler.
    pub fn off_error(&self, id: SubscriptionId) -> bool {
        self.errors.unsubscribe(id)
    }

    /// Number of handlers registered for `kind`.
    #[must_use]
    pub fn subscriber_count(&self, kind: EventKind) -> usize {
        self.channel(kind).len()
    }

    /// Publish a change event to its channel, to watchers, and to the relay.
    pub fn emit(&self, event: StorageEvent) {
        trace!(kind = %event.kind, key = %event.key, "emitting storage event");
        self.channel(event.kind).publish(&event);

        if event.kind.is_relayed() {
            self.forward(&event);
        }

        self.broadcast(Notification::Change(event));
    }

    /// Publish an error event.
    pub fn emit_error(&self, error: ErrorEvent) {
        warn!(code = %error.code, message = %error.message, "storage error");
        self.errors.publish(&error);
        self.broadcast(Notification::Error(error));
    }

    /// The most recent error, if any.
    #[must_use]
    pub fn last_error(&self) -> Option<ErrorEvent> {
        self.errors.last()
    }

    /// Receive every notification published after this call.
    #[must_use]
    pub fn watch(&self) -> EventReceiver {
        EventReceiver::new(self.sender.subscribe(), None)
    }

    /// Receive only change notifications of `kind`.
    #[must_use]
    pub fn watch_kind(&self, kind: EventKind) -> EventReceiver {
        EventReceiver::new(self.sender.subscribe(), Some(kind))
    }

    /// Attach a relay to other contexts, replacing any previous one.
    pub fn attach_relay(&self, relay: Arc<dyn ContextRelay>) {
        *self.relay.write().unwrap_or_else(PoisonError::into_inner) = Some(relay);
        debug!(origin = %self.origin, "relay attached");
    }

    /// Detach the relay. Local notifications are unaffected.
    pub fn detach_relay(&self) {
        *self.relay.write().unwrap_or_else(PoisonError::into_inner) = None;
    }

    /// Whether a relay is attached.
    #[must_use]
    pub fn has_relay(&self) -> bool {
        self.relay
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    fn forward(&self, event: &StorageEvent) {
        let relay = self
            .relay
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        let Some(relay) = relay else {
            return;
        };

        let mut event = event.clone();
        event.metadata.origin = Some(self.origin);
        let provider = event.metadata.provider.clone().unwrap_or_default();
        relay.post(RelayMessage {
            origin: self.origin,
            provider,
            event,
        });
    }

    fn broadcast(&self, notification: Notification) {
        // Err only means no watcher is attached.
        if let Ok(count) = self.sender.send(Arc::new(notification)) {
            trace!(receiver_count = count, "notification broadcast");
        }
    }
}

impl Default for NotificationBus {
    fn default() -> Self {
        Self::new()
    }
}

/// Async receiver of bus notifications.
pub struct EventReceiver {
    receiver: broadcast::Receiver<Arc<Notification>>,
    /// If set, only change events of this kind are yielded.
    kind: Option<EventKind>,
}

impl std::fmt::Debug for EventReceiver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventReceiver")
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}

impl EventReceiver {
    pub(crate) fn new(
        receiver: broadcast::Receiver<Arc<Notification>>,
        kind: Option<EventKind>,
    ) -> Self {
        Self { receiver, kind }
    }

    fn matches(&self, notification: &Notification) -> bool {
        let Some(kind) = self.kind else {
            return true;
        };
        matches!(notification, Notification::Change(event) if event.kind == kind)
    }

    /// Receive the next matching notification.
    ///
    /// Returns `None` once the bus is dropped.
    pub async fn recv(&mut self) -> Option<Arc<Notification>> {
        loop {
            match self.receiver.recv().await {
                Ok(notification) => {
                    if self.matches(&notification) {
                        return Some(notification);
                    }
                },
                Err(broadcast::error::RecvError::Lagged(count)) => {
                    warn!(skipped = count, "event receiver lagged, events dropped");
                },
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Receive the next pending matching notification without waiting.
    pub fn try_recv(&mut self) -> Option<Arc<Notification>> {
        loop {
            match self.receiver.try_recv() {
                Ok(notification) => {
                    if self.matches(&notification) {
                        return Some(notification);
                    }
                },
                Err(broadcast::error::TryRecvError::Lagged(count)) => {
                    warn!(skipped = count, "event receiver lagged, events dropped");
                },
                Err(
                    broadcast::error::TryRecvError::Empty | broadcast::error::TryRecvError::Closed,
                ) => return None,
            }
        }
    }
}
