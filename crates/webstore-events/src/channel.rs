//! Synchronous observer channels.

use std::sync::{Arc, PoisonError, RwLock};

use tracing::{debug, trace, warn};
use uuid::Uuid;

/// Handler invoked for each published event.
pub type Handler<E> = Arc<dyn Fn(&E) + Send + Sync>;

/// Registration handle for a subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(Uuid);

impl SubscriptionId {
    fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

/// A broadcast channel with synchronous, in-order delivery.
///
/// Events go to every current subscriber, in subscription order, before
/// [`publish`](Self::publish) returns. Handlers run without the channel lock
/// held, so a handler may subscribe or unsubscribe from inside the callback.
pub struct Channel<E> {
    name: &'static str,
    subscribers: RwLock<Vec<(SubscriptionId, Handler<E>)>>,
}

impl<E> std::fmt::Debug for Channel<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Channel")
            .field("name", &self.name)
            .field("subscriber_count", &self.len())
            .finish()
    }
}

impl<E> Channel<E> {
    /// Create an empty channel. `name` is used in log output only.
    #[must_use]
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            subscribers: RwLock::new(Vec::new()),
        }
    }

    /// Add a subscriber at the end of the delivery order.
    pub fn subscribe<F>(&self, handler: F) -> SubscriptionId
    where
        F: Fn(&E) + Send + Sync + 'static,
    {
        self.subscribe_arc(Arc::new(handler))
    }

    pub(crate) fn subscribe_arc(&self, handler: Handler<E>) -> SubscriptionId {
        let id = SubscriptionId::new();
        self.subscribers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push((id, handler));
        debug!(channel = self.name, "subscriber registered");
        id
    }

    /// Remove a subscriber.
    ///
    /// Returns `true` if the subscriber was found and removed.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        // Take the handler out and drop it after the lock is released, so a
        // handler whose drop publishes cannot deadlock.
        let removed = {
            let mut subs = self
                .subscribers
                .write()
                .unwrap_or_else(PoisonError::into_inner);
            subs.iter()
                .position(|(sid, _)| *sid == id)
                .map(|pos| subs.remove(pos))
        };

        if removed.is_some() {
            debug!(channel = self.name, "subscriber unregistered");
        }
        removed.is_some()
    }

    /// Deliver `event` to every subscriber, in subscription order.
    ///
    /// A panicking subscriber is logged and does not affect the others.
    /// Returns the number of subscribers notified.
    pub fn publish(&self, event: &E) -> usize {
        let snapshot = self.snapshot();
        self.deliver(&snapshot, event)
    }

    /// Current subscribers, in delivery order.
    fn snapshot(&self) -> Vec<(SubscriptionId, Handler<E>)> {
        self.subscribers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Call each handler in `snapshot` with `event`, isolating panics.
    fn deliver(&self, snapshot: &[(SubscriptionId, Handler<E>)], event: &E) -> usize {
        trace!(
            channel = self.name,
            subscriber_count = snapshot.len(),
            "publishing event"
        );

        for (id, handler) in snapshot {
            let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| handler(event)));
            if result.is_err() {
                warn!(channel = self.name, subscriber_id = ?id, "subscriber panicked");
            }
        }
        snapshot.len()
    }

    /// Number of subscribers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.subscribers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Whether the channel has no subscribers.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Remove all subscribers.
    pub fn clear(&self) {
        let drained = std::mem::take(
            &mut *self
                .subscribers
                .write()
                .unwrap_or_else(PoisonError::into_inner),
        );
        drop(drained);
        debug!(channel = self.name, "all subscribers cleared");
    }
}

/// A [`Channel`] that replays its most recent event to new subscribers.
pub struct ReplayChannel<E> {
    inner: Channel<E>,
    last: RwLock<Option<E>>,
}

impl<E> std::fmt::Debug for ReplayChannel<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReplayChannel")
            .field("inner", &self.inner)
            .finish_non_exhaustive()
    }
}

impl<E: Clone> ReplayChannel<E> {
    /// Create an empty replaying channel.
    #[must_use]
    pub fn new(name: &'static str) -> Self {
        Self {
            inner: Channel::new(name),
            last: RwLock::new(None),
        }
    }

    /// Subscribe, receiving the most recent event (if any) immediately.
    ///
    /// Registration and the replay snapshot happen under the same lock that
    /// [`publish`](Self::publish) records under, so a concurrent event is
    /// either replayed or delivered, never lost.
    pub fn subscribe<F>(&self, handler: F) -> SubscriptionId
    where
        F: Fn(&E) + Send + Sync + 'static,
    {
        let handler: Handler<E> = Arc::new(handler);
        let (id, replay) = {
            let last = self.last.write().unwrap_or_else(PoisonError::into_inner);
            let id = self.inner.subscribe_arc(Arc::clone(&handler));
            (id, last.clone())
        };
        if let Some(event) = replay {
            let result =
                std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| handler(&event)));
            if result.is_err() {
                warn!(subscriber_id = ?id, "subscriber panicked during replay");
            }
        }
        id
    }

    /// Remove a subscriber.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.inner.unsubscribe(id)
    }

    /// Record `event` as the latest and deliver it to every subscriber.
    pub fn publish(&self, event: &E) -> usize {
        let snapshot = {
            let mut last = self.last.write().unwrap_or_else(PoisonError::into_inner);
            *last = Some(event.clone());
            self.inner.snapshot()
        };
        self.inner.deliver(&snapshot, event)
    }

    /// The most recent event, if any.
    #[must_use]
    pub fn last(&self) -> Option<E> {
        self.last
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Number of subscribers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Whether the channel has no subscribers.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}
