//! Cross-context relay.
//!
//! Several façades may share one storage scope (two tabs on one origin, two
//! workers on one file store). A relay forwards `set`, `remove` and
//! `remove_all` events from one context to the others, tagged with the
//! sender and the provider it was using. Without a relay, local
//! notifications work exactly the same.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::{trace, warn};
use uuid::Uuid;

use crate::bus::DEFAULT_CHANNEL_CAPACITY;
use crate::event::StorageEvent;

/// A change forwarded from another context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelayMessage {
    /// Context that made the change.
    pub origin: Uuid,
    /// Provider that context had active.
    pub provider: String,
    /// The change itself.
    pub event: StorageEvent,
}

/// Messaging primitive connecting contexts that share a storage scope.
pub trait ContextRelay: Send + Sync {
    /// Forward `message` to the other contexts. Must not block.
    fn post(&self, message: RelayMessage);
}

/// In-process relay built on a tokio broadcast channel.
///
/// Clone it into every context of the scope.
#[derive(Debug, Clone)]
pub struct BroadcastRelay {
    sender: broadcast::Sender<Arc<RelayMessage>>,
}

impl BroadcastRelay {
    /// Create a relay with the default capacity.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    /// Create a relay buffering up to `capacity` messages per receiver.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Receive messages posted by every context except `origin`.
    #[must_use]
    pub fn subscribe(&self, origin: Uuid) -> RelayReceiver {
        RelayReceiver {
            receiver: self.sender.subscribe(),
            origin,
        }
    }
}

impl Default for BroadcastRelay {
    fn default() -> Self {
        Self::new()
    }
}

impl ContextRelay for BroadcastRelay {
    fn post(&self, message: RelayMessage) {
        let origin = message.origin;
        // Err only means nobody is listening yet.
        if self.sender.send(Arc::new(message)).is_err() {
            trace!(%origin, "no relay receivers");
        }
    }
}

/// Receiving end of a [`BroadcastRelay`] for one context.
#[derive(Debug)]
pub struct RelayReceiver {
    receiver: broadcast::Receiver<Arc<RelayMessage>>,
    origin: Uuid,
}

impl RelayReceiver {
    /// Receive the next message from another context.
    ///
    /// Returns `None` once every relay handle is dropped.
    pub async fn recv(&mut self) -> Option<Arc<RelayMessage>> {
        loop {
            match self.receiver.recv().await {
                Ok(message) if message.origin != self.origin => return Some(message),
                Ok(_) => {},
                Err(broadcast::error::RecvError::Lagged(count)) => {
                    warn!(skipped = count, "relay receiver lagged, messages dropped");
                },
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Receive the next pending message without waiting.
    pub fn try_recv(&mut self) -> Option<Arc<RelayMessage>> {
        loop {
            match self.receiver.try_recv() {
                Ok(message) if message.origin != self.origin => return Some(message),
                Ok(_) => {},
                Err(broadcast::error::TryRecvError::Lagged(count)) => {
                    warn!(skipped = count, "relay receiver lagged, messages dropped");
                },
                Err(
                    broadcast::error::TryRecvError::Empty | broadcast::error::TryRecvError::Closed,
                ) => return None,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(origin: Uuid) -> RelayMessage {
        RelayMessage {
            origin,
            provider: "localStorage".into(),
            event: StorageEvent::remove("k", None),
        }
    }

    #[test]
    fn test_receiver_skips_own_messages() {
        let relay = BroadcastRelay::new();
        let me = Uuid::new_v4();
        let other = Uuid::new_v4();
        let mut rx = relay.subscribe(me);

        relay.post(message(me));
        relay.post(message(other));

        let received = rx.try_recv().unwrap();
        assert_eq!(received.origin, other);
        assert!(rx.try_recv().is_none());
    }

    #[test]
    fn test_post_without_receivers() {
        let relay = BroadcastRelay::new();
        relay.post(message(Uuid::new_v4()));
    }

    #[tokio::test]
    async fn test_async_receive_across_clones() {
        let relay = BroadcastRelay::new();
        let sender_side = relay.clone();
        let mut rx = relay.subscribe(Uuid::new_v4());

        let origin = Uuid::new_v4();
        sender_side.post(message(origin));

        let received = rx.recv().await.unwrap();
        assert_eq!(received.origin, origin);
        assert_eq!(received.provider, "localStorage");
    }

    #[tokio::test]
    async fn test_recv_returns_none_when_closed() {
        let relay = BroadcastRelay::new();
        let mut rx = relay.subscribe(Uuid::new_v4());
        drop(relay);
        assert!(rx.recv().await.is_none());
    }
}
