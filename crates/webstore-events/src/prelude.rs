//! Prelude module - commonly used types for convenient import.
//!
//! Use `use webstore_events::prelude::*;` to import all essential types.

// Bus
pub use crate::{EventReceiver, NotificationBus};

// Events
pub use crate::{ErrorEvent, EventKind, EventMetadata, Notification, StorageEvent};

// Channels and relay
pub use crate::{BroadcastRelay, ContextRelay, RelayMessage, SubscriptionId};
