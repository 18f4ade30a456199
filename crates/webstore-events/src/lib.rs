//! Webstore Events - change notifications for the webstore façade.
//!
//! This crate provides:
//! - Event types for storage operations and errors
//! - [`Channel`]: ordered, synchronous observer lists
//! - [`NotificationBus`]: one channel per operation kind plus a replaying
//!   error channel, with async watchers
//! - [`ContextRelay`] and [`BroadcastRelay`]: forwarding of changes to other
//!   contexts sharing a storage scope
//!
//! # Example
//!
//! ```rust
//! use webstore_events::{EventKind, NotificationBus, StorageEvent};
//!
//! let bus = NotificationBus::new();
//! bus.on(EventKind::Set, |event| println!("{} changed", event.key));
//! bus.emit(StorageEvent::set("theme", "dark".into(), None));
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;

mod bus;
mod channel;
mod event;
mod relay;

pub use bus::{DEFAULT_CHANNEL_CAPACITY, EventReceiver, NotificationBus};
pub use channel::{Channel, Handler, ReplayChannel, SubscriptionId};
pub use event::{ErrorEvent, EventKind, EventMetadata, Notification, StorageEvent};
pub use relay::{BroadcastRelay, ContextRelay, RelayMessage, RelayReceiver};
