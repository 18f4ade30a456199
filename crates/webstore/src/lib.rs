//! Webstore - a prefixed, validated, notifying key/value façade over local
//! and session storage.
//!
//! [`WebStorage`] composes the lower crates:
//!
//! - providers and the registry from `webstore-storage` select and validate
//!   a backing store
//! - every logical key is namespaced as `prefix:key`
//! - values are stored as JSON text ([`ValueCodec`])
//! - changes and failures are published on a `webstore-events` bus
//!
//! No operation returns an error. Precondition, provider and encoding
//! failures are reported on the error channel and the operation returns its
//! documented default.
//!
//! # Example
//!
//! ```rust
//! use std::sync::{Arc, Mutex};
//! use webstore::prelude::*;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let storage = WebStorage::connect(WebStorageConfig::default(), StorageHost::in_memory()).await;
//!
//! let seen = Arc::new(Mutex::new(Vec::new()));
//! let sink = Arc::clone(&seen);
//! storage.events().on(EventKind::Set, move |event| {
//!     sink.lock().unwrap().push(event.key.clone());
//! });
//!
//! storage.set("a", &1);
//! storage.set("b", &serde_json::json!({"nested": [1, 2]}));
//!
//! assert_eq!(storage.keys(), vec!["a", "b"]);
//! assert_eq!(*seen.lock().unwrap(), vec!["a", "b"]);
//!
//! assert!(!storage.activate("nope").await);
//! assert!(!storage.is_active());
//! assert_eq!(storage.events().last_error().unwrap().code, ErrorCode::UnknownProvider);
//! # }
//! ```

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;

mod builder;
mod codec;
mod deferred;
mod service;
mod state;

pub use builder::WebStorageBuilder;
pub use codec::{Fallback, FallbackFn, ValueCodec};
pub use deferred::AsyncWebStorage;
pub use service::{WebStorage, notify_enabled};
pub use state::ProviderState;
