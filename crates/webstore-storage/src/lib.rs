//! Webstore Storage - backing stores, providers and key namespacing.
//!
//! This crate provides the lower half of the webstore façade:
//!
//! - [`BackingStore`]: the host's synchronous string-keyed map
//!   (`len`, `get_item`, `set_item`, `remove_item`, `clear`, `key`)
//! - [`MemoryStore`] and [`JsonFileStore`]: in-memory and persistent stores
//! - [`StorageHost`]: the named stores an environment exposes
//! - [`StorageProvider`] and [`HostStorageProvider`]: named adapters with an
//!   availability and writability probe
//! - [`ProviderRegistry`]: name-to-provider mapping with activation
//! - [`KeyCodec`]: `prefix:key` namespacing
//!
//! # Example
//!
//! ```rust
//! use webstore_storage::{KeyCodec, ProviderRegistry, StorageHost, LOCAL_STORAGE};
//!
//! # async fn example() -> webstore_storage::StorageResult<()> {
//! let host = StorageHost::in_memory();
//! let registry = ProviderRegistry::with_defaults(&host);
//! let store = registry.activate(LOCAL_STORAGE).await?;
//!
//! let codec = KeyCodec::new("__");
//! store.set_item(&codec.to_physical("theme"), "\"dark\"")?;
//! assert_eq!(store.keys(), vec!["__:theme"]);
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod error;
pub mod file;
pub mod host;
pub mod key;
pub mod provider;
pub mod registry;
pub mod store;

pub use error::{ErrorCode, StorageError, StorageResult};
pub use file::JsonFileStore;
pub use host::StorageHost;
pub use key::{KEY_SEPARATOR, KeyCodec};
pub use provider::{HostStorageProvider, LOCAL_STORAGE, SESSION_STORAGE, StorageProvider};
pub use registry::ProviderRegistry;
pub use store::{BackingStore, MemoryStore};
