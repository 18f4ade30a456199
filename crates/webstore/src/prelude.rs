//! Prelude module - commonly used types for convenient import.
//!
//! Use `use webstore::prelude::*;` to import all essential types.

// Façade
pub use crate::{AsyncWebStorage, ProviderState, WebStorage, WebStorageBuilder};

// Values
pub use crate::{Fallback, ValueCodec};

// Configuration
pub use webstore_config::{ConfigPatch, NotifyOptions, NotifyPatch, WebStorageConfig};

// Notifications
pub use webstore_events::{ErrorEvent, EventKind, Notification, StorageEvent, SubscriptionId};

// Storage
pub use webstore_storage::{
    BackingStore, ErrorCode, LOCAL_STORAGE, SESSION_STORAGE, StorageHost, StorageProvider,
};
