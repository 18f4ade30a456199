//! Event types carried by the notification bus.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;
use webstore_storage::ErrorCode;

/// Metadata attached to every event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventMetadata {
    /// Unique event identifier.
    pub event_id: Uuid,
    /// When the event was created.
    pub timestamp: DateTime<Utc>,
    /// Context that produced the event, when relayed across contexts.
    pub origin: Option<Uuid>,
    /// Provider that was active when the event was produced.
    pub provider: Option<String>,
}

impl EventMetadata {
    /// Create new event metadata.
    #[must_use]
    pub fn new() -> Self {
        Self {
            event_id: Uuid::new_v4(),
            timestamp: Utc::now(),
            origin: None,
            provider: None,
        }
    }

    /// Set the originating context.
    #[must_use]
    pub fn with_origin(mut self, origin: Uuid) -> Self {
        self.origin = Some(origin);
        self
    }

    /// Set the active provider name.
    #[must_use]
    pub fn with_provider(mut self, provider: impl Into<String>) -> Self {
        self.provider = Some(provider.into());
        self
    }
}

impl Default for EventMetadata {
    fn default() -> Self {
        Self::new()
    }
}

/// The storage operation an event reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// A value was written.
    Set,
    /// A value was read.
    Get,
    /// A value was deleted.
    Remove,
    /// Every value under the prefix was deleted.
    RemoveAll,
}

impl EventKind {
    /// All kinds, in channel order.
    pub const ALL: [Self; 4] = [Self::Set, Self::Get, Self::Remove, Self::RemoveAll];

    /// Stable name of the kind.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Set => "set",
            Self::Get => "get",
            Self::Remove => "remove",
            Self::RemoveAll => "remove_all",
        }
    }

    /// Whether events of this kind cross context boundaries through a relay.
    #[must_use]
    pub fn is_relayed(self) -> bool {
        matches!(self, Self::Set | Self::Remove | Self::RemoveAll)
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A change notification for one logical key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageEvent {
    /// Operation that produced the event.
    pub kind: EventKind,
    /// Logical key (empty for [`EventKind::RemoveAll`]).
    pub key: String,
    /// Value after the operation.
    pub new_value: Option<Value>,
    /// Value before the operation.
    pub old_value: Option<Value>,
    /// Event metadata.
    pub metadata: EventMetadata,
}

impl StorageEvent {
    /// Create an event of `kind` for `key`.
    #[must_use]
    pub fn new(
        kind: EventKind,
        key: impl Into<String>,
        new_value: Option<Value>,
        old_value: Option<Value>,
    ) -> Self {
        Self {
            kind,
            key: key.into(),
            new_value,
            old_value,
            metadata: EventMetadata::new(),
        }
    }

    /// A write of `new_value` over `old_value`.
    #[must_use]
    pub fn set(key: impl Into<String>, new_value: Value, old_value: Option<Value>) -> Self {
        Self::new(EventKind::Set, key, Some(new_value), old_value)
    }

    /// A read returning `value`.
    #[must_use]
    pub fn get(key: impl Into<String>, value: Option<Value>) -> Self {
        Self::new(EventKind::Get, key, value, None)
    }

    /// A deletion of `old_value`.
    #[must_use]
    pub fn remove(key: impl Into<String>, old_value: Option<Value>) -> Self {
        Self::new(EventKind::Remove, key, None, old_value)
    }

    /// A bulk deletion of `count` entries.
    #[must_use]
    pub fn remove_all(count: usize) -> Self {
        Self::new(EventKind::RemoveAll, "", Some(Value::from(count)), None)
    }

    /// Replace the metadata.
    #[must_use]
    pub fn with_metadata(mut self, metadata: EventMetadata) -> Self {
        self.metadata = metadata;
        self
    }
}

/// A failure reported on the error channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorEvent {
    /// Stable error code.
    pub code: ErrorCode,
    /// Human-readable description.
    pub message: String,
    /// Logical key involved, if any.
    pub key: Option<String>,
    /// Event metadata.
    pub metadata: EventMetadata,
}

impl ErrorEvent {
    /// Create an error event.
    #[must_use]
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            key: None,
            metadata: EventMetadata::new(),
        }
    }

    /// Attach the logical key involved.
    #[must_use]
    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    /// Replace the metadata.
    #[must_use]
    pub fn with_metadata(mut self, metadata: EventMetadata) -> Self {
        self.metadata = metadata;
        self
    }
}

impl From<&webstore_storage::StorageError> for ErrorEvent {
    fn from(e: &webstore_storage::StorageError) -> Self {
        Self::new(e.code(), e.to_string())
    }
}

/// Anything the bus broadcasts to async watchers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Notification {
    /// A storage change.
    Change(StorageEvent),
    /// An error.
    Error(ErrorEvent),
}

impl Notification {
    /// Stable name of the notification type.
    #[must_use]
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::Change(event) => event.kind.as_str(),
            Self::Error(_) => "error",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use webstore_storage::StorageError;

    #[test]
    fn test_constructors_fill_expected_fields() {
        let set = StorageEvent::set("k", Value::from(2), Some(Value::from(1)));
        assert_eq!(set.kind, EventKind::Set);
        assert_eq!(set.new_value, Some(Value::from(2)));
        assert_eq!(set.old_value, Some(Value::from(1)));

        let removed = StorageEvent::remove("k", Some(Value::from("v")));
        assert_eq!(removed.new_value, None);
        assert_eq!(removed.old_value, Some(Value::from("v")));

        let all = StorageEvent::remove_all(3);
        assert_eq!(all.key, "");
        assert_eq!(all.new_value, Some(Value::from(3)));
    }

    #[test]
    fn test_relayed_kinds() {
        assert!(EventKind::Set.is_relayed());
        assert!(EventKind::Remove.is_relayed());
        assert!(EventKind::RemoveAll.is_relayed());
        assert!(!EventKind::Get.is_relayed());
    }

    #[test]
    fn test_error_event_from_storage_error() {
        let event = ErrorEvent::from(&StorageError::UnknownProvider("x".into())).with_key("k");
        assert_eq!(event.code, ErrorCode::UnknownProvider);
        assert_eq!(event.message, "unknown provider: x");
        assert_eq!(event.key.as_deref(), Some("k"));
    }

    #[test]
    fn test_notification_serialization() {
        let n = Notification::Change(StorageEvent::get("k", None));
        let json = serde_json::to_value(&n).unwrap();
        assert_eq!(json["type"], "change");
        assert_eq!(json["kind"], "get");
        assert_eq!(n.event_type(), "get");

        let err = Notification::Error(ErrorEvent::new(ErrorCode::ProviderNotSet, "nope"));
        assert_eq!(err.event_type(), "error");
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["code"], "PROVIDER_NOT_SET");
    }

    #[test]
    fn test_metadata_builders() {
        let origin = Uuid::new_v4();
        let meta = EventMetadata::new()
            .with_origin(origin)
            .with_provider("localStorage");
        assert_eq!(meta.origin, Some(origin));
        assert_eq!(meta.provider.as_deref(), Some("localStorage"));
    }
}
