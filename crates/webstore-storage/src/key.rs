//! Logical/physical key conversion.
//!
//! A logical key `k` is stored physically as `"{prefix}:{k}"`. Only physical
//! keys carrying this exact namespace are visible through enumeration, which
//! keeps façade entries apart from anything else sharing the backing store.

/// Separator between the namespace prefix and the logical key.
pub const KEY_SEPARATOR: char = ':';

/// Pure, bidirectional prefixing of keys.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyCodec {
    namespace: String,
}

impl KeyCodec {
    /// Create a codec for `prefix`.
    #[must_use]
    pub fn new(prefix: impl AsRef<str>) -> Self {
        Self {
            namespace: format!("{}{KEY_SEPARATOR}", prefix.as_ref()),
        }
    }

    /// The configured prefix, without separator.
    #[must_use]
    pub fn prefix(&self) -> &str {
        self.namespace
            .strip_suffix(KEY_SEPARATOR)
            .unwrap_or(&self.namespace)
    }

    /// Physical key for logical `key`.
    #[must_use]
    pub fn to_physical(&self, key: &str) -> String {
        format!("{}{key}", self.namespace)
    }

    /// Logical key for `physical`, or `None` if it lies outside this namespace.
    #[must_use]
    pub fn to_logical<'a>(&self, physical: &'a str) -> Option<&'a str> {
        physical.strip_prefix(self.namespace.as_str())
    }

    /// Whether `physical` belongs to this namespace.
    #[must_use]
    pub fn owns(&self, physical: &str) -> bool {
        physical.starts_with(self.namespace.as_str())
    }
}
