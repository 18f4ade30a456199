//! Value encoding and caller-supplied defaults.

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use webstore_storage::{StorageError, StorageResult};

/// JSON encoding of stored values.
///
/// Every stored entry is the JSON text of its value, so structured values
/// (objects, arrays, numbers) round-trip losslessly.
#[derive(Debug, Clone, Copy, Default)]
pub struct ValueCodec;

impl ValueCodec {
    /// Encode `value` as JSON text.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Encoding`] if `value` cannot be represented as
    /// JSON (e.g. a map with non-string keys).
    pub fn encode<T: Serialize + ?Sized>(value: &T) -> StorageResult<String> {
        serde_json::to_string(value).map_err(|e| StorageError::Encoding(e.to_string()))
    }

    /// Convert `value` to a JSON tree.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Encoding`] if `value` cannot be represented as
    /// JSON.
    pub fn to_value<T: Serialize + ?Sized>(value: &T) -> StorageResult<Value> {
        serde_json::to_value(value).map_err(|e| StorageError::Encoding(e.to_string()))
    }

    /// Decode JSON text into `T`.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Decoding`] if `raw` is not valid JSON or does not
    /// match `T`.
    pub fn decode<T: DeserializeOwned>(raw: &str) -> StorageResult<T> {
        serde_json::from_str(raw).map_err(|e| StorageError::Decoding(e.to_string()))
    }

    /// Convert a JSON tree into `T`.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Decoding`] if `value` does not match `T`.
    pub fn from_value<T: DeserializeOwned>(value: Value) -> StorageResult<T> {
        serde_json::from_value(value).map_err(|e| StorageError::Decoding(e.to_string()))
    }
}

/// Callback form of a [`Fallback`].
pub type FallbackFn<T> = Box<dyn FnOnce(Option<String>) -> T + Send>;

/// What a read returns when there is no usable value.
///
/// Either a literal, or a function of the raw item the store returned
/// (`None` when the key is missing or no provider is active, the raw text when
/// it failed to decode).
pub enum Fallback<T> {
    /// A literal default.
    Value(T),
    /// A default computed from the raw item.
    With(FallbackFn<T>),
}

impl<T> Fallback<T> {
    /// A default computed by `f`.
    pub fn with<F>(f: F) -> Self
    where
        F: FnOnce(Option<String>) -> T + Send + 'static,
    {
        Self::With(Box::new(f))
    }

    /// Produce the default for `raw`.
    pub fn resolve(self, raw: Option<String>) -> T {
        match self {
            Self::Value(value) => value,
            Self::With(f) => f(raw),
        }
    }
}

impl<T> Fallback<Option<T>> {
    /// The `None` default.
    #[must_use]
    pub fn none() -> Self {
        Self::Value(None)
    }
}

impl<T> From<T> for Fallback<T> {
    fn from(value: T) -> Self {
        Self::Value(value)
    }
}

impl<T: Default> Default for Fallback<T> {
    fn default() -> Self {
        Self::Value(T::default())
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for Fallback<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Value(value) => f.debug_tuple("Value").field(value).finish(),
            Self::With(_) => f.write_str("With(<fn>)"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use std::collections::HashMap;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Profile {
        name: String,
        tags: Vec<String>,
        age: u32,
    }

    #[test]
    fn test_structured_value_round_trip() {
        let profile = Profile {
            name: "ada".to_owned(),
            tags: vec!["admin".to_owned()],
            age: 36,
        };
        let encoded = ValueCodec::encode(&profile).unwrap();
        let decoded: Profile = ValueCodec::decode(&encoded).unwrap();
        assert_eq!(decoded, profile);
    }

    #[test]
    fn test_strings_are_stored_as_json_text() {
        assert_eq!(ValueCodec::encode("val").unwrap(), "\"val\"");
    }

    #[test]
    fn test_non_string_map_keys_fail_to_encode() {
        let mut map = HashMap::new();
        map.insert(vec![1u8], 1);
        let err = ValueCodec::encode(&map).unwrap_err();
        assert!(matches!(err, StorageError::Encoding(_)));
    }

    #[test]
    fn test_malformed_text_fails_to_decode() {
        let err = ValueCodec::decode::<Value>("{not json").unwrap_err();
        assert!(matches!(err, StorageError::Decoding(_)));
    }

    #[test]
    fn test_type_mismatch_fails_to_decode() {
        let err = ValueCodec::from_value::<u32>(Value::from("x")).unwrap_err();
        assert!(matches!(err, StorageError::Decoding(_)));
    }

    #[test]
    fn test_fallback_literal_ignores_raw() {
        let fallback: Fallback<i32> = 7.into();
        assert_eq!(fallback.resolve(Some("raw".to_owned())), 7);
    }

    #[test]
    fn test_fallback_callback_sees_raw_item() {
        let fallback = Fallback::with(|raw: Option<String>| raw.unwrap_or_else(|| "absent".into()));
        assert_eq!(fallback.resolve(None), "absent");

        let fallback = Fallback::with(|raw: Option<String>| raw.unwrap_or_default());
        assert_eq!(fallback.resolve(Some("{bad".to_owned())), "{bad");
    }

    #[test]
    fn test_fallback_none() {
        let fallback: Fallback<Option<u8>> = Fallback::none();
        assert_eq!(fallback.resolve(None), None);
    }
}
