//! The backing store contract and the in-memory implementation.
//!
//! A [`BackingStore`] is the host's synchronous, case-sensitive,
//! string-keyed map: the thing a browser calls `localStorage` or
//! `sessionStorage`. Everything above this layer (prefixing, encoding,
//! notifications) is built on these six operations.

use std::sync::{PoisonError, RwLock};

use crate::error::{StorageError, StorageResult};

/// Host-supplied key/value map.
///
/// Each individual call is assumed atomic. Compound sequences (read then
/// delete, enumerate then delete) are not.
pub trait BackingStore: Send + Sync {
    /// Number of entries in the store, across all namespaces.
    fn len(&self) -> usize;

    /// Whether the store holds no entries.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Read the raw value stored under `key`.
    fn get_item(&self, key: &str) -> Option<String>;

    /// Store `value` under `key`, overwriting any previous value.
    ///
    /// # Errors
    ///
    /// Returns an error if the store refuses the write (quota, I/O).
    fn set_item(&self, key: &str, value: &str) -> StorageResult<()>;

    /// Delete `key`. Deleting an absent key is a no-op.
    ///
    /// # Errors
    ///
    /// Returns an error if a persistent store cannot record the deletion.
    fn remove_item(&self, key: &str) -> StorageResult<()>;

    /// Delete every entry.
    ///
    /// # Errors
    ///
    /// Returns an error if a persistent store cannot record the deletion.
    fn clear(&self) -> StorageResult<()>;

    /// Key at position `index` in the host's enumeration order.
    fn key(&self, index: usize) -> Option<String>;

    /// Snapshot of all keys in enumeration order.
    fn keys(&self) -> Vec<String> {
        (0..self.len()).filter_map(|i| self.key(i)).collect()
    }
}

/// Insertion-ordered entries shared by the in-memory and file stores.
#[derive(Debug, Default, Clone)]
pub(crate) struct OrderedEntries {
    entries: Vec<(String, String)>,
}

impl OrderedEntries {
    pub(crate) fn from_pairs(entries: Vec<(String, String)>) -> Self {
        Self { entries }
    }

    pub(crate) fn pairs(&self) -> &[(String, String)] {
        &self.entries
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    pub(crate) fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Size in bytes if `key` were set to `value`.
    pub(crate) fn size_with(&self, key: &str, value: &str) -> usize {
        let current: usize = self
            .entries
            .iter()
            .filter(|(k, _)| k != key)
            .map(|(k, v)| k.len().saturating_add(v.len()))
            .sum();
        current.saturating_add(key.len()).saturating_add(value.len())
    }

    pub(crate) fn set(&mut self, key: &str, value: &str) {
        if let Some(slot) = self.entries.iter_mut().find(|(k, _)| k == key) {
            value.clone_into(&mut slot.1);
        } else {
            self.entries.push((key.to_owned(), value.to_owned()));
        }
    }

    pub(crate) fn remove(&mut self, key: &str) -> bool {
        let before = self.entries.len();
        self.entries.retain(|(k, _)| k != key);
        self.entries.len() != before
    }

    pub(crate) fn clear(&mut self) {
        self.entries.clear();
    }

    pub(crate) fn key(&self, index: usize) -> Option<String> {
        self.entries.get(index).map(|(k, _)| k.clone())
    }
}

/// In-memory backing store.
///
/// Keys enumerate in insertion order. An optional byte quota makes writes
/// fail the way a full (or private-mode) browser store does.
#[derive(Debug, Default)]
pub struct MemoryStore {
    data: RwLock<OrderedEntries>,
    quota: Option<usize>,
}

impl MemoryStore {
    /// Create a new empty store with no quota.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Limit the store to `bytes` of key plus value data.
    ///
    /// A quota of zero rejects every write.
    #[must_use]
    pub fn with_quota(mut self, bytes: usize) -> Self {
        self.quota = Some(bytes);
        self
    }
}

impl BackingStore for MemoryStore {
    fn len(&self) -> usize {
        self.data.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    fn get_item(&self, key: &str) -> Option<String> {
        self.data
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .map(str::to_owned)
    }

    fn set_item(&self, key: &str, value: &str) -> StorageResult<()> {
        let mut data = self.data.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(quota) = self.quota {
            let used = data.size_with(key, value);
            if used > quota {
                return Err(StorageError::QuotaExceeded { used, quota });
            }
        }
        data.set(key, value);
        Ok(())
    }

    fn remove_item(&self, key: &str) -> StorageResult<()> {
        self.data
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key);
        Ok(())
    }

    fn clear(&self) -> StorageResult<()> {
        self.data
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
        Ok(())
    }

    fn key(&self, index: usize) -> Option<String> {
        self.data
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .key(index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_get_set() {
        let store = MemoryStore::new();
        store.set_item("k", "v").unwrap();
        assert_eq!(store.get_item("k").as_deref(), Some("v"));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_memory_get_missing() {
        let store = MemoryStore::new();
        assert!(store.get_item("missing").is_none());
        assert!(store.is_empty());
    }

    #[test]
    fn test_memory_overwrite_keeps_position() {
        let store = MemoryStore::new();
        store.set_item("a", "1").unwrap();
        store.set_item("b", "2").unwrap();
        store.set_item("a", "3").unwrap();
        assert_eq!(store.keys(), vec!["a", "b"]);
        assert_eq!(store.get_item("a").as_deref(), Some("3"));
    }

    #[test]
    fn test_memory_keys_are_case_sensitive() {
        let store = MemoryStore::new();
        store.set_item("Key", "1").unwrap();
        store.set_item("key", "2").unwrap();
        assert_eq!(store.len(), 2);
        assert_eq!(store.get_item("Key").as_deref(), Some("1"));
    }

    #[test]
    fn test_memory_remove_and_clear() {
        let store = MemoryStore::new();
        store.set_item("a", "1").unwrap();
        store.set_item("b", "2").unwrap();

        store.remove_item("a").unwrap();
        store.remove_item("a").unwrap();
        assert_eq!(store.keys(), vec!["b"]);

        store.clear().unwrap();
        assert!(store.is_empty());
        assert!(store.key(0).is_none());
    }

    #[test]
    fn test_memory_quota_rejects_oversized_write() {
        let store = MemoryStore::new().with_quota(8);
        store.set_item("abc", "de").unwrap();

        let err = store.set_item("fgh", "ijk").unwrap_err();
        assert_eq!(err, StorageError::QuotaExceeded { used: 11, quota: 8 });
        assert!(store.get_item("fgh").is_none());

        // Overwriting an existing key only counts the new value.
        store.set_item("abc", "xyzww").unwrap();
    }

    #[test]
    fn test_memory_zero_quota_rejects_everything() {
        let store = MemoryStore::new().with_quota(0);
        assert!(store.set_item("k", "").is_err());
    }
}
