//! Future-returning twins of the façade operations.
//!
//! Each method runs the underlying operation to completion before handing
//! back an already-resolved future, so these add no concurrency of their
//! own; they exist to slot storage calls into async pipelines.

use futures::future::{Ready, ready};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::codec::Fallback;
use crate::service::WebStorage;

/// Async view of a [`WebStorage`], obtained from [`WebStorage::deferred`].
#[derive(Debug, Clone)]
pub struct AsyncWebStorage {
    storage: WebStorage,
}

impl AsyncWebStorage {
    pub(crate) fn new(storage: WebStorage) -> Self {
        Self { storage }
    }

    /// The wrapped façade.
    #[must_use]
    pub fn inner(&self) -> &WebStorage {
        &self.storage
    }

    /// See [`WebStorage::get`].
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Ready<Option<T>> {
        ready(self.storage.get(key))
    }

    /// See [`WebStorage::get_or`].
    pub fn get_or<T: DeserializeOwned>(
        &self,
        key: &str,
        default: impl Into<Fallback<T>>,
    ) -> Ready<T> {
        ready(self.storage.get_or(key, default))
    }

    /// See [`WebStorage::set`].
    pub fn set<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Ready<bool> {
        ready(self.storage.set(key, value))
    }

    /// See [`WebStorage::pull`].
    pub fn pull<T: DeserializeOwned>(&self, key: &str) -> Ready<Option<T>> {
        ready(self.storage.pull(key))
    }

    /// See [`WebStorage::has`].
    pub fn has(&self, key: &str) -> Ready<bool> {
        ready(self.storage.has(key))
    }

    /// See [`WebStorage::remove`].
    pub fn remove<T: DeserializeOwned>(&self, key: &str) -> Ready<Option<T>> {
        ready(self.storage.remove(key))
    }

    /// See [`WebStorage::remove_all`].
    pub fn remove_all(&self) -> Ready<usize> {
        ready(self.storage.remove_all())
    }

    /// See [`WebStorage::keys`].
    pub fn keys(&self) -> Ready<Vec<String>> {
        ready(self.storage.keys())
    }

    /// See [`WebStorage::get_all`].
    pub fn get_all(&self) -> Ready<Map<String, Value>> {
        ready(self.storage.get_all())
    }

    /// See [`WebStorage::len`].
    pub fn len(&self) -> Ready<usize> {
        ready(self.storage.len())
    }

    /// See [`WebStorage::is_empty`].
    pub fn is_empty(&self) -> Ready<bool> {
        ready(self.storage.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use webstore_storage::StorageHost;

    #[tokio::test]
    async fn test_deferred_operations_resolve_with_results() {
        let storage = WebStorage::builder()
            .host(StorageHost::in_memory())
            .connect()
            .await;
        let deferred = storage.deferred();

        assert!(deferred.set("a", &1).await);
        assert!(deferred.set("b", &2).await);
        assert_eq!(deferred.len().await, 2);
        assert_eq!(deferred.get::<i64>("a").await, Some(1));
        assert_eq!(deferred.get_or::<i64>("missing", 9).await, 9);
        assert!(deferred.has("b").await);
        assert_eq!(deferred.pull::<i64>("a").await, Some(1));
        assert_eq!(deferred.keys().await, vec!["b"]);
        assert_eq!(deferred.remove_all().await, 1);
        assert!(deferred.is_empty().await);
    }

    #[tokio::test]
    async fn test_operation_completes_before_future_is_polled() {
        let storage = WebStorage::builder().connect().await;
        let deferred = storage.deferred();

        let pending = deferred.set("k", &"v");
        assert_eq!(storage.get::<String>("k").as_deref(), Some("v"));
        assert!(pending.await);
    }
}
