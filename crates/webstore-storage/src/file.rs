//! JSON-file-backed persistent store.
//!
//! Keeps the ordered entry list in memory and rewrites the whole file after
//! every mutation. Each rewrite goes to a staging file next to the target
//! and is renamed over it, so the file on disk is always a complete entry
//! list. Intended for the small, string-valued maps a web-style
//! local storage holds, not for bulk data.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};

use tracing::debug;

use crate::error::{StorageError, StorageResult};
use crate::store::{BackingStore, OrderedEntries};

/// Persistent [`BackingStore`] stored as a JSON array of `[key, value]` pairs.
#[derive(Debug)]
pub struct JsonFileStore {
    data: RwLock<OrderedEntries>,
    path: PathBuf,
}

impl JsonFileStore {
    /// Open the store at `path`, creating parent directories as needed.
    ///
    /// A missing file opens as an empty store; the file is created on the
    /// first write.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Io`] if the file exists but cannot be read, or
    /// [`StorageError::Decoding`] if it is not a valid entry list.
    pub fn open(path: impl Into<PathBuf>) -> StorageResult<Self> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let entries = match std::fs::read(&path) {
            Ok(bytes) => serde_json::from_slice::<Vec<(String, String)>>(&bytes)
                .map_err(|e| StorageError::Decoding(format!("{}: {e}", path.display())))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(e) => return Err(e.into()),
        };

        debug!(path = %path.display(), entries = entries.len(), "opened file store");
        Ok(Self {
            data: RwLock::new(OrderedEntries::from_pairs(entries)),
            path,
        })
    }

    /// Location of the backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, data: &OrderedEntries) -> StorageResult<()> {
        let bytes = serde_json::to_vec(data.pairs())
            .map_err(|e| StorageError::Encoding(e.to_string()))?;
        let staging = self.staging_path();
        std::fs::write(&staging, bytes)?;
        if let Err(e) = std::fs::rename(&staging, &self.path) {
            let _ = std::fs::remove_file(&staging);
            return Err(e.into());
        }
        Ok(())
    }

    /// `<file>.tmp` beside the target file.
    fn staging_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(OsString::from)
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    /// Apply `f` to the entries and write the result, rolling back on failure.
    fn mutate(&self, f: impl FnOnce(&mut OrderedEntries) -> bool) -> StorageResult<()> {
        let mut data = self.data.write().unwrap_or_else(PoisonError::into_inner);
        let snapshot = data.clone();
        if !f(&mut data) {
            return Ok(());
        }
        if let Err(e) = self.persist(&data) {
            *data = snapshot;
            return Err(e);
        }
        Ok(())
    }
}

impl BackingStore for JsonFileStore {
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
        self.mutate(|data| {
            data.set(key, value);
            true
        })
    }

    fn remove_item(&self, key: &str) -> StorageResult<()> {
        self.mutate(|data| data.remove(key))
    }

    fn clear(&self) -> StorageResult<()> {
        self.mutate(|data| {
            data.clear();
            true
        })
    }

    fn key(&self, index: usize) -> Option<String> {
        self.data
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .key(index)
    }
}
