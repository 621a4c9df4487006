//! Flat key-value string store standing in for browser local storage.
//!
//! `FileStore` keeps one file per key, so a write only touches the value that
//! changed. Last writer wins; there is no locking.

use crate::config::AppConfig;
use crate::constants::STORAGE_DIR_NAME;
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Storage I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("Storage serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("Storage write failed: {0}")]
    Write(String),
}

pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

/// Store handle shared by the panes of one window.
pub type SharedStore = Rc<dyn KeyValueStore>;

/// Reads a key, logging and swallowing storage failures.
pub fn read_or_default(store: &dyn KeyValueStore, key: &str) -> Option<String> {
    match store.get(key) {
        Ok(value) => value,
        Err(e) => {
            tracing::warn!("Failed to read '{}' from storage: {}", key, e);
            None
        }
    }
}

/// Writes `value`, or removes the key when `value` is absent or empty.
pub fn write_or_remove(store: &dyn KeyValueStore, key: &str, value: Option<&str>) {
    let result = match value {
        Some(v) if !v.is_empty() => store.set(key, v),
        _ => store.remove(key),
    };
    if let Err(e) = result {
        tracing::error!("Failed to persist '{}': {}", key, e);
    }
}

/// Directory of value files, one per key.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Store at the default location in the user data directory.
    pub fn open_default() -> Self {
        Self::new(AppConfig::data_dir().join(STORAGE_DIR_NAME))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn key_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.value", urlencoding::encode(key)))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        match fs::read_to_string(self.key_path(key)) {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        fs::create_dir_all(&self.dir)?;
        crate::utils::write_file_atomic(&self.key_path(key), value.as_bytes())
            .map_err(|e| StorageError::Write(format!("{:#}", e)))
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        match fs::remove_file(self.key_path(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// In-process store with no persistence.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RefCell<BTreeMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.entries.borrow().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.entries
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.entries.borrow_mut().remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_store_set_get_remove() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path().join("data").join("storage"));

        assert_eq!(store.get("missing").unwrap(), None);
        store.remove("missing").unwrap();
        store.set("a", "1").unwrap();
        store.set("b", "2").unwrap();
        assert_eq!(store.get("a").unwrap().as_deref(), Some("1"));

        store.remove("a").unwrap();
        assert_eq!(store.get("a").unwrap(), None);
        assert_eq!(store.get("b").unwrap().as_deref(), Some("2"));
    }

    #[test]
    fn test_file_store_handles_do_not_clobber() {
        let dir = tempfile::tempdir().unwrap();
        let first = FileStore::new(dir.path());
        let second = FileStore::new(dir.path());

        first.set("chat", "[]").unwrap();
        second.set("prompt", "retro").unwrap();

        assert_eq!(first.get("prompt").unwrap().as_deref(), Some("retro"));
        assert_eq!(second.get("chat").unwrap().as_deref(), Some("[]"));
    }

    #[test]
    fn test_file_store_write_touches_only_its_key() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());
        let large = "A".repeat(1 << 20);
        store.set("nexus_sourceImageUrl", &large).unwrap();
        let image_file = store.key_path("nexus_sourceImageUrl");
        let before = fs::metadata(&image_file).unwrap().modified().unwrap();

        for i in 0..50 {
            store.set("nexus_chatHistory", &format!("[{}]", i)).unwrap();
        }

        assert_eq!(fs::metadata(&image_file).unwrap().modified().unwrap(), before);
        let chat_len = fs::metadata(store.key_path("nexus_chatHistory")).unwrap().len();
        assert_eq!(chat_len, "[49]".len() as u64);
        assert_eq!(store.get("nexus_sourceImageUrl").unwrap().map(|v| v.len()), Some(1 << 20));
    }

    #[test]
    fn test_file_store_keys_are_path_safe() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path().join("storage"));
        store.set("../escape/key", "v").unwrap();

        assert_eq!(store.get("../escape/key").unwrap().as_deref(), Some("v"));
        assert!(!dir.path().join("escape").exists());
    }

    #[test]
    fn test_write_or_remove_empty_value_removes_key() {
        let store = MemoryStore::new();
        write_or_remove(&store, "k", Some("v"));
        assert_eq!(read_or_default(&store, "k").as_deref(), Some("v"));

        write_or_remove(&store, "k", Some(""));
        assert!(store.is_empty());

        write_or_remove(&store, "k", Some("v"));
        write_or_remove(&store, "k", None);
        assert_eq!(store.len(), 0);
    }

    #[test]
    fn test_read_or_default_swallows_errors() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("storage");
        fs::write(&blocker, "not a directory").unwrap();
        // A file where the store directory should be makes reads fail.
        let store = FileStore::new(&blocker);
        assert!(store.get("k").is_err());
        assert_eq!(read_or_default(&store, "k"), None);
    }
}
