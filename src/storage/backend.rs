use std::{
    collections::BTreeMap,
    fs,
    io::Write,
    path::{Path, PathBuf},
    sync::Mutex,
};

use dashmap::DashMap;
use tempfile::NamedTempFile;

use crate::core::{ErrorContext, ProKitError, ProKitResult, Storage};

/// Process-local storage, lost when dropped
#[derive(Debug, Default)]
pub struct MemoryStorage {
    items: DashMap<String, String>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Storage for MemoryStorage {
    fn get_item(&self, key: &str) -> Option<String> {
        self.items.get(key).map(|v| v.value().clone())
    }

    fn set_item(&self, key: &str, value: &str) -> ProKitResult<()> {
        self.items.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&self, key: &str) {
        self.items.remove(key);
    }

    fn keys(&self) -> Vec<String> {
        self.items.iter().map(|e| e.key().clone()).collect()
    }
}

/// Storage persisted as a single JSON object on disk.
///
/// The whole map is rewritten after every mutation, through a temp file
/// renamed over the store. A mutation whose write fails leaves the map as it
/// was.
#[derive(Debug)]
pub struct FileStorage {
    path: PathBuf,
    items: Mutex<BTreeMap<String, String>>,
}

impl FileStorage {
    /// Opens the store at `path`, starting empty if the file does not exist.
    pub fn open(path: impl AsRef<Path>) -> ProKitResult<Self> {
        let path = path.as_ref().to_path_buf();
        let items = match fs::read_to_string(&path) {
            Ok(content) if content.trim().is_empty() => BTreeMap::new(),
            Ok(content) => serde_json::from_str(&content).map_err(|e| {
                ProKitError::serialization_error(
                    &format!("Invalid storage file {}", path.display()),
                    e,
                )
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(e.into()),
        };
        log::debug!("Opened storage file {} with {} items", path.display(), items.len());

        Ok(Self {
            path,
            items: Mutex::new(items),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BTreeMap<String, String>> {
        // A panic mid-update leaves the map itself intact, keep serving it.
        self.items.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn persist(&self, items: &BTreeMap<String, String>) -> ProKitResult<()> {
        let dir = self
            .path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        fs::create_dir_all(dir).with_context("Failed to create storage directory")?;

        let content = serde_json::to_vec(items)?;
        let mut file = NamedTempFile::new_in(dir)?;
        file.write_all(&content)?;
        file.persist(&self.path).map_err(|e| {
            ProKitError::Storage(format!("Failed to write {}: {e}", self.path.display()))
        })?;
        Ok(())
    }
}

impl Storage for FileStorage {
    fn get_item(&self, key: &str) -> Option<String> {
        self.lock().get(key).cloned()
    }

    fn set_item(&self, key: &str, value: &str) -> ProKitResult<()> {
        let mut items = self.lock();
        let mut next = items.clone();
        next.insert(key.to_string(), value.to_string());
        self.persist(&next)?;
        *items = next;
        Ok(())
    }

    fn remove_item(&self, key: &str) {
        let mut items = self.lock();
        if !items.contains_key(key) {
            return;
        }
        let mut next = items.clone();
        next.remove(key);
        match self.persist(&next) {
            Ok(()) => *items = next,
            Err(e) => log::error!("Failed to persist removal of '{key}': {e}"),
        }
    }

    fn keys(&self) -> Vec<String> {
        self.lock().keys().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_storage() {
        let storage = MemoryStorage::new();
        storage.set_item("k", "v").unwrap();
        storage.set_item("k", "v2").unwrap();
        assert_eq!(storage.get_item("k").as_deref(), Some("v2"));
        assert_eq!(storage.keys(), vec!["k".to_string()]);
        storage.remove_item("k");
        storage.remove_item("missing");
        assert!(storage.get_item("k").is_none());
    }

    #[test]
    fn test_file_storage_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache").join("store.json");

        let storage = FileStorage::open(&path).unwrap();
        assert!(storage.keys().is_empty());
        storage.set_item("a", "1").unwrap();
        storage.set_item("b", "2").unwrap();
        storage.remove_item("a");
        drop(storage);

        let reopened = FileStorage::open(&path).unwrap();
        assert_eq!(reopened.keys(), vec!["b".to_string()]);
        assert_eq!(reopened.get_item("b").as_deref(), Some("2"));
    }

    #[test]
    fn test_file_storage_leaves_only_the_store() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::open(dir.path().join("store.json")).unwrap();
        storage.set_item("a", "1").unwrap();
        storage.set_item("b", "2").unwrap();

        let names: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name())
            .collect();
        assert_eq!(names, vec![std::ffi::OsString::from("store.json")]);
    }

    #[test]
    fn test_file_storage_failed_write_keeps_state() {
        let dir = tempfile::tempdir().unwrap();
        let sub = dir.path().join("sub");
        let storage = FileStorage::open(sub.join("store.json")).unwrap();
        storage.set_item("a", "1").unwrap();

        // a plain file where the store's directory should be
        std::fs::remove_dir_all(&sub).unwrap();
        std::fs::write(&sub, "blocker").unwrap();

        assert!(storage.set_item("b", "2").is_err());
        assert!(storage.get_item("b").is_none());
        storage.remove_item("a");
        assert_eq!(storage.get_item("a").as_deref(), Some("1"));
    }

    #[test]
    fn test_file_storage_rejects_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");
        std::fs::write(&path, "not json").unwrap();
        assert!(matches!(
            FileStorage::open(&path),
            Err(ProKitError::Serialization(_))
        ));
    }
}
