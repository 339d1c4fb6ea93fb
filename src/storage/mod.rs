//! Prefixed, expiring key/value cache over a pluggable [`Storage`] backend.
//!
//! Every entry is stored as `{"value": .., "time": <ms>, "expire": <secs>}`
//! under `"{prefix}:{key}"`, so several caches can share one backend.

mod backend;

use std::sync::Arc;

use serde::{de::DeserializeOwned, Serialize};
use serde_json::{json, Value as JsonValue};

pub use backend::{FileStorage, MemoryStorage};

use crate::core::{ProKitResult, Storage};
use crate::utils::date::now_millis;

/// Key prefix, either fixed or computed on every access
#[derive(Clone)]
pub enum Prefix {
    Static(String),
    Dynamic(Arc<dyn Fn() -> String + Send + Sync>),
}

impl Prefix {
    fn resolve(&self) -> String {
        match self {
            Prefix::Static(prefix) => prefix.clone(),
            Prefix::Dynamic(f) => f(),
        }
    }
}

impl Default for Prefix {
    fn default() -> Self {
        Prefix::Static(String::new())
    }
}

impl From<&str> for Prefix {
    fn from(value: &str) -> Self {
        Prefix::Static(value.to_string())
    }
}

impl From<String> for Prefix {
    fn from(value: String) -> Self {
        Prefix::Static(value)
    }
}

#[derive(Clone, Default)]
pub struct CacheOptions {
    pub prefix_key: Prefix,
    /// Default lifetime in seconds, 0 never expires
    pub timeout: u64,
}

pub struct StorageCache<S: Storage = MemoryStorage> {
    storage: S,
    prefix_key: Prefix,
    timeout: u64,
}

impl StorageCache<MemoryStorage> {
    /// Cache over a fresh in-memory backend.
    pub fn in_memory(options: CacheOptions) -> Self {
        Self::new(MemoryStorage::new(), options)
    }
}

impl<S: Storage> StorageCache<S> {
    /// Creates the cache and evicts any expired or malformed entries it owns.
    pub fn new(storage: S, options: CacheOptions) -> Self {
        let cache = Self {
            storage,
            prefix_key: options.prefix_key,
            timeout: options.timeout,
        };
        cache.clean_up();
        cache
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    fn full_key(&self, key: &str) -> String {
        format!("{}:{key}", self.prefix_key.resolve())
    }

    /// Stores `value` with the default lifetime.
    pub fn set<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> ProKitResult<()> {
        self.set_with_expire(key, value, self.timeout)
    }

    /// Stores `value` for `expire` seconds (0 never expires).
    pub fn set_with_expire<T: Serialize + ?Sized>(
        &self,
        key: &str,
        value: &T,
        expire: u64,
    ) -> ProKitResult<()> {
        let record = json!({
            "value": serde_json::to_value(value)?,
            "time": now_millis(),
            "expire": expire,
        });
        self.storage
            .set_item(&self.full_key(key), &record.to_string())
    }

    /// Reads a live entry.
    ///
    /// Malformed and expired entries are removed and read as `None`. An entry
    /// that does not deserialize into `T` is left in place and read as `None`.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let value = self.get_value(key)?;
        match serde_json::from_value(value) {
            Ok(value) => Some(value),
            Err(e) => {
                log::debug!("Cache entry '{key}' has an unexpected type: {e}");
                None
            }
        }
    }

    fn get_value(&self, key: &str) -> Option<JsonValue> {
        let raw = self.storage.get_item(&self.full_key(key))?;
        if raw.is_empty() {
            return None;
        }

        let record = match serde_json::from_str::<JsonValue>(&raw) {
            Ok(JsonValue::Object(record)) => record,
            _ => {
                log::debug!("Dropping malformed cache entry '{key}'");
                self.remove(key);
                return None;
            }
        };

        let time = record.get("time").and_then(JsonValue::as_f64);
        let expire = record.get("expire").and_then(JsonValue::as_f64);
        let (Some(value), Some(time), Some(expire)) = (record.get("value"), time, expire) else {
            log::debug!("Dropping malformed cache entry '{key}'");
            self.remove(key);
            return None;
        };

        if expire != 0.0 && now_millis() as f64 > expire * 1000.0 + time {
            log::debug!("Cache entry '{key}' expired");
            self.remove(key);
            return None;
        }

        Some(value.clone())
    }

    pub fn remove(&self, key: &str) {
        self.storage.remove_item(&self.full_key(key));
    }

    /// Keys owned by this cache, without the prefix.
    pub fn keys(&self) -> Vec<String> {
        let prefix = self.full_key("");
        self.storage
            .keys()
            .into_iter()
            .filter_map(|key| key.strip_prefix(&prefix).map(str::to_string))
            .collect()
    }

    /// Removes every entry owned by this cache.
    pub fn clear(&self) {
        for key in self.keys() {
            self.remove(&key);
        }
    }

    /// Evicts expired and malformed entries.
    pub fn clean_up(&self) {
        for key in self.keys() {
            self.get_value(&key);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use serde::Deserialize;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct User {
        id: u32,
        name: String,
    }

    fn options(prefix: &str, timeout: u64) -> CacheOptions {
        CacheOptions {
            prefix_key: prefix.into(),
            timeout,
        }
    }

    #[test]
    fn test_set_get_remove() {
        let cache = StorageCache::in_memory(options("app", 0));
        let user = User {
            id: 1,
            name: "amy".to_string(),
        };
        cache.set("user", &user).unwrap();

        assert_eq!(cache.get::<User>("user"), Some(user));
        assert!(cache.storage().get_item("app:user").is_some());
        assert_eq!(cache.get::<u32>("user"), None);
        assert!(cache.storage().get_item("app:user").is_some());

        cache.remove("user");
        assert_eq!(cache.get::<User>("user"), None);
    }

    #[test]
    fn test_null_value_is_kept() {
        let cache = StorageCache::in_memory(options("app", 0));
        cache.set("nothing", &JsonValue::Null).unwrap();
        assert_eq!(cache.get::<Option<u32>>("nothing"), Some(None));
    }

    #[test]
    fn test_expired_entry_is_removed() {
        let cache = StorageCache::in_memory(options("app", 0));
        let stale = json!({"value": 1, "time": now_millis() - 5_000, "expire": 2});
        cache
            .storage()
            .set_item("app:stale", &stale.to_string())
            .unwrap();
        let fresh = json!({"value": 2, "time": now_millis() - 5_000, "expire": 60});
        cache
            .storage()
            .set_item("app:fresh", &fresh.to_string())
            .unwrap();

        assert_eq!(cache.get::<u32>("stale"), None);
        assert!(cache.storage().get_item("app:stale").is_none());
        assert_eq!(cache.get::<u32>("fresh"), Some(2));
    }

    #[test]
    fn test_malformed_entries_are_removed() {
        let cache = StorageCache::in_memory(options("app", 0));
        let storage = cache.storage();
        storage.set_item("app:a", "not json").unwrap();
        storage.set_item("app:b", "[1, 2]").unwrap();
        storage.set_item("app:c", r#"{"time": 1, "expire": 0}"#).unwrap();
        storage
            .set_item("app:d", r#"{"value": 1, "time": "x", "expire": 0}"#)
            .unwrap();

        for key in ["a", "b", "c", "d"] {
            assert_eq!(cache.get::<JsonValue>(key), None);
        }
        assert!(storage.keys().is_empty());
    }

    #[test]
    fn test_construction_cleans_up() {
        let storage = MemoryStorage::new();
        let stale = json!({"value": 1, "time": 0, "expire": 1});
        storage.set_item("app:stale", &stale.to_string()).unwrap();
        storage.set_item("other:stale", &stale.to_string()).unwrap();

        let cache = StorageCache::new(storage, options("app", 0));
        assert!(cache.keys().is_empty());
        assert!(cache.storage().get_item("other:stale").is_some());
    }

    #[test]
    fn test_keys_and_clear_respect_prefix() {
        let cache = StorageCache::in_memory(options("app", 3600));
        cache.set("a", &1).unwrap();
        cache.set("b", &2).unwrap();
        cache.storage().set_item("other:c", "3").unwrap();

        let mut keys = cache.keys();
        keys.sort();
        assert_eq!(keys, vec!["a".to_string(), "b".to_string()]);

        cache.clear();
        assert!(cache.keys().is_empty());
        assert_eq!(cache.storage().get_item("other:c").as_deref(), Some("3"));
    }

    #[test]
    fn test_dynamic_prefix() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let cache = StorageCache::in_memory(CacheOptions {
            prefix_key: Prefix::Dynamic(Arc::new(move || {
                counter.fetch_add(1, Ordering::SeqCst);
                "user-42".to_string()
            })),
            timeout: 0,
        });

        cache.set("token", "abc").unwrap();
        assert!(cache.storage().get_item("user-42:token").is_some());
        assert_eq!(cache.get::<String>("token").as_deref(), Some("abc"));
        assert!(calls.load(Ordering::SeqCst) >= 2);
    }
}
