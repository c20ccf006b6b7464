//! Cache storage trait and in-memory implementation.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use super::traits::CacheEntry;

/// Trait for cache storage backends.
pub trait CacheStorage: Send + Sync {
  /// Get the entry for a key, fresh or stale.
  fn get(&self, key: &str) -> Option<CacheEntry>;

  /// Store an entry, replacing any previous one for the same key.
  /// Returns the replaced entry.
  fn put(&self, entry: CacheEntry) -> Option<CacheEntry>;

  /// Remove a single entry.
  fn remove(&self, key: &str) -> Option<CacheEntry>;

  /// Remove every entry.
  fn clear(&self);

  fn len(&self) -> usize;

  fn is_empty(&self) -> bool {
    self.len() == 0
  }
}

/// Storage implementation that doesn't cache anything.
/// Used when caching is disabled - all operations are no-ops.
pub struct NoopStorage;

impl CacheStorage for NoopStorage {
  fn get(&self, _key: &str) -> Option<CacheEntry> {
    None // Always miss
  }

  fn put(&self, _entry: CacheEntry) -> Option<CacheEntry> {
    None // Discard
  }

  fn remove(&self, _key: &str) -> Option<CacheEntry> {
    None
  }

  fn clear(&self) {}

  fn len(&self) -> usize {
    0
  }
}

/// Process-local cache map.
///
/// Lives as long as the owning client; nothing is written to disk.
#[derive(Default)]
pub struct MemoryStorage {
  entries: Mutex<HashMap<String, CacheEntry>>,
}

impl MemoryStorage {
  pub fn new() -> Self {
    Self::default()
  }

  /// Keys currently held, sorted.
  pub fn keys(&self) -> Vec<String> {
    let mut keys: Vec<String> = self.lock().keys().cloned().collect();
    keys.sort();
    keys
  }

  fn lock(&self) -> MutexGuard<'_, HashMap<String, CacheEntry>> {
    // A panic while holding the lock cannot leave a half-written entry behind,
    // so the map is still usable.
    self.entries.lock().unwrap_or_else(PoisonError::into_inner)
  }
}

impl CacheStorage for MemoryStorage {
  fn get(&self, key: &str) -> Option<CacheEntry> {
    self.lock().get(key).cloned()
  }

  fn put(&self, entry: CacheEntry) -> Option<CacheEntry> {
    self.lock().insert(entry.key.clone(), entry)
  }

  fn remove(&self, key: &str) -> Option<CacheEntry> {
    self.lock().remove(key)
  }

  fn clear(&self) {
    self.lock().clear();
  }

  fn len(&self) -> usize {
    self.lock().len()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use chrono::{Duration, Utc};
  use serde_json::json;

  fn entry(key: &str, id: i64) -> CacheEntry {
    CacheEntry::new(key, vec![json!({ "id": id })], Utc::now(), Duration::minutes(5))
  }

  #[test]
  fn test_put_overwrites_and_returns_previous() {
    let storage = MemoryStorage::new();
    assert!(storage.put(entry("parties:a", 1)).is_none());

    let previous = storage.put(entry("parties:a", 2)).unwrap();
    assert_eq!(previous.records, vec![json!({"id": 1})]);
    assert_eq!(storage.get("parties:a").unwrap().records, vec![json!({"id": 2})]);
    assert_eq!(storage.len(), 1);
  }

  #[test]
  fn test_remove_and_clear() {
    let storage = MemoryStorage::new();
    storage.put(entry("parties:a", 1));
    storage.put(entry("parties:b", 2));
    assert_eq!(storage.keys(), vec!["parties:a", "parties:b"]);

    assert!(storage.remove("parties:a").is_some());
    assert!(storage.get("parties:a").is_none());
    assert_eq!(storage.len(), 1);

    storage.clear();
    assert!(storage.is_empty());
  }

  #[test]
  fn test_noop_storage_always_misses() {
    let storage = NoopStorage;
    storage.put(entry("parties:a", 1));
    assert!(storage.get("parties:a").is_none());
    assert!(storage.is_empty());
  }
}
