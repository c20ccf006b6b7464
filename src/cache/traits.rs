//! Core types for the caching system.

use chrono::{DateTime, Duration, Utc};
use sha2::{Digest, Sha256};

use crate::Record;

/// A cached record list for one resource key.
///
/// Entries are never evicted for being old. A stale entry stays around as
/// last-resort data until it is overwritten or explicitly cleared.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry {
  pub key: String,
  pub records: Vec<Record>,
  pub stored_at: DateTime<Utc>,
  pub ttl: Duration,
  /// Hex SHA-256 of the serialized records
  pub fingerprint: String,
}

impl CacheEntry {
  pub fn new(key: &str, records: Vec<Record>, stored_at: DateTime<Utc>, ttl: Duration) -> Self {
    let fingerprint = fingerprint(&records);
    Self {
      key: key.to_string(),
      records,
      stored_at,
      ttl,
      fingerprint,
    }
  }

  /// Fresh iff `now - stored_at < ttl`.
  pub fn is_fresh(&self, now: DateTime<Utc>) -> bool {
    now - self.stored_at < self.ttl
  }
}

/// Stable content hash for a record list.
pub fn fingerprint(records: &[Record]) -> String {
  let mut hasher = Sha256::new();
  for record in records {
    // Value serialization cannot fail; objects serialize with sorted keys.
    hasher.update(record.to_string().as_bytes());
    hasher.update(b"\n");
  }
  hex::encode(hasher.finalize())
}
