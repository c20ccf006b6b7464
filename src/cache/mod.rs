//! In-process caching for fetched record lists.
//!
//! This module provides:
//! - `CacheEntry`, a record list with its store time, TTL and content fingerprint
//! - `CacheStorage` backends (`MemoryStorage`, `NoopStorage`)
//! - `Clock` implementations used to judge freshness
//!
//! Stale entries are kept so the client can serve them when every endpoint fails.

mod clock;
mod storage;
mod traits;

pub use clock::{Clock, ManualClock, SystemClock};
pub use storage::{CacheStorage, MemoryStorage, NoopStorage};
pub use traits::{fingerprint, CacheEntry};
