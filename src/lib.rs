//! Resilient multi-endpoint JSON fetch client.
//!
//! Given a logical resource such as `parties:gamescom2025`, the client tries an
//! ordered list of backend base URLs, normalizes whichever response shape the
//! backend uses, caches the first non-empty result with a TTL, and degrades to
//! stale cache or static sample data when every endpoint is down.

pub mod cache;
pub mod cancel;
pub mod error;
pub mod fallback;
pub mod fetch;
pub mod normalize;
pub mod resource;

/// One record as returned by a backend.
pub type Record = serde_json::Value;

pub use error::{ClientError, FetchError, TransportError};
pub use fetch::{
  FetchOptions, FetchOutcome, Freshness, OnTotalFailure, ResilientFetchClient, Source,
};
