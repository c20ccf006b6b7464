//! Fetch results and metadata about where they came from.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::time::Duration;

use crate::Record;

/// Indicates where returned records came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Source {
  /// Fresh data from the named endpoint
  Network { endpoint: String },
  /// Data from cache, still within its TTL
  Cache,
  /// All endpoints failed, serving an expired cache entry
  StaleCache,
  /// All endpoints failed and nothing was cached
  StaticFallback,
  /// All endpoints failed and the failure policy served nothing
  Empty,
}

/// Coarse freshness for UI decisions such as an "offline" badge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Freshness {
  Fresh,
  Stale,
  Fallback,
  Empty,
}

/// Result of `fetch_resource`.
#[derive(Debug, Clone, Serialize)]
pub struct FetchOutcome {
  pub records: Vec<Record>,
  pub source: Source,
  /// When the served records were stored, for cached and network data
  pub stored_at: Option<DateTime<Utc>>,
  /// Content fingerprint, for cached and network data
  pub revision: Option<String>,
}

impl FetchOutcome {
  pub fn freshness(&self) -> Freshness {
    match self.source {
      Source::Network { .. } | Source::Cache => Freshness::Fresh,
      Source::StaleCache => Freshness::Stale,
      Source::StaticFallback => Freshness::Fallback,
      Source::Empty => Freshness::Empty,
    }
  }

  pub fn is_fresh(&self) -> bool {
    self.freshness() == Freshness::Fresh
  }
}

/// Result of probing one endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct ProbeReport {
  pub endpoint: String,
  pub url: String,
  #[serde(serialize_with = "serialize_millis")]
  pub elapsed: Duration,
  /// Record count on success, error text on failure
  pub result: Result<usize, String>,
}

impl ProbeReport {
  pub fn is_ok(&self) -> bool {
    self.result.is_ok()
  }
}

fn serialize_millis<S: serde::Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
  s.serialize_u64(d.as_millis() as u64)
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  #[test]
  fn test_freshness_mapping() {
    let outcome = |source| FetchOutcome {
      records: Vec::new(),
      source,
      stored_at: None,
      revision: None,
    };

    let network = outcome(Source::Network {
      endpoint: "https://a.example/api".to_string(),
    });
    assert_eq!(network.freshness(), Freshness::Fresh);
    assert!(network.is_fresh());
    assert_eq!(outcome(Source::Cache).freshness(), Freshness::Fresh);
    assert_eq!(outcome(Source::StaleCache).freshness(), Freshness::Stale);
    assert_eq!(
      outcome(Source::StaticFallback).freshness(),
      Freshness::Fallback
    );
    assert_eq!(outcome(Source::Empty).freshness(), Freshness::Empty);
  }

  #[test]
  fn test_outcome_serializes_source_tag() {
    let outcome = FetchOutcome {
      records: vec![json!({"id": "1"})],
      source: Source::Network {
        endpoint: "https://b.example/api".to_string(),
      },
      stored_at: None,
      revision: None,
    };

    let value = serde_json::to_value(&outcome).unwrap();
    assert_eq!(value["source"]["kind"], "network");
    assert_eq!(value["source"]["endpoint"], "https://b.example/api");
    assert_eq!(value["records"][0]["id"], "1");
  }
}
