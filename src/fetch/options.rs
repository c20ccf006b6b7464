//! Per-call fetch configuration.

use chrono::Duration as TtlDuration;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::cancel::CancelSignal;

/// What to serve once every endpoint has failed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum OnTotalFailure {
  /// Stale cache, then the resource's static fallback
  #[default]
  Fallback,
  /// Stale cache, then nothing
  StaleOnly,
  /// Nothing, even if stale data is cached
  Empty,
}

#[derive(Debug, Clone)]
pub struct FetchOptions {
  /// Per-endpoint request timeout
  pub timeout: Duration,
  /// Freshness window for entries stored by this call
  pub cache_ttl: TtlDuration,
  /// Consult and populate the cache at all
  pub use_cache: bool,
  /// Skip the fresh-cache short circuit; still store on success
  pub force_refresh: bool,
  pub on_total_failure: OnTotalFailure,
  /// Extra request headers
  pub headers: Vec<(String, String)>,
  /// Extra query pairs, appended after the scope parameter
  pub query: Vec<(String, String)>,
  pub cancel: Option<CancelSignal>,
}

impl Default for FetchOptions {
  fn default() -> Self {
    Self {
      timeout: Duration::from_millis(5000),
      cache_ttl: TtlDuration::minutes(5),
      use_cache: true,
      force_refresh: false,
      on_total_failure: OnTotalFailure::Fallback,
      headers: Vec::new(),
      query: Vec::new(),
      cancel: None,
    }
  }
}

impl FetchOptions {
  pub fn with_timeout(mut self, timeout: Duration) -> Self {
    self.timeout = timeout;
    self
  }

  pub fn with_cache_ttl(mut self, ttl: TtlDuration) -> Self {
    self.cache_ttl = ttl;
    self
  }

  pub fn with_use_cache(mut self, use_cache: bool) -> Self {
    self.use_cache = use_cache;
    self
  }

  pub fn with_force_refresh(mut self, force_refresh: bool) -> Self {
    self.force_refresh = force_refresh;
    self
  }

  pub fn with_on_total_failure(mut self, policy: OnTotalFailure) -> Self {
    self.on_total_failure = policy;
    self
  }

  pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
    self.headers.push((name.into(), value.into()));
    self
  }

  pub fn with_query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
    self.query.push((name.into(), value.into()));
    self
  }

  pub fn with_cancel(mut self, signal: CancelSignal) -> Self {
    self.cancel = Some(signal);
    self
  }

  pub(crate) fn is_cancelled(&self) -> bool {
    self.cancel.as_ref().is_some_and(CancelSignal::is_cancelled)
  }
}
