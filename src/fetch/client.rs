//! Multi-endpoint fetch client with TTL cache and graceful degradation.

use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info, warn};
use url::Url;

use crate::cache::{CacheEntry, CacheStorage, Clock, MemoryStorage, SystemClock};
use crate::error::{ClientError, FetchError};
use crate::normalize::Normalizer;
use crate::resource::{ResourceCatalog, ResourceKey, ResourceType};
use crate::Record;

use super::options::{FetchOptions, OnTotalFailure};
use super::outcome::{FetchOutcome, ProbeReport, Source};
use super::transport::Transport;

/// Fetch client that walks an ordered endpoint list.
///
/// 1. Fresh cache entry: return it without touching the network
/// 2. Otherwise try endpoints in order; the first non-empty result wins and is cached
/// 3. All endpoints failed: stale cache, then the static fallback (per `OnTotalFailure`)
///
/// Network and data errors never reach the caller. Only bad configuration and
/// cancellation do.
pub struct ResilientFetchClient<S: CacheStorage = MemoryStorage> {
  transport: Arc<dyn Transport>,
  storage: Arc<S>,
  clock: Arc<dyn Clock>,
  catalog: Arc<ResourceCatalog>,
}

/// A validated request: parsed key, resolved type, one URL per endpoint.
struct Plan {
  key: ResourceKey,
  cache_key: String,
  resource: ResourceType,
  targets: Vec<(String, Url)>,
}

impl ResilientFetchClient<MemoryStorage> {
  /// Client with an in-memory cache, the system clock and built-in resource types.
  pub fn new(transport: impl Transport + 'static) -> Self {
    Self::with_storage(transport, MemoryStorage::new())
  }
}

impl<S: CacheStorage> ResilientFetchClient<S> {
  pub fn with_storage(transport: impl Transport + 'static, storage: S) -> Self {
    Self {
      transport: Arc::new(transport),
      storage: Arc::new(storage),
      clock: Arc::new(SystemClock),
      catalog: Arc::new(ResourceCatalog::builtin()),
    }
  }

  pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
    self.clock = clock;
    self
  }

  pub fn with_catalog(mut self, catalog: ResourceCatalog) -> Self {
    self.catalog = Arc::new(catalog);
    self
  }

  pub fn storage(&self) -> &S {
    &self.storage
  }

  /// Produce the best available records for `resource_key`.
  pub async fn fetch_resource<E: AsRef<str>>(
    &self,
    resource_key: &str,
    endpoints: &[E],
    options: &FetchOptions,
  ) -> Result<FetchOutcome, ClientError> {
    let plan = self.plan(resource_key, endpoints, &options.query)?;

    if options.use_cache && !options.force_refresh {
      if let Some(entry) = self.storage.get(&plan.cache_key) {
        if entry.is_fresh(self.clock.now()) {
          debug!(event = "cache_hit", key = %plan.cache_key, "serving fresh cache entry");
          return Ok(from_entry(entry, Source::Cache));
        }
      }
    }

    let normalizer = plan.resource.normalizer();

    for (endpoint, url) in &plan.targets {
      if options.is_cancelled() {
        return Err(ClientError::Cancelled);
      }

      debug!(event = "endpoint_attempt", key = %plan.key, %url, "trying endpoint");
      let started = Instant::now();

      match self.attempt(url, options, &normalizer).await {
        Ok(records) => {
          info!(
            event = "endpoint_success",
            key = %plan.key,
            %endpoint,
            records = records.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "endpoint satisfied request"
          );
          return Ok(self.store(&plan, endpoint, records, options));
        }
        Err(FetchError::Cancelled) => return Err(ClientError::Cancelled),
        Err(err) => {
          warn!(
            event = "endpoint_failure",
            key = %plan.key,
            %url,
            error = %err,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "endpoint failed, trying next"
          );
        }
      }
    }

    Ok(self.degrade(&plan, options))
  }

  /// Clear one entry (by resource key, plus extra query if the entry was
  /// stored with one) or the whole cache.
  pub fn clear_cache(&self, key: Option<&str>) {
    match key {
      Some(key) => {
        let removed = self.storage.remove(key).is_some();
        debug!(event = "cache_clear", key, removed, "cleared cache entry");
      }
      None => {
        self.storage.clear();
        debug!(event = "cache_clear", "cleared cache");
      }
    }
  }

  /// Try every endpoint and report each result. Does not read or write the cache.
  pub async fn probe<E: AsRef<str>>(
    &self,
    resource_key: &str,
    endpoints: &[E],
    options: &FetchOptions,
  ) -> Result<Vec<ProbeReport>, ClientError> {
    let plan = self.plan(resource_key, endpoints, &options.query)?;
    let normalizer = plan.resource.normalizer();
    let mut reports = Vec::with_capacity(plan.targets.len());

    for (endpoint, url) in &plan.targets {
      if options.is_cancelled() {
        return Err(ClientError::Cancelled);
      }

      let started = Instant::now();
      let result = match self.attempt(url, options, &normalizer).await {
        Ok(records) => Ok(records.len()),
        Err(FetchError::Cancelled) => return Err(ClientError::Cancelled),
        Err(err) => Err(err.to_string()),
      };

      reports.push(ProbeReport {
        endpoint: endpoint.clone(),
        url: url.to_string(),
        elapsed: started.elapsed(),
        result,
      });
    }

    Ok(reports)
  }

  /// Validate inputs before any I/O.
  fn plan<E: AsRef<str>>(
    &self,
    resource_key: &str,
    endpoints: &[E],
    query: &[(String, String)],
  ) -> Result<Plan, ClientError> {
    let key = ResourceKey::parse(resource_key)?;

    if endpoints.is_empty() {
      return Err(ClientError::NoEndpoints);
    }

    let resource = self.catalog.resolve(key.kind());
    let targets = endpoints
      .iter()
      .map(|endpoint| {
        let endpoint = endpoint.as_ref();
        let base = parse_endpoint(endpoint)?;
        Ok((endpoint.to_string(), resource.request_url(&base, &key, query)))
      })
      .collect::<Result<Vec<_>, ClientError>>()?;

    Ok(Plan {
      cache_key: key.cache_key(query),
      key,
      resource,
      targets,
    })
  }

  /// One endpoint attempt, bounded by the timeout and the cancel signal.
  async fn attempt(
    &self,
    url: &Url,
    options: &FetchOptions,
    normalizer: &Normalizer,
  ) -> Result<Vec<Record>, FetchError> {
    let request = tokio::time::timeout(options.timeout, self.transport.get(url, &options.headers));

    let response = match &options.cancel {
      Some(signal) => tokio::select! {
        biased;
        _ = signal.cancelled() => return Err(FetchError::Cancelled),
        response = request => response,
      },
      None => request.await,
    }
    .map_err(|_| FetchError::Timeout(options.timeout))??;

    if !response.is_success() {
      return Err(FetchError::Status(response.status));
    }

    let body: serde_json::Value = serde_json::from_slice(&response.body)?;
    let records = normalizer.normalize(&body);
    if records.is_empty() {
      return Err(FetchError::Empty);
    }

    Ok(records)
  }

  fn store(
    &self,
    plan: &Plan,
    endpoint: &str,
    records: Vec<Record>,
    options: &FetchOptions,
  ) -> FetchOutcome {
    let stored_at = self.clock.now();
    let entry = CacheEntry::new(&plan.cache_key, records, stored_at, options.cache_ttl);
    let revision = entry.fingerprint.clone();

    if options.use_cache {
      self.storage.put(entry.clone());
      debug!(event = "cache_store", key = %plan.cache_key, %revision, "stored records");
    }

    FetchOutcome {
      records: entry.records,
      source: Source::Network {
        endpoint: endpoint.to_string(),
      },
      stored_at: Some(stored_at),
      revision: Some(revision),
    }
  }

  /// Every endpoint failed.
  fn degrade(&self, plan: &Plan, options: &FetchOptions) -> FetchOutcome {
    let stale = match options.on_total_failure {
      OnTotalFailure::Empty => None,
      _ if options.use_cache => self.storage.get(&plan.cache_key),
      _ => None,
    };

    if let Some(entry) = stale {
      warn!(
        event = "fallback_used",
        key = %plan.key,
        fallback = "cache",
        stored_at = %entry.stored_at,
        "all endpoints failed, serving cached data"
      );
      // A forced refresh can fail while the entry is still inside its TTL.
      let source = if entry.is_fresh(self.clock.now()) {
        Source::Cache
      } else {
        Source::StaleCache
      };
      return from_entry(entry, source);
    }

    if options.on_total_failure == OnTotalFailure::Fallback && !plan.resource.fallback.is_empty() {
      warn!(
        event = "fallback_used",
        key = %plan.key,
        fallback = "static",
        "all endpoints failed, serving static fallback"
      );
      return FetchOutcome {
        records: plan.resource.fallback.clone(),
        source: Source::StaticFallback,
        stored_at: None,
        revision: None,
      };
    }

    warn!(
      event = "fallback_used",
      key = %plan.key,
      fallback = "empty",
      "all endpoints failed, nothing to serve"
    );
    FetchOutcome {
      records: Vec::new(),
      source: Source::Empty,
      stored_at: None,
      revision: None,
    }
  }
}

impl<S: CacheStorage> Clone for ResilientFetchClient<S> {
  fn clone(&self) -> Self {
    Self {
      transport: Arc::clone(&self.transport),
      storage: Arc::clone(&self.storage),
      clock: Arc::clone(&self.clock),
      catalog: Arc::clone(&self.catalog),
    }
  }
}

fn from_entry(entry: CacheEntry, source: Source) -> FetchOutcome {
  FetchOutcome {
    records: entry.records,
    source,
    stored_at: Some(entry.stored_at),
    revision: Some(entry.fingerprint),
  }
}

fn parse_endpoint(endpoint: &str) -> Result<Url, ClientError> {
  let invalid = |reason: String| ClientError::InvalidEndpoint {
    url: endpoint.to_string(),
    reason,
  };

  let url = Url::parse(endpoint).map_err(|e| invalid(e.to_string()))?;
  if url.cannot_be_a_base() {
    return Err(invalid("not a base url".to_string()));
  }
  if !matches!(url.scheme(), "http" | "https") {
    return Err(invalid(format!("unsupported scheme {}", url.scheme())));
  }
  Ok(url)
}
