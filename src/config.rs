use color_eyre::{eyre::eyre, Result};
use rfetch::resource::{ResourceCatalog, ResourceOverrides};
use rfetch::{FetchOptions, OnTotalFailure};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
  /// Endpoint base URLs in order of preference
  #[serde(default)]
  pub endpoints: Vec<String>,
  #[serde(default)]
  pub defaults: FetchDefaults,
  #[serde(default)]
  pub cache: CacheConfig,
  /// Headers sent with every request
  #[serde(default)]
  pub headers: BTreeMap<String, String>,
  /// Per resource type overrides (path, scope_param, wrapper_keys, fallback)
  #[serde(default)]
  pub resources: BTreeMap<String, ResourceOverrides>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FetchDefaults {
  #[serde(default = "default_timeout_ms")]
  pub timeout_ms: u64,
  #[serde(default = "default_cache_ttl_ms")]
  pub cache_ttl_ms: u64,
  #[serde(default)]
  pub on_total_failure: OnTotalFailure,
}

fn default_timeout_ms() -> u64 {
  5000
}

fn default_cache_ttl_ms() -> u64 {
  5 * 60 * 1000
}

impl Default for FetchDefaults {
  fn default() -> Self {
    Self {
      timeout_ms: default_timeout_ms(),
      cache_ttl_ms: default_cache_ttl_ms(),
      on_total_failure: OnTotalFailure::default(),
    }
  }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
  #[serde(default = "default_true")]
  pub enabled: bool,
}

fn default_true() -> bool {
  true
}

impl Default for CacheConfig {
  fn default() -> Self {
    Self { enabled: true }
  }
}

impl Config {
  /// Load configuration from file.
  ///
  /// Search order:
  /// 1. Explicit path if provided
  /// 2. ./rfetch.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/rfetch/config.yaml
  ///
  /// Falls back to built-in defaults when no file is found.
  pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
    let path = if let Some(p) = explicit_path {
      if p.exists() {
        Some(p.to_path_buf())
      } else {
        return Err(eyre!("Config file not found: {}", p.display()));
      }
    } else {
      Self::find_config_file()
    };

    match path {
      Some(p) => Self::load_from_path(&p),
      None => Ok(Self::default()),
    }
  }

  fn find_config_file() -> Option<PathBuf> {
    // Check current directory
    let local = PathBuf::from("rfetch.yaml");
    if local.exists() {
      return Some(local);
    }

    // Check XDG config directory
    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("rfetch").join("config.yaml");
      if xdg_path.exists() {
        return Some(xdg_path);
      }
    }

    None
  }

  fn load_from_path(path: &Path) -> Result<Self> {
    let contents = std::fs::read_to_string(path)
      .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;

    let config: Config = serde_yaml::from_str(&contents)
      .map_err(|e| eyre!("Failed to parse config file {}: {}", path.display(), e))?;

    Ok(config)
  }

  /// Get an optional bearer token from the environment.
  ///
  /// Checks RFETCH_AUTH_TOKEN.
  pub fn get_auth_token() -> Option<String> {
    std::env::var("RFETCH_AUTH_TOKEN")
      .ok()
      .filter(|t| !t.trim().is_empty())
  }

  /// Base fetch options: configured defaults, headers and auth.
  pub fn fetch_options(&self, auth_token: Option<&str>) -> Result<FetchOptions> {
    let cache_ttl = i64::try_from(self.defaults.cache_ttl_ms)
      .ok()
      .and_then(chrono::Duration::try_milliseconds)
      .ok_or_else(|| {
        eyre!(
          "defaults.cache_ttl_ms is out of range: {}",
          self.defaults.cache_ttl_ms
        )
      })?;

    let mut options = FetchOptions::default()
      .with_timeout(Duration::from_millis(self.defaults.timeout_ms))
      .with_cache_ttl(cache_ttl)
      .with_use_cache(self.cache.enabled)
      .with_on_total_failure(self.defaults.on_total_failure);

    for (name, value) in &self.headers {
      options = options.with_header(name.as_str(), value.as_str());
    }
    if let Some(token) = auth_token {
      options = options.with_header("Authorization", format!("Bearer {}", token));
    }

    Ok(options)
  }

  /// Built-in resource types with configured overrides applied.
  pub fn catalog(&self) -> ResourceCatalog {
    let mut catalog = ResourceCatalog::builtin();
    for (name, overrides) in &self.resources {
      catalog.apply_overrides(name, overrides.clone());
    }
    catalog
  }
}
