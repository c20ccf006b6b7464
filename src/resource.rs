//! Resource keys, resource type descriptors and request URL construction.

use std::collections::HashMap;
use std::fmt;

use serde::Deserialize;
use url::{form_urlencoded, Url};

use crate::error::ClientError;
use crate::fallback;
use crate::normalize::{Extract, Normalizer};
use crate::Record;

/// Logical identifier for a cacheable request, e.g. `parties:gamescom2025`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResourceKey {
  kind: String,
  scope: Option<String>,
}

impl ResourceKey {
  /// Parse `<type>` or `<type>:<scope>`.
  pub fn parse(raw: &str) -> Result<Self, ClientError> {
    let invalid = |reason| ClientError::InvalidResourceKey {
      key: raw.to_string(),
      reason,
    };

    if raw.trim().is_empty() {
      return Err(invalid("resource key is empty"));
    }

    let (kind, scope) = match raw.split_once(':') {
      Some((kind, scope)) => (kind, Some(scope)),
      None => (raw, None),
    };

    if kind.is_empty() {
      return Err(invalid("resource type is empty"));
    }
    if !kind
      .chars()
      .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
      return Err(invalid("resource type may only contain [A-Za-z0-9_-]"));
    }

    if let Some(scope) = scope {
      if scope.is_empty() {
        return Err(invalid("scope after ':' is empty"));
      }
      if scope.chars().any(char::is_whitespace) {
        return Err(invalid("scope contains whitespace"));
      }
    }

    Ok(Self {
      kind: kind.to_string(),
      scope: scope.map(String::from),
    })
  }

  /// Resource type name (the part before the colon).
  pub fn kind(&self) -> &str {
    &self.kind
  }

  pub fn scope(&self) -> Option<&str> {
    self.scope.as_deref()
  }

  /// Cache key for this resource plus any extra query pairs.
  ///
  /// Pairs are percent-encoded and kept in caller order, so distinct request
  /// URLs never share an entry. Which endpoint served the data is not part of
  /// the key.
  pub fn cache_key(&self, query: &[(String, String)]) -> String {
    if query.is_empty() {
      return self.to_string();
    }

    let encoded = form_urlencoded::Serializer::new(String::new())
      .extend_pairs(query.iter().map(|(k, v)| (k.as_str(), v.as_str())))
      .finish();
    format!("{}?{}", self, encoded)
  }
}

impl fmt::Display for ResourceKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match &self.scope {
      Some(scope) => write!(f, "{}:{}", self.kind, scope),
      None => f.write_str(&self.kind),
    }
  }
}

/// How a resource type is addressed and unwrapped.
#[derive(Debug, Clone)]
pub struct ResourceType {
  pub name: String,
  /// Path appended to each endpoint base URL, `/`-separated.
  pub path: String,
  /// Query parameter carrying the key's scope.
  pub scope_param: String,
  /// Wrapper keys tried after `data`, in order.
  pub wrapper_keys: Vec<String>,
  /// Records served when every endpoint and the cache come up empty.
  pub fallback: Vec<Record>,
}

impl ResourceType {
  /// Descriptor with the default conventions for an unconfigured type.
  pub fn named(name: &str) -> Self {
    Self {
      name: name.to_string(),
      path: name.to_string(),
      scope_param: "conference".to_string(),
      wrapper_keys: vec![name.to_string()],
      fallback: Vec::new(),
    }
  }

  pub fn with_fallback(mut self, fallback: Vec<Record>) -> Self {
    self.fallback = fallback;
    self
  }

  pub fn normalizer(&self) -> Normalizer {
    let mut strategies = vec![Extract::Field("data".to_string())];
    strategies.extend(
      self
        .wrapper_keys
        .iter()
        .filter(|k| k.as_str() != "data")
        .map(|k| Extract::Field(k.clone())),
    );
    strategies.push(Extract::IdentityIfArray);
    Normalizer::new(strategies)
  }

  /// Build the full request URL for `key` against one endpoint base.
  pub fn request_url(&self, base: &Url, key: &ResourceKey, query: &[(String, String)]) -> Url {
    let mut url = base.clone();

    // Endpoints are validated as base URLs before we get here.
    if let Ok(mut segments) = url.path_segments_mut() {
      segments
        .pop_if_empty()
        .extend(self.path.split('/').filter(|s| !s.is_empty()));
    }

    if key.scope().is_some() || !query.is_empty() {
      let mut pairs = url.query_pairs_mut();
      if let Some(scope) = key.scope() {
        pairs.append_pair(&self.scope_param, scope);
      }
      for (k, v) in query {
        pairs.append_pair(k, v);
      }
    }

    url
  }
}

/// Configuration overrides for a resource type, as read from the config file.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ResourceOverrides {
  pub path: Option<String>,
  pub scope_param: Option<String>,
  pub wrapper_keys: Option<Vec<String>>,
  pub fallback: Option<Vec<Record>>,
}

/// Registry of known resource types.
#[derive(Debug, Clone)]
pub struct ResourceCatalog {
  types: HashMap<String, ResourceType>,
}

impl ResourceCatalog {
  /// An empty catalog; every type resolves to default conventions.
  pub fn empty() -> Self {
    Self {
      types: HashMap::new(),
    }
  }

  /// Catalog with the built-in types and their sample fallback data.
  pub fn builtin() -> Self {
    let mut catalog = Self::empty();
    catalog.insert(ResourceType::named("parties").with_fallback(fallback::sample_parties()));
    catalog
  }

  pub fn insert(&mut self, resource: ResourceType) {
    self.types.insert(resource.name.clone(), resource);
  }

  /// Layer config overrides on top of whatever is registered for `name`.
  pub fn apply_overrides(&mut self, name: &str, overrides: ResourceOverrides) {
    let mut resource = self.resolve(name);
    if let Some(path) = overrides.path {
      resource.path = path;
    }
    if let Some(param) = overrides.scope_param {
      resource.scope_param = param;
    }
    if let Some(keys) = overrides.wrapper_keys {
      resource.wrapper_keys = keys;
    }
    if let Some(fallback) = overrides.fallback {
      resource.fallback = fallback;
    }
    self.insert(resource);
  }

  /// Look up a type, falling back to default conventions for unknown names.
  pub fn resolve(&self, name: &str) -> ResourceType {
    self
      .types
      .get(name)
      .cloned()
      .unwrap_or_else(|| ResourceType::named(name))
  }
}

impl Default for ResourceCatalog {
  fn default() -> Self {
    Self::builtin()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_parse_scoped_key() {
    let key = ResourceKey::parse("parties:gamescom2025").unwrap();
    assert_eq!(key.kind(), "parties");
    assert_eq!(key.scope(), Some("gamescom2025"));
    assert_eq!(key.to_string(), "parties:gamescom2025");
  }

  #[test]
  fn test_parse_unscoped_key() {
    let key = ResourceKey::parse("events").unwrap();
    assert_eq!(key.kind(), "events");
    assert_eq!(key.scope(), None);
  }

  #[test]
  fn test_parse_rejects_malformed_keys() {
    for raw in ["", "   ", ":gamescom", "parties:", "par ties", "parties:game com", "a/b"] {
      let err = ResourceKey::parse(raw).unwrap_err();
      assert!(err.is_config(), "{raw:?} should be a config error");
    }
  }

  #[test]
  fn test_cache_key_encodes_extra_query_in_order() {
    let key = ResourceKey::parse("parties:gamescom2025").unwrap();
    assert_eq!(key.cache_key(&[]), "parties:gamescom2025");

    let query = vec![
      ("day".to_string(), "2".to_string()),
      ("city".to_string(), "koeln".to_string()),
    ];
    assert_eq!(key.cache_key(&query), "parties:gamescom2025?day=2&city=koeln");
  }

  #[test]
  fn test_cache_key_escapes_separators() {
    let key = ResourceKey::parse("parties:x").unwrap();
    let split = vec![
      ("b".to_string(), "c".to_string()),
      ("q".to_string(), "a".to_string()),
    ];
    let joined = vec![("b".to_string(), "c&q=a".to_string())];

    assert_eq!(key.cache_key(&split), "parties:x?b=c&q=a");
    assert_eq!(key.cache_key(&joined), "parties:x?b=c%26q%3Da");
  }

  #[test]
  fn test_cache_key_keeps_repeated_keys_distinct() {
    let key = ResourceKey::parse("parties:x").unwrap();
    let first = vec![
      ("day".to_string(), "2".to_string()),
      ("day".to_string(), "3".to_string()),
    ];
    let second = vec![
      ("day".to_string(), "3".to_string()),
      ("day".to_string(), "2".to_string()),
    ];
    assert_ne!(key.cache_key(&first), key.cache_key(&second));
  }

  #[test]
  fn test_request_url_appends_path_and_scope() {
    let base = Url::parse("https://a.example/api").unwrap();
    let key = ResourceKey::parse("parties:gamescom2025").unwrap();
    let url = ResourceType::named("parties").request_url(&base, &key, &[]);
    assert_eq!(
      url.as_str(),
      "https://a.example/api/parties?conference=gamescom2025"
    );
  }

  #[test]
  fn test_request_url_handles_trailing_slash_and_extra_query() {
    let base = Url::parse("http://localhost:5001/api/").unwrap();
    let key = ResourceKey::parse("invites").unwrap();
    let mut resource = ResourceType::named("invites");
    resource.path = "invites/mine".to_string();

    let query = vec![("limit".to_string(), "10".to_string())];
    let url = resource.request_url(&base, &key, &query);
    assert_eq!(url.as_str(), "http://localhost:5001/api/invites/mine?limit=10");
  }

  #[test]
  fn test_catalog_resolves_unknown_types_with_defaults() {
    let catalog = ResourceCatalog::builtin();
    let events = catalog.resolve("events");
    assert_eq!(events.path, "events");
    assert_eq!(events.wrapper_keys, vec!["events".to_string()]);
    assert!(events.fallback.is_empty());

    assert!(!catalog.resolve("parties").fallback.is_empty());
  }

  #[test]
  fn test_overrides_layer_on_builtin() {
    let mut catalog = ResourceCatalog::builtin();
    catalog.apply_overrides(
      "parties",
      ResourceOverrides {
        path: Some("v2/parties".to_string()),
        ..Default::default()
      },
    );

    let parties = catalog.resolve("parties");
    assert_eq!(parties.path, "v2/parties");
    assert!(!parties.fallback.is_empty());
  }
}
