//! Response shape normalization.
//!
//! Backends wrap record lists inconsistently (`{"data": [...]}`,
//! `{"parties": [...]}` or a bare array). A `Normalizer` runs an ordered list of
//! extraction strategies and takes the first one that matches.

use serde_json::Value;

use crate::Record;

/// One way of pulling a record list out of a response body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Extract {
  /// `body[key]`, if it is an array.
  Field(String),
  /// The body itself, if it is an array.
  IdentityIfArray,
}

impl Extract {
  fn apply<'a>(&self, body: &'a Value) -> Option<&'a Vec<Value>> {
    match self {
      Extract::Field(key) => body.get(key)?.as_array(),
      Extract::IdentityIfArray => body.as_array(),
    }
  }
}

#[derive(Debug, Clone)]
pub struct Normalizer {
  strategies: Vec<Extract>,
}

impl Normalizer {
  pub fn new(strategies: Vec<Extract>) -> Self {
    Self { strategies }
  }

  pub fn strategies(&self) -> &[Extract] {
    &self.strategies
  }

  /// Flatten `body` into records. Returns an empty list when nothing matches.
  pub fn normalize(&self, body: &Value) -> Vec<Record> {
    self
      .strategies
      .iter()
      .find_map(|strategy| strategy.apply(body))
      .cloned()
      .unwrap_or_default()
  }
}
