//! Error types for the fetch client.
//!
//! `ClientError` is the only thing `fetch_resource` ever hands back to a
//! caller. `FetchError` describes why a single endpoint attempt was skipped and
//! never leaves the client except inside probe reports.

use std::time::Duration;
use thiserror::Error;

/// Errors surfaced to callers of the client.
#[derive(Error, Debug)]
pub enum ClientError {
  #[error("invalid resource key {key:?}: {reason}")]
  InvalidResourceKey { key: String, reason: &'static str },

  #[error("endpoint list is empty")]
  NoEndpoints,

  #[error("invalid endpoint url {url:?}: {reason}")]
  InvalidEndpoint { url: String, reason: String },

  #[error("fetch cancelled")]
  Cancelled,
}

impl ClientError {
  /// True for programmer/configuration mistakes, as opposed to cancellation.
  pub fn is_config(&self) -> bool {
    !matches!(self, ClientError::Cancelled)
  }
}

/// Why one endpoint attempt did not produce records.
#[derive(Error, Debug)]
pub enum FetchError {
  #[error("timed out after {0:?}")]
  Timeout(Duration),

  #[error("HTTP status {0}")]
  Status(u16),

  #[error("transport error: {0}")]
  Transport(#[from] TransportError),

  #[error("malformed response body: {0}")]
  Malformed(#[from] serde_json::Error),

  #[error("response contained no records")]
  Empty,

  #[error("cancelled")]
  Cancelled,
}

/// Failure reported by a `Transport` before any HTTP status was available.
#[derive(Error, Debug)]
pub enum TransportError {
  #[error("connection failed: {0}")]
  Connect(String),

  #[error("{0}")]
  Other(String),
}

impl From<reqwest::Error> for TransportError {
  fn from(err: reqwest::Error) -> Self {
    if err.is_connect() {
      TransportError::Connect(err.to_string())
    } else {
      TransportError::Other(err.to_string())
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_cancelled_is_not_config() {
    assert!(!ClientError::Cancelled.is_config());
    assert!(ClientError::NoEndpoints.is_config());
    assert!(ClientError::InvalidResourceKey {
      key: String::new(),
      reason: "empty",
    }
    .is_config());
  }

  #[test]
  fn test_fetch_error_messages() {
    assert_eq!(FetchError::Status(503).to_string(), "HTTP status 503");
    assert_eq!(
      FetchError::Timeout(Duration::from_millis(5000)).to_string(),
      "timed out after 5s"
    );
  }
}
