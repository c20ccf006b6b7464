//! HTTP transport seam.
//!
//! The client only needs "GET this URL with these headers, give me status and
//! body". Timeouts and cancellation are enforced by the client around the
//! returned future, so transports don't have to.

use futures::future::BoxFuture;
use futures::FutureExt;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT};
use url::Url;

use crate::error::TransportError;

/// Raw HTTP response.
#[derive(Debug, Clone)]
pub struct TransportResponse {
  pub status: u16,
  pub body: Vec<u8>,
}

impl TransportResponse {
  pub fn is_success(&self) -> bool {
    (200..300).contains(&self.status)
  }
}

pub trait Transport: Send + Sync {
  fn get<'a>(
    &'a self,
    url: &'a Url,
    headers: &'a [(String, String)],
  ) -> BoxFuture<'a, Result<TransportResponse, TransportError>>;
}

impl<T: Transport + ?Sized> Transport for std::sync::Arc<T> {
  fn get<'a>(
    &'a self,
    url: &'a Url,
    headers: &'a [(String, String)],
  ) -> BoxFuture<'a, Result<TransportResponse, TransportError>> {
    (**self).get(url, headers)
  }
}

/// `reqwest`-backed transport.
#[derive(Clone, Default)]
pub struct ReqwestTransport {
  client: reqwest::Client,
}

impl ReqwestTransport {
  pub fn new() -> Result<Self, TransportError> {
    let client = reqwest::Client::builder()
      .user_agent(concat!("rfetch/", env!("CARGO_PKG_VERSION")))
      .build()?;
    Ok(Self { client })
  }

  pub fn with_client(client: reqwest::Client) -> Self {
    Self { client }
  }
}

fn header_map(headers: &[(String, String)]) -> Result<HeaderMap, TransportError> {
  let mut map = HeaderMap::new();
  map.insert(ACCEPT, HeaderValue::from_static("application/json"));

  for (name, value) in headers {
    let name = HeaderName::from_bytes(name.as_bytes())
      .map_err(|e| TransportError::Other(format!("invalid header name {}: {}", name, e)))?;
    let value = HeaderValue::from_str(value)
      .map_err(|e| TransportError::Other(format!("invalid header value for {}: {}", name, e)))?;
    map.insert(name, value);
  }

  Ok(map)
}

impl Transport for ReqwestTransport {
  fn get<'a>(
    &'a self,
    url: &'a Url,
    headers: &'a [(String, String)],
  ) -> BoxFuture<'a, Result<TransportResponse, TransportError>> {
    async move {
      let response = self
        .client
        .get(url.clone())
        .headers(header_map(headers)?)
        .send()
        .await?;

      let status = response.status().as_u16();
      let body = response.bytes().await?.to_vec();

      Ok(TransportResponse { status, body })
    }
    .boxed()
  }
}

#[cfg(test)]
pub(crate) mod mock {
  //! Scripted transport for client tests.

  use super::*;
  use std::collections::HashMap;
  use std::sync::Mutex;
  use std::time::Duration;

  #[derive(Debug, Clone)]
  pub enum Reply {
    Json(u16, serde_json::Value),
    Raw(u16, &'static str),
    Refused,
    /// Respond after a delay (driven by tokio's clock)
    Delayed(Duration, Box<Reply>),
    Hang,
  }

  /// Answers by URL host. Unscripted hosts are refused.
  #[derive(Default)]
  pub struct MockTransport {
    replies: Mutex<HashMap<String, Reply>>,
    calls: Mutex<Vec<String>>,
    headers: Mutex<Vec<Vec<(String, String)>>>,
  }

  impl MockTransport {
    pub fn new() -> Self {
      Self::default()
    }

    pub fn reply(self, host: &str, reply: Reply) -> Self {
      self.set(host, reply);
      self
    }

    pub fn set(&self, host: &str, reply: Reply) {
      self.replies.lock().unwrap().insert(host.to_string(), reply);
    }

    /// Full URLs requested so far, in order.
    pub fn calls(&self) -> Vec<String> {
      self.calls.lock().unwrap().clone()
    }

    /// Headers sent with each request, in request order.
    pub fn headers(&self) -> Vec<Vec<(String, String)>> {
      self.headers.lock().unwrap().clone()
    }

    fn resolve(reply: Reply) -> BoxFuture<'static, Result<TransportResponse, TransportError>> {
      async move {
        match reply {
          Reply::Json(status, body) => Ok(TransportResponse {
            status,
            body: body.to_string().into_bytes(),
          }),
          Reply::Raw(status, body) => Ok(TransportResponse {
            status,
            body: body.as_bytes().to_vec(),
          }),
          Reply::Refused => Err(TransportError::Connect("connection refused".to_string())),
          Reply::Delayed(delay, inner) => {
            tokio::time::sleep(delay).await;
            Self::resolve(*inner).await
          }
          Reply::Hang => futures::future::pending().await,
        }
      }
      .boxed()
    }
  }

  impl Transport for MockTransport {
    fn get<'a>(
      &'a self,
      url: &'a Url,
      headers: &'a [(String, String)],
    ) -> BoxFuture<'a, Result<TransportResponse, TransportError>> {
      self.calls.lock().unwrap().push(url.to_string());
      self.headers.lock().unwrap().push(headers.to_vec());
      let reply = url
        .host_str()
        .and_then(|host| self.replies.lock().unwrap().get(host).cloned())
        .unwrap_or(Reply::Refused);
      Self::resolve(reply)
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use wiremock::matchers::{header, method, path, query_param};
  use wiremock::{Mock, MockServer, ResponseTemplate};

  #[tokio::test]
  async fn test_reqwest_transport_sends_headers_and_reads_body() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
      .and(path("/api/parties"))
      .and(query_param("conference", "gamescom2025"))
      .and(header("accept", "application/json"))
      .and(header("x-client", "rfetch-test"))
      .respond_with(
        ResponseTemplate::new(200).set_body_json(serde_json::json!({"parties": [{"id": "1"}]})),
      )
      .expect(1)
      .mount(&server)
      .await;

    let transport = ReqwestTransport::new().unwrap();
    let url = Url::parse(&format!(
      "{}/api/parties?conference=gamescom2025",
      server.uri()
    ))
    .unwrap();
    let headers = vec![("X-Client".to_string(), "rfetch-test".to_string())];

    let response = transport.get(&url, &headers).await.unwrap();
    assert_eq!(response.status, 200);
    assert!(response.is_success());
    let body: serde_json::Value = serde_json::from_slice(&response.body).unwrap();
    assert_eq!(body["parties"][0]["id"], "1");
  }

  #[tokio::test]
  async fn test_reqwest_transport_reports_error_status_without_failing() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
      .respond_with(ResponseTemplate::new(503).set_body_string("unavailable"))
      .mount(&server)
      .await;

    let transport = ReqwestTransport::new().unwrap();
    let url = Url::parse(&format!("{}/api/parties", server.uri())).unwrap();

    let response = transport.get(&url, &[]).await.unwrap();
    assert_eq!(response.status, 503);
    assert!(!response.is_success());
  }

  #[tokio::test]
  async fn test_invalid_header_is_a_transport_error() {
    let transport = ReqwestTransport::new().unwrap();
    let url = Url::parse("http://127.0.0.1:9/api").unwrap();
    let headers = vec![("bad header".to_string(), "x".to_string())];

    let err = transport.get(&url, &headers).await.unwrap_err();
    assert!(matches!(err, TransportError::Other(_)));
  }
}
