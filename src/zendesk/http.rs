//! HTTP request/response types and the blocking transport seam.
//!
//! `Transport` performs exactly one round-trip and returns every status as
//! data. Interpreting statuses (success, retry, failure) belongs to the
//! executor, so tests can script responses without a server.

use std::fmt;
use std::io::Write;
use std::time::Duration;

use serde_json::Value;

use super::error::ApiError;

const USER_AGENT: &str = concat!("zdesk/", env!("CARGO_PKG_VERSION"));

/// HTTP verb. The API only needs reads and updates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
  Get,
  Put,
}

impl fmt::Display for Method {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::Get => write!(f, "GET"),
      Self::Put => write!(f, "PUT"),
    }
  }
}

/// One logical API call, relative to the client's base URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiRequest {
  pub method: Method,
  /// Path including any query string, e.g. `/tickets/1.json`
  pub path: String,
  pub body: Option<Vec<u8>>,
}

impl ApiRequest {
  pub fn get(path: impl Into<String>) -> Self {
    Self {
      method: Method::Get,
      path: path.into(),
      body: None,
    }
  }

  pub fn put_json(path: impl Into<String>, body: &Value) -> Result<Self, ApiError> {
    let body = serde_json::to_vec(body).map_err(ApiError::Encode)?;
    Ok(Self {
      method: Method::Put,
      path: path.into(),
      body: Some(body),
    })
  }
}

/// A fully resolved request handed to the transport.
#[derive(Debug, Clone)]
pub struct HttpRequest {
  pub method: Method,
  pub url: String,
  pub headers: Vec<(String, String)>,
  pub body: Option<Vec<u8>>,
}

/// Raw response as returned by the transport.
#[derive(Debug, Clone)]
pub struct HttpResponse {
  pub status: u16,
  /// Canonical reason phrase, e.g. "Too Many Requests"
  pub status_text: String,
  pub headers: Vec<(String, String)>,
  pub body: Vec<u8>,
}

impl HttpResponse {
  pub fn is_success(&self) -> bool {
    (200..300).contains(&self.status)
  }

  /// Case-insensitive header lookup.
  pub fn header(&self, name: &str) -> Option<&str> {
    self
      .headers
      .iter()
      .find(|(k, _)| k.eq_ignore_ascii_case(name))
      .map(|(_, v)| v.as_str())
  }

  pub fn body_text(&self) -> String {
    String::from_utf8_lossy(&self.body).into_owned()
  }
}

/// Performs one blocking HTTP call.
pub trait Transport {
  fn send(&self, request: &HttpRequest) -> Result<HttpResponse, ApiError>;

  /// GET `url` and copy the body into `sink`.
  ///
  /// Fails with `ApiError::Status` on a non-success status, in which case
  /// nothing is written. The default buffers the whole body.
  fn stream_to(&self, url: &str, sink: &mut dyn Write) -> Result<u64, ApiError> {
    let request = HttpRequest {
      method: Method::Get,
      url: url.to_string(),
      headers: Vec::new(),
      body: None,
    };
    let response = self.send(&request)?;
    if !response.is_success() {
      return Err(status_error(url, &response));
    }
    sink
      .write_all(&response.body)
      .map_err(|e| ApiError::Transport(format!("failed to write body of {}: {}", url, e)))?;
    Ok(response.body.len() as u64)
  }
}

pub(crate) fn status_error(path: &str, response: &HttpResponse) -> ApiError {
  ApiError::Status {
    path: path.to_string(),
    status: response.status,
    message: response.status_text.clone(),
    body: response.body_text(),
  }
}

/// Production transport backed by reqwest's blocking client.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
  client: reqwest::blocking::Client,
}

impl ReqwestTransport {
  pub fn new(timeout: Duration) -> Result<Self, ApiError> {
    let client = reqwest::blocking::Client::builder()
      .timeout(timeout)
      .user_agent(USER_AGENT)
      .build()
      .map_err(|e| ApiError::Transport(format!("failed to build HTTP client: {}", e)))?;

    Ok(Self { client })
  }

  fn dispatch(&self, request: &HttpRequest) -> Result<reqwest::blocking::Response, ApiError> {
    let mut builder = match request.method {
      Method::Get => self.client.get(&request.url),
      Method::Put => self.client.put(&request.url),
    };
    for (name, value) in &request.headers {
      builder = builder.header(name.as_str(), value.as_str());
    }
    if let Some(body) = &request.body {
      builder = builder.body(body.clone());
    }

    builder
      .send()
      .map_err(|e| ApiError::Transport(format!("{} {}: {}", request.method, request.url, e)))
  }
}

impl Transport for ReqwestTransport {
  fn send(&self, request: &HttpRequest) -> Result<HttpResponse, ApiError> {
    let response = self.dispatch(request)?;

    let status = response.status();
    let headers = response
      .headers()
      .iter()
      .filter_map(|(name, value)| {
        value
          .to_str()
          .ok()
          .map(|v| (name.as_str().to_string(), v.to_string()))
      })
      .collect();
    let body = response
      .bytes()
      .map_err(|e| ApiError::Transport(format!("failed to read body of {}: {}", request.url, e)))?
      .to_vec();

    Ok(HttpResponse {
      status: status.as_u16(),
      status_text: status.canonical_reason().unwrap_or_default().to_string(),
      headers,
      body,
    })
  }

  fn stream_to(&self, url: &str, sink: &mut dyn Write) -> Result<u64, ApiError> {
    let request = HttpRequest {
      method: Method::Get,
      url: url.to_string(),
      headers: Vec::new(),
      body: None,
    };
    let mut response = self.dispatch(&request)?;

    let status = response.status();
    if !status.is_success() {
      let body = response.text().unwrap_or_default();
      return Err(ApiError::Status {
        path: url.to_string(),
        status: status.as_u16(),
        message: status.canonical_reason().unwrap_or_default().to_string(),
        body,
      });
    }

    response
      .copy_to(sink)
      .map_err(|e| ApiError::Transport(format!("failed to stream {}: {}", url, e)))
  }
}
