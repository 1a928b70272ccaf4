//! Test doubles shared by unit tests across the crate.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde_json::Value;

use crate::cache::{CacheError, CacheStorage};
use crate::zendesk::{ApiError, HttpRequest, HttpResponse, Sleeper, Transport};

pub const BASE_URL: &str = "https://acme.zendesk.com/api/v2";

/// Build a raw response.
pub fn response(status: u16, body: &str, headers: &[(&str, &str)]) -> HttpResponse {
  HttpResponse {
    status,
    status_text: reason(status).to_string(),
    headers: headers
      .iter()
      .map(|(k, v)| (k.to_string(), v.to_string()))
      .collect(),
    body: body.as_bytes().to_vec(),
  }
}

pub fn json_response(status: u16, body: Value) -> HttpResponse {
  response(status, &body.to_string(), &[("Content-Type", "application/json")])
}

fn reason(status: u16) -> &'static str {
  match status {
    200 => "OK",
    404 => "Not Found",
    422 => "Unprocessable Entity",
    429 => "Too Many Requests",
    500 => "Internal Server Error",
    503 => "Service Unavailable",
    _ => "",
  }
}

#[derive(Default)]
struct MockState {
  responses: VecDeque<HttpResponse>,
  requests: Vec<HttpRequest>,
}

/// Transport that replays scripted responses in order and records requests.
///
/// Clones share state, so a test can keep a handle after moving one into
/// the executor.
#[derive(Clone, Default)]
pub struct MockTransport {
  state: Arc<Mutex<MockState>>,
}

impl MockTransport {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn push(&self, response: HttpResponse) {
    self.state.lock().unwrap().responses.push_back(response);
  }

  pub fn requests(&self) -> Vec<HttpRequest> {
    self.state.lock().unwrap().requests.clone()
  }

  pub fn call_count(&self) -> usize {
    self.state.lock().unwrap().requests.len()
  }

  /// URLs requested so far, relative to `BASE_URL` when they start with it.
  pub fn paths(&self) -> Vec<String> {
    self
      .requests()
      .into_iter()
      .map(|r| {
        r.url
          .strip_prefix(BASE_URL)
          .map(String::from)
          .unwrap_or(r.url)
      })
      .collect()
  }
}

impl Transport for MockTransport {
  fn send(&self, request: &HttpRequest) -> Result<HttpResponse, ApiError> {
    let mut state = self.state.lock().unwrap();
    state.requests.push(request.clone());
    state
      .responses
      .pop_front()
      .ok_or_else(|| ApiError::Transport(format!("no scripted response for {}", request.url)))
  }
}

/// Sleeper that records requested delays instead of blocking.
#[derive(Clone, Default)]
pub struct RecordingSleeper {
  slept: Arc<Mutex<Vec<Duration>>>,
}

impl RecordingSleeper {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn delays(&self) -> Vec<Duration> {
    self.slept.lock().unwrap().clone()
  }
}

impl Sleeper for RecordingSleeper {
  fn sleep(&self, duration: Duration) {
    self.slept.lock().unwrap().push(duration);
  }
}

/// In-memory storage that counts reads and writes.
#[derive(Default)]
pub struct CountingStorage {
  entries: Mutex<HashMap<String, Value>>,
  reads: AtomicUsize,
  writes: AtomicUsize,
}

impl CountingStorage {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn reads(&self) -> usize {
    self.reads.load(Ordering::SeqCst)
  }

  pub fn writes(&self) -> usize {
    self.writes.load(Ordering::SeqCst)
  }

  pub fn peek(&self, key: &str) -> Option<Value> {
    self.entries.lock().unwrap().get(key).cloned()
  }
}

impl CacheStorage for CountingStorage {
  fn get(&self, key: &str) -> Result<Option<Value>, CacheError> {
    self.reads.fetch_add(1, Ordering::SeqCst);
    Ok(self.entries.lock().unwrap().get(key).cloned())
  }

  fn set(&self, key: &str, value: &Value) -> Result<(), CacheError> {
    self.writes.fetch_add(1, Ordering::SeqCst);
    self
      .entries
      .lock()
      .unwrap()
      .insert(key.to_string(), value.clone());
    Ok(())
  }
}

/// Storage whose every operation fails.
pub struct BrokenStorage;

impl CacheStorage for BrokenStorage {
  fn get(&self, _key: &str) -> Result<Option<Value>, CacheError> {
    Err(CacheError::Backend("disk on fire".to_string()))
  }

  fn set(&self, _key: &str, _value: &Value) -> Result<(), CacheError> {
    Err(CacheError::Backend("disk on fire".to_string()))
  }
}
