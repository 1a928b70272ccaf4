//! Single-call execution with classification-driven retry.

use std::sync::Arc;
use std::time::Instant;

use serde_json::Value;
use tracing::{debug, trace, warn};

use super::credentials::Credentials;
use super::error::ApiError;
use super::http::{ApiRequest, HttpRequest, Transport};
use super::retry::{classify, RetryDecision, RetryPolicy, Sleeper, ThreadSleeper};

/// Issues API calls against a fixed base URL, retrying 429s and transient
/// 503s according to a [`RetryPolicy`].
pub struct RequestExecutor<T: Transport> {
  transport: T,
  base_url: String,
  credentials: Credentials,
  policy: RetryPolicy,
  sleeper: Arc<dyn Sleeper>,
}

impl<T: Transport> RequestExecutor<T> {
  pub fn new(transport: T, base_url: &str, credentials: Credentials) -> Self {
    Self {
      transport,
      base_url: base_url.trim_end_matches('/').to_string(),
      credentials,
      policy: RetryPolicy::default(),
      sleeper: Arc::new(ThreadSleeper),
    }
  }

  pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
    self.policy = policy;
    self
  }

  /// Replace the sleeper used between attempts.
  pub fn with_sleeper(mut self, sleeper: impl Sleeper + 'static) -> Self {
    self.sleeper = Arc::new(sleeper);
    self
  }

  pub fn base_url(&self) -> &str {
    &self.base_url
  }

  pub fn policy(&self) -> &RetryPolicy {
    &self.policy
  }

  pub fn transport(&self) -> &T {
    &self.transport
  }

  /// Run `request` until it succeeds or fails terminally.
  pub fn execute(&self, request: &ApiRequest) -> Result<Value, ApiError> {
    let http = self.build(request);
    let started = Instant::now();
    let mut attempts: u32 = 0;

    loop {
      attempts = attempts.saturating_add(1);
      debug!(method = %request.method, path = %request.path, attempt = attempts, "issuing request");

      let response = self.transport.send(&http)?;
      trace!(
        path = %request.path,
        status = response.status,
        headers = ?response.headers,
        body = %response.body_text(),
        "response"
      );

      match classify(&request.path, &response, &self.policy) {
        RetryDecision::Succeed(value) => return Ok(value),
        RetryDecision::Fail(err) => return Err(err),
        RetryDecision::RetryAfter { delay, reason } => {
          if !self.policy.allows_retry(attempts, started.elapsed(), delay) {
            warn!(path = %request.path, attempts, %reason, "retry budget exhausted");
            return Err(ApiError::RetriesExhausted {
              path: request.path.clone(),
              attempts,
              reason,
            });
          }

          warn!(
            path = %request.path,
            status = response.status,
            %reason,
            delay_secs = delay.as_secs_f64(),
            attempt = attempts,
            "retrying after backoff"
          );
          self.sleeper.sleep(delay);
        }
      }
    }
  }

  fn build(&self, request: &ApiRequest) -> HttpRequest {
    let mut headers = vec![
      (
        "Authorization".to_string(),
        self.credentials.header_value().to_string(),
      ),
      ("Accept".to_string(), "application/json".to_string()),
    ];
    if request.body.is_some() {
      headers.push(("Content-Type".to_string(), "application/json".to_string()));
    }

    HttpRequest {
      method: request.method,
      url: format!("{}{}", self.base_url, request.path),
      headers,
      body: request.body.clone(),
    }
  }
}
