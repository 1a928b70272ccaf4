//! Response classification and backoff policy.

use std::time::Duration;

use serde::Deserialize;
use serde_json::Value;

use super::error::{ApiError, RetryReason};
use super::http::{status_error, HttpResponse};

/// Description the API uses on 503s caused by load shedding.
pub const TRANSIENT_OVERLOAD_PHRASE: &str = "Please try again in a moment";

/// Backoff policy for retryable responses.
///
/// Retries are unbounded by default: a long-lived worker is expected to wait
/// out rate limiting. `max_attempts` and `deadline` bound the loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
  /// Delay after a 429 without a usable `Retry-After` header
  pub rate_limit_delay: Duration,
  /// Delay after a transient 503
  pub overload_delay: Duration,
  /// Total attempts allowed, including the first
  pub max_attempts: Option<u32>,
  /// Wall-clock budget for one logical call, including sleeps
  pub deadline: Option<Duration>,
}

impl Default for RetryPolicy {
  fn default() -> Self {
    Self {
      rate_limit_delay: Duration::from_secs(10),
      overload_delay: Duration::from_secs(1),
      max_attempts: None,
      deadline: None,
    }
  }
}

impl RetryPolicy {
  pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
    self.max_attempts = Some(max_attempts);
    self
  }

  pub fn with_deadline(mut self, deadline: Duration) -> Self {
    self.deadline = Some(deadline);
    self
  }

  /// Delay for a 429, honoring a `Retry-After` given in whole seconds.
  pub fn rate_limit_delay_for(&self, retry_after: Option<&str>) -> Duration {
    retry_after
      .and_then(|v| v.trim().parse::<u64>().ok())
      .map(Duration::from_secs)
      .unwrap_or(self.rate_limit_delay)
  }

  /// Whether another attempt may follow `attempts` completed attempts after
  /// waiting `delay`, given `elapsed` time already spent.
  pub fn allows_retry(&self, attempts: u32, elapsed: Duration, delay: Duration) -> bool {
    if let Some(max) = self.max_attempts {
      if attempts >= max {
        return false;
      }
    }
    if let Some(deadline) = self.deadline {
      if elapsed.checked_add(delay).map_or(true, |t| t > deadline) {
        return false;
      }
    }
    true
  }
}

/// Outcome of classifying one attempt.
#[derive(Debug)]
pub enum RetryDecision {
  Succeed(Value),
  RetryAfter {
    delay: Duration,
    reason: RetryReason,
  },
  Fail(ApiError),
}

#[derive(Deserialize)]
struct OverloadBody {
  #[serde(default)]
  description: Option<String>,
}

/// Classify a response for the request at `path`.
pub fn classify(path: &str, response: &HttpResponse, policy: &RetryPolicy) -> RetryDecision {
  match response.status {
    200..=299 => match serde_json::from_slice::<Value>(&response.body) {
      Ok(value) => RetryDecision::Succeed(value),
      Err(source) => RetryDecision::Fail(ApiError::Decode {
        path: path.to_string(),
        source,
      }),
    },
    429 => RetryDecision::RetryAfter {
      delay: policy.rate_limit_delay_for(response.header("Retry-After")),
      reason: RetryReason::RateLimited,
    },
    503 if is_transient_overload(&response.body) => RetryDecision::RetryAfter {
      delay: policy.overload_delay,
      reason: RetryReason::Overloaded,
    },
    _ => RetryDecision::Fail(status_error(path, response)),
  }
}

/// 503 is also used for genuine outages; only the load-shedding variant is
/// identified by its description.
fn is_transient_overload(body: &[u8]) -> bool {
  serde_json::from_slice::<OverloadBody>(body)
    .ok()
    .and_then(|b| b.description)
    .is_some_and(|d| d.contains(TRANSIENT_OVERLOAD_PHRASE))
}

/// Blocks the calling thread between attempts.
pub trait Sleeper: Send + Sync {
  fn sleep(&self, duration: Duration);
}

/// Sleeper backed by `std::thread::sleep`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
  fn sleep(&self, duration: Duration) {
    std::thread::sleep(duration);
  }
}
