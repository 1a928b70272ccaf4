//! Error types for Zendesk API calls.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Why a retryable response was retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryReason {
  /// HTTP 429
  RateLimited,
  /// HTTP 503 carrying the transient load-shedding description
  Overloaded,
}

impl fmt::Display for RetryReason {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::RateLimited => write!(f, "rate limited"),
      Self::Overloaded => write!(f, "service overloaded"),
    }
  }
}

/// Terminal failure of a logical API operation.
///
/// Transient 429/503 responses never show up here unless the retry policy
/// is bounded, in which case they surface as `RetriesExhausted`.
#[derive(Debug, Error)]
pub enum ApiError {
  /// Caller supplied malformed or missing parameters; no request was sent.
  #[error("invalid request: {0}")]
  Validation(String),

  /// Non-success status that is not retried.
  #[error("HTTP {status} {message} for {path}: {body}")]
  Status {
    path: String,
    status: u16,
    message: String,
    body: String,
  },

  /// A success response whose body is not valid UTF-8 JSON.
  #[error("failed to decode response from {path}: {source}")]
  Decode {
    path: String,
    #[source]
    source: serde_json::Error,
  },

  /// Valid JSON that does not have the shape the endpoint promises.
  #[error("malformed response from {path}: {reason}")]
  MalformedResponse { path: String, reason: String },

  /// A mutation echoed a different resource than the one targeted.
  #[error("{resource} update returned id {actual}, expected {expected}")]
  IdMismatch {
    resource: &'static str,
    expected: u64,
    actual: String,
  },

  /// The retry policy's attempt or deadline bound was hit.
  #[error("gave up on {path} after {attempts} attempts: {reason}")]
  RetriesExhausted {
    path: String,
    attempts: u32,
    reason: RetryReason,
  },

  #[error("failed to encode request body: {0}")]
  Encode(#[source] serde_json::Error),

  #[error("transport error: {0}")]
  Transport(String),

  #[error("I/O error on {}: {source}", path.display())]
  Io {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },
}

impl ApiError {
  /// HTTP status code, if this error came from a response.
  pub fn status(&self) -> Option<u16> {
    match self {
      Self::Status { status, .. } => Some(*status),
      _ => None,
    }
  }

  pub(crate) fn malformed(path: &str, reason: impl Into<String>) -> Self {
    Self::MalformedResponse {
      path: path.to_string(),
      reason: reason.into(),
    }
  }

  pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
    Self::Io {
      path: path.into(),
      source,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_status_error_carries_diagnostics() {
    let err = ApiError::Status {
      path: "/tickets/1.json".to_string(),
      status: 422,
      message: "Unprocessable Entity".to_string(),
      body: r#"{"error":"RecordInvalid"}"#.to_string(),
    };

    assert_eq!(err.status(), Some(422));
    let rendered = err.to_string();
    assert!(rendered.contains("422"));
    assert!(rendered.contains("Unprocessable Entity"));
    assert!(rendered.contains("RecordInvalid"));
  }

  #[test]
  fn test_retries_exhausted_mentions_reason() {
    let err = ApiError::RetriesExhausted {
      path: "/search.json".to_string(),
      attempts: 3,
      reason: RetryReason::RateLimited,
    };
    assert_eq!(err.status(), None);
    assert_eq!(
      err.to_string(),
      "gave up on /search.json after 3 attempts: rate limited"
    );
  }
}
