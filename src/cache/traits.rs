//! Core traits and types for the caching system.

use serde_json::Value;
use thiserror::Error;

/// Failure talking to a cache backend.
///
/// `CacheLayer` never surfaces these: a failed read is a miss and a failed
/// write is logged and dropped.
#[derive(Debug, Error)]
pub enum CacheError {
  #[error("cache backend error: {0}")]
  Backend(String),

  #[error("cache serialization error: {0}")]
  Serialization(#[from] serde_json::Error),

  #[error("cache lock poisoned")]
  LockPoisoned,
}

impl From<rusqlite::Error> for CacheError {
  fn from(e: rusqlite::Error) -> Self {
    Self::Backend(e.to_string())
  }
}

/// Key/value contract a cache backend must satisfy.
///
/// Expiry and eviction are the backend's business; the layer above only
/// relies on "a value just set under a key is returned by the next get of
/// that key, unless evicted in between".
pub trait CacheStorage: Send + Sync {
  fn get(&self, key: &str) -> Result<Option<Value>, CacheError>;

  fn set(&self, key: &str, value: &Value) -> Result<(), CacheError>;
}

impl<S: CacheStorage + ?Sized> CacheStorage for Box<S> {
  fn get(&self, key: &str) -> Result<Option<Value>, CacheError> {
    (**self).get(key)
  }

  fn set(&self, key: &str, value: &Value) -> Result<(), CacheError> {
    (**self).set(key, value)
  }
}

/// Result from a cache operation, including where the data came from.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheResult<T> {
  pub data: T,
  pub source: CacheSource,
}

impl<T> CacheResult<T> {
  pub fn from_network(data: T) -> Self {
    Self {
      data,
      source: CacheSource::Network,
    }
  }

  pub fn from_cache(data: T) -> Self {
    Self {
      data,
      source: CacheSource::Cache,
    }
  }

  pub fn map<U>(self, f: impl FnOnce(T) -> U) -> CacheResult<U> {
    CacheResult {
      data: f(self.data),
      source: self.source,
    }
  }
}

/// Indicates where data came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheSource {
  /// Computed by a network call
  Network,
  /// Served from the cache backend
  Cache,
}
