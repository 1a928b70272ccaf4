//! Cache-aside layer that sits between resource accessors and the network.

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, warn};

use super::traits::{CacheResult, CacheStorage};
use crate::zendesk::ApiError;

/// Wraps fetches in cache-aside and writes mutation results through.
///
/// Key naming belongs to the caller. Cache population is best-effort:
/// backend failures degrade to cache misses and never fail an operation.
pub struct CacheLayer<S: CacheStorage> {
  storage: Arc<S>,
}

impl<S: CacheStorage> CacheLayer<S> {
  /// Create a new cache layer with the given storage backend.
  pub fn new(storage: S) -> Self {
    Self {
      storage: Arc::new(storage),
    }
  }

  pub fn storage(&self) -> &S {
    &self.storage
  }

  /// Return the cached value for `key`, or run `compute` and cache its
  /// result.
  ///
  /// With `no_cache` the backend is neither read nor written.
  pub fn fetch_or_compute<F>(
    &self,
    key: &str,
    no_cache: bool,
    compute: F,
  ) -> Result<CacheResult<Value>, ApiError>
  where
    F: FnOnce() -> Result<Value, ApiError>,
  {
    if !no_cache {
      if let Some(value) = self.lookup(key) {
        debug!(key, "cache hit");
        return Ok(CacheResult::from_cache(value));
      }
      debug!(key, "cache miss");
    }

    let value = compute()?;
    self.write(key, &value, no_cache);
    Ok(CacheResult::from_network(value))
  }

  /// Store `value` under `key` unless `no_cache`.
  pub fn write(&self, key: &str, value: &Value, no_cache: bool) {
    if no_cache {
      return;
    }
    if let Err(e) = self.storage.set(key, value) {
      warn!(key, error = %e, "failed to write cache entry");
    }
  }

  fn lookup(&self, key: &str) -> Option<Value> {
    match self.storage.get(key) {
      Ok(value) => value,
      Err(e) => {
        warn!(key, error = %e, "cache read failed, treating as miss");
        None
      }
    }
  }
}

impl<S: CacheStorage> Clone for CacheLayer<S> {
  fn clone(&self) -> Self {
    Self {
      storage: Arc::clone(&self.storage),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::cache::CacheSource;
  use crate::testing::{BrokenStorage, CountingStorage};
  use serde_json::json;
  use std::cell::Cell;

  #[test]
  fn test_hit_skips_compute() {
    let layer = CacheLayer::new(CountingStorage::new());
    let calls = Cell::new(0);
    let compute = || {
      calls.set(calls.get() + 1);
      Ok(json!({"id": 42}))
    };

    let first = layer.fetch_or_compute("ticket-42", false, compute).unwrap();
    let second = layer
      .fetch_or_compute("ticket-42", false, || {
        calls.set(calls.get() + 1);
        Ok(json!({"id": 0}))
      })
      .unwrap();

    assert_eq!(calls.get(), 1);
    assert_eq!(first.source, CacheSource::Network);
    assert_eq!(second.source, CacheSource::Cache);
    assert_eq!(second.data, json!({"id": 42}));
  }

  #[test]
  fn test_no_cache_bypasses_backend() {
    let layer = CacheLayer::new(CountingStorage::new());
    for _ in 0..2 {
      let result = layer
        .fetch_or_compute("ticket-42", true, || Ok(json!({"id": 42})))
        .unwrap();
      assert_eq!(result.source, CacheSource::Network);
    }
    assert_eq!(layer.storage().reads(), 0);
    assert_eq!(layer.storage().writes(), 0);
  }

  #[test]
  fn test_failed_compute_is_not_cached() {
    let layer = CacheLayer::new(CountingStorage::new());
    let err = layer
      .fetch_or_compute("ticket-1", false, || {
        Err(ApiError::Validation("nope".to_string()))
      })
      .unwrap_err();

    assert!(matches!(err, ApiError::Validation(_)));
    assert_eq!(layer.storage().writes(), 0);
    assert!(layer.storage().peek("ticket-1").is_none());
  }

  #[test]
  fn test_broken_backend_degrades_to_compute() {
    let layer = CacheLayer::new(BrokenStorage);
    let result = layer
      .fetch_or_compute("user-7", false, || Ok(json!({"id": 7})))
      .unwrap();
    assert_eq!(result.data, json!({"id": 7}));

    // Write failure is swallowed too.
    layer.write("user-7", &json!({"id": 7}), false);
  }

  #[test]
  fn test_write_respects_no_cache() {
    let layer = CacheLayer::new(CountingStorage::new());
    layer.write("organization-99", &json!({"id": 99}), true);
    assert_eq!(layer.storage().writes(), 0);

    layer.write("organization-99", &json!({"id": 99}), false);
    assert_eq!(layer.storage().peek("organization-99"), Some(json!({"id": 99})));
  }
}
