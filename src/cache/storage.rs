//! Cache storage backends.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{DateTime, Duration, Utc};
use color_eyre::{eyre::eyre, Result};
use rusqlite::{params, Connection, OptionalExtension};
use serde_json::Value;
use tracing::debug;

use super::traits::{CacheError, CacheStorage};

/// Storage implementation that doesn't cache anything.
/// Used when caching is disabled - all operations are no-ops.
pub struct NoopStorage;

impl CacheStorage for NoopStorage {
  fn get(&self, _key: &str) -> Result<Option<Value>, CacheError> {
    Ok(None) // Always miss
  }

  fn set(&self, _key: &str, _value: &Value) -> Result<(), CacheError> {
    Ok(()) // Discard
  }
}

/// Process-local storage without eviction.
#[derive(Default)]
pub struct MemoryStorage {
  entries: Mutex<HashMap<String, Value>>,
}

impl MemoryStorage {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn len(&self) -> Result<usize, CacheError> {
    let entries = self.entries.lock().map_err(|_| CacheError::LockPoisoned)?;
    Ok(entries.len())
  }

  pub fn is_empty(&self) -> Result<bool, CacheError> {
    Ok(self.len()? == 0)
  }
}

impl CacheStorage for MemoryStorage {
  fn get(&self, key: &str) -> Result<Option<Value>, CacheError> {
    let entries = self.entries.lock().map_err(|_| CacheError::LockPoisoned)?;
    Ok(entries.get(key).cloned())
  }

  fn set(&self, key: &str, value: &Value) -> Result<(), CacheError> {
    let mut entries = self.entries.lock().map_err(|_| CacheError::LockPoisoned)?;
    entries.insert(key.to_string(), value.clone());
    Ok(())
  }
}

/// SQLite-based cache storage implementation.
///
/// With a `max_age`, entries older than it read as absent and are deleted.
pub struct SqliteStorage {
  conn: Mutex<Connection>,
  max_age: Option<Duration>,
}

impl SqliteStorage {
  /// Open (or create) the cache database at `path`.
  pub fn open(path: &Path) -> Result<Self> {
    // Ensure parent directory exists
    if let Some(parent) = path.parent() {
      std::fs::create_dir_all(parent)
        .map_err(|e| eyre!("Failed to create cache directory: {}", e))?;
    }

    let conn = Connection::open(path)
      .map_err(|e| eyre!("Failed to open cache database at {}: {}", path.display(), e))?;

    Self::from_connection(conn)
  }

  /// Open the cache database at the default location.
  pub fn open_default() -> Result<Self> {
    Self::open(&Self::default_path()?)
  }

  /// Cache that lives only as long as this value.
  pub fn in_memory() -> Result<Self> {
    let conn = Connection::open_in_memory()
      .map_err(|e| eyre!("Failed to open in-memory cache database: {}", e))?;
    Self::from_connection(conn)
  }

  pub fn with_max_age(mut self, max_age: Duration) -> Self {
    self.max_age = Some(max_age);
    self
  }

  /// Get the default database path.
  pub fn default_path() -> Result<PathBuf> {
    let data_dir = dirs::data_dir()
      .or_else(|| dirs::home_dir().map(|p| p.join(".local/share")))
      .ok_or_else(|| eyre!("Could not determine data directory"))?;

    Ok(data_dir.join("zdesk").join("cache.db"))
  }

  fn from_connection(conn: Connection) -> Result<Self> {
    conn
      .execute_batch(CACHE_SCHEMA)
      .map_err(|e| eyre!("Failed to run cache migrations: {}", e))?;

    Ok(Self {
      conn: Mutex::new(conn),
      max_age: None,
    })
  }

  fn is_expired(&self, cached_at: DateTime<Utc>) -> bool {
    self
      .max_age
      .is_some_and(|max_age| Utc::now() - cached_at > max_age)
  }
}

/// Schema for cache tables.
const CACHE_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS kv_cache (
    cache_key TEXT PRIMARY KEY,
    data BLOB NOT NULL,
    cached_at TEXT NOT NULL DEFAULT (datetime('now'))
);
"#;

impl CacheStorage for SqliteStorage {
  fn get(&self, key: &str) -> Result<Option<Value>, CacheError> {
    let conn = self.conn.lock().map_err(|_| CacheError::LockPoisoned)?;

    let row: Option<(Vec<u8>, String)> = conn
      .query_row(
        "SELECT data, cached_at FROM kv_cache WHERE cache_key = ?",
        params![key],
        |row| Ok((row.get(0)?, row.get(1)?)),
      )
      .optional()?;

    let Some((data, cached_at)) = row else {
      return Ok(None);
    };

    if self.is_expired(parse_datetime(&cached_at)?) {
      debug!(key, "evicting expired cache entry");
      conn.execute("DELETE FROM kv_cache WHERE cache_key = ?", params![key])?;
      return Ok(None);
    }

    Ok(Some(serde_json::from_slice(&data)?))
  }

  fn set(&self, key: &str, value: &Value) -> Result<(), CacheError> {
    let data = serde_json::to_vec(value)?;
    let conn = self.conn.lock().map_err(|_| CacheError::LockPoisoned)?;

    conn.execute(
      "INSERT OR REPLACE INTO kv_cache (cache_key, data, cached_at)
       VALUES (?, ?, datetime('now'))",
      params![key, data],
    )?;

    Ok(())
  }
}

/// Parse a datetime string from SQLite format.
fn parse_datetime(s: &str) -> Result<DateTime<Utc>, CacheError> {
  // SQLite stores as "YYYY-MM-DD HH:MM:SS"
  chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
    .map(|dt| dt.and_utc())
    .map_err(|e| CacheError::Backend(format!("Failed to parse datetime '{}': {}", s, e)))
}
