//! Generic cache-aside layer over pluggable key/value storage.
//!
//! This module is API-agnostic:
//! - `CacheStorage` is the contract a backend must satisfy (get/set by key)
//! - `CacheLayer` implements fetch-or-compute and write-through on top of it
//! - Backend failures never fail an operation; they degrade to misses

mod layer;
mod storage;
mod traits;

pub use layer::CacheLayer;
pub use storage::{MemoryStorage, NoopStorage, SqliteStorage};
pub use traits::{CacheError, CacheResult, CacheSource, CacheStorage};
