//! Client for the Zendesk REST API.
//!
//! Every resource accessor is composed from three pieces:
//! - [`zendesk::RequestExecutor`] issues one logical call and retries on
//!   rate limiting (429) and transient overload (503).
//! - [`RequestExecutor::paginate`](zendesk::RequestExecutor::paginate) walks
//!   `page=<n>` cursors and concatenates one array field across pages.
//! - [`cache::CacheLayer`] wraps reads in cache-aside and writes mutation
//!   results through to the cache.
//!
//! The model is synchronous: each call runs to completion on the calling
//! thread and only blocks inside backoff sleeps.

pub mod cache;
pub mod config;
pub mod logging;
pub mod zendesk;

#[cfg(test)]
pub(crate) mod testing;
