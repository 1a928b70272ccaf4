//! Zendesk REST API access.

mod cache;
mod client;
mod credentials;
mod download;
mod error;
mod executor;
mod http;
mod paginate;
mod retry;
mod types;

pub use cache::ResourceKey;
pub use client::ZendeskClient;
pub use credentials::Credentials;
pub use download::{download, sanitize_file_name, Attachment, DownloadOutcome};
pub use error::{ApiError, RetryReason};
pub use executor::RequestExecutor;
pub use http::{ApiRequest, HttpRequest, HttpResponse, Method, ReqwestTransport, Transport};
pub use paginate::PageCursor;
pub use retry::{
  classify, RetryDecision, RetryPolicy, Sleeper, ThreadSleeper, TRANSIENT_OVERLOAD_PHRASE,
};
pub use types::{ItemShape, PageSpec, Resource, SearchParams, SortOrder};
