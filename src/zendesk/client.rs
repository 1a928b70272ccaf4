use std::path::Path;

use serde_json::{Map, Value};
use tracing::info;

use crate::cache::{CacheLayer, CacheStorage};

use super::cache::ResourceKey;
use super::download::{download, Attachment, DownloadOutcome};
use super::error::ApiError;
use super::executor::RequestExecutor;
use super::http::{ApiRequest, Transport};
use super::types::{PageSpec, Resource, SearchParams};

/// `show_many` accepts at most this many ids per request.
const SHOW_MANY_BATCH: usize = 100;

const COMMENTS: PageSpec = PageSpec::objects("comments");
const USERS: PageSpec = PageSpec::objects("users");
const RESULTS: PageSpec = PageSpec::objects("results");

/// Zendesk API client: resource paths and cache keys over the shared
/// executor, paginator and cache layer.
///
/// Every read takes `no_cache`; with it set the cache is neither read nor
/// written. Updates never read the cache and write the server's copy back.
pub struct ZendeskClient<T: Transport, S: CacheStorage> {
  executor: RequestExecutor<T>,
  cache: CacheLayer<S>,
}

impl<T: Transport, S: CacheStorage> ZendeskClient<T, S> {
  pub fn new(executor: RequestExecutor<T>, cache: CacheLayer<S>) -> Self {
    Self { executor, cache }
  }

  pub fn executor(&self) -> &RequestExecutor<T> {
    &self.executor
  }

  pub fn cache(&self) -> &CacheLayer<S> {
    &self.cache
  }

  pub fn get_ticket(&self, id: u64, no_cache: bool) -> Result<Value, ApiError> {
    self.get_single(Resource::Ticket, id, no_cache)
  }

  pub fn get_organization(&self, id: u64, no_cache: bool) -> Result<Value, ApiError> {
    self.get_single(Resource::Organization, id, no_cache)
  }

  pub fn get_user(&self, id: u64, no_cache: bool) -> Result<Value, ApiError> {
    self.get_single(Resource::User, id, no_cache)
  }

  /// Bulk fetch; not cached.
  pub fn get_tickets(&self, ids: &[u64]) -> Result<Vec<Value>, ApiError> {
    self.show_many(Resource::Ticket, ids)
  }

  pub fn get_organizations(&self, ids: &[u64]) -> Result<Vec<Value>, ApiError> {
    self.show_many(Resource::Organization, ids)
  }

  pub fn get_users(&self, ids: &[u64]) -> Result<Vec<Value>, ApiError> {
    self.show_many(Resource::User, ids)
  }

  pub fn get_ticket_comments(&self, ticket_id: u64, no_cache: bool) -> Result<Vec<Value>, ApiError> {
    self.get_list(
      ResourceKey::TicketComments { ticket_id },
      format!("/tickets/{}/comments.json", ticket_id),
      COMMENTS,
      None,
      no_cache,
    )
  }

  pub fn get_organization_users(
    &self,
    organization_id: u64,
    no_cache: bool,
  ) -> Result<Vec<Value>, ApiError> {
    self.get_list(
      ResourceKey::OrganizationUsers { organization_id },
      format!("/organizations/{}/users.json", organization_id),
      USERS,
      None,
      no_cache,
    )
  }

  /// Search results, stopping at the first page boundary at or past
  /// `params.size_limit`.
  pub fn search(&self, params: &SearchParams, no_cache: bool) -> Result<Vec<Value>, ApiError> {
    params.validate()?;
    self.get_list(
      ResourceKey::Search(params.clone()),
      params.to_path(),
      RESULTS,
      params.size_limit,
      no_cache,
    )
  }

  pub fn update_ticket(&self, id: u64, fields: &Value, no_cache: bool) -> Result<Value, ApiError> {
    self.update(Resource::Ticket, id, fields, no_cache)
  }

  pub fn update_organization(
    &self,
    id: u64,
    fields: &Value,
    no_cache: bool,
  ) -> Result<Value, ApiError> {
    self.update(Resource::Organization, id, fields, no_cache)
  }

  pub fn update_user(&self, id: u64, fields: &Value, no_cache: bool) -> Result<Value, ApiError> {
    self.update(Resource::User, id, fields, no_cache)
  }

  /// Download every attachment on a ticket's comments into `dir`.
  pub fn download_ticket_attachments(
    &self,
    ticket_id: u64,
    dir: &Path,
    force: bool,
    no_cache: bool,
  ) -> Result<Vec<DownloadOutcome>, ApiError> {
    let comments = self.get_ticket_comments(ticket_id, no_cache)?;

    let mut outcomes = Vec::new();
    for comment in &comments {
      for attachment in Attachment::from_comment(comment)? {
        let target = attachment.target_in(dir, ticket_id);
        outcomes.push(download(
          self.executor.transport(),
          &attachment.content_url,
          &target,
          force,
        )?);
      }
    }

    info!(ticket_id, count = outcomes.len(), "attachments processed");
    Ok(outcomes)
  }

  fn get_single(&self, resource: Resource, id: u64, no_cache: bool) -> Result<Value, ApiError> {
    let key = ResourceKey::single(resource, id);
    let path = format!("/{}/{}.json", resource.plural(), id);

    let result = self.cache.fetch_or_compute(&key.cache_key(), no_cache, || {
      let response = self.executor.execute(&ApiRequest::get(path.as_str()))?;
      unwrap_envelope(&path, response, resource.singular())
    })?;
    Ok(result.data)
  }

  fn get_list(
    &self,
    key: ResourceKey,
    path: String,
    spec: PageSpec,
    size_limit: Option<usize>,
    no_cache: bool,
  ) -> Result<Vec<Value>, ApiError> {
    let cache_key = key.cache_key();
    let result = self.cache.fetch_or_compute(&cache_key, no_cache, || {
      self
        .executor
        .paginate(&path, spec, size_limit)
        .map(Value::Array)
    })?;

    match result.data {
      Value::Array(items) => Ok(items),
      _ => Err(ApiError::malformed(
        &cache_key,
        "cached entry for a list is not an array",
      )),
    }
  }

  fn show_many(&self, resource: Resource, ids: &[u64]) -> Result<Vec<Value>, ApiError> {
    if ids.is_empty() {
      return Err(ApiError::Validation(format!(
        "at least one {} id is required",
        resource.singular()
      )));
    }

    let mut items = Vec::with_capacity(ids.len());
    for batch in ids.chunks(SHOW_MANY_BATCH) {
      let joined = batch
        .iter()
        .map(u64::to_string)
        .collect::<Vec<_>>()
        .join(",");
      let path = format!("/{}/show_many.json?ids={}", resource.plural(), joined);
      items.extend(self.executor.paginate(&path, resource.page_spec(), None)?);
    }
    Ok(items)
  }

  fn update(
    &self,
    resource: Resource,
    id: u64,
    fields: &Value,
    no_cache: bool,
  ) -> Result<Value, ApiError> {
    if !fields.is_object() {
      return Err(ApiError::Validation(format!(
        "{} update must be a JSON object",
        resource.singular()
      )));
    }

    let path = format!("/{}/{}.json", resource.plural(), id);
    let mut envelope = Map::new();
    envelope.insert(resource.singular().to_string(), fields.clone());
    let body = Value::Object(envelope);
    let response = self
      .executor
      .execute(&ApiRequest::put_json(path.as_str(), &body)?)?;
    let object = unwrap_envelope(&path, response, resource.singular())?;

    match object.get("id").and_then(Value::as_u64) {
      Some(echoed) if echoed == id => {}
      _ => {
        return Err(ApiError::IdMismatch {
          resource: resource.singular(),
          expected: id,
          actual: object
            .get("id")
            .map(Value::to_string)
            .unwrap_or_else(|| "none".to_string()),
        })
      }
    }

    let key = ResourceKey::single(resource, id);
    self.cache.write(&key.cache_key(), &object, no_cache);
    Ok(object)
  }
}

/// Take `response[field]`, which must be an object.
fn unwrap_envelope(path: &str, mut response: Value, field: &str) -> Result<Value, ApiError> {
  match response.get_mut(field).map(Value::take) {
    Some(object @ Value::Object(_)) => Ok(object),
    Some(_) => Err(ApiError::malformed(path, format!("'{}' is not an object", field))),
    None => Err(ApiError::malformed(path, format!("missing field '{}'", field))),
  }
}
