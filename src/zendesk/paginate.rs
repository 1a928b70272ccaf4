//! Page-cursor accumulation over `page=<n>` endpoints.

use serde_json::Value;
use tracing::debug;

use super::error::ApiError;
use super::executor::RequestExecutor;
use super::http::{ApiRequest, Transport};
use super::types::{validate_size_limit, ItemShape, PageSpec};

/// Traversal state of one paginated call.
#[derive(Debug)]
pub struct PageCursor<'a> {
  base_path: &'a str,
  spec: PageSpec,
  page: u32,
  items: Vec<Value>,
  size_limit: Option<usize>,
}

impl<'a> PageCursor<'a> {
  pub fn new(base_path: &'a str, spec: PageSpec, size_limit: Option<usize>) -> Self {
    Self {
      base_path,
      spec,
      page: 1,
      items: Vec::new(),
      size_limit,
    }
  }

  /// Path of the current page.
  pub fn page_path(&self) -> String {
    let sep = if self.base_path.contains('?') { '&' } else { '?' };
    format!("{}{}page={}", self.base_path, sep, self.page)
  }

  /// Append the items of one decoded page and advance. Returns whether the
  /// traversal should continue.
  pub fn absorb(&mut self, path: &str, mut page: Value) -> Result<bool, ApiError> {
    let items = match page.get_mut(self.spec.field).map(Value::take) {
      Some(Value::Array(items)) => items,
      Some(_) => {
        return Err(ApiError::malformed(
          path,
          format!("field '{}' is not an array", self.spec.field),
        ))
      }
      None => {
        return Err(ApiError::malformed(
          path,
          format!("missing field '{}'", self.spec.field),
        ))
      }
    };

    if self.spec.item == ItemShape::Object {
      if let Some(pos) = items.iter().position(|item| !item.is_object()) {
        return Err(ApiError::malformed(
          path,
          format!("item {} of '{}' is not an object", pos, self.spec.field),
        ));
      }
    }

    self.items.extend(items);
    self.page += 1;

    let under_limit = self.size_limit.map_or(true, |limit| self.items.len() < limit);
    Ok(has_next_page(&page) && under_limit)
  }

  pub fn len(&self) -> usize {
    self.items.len()
  }

  pub fn is_empty(&self) -> bool {
    self.items.is_empty()
  }

  pub fn into_items(self) -> Vec<Value> {
    self.items
  }
}

/// `next_page` is a URL (or null) in list endpoints; some return a boolean.
fn has_next_page(page: &Value) -> bool {
  match page.get("next_page") {
    None | Some(Value::Null) => false,
    Some(Value::Bool(more)) => *more,
    Some(Value::String(url)) => !url.is_empty(),
    Some(_) => true,
  }
}

impl<T: Transport> RequestExecutor<T> {
  /// Collect `spec.field` from every page of `base_path`.
  ///
  /// The size limit is checked at page boundaries, so the result may hold
  /// more than `size_limit` items. Callers needing an exact count truncate.
  pub fn paginate(
    &self,
    base_path: &str,
    spec: PageSpec,
    size_limit: Option<usize>,
  ) -> Result<Vec<Value>, ApiError> {
    validate_size_limit(size_limit)?;

    let mut cursor = PageCursor::new(base_path, spec, size_limit);
    loop {
      let path = cursor.page_path();
      let page = self.execute(&ApiRequest::get(path.as_str()))?;
      if !cursor.absorb(&path, page)? {
        break;
      }
    }

    debug!(path = base_path, field = spec.field, count = cursor.len(), "pagination complete");
    Ok(cursor.into_items())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::testing::{json_response, MockTransport, RecordingSleeper, BASE_URL};
  use crate::zendesk::Credentials;
  use serde_json::json;

  const TICKETS: PageSpec = PageSpec::objects("tickets");

  fn executor(transport: &MockTransport) -> RequestExecutor<MockTransport> {
    RequestExecutor::new(transport.clone(), BASE_URL, Credentials::bearer("tok"))
      .with_sleeper(RecordingSleeper::new())
  }

  fn page(start: u64, count: u64, next: Option<&str>) -> Value {
    let tickets: Vec<Value> = (start..start + count).map(|id| json!({"id": id})).collect();
    json!({"tickets": tickets, "next_page": next})
  }

  fn ids(items: &[Value]) -> Vec<u64> {
    items.iter().map(|t| t["id"].as_u64().unwrap()).collect()
  }

  #[test]
  fn test_page_path_separator() {
    assert_eq!(
      PageCursor::new("/tickets.json", TICKETS, None).page_path(),
      "/tickets.json?page=1"
    );
    assert_eq!(
      PageCursor::new("/search.json?query=x", TICKETS, None).page_path(),
      "/search.json?query=x&page=1"
    );
  }

  #[test]
  fn test_collects_all_pages_in_order() {
    let transport = MockTransport::new();
    transport.push(json_response(200, page(1, 25, Some("https://x/tickets.json?page=2"))));
    transport.push(json_response(200, page(26, 25, Some("https://x/tickets.json?page=3"))));
    transport.push(json_response(200, page(51, 25, None)));

    let items = executor(&transport)
      .paginate("/tickets.json", TICKETS, None)
      .unwrap();

    assert_eq!(items.len(), 75);
    assert_eq!(ids(&items), (1..=75).collect::<Vec<_>>());
    assert_eq!(
      transport.paths(),
      vec![
        "/tickets.json?page=1",
        "/tickets.json?page=2",
        "/tickets.json?page=3"
      ]
    );
  }

  #[test]
  fn test_size_limit_stops_at_page_boundary() {
    let transport = MockTransport::new();
    transport.push(json_response(200, page(1, 25, Some("next"))));
    transport.push(json_response(200, page(26, 25, Some("next"))));
    transport.push(json_response(200, page(51, 25, None)));

    let items = executor(&transport)
      .paginate("/tickets.json", TICKETS, Some(30))
      .unwrap();

    assert_eq!(items.len(), 50);
    assert_eq!(transport.call_count(), 2);
  }

  #[test]
  fn test_boolean_next_page() {
    let transport = MockTransport::new();
    transport.push(json_response(200, json!({"tickets": [{"id": 1}], "next_page": true})));
    transport.push(json_response(200, json!({"tickets": [{"id": 2}], "next_page": false})));

    let items = executor(&transport)
      .paginate("/tickets.json", TICKETS, None)
      .unwrap();
    assert_eq!(ids(&items), vec![1, 2]);
  }

  #[test]
  fn test_missing_field_is_terminal() {
    let transport = MockTransport::new();
    transport.push(json_response(200, page(1, 2, Some("next"))));
    transport.push(json_response(200, json!({"users": [], "next_page": null})));

    let err = executor(&transport)
      .paginate("/tickets.json", TICKETS, None)
      .unwrap_err();

    match err {
      ApiError::MalformedResponse { path, reason } => {
        assert_eq!(path, "/tickets.json?page=2");
        assert!(reason.contains("tickets"));
      }
      other => panic!("unexpected error: {:?}", other),
    }
  }

  #[test]
  fn test_non_object_items_rejected() {
    let transport = MockTransport::new();
    transport.push(json_response(200, json!({"tickets": [1, 2], "next_page": null})));

    let err = executor(&transport)
      .paginate("/tickets.json", TICKETS, None)
      .unwrap_err();
    assert!(matches!(err, ApiError::MalformedResponse { .. }));
  }

  #[test]
  fn test_zero_limit_rejected_before_network() {
    let transport = MockTransport::new();
    let err = executor(&transport)
      .paginate("/tickets.json", TICKETS, Some(0))
      .unwrap_err();
    assert!(matches!(err, ApiError::Validation(_)));
    assert_eq!(transport.call_count(), 0);
  }

  #[test]
  fn test_error_mid_pagination_returns_no_partial_result() {
    let transport = MockTransport::new();
    transport.push(json_response(200, page(1, 25, Some("next"))));
    transport.push(json_response(500, json!({"error": "boom"})));

    let err = executor(&transport)
      .paginate("/tickets.json", TICKETS, None)
      .unwrap_err();
    assert_eq!(err.status(), Some(500));
  }
}
