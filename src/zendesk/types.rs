use std::fmt;
use std::str::FromStr;

use url::form_urlencoded;

use super::error::ApiError;

/// Shape every element of a paginated array must have.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemShape {
  Any,
  Object,
}

/// Declared envelope of a paginated endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageSpec {
  /// Field holding the page's items, e.g. "tickets"
  pub field: &'static str,
  pub item: ItemShape,
}

impl PageSpec {
  pub const fn objects(field: &'static str) -> Self {
    Self {
      field,
      item: ItemShape::Object,
    }
  }

  pub const fn any(field: &'static str) -> Self {
    Self {
      field,
      item: ItemShape::Any,
    }
  }
}

/// Resource types that support single reads, bulk reads and updates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
  Ticket,
  Organization,
  User,
}

impl Resource {
  /// Envelope key of a single object, e.g. `{"ticket": {...}}`
  pub fn singular(&self) -> &'static str {
    match self {
      Self::Ticket => "ticket",
      Self::Organization => "organization",
      Self::User => "user",
    }
  }

  /// Collection path segment and list envelope key
  pub fn plural(&self) -> &'static str {
    match self {
      Self::Ticket => "tickets",
      Self::Organization => "organizations",
      Self::User => "users",
    }
  }

  pub fn page_spec(&self) -> PageSpec {
    PageSpec::objects(self.plural())
  }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortOrder {
  Asc,
  #[default]
  Desc,
}

impl SortOrder {
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Asc => "asc",
      Self::Desc => "desc",
    }
  }
}

impl fmt::Display for SortOrder {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for SortOrder {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.to_ascii_lowercase().as_str() {
      "asc" => Ok(Self::Asc),
      "desc" => Ok(Self::Desc),
      other => Err(format!("unknown sort order '{}', expected asc or desc", other)),
    }
  }
}

/// Parameters of a search call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchParams {
  pub query: String,
  pub sort_by: String,
  pub sort_order: SortOrder,
  /// Stop paginating once at least this many results are collected
  pub size_limit: Option<usize>,
}

impl SearchParams {
  pub fn new(query: impl Into<String>) -> Self {
    Self {
      query: query.into(),
      sort_by: "updated_at".to_string(),
      sort_order: SortOrder::Desc,
      size_limit: None,
    }
  }

  pub fn with_sort_by(mut self, sort_by: impl Into<String>) -> Self {
    self.sort_by = sort_by.into();
    self
  }

  pub fn with_sort_order(mut self, sort_order: SortOrder) -> Self {
    self.sort_order = sort_order;
    self
  }

  pub fn with_size_limit(mut self, size_limit: usize) -> Self {
    self.size_limit = Some(size_limit);
    self
  }

  /// The query as sent and as keyed in the cache.
  pub fn normalized_query(&self) -> &str {
    self.query.trim()
  }

  pub fn validate(&self) -> Result<(), ApiError> {
    if self.normalized_query().is_empty() {
      return Err(ApiError::Validation("search query must not be empty".to_string()));
    }
    if self.sort_by.trim().is_empty() {
      return Err(ApiError::Validation("sort_by must not be empty".to_string()));
    }
    validate_size_limit(self.size_limit)
  }

  /// Path of the first page, without the `page` parameter.
  pub fn to_path(&self) -> String {
    let query = form_urlencoded::Serializer::new(String::new())
      .append_pair("query", self.normalized_query())
      .append_pair("sort_by", &self.sort_by)
      .append_pair("sort_order", self.sort_order.as_str())
      .finish();
    format!("/search.json?{}", query)
  }
}

pub(crate) fn validate_size_limit(size_limit: Option<usize>) -> Result<(), ApiError> {
  match size_limit {
    Some(0) => Err(ApiError::Validation("size limit must be positive".to_string())),
    _ => Ok(()),
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_search_defaults() {
    let params = SearchParams::new("type:ticket status:open");
    assert_eq!(params.sort_by, "updated_at");
    assert_eq!(params.sort_order, SortOrder::Desc);
    assert_eq!(
      params.to_path(),
      "/search.json?query=type%3Aticket+status%3Aopen&sort_by=updated_at&sort_order=desc"
    );
  }

  #[test]
  fn test_search_path_uses_trimmed_query() {
    assert_eq!(
      SearchParams::new("  status:open \n").to_path(),
      SearchParams::new("status:open").to_path()
    );
  }

  #[test]
  fn test_search_validation() {
    assert!(matches!(
      SearchParams::new("   ").validate(),
      Err(ApiError::Validation(_))
    ));
    assert!(matches!(
      SearchParams::new("x").with_size_limit(0).validate(),
      Err(ApiError::Validation(_))
    ));
    assert!(SearchParams::new("x").with_size_limit(1).validate().is_ok());
  }

  #[test]
  fn test_sort_order_parse() {
    assert_eq!("ASC".parse::<SortOrder>().unwrap(), SortOrder::Asc);
    assert_eq!("desc".parse::<SortOrder>().unwrap(), SortOrder::Desc);
    assert!("sideways".parse::<SortOrder>().is_err());
  }
}
