//! Cache keys for Zendesk resources.

use std::fmt;

use sha2::{Digest, Sha256};

use super::types::{Resource, SearchParams};

/// Cache key of a cacheable read.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ResourceKey {
  /// A single ticket, organization or user
  Single { resource: Resource, id: u64 },
  /// All comments of a ticket
  TicketComments { ticket_id: u64 },
  /// All users of an organization
  OrganizationUsers { organization_id: u64 },
  /// Results of a search
  Search(SearchParams),
}

impl ResourceKey {
  pub fn single(resource: Resource, id: u64) -> Self {
    Self::Single { resource, id }
  }

  pub fn cache_key(&self) -> String {
    match self {
      Self::Single { resource, id } => format!("{}-{}", resource.singular(), id),
      Self::TicketComments { ticket_id } => format!("ticket-comments-{}", ticket_id),
      Self::OrganizationUsers { organization_id } => {
        format!("organization-users-{}", organization_id)
      }
      Self::Search(params) => format!("search-{}", search_hash(params)),
    }
  }
}

impl fmt::Display for ResourceKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::Single { resource, id } => write!(f, "{} {}", resource.singular(), id),
      Self::TicketComments { ticket_id } => write!(f, "comments of ticket {}", ticket_id),
      Self::OrganizationUsers { organization_id } => {
        write!(f, "users of organization {}", organization_id)
      }
      Self::Search(params) => write!(f, "search: {}", params.query),
    }
  }
}

/// SHA256 over the normalized search, for stable fixed-length keys.
fn search_hash(params: &SearchParams) -> String {
  let limit = params
    .size_limit
    .map(|l| l.to_string())
    .unwrap_or_default();
  let input = format!(
    "{}|{}|{}|{}",
    params.normalized_query(),
    params.sort_by,
    params.sort_order,
    limit
  );

  let mut hasher = Sha256::new();
  hasher.update(input.as_bytes());
  hex::encode(hasher.finalize())
}
