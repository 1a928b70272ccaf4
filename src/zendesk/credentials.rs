use std::fmt;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

/// Pre-built `Authorization` header value, attached to every API request.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
  header: String,
}

impl Credentials {
  /// HTTP Basic credentials for `username:secret`.
  pub fn basic(username: &str, secret: &str) -> Self {
    let encoded = STANDARD.encode(format!("{}:{}", username, secret));
    Self {
      header: format!("Basic {}", encoded),
    }
  }

  /// API token auth: Basic with `{email}/token` as the user name.
  pub fn api_token(email: &str, token: &str) -> Self {
    Self::basic(&format!("{}/token", email), token)
  }

  /// OAuth access token.
  pub fn bearer(token: &str) -> Self {
    Self {
      header: format!("Bearer {}", token),
    }
  }

  pub fn header_value(&self) -> &str {
    &self.header
  }
}

impl fmt::Debug for Credentials {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let scheme = self.header.split(' ').next().unwrap_or_default();
    f.debug_struct("Credentials")
      .field("scheme", &scheme)
      .finish_non_exhaustive()
  }
}
