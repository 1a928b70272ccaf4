use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::zendesk::{Credentials, RetryPolicy};

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
  pub zendesk: ZendeskConfig,
  #[serde(default)]
  pub retry: RetryConfig,
  #[serde(default)]
  pub cache: CacheConfig,
  /// Where ticket attachments are saved (defaults to ./attachments)
  #[serde(default = "default_attachments_dir")]
  pub attachments_dir: PathBuf,
  /// Also write logs to this file
  pub log_file: Option<PathBuf>,
}

fn default_attachments_dir() -> PathBuf {
  PathBuf::from("attachments")
}

#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AuthType {
  /// API token - Basic auth with "{email}/token" as user name
  #[default]
  ApiToken,
  /// Basic auth with the account password
  Password,
  /// OAuth access token
  Bearer,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ZendeskConfig {
  /// API base URL, e.g. https://acme.zendesk.com/api/v2
  pub url: String,
  pub email: String,
  #[serde(default)]
  pub auth_type: AuthType,
  /// Per-request timeout
  #[serde(default = "default_timeout_secs")]
  pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
  60
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct RetryConfig {
  #[serde(default = "default_rate_limit_delay_secs")]
  pub rate_limit_delay_secs: u64,
  #[serde(default = "default_overload_delay_secs")]
  pub overload_delay_secs: u64,
  /// Unbounded when unset
  pub max_attempts: Option<u32>,
  /// Unbounded when unset
  pub deadline_secs: Option<u64>,
}

fn default_rate_limit_delay_secs() -> u64 {
  10
}

fn default_overload_delay_secs() -> u64 {
  1
}

impl Default for RetryConfig {
  fn default() -> Self {
    Self {
      rate_limit_delay_secs: default_rate_limit_delay_secs(),
      overload_delay_secs: default_overload_delay_secs(),
      max_attempts: None,
      deadline_secs: None,
    }
  }
}

impl RetryConfig {
  pub fn policy(&self) -> RetryPolicy {
    RetryPolicy {
      rate_limit_delay: Duration::from_secs(self.rate_limit_delay_secs),
      overload_delay: Duration::from_secs(self.overload_delay_secs),
      max_attempts: self.max_attempts,
      deadline: self.deadline_secs.map(Duration::from_secs),
    }
  }
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct CacheConfig {
  #[serde(default = "default_cache_enabled")]
  pub enabled: bool,
  /// SQLite database path (defaults to <data dir>/zdesk/cache.db)
  pub path: Option<PathBuf>,
  /// Entries older than this are evicted on read
  pub max_age_secs: Option<u64>,
}

fn default_cache_enabled() -> bool {
  true
}

impl Default for CacheConfig {
  fn default() -> Self {
    Self {
      enabled: true,
      path: None,
      max_age_secs: None,
    }
  }
}

impl CacheConfig {
  /// `max_age_secs` as a duration, rejecting values chrono cannot hold.
  pub fn max_age(&self) -> Result<Option<chrono::Duration>> {
    self
      .max_age_secs
      .map(|secs| {
        i64::try_from(secs)
          .ok()
          .and_then(chrono::Duration::try_seconds)
          .ok_or_else(|| eyre!("cache.max_age_secs is out of range: {}", secs))
      })
      .transpose()
  }
}

impl Config {
  /// Load configuration from file.
  ///
  /// Search order:
  /// 1. Explicit path if provided
  /// 2. ./zdesk.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/zdesk/config.yaml
  pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
    let path = if let Some(p) = explicit_path {
      if p.exists() {
        Some(p.to_path_buf())
      } else {
        return Err(eyre!("Config file not found: {}", p.display()));
      }
    } else {
      Self::find_config_file()
    };

    match path {
      Some(p) => Self::load_from_path(&p),
      None => Err(eyre!(
        "No configuration file found. Create one at ~/.config/zdesk/config.yaml\n\
                 See config.example.yaml for the format."
      )),
    }
  }

  fn find_config_file() -> Option<PathBuf> {
    // Check current directory
    let local = PathBuf::from("zdesk.yaml");
    if local.exists() {
      return Some(local);
    }

    // Check XDG config directory
    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("zdesk").join("config.yaml");
      if xdg_path.exists() {
        return Some(xdg_path);
      }
    }

    None
  }

  fn load_from_path(path: &Path) -> Result<Self> {
    let contents = std::fs::read_to_string(path)
      .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;

    Self::parse(&contents).map_err(|e| eyre!("Failed to parse config file {}: {}", path.display(), e))
  }

  pub fn parse(contents: &str) -> Result<Self> {
    let config: Config = serde_yaml::from_str(contents)?;
    if config.zendesk.url.trim().is_empty() {
      return Err(eyre!("zendesk.url must not be empty"));
    }
    Ok(config)
  }

  /// Build credentials from the configured auth type and the environment.
  pub fn credentials(&self) -> Result<Credentials> {
    let email = &self.zendesk.email;
    match self.zendesk.auth_type {
      AuthType::ApiToken => Ok(Credentials::api_token(email, &Self::get_api_token()?)),
      AuthType::Password => Ok(Credentials::basic(email, &Self::get_password()?)),
      AuthType::Bearer => Ok(Credentials::bearer(&Self::get_api_token()?)),
    }
  }

  /// Get the Zendesk API token from environment variables.
  ///
  /// Checks ZDESK_API_TOKEN first, then ZENDESK_API_TOKEN as fallback.
  pub fn get_api_token() -> Result<String> {
    std::env::var("ZDESK_API_TOKEN")
      .or_else(|_| std::env::var("ZENDESK_API_TOKEN"))
      .map_err(|_| {
        eyre!(
          "Zendesk API token not found. Set ZDESK_API_TOKEN or ZENDESK_API_TOKEN environment variable."
        )
      })
  }

  /// Get the Zendesk password from environment variables.
  ///
  /// Checks ZDESK_PASSWORD.
  pub fn get_password() -> Result<String> {
    std::env::var("ZDESK_PASSWORD")
      .map_err(|_| eyre!("Zendesk password not found. Set ZDESK_PASSWORD environment variable."))
  }
}
