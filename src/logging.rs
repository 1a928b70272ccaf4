//! Tracing subscriber setup.

use std::path::Path;

use color_eyre::{eyre::eyre, Result};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Filter directive for a `-v` count, used when `RUST_LOG` is unset.
pub fn default_directive(verbosity: u8) -> &'static str {
  match verbosity {
    0 => "zdesk=warn",
    1 => "zdesk=info",
    2 => "zdesk=debug",
    _ => "zdesk=trace",
  }
}

/// Install the global subscriber: stderr, plus `log_file` when given.
///
/// The returned guard flushes the file writer on drop and must be held
/// for the life of the program.
pub fn init(verbosity: u8, log_file: Option<&Path>) -> Result<Option<WorkerGuard>> {
  let filter = EnvFilter::try_from_default_env()
    .unwrap_or_else(|_| EnvFilter::new(default_directive(verbosity)));

  let stderr_layer = fmt::layer()
    .with_target(false)
    .with_writer(std::io::stderr);

  let (file_layer, guard) = match log_file {
    Some(path) => {
      let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
      let file_name = path
        .file_name()
        .ok_or_else(|| eyre!("Invalid log file path: {}", path.display()))?;

      std::fs::create_dir_all(dir)
        .map_err(|e| eyre!("Failed to create log directory {}: {}", dir.display(), e))?;

      let appender = tracing_appender::rolling::never(dir, file_name);
      let (writer, guard) = tracing_appender::non_blocking(appender);
      let layer = fmt::layer().with_ansi(false).with_writer(writer);
      (Some(layer), Some(guard))
    }
    None => (None, None),
  };

  tracing_subscriber::registry()
    .with(filter)
    .with(stderr_layer)
    .with(file_layer)
    .try_init()
    .map_err(|e| eyre!("Failed to initialize logging: {}", e))?;

  Ok(guard)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_verbosity_levels() {
    assert_eq!(default_directive(0), "zdesk=warn");
    assert_eq!(default_directive(1), "zdesk=info");
    assert_eq!(default_directive(2), "zdesk=debug");
    assert_eq!(default_directive(9), "zdesk=trace");
  }
}
