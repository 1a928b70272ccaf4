//! Attachment downloads.

use std::fs::{self, File};
use std::path::{Path, PathBuf};

use serde::Deserialize;
use serde_json::Value;
use tracing::info;

use super::error::ApiError;
use super::http::Transport;

/// An attachment as listed on a ticket comment.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Attachment {
  pub id: u64,
  pub file_name: String,
  pub content_url: String,
}

impl Attachment {
  /// Attachments of one comment object. A comment without the field has none.
  pub fn from_comment(comment: &Value) -> Result<Vec<Attachment>, ApiError> {
    match comment.get("attachments") {
      None | Some(Value::Null) => Ok(Vec::new()),
      Some(list) => Vec::<Attachment>::deserialize(list).map_err(|e| {
        ApiError::malformed("comment attachments", format!("invalid attachment list: {}", e))
      }),
    }
  }

  /// `<dir>/<ticket_id>/<attachment_id>-<file_name>`
  pub fn target_in(&self, dir: &Path, ticket_id: u64) -> PathBuf {
    dir
      .join(ticket_id.to_string())
      .join(format!("{}-{}", self.id, sanitize_file_name(&self.file_name)))
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadOutcome {
  Downloaded { path: PathBuf, bytes: u64 },
  /// Target already existed and the download was not forced
  Skipped { path: PathBuf },
}

/// Fetch `url` into `target`.
///
/// Skips when `target` exists unless `force`. The body is streamed into a
/// sibling `.part` file that replaces `target` only once complete.
pub fn download<T: Transport + ?Sized>(
  transport: &T,
  url: &str,
  target: &Path,
  force: bool,
) -> Result<DownloadOutcome, ApiError> {
  if target.exists() && !force {
    info!(path = %target.display(), "already downloaded, skipping");
    return Ok(DownloadOutcome::Skipped {
      path: target.to_path_buf(),
    });
  }

  if let Some(parent) = target.parent() {
    fs::create_dir_all(parent).map_err(|e| ApiError::io(parent, e))?;
  }

  let partial = part_path(target);
  let mut file = File::create(&partial).map_err(|e| ApiError::io(&partial, e))?;

  let bytes = match transport.stream_to(url, &mut file) {
    Ok(bytes) => bytes,
    Err(e) => {
      drop(file);
      let _ = fs::remove_file(&partial);
      return Err(e);
    }
  };
  file.sync_all().map_err(|e| ApiError::io(&partial, e))?;
  drop(file);

  fs::rename(&partial, target).map_err(|e| ApiError::io(target, e))?;
  info!(path = %target.display(), bytes, "downloaded attachment");

  Ok(DownloadOutcome::Downloaded {
    path: target.to_path_buf(),
    bytes,
  })
}

fn part_path(target: &Path) -> PathBuf {
  let mut name = target.file_name().unwrap_or_default().to_os_string();
  name.push(".part");
  target.with_file_name(name)
}

/// Make an uploaded file name safe to use as a single path component.
pub fn sanitize_file_name(name: &str) -> String {
  let cleaned: String = name
    .chars()
    .map(|c| match c {
      '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
      c if c.is_control() => '_',
      c => c,
    })
    .collect();
  let cleaned = cleaned.trim().trim_start_matches('.');

  if cleaned.is_empty() {
    "attachment".to_string()
  } else {
    cleaned.to_string()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::testing::{response, MockTransport};
  use serde_json::json;

  #[test]
  fn test_downloads_to_target() {
    let dir = tempfile::tempdir().unwrap();
    let target = dir.path().join("9").join("1-report.pdf");
    let transport = MockTransport::new();
    transport.push(response(200, "%PDF-1.7", &[]));

    let outcome = download(&transport, "https://cdn.example/1", &target, false).unwrap();

    assert_eq!(
      outcome,
      DownloadOutcome::Downloaded {
        path: target.clone(),
        bytes: 8
      }
    );
    assert_eq!(fs::read(&target).unwrap(), b"%PDF-1.7");
    assert!(!part_path(&target).exists());
  }

  #[test]
  fn test_existing_target_is_skipped_unless_forced() {
    let dir = tempfile::tempdir().unwrap();
    let target = dir.path().join("a.txt");
    fs::write(&target, "old").unwrap();
    let transport = MockTransport::new();

    let outcome = download(&transport, "https://cdn.example/a", &target, false).unwrap();
    assert!(matches!(outcome, DownloadOutcome::Skipped { .. }));
    assert_eq!(transport.call_count(), 0);

    transport.push(response(200, "new", &[]));
    download(&transport, "https://cdn.example/a", &target, true).unwrap();
    assert_eq!(fs::read_to_string(&target).unwrap(), "new");
  }

  #[test]
  fn test_failed_status_leaves_no_file() {
    let dir = tempfile::tempdir().unwrap();
    let target = dir.path().join("a.txt");
    let transport = MockTransport::new();
    transport.push(response(403, "AccessDenied", &[]));

    let err = download(&transport, "https://cdn.example/a", &target, false).unwrap_err();

    assert_eq!(err.status(), Some(403));
    assert!(!target.exists());
    assert!(!part_path(&target).exists());
  }

  #[test]
  fn test_attachments_from_comment() {
    let comment = json!({
      "id": 1,
      "attachments": [
        {"id": 10, "file_name": "log.txt", "content_url": "https://cdn.example/10", "size": 3}
      ]
    });
    let attachments = Attachment::from_comment(&comment).unwrap();
    assert_eq!(attachments.len(), 1);
    assert_eq!(attachments[0].file_name, "log.txt");

    assert!(Attachment::from_comment(&json!({"id": 2})).unwrap().is_empty());
    assert!(Attachment::from_comment(&json!({"attachments": [{"id": "x"}]})).is_err());
  }

  #[test]
  fn test_sanitize_file_name() {
    assert_eq!(sanitize_file_name("../../etc/passwd"), "_.._etc_passwd");
    assert_eq!(sanitize_file_name("a:b?.png"), "a_b_.png");
    assert_eq!(sanitize_file_name("..."), "attachment");
    assert_eq!(sanitize_file_name("report.pdf"), "report.pdf");
  }

  #[test]
  fn test_target_layout() {
    let attachment = Attachment {
      id: 10,
      file_name: "screen shot.png".to_string(),
      content_url: String::new(),
    };
    assert_eq!(
      attachment.target_in(Path::new("/tmp/att"), 42),
      PathBuf::from("/tmp/att/42/10-screen shot.png")
    );
  }
}
