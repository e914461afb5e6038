//! The copy primitive behind every download job.

use std::io::Write;
use std::path::Path;

use tokio::fs;
use tracing::debug;

use super::types::{CopyMode, DownloadError, DownloadJob, Resource};

/// Result of a successful copy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CopyOutcome {
  /// Bytes were written to the destination.
  Copied(usize),
  /// The destination already existed and was kept.
  Kept,
}

/// Copy `job.source()` to `job.destination()`.
///
/// The bytes land in a temporary file next to the destination which is then
/// renamed into place, so a partially written destination is never visible.
pub async fn copy(job: &DownloadJob, client: &reqwest::Client) -> Result<CopyOutcome, DownloadError> {
  let destination = job.destination();

  if job.mode() == CopyMode::KeepExisting && fs::try_exists(destination).await.unwrap_or(false) {
    debug!(destination = ?destination, "destination exists, keeping it");
    return Ok(CopyOutcome::Kept);
  }

  let bytes = fetch(job.source(), client).await?;
  let size = bytes.len();
  write_atomic(destination, bytes).await?;

  debug!(source = %job.source(), destination = ?destination, size, "copied");
  Ok(CopyOutcome::Copied(size))
}

async fn fetch(source: &Resource, client: &reqwest::Client) -> Result<Vec<u8>, DownloadError> {
  match source {
    Resource::Path(path) => fs::read(path).await.map_err(|source| DownloadError::Read {
      path: path.clone(),
      source,
    }),
    Resource::Url(url) => {
      let response = client.get(url).send().await.map_err(|e| DownloadError::Fetch {
        url: url.clone(),
        message: e.to_string(),
      })?;

      if !response.status().is_success() {
        return Err(DownloadError::Status {
          url: url.clone(),
          status: response.status().as_u16(),
        });
      }

      let bytes = response.bytes().await.map_err(|e| DownloadError::Fetch {
        url: url.clone(),
        message: e.to_string(),
      })?;
      Ok(bytes.to_vec())
    }
  }
}

async fn write_atomic(destination: &Path, bytes: Vec<u8>) -> Result<(), DownloadError> {
  let write_error = |source| DownloadError::Write {
    path: destination.to_path_buf(),
    source,
  };

  let parent = destination.parent().unwrap_or_else(|| Path::new("."));
  fs::create_dir_all(parent).await.map_err(write_error)?;

  let parent = parent.to_path_buf();
  let target = destination.to_path_buf();
  let result = tokio::task::spawn_blocking(move || -> std::io::Result<()> {
    let mut file = tempfile::NamedTempFile::new_in(&parent)?;
    file.write_all(&bytes)?;
    file.flush()?;
    file.persist(&target).map_err(|e| e.error)?;
    Ok(())
  })
  .await
  .map_err(|e| write_error(std::io::Error::other(e)))?;

  result.map_err(write_error)
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::path::PathBuf;
  use tempfile::TempDir;

  fn job(source: &Path, destination: &Path, mode: CopyMode) -> DownloadJob {
    DownloadJob::new(Resource::Path(source.to_path_buf()), destination, mode)
  }

  #[tokio::test]
  async fn copies_into_missing_directories() {
    let temp = TempDir::new().unwrap();
    let source = temp.path().join("a.pom");
    std::fs::write(&source, "<project/>").unwrap();
    let destination = temp.path().join("repo/org/acme/a.pom");

    let outcome = copy(&job(&source, &destination, CopyMode::Replace), &reqwest::Client::new())
      .await
      .unwrap();

    assert_eq!(outcome, CopyOutcome::Copied(10));
    assert_eq!(std::fs::read_to_string(&destination).unwrap(), "<project/>");
  }

  #[tokio::test]
  async fn keep_existing_does_not_overwrite() {
    let temp = TempDir::new().unwrap();
    let source = temp.path().join("new.jar");
    let destination = temp.path().join("old.jar");
    std::fs::write(&source, "new").unwrap();
    std::fs::write(&destination, "old").unwrap();

    let client = reqwest::Client::new();
    let outcome = copy(&job(&source, &destination, CopyMode::KeepExisting), &client)
      .await
      .unwrap();
    assert_eq!(outcome, CopyOutcome::Kept);
    assert_eq!(std::fs::read_to_string(&destination).unwrap(), "old");

    copy(&job(&source, &destination, CopyMode::Replace), &client).await.unwrap();
    assert_eq!(std::fs::read_to_string(&destination).unwrap(), "new");
  }

  #[tokio::test]
  async fn missing_source_is_a_read_error() {
    let temp = TempDir::new().unwrap();
    let result = copy(
      &job(&PathBuf::from("/nonexistent/kiln/a.jar"), &temp.path().join("a.jar"), CopyMode::Replace),
      &reqwest::Client::new(),
    )
    .await;

    assert!(matches!(result, Err(DownloadError::Read { .. })));
    assert!(!temp.path().join("a.jar").exists());
  }
}
