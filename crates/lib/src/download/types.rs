//! Download job types.

use std::fmt;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Errors that can occur while copying a resource.
#[derive(Debug, Error)]
pub enum DownloadError {
  #[error("failed to read {}", path.display())]
  Read {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("failed to write {}", path.display())]
  Write {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("failed to fetch {url}: {message}")]
  Fetch { url: String, message: String },

  #[error("failed to fetch {url}: HTTP {status}")]
  Status { url: String, status: u16 },

  /// An awaited job ended in failure.
  #[error("download of {resource} to {} failed: {reason}", destination.display())]
  Failed {
    resource: String,
    destination: PathBuf,
    reason: String,
  },
}

/// Location of a resource: a local file or an HTTP(S) URL.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Resource {
  Path(PathBuf),
  Url(String),
}

impl Resource {
  /// Parse a location: `http(s)://` URLs, `file://` URLs and plain paths.
  pub fn from_location(location: &str) -> Self {
    if location.starts_with("http://") || location.starts_with("https://") {
      Resource::Url(location.trim_end_matches('/').to_string())
    } else if let Some(path) = location.strip_prefix("file://") {
      Resource::Path(PathBuf::from(path))
    } else {
      Resource::Path(PathBuf::from(location))
    }
  }

  /// Append a relative `/`-separated path.
  pub fn join(&self, relative: &str) -> Self {
    match self {
      Resource::Path(base) => Resource::Path(relative.split('/').fold(base.clone(), |p, seg| p.join(seg))),
      Resource::Url(base) => Resource::Url(format!("{}/{}", base.trim_end_matches('/'), relative)),
    }
  }

  /// Last path segment.
  pub fn file_name(&self) -> Option<String> {
    match self {
      Resource::Path(p) => p.file_name().map(|n| n.to_string_lossy().into_owned()),
      Resource::Url(u) => u.rsplit('/').next().filter(|n| !n.is_empty()).map(str::to_string),
    }
  }

  pub fn as_path(&self) -> Option<&Path> {
    match self {
      Resource::Path(p) => Some(p),
      Resource::Url(_) => None,
    }
  }
}

impl fmt::Display for Resource {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Resource::Path(p) => write!(f, "{}", p.display()),
      Resource::Url(u) => f.write_str(u),
    }
  }
}

/// What to do when the destination already exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CopyMode {
  /// Overwrite the destination.
  #[default]
  Replace,
  /// An existing destination counts as downloaded.
  KeepExisting,
}

/// A copy from a source resource to a local destination.
///
/// Two jobs are the same job when source and destination match; the copy
/// mode does not take part in identity.
#[derive(Debug, Clone)]
pub struct DownloadJob {
  source: Resource,
  destination: PathBuf,
  mode: CopyMode,
}

impl DownloadJob {
  pub fn new(source: Resource, destination: impl Into<PathBuf>, mode: CopyMode) -> Self {
    Self {
      source,
      destination: destination.into(),
      mode,
    }
  }

  pub fn source(&self) -> &Resource {
    &self.source
  }

  pub fn destination(&self) -> &Path {
    &self.destination
  }

  pub fn mode(&self) -> CopyMode {
    self.mode
  }

  pub(crate) fn key(&self) -> JobKey {
    (self.source.clone(), self.destination.clone())
  }
}

impl PartialEq for DownloadJob {
  fn eq(&self, other: &Self) -> bool {
    self.source == other.source && self.destination == other.destination
  }
}

impl Eq for DownloadJob {}

impl fmt::Display for DownloadJob {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{} -> {}", self.source, self.destination.display())
  }
}

pub(crate) type JobKey = (Resource, PathBuf);

/// Lifecycle of a job: `Waiting`, then `Downloading`, then one terminal state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadStatus {
  Waiting,
  Downloading,
  Downloaded,
  Failed(String),
}

impl DownloadStatus {
  pub fn is_terminal(&self) -> bool {
    matches!(self, DownloadStatus::Downloaded | DownloadStatus::Failed(_))
  }

  pub fn is_downloaded(&self) -> bool {
    *self == DownloadStatus::Downloaded
  }
}

impl fmt::Display for DownloadStatus {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      DownloadStatus::Waiting => f.write_str("waiting"),
      DownloadStatus::Downloading => f.write_str("downloading"),
      DownloadStatus::Downloaded => f.write_str("downloaded"),
      DownloadStatus::Failed(reason) => write!(f, "failed: {}", reason),
    }
  }
}
