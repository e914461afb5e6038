//! Resolver configuration.
//!
//! Read from a JSON file (by default `$XDG_CONFIG_HOME/kiln/config.json`):
//!
//! ```json
//! {
//!   "local_repository": "/home/me/.cache/kiln/repository",
//!   "remotes": [{ "name": "central", "url": "https://repo.maven.apache.org/maven2" }],
//!   "download_workers": 8
//! }
//! ```
//!
//! Every field is optional.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::consts::{DEFAULT_DOWNLOAD_WORKERS, MAVEN_CENTRAL_NAME, MAVEN_CENTRAL_URL};
use crate::platform::paths::repository_dir;

#[derive(Debug, Error)]
pub enum ConfigError {
  #[error("failed to read config {}", path.display())]
  Read {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("invalid config {}", path.display())]
  Parse {
    path: PathBuf,
    #[source]
    source: serde_json::Error,
  },
}

/// A remote repository entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteConfig {
  pub name: String,

  /// `http(s)://` URL, `file://` URL or directory.
  pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
  pub local_repository: PathBuf,
  pub remotes: Vec<RemoteConfig>,
  pub download_workers: usize,
}

impl Default for ResolverConfig {
  fn default() -> Self {
    Self {
      local_repository: repository_dir(),
      remotes: vec![RemoteConfig {
        name: MAVEN_CENTRAL_NAME.to_string(),
        url: MAVEN_CENTRAL_URL.to_string(),
      }],
      download_workers: DEFAULT_DOWNLOAD_WORKERS,
    }
  }
}

impl ResolverConfig {
  pub fn load(path: &Path) -> Result<Self, ConfigError> {
    let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
      path: path.to_path_buf(),
      source,
    })?;
    let config = serde_json::from_str(&contents).map_err(|source| ConfigError::Parse {
      path: path.to_path_buf(),
      source,
    })?;
    debug!(path = ?path, "loaded config");
    Ok(config)
  }

  /// Load `path`, or the defaults when it does not exist.
  pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
    if path.exists() {
      Self::load(path)
    } else {
      debug!(path = ?path, "no config file, using defaults");
      Ok(Self::default())
    }
  }
}
