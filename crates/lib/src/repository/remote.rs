//! Remote repositories: HTTP(S) servers or mirror directories.

use async_trait::async_trait;
use tracing::debug;

use super::{Repository, RepositoryError, resource_for};
use crate::consts::{ARTIFACT_EXTENSIONS, MANIFEST_EXTENSION};
use crate::dependency::ArtifactDescriptor;
use crate::download::Resource;

/// A named remote repository rooted at `base`.
#[derive(Debug, Clone)]
pub struct RemoteRepository {
  name: String,
  base: Resource,
  client: reqwest::Client,
}

impl RemoteRepository {
  pub fn new(name: impl Into<String>, base: Resource) -> Self {
    Self {
      name: name.into(),
      base,
      client: reqwest::Client::new(),
    }
  }

  /// A repository from a URL or directory string, see [`Resource::from_location`].
  pub fn from_location(name: impl Into<String>, location: &str) -> Self {
    Self::new(name, Resource::from_location(location))
  }

  pub fn base(&self) -> &Resource {
    &self.base
  }

  async fn exists(&self, resource: &Resource) -> Result<bool, RepositoryError> {
    match resource {
      Resource::Path(path) => tokio::fs::try_exists(path).await.map_err(|e| RepositoryError::Probe {
        resource: resource.to_string(),
        message: e.to_string(),
      }),
      Resource::Url(url) => {
        let response = self.client.head(url).send().await.map_err(|e| RepositoryError::Probe {
          resource: url.clone(),
          message: e.to_string(),
        })?;
        let status = response.status();
        debug!(url = %url, status = status.as_u16(), "probed");
        if status.is_success() {
          Ok(true)
        } else if status == reqwest::StatusCode::NOT_FOUND || status == reqwest::StatusCode::GONE {
          Ok(false)
        } else {
          Err(RepositoryError::Probe {
            resource: url.clone(),
            message: format!("HTTP {}", status),
          })
        }
      }
    }
  }
}

#[async_trait]
impl Repository for RemoteRepository {
  fn name(&self) -> &str {
    &self.name
  }

  fn is_remote(&self) -> bool {
    true
  }

  fn path_to(&self, artifact: &ArtifactDescriptor) -> Resource {
    self.base.join(&artifact.path())
  }

  async fn resources(&self, artifact: &ArtifactDescriptor) -> Result<Vec<Resource>, RepositoryError> {
    let mut found = Vec::new();
    for extension in ARTIFACT_EXTENSIONS {
      let resource = resource_for(self, artifact, extension)?;
      if self.exists(&resource).await? {
        found.push(resource);
      }
    }
    Ok(found)
  }

  async fn has_manifest(&self, artifact: &ArtifactDescriptor) -> Result<bool, RepositoryError> {
    let manifest = resource_for(self, artifact, MANIFEST_EXTENSION)?;
    self.exists(&manifest).await
  }
}
