//! Artifact repositories.
//!
//! A repository stores artifacts under
//! `<group-as-path>/<identifier>/<version>/<identifier>-<version>.<ext>`.
//! The [`LocalRepository`] is the cache every resolved artifact is installed
//! into; [`RemoteRepository`]s are searched when the cache misses.

pub mod local;
pub mod remote;

use async_trait::async_trait;
use thiserror::Error;
use tracing::warn;

use crate::dependency::ArtifactDescriptor;
use crate::download::Resource;

pub use local::LocalRepository;
pub use remote::RemoteRepository;

/// Errors that can occur while querying a repository.
#[derive(Debug, Error)]
pub enum RepositoryError {
  #[error("artifact {0} has no version")]
  Unversioned(ArtifactDescriptor),

  #[error("failed to probe {resource}: {message}")]
  Probe { resource: String, message: String },
}

/// A place artifacts can be found in.
#[async_trait]
pub trait Repository: Send + Sync {
  fn name(&self) -> &str;

  fn is_remote(&self) -> bool;

  /// Location of the artifact's version directory.
  fn path_to(&self, artifact: &ArtifactDescriptor) -> Resource;

  /// Resource files this repository offers for `artifact`.
  async fn resources(&self, artifact: &ArtifactDescriptor) -> Result<Vec<Resource>, RepositoryError>;

  /// Whether the repository has the artifact's manifest.
  ///
  /// Probe failures count as absent and are logged.
  async fn contains(&self, artifact: &ArtifactDescriptor) -> bool {
    match self.has_manifest(artifact).await {
      Ok(found) => found,
      Err(e) => {
        warn!(repository = %self.name(), artifact = %artifact, error = %e, "repository probe failed");
        false
      }
    }
  }

  /// Probe for the artifact's manifest.
  async fn has_manifest(&self, artifact: &ArtifactDescriptor) -> Result<bool, RepositoryError>;
}

/// The resource `<dir>/<identifier>-<version>.<ext>`.
pub(crate) fn resource_for(
  repository: &dyn Repository,
  artifact: &ArtifactDescriptor,
  extension: &str,
) -> Result<Resource, RepositoryError> {
  let file = artifact
    .file_name(extension)
    .ok_or_else(|| RepositoryError::Unversioned(artifact.clone()))?;
  Ok(repository.path_to(artifact).join(&file))
}
