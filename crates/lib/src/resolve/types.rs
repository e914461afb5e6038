//! Resolution results and errors.

use std::sync::Arc;

use thiserror::Error;

use crate::dependency::{ArtifactDescriptor, DependencyError};
use crate::download::DownloadError;
use crate::manifest::{Manifest, ManifestError};
use crate::repository::RepositoryError;

/// Errors that can occur while resolving artifacts.
#[derive(Debug, Error)]
pub enum ResolveError {
  /// Only versioned descriptors can be resolved.
  #[error("cannot resolve {0}: no version given")]
  Unversioned(ArtifactDescriptor),

  /// No repository has the artifact.
  #[error("artifact {artifact} not found in any of: {}", searched.join(", "))]
  ArtifactNotFound {
    artifact: ArtifactDescriptor,
    searched: Vec<String>,
  },

  /// A parent chain leads back to one of its own members.
  #[error("cyclic parent chain: {}", chain.iter().map(ToString::to_string).collect::<Vec<_>>().join(" -> "))]
  CyclicParent { chain: Vec<ArtifactDescriptor> },

  #[error("manifest of {artifact} could not be resolved")]
  Manifest {
    artifact: ArtifactDescriptor,
    #[source]
    source: ManifestError,
  },

  #[error("failed to install {artifact}")]
  Download {
    artifact: ArtifactDescriptor,
    #[source]
    source: DownloadError,
  },

  #[error(transparent)]
  Repository(#[from] RepositoryError),

  #[error(transparent)]
  Dependency(#[from] DependencyError),
}

/// An artifact materialized in the local repository, with its manifest
/// resolved against its parent chain.
#[derive(Debug)]
pub struct ResolvedArtifact {
  pub(crate) artifact: ArtifactDescriptor,
  pub(crate) repository: String,
  pub(crate) manifest: Manifest,
  pub(crate) parent: Option<Arc<ResolvedArtifact>>,
}

impl ResolvedArtifact {
  pub fn artifact(&self) -> &ArtifactDescriptor {
    &self.artifact
  }

  /// Name of the repository the artifact was found in.
  pub fn repository(&self) -> &str {
    &self.repository
  }

  pub fn manifest(&self) -> &Manifest {
    &self.manifest
  }

  pub fn parent(&self) -> Option<&Arc<ResolvedArtifact>> {
    self.parent.as_ref()
  }

  /// Manifests of the parent chain, nearest first.
  pub fn ancestors(&self) -> Vec<&Manifest> {
    let mut ancestors = Vec::new();
    let mut next = self.parent.as_deref();
    while let Some(parent) = next {
      ancestors.push(&parent.manifest);
      next = parent.parent.as_deref();
    }
    ancestors
  }

  /// Descriptors of the manifest dependencies followed transitively.
  pub fn transitive_dependencies(&self) -> Vec<ArtifactDescriptor> {
    self
      .manifest
      .dependencies()
      .iter()
      .filter(|d| d.is_transitive())
      .map(|d| d.descriptor())
      .collect()
  }
}
