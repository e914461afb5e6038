//! The local repository.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;

use super::{Repository, RepositoryError, resource_for};
use crate::consts::{ARTIFACT_EXTENSIONS, LOCAL_REPOSITORY_NAME, MANIFEST_EXTENSION};
use crate::dependency::ArtifactDescriptor;
use crate::download::Resource;
use crate::platform::paths::repository_dir;

/// Directory-backed cache of installed artifacts.
#[derive(Debug, Clone)]
pub struct LocalRepository {
  root: PathBuf,
}

impl Default for LocalRepository {
  fn default() -> Self {
    Self::new(repository_dir())
  }
}

impl LocalRepository {
  pub fn new(root: impl Into<PathBuf>) -> Self {
    Self { root: root.into() }
  }

  pub fn root(&self) -> &Path {
    &self.root
  }

  /// Directory holding the artifact's files.
  pub fn directory(&self, artifact: &ArtifactDescriptor) -> PathBuf {
    artifact.path().split('/').fold(self.root.clone(), |p, seg| p.join(seg))
  }

  /// Where `artifact`'s file with `extension` lives (or would be installed).
  pub fn file(&self, artifact: &ArtifactDescriptor, extension: &str) -> Result<PathBuf, RepositoryError> {
    let name = artifact
      .file_name(extension)
      .ok_or_else(|| RepositoryError::Unversioned(artifact.clone()))?;
    Ok(self.directory(artifact).join(name))
  }

  pub fn manifest_path(&self, artifact: &ArtifactDescriptor) -> Result<PathBuf, RepositoryError> {
    self.file(artifact, MANIFEST_EXTENSION)
  }
}

#[async_trait]
impl Repository for LocalRepository {
  fn name(&self) -> &str {
    LOCAL_REPOSITORY_NAME
  }

  fn is_remote(&self) -> bool {
    false
  }

  fn path_to(&self, artifact: &ArtifactDescriptor) -> Resource {
    Resource::Path(self.directory(artifact))
  }

  async fn resources(&self, artifact: &ArtifactDescriptor) -> Result<Vec<Resource>, RepositoryError> {
    let mut found = Vec::new();
    for extension in ARTIFACT_EXTENSIONS {
      let resource = resource_for(self, artifact, extension)?;
      let exists = match &resource {
        Resource::Path(path) => fs::try_exists(path).await.unwrap_or(false),
        Resource::Url(_) => false,
      };
      if exists {
        found.push(resource);
      }
    }
    Ok(found)
  }

  async fn has_manifest(&self, artifact: &ArtifactDescriptor) -> Result<bool, RepositoryError> {
    let path = self.manifest_path(artifact)?;
    fs::try_exists(&path).await.map_err(|e| RepositoryError::Probe {
      resource: path.display().to_string(),
      message: e.to_string(),
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use tempfile::TempDir;

  fn desc(s: &str) -> ArtifactDescriptor {
    ArtifactDescriptor::parse(s).unwrap()
  }

  #[test]
  fn layout() {
    let repo = LocalRepository::new("/repo");
    let widgets = desc("com.acme:widgets:1.0.0");
    assert_eq!(
      repo.manifest_path(&widgets).unwrap(),
      PathBuf::from("/repo/com/acme/widgets/1.0.0/widgets-1.0.0.pom")
    );
    assert!(matches!(
      repo.file(&desc("com.acme:widgets"), "jar"),
      Err(RepositoryError::Unversioned(_))
    ));
  }

  #[tokio::test]
  async fn contains_requires_the_manifest() {
    let temp = TempDir::new().unwrap();
    let repo = LocalRepository::new(temp.path());
    let widgets = desc("com.acme:widgets:1.0.0");

    let jar = repo.file(&widgets, "jar").unwrap();
    std::fs::create_dir_all(jar.parent().unwrap()).unwrap();
    std::fs::write(&jar, "jar").unwrap();
    assert!(!repo.contains(&widgets).await);

    std::fs::write(repo.manifest_path(&widgets).unwrap(), "<project/>").unwrap();
    assert!(repo.contains(&widgets).await);
    assert_eq!(repo.resources(&widgets).await.unwrap().len(), 2);
  }

  #[tokio::test]
  async fn unversioned_is_never_contained() {
    let temp = TempDir::new().unwrap();
    assert!(!LocalRepository::new(temp.path()).contains(&desc("com.acme:widgets")).await);
  }
}
