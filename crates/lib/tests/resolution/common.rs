use std::path::{Path, PathBuf};
use std::sync::Arc;

use kiln_lib::dependency::ArtifactDescriptor;
use kiln_lib::download::{Downloader, Resource};
use kiln_lib::repository::{LocalRepository, RemoteRepository};
use kiln_lib::resolve::ArtifactResolver;
use tempfile::TempDir;

pub fn desc(s: &str) -> ArtifactDescriptor {
  ArtifactDescriptor::parse(s).unwrap()
}

/// A local repository and one mirror directory acting as a remote.
pub struct TestRepos {
  pub temp: TempDir,
  pub resolver: Arc<ArtifactResolver>,
}

impl TestRepos {
  pub fn new() -> Self {
    let temp = TempDir::new().unwrap();
    std::fs::create_dir_all(temp.path().join("mirror")).unwrap();
    let resolver = ArtifactResolver::new(LocalRepository::new(temp.path().join("local")), Downloader::new(4))
      .with_remote(RemoteRepository::new("mirror", Resource::Path(temp.path().join("mirror"))));
    Self {
      temp,
      resolver: Arc::new(resolver),
    }
  }

  pub fn mirror(&self) -> PathBuf {
    self.temp.path().join("mirror")
  }

  pub fn local(&self) -> PathBuf {
    self.temp.path().join("local")
  }

  /// Publish `artifact` to the mirror with a manifest body and a jar.
  pub fn publish(&self, artifact: &str, body: &str) {
    publish_to(&self.mirror(), artifact, body);
  }

  /// Publish `artifact` with plain versioned dependencies.
  pub fn publish_simple(&self, artifact: &str, deps: &[&str]) {
    let deps: String = deps.iter().map(|d| dependency_xml(&desc(d))).collect();
    self.publish(artifact, &format!("<dependencies>{}</dependencies>", deps));
  }

  /// Replace `artifact`'s published jar with a directory so copying it fails.
  pub fn break_jar(&self, artifact: &str) {
    let d = desc(artifact);
    let dir = d.path().split('/').fold(self.mirror(), |p, s| p.join(s));
    let jar = dir.join(d.file_name("jar").unwrap());
    std::fs::remove_file(&jar).unwrap();
    std::fs::create_dir(&jar).unwrap();
  }
}

pub fn dependency_xml(d: &ArtifactDescriptor) -> String {
  let version = d
    .version()
    .map(|v| format!("<version>{}</version>", v))
    .unwrap_or_default();
  format!(
    "<dependency><groupId>{}</groupId><artifactId>{}</artifactId>{}</dependency>",
    d.group(),
    d.identifier(),
    version
  )
}

pub fn publish_to(root: &Path, artifact: &str, body: &str) {
  let d = desc(artifact);
  let dir = d.path().split('/').fold(root.to_path_buf(), |p, s| p.join(s));
  std::fs::create_dir_all(&dir).unwrap();
  let pom = format!(
    "<project><groupId>{}</groupId><artifactId>{}</artifactId><version>{}</version>{}</project>",
    d.group(),
    d.identifier(),
    d.version().unwrap(),
    body
  );
  std::fs::write(dir.join(d.file_name("pom").unwrap()), pom).unwrap();
  std::fs::write(dir.join(d.file_name("jar").unwrap()), "jar").unwrap();
}
