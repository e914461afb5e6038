//! Artifact resolution.
//!
//! The [`ArtifactResolver`] materializes artifacts into the local repository:
//!
//! 1. Already resolved: the cached [`ResolvedArtifact`] is returned.
//! 2. Present in the local repository: it is used as is.
//! 3. Otherwise remotes are searched in registration order, and the first one
//!    that has the artifact's manifest provides all of its resources.
//!
//! The manifest is then read from the local copy, its parent chain resolved
//! through the same resolver, and versions inherited and expanded.
//!
//! Every descriptor is resolved at most once: concurrent callers for the same
//! descriptor share a single resolution.

mod types;

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use futures::FutureExt;
use futures::future::BoxFuture;
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

use crate::config::ResolverConfig;
use crate::dependency::{ArtifactDescriptor, Dependency, DependencyId};
use crate::download::{CopyMode, DownloadJob, DownloadTicket, Downloader};
use crate::manifest::Manifest;
use crate::repository::{LocalRepository, RemoteRepository, Repository};

pub use types::{ResolveError, ResolvedArtifact};

type Slot = Arc<OnceCell<Arc<ResolvedArtifact>>>;

/// State of one `resolve_transitive` call.
#[derive(Default)]
struct Closure {
  seen: HashSet<DependencyId>,
  emitted: HashSet<ArtifactDescriptor>,
  artifacts: Vec<Arc<ResolvedArtifact>>,
}

/// State of one `dependency_tree` call.
#[derive(Default)]
struct TreeBuild {
  on_path: HashSet<ArtifactDescriptor>,
  built: HashMap<ArtifactDescriptor, Dependency>,
}

/// Resolves artifacts against a local repository and a list of remotes.
pub struct ArtifactResolver {
  local: LocalRepository,
  remotes: Vec<Arc<dyn Repository>>,
  downloader: Downloader,
  cache: Mutex<HashMap<ArtifactDescriptor, Slot>>,
  installs: AtomicUsize,
}

impl ArtifactResolver {
  pub fn new(local: LocalRepository, downloader: Downloader) -> Self {
    Self {
      local,
      remotes: Vec::new(),
      downloader,
      cache: Mutex::new(HashMap::new()),
      installs: AtomicUsize::new(0),
    }
  }

  /// A resolver for the repositories named in `config`.
  pub fn from_config(config: &ResolverConfig) -> Self {
    let mut resolver = Self::new(
      LocalRepository::new(&config.local_repository),
      Downloader::new(config.download_workers),
    );
    for remote in &config.remotes {
      resolver.add_remote(Arc::new(RemoteRepository::from_location(&remote.name, &remote.url)));
    }
    resolver
  }

  /// Register a remote; remotes are searched in registration order.
  pub fn add_remote(&mut self, remote: Arc<dyn Repository>) {
    self.remotes.push(remote);
  }

  pub fn with_remote(mut self, remote: impl Repository + 'static) -> Self {
    self.add_remote(Arc::new(remote));
    self
  }

  pub fn local(&self) -> &LocalRepository {
    &self.local
  }

  pub fn downloader(&self) -> &Downloader {
    &self.downloader
  }

  /// Names of every repository searched, local first.
  pub fn repository_names(&self) -> Vec<String> {
    std::iter::once(self.local.name().to_string())
      .chain(self.remotes.iter().map(|r| r.name().to_string()))
      .collect()
  }

  /// How many artifacts were installed from a remote.
  pub fn installs(&self) -> usize {
    self.installs.load(Ordering::SeqCst)
  }

  /// Every artifact resolved so far.
  pub fn cached(&self) -> Vec<Arc<ResolvedArtifact>> {
    let cache = self.cache.lock().unwrap_or_else(PoisonError::into_inner);
    let mut cached: Vec<_> = cache.values().filter_map(|slot| slot.get().cloned()).collect();
    cached.sort_by(|a, b| a.artifact.cmp(&b.artifact));
    cached
  }

  /// Resolve one artifact.
  pub async fn resolve(&self, artifact: &ArtifactDescriptor) -> Result<Arc<ResolvedArtifact>, ResolveError> {
    self.resolve_in_lineage(artifact.clone(), Vec::new()).await
  }

  /// `lineage` lists the artifacts whose parent chain led here.
  fn resolve_in_lineage(
    &self,
    artifact: ArtifactDescriptor,
    lineage: Vec<ArtifactDescriptor>,
  ) -> BoxFuture<'_, Result<Arc<ResolvedArtifact>, ResolveError>> {
    async move {
      if !artifact.is_resolved() {
        return Err(ResolveError::Unversioned(artifact));
      }

      let slot = {
        let mut cache = self.cache.lock().unwrap_or_else(PoisonError::into_inner);
        cache.entry(artifact.clone()).or_default().clone()
      };
      if let Some(resolved) = slot.get() {
        debug!(artifact = %artifact, "resolution cache hit");
        return Ok(resolved.clone());
      }

      let mut chain = lineage;
      chain.push(artifact.clone());
      let resolved = slot.get_or_try_init(|| self.materialize(&artifact, &chain)).await?;
      Ok(resolved.clone())
    }
    .boxed()
  }

  async fn materialize(
    &self,
    artifact: &ArtifactDescriptor,
    chain: &[ArtifactDescriptor],
  ) -> Result<Arc<ResolvedArtifact>, ResolveError> {
    let repository = if self.local.contains(artifact).await {
      debug!(artifact = %artifact, "found in local repository");
      self.local.name().to_string()
    } else {
      let remote = self.find_remote(artifact).await?;
      self.install(artifact, remote.as_ref()).await?;
      remote.name().to_string()
    };

    let path = self.local.manifest_path(artifact)?;
    let mut manifest = Manifest::read(&path).await.map_err(|source| ResolveError::Manifest {
      artifact: artifact.clone(),
      source,
    })?;

    let parent = match manifest.parent().cloned() {
      Some(parent) if chain.contains(&parent) => {
        let mut cycle = chain.to_vec();
        cycle.push(parent);
        return Err(ResolveError::CyclicParent { chain: cycle });
      }
      Some(parent) => {
        debug!(artifact = %artifact, parent = %parent, "resolving parent");
        Some(self.resolve_in_lineage(parent, chain.to_vec()).await?)
      }
      None => None,
    };

    {
      let ancestors: Vec<&Manifest> = parent
        .as_deref()
        .map(|p| std::iter::once(&p.manifest).chain(p.ancestors()).collect())
        .unwrap_or_default();
      manifest.resolve(&ancestors).map_err(|source| ResolveError::Manifest {
        artifact: artifact.clone(),
        source,
      })?;
    }

    info!(artifact = %artifact, repository = %repository, "resolved");
    Ok(Arc::new(ResolvedArtifact {
      artifact: artifact.clone(),
      repository,
      manifest,
      parent,
    }))
  }

  async fn find_remote(&self, artifact: &ArtifactDescriptor) -> Result<Arc<dyn Repository>, ResolveError> {
    for remote in &self.remotes {
      if remote.contains(artifact).await {
        debug!(artifact = %artifact, repository = %remote.name(), "found in remote");
        return Ok(remote.clone());
      }
    }
    Err(ResolveError::ArtifactNotFound {
      artifact: artifact.clone(),
      searched: self.repository_names(),
    })
  }

  /// Copy every resource `remote` offers for `artifact` into the local
  /// repository and wait for the jobs this call submitted or joined.
  ///
  /// The manifest marks an artifact as present, so it is copied only once
  /// every other resource landed. A failed install never leaves it behind.
  async fn install(&self, artifact: &ArtifactDescriptor, remote: &dyn Repository) -> Result<(), ResolveError> {
    info!(artifact = %artifact, repository = %remote.name(), "installing artifact");

    let directory = self.local.directory(artifact);
    let manifest = self.local.manifest_path(artifact)?;
    let mut manifest_job = None;
    let mut tickets: Vec<DownloadTicket> = Vec::new();
    for resource in remote.resources(artifact).await? {
      let Some(file) = resource.file_name() else {
        warn!(resource = %resource, "skipping resource without a file name");
        continue;
      };
      let job = DownloadJob::new(resource, directory.join(file), CopyMode::Replace);
      if job.destination() == manifest.as_path() {
        manifest_job = Some(job);
      } else {
        tickets.push(self.downloader.download(job));
      }
    }

    self.finish_all(artifact, &tickets).await?;
    if let Some(job) = manifest_job {
      self.finish_all(artifact, &[self.downloader.download(job)]).await?;
    }

    self.installs.fetch_add(1, Ordering::SeqCst);
    Ok(())
  }

  /// Wait for every ticket, then report the first failure.
  async fn finish_all(&self, artifact: &ArtifactDescriptor, tickets: &[DownloadTicket]) -> Result<(), ResolveError> {
    let mut failure = None;
    for ticket in tickets {
      if let Err(source) = ticket.finish().await {
        failure.get_or_insert(source);
      }
    }
    match failure {
      Some(source) => Err(ResolveError::Download {
        artifact: artifact.clone(),
        source,
      }),
      None => Ok(()),
    }
  }

  /// Resolve everything `dependency` needs.
  ///
  /// Artifacts resolve themselves and follow their manifest's transitive
  /// dependencies; libraries resolve their backing artifact; builds resolve
  /// nothing of their own. Declared children are followed for all three.
  /// Each artifact appears once, in first-visit order.
  pub async fn resolve_transitive(&self, dependency: &Dependency) -> Result<Vec<Arc<ResolvedArtifact>>, ResolveError> {
    let mut closure = Closure::default();
    self.collect(dependency.clone(), 0, &mut closure).await?;
    Ok(closure.artifacts)
  }

  fn collect<'a>(
    &'a self,
    dependency: Dependency,
    depth: usize,
    closure: &'a mut Closure,
  ) -> BoxFuture<'a, Result<(), ResolveError>> {
    async move {
      if !closure.seen.insert(dependency.id()) {
        return Ok(());
      }
      debug!("{:indent$}{}", "", dependency, indent = depth * 2);

      let mut next = Vec::new();
      match &dependency {
        Dependency::Artifact(a) => {
          let resolved = self.resolve(a.descriptor()).await?;
          for descriptor in resolved.transitive_dependencies() {
            next.push(Dependency::artifact(descriptor, Vec::new())?);
          }
          if closure.emitted.insert(resolved.artifact.clone()) {
            closure.artifacts.push(resolved);
          }
        }
        Dependency::Library(l) => {
          let resolved = self.resolve(l.artifact()).await?;
          if closure.emitted.insert(resolved.artifact.clone()) {
            closure.artifacts.push(resolved);
          }
        }
        Dependency::Build(_) => {}
      }

      let node = dependency.with_dependencies(next)?;
      for child in node.dependencies() {
        self.collect(child, depth + 1, closure).await?;
      }
      Ok(())
    }
    .boxed()
  }

  /// Resolve `artifact` and its transitive closure as a dependency tree.
  ///
  /// Children come from manifests. A dependency leading back to one of its
  /// own ancestors is dropped with a warning.
  pub async fn dependency_tree(&self, artifact: &ArtifactDescriptor) -> Result<Dependency, ResolveError> {
    let mut build = TreeBuild::default();
    self.tree(artifact.clone(), &mut build).await
  }

  fn tree<'a>(
    &'a self,
    artifact: ArtifactDescriptor,
    build: &'a mut TreeBuild,
  ) -> BoxFuture<'a, Result<Dependency, ResolveError>> {
    async move {
      if let Some(done) = build.built.get(&artifact) {
        return Ok(done.clone());
      }

      let resolved = self.resolve(&artifact).await?;
      build.on_path.insert(artifact.clone());

      let mut children = Vec::new();
      for child in resolved.transitive_dependencies() {
        if build.on_path.contains(&child) {
          warn!(artifact = %artifact, dependency = %child, "dropping cyclic dependency");
          continue;
        }
        children.push(self.tree(child, build).await?);
      }

      build.on_path.remove(&artifact);
      let node = Dependency::artifact(artifact.clone(), children)?;
      build.built.insert(artifact, node.clone());
      Ok(node)
    }
    .boxed()
  }
}

impl std::fmt::Debug for ArtifactResolver {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("ArtifactResolver")
      .field("local", &self.local)
      .field("remotes", &self.repository_names())
      .field("installs", &self.installs())
      .finish()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::download::Resource;
  use std::path::Path;
  use tempfile::TempDir;

  fn desc(s: &str) -> ArtifactDescriptor {
    ArtifactDescriptor::parse(s).unwrap()
  }

  fn publish(root: &Path, artifact: &str, pom: &str) {
    let d = desc(artifact);
    let dir = d.path().split('/').fold(root.to_path_buf(), |p, s| p.join(s));
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(dir.join(d.file_name("pom").unwrap()), pom).unwrap();
    std::fs::write(dir.join(d.file_name("jar").unwrap()), "jar").unwrap();
  }

  fn pom(group: &str, artifact: &str, version: &str, parent: Option<&str>, deps: &[&str]) -> String {
    let parent = parent
      .map(|p| {
        let p = desc(p);
        format!(
          "<parent><groupId>{}</groupId><artifactId>{}</artifactId><version>{}</version></parent>",
          p.group(),
          p.identifier(),
          p.version().unwrap()
        )
      })
      .unwrap_or_default();
    let deps: String = deps
      .iter()
      .map(|d| {
        let d = desc(d);
        format!(
          "<dependency><groupId>{}</groupId><artifactId>{}</artifactId><version>{}</version></dependency>",
          d.group(),
          d.identifier(),
          d.version().unwrap()
        )
      })
      .collect();
    format!(
      "<project><groupId>{}</groupId><artifactId>{}</artifactId><version>{}</version>{}<dependencies>{}</dependencies></project>",
      group, artifact, version, parent, deps
    )
  }

  struct Fixture {
    _temp: TempDir,
    remote: std::path::PathBuf,
    resolver: ArtifactResolver,
  }

  fn fixture() -> Fixture {
    let temp = TempDir::new().unwrap();
    let remote = temp.path().join("remote");
    std::fs::create_dir_all(&remote).unwrap();
    let resolver = ArtifactResolver::new(LocalRepository::new(temp.path().join("local")), Downloader::new(2))
      .with_remote(RemoteRepository::new("mirror", Resource::Path(remote.clone())));
    Fixture {
      _temp: temp,
      remote,
      resolver,
    }
  }

  #[tokio::test]
  async fn unversioned_is_rejected() {
    let f = fixture();
    assert!(matches!(
      f.resolver.resolve(&desc("org.acme:lib")).await,
      Err(ResolveError::Unversioned(_))
    ));
  }

  #[tokio::test]
  async fn cyclic_parent_chain_fails() {
    let f = fixture();
    publish(&f.remote, "org.acme:a:1", &pom("org.acme", "a", "1", Some("org.acme:b:1"), &[]));
    publish(&f.remote, "org.acme:b:1", &pom("org.acme", "b", "1", Some("org.acme:a:1"), &[]));

    match f.resolver.resolve(&desc("org.acme:a:1")).await {
      Err(ResolveError::CyclicParent { chain }) => {
        assert_eq!(chain.first(), chain.last());
        assert_eq!(chain.len(), 3);
      }
      other => panic!("expected CyclicParent, got {:?}", other.map(|r| r.artifact.clone())),
    }
  }

  #[tokio::test]
  async fn transitive_closure_is_deduplicated() {
    let f = fixture();
    publish(&f.remote, "org.acme:app:1", &pom("org.acme", "app", "1", None, &["org.acme:core:1", "org.acme:util:1"]));
    publish(&f.remote, "org.acme:core:1", &pom("org.acme", "core", "1", None, &["org.acme:util:1"]));
    publish(&f.remote, "org.acme:util:1", &pom("org.acme", "util", "1", None, &[]));

    let app = Dependency::artifact(desc("org.acme:app:1"), vec![]).unwrap();
    let resolved = f.resolver.resolve_transitive(&app).await.unwrap();
    let names: Vec<String> = resolved.iter().map(|r| r.artifact().to_string()).collect();

    assert_eq!(names, vec!["org.acme:app:1", "org.acme:core:1", "org.acme:util:1"]);
    assert_eq!(f.resolver.installs(), 3);
  }

  #[tokio::test]
  async fn build_resolves_only_its_children() {
    let f = fixture();
    publish(&f.remote, "org.acme:util:1", &pom("org.acme", "util", "1", None, &[]));

    let project = crate::dependency::Project::new("app")
      .with_dependency(Dependency::library(desc("org.acme:util:1"), vec![]).unwrap())
      .unwrap();
    let resolved = f.resolver.resolve_transitive(&Dependency::build(project)).await.unwrap();

    assert_eq!(resolved.len(), 1);
    assert_eq!(resolved[0].repository(), "mirror");
  }

  #[tokio::test]
  async fn dependency_tree_follows_manifests() {
    let f = fixture();
    publish(&f.remote, "org.acme:app:1", &pom("org.acme", "app", "1", None, &["org.acme:core:1"]));
    publish(&f.remote, "org.acme:core:1", &pom("org.acme", "core", "1", None, &["org.acme:app:1"]));

    let tree = f.resolver.dependency_tree(&desc("org.acme:app:1")).await.unwrap();
    let children = tree.dependencies();
    assert_eq!(children.len(), 1);
    assert_eq!(children[0].name(), "org.acme:core:1");
    assert!(children[0].dependencies().is_empty(), "back-edge is dropped");
  }
}
