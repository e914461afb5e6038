//! The dependency model.
//!
//! A [`Dependency`] is one of three things:
//! - an [`ArtifactDependency`]: a versioned artifact fetched from a repository
//! - a [`Library`]: an already-built artifact that is resolved, never compiled
//! - a [`Project`]: a unit that must itself be built and owns its own tree
//!
//! All three expose their immediate children through [`Dependency::dependencies`]
//! and can be narrowed with [`Dependency::excluding`].

pub mod descriptor;
pub mod set;

use std::fmt;
use std::sync::Arc;

use thiserror::Error;

use crate::build::{BuildStep, Phase, Phases};

pub use descriptor::{ArtifactDescriptor, DescriptorError};
pub use set::{DependencySet, Exclusion};

/// Errors raised when constructing the dependency model.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DependencyError {
  /// A dependency failed validation on insertion.
  #[error("invalid dependency '{id}': {reason}")]
  Invalid { id: String, reason: String },
}

/// Identity of a dependency within a set or graph.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DependencyId {
  Artifact(ArtifactDescriptor),
  Library(ArtifactDescriptor),
  Build(String),
}

impl fmt::Display for DependencyId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      DependencyId::Artifact(d) => write!(f, "artifact:{}", d),
      DependencyId::Library(d) => write!(f, "library:{}", d),
      DependencyId::Build(name) => write!(f, "build:{}", name),
    }
  }
}

/// A versioned artifact and the dependencies it declares.
#[derive(Debug, Clone)]
pub struct ArtifactDependency {
  descriptor: ArtifactDescriptor,
  children: DependencySet,
}

impl ArtifactDependency {
  pub fn descriptor(&self) -> &ArtifactDescriptor {
    &self.descriptor
  }
}

/// A dependency on an already-built artifact.
#[derive(Debug, Clone)]
pub struct Library {
  artifact: ArtifactDescriptor,
  children: DependencySet,
}

impl Library {
  pub fn artifact(&self) -> &ArtifactDescriptor {
    &self.artifact
  }
}

/// A unit that must be built, with its own dependencies and phases.
#[derive(Debug, Clone)]
pub struct Project {
  name: String,
  children: DependencySet,
  phases: Phases,
}

impl Project {
  pub fn new(name: impl Into<String>) -> Self {
    Self {
      name: name.into(),
      children: DependencySet::new(),
      phases: Phases::default(),
    }
  }

  pub fn name(&self) -> &str {
    &self.name
  }

  pub fn phases(&self) -> &Phases {
    &self.phases
  }

  /// Add a dependency; returns whether it was new.
  pub fn add_dependency(&mut self, dep: Dependency) -> Result<bool, DependencyError> {
    self.children.insert(dep)
  }

  pub fn with_dependency(mut self, dep: Dependency) -> Result<Self, DependencyError> {
    self.add_dependency(dep)?;
    Ok(self)
  }

  /// Register the callback run for `step`, replacing any previous one.
  pub fn with_phase(mut self, step: BuildStep, phase: Arc<dyn Phase>) -> Self {
    self.phases.insert(step, phase);
    self
  }
}

/// A node of the dependency tree.
///
/// Cloning is cheap: variants share their payload.
#[derive(Debug, Clone)]
pub enum Dependency {
  Artifact(Arc<ArtifactDependency>),
  Library(Arc<Library>),
  Build(Arc<Project>),
}

impl Dependency {
  /// An artifact dependency with the given children.
  pub fn artifact(
    descriptor: ArtifactDescriptor,
    children: impl IntoIterator<Item = Dependency>,
  ) -> Result<Self, DependencyError> {
    Ok(Dependency::Artifact(Arc::new(ArtifactDependency {
      descriptor,
      children: DependencySet::try_from_iter(children)?,
    })))
  }

  /// A library dependency with the given children.
  pub fn library(
    artifact: ArtifactDescriptor,
    children: impl IntoIterator<Item = Dependency>,
  ) -> Result<Self, DependencyError> {
    Ok(Dependency::Library(Arc::new(Library {
      artifact,
      children: DependencySet::try_from_iter(children)?,
    })))
  }

  pub fn build(project: Project) -> Self {
    Dependency::Build(Arc::new(project))
  }

  pub fn id(&self) -> DependencyId {
    match self {
      Dependency::Artifact(a) => DependencyId::Artifact(a.descriptor.clone()),
      Dependency::Library(l) => DependencyId::Library(l.artifact.clone()),
      Dependency::Build(p) => DependencyId::Build(p.name.clone()),
    }
  }

  /// Human-readable name: the descriptor, or the project name.
  pub fn name(&self) -> String {
    match self {
      Dependency::Artifact(a) => a.descriptor.to_string(),
      Dependency::Library(l) => l.artifact.to_string(),
      Dependency::Build(p) => p.name.clone(),
    }
  }

  /// The backing artifact, if this is not a build.
  pub fn descriptor(&self) -> Option<&ArtifactDescriptor> {
    match self {
      Dependency::Artifact(a) => Some(&a.descriptor),
      Dependency::Library(l) => Some(&l.artifact),
      Dependency::Build(_) => None,
    }
  }

  /// Immediate children, with exclusions applied.
  pub fn dependencies(&self) -> Vec<Dependency> {
    self.children().visible()
  }

  /// A copy whose children (at every depth) hide dependencies matching `predicate`.
  pub fn excluding<F>(&self, predicate: F) -> Self
  where
    F: Fn(&Dependency) -> bool + Send + Sync + 'static,
  {
    self.with_children(self.children().excluding(Arc::new(predicate)))
  }

  /// A copy that hides every artifact or library selected by `pattern`.
  pub fn excluding_artifact(&self, pattern: ArtifactDescriptor) -> Self {
    self.excluding(move |dep| dep.descriptor().is_some_and(|d| d.matches(&pattern)))
  }

  /// A copy with `extra` added to its children.
  ///
  /// Exclusions already on this node apply to the added children as well.
  pub fn with_dependencies(&self, extra: impl IntoIterator<Item = Dependency>) -> Result<Self, DependencyError> {
    let mut children = self.children().clone();
    for dep in extra {
      children.insert(dep)?;
    }
    Ok(self.with_children(children))
  }

  /// Check the invariants a set member must satisfy.
  pub fn validate(&self) -> Result<(), DependencyError> {
    match self {
      Dependency::Artifact(a) if !a.descriptor.is_resolved() => Err(DependencyError::Invalid {
        id: self.id().to_string(),
        reason: "artifact has no concrete version".to_string(),
      }),
      Dependency::Library(l) if !l.artifact.is_resolved() => Err(DependencyError::Invalid {
        id: self.id().to_string(),
        reason: "library has no concrete version".to_string(),
      }),
      Dependency::Build(p) if p.name.trim().is_empty() => Err(DependencyError::Invalid {
        id: self.id().to_string(),
        reason: "build has an empty name".to_string(),
      }),
      _ => Ok(()),
    }
  }

  pub(crate) fn with_exclusions(&self, exclusions: &[Exclusion]) -> Self {
    self.with_children(self.children().excluding_all(exclusions))
  }

  fn children(&self) -> &DependencySet {
    match self {
      Dependency::Artifact(a) => &a.children,
      Dependency::Library(l) => &l.children,
      Dependency::Build(p) => &p.children,
    }
  }

  fn with_children(&self, children: DependencySet) -> Self {
    match self {
      Dependency::Artifact(a) => Dependency::Artifact(Arc::new(ArtifactDependency {
        descriptor: a.descriptor.clone(),
        children,
      })),
      Dependency::Library(l) => Dependency::Library(Arc::new(Library {
        artifact: l.artifact.clone(),
        children,
      })),
      Dependency::Build(p) => Dependency::Build(Arc::new(Project {
        name: p.name.clone(),
        children,
        phases: p.phases.clone(),
      })),
    }
  }
}

impl fmt::Display for Dependency {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.id())
  }
}
