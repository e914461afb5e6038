//! Artifact manifests (POM files).
//!
//! Only the parts of a POM that matter for resolution are read: the
//! artifact's own coordinates, its parent, its properties, its declared
//! dependencies and its managed dependency table. Everything else in the
//! document is ignored.
//!
//! A freshly parsed [`Manifest`] may still contain unversioned dependencies
//! and `${...}` references; [`Manifest::resolve`] fills them in from the
//! parent chain.

mod resolve;

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::Deserialize;
use thiserror::Error;

use crate::dependency::ArtifactDescriptor;

/// Errors that can occur while reading or resolving a manifest.
#[derive(Debug, Error)]
pub enum ManifestError {
  #[error("failed to read manifest {}", path.display())]
  Io {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("malformed manifest: {0}")]
  Parse(#[from] quick_xml::DeError),

  /// A dependency still has no concrete version after inheritance and
  /// property expansion.
  #[error("manifest {manifest} has unresolved dependency {dependency}")]
  Unresolved { manifest: String, dependency: String },
}

/// Maven dependency scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Scope {
  #[default]
  Compile,
  Provided,
  Runtime,
  Test,
  System,
  Import,
}

impl Scope {
  /// Whether dependencies in this scope are followed transitively.
  pub fn is_transitive(self) -> bool {
    matches!(self, Scope::Compile | Scope::Runtime)
  }

  pub fn name(self) -> &'static str {
    match self {
      Scope::Compile => "compile",
      Scope::Provided => "provided",
      Scope::Runtime => "runtime",
      Scope::Test => "test",
      Scope::System => "system",
      Scope::Import => "import",
    }
  }
}

impl fmt::Display for Scope {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.name())
  }
}

impl FromStr for Scope {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.trim() {
      "" | "compile" => Ok(Scope::Compile),
      "provided" => Ok(Scope::Provided),
      "runtime" => Ok(Scope::Runtime),
      "test" => Ok(Scope::Test),
      "system" => Ok(Scope::System),
      "import" => Ok(Scope::Import),
      other => Err(other.to_string()),
    }
  }
}

/// One `<dependency>` entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestDependency {
  pub group: String,
  pub artifact: String,
  pub version: Option<String>,
  pub scope: Scope,
  pub optional: bool,
}

impl ManifestDependency {
  pub fn new(group: impl Into<String>, artifact: impl Into<String>, version: Option<String>) -> Self {
    Self {
      group: group.into(),
      artifact: artifact.into(),
      version,
      scope: Scope::default(),
      optional: false,
    }
  }

  pub fn descriptor(&self) -> ArtifactDescriptor {
    ArtifactDescriptor::new(&self.group, &self.artifact, self.version.clone())
  }

  /// True when the entry carries a concrete, fully expanded version.
  pub fn is_resolved(&self) -> bool {
    self.descriptor().is_resolved() && !self.group.contains("${") && !self.artifact.contains("${")
  }

  /// Whether this entry is followed when collecting transitive dependencies.
  pub fn is_transitive(&self) -> bool {
    self.scope.is_transitive() && !self.optional
  }

  fn same_artifact(&self, other: &ManifestDependency) -> bool {
    self.group == other.group && self.artifact == other.artifact
  }
}

impl fmt::Display for ManifestDependency {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.descriptor())
  }
}

/// The resolution-relevant content of a POM.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Manifest {
  group: Option<String>,
  artifact: String,
  version: Option<String>,
  parent: Option<ArtifactDescriptor>,
  dependencies: Vec<ManifestDependency>,
  managed: Vec<ManifestDependency>,
  properties: BTreeMap<String, String>,
}

impl Manifest {
  /// Parse a POM document.
  pub fn parse(xml: &str) -> Result<Self, ManifestError> {
    let raw: RawProject = quick_xml::de::from_str(xml)?;
    Ok(raw.into())
  }

  /// Read and parse a POM file.
  pub async fn read(path: &Path) -> Result<Self, ManifestError> {
    let xml = tokio::fs::read_to_string(path).await.map_err(|source| ManifestError::Io {
      path: path.to_path_buf(),
      source,
    })?;
    Self::parse(&xml)
  }

  /// This manifest's own coordinates.
  ///
  /// Group and version may be empty or missing before [`Manifest::resolve`]
  /// has inherited them from the parent.
  pub fn coordinates(&self) -> ArtifactDescriptor {
    ArtifactDescriptor::new(
      self.group.clone().unwrap_or_default(),
      &self.artifact,
      self.version.clone(),
    )
  }

  pub fn parent(&self) -> Option<&ArtifactDescriptor> {
    self.parent.as_ref()
  }

  /// Declared dependencies, in document order.
  pub fn dependencies(&self) -> &[ManifestDependency] {
    &self.dependencies
  }

  /// Entries of the managed dependency table.
  pub fn managed(&self) -> &[ManifestDependency] {
    &self.managed
  }

  /// Properties declared by this manifest (after resolution: the effective ones).
  pub fn properties(&self) -> &BTreeMap<String, String> {
    &self.properties
  }

  /// True when every declared dependency has a concrete version.
  pub fn is_resolved(&self) -> bool {
    self.dependencies.iter().all(ManifestDependency::is_resolved)
  }
}

// Raw document shapes.

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawProject {
  group_id: Option<String>,
  artifact_id: String,
  version: Option<String>,
  parent: Option<RawParent>,
  #[serde(default)]
  properties: BTreeMap<String, String>,
  dependencies: Option<RawDependencies>,
  dependency_management: Option<RawDependencyManagement>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawParent {
  group_id: String,
  artifact_id: String,
  version: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct RawDependencies {
  #[serde(default)]
  dependency: Vec<RawDependency>,
}

/// Accepts both `dependencyManagement/dependencies/dependency` and the flat
/// `dependencyManagement/dependency` form.
#[derive(Debug, Default, Deserialize)]
struct RawDependencyManagement {
  dependencies: Option<RawDependencies>,
  #[serde(default)]
  dependency: Vec<RawDependency>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawDependency {
  group_id: String,
  artifact_id: String,
  version: Option<String>,
  scope: Option<String>,
  optional: Option<String>,
}

fn non_empty(value: Option<String>) -> Option<String> {
  value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

impl From<RawDependency> for ManifestDependency {
  fn from(raw: RawDependency) -> Self {
    let scope = raw
      .scope
      .as_deref()
      .map(|s| {
        s.parse().unwrap_or_else(|unknown| {
          tracing::warn!(scope = %unknown, artifact = %raw.artifact_id, "unknown scope, treating as compile");
          Scope::Compile
        })
      })
      .unwrap_or_default();

    Self {
      group: raw.group_id.trim().to_string(),
      artifact: raw.artifact_id.trim().to_string(),
      version: non_empty(raw.version),
      scope,
      optional: raw.optional.as_deref().is_some_and(|o| o.trim() == "true"),
    }
  }
}

impl From<RawProject> for Manifest {
  fn from(raw: RawProject) -> Self {
    let parent = raw.parent.map(|p| {
      ArtifactDescriptor::new(p.group_id.trim(), p.artifact_id.trim(), non_empty(p.version))
    });

    let dependencies = raw
      .dependencies
      .map(|d| d.dependency.into_iter().map(Into::into).collect())
      .unwrap_or_default();

    let managed = raw
      .dependency_management
      .map(|m| {
        m.dependencies
          .unwrap_or_default()
          .dependency
          .into_iter()
          .chain(m.dependency)
          .map(Into::into)
          .collect()
      })
      .unwrap_or_default();

    let properties = raw
      .properties
      .into_iter()
      .map(|(k, v)| (k, v.trim().to_string()))
      .collect();

    Self {
      group: non_empty(raw.group_id),
      artifact: raw.artifact_id.trim().to_string(),
      version: non_empty(raw.version),
      parent,
      dependencies,
      managed,
      properties,
    }
  }
}
