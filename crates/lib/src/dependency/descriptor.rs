//! Artifact coordinates.
//!
//! An [`ArtifactDescriptor`] is the `(group, identifier, version?)` triple that
//! names an artifact in a repository. Descriptors are written as
//! `group:identifier(:version)` and compare by that rendered form.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;

static DESCRIPTOR_RE: LazyLock<Regex> = LazyLock::new(|| {
  Regex::new(
    r"^(?P<group>[A-Za-z0-9_.]+):(?P<identifier>[A-Za-z0-9_\-.]+)(?::(?P<version>\d+(?:\.\d+)*(?:[-.]?(?i:snapshot|alpha|beta|rc|final)\d*)?))?$",
  )
  .expect("descriptor pattern is valid")
});

/// Errors that can occur while parsing a descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DescriptorError {
  /// The string does not follow `group:identifier(:version)`.
  #[error("invalid artifact descriptor '{0}': expected group:identifier(:version)")]
  Invalid(String),
}

/// Coordinates of an artifact.
///
/// A missing version means "unresolved", or when used as a pattern, "any
/// version of this identifier".
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ArtifactDescriptor {
  group: String,
  identifier: String,
  version: Option<String>,
}

impl ArtifactDescriptor {
  /// Create a descriptor without checking the grammar.
  ///
  /// Used for coordinates read from manifests, whose versions are often richer
  /// than the command-line grammar accepts.
  pub fn new(group: impl Into<String>, identifier: impl Into<String>, version: Option<String>) -> Self {
    Self {
      group: group.into(),
      identifier: identifier.into(),
      version,
    }
  }

  /// Parse `group:identifier(:version)`.
  pub fn parse(s: &str) -> Result<Self, DescriptorError> {
    let s = s.trim();
    let caps = DESCRIPTOR_RE
      .captures(s)
      .ok_or_else(|| DescriptorError::Invalid(s.to_string()))?;

    Ok(Self {
      group: caps["group"].to_string(),
      identifier: caps["identifier"].to_string(),
      version: caps.name("version").map(|v| v.as_str().to_string()),
    })
  }

  pub fn group(&self) -> &str {
    &self.group
  }

  pub fn identifier(&self) -> &str {
    &self.identifier
  }

  pub fn version(&self) -> Option<&str> {
    self.version.as_deref()
  }

  /// True when the version is present and fully expanded.
  pub fn is_resolved(&self) -> bool {
    self.version.as_deref().is_some_and(|v| !v.is_empty() && !v.contains("${"))
  }

  /// Same group and identifier with the given version.
  pub fn with_version(&self, version: impl Into<String>) -> Self {
    Self {
      group: self.group.clone(),
      identifier: self.identifier.clone(),
      version: Some(version.into()),
    }
  }

  /// Same group and identifier, any version.
  pub fn without_version(&self) -> Self {
    Self {
      group: self.group.clone(),
      identifier: self.identifier.clone(),
      version: None,
    }
  }

  /// Relative directory of this artifact in a repository.
  ///
  /// `com.acme:widgets:1.0.0` lives at `com/acme/widgets/1.0.0`.
  pub fn path(&self) -> String {
    let group = self.group.replace('.', "/");
    match &self.version {
      Some(version) => format!("{}/{}/{}", group, self.identifier, version),
      None => format!("{}/{}", group, self.identifier),
    }
  }

  /// File name of one of this artifact's resources, e.g. `widgets-1.0.0.pom`.
  ///
  /// Returns `None` for an unversioned descriptor.
  pub fn file_name(&self, extension: &str) -> Option<String> {
    self
      .version
      .as_ref()
      .map(|version| format!("{}-{}.{}", self.identifier, version, extension))
  }

  /// Whether this descriptor is selected by `pattern`.
  ///
  /// An unversioned pattern selects every version of group+identifier. A
  /// versioned pattern only selects the exact same version.
  pub fn matches(&self, pattern: &ArtifactDescriptor) -> bool {
    if self.group != pattern.group || self.identifier != pattern.identifier {
      return false;
    }
    match &pattern.version {
      None => true,
      Some(version) => self.version.as_ref() == Some(version),
    }
  }
}

impl fmt::Display for ArtifactDescriptor {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match &self.version {
      Some(version) => write!(f, "{}:{}:{}", self.group, self.identifier, version),
      None => write!(f, "{}:{}", self.group, self.identifier),
    }
  }
}

impl FromStr for ArtifactDescriptor {
  type Err = DescriptorError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    Self::parse(s)
  }
}

impl PartialOrd for ArtifactDescriptor {
  fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
    Some(self.cmp(other))
  }
}

impl Ord for ArtifactDescriptor {
  fn cmp(&self, other: &Self) -> Ordering {
    self.to_string().cmp(&other.to_string())
  }
}
