//! Version inheritance and property expansion.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::{Captures, Regex};
use tracing::trace;

use super::{Manifest, ManifestDependency, ManifestError};
use crate::consts::MAX_PROPERTY_DEPTH;

static PROPERTY_RE: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(r"\$\{([^}]+)\}").expect("property pattern is valid"));

impl Manifest {
  /// Resolve this manifest against its parent chain.
  ///
  /// `ancestors` lists the already resolved parent manifests, nearest first.
  /// After this returns `Ok`, every declared dependency has a concrete
  /// version.
  ///
  /// # Errors
  ///
  /// Returns [`ManifestError::Unresolved`] naming the first dependency that is
  /// still unversioned or still contains a `${...}` reference.
  pub fn resolve(&mut self, ancestors: &[&Manifest]) -> Result<(), ManifestError> {
    self.inherit_coordinates();

    let properties = self.effective_properties(ancestors);
    self.expand(&properties);
    self.properties = properties;

    self.apply_managed_versions(ancestors);

    let manifest = self.coordinates().to_string();
    if let Some(dep) = self.dependencies.iter().find(|d| !d.is_resolved()) {
      return Err(ManifestError::Unresolved {
        manifest,
        dependency: dep.to_string(),
      });
    }

    trace!(manifest = %manifest, dependencies = self.dependencies.len(), "manifest resolved");
    Ok(())
  }

  fn inherit_coordinates(&mut self) {
    let Some(parent) = &self.parent else { return };
    if self.group.is_none() {
      self.group = Some(parent.group().to_string());
    }
    if self.version.is_none() {
      self.version = parent.version().map(str::to_string);
    }
  }

  /// Ancestor properties overridden by nearer ones, then built-ins.
  fn effective_properties(&self, ancestors: &[&Manifest]) -> BTreeMap<String, String> {
    let mut properties = BTreeMap::new();
    for ancestor in ancestors.iter().rev() {
      properties.extend(ancestor.properties.iter().map(|(k, v)| (k.clone(), v.clone())));
    }
    properties.extend(self.properties.iter().map(|(k, v)| (k.clone(), v.clone())));

    let parent = self.parent.as_ref();
    let builtins = [
      ("artifactId", Some(self.artifact.clone())),
      ("groupId", self.group.clone()),
      ("version", self.version.clone()),
      ("parent.version", parent.and_then(|p| p.version().map(str::to_string))),
      ("parent.groupId", parent.map(|p| p.group().to_string())),
    ];

    for (name, value) in builtins {
      if let Some(value) = value {
        properties.insert(format!("project.{}", name), value.clone());
        properties.insert(format!("pom.{}", name), value);
      }
    }

    properties
  }

  fn expand(&mut self, properties: &BTreeMap<String, String>) {
    self.group = self.group.as_deref().map(|g| expand_properties(g, properties));
    self.version = self.version.as_deref().map(|v| expand_properties(v, properties));
    for dep in self.dependencies.iter_mut().chain(self.managed.iter_mut()) {
      expand_dependency(dep, properties);
    }
  }

  /// Fill unversioned dependencies from the nearest managed table.
  fn apply_managed_versions(&mut self, ancestors: &[&Manifest]) {
    for i in 0..self.dependencies.len() {
      if self.dependencies[i].version.is_some() {
        continue;
      }
      let dep = &self.dependencies[i];
      let managed = std::iter::once(&self.managed)
        .chain(ancestors.iter().map(|a| &a.managed))
        .find_map(|table| table.iter().find(|m| m.same_artifact(dep) && m.version.is_some()))
        .and_then(|m| m.version.clone());

      if let Some(version) = managed {
        trace!(dependency = %self.dependencies[i], version = %version, "managed version applied");
        self.dependencies[i].version = Some(version);
      }
    }
  }
}

fn expand_dependency(dep: &mut ManifestDependency, properties: &BTreeMap<String, String>) {
  dep.group = expand_properties(&dep.group, properties);
  dep.artifact = expand_properties(&dep.artifact, properties);
  dep.version = dep.version.as_deref().map(|v| expand_properties(v, properties));
}

/// Replace `${name}` references, recursively up to a fixed depth.
///
/// Unknown names are left as they are.
pub fn expand_properties(value: &str, properties: &BTreeMap<String, String>) -> String {
  let mut current = value.to_string();
  for _ in 0..MAX_PROPERTY_DEPTH {
    if !current.contains("${") {
      break;
    }
    let next = PROPERTY_RE
      .replace_all(&current, |caps: &Captures| match properties.get(&caps[1]) {
        Some(value) => value.clone(),
        None => caps[0].to_string(),
      })
      .into_owned();
    if next == current {
      break;
    }
    current = next;
  }
  current
}
