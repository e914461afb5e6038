//! Set of immediate dependencies with read-time exclusions.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use super::{Dependency, DependencyError, DependencyId};

/// Predicate selecting dependencies to hide.
pub type Exclusion = Arc<dyn Fn(&Dependency) -> bool + Send + Sync>;

/// The immediate children of a dependency.
///
/// Members are unique by [`DependencyId`]; insertion order carries no meaning.
/// Every member is validated when inserted. Exclusions never remove members:
/// they are applied each time the set is read, and are handed down to the
/// children that are returned so they hold for the whole subtree.
#[derive(Clone, Default)]
pub struct DependencySet {
  members: Vec<Dependency>,
  ids: HashSet<DependencyId>,
  exclusions: Vec<Exclusion>,
}

impl DependencySet {
  pub fn new() -> Self {
    Self::default()
  }

  /// Build a set, validating every member.
  pub fn try_from_iter(deps: impl IntoIterator<Item = Dependency>) -> Result<Self, DependencyError> {
    let mut set = Self::new();
    for dep in deps {
      set.insert(dep)?;
    }
    Ok(set)
  }

  /// Insert a dependency.
  ///
  /// Returns `Ok(false)` when a member with the same identity is already
  /// present, and an error when the dependency is invalid.
  pub fn insert(&mut self, dep: Dependency) -> Result<bool, DependencyError> {
    dep.validate()?;
    if !self.ids.insert(dep.id()) {
      return Ok(false);
    }
    self.members.push(dep);
    Ok(true)
  }

  /// Visible members, with this set's exclusions carried into each of them.
  pub fn visible(&self) -> Vec<Dependency> {
    self
      .members
      .iter()
      .filter(|dep| !self.is_excluded(dep))
      .map(|dep| {
        if self.exclusions.is_empty() {
          dep.clone()
        } else {
          dep.with_exclusions(&self.exclusions)
        }
      })
      .collect()
  }

  /// Number of visible members.
  pub fn len(&self) -> usize {
    self.members.iter().filter(|dep| !self.is_excluded(dep)).count()
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }

  /// Whether a visible member has this identity.
  pub fn contains(&self, id: &DependencyId) -> bool {
    self.members.iter().any(|dep| &dep.id() == id && !self.is_excluded(dep))
  }

  /// A copy of this set that additionally hides members matching `exclusion`.
  pub fn excluding(&self, exclusion: Exclusion) -> Self {
    self.excluding_all(std::slice::from_ref(&exclusion))
  }

  pub(crate) fn excluding_all(&self, exclusions: &[Exclusion]) -> Self {
    let mut set = self.clone();
    set.exclusions.extend(exclusions.iter().cloned());
    set
  }

  fn is_excluded(&self, dep: &Dependency) -> bool {
    self.exclusions.iter().any(|exclude| exclude(dep))
  }
}

impl fmt::Debug for DependencySet {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("DependencySet")
      .field("members", &self.members.iter().map(Dependency::id).collect::<Vec<_>>())
      .field("exclusions", &self.exclusions.len())
      .finish()
  }
}
