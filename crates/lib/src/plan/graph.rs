//! Leaf-group planning over a dependency tree.
//!
//! A leaf group is a set of dependencies whose own children have all been
//! placed in an earlier group, so every member of a group can be built in
//! parallel once the previous groups are done.
//!
//! Groups are found in rounds. Each round walks the tree depth-first from the
//! root and collects every node not yet placed whose children all are. The
//! root itself is never placed: it is built by the caller once the plan has
//! run.

use std::collections::HashSet;

use thiserror::Error;
use tracing::{debug, trace};

use crate::dependency::{Dependency, DependencyId};

/// Errors that can occur while planning.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlanError {
  /// A dependency was reached again while it was still being walked.
  #[error("cyclic dependency detected at {0}")]
  CyclicDependency(DependencyId),
}

/// One group of dependencies that can be built in parallel.
pub type LeafGroup = Vec<Dependency>;

/// Per-walk bookkeeping.
#[derive(Default)]
struct Walk {
  on_stack: HashSet<DependencyId>,
  walked: HashSet<DependencyId>,
  candidates: Vec<Dependency>,
  candidate_ids: HashSet<DependencyId>,
}

/// Partition the tree under `root` into ordered leaf groups.
///
/// Children always land in a strictly earlier group than their parents. Only
/// edges reachable from `root` through [`Dependency::dependencies`] are
/// followed, so excluded or undeclared dependencies are never planned.
///
/// # Errors
///
/// Returns [`PlanError::CyclicDependency`] if a walk meets a node already on
/// its recursion stack. No partial plan is returned.
pub fn leaf_groups(root: &Dependency) -> Result<Vec<LeafGroup>, PlanError> {
  let root_id = root.id();
  let mut placed: HashSet<DependencyId> = HashSet::new();
  let mut groups = Vec::new();

  loop {
    let mut walk = Walk::default();
    visit(root, &placed, &mut walk)?;

    if walk.candidates.is_empty() {
      break;
    }
    if walk.candidates.len() == 1 && walk.candidate_ids.contains(&root_id) {
      break;
    }

    let group: LeafGroup = walk
      .candidates
      .into_iter()
      .filter(|dep| dep.id() != root_id)
      .collect();

    debug!(round = groups.len(), size = group.len(), "leaf group planned");
    placed.extend(group.iter().map(Dependency::id));
    groups.push(group);
  }

  Ok(groups)
}

fn visit(node: &Dependency, placed: &HashSet<DependencyId>, walk: &mut Walk) -> Result<(), PlanError> {
  let id = node.id();
  if walk.on_stack.contains(&id) {
    return Err(PlanError::CyclicDependency(id));
  }
  if placed.contains(&id) || !walk.walked.insert(id.clone()) {
    return Ok(());
  }

  let children = node.dependencies();
  if children.iter().all(|child| placed.contains(&child.id())) {
    trace!(dependency = %id, "leaf candidate");
    if walk.candidate_ids.insert(id.clone()) {
      walk.candidates.push(node.clone());
    }
  }

  walk.on_stack.insert(id.clone());
  for child in &children {
    visit(child, placed, walk)?;
  }
  walk.on_stack.remove(&id);

  Ok(())
}
