//! Build plans: leaf groups mapped to buildable units.
//!
//! A [`BuildPlan`] runs its groups strictly in order. Every member of a group
//! is observed before the next group starts; members of one group run
//! concurrently on the [`ParallelExecutor`].

pub mod graph;

use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use crate::dependency::Dependency;
use crate::execute::{BuildListener, Buildable, ExecutionSummary, ParallelExecutor};

pub use graph::{LeafGroup, PlanError, leaf_groups};

/// Maps a planned dependency to the unit that builds it.
pub trait UnitFactory {
  fn unit_for(&self, dependency: &Dependency) -> Arc<dyn Buildable>;
}

impl<F> UnitFactory for F
where
  F: Fn(&Dependency) -> Arc<dyn Buildable>,
{
  fn unit_for(&self, dependency: &Dependency) -> Arc<dyn Buildable> {
    self(dependency)
  }
}

/// Outcome of running a whole plan.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PlanReport {
  /// Number of groups executed.
  pub groups: usize,

  /// Results across all groups.
  pub summary: ExecutionSummary,
}

impl PlanReport {
  pub fn is_success(&self) -> bool {
    self.summary.is_success()
  }
}

/// Ordered groups of units to build.
#[derive(Clone, Default)]
pub struct BuildPlan {
  groups: Vec<Vec<Arc<dyn Buildable>>>,
}

impl BuildPlan {
  pub fn new(groups: Vec<Vec<Arc<dyn Buildable>>>) -> Self {
    Self { groups }
  }

  /// Plan the tree under `root` and map every dependency through `factory`.
  ///
  /// The root itself is not part of the plan.
  pub fn for_root(root: &Dependency, factory: &dyn UnitFactory) -> Result<Self, PlanError> {
    let groups = leaf_groups(root)?
      .iter()
      .map(|group| group.iter().map(|dep| factory.unit_for(dep)).collect())
      .collect();
    Ok(Self { groups })
  }

  pub fn groups(&self) -> &[Vec<Arc<dyn Buildable>>] {
    &self.groups
  }

  /// Number of groups.
  pub fn len(&self) -> usize {
    self.groups.len()
  }

  pub fn is_empty(&self) -> bool {
    self.groups.is_empty()
  }

  /// Number of units across all groups.
  pub fn unit_count(&self) -> usize {
    self.groups.iter().map(Vec::len).sum()
  }

  /// Run every group in order.
  ///
  /// A failing unit does not stop the plan: later groups still run and the
  /// failure shows up in the report and through `listener`.
  pub async fn build(
    &self,
    executor: &ParallelExecutor,
    listener: &mut dyn BuildListener,
    timeout: Duration,
  ) -> PlanReport {
    let mut report = PlanReport::default();

    for (index, group) in self.groups.iter().enumerate() {
      info!(group = index + 1, of = self.groups.len(), units = group.len(), "building group");
      let summary = executor.execute(group, listener, timeout).await;
      if !summary.is_success() {
        warn!(group = index + 1, failed = summary.total() - summary.completed, "group had failures");
      }
      report.summary.merge(summary);
      report.groups += 1;
    }

    report
  }
}

impl std::fmt::Debug for BuildPlan {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    let names: Vec<Vec<String>> = self
      .groups
      .iter()
      .map(|group| group.iter().map(|unit| unit.name()).collect())
      .collect();
    f.debug_struct("BuildPlan").field("groups", &names).finish()
  }
}
