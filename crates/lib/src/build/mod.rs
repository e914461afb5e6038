//! Build lifecycle and orchestration.
//!
//! A [`Project`] registers opaque [`Phase`] callbacks against [`BuildStep`]s.
//! The [`Builder`] runs them in lifecycle order up to a target step, and
//! [`DependencyUnit`] adapts any dependency into a unit the executor can run.
//!
//! # Submodules
//!
//! - [`step`] - The ordered lifecycle
//! - [`unit`] - Executor units for dependencies

pub mod step;
pub mod unit;

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info};

use crate::dependency::Project;
use crate::execute::{BuildError, BuildLog};

pub use step::{BuildStep, BuildStepError};
pub use unit::{DependencyUnit, dependency_units};

/// One callback of the build lifecycle.
#[async_trait]
pub trait Phase: Send + Sync {
  async fn run(&self, project: &Project, log: &BuildLog) -> Result<(), BuildError>;
}

struct FnPhase<F>(F);

#[async_trait]
impl<F> Phase for FnPhase<F>
where
  F: Fn(&Project, &BuildLog) -> Result<(), BuildError> + Send + Sync,
{
  async fn run(&self, project: &Project, log: &BuildLog) -> Result<(), BuildError> {
    (self.0)(project, log)
  }
}

/// Wrap a synchronous closure as a [`Phase`].
pub fn from_fn<F>(f: F) -> Arc<dyn Phase>
where
  F: Fn(&Project, &BuildLog) -> Result<(), BuildError> + Send + Sync + 'static,
{
  Arc::new(FnPhase(f))
}

/// Phase callbacks of a project, keyed by step.
#[derive(Clone, Default)]
pub struct Phases {
  phases: BTreeMap<BuildStep, Arc<dyn Phase>>,
}

impl Phases {
  /// Register `phase` for `step`, returning the one it replaces.
  pub fn insert(&mut self, step: BuildStep, phase: Arc<dyn Phase>) -> Option<Arc<dyn Phase>> {
    self.phases.insert(step, phase)
  }

  pub fn get(&self, step: BuildStep) -> Option<&Arc<dyn Phase>> {
    self.phases.get(&step)
  }

  /// Registered steps in lifecycle order.
  pub fn steps(&self) -> impl Iterator<Item = BuildStep> + '_ {
    self.phases.keys().copied()
  }

  pub fn len(&self) -> usize {
    self.phases.len()
  }

  pub fn is_empty(&self) -> bool {
    self.phases.is_empty()
  }
}

impl fmt::Debug for Phases {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_set().entries(self.phases.keys()).finish()
  }
}

/// Runs a project's phases in lifecycle order.
#[derive(Debug, Clone, Copy)]
pub struct Builder {
  target: BuildStep,
}

impl Default for Builder {
  fn default() -> Self {
    Self {
      target: BuildStep::Install,
    }
  }
}

impl Builder {
  /// A builder that stops after `target`.
  pub fn new(target: BuildStep) -> Self {
    Self { target }
  }

  pub fn target(&self) -> BuildStep {
    self.target
  }

  /// Run every registered phase from `Initialize` through the target step.
  ///
  /// Steps without a phase are skipped. The first failing phase stops the
  /// sequence. Returns how many phases ran.
  pub async fn run(&self, project: &Project, log: &BuildLog) -> Result<usize, BuildError> {
    let mut step = BuildStep::Initialize;
    let mut ran = 0;

    loop {
      if let Some(phase) = project.phases().get(step) {
        debug!(project = %project.name(), step = %step, "running phase");
        phase.run(project, log).await?;
        ran += 1;
      }
      if step == self.target {
        break;
      }
      step = step.next()?;
    }

    info!(project = %project.name(), target = %self.target, phases = ran, "project built");
    Ok(ran)
  }
}
