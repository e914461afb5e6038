//! Types for batch execution.
//!
//! This module defines the unit abstraction, the per-unit result and message
//! log, the listener receiving results, and the executor configuration.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, SystemTime};

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::build::{BuildStep, BuildStepError};
use crate::consts::DEFAULT_TIMEOUT_SECS;
use crate::resolve::ResolveError;

/// Errors that can end a buildable unit.
#[derive(Debug, Error)]
pub enum BuildError {
  /// Resolving the unit's artifacts failed.
  #[error("resolution failed: {0}")]
  Resolve(#[from] ResolveError),

  /// A phase callback reported failure.
  #[error("{step} phase failed: {message}")]
  Phase { step: BuildStep, message: String },

  /// Stepping through the lifecycle failed.
  #[error(transparent)]
  Step(#[from] BuildStepError),

  /// The wait for the unit exceeded the batch timeout.
  #[error("no result within {0:?}")]
  TimedOut(Duration),

  /// The unit was cancelled before finishing.
  #[error("interrupted")]
  Interrupted,

  /// The unit panicked.
  #[error("unit panicked: {0}")]
  Panicked(String),

  /// Any other failure reported by a unit.
  #[error("{0}")]
  Failed(String),

  /// The worker pool was shut down.
  #[error("worker pool closed")]
  PoolClosed,
}

/// How a unit's execution ended, as observed by the executor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Termination {
  Completed,
  Interrupted,
  TimedOut,
  Terminated,
}

impl std::fmt::Display for Termination {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    let s = match self {
      Termination::Completed => "completed",
      Termination::Interrupted => "interrupted",
      Termination::TimedOut => "timed out",
      Termination::Terminated => "terminated",
    };
    f.write_str(s)
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageLevel {
  Info,
  Problem,
}

/// One message captured from a unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogMessage {
  pub level: MessageLevel,
  pub text: String,
}

/// Message log handed to a unit while it runs.
///
/// Messages are forwarded to `tracing` and captured for the unit's
/// [`BuildResult`]. Clones share the same log.
#[derive(Debug, Clone, Default)]
pub struct BuildLog {
  messages: Arc<Mutex<Vec<LogMessage>>>,
}

impl BuildLog {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn info(&self, text: impl Into<String>) {
    let text = text.into();
    info!(message = %text, "build");
    self.push(MessageLevel::Info, text);
  }

  pub fn problem(&self, text: impl Into<String>) {
    let text = text.into();
    warn!(message = %text, "build problem");
    self.push(MessageLevel::Problem, text);
  }

  /// Snapshot of everything logged so far.
  pub fn messages(&self) -> Vec<LogMessage> {
    self.messages.lock().unwrap_or_else(PoisonError::into_inner).clone()
  }

  fn push(&self, level: MessageLevel, text: String) {
    self
      .messages
      .lock()
      .unwrap_or_else(PoisonError::into_inner)
      .push(LogMessage { level, text });
  }
}

/// Result of one unit of a batch.
#[derive(Debug)]
pub struct BuildResult {
  /// Name of the unit.
  pub name: String,

  /// When the unit was submitted.
  pub started: SystemTime,

  /// When its outcome was observed.
  pub finished: SystemTime,

  /// Messages the unit logged before its outcome was observed.
  pub messages: Vec<LogMessage>,

  pub termination: Termination,

  /// Why the unit did not complete, if it did not.
  pub cause: Option<BuildError>,
}

impl BuildResult {
  pub fn is_success(&self) -> bool {
    self.termination == Termination::Completed
  }

  pub fn duration(&self) -> Duration {
    self.finished.duration_since(self.started).unwrap_or_default()
  }
}

/// A unit of work the executor can run.
#[async_trait]
pub trait Buildable: Send + Sync {
  /// Name used for the unit's result.
  fn name(&self) -> String;

  /// Do the work. Messages go to `log`.
  async fn build(&self, log: &BuildLog) -> Result<(), BuildError>;
}

/// Receives each unit's result as soon as it is observed.
pub trait BuildListener: Send {
  fn on_result(&mut self, result: BuildResult);
}

impl BuildListener for Vec<BuildResult> {
  fn on_result(&mut self, result: BuildResult) {
    self.push(result);
  }
}

/// Streams results to a receiver. A closed receiver drops them.
impl BuildListener for mpsc::UnboundedSender<BuildResult> {
  fn on_result(&mut self, result: BuildResult) {
    if self.send(result).is_err() {
      warn!("result receiver closed");
    }
  }
}

/// Configuration for batch execution.
#[derive(Debug, Clone)]
pub struct ExecuteConfig {
  /// Maximum number of units running at once.
  pub parallelism: usize,

  /// Longest wait for the next unit of a batch to finish.
  pub timeout: Duration,
}

impl Default for ExecuteConfig {
  fn default() -> Self {
    Self {
      parallelism: num_cpus(),
      timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
    }
  }
}

/// Get the number of CPUs for default parallelism.
fn num_cpus() -> usize {
  std::thread::available_parallelism().map(|p| p.get()).unwrap_or(4)
}
