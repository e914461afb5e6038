//! Parallel batch execution.
//!
//! This module runs one batch of independent units on a bounded pool:
//! - every unit is submitted at once, a semaphore bounds how many run
//! - results reach the listener in completion order, not submission order
//! - a failing, panicking, cancelled or slow unit never aborts its siblings
//!
//! The executor waits for at most `timeout` for each next result. When a wait
//! expires, the oldest unit still unreported is reported as timed out and the
//! executor keeps draining the rest. The timed-out task is not cancelled; if
//! it finishes later its outcome is discarded.

pub mod types;

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, SystemTime};

use tokio::sync::Semaphore;
use tokio::task::{AbortHandle, Id, JoinError, JoinSet};
use tracing::{debug, error, info, warn};

pub use types::{
  BuildError, BuildListener, BuildLog, BuildResult, Buildable, ExecuteConfig, LogMessage, MessageLevel, Termination,
};

/// Handle that cancels every unit of the batches currently executing.
///
/// Clones of one executor share it. Cancelled units are reported as
/// [`Termination::Interrupted`].
#[derive(Debug, Clone, Default)]
pub struct Interrupter {
  running: Arc<Mutex<HashMap<Id, AbortHandle>>>,
}

impl Interrupter {
  /// Cancel all outstanding units. Returns how many were signalled.
  pub fn interrupt(&self) -> usize {
    let running = self.running.lock().unwrap_or_else(PoisonError::into_inner);
    for handle in running.values() {
      handle.abort();
    }
    running.len()
  }

  fn register(&self, handle: AbortHandle) {
    self.running.lock().unwrap_or_else(PoisonError::into_inner).insert(handle.id(), handle);
  }

  /// Forget the units of a finished batch.
  fn release<'a>(&self, ids: impl IntoIterator<Item = &'a Id>) {
    let mut running = self.running.lock().unwrap_or_else(PoisonError::into_inner);
    for id in ids {
      running.remove(id);
    }
  }
}

/// Bookkeeping for one submitted unit.
struct Submission {
  name: String,
  started: SystemTime,
  log: BuildLog,
  reported: bool,
}

impl Submission {
  fn finish(&mut self, termination: Termination, cause: Option<BuildError>) -> BuildResult {
    self.reported = true;
    BuildResult {
      name: self.name.clone(),
      started: self.started,
      finished: SystemTime::now(),
      messages: self.log.messages(),
      termination,
      cause,
    }
  }
}

/// Per-termination counts of a batch or plan.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ExecutionSummary {
  pub completed: usize,
  pub interrupted: usize,
  pub timed_out: usize,
  pub terminated: usize,
}

impl ExecutionSummary {
  pub fn record(&mut self, termination: Termination) {
    match termination {
      Termination::Completed => self.completed += 1,
      Termination::Interrupted => self.interrupted += 1,
      Termination::TimedOut => self.timed_out += 1,
      Termination::Terminated => self.terminated += 1,
    }
  }

  pub fn merge(&mut self, other: ExecutionSummary) {
    self.completed += other.completed;
    self.interrupted += other.interrupted;
    self.timed_out += other.timed_out;
    self.terminated += other.terminated;
  }

  pub fn total(&self) -> usize {
    self.completed + self.interrupted + self.timed_out + self.terminated
  }

  pub fn is_success(&self) -> bool {
    self.total() == self.completed
  }
}

/// Runs batches of independent units on a bounded pool.
#[derive(Debug, Clone)]
pub struct ParallelExecutor {
  semaphore: Arc<Semaphore>,
  threads: usize,
  interrupter: Interrupter,
}

impl ParallelExecutor {
  /// An executor running at most `threads` units at once (minimum one).
  pub fn new(threads: usize) -> Self {
    let threads = threads.max(1);
    Self {
      semaphore: Arc::new(Semaphore::new(threads)),
      threads,
      interrupter: Interrupter::default(),
    }
  }

  pub fn from_config(config: &ExecuteConfig) -> Self {
    Self::new(config.parallelism)
  }

  pub fn threads(&self) -> usize {
    self.threads
  }

  pub fn interrupter(&self) -> Interrupter {
    self.interrupter.clone()
  }

  /// Execute one batch.
  ///
  /// Returns once exactly one result per unit has been handed to `listener`.
  pub async fn execute(
    &self,
    batch: &[Arc<dyn Buildable>],
    listener: &mut dyn BuildListener,
    timeout: Duration,
  ) -> ExecutionSummary {
    let mut summary = ExecutionSummary::default();
    if batch.is_empty() {
      return summary;
    }

    info!(units = batch.len(), threads = self.threads, "executing batch");

    let mut join_set = JoinSet::new();
    let mut submissions = Vec::with_capacity(batch.len());
    let mut by_task = HashMap::with_capacity(batch.len());

    for (index, unit) in batch.iter().enumerate() {
      let log = BuildLog::new();
      let unit = unit.clone();
      let task_log = log.clone();
      let semaphore = self.semaphore.clone();

      submissions.push(Submission {
        name: unit.name(),
        started: SystemTime::now(),
        log,
        reported: false,
      });

      let handle = join_set.spawn(async move {
        let _permit = semaphore.acquire_owned().await.map_err(|_| BuildError::PoolClosed)?;
        unit.build(&task_log).await
      });
      by_task.insert(handle.id(), index);
      self.interrupter.register(handle);
    }

    let mut delivered = 0;
    while delivered < batch.len() {
      let (index, termination, cause) = match tokio::time::timeout(timeout, join_set.join_next_with_id()).await {
        Ok(Some(Ok((id, outcome)))) => {
          let Some(&index) = by_task.get(&id) else { continue };
          match outcome {
            Ok(()) => (index, Termination::Completed, None),
            Err(e) => (index, Termination::Terminated, Some(e)),
          }
        }
        Ok(Some(Err(join_error))) => {
          let Some(&index) = by_task.get(&join_error.id()) else { continue };
          let (termination, cause) = classify_join_error(join_error);
          (index, termination, Some(cause))
        }
        Ok(None) => {
          // Every task has been joined; anything unreported was already timed out.
          break;
        }
        Err(_) => {
          let Some(index) = submissions.iter().position(|s| !s.reported) else { break };
          (index, Termination::TimedOut, Some(BuildError::TimedOut(timeout)))
        }
      };

      let submission = &mut submissions[index];
      if submission.reported {
        debug!(unit = %submission.name, "discarding outcome of unit already reported");
        continue;
      }

      match termination {
        Termination::Completed => debug!(unit = %submission.name, "unit completed"),
        Termination::TimedOut => warn!(unit = %submission.name, ?timeout, "unit timed out"),
        _ => error!(
          unit = %submission.name,
          termination = %termination,
          error = %cause.as_ref().map(ToString::to_string).unwrap_or_default(),
          "unit failed"
        ),
      }

      let result = submission.finish(termination, cause);
      summary.record(termination);
      listener.on_result(result);
      delivered += 1;
    }

    // Units that timed out keep running unobserved.
    join_set.detach_all();
    self.interrupter.release(by_task.keys());

    info!(
      completed = summary.completed,
      timed_out = summary.timed_out,
      interrupted = summary.interrupted,
      terminated = summary.terminated,
      "batch complete"
    );

    summary
  }
}

fn classify_join_error(join_error: JoinError) -> (Termination, BuildError) {
  if join_error.is_cancelled() {
    return (Termination::Interrupted, BuildError::Interrupted);
  }
  let message = match join_error.try_into_panic() {
    Ok(payload) => panic_message(payload),
    Err(e) => e.to_string(),
  };
  (Termination::Terminated, BuildError::Panicked(message))
}

fn panic_message(payload: Box<dyn std::any::Any + Send>) -> String {
  if let Some(s) = payload.downcast_ref::<&str>() {
    s.to_string()
  } else if let Some(s) = payload.downcast_ref::<String>() {
    s.clone()
  } else {
    "unknown panic".to_string()
  }
}
