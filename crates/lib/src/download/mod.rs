//! Concurrent, single-flight resource downloads.
//!
//! The [`Downloader`] copies resources on a fixed number of workers:
//! - a job that already completed is not copied again
//! - a job submitted while an identical one is in flight shares its handle
//! - a failed job does not affect unrelated jobs, and whoever awaits it sees
//!   the failure
//!
//! Jobs are identified by their `(source, destination)` pair.

pub mod copy;
pub mod types;

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::{Semaphore, watch};
use tracing::{debug, warn};

use crate::consts::DEFAULT_DOWNLOAD_WORKERS;

pub use copy::CopyOutcome;
pub use types::{CopyMode, DownloadError, DownloadJob, DownloadStatus, Resource};

use types::JobKey;

/// Handle to a submitted job. Clones observe the same job.
#[derive(Debug, Clone)]
pub struct DownloadHandle {
  job: DownloadJob,
  status: watch::Receiver<DownloadStatus>,
}

impl DownloadHandle {
  pub fn job(&self) -> &DownloadJob {
    &self.job
  }

  /// Current status without waiting.
  pub fn status(&self) -> DownloadStatus {
    self.status.borrow().clone()
  }

  /// Wait for the job to reach a terminal status.
  pub async fn wait(&self) -> DownloadStatus {
    let mut status = self.status.clone();
    match status.wait_for(DownloadStatus::is_terminal).await {
      Ok(terminal) => terminal.clone(),
      Err(_) => DownloadStatus::Failed("download worker stopped without a result".to_string()),
    }
  }

  /// Wait for the job and turn a failure into an error.
  pub async fn finish(&self) -> Result<(), DownloadError> {
    match self.wait().await {
      DownloadStatus::Failed(reason) => Err(DownloadError::Failed {
        resource: self.job.source().to_string(),
        destination: self.job.destination().to_path_buf(),
        reason,
      }),
      _ => Ok(()),
    }
  }
}

/// What [`Downloader::download`] did with a job.
#[derive(Debug, Clone)]
pub enum DownloadTicket {
  /// The job already completed earlier; nothing was submitted.
  Done,
  /// The job is in flight, either newly submitted or shared.
  Pending(DownloadHandle),
}

impl DownloadTicket {
  pub async fn wait(&self) -> DownloadStatus {
    match self {
      DownloadTicket::Done => DownloadStatus::Downloaded,
      DownloadTicket::Pending(handle) => handle.wait().await,
    }
  }

  pub async fn finish(&self) -> Result<(), DownloadError> {
    match self {
      DownloadTicket::Done => Ok(()),
      DownloadTicket::Pending(handle) => handle.finish().await,
    }
  }
}

#[derive(Default)]
struct State {
  in_flight: HashMap<JobKey, DownloadHandle>,
  completed: HashSet<JobKey>,
  /// In-flight jobs in submission order.
  order: VecDeque<JobKey>,
}

struct Inner {
  state: Mutex<State>,
  workers: Arc<Semaphore>,
  size: usize,
  client: reqwest::Client,
}

impl Inner {
  fn state(&self) -> MutexGuard<'_, State> {
    self.state.lock().unwrap_or_else(PoisonError::into_inner)
  }
}

/// Single-flight downloader backed by a fixed pool of workers.
#[derive(Clone)]
pub struct Downloader {
  inner: Arc<Inner>,
}

impl Default for Downloader {
  fn default() -> Self {
    Self::new(DEFAULT_DOWNLOAD_WORKERS)
  }
}

impl Downloader {
  /// A downloader running at most `workers` copies at once (minimum one).
  pub fn new(workers: usize) -> Self {
    Self::with_client(workers, reqwest::Client::new())
  }

  pub fn with_client(workers: usize, client: reqwest::Client) -> Self {
    let size = workers.max(1);
    Self {
      inner: Arc::new(Inner {
        state: Mutex::new(State::default()),
        workers: Arc::new(Semaphore::new(size)),
        size,
        client,
      }),
    }
  }

  pub fn workers(&self) -> usize {
    self.inner.size
  }

  /// Submit a job unless it already completed or is already in flight.
  ///
  /// Must be called from within a tokio runtime.
  pub fn download(&self, job: DownloadJob) -> DownloadTicket {
    let key = job.key();
    let mut state = self.inner.state();

    if state.completed.contains(&key) {
      debug!(job = %job, "already downloaded");
      return DownloadTicket::Done;
    }
    if let Some(handle) = state.in_flight.get(&key) {
      debug!(job = %job, "joining in-flight download");
      return DownloadTicket::Pending(handle.clone());
    }

    let (tx, rx) = watch::channel(DownloadStatus::Waiting);
    let handle = DownloadHandle {
      job: job.clone(),
      status: rx,
    };
    state.in_flight.insert(key.clone(), handle.clone());
    state.order.push_back(key.clone());
    drop(state);

    let inner = self.inner.clone();
    tokio::spawn(async move {
      let status = match inner.workers.clone().acquire_owned().await {
        Ok(_permit) => {
          tx.send_replace(DownloadStatus::Downloading);
          debug!(job = %job, "downloading");
          match copy::copy(&job, &inner.client).await {
            Ok(_) => DownloadStatus::Downloaded,
            Err(e) => {
              warn!(job = %job, error = %e, "download failed");
              DownloadStatus::Failed(e.to_string())
            }
          }
        }
        Err(_) => DownloadStatus::Failed("download pool closed".to_string()),
      };

      {
        let mut state = inner.state();
        state.in_flight.remove(&key);
        state.order.retain(|pending| pending != &key);
        if status.is_downloaded() {
          state.completed.insert(key);
        }
      }
      tx.send_replace(status);
    });

    DownloadTicket::Pending(handle)
  }

  /// Wait for the earliest-submitted job that is still in flight and not yet
  /// returned by this method.
  ///
  /// Returns `None` when no such job exists.
  pub async fn wait_for_next_completed(&self) -> Option<(DownloadJob, DownloadStatus)> {
    let handle = {
      let mut state = self.inner.state();
      let key = state.order.pop_front()?;
      state.in_flight.get(&key).cloned()?
    };
    let status = handle.wait().await;
    Some((handle.job, status))
  }

  /// Status of a job, if it was ever submitted.
  ///
  /// A failed job that is no longer tracked reports `None` and can be
  /// submitted again.
  pub fn status(&self, job: &DownloadJob) -> Option<DownloadStatus> {
    let key = job.key();
    let state = self.inner.state();
    if state.completed.contains(&key) {
      return Some(DownloadStatus::Downloaded);
    }
    state.in_flight.get(&key).map(DownloadHandle::status)
  }

  /// Number of jobs currently in flight.
  pub fn in_flight(&self) -> usize {
    self.inner.state().in_flight.len()
  }
}

impl std::fmt::Debug for Downloader {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    let state = self.inner.state();
    f.debug_struct("Downloader")
      .field("workers", &self.inner.size)
      .field("in_flight", &state.in_flight.len())
      .field("completed", &state.completed.len())
      .finish()
  }
}
