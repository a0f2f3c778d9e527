//! Single-flight job admission.
//!
//! At most one consensus job runs on a node. The request handlers and the
//! detached worker task share one `JobStateGuard`; every read or write of the
//! job state goes through it.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, warn};
use uuid::Uuid;

/// Details of the job currently holding the guard
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobInfo {
    pub id: Uuid,
    pub iterations: u32,
    pub started_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum JobState {
    Idle,
    Running(JobInfo),
}

impl JobState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Running(_) => "running",
        }
    }
}

/// Proof of admission, handed to the worker and consumed by `release`
#[derive(Debug)]
pub struct JobTicket {
    info: JobInfo,
}

impl JobTicket {
    pub fn id(&self) -> Uuid {
        self.info.id
    }

    pub fn iterations(&self) -> u32 {
        self.info.iterations
    }
}

/// Shared idle/running flag
#[derive(Debug, Clone)]
pub struct JobStateGuard {
    state: Arc<Mutex<JobState>>,
}

impl Default for JobStateGuard {
    fn default() -> Self {
        Self::new()
    }
}

impl JobStateGuard {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(JobState::Idle)),
        }
    }

    fn lock(&self) -> MutexGuard<'_, JobState> {
        // The state is a plain enum, a panic elsewhere cannot leave it torn
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Mark the node as running if it is idle.
    ///
    /// Returns `None` without touching the state when a job is already
    /// running.
    pub fn try_acquire(&self, iterations: u32) -> Option<JobTicket> {
        let mut state = self.lock();
        if let JobState::Running(current) = &*state {
            debug!("Admission refused, job {} still running", current.id);
            return None;
        }

        let info = JobInfo {
            id: Uuid::new_v4(),
            iterations,
            started_at: Utc::now(),
        };
        *state = JobState::Running(info.clone());
        debug!("Admitted job {} ({} iterations)", info.id, iterations);
        Some(JobTicket { info })
    }

    /// Return the node to idle. Called once per ticket on every exit path.
    pub fn release(&self, ticket: JobTicket) {
        let mut state = self.lock();
        match &*state {
            JobState::Running(current) if current.id == ticket.info.id => {}
            JobState::Running(current) => {
                warn!(
                    "Releasing job {} while state records job {}",
                    ticket.info.id, current.id
                );
            }
            JobState::Idle => {
                warn!("Releasing job {} but the node is already idle", ticket.info.id);
            }
        }
        *state = JobState::Idle;
        debug!("Released job {}", ticket.info.id);
    }

    pub fn is_running(&self) -> bool {
        matches!(*self.lock(), JobState::Running(_))
    }

    pub fn snapshot(&self) -> JobState {
        self.lock().clone()
    }
}
