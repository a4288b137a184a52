//! Job registry.
//!
//! A job is created when a split is submitted, advanced only by its worker,
//! and taken (removed) exactly once after it finishes. Idle records are
//! dropped by `expire` once their TTL has passed since the last update.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info};

use pagesplit_core::id::JobId;
use pagesplit_core::part::{PartitionPlan, PartitionStats};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum JobError {
    #[error("unknown job {0}")]
    UnknownJob(JobId),
    #[error("{0} has already finished")]
    AlreadyFinished(JobId),
}

/// Coarse state, as sent over task channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatusKind {
    Pending,
    Running,
    Completed,
    Cancelled,
    Failed,
}

impl JobStatusKind {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled | Self::Failed)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Running { percent: u8 },
    Completed { parts: usize },
    Cancelled,
    Failed { reason: String },
}

impl JobStatus {
    pub fn kind(&self) -> JobStatusKind {
        match self {
            JobStatus::Pending => JobStatusKind::Pending,
            JobStatus::Running { .. } => JobStatusKind::Running,
            JobStatus::Completed { .. } => JobStatusKind::Completed,
            JobStatus::Cancelled => JobStatusKind::Cancelled,
            JobStatus::Failed { .. } => JobStatusKind::Failed,
        }
    }

    /// Percent done; terminal states report 100 only on completion.
    pub fn percent(&self) -> u8 {
        match self {
            JobStatus::Running { percent } => *percent,
            JobStatus::Completed { .. } => 100,
            _ => 0,
        }
    }
}

/// What a finished job hands back to its owner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    Completed {
        plan: PartitionPlan,
        stats: PartitionStats,
    },
    Cancelled,
    Failed(String),
}

impl JobOutcome {
    fn status(&self) -> JobStatus {
        match self {
            JobOutcome::Completed { plan, .. } => JobStatus::Completed { parts: plan.len() },
            JobOutcome::Cancelled => JobStatus::Cancelled,
            JobOutcome::Failed(reason) => JobStatus::Failed {
                reason: reason.clone(),
            },
        }
    }

    pub fn kind(&self) -> JobStatusKind {
        self.status().kind()
    }
}

/// Registry of split jobs, shared between submitters and workers.
pub trait JobStore: Send + Sync {
    fn create(&self, label: &str) -> JobId;

    fn get(&self, id: JobId) -> Option<JobStatus>;

    /// Move to `Running`; progress never goes backwards.
    fn update_progress(&self, id: JobId, percent: u8) -> Result<(), JobError>;

    fn complete(&self, id: JobId, outcome: JobOutcome) -> Result<(), JobError>;

    /// Remove a finished job and return its outcome. `None` while running.
    fn take(&self, id: JobId) -> Option<JobOutcome>;

    /// Drop every record untouched for longer than the TTL; returns how many.
    fn expire(&self, now: Instant) -> usize;
}

#[derive(Debug)]
struct JobRecord {
    label: String,
    status: JobStatus,
    outcome: Option<JobOutcome>,
    touched: Instant,
}

/// `Mutex<HashMap>` job store with sequential ids.
#[derive(Debug)]
pub struct InMemoryJobStore {
    jobs: Mutex<HashMap<JobId, JobRecord>>,
    next_id: AtomicU64,
    ttl: Duration,
}

impl InMemoryJobStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            jobs: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn len(&self) -> usize {
        self.jobs().len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs().is_empty()
    }

    pub fn label(&self, id: JobId) -> Option<String> {
        self.jobs().get(&id).map(|r| r.label.clone())
    }

    fn jobs(&self) -> MutexGuard<'_, HashMap<JobId, JobRecord>> {
        // Every update is a single assignment; a poisoned map is still consistent.
        self.jobs.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn with_live<T>(
        &self,
        id: JobId,
        f: impl FnOnce(&mut JobRecord) -> T,
    ) -> Result<T, JobError> {
        let mut jobs = self.jobs();
        let record = jobs.get_mut(&id).ok_or(JobError::UnknownJob(id))?;
        if record.status.kind().is_terminal() {
            return Err(JobError::AlreadyFinished(id));
        }
        record.touched = Instant::now();
        Ok(f(record))
    }
}

impl Default for InMemoryJobStore {
    fn default() -> Self {
        Self::new(Duration::from_secs(3600))
    }
}

impl JobStore for InMemoryJobStore {
    fn create(&self, label: &str) -> JobId {
        let id = JobId::new(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.jobs().insert(
            id,
            JobRecord {
                label: label.to_string(),
                status: JobStatus::Pending,
                outcome: None,
                touched: Instant::now(),
            },
        );
        info!(job = %id, label, "job created");
        id
    }

    fn get(&self, id: JobId) -> Option<JobStatus> {
        self.jobs().get(&id).map(|r| r.status.clone())
    }

    fn update_progress(&self, id: JobId, percent: u8) -> Result<(), JobError> {
        self.with_live(id, |record| {
            let percent = percent.min(100).max(record.status.percent());
            record.status = JobStatus::Running { percent };
        })
    }

    fn complete(&self, id: JobId, outcome: JobOutcome) -> Result<(), JobError> {
        let kind = outcome.kind();
        self.with_live(id, |record| {
            record.status = outcome.status();
            record.outcome = Some(outcome);
        })?;
        info!(job = %id, status = ?kind, "job finished");
        Ok(())
    }

    fn take(&self, id: JobId) -> Option<JobOutcome> {
        let mut jobs = self.jobs();
        if !jobs.get(&id)?.status.kind().is_terminal() {
            return None;
        }
        jobs.remove(&id).and_then(|r| r.outcome)
    }

    fn expire(&self, now: Instant) -> usize {
        let mut jobs = self.jobs();
        let before = jobs.len();
        jobs.retain(|_, r| now.saturating_duration_since(r.touched) < self.ttl);
        let removed = before - jobs.len();
        if removed > 0 {
            debug!(removed, remaining = jobs.len(), "expired jobs");
        }
        removed
    }
}
