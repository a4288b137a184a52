//! Background split tasks.
//!
//! The partitioner is blocking, so a split runs on its own worker and talks
//! to the submitter through a channel of `TaskEvent`s. The worker is the only
//! writer of its job record. Cancellation is a shared flag the partitioner
//! polls before every probe.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};
use std::thread::{self, JoinHandle};

use tracing::{debug, warn};

use pagesplit_core::accessor::{CancellationCheck, DocumentAccessor};
use pagesplit_core::id::JobId;
use pagesplit_core::part::SplitOutcome;

use crate::jobs::{JobOutcome, JobStatusKind, JobStore};
use crate::runtime::SplitEngine;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskEvent {
    Progress(u8),
    Finished(JobStatusKind),
}

/// Cloneable cancellation flag.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }
}

impl CancellationCheck for CancelToken {
    fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Handle to a split running on a worker thread.
pub struct SplitTask {
    id: JobId,
    cancel: CancelToken,
    events: mpsc::Receiver<TaskEvent>,
    handle: JoinHandle<JobStatusKind>,
}

impl SplitTask {
    pub fn id(&self) -> JobId {
        self.id
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn events(&self) -> &mpsc::Receiver<TaskEvent> {
        &self.events
    }

    /// Block until the worker finishes; returns the final state.
    ///
    /// Unread events stay in the channel. A worker that panicked counts as
    /// `Failed`.
    pub fn wait(self) -> JobStatusKind {
        match self.handle.join() {
            Ok(kind) => kind,
            Err(_) => {
                warn!(job = %self.id, "split worker panicked");
                JobStatusKind::Failed
            }
        }
    }
}

/// Run `engine` over `doc` on a new thread, tracked in `store` under `label`.
pub fn spawn_split<D>(
    store: Arc<dyn JobStore>,
    engine: Arc<SplitEngine>,
    doc: D,
    label: &str,
) -> SplitTask
where
    D: DocumentAccessor + Send + 'static,
{
    let id = store.create(label);
    let cancel = CancelToken::new();
    let (tx, events) = mpsc::channel();

    let worker_cancel = cancel.clone();
    let handle = thread::spawn(move || {
        let kind = run_job(store.as_ref(), &engine, &doc, id, &worker_cancel, |event| {
            // The submitter may have dropped its receiver; the store still has the state.
            let _ = tx.send(event);
        });
        debug!(job = %id, status = ?kind, "split worker exiting");
        kind
    });

    SplitTask {
        id,
        cancel,
        events,
        handle,
    }
}

/// Body shared by the thread and tokio workers.
fn run_job<D: DocumentAccessor + ?Sized>(
    store: &dyn JobStore,
    engine: &SplitEngine,
    doc: &D,
    id: JobId,
    cancel: &CancelToken,
    emit: impl Fn(TaskEvent),
) -> JobStatusKind {
    let progress = |percent: u8| {
        if let Err(e) = store.update_progress(id, percent) {
            warn!(job = %id, error = %e, "progress update rejected");
        }
        emit(TaskEvent::Progress(percent));
    };

    let outcome = match engine.partition(doc, &progress, cancel) {
        Ok(SplitOutcome::Completed { plan, stats }) => JobOutcome::Completed { plan, stats },
        Ok(SplitOutcome::Cancelled) => JobOutcome::Cancelled,
        Err(e) => JobOutcome::Failed(e.to_string()),
    };

    let kind = outcome.kind();
    if let Err(e) = store.complete(id, outcome) {
        warn!(job = %id, error = %e, "could not record job outcome");
    }
    emit(TaskEvent::Finished(kind));
    kind
}

#[cfg(feature = "async-jobs")]
pub use async_impl::*;

#[cfg(feature = "async-jobs")]
mod async_impl {
    use std::sync::Arc;
    use std::time::{Duration, Instant};

    use tokio::sync::mpsc;
    use tokio::task::JoinHandle;
    use tokio::time;
    use tracing::{debug, warn};

    use pagesplit_core::accessor::{CancellationCheck, DocumentAccessor};
    use pagesplit_core::id::JobId;

    use super::{run_job, CancelToken, TaskEvent};
    use crate::jobs::{JobStatusKind, JobStore};
    use crate::runtime::SplitEngine;

    /// Handle to a split running on tokio's blocking pool.
    pub struct AsyncSplitTask {
        pub id: JobId,
        pub cancel: CancelToken,
        pub events: mpsc::UnboundedReceiver<TaskEvent>,
        handle: JoinHandle<JobStatusKind>,
    }

    impl AsyncSplitTask {
        /// Wait for the worker. Unread events stay in the channel.
        pub async fn join(self) -> JobStatusKind {
            match self.handle.await {
                Ok(kind) => kind,
                Err(e) => {
                    warn!(job = %self.id, error = %e, "split worker failed");
                    JobStatusKind::Failed
                }
            }
        }
    }

    /// `spawn_split` on `tokio::task::spawn_blocking`. Needs a runtime.
    pub fn spawn_split_async<D>(
        store: Arc<dyn JobStore>,
        engine: Arc<SplitEngine>,
        doc: D,
        label: &str,
    ) -> AsyncSplitTask
    where
        D: DocumentAccessor + Send + 'static,
    {
        let id = store.create(label);
        let cancel = CancelToken::new();
        let (tx, events) = mpsc::unbounded_channel();

        let worker_cancel = cancel.clone();
        let handle = tokio::task::spawn_blocking(move || {
            run_job(store.as_ref(), &engine, &doc, id, &worker_cancel, |event| {
                let _ = tx.send(event);
            })
        });

        AsyncSplitTask {
            id,
            cancel,
            events,
            handle,
        }
    }

    /// Sweep expired jobs every `every` until `shutdown` fires.
    pub async fn run_reaper(store: Arc<dyn JobStore>, every: Duration, shutdown: CancelToken) {
        let mut interval = time::interval(every);

        loop {
            interval.tick().await;
            if shutdown.is_cancelled() {
                debug!("job reaper stopping");
                break;
            }
            let removed = store.expire(Instant::now());
            if removed > 0 {
                debug!(removed, "job reaper pass");
            }
        }
    }
}
