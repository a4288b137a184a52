#![forbid(unsafe_code)]
//! pagesplit-exec: drive the partitioner for callers.
//!
//! - `runtime`: `SplitEngine`, config in, plan or packaged parts out.
//! - `jobs`: the job registry (`JobStore`) and its in-memory TTL backing.
//! - `task`: run a split on a worker with a progress channel and a cancel token.
//!
//! Blocking threads by default; the `async-jobs` feature adds tokio variants.

pub mod jobs;
pub mod runtime;
pub mod task;

pub use jobs::{InMemoryJobStore, JobError, JobOutcome, JobStatus, JobStatusKind, JobStore};
pub use runtime::{ExecError, SplitEngine, SplitReport};
pub use task::{spawn_split, CancelToken, SplitTask, TaskEvent};

#[cfg(feature = "async-jobs")]
pub use task::{run_reaper, spawn_split_async, AsyncSplitTask};
