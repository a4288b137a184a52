#![forbid(unsafe_code)]
//! pagesplit-plan: turn a document into a size-bounded `PartitionPlan`.
//!
//! Responsibilities:
//! - `probe`: serialize candidate ranges and account for every call.
//! - `batch`: decide how many pages to add before the next probe.
//! - `partition`: the accumulate/probe/backtrack state machine.
//! - `verify`: coverage and budget checks on finished plans.
//!
//! **No I/O, no threads** here. The exec crate drives this from workers.

pub mod batch;
pub mod partition;
pub mod probe;
pub mod verify;

pub use batch::BatchSizer;
pub use partition::{PartitionSettings, Partitioner};
pub use probe::{Probe, SizeProbe};
