//! Convenient re-exports for downstream crates.

pub use crate::accessor::{CancellationCheck, DocumentAccessor, NeverCancel, NoProgress, ProgressSink};
pub use crate::budget::{SizeBudget, BYTES_PER_MB};
pub use crate::config::{BacktrackStrategy, SplitConfig};
pub use crate::error::{Error, Result};
pub use crate::id::JobId;
pub use crate::manifest::{PartEntry, SplitManifest};
pub use crate::part::{Part, PartitionPlan, PartitionStats, SplitOutcome};
pub use crate::range::PageRange;
