//! Parts and the ordered plan the partitioner returns.

use serde::{Deserialize, Serialize};

use crate::range::PageRange;

/// One committed output unit: a contiguous page span and its serialized bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Part {
    pub range: PageRange,
    pub bytes: Vec<u8>,
    /// Set only for a single page whose own size is over the threshold.
    pub exceeds_budget: bool,
}

impl Part {
    pub fn size(&self) -> usize {
        self.bytes.len()
    }
}

/// Ordered parts covering `[0, page_count)` exactly once.
///
/// Built by the partitioner only; `pagesplit-plan::verify` checks the
/// coverage invariant before a plan leaves the crate.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PartitionPlan {
    parts: Vec<Part>,
}

impl PartitionPlan {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, part: Part) {
        self.parts.push(part);
    }

    pub fn parts(&self) -> &[Part] {
        &self.parts
    }

    pub fn len(&self) -> usize {
        self.parts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    pub fn ranges(&self) -> Vec<PageRange> {
        self.parts.iter().map(|p| p.range).collect()
    }

    pub fn total_bytes(&self) -> usize {
        self.parts.iter().map(Part::size).sum()
    }

    /// Number of parts flagged as over budget.
    pub fn oversized(&self) -> usize {
        self.parts.iter().filter(|p| p.exceeds_budget).count()
    }

    /// Hand the byte buffers to the caller.
    pub fn into_parts(self) -> Vec<Part> {
        self.parts
    }
}

impl IntoIterator for PartitionPlan {
    type Item = Part;
    type IntoIter = std::vec::IntoIter<Part>;

    fn into_iter(self) -> Self::IntoIter {
        self.parts.into_iter()
    }
}

/// Probe accounting for one partition call. Not part of plan identity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartitionStats {
    /// Every `serialize_range` call, including backtracking.
    pub probes: u64,
    /// The subset of `probes` made while backtracking.
    pub backtrack_probes: u64,
    /// Sum of the sizes of every serialized buffer.
    pub bytes_serialized: u64,
}

/// What a partition call produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SplitOutcome {
    Completed {
        plan: PartitionPlan,
        stats: PartitionStats,
    },
    /// Cooperative cancellation fired; no partial plan is kept.
    Cancelled,
}

impl SplitOutcome {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, SplitOutcome::Cancelled)
    }

    /// The plan, if the call ran to completion.
    pub fn into_plan(self) -> Option<PartitionPlan> {
        match self {
            SplitOutcome::Completed { plan, .. } => Some(plan),
            SplitOutcome::Cancelled => None,
        }
    }
}
