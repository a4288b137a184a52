//! Size probes: the unit of expensive work the partitioner economizes.

use tracing::debug;

use pagesplit_core::accessor::DocumentAccessor;
use pagesplit_core::error::{Error, Result};
use pagesplit_core::part::PartitionStats;
use pagesplit_core::range::PageRange;

/// A serialized candidate range. The buffer is kept so that a range which
/// ends up committed is never rendered twice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Probe {
    pub range: PageRange,
    pub bytes: Vec<u8>,
}

impl Probe {
    pub fn size(&self) -> usize {
        self.bytes.len()
    }

    pub fn len(&self) -> usize {
        self.range.len()
    }

    /// Always false: a probe covers at least one page.
    pub fn is_empty(&self) -> bool {
        false
    }
}

/// Wraps a document and counts every serialization made through it.
pub struct SizeProbe<'d, D: ?Sized> {
    doc: &'d D,
    stats: PartitionStats,
}

impl<'d, D: DocumentAccessor + ?Sized> SizeProbe<'d, D> {
    pub fn new(doc: &'d D) -> Self {
        Self {
            doc,
            stats: PartitionStats::default(),
        }
    }

    /// Serialize `range` and return its buffer.
    pub fn measure(&mut self, range: PageRange) -> Result<Probe> {
        self.stats.probes += 1;
        let bytes = self.doc.serialize_range(range).map_err(|e| match e {
            Error::Serialization { .. } => e,
            other => Error::serialization(range, other.to_string()),
        })?;

        self.stats.bytes_serialized += bytes.len() as u64;
        debug!(%range, size = bytes.len(), probes = self.stats.probes, "probed range");

        Ok(Probe { range, bytes })
    }

    /// `measure`, accounted as a backtracking probe.
    pub fn measure_backtrack(&mut self, range: PageRange) -> Result<Probe> {
        self.stats.backtrack_probes += 1;
        self.measure(range)
    }

    pub fn stats(&self) -> PartitionStats {
        self.stats
    }
}
