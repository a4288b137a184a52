//! Collaborator interfaces.
//!
//! Concrete documents live in `pagesplit-io`; the job layer in
//! `pagesplit-exec` supplies progress sinks and cancellation flags. We keep
//! only traits here so any crate can depend on the API without pulling a codec.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::error::Result;
use crate::range::PageRange;

/// A paged document that can render any contiguous range on its own.
///
/// Calls take `&self`: the implementation must tolerate reentrant calls on
/// disjoint ranges.
///
/// Precondition: appending trailing pages never shrinks the output, i.e.
/// `serialize_range([s, e + 1]).len() >= serialize_range([s, e]).len()`.
/// Backtracking from the tail relies on it. A codec that re-optimizes and
/// breaks it is not corrected here; the partitioner bounds its backtracking
/// and reports an error instead of looping.
pub trait DocumentAccessor {
    /// Number of pages in the source document.
    fn page_count(&self) -> usize;

    /// Render `range` as a standalone document. Failures should be
    /// `Error::Serialization` naming the range.
    fn serialize_range(&self, range: PageRange) -> Result<Vec<u8>>;

    /// Size of the whole source, if cheaply known. Seeds batch sizing only.
    fn total_source_size_hint(&self) -> Option<u64> {
        None
    }
}

impl<T: DocumentAccessor + ?Sized> DocumentAccessor for &T {
    fn page_count(&self) -> usize {
        (**self).page_count()
    }
    fn serialize_range(&self, range: PageRange) -> Result<Vec<u8>> {
        (**self).serialize_range(range)
    }
    fn total_source_size_hint(&self) -> Option<u64> {
        (**self).total_source_size_hint()
    }
}

impl<T: DocumentAccessor + ?Sized> DocumentAccessor for Box<T> {
    fn page_count(&self) -> usize {
        (**self).page_count()
    }
    fn serialize_range(&self, range: PageRange) -> Result<Vec<u8>> {
        (**self).serialize_range(range)
    }
    fn total_source_size_hint(&self) -> Option<u64> {
        (**self).total_source_size_hint()
    }
}

impl<T: DocumentAccessor + ?Sized> DocumentAccessor for Arc<T> {
    fn page_count(&self) -> usize {
        (**self).page_count()
    }
    fn serialize_range(&self, range: PageRange) -> Result<Vec<u8>> {
        (**self).serialize_range(range)
    }
    fn total_source_size_hint(&self) -> Option<u64> {
        (**self).total_source_size_hint()
    }
}

/// Receives page-level completion percentages in `[0, 100]`.
///
/// Purely advisory: the partitioner behaves the same with or without one.
pub trait ProgressSink {
    fn report(&self, percent: u8);
}

/// Default sink that drops every report.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn report(&self, _percent: u8) {}
}

impl<F: Fn(u8)> ProgressSink for F {
    fn report(&self, percent: u8) {
        self(percent)
    }
}

/// Cooperative cancellation, polled before each probe.
pub trait CancellationCheck {
    fn is_cancelled(&self) -> bool;
}

/// Default check that never fires.
#[derive(Debug, Clone, Copy, Default)]
pub struct NeverCancel;

impl CancellationCheck for NeverCancel {
    fn is_cancelled(&self) -> bool {
        false
    }
}

impl<F: Fn() -> bool> CancellationCheck for F {
    fn is_cancelled(&self) -> bool {
        self()
    }
}

impl CancellationCheck for AtomicBool {
    fn is_cancelled(&self) -> bool {
        self.load(Ordering::Acquire)
    }
}

impl<T: CancellationCheck + ?Sized> CancellationCheck for Arc<T> {
    fn is_cancelled(&self) -> bool {
        (**self).is_cancelled()
    }
}
