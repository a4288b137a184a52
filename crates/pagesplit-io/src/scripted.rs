//! Size-profile accessor.
//!
//! The serialized size of a range depends only on its length:
//! `profile[len - 1]`. This models sub-linear growth from shared resources
//! without a codec, and makes probe counts observable.

use std::sync::atomic::{AtomicU64, Ordering};

use pagesplit_core::accessor::DocumentAccessor;
use pagesplit_core::budget::BYTES_PER_MB;
use pagesplit_core::error::{Error, Result};
use pagesplit_core::range::PageRange;

#[derive(Debug, Default)]
pub struct ScriptedDocument {
    /// Size of a range of `i + 1` pages.
    profile: Vec<usize>,
    page_count: usize,
    source_hint: Option<u64>,
    fail_page: Option<usize>,
    calls: AtomicU64,
}

impl ScriptedDocument {
    /// `profile.len()` pages; a range of `n` pages serializes to `profile[n - 1]` bytes.
    pub fn new(profile: Vec<usize>) -> Self {
        let page_count = profile.len();
        Self {
            profile,
            page_count,
            ..Self::default()
        }
    }

    /// Profile given in (binary) megabytes.
    pub fn from_megabytes(profile_mb: &[f64]) -> Self {
        Self::new(
            profile_mb
                .iter()
                .map(|mb| (mb * BYTES_PER_MB).round() as usize)
                .collect(),
        )
    }

    /// Report a source size to seed batch sizing.
    pub fn with_source_hint(mut self, hint: Option<u64>) -> Self {
        self.source_hint = hint;
        self
    }

    /// Any range containing `page` fails to serialize.
    pub fn failing_on(mut self, page: usize) -> Self {
        self.fail_page = Some(page);
        self
    }

    /// Number of `serialize_range` calls so far.
    pub fn probes(&self) -> u64 {
        self.calls.load(Ordering::Relaxed)
    }

    pub fn reset_probes(&self) {
        self.calls.store(0, Ordering::Relaxed);
    }

    /// Expected size of a range, without counting a probe.
    pub fn size_of(&self, range: PageRange) -> Option<usize> {
        if range.end() >= self.page_count {
            return None;
        }
        self.profile.get(range.len() - 1).copied()
    }
}

impl DocumentAccessor for ScriptedDocument {
    fn page_count(&self) -> usize {
        self.page_count
    }

    fn serialize_range(&self, range: PageRange) -> Result<Vec<u8>> {
        self.calls.fetch_add(1, Ordering::Relaxed);

        if let Some(page) = self.fail_page.filter(|p| range.contains(*p)) {
            return Err(Error::serialization(
                range,
                format!("page {} could not be rendered", page + 1),
            ));
        }
        let size = self
            .size_of(range)
            .ok_or_else(|| Error::serialization(range, "range outside the document"))?;
        Ok(vec![(range.start() % 256) as u8; size])
    }

    fn total_source_size_hint(&self) -> Option<u64> {
        self.source_hint
    }
}
