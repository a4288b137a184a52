//! Contiguous page spans.
//!
//! Pages are identified by their zero-based ordinal in the source document.
//! A `PageRange` is inclusive on both ends and never empty.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PageRange {
    start: usize,
    end: usize,
}

impl PageRange {
    /// Build `[start, end]`; rejects `start > end`.
    pub fn new(start: usize, end: usize) -> Result<Self> {
        if start > end {
            return Err(Error::Invariant(format!(
                "page range start {start} is past end {end}"
            )));
        }
        Ok(Self { start, end })
    }

    /// A range covering exactly one page.
    pub const fn single(page: usize) -> Self {
        Self {
            start: page,
            end: page,
        }
    }

    /// `len` pages starting at `start`. `len` must be at least 1.
    pub fn with_len(start: usize, len: usize) -> Result<Self> {
        if len == 0 {
            return Err(Error::Invariant(format!(
                "empty page range at {start}"
            )));
        }
        Ok(Self {
            start,
            end: start + len - 1,
        })
    }

    pub const fn start(&self) -> usize {
        self.start
    }

    pub const fn end(&self) -> usize {
        self.end
    }

    pub const fn len(&self) -> usize {
        self.end - self.start + 1
    }

    /// Always false; kept for clippy's `len_without_is_empty`.
    pub const fn is_empty(&self) -> bool {
        false
    }

    pub const fn contains(&self, page: usize) -> bool {
        page >= self.start && page <= self.end
    }

    /// Same start, new (inclusive) end. `end` must not precede `start`.
    pub fn extend_to(self, end: usize) -> Result<Self> {
        Self::new(self.start, end)
    }

    /// Keep the first `len` pages.
    pub fn truncate_to(self, len: usize) -> Result<Self> {
        if len > self.len() {
            return Err(Error::Invariant(format!(
                "cannot truncate {self} to {len} pages"
            )));
        }
        Self::with_len(self.start, len)
    }

    /// Iterate page ordinals in order.
    pub fn pages(&self) -> std::ops::RangeInclusive<usize> {
        self.start..=self.end
    }
}

// User-facing form is 1-based, the way people number pages.
impl fmt::Display for PageRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.start == self.end {
            write!(f, "page {}", self.start + 1)
        } else {
            write!(f, "pages {}-{}", self.start + 1, self.end + 1)
        }
    }
}
