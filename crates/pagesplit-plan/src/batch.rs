//! Batch-width selection.
//!
//! Inputs:
//! - the budget threshold,
//! - an average page contribution (source size hint, or what the current
//!   part has shown so far),
//! - the pages still unread.
//!
//! Output: how many pages to fold in before the next probe. This only moves
//! probe points around; the boundaries found are the same for any width.

use pagesplit_core::budget::SizeBudget;
use pagesplit_core::config::SplitConfig;

use crate::probe::Probe;

#[derive(Debug, Clone, Copy)]
pub struct BatchSizer {
    budget: SizeBudget,
    /// Bytes per page derived from the source size hint.
    source_avg: Option<f64>,
    damping: f64,
    fallback: usize,
    hint: Option<usize>,
}

impl BatchSizer {
    pub fn new(
        budget: SizeBudget,
        page_count: usize,
        source_size_hint: Option<u64>,
        damping: f64,
        fallback: usize,
    ) -> Self {
        let source_avg = match source_size_hint {
            Some(total) if total > 0 && page_count > 0 => Some(total as f64 / page_count as f64),
            _ => None,
        };
        Self {
            budget,
            source_avg,
            damping,
            fallback: fallback.max(1),
            hint: None,
        }
    }

    pub fn from_config(
        cfg: &SplitConfig,
        budget: SizeBudget,
        page_count: usize,
        source_size_hint: Option<u64>,
    ) -> Self {
        Self::new(
            budget,
            page_count,
            source_size_hint,
            cfg.damping,
            cfg.fallback_batch,
        )
        .with_hint(cfg.batch_hint)
    }

    /// Fixed width that replaces the computed one.
    pub fn with_hint(mut self, hint: Option<usize>) -> Self {
        self.hint = hint;
        self
    }

    /// Average bytes a page adds: the source hint first, then the current
    /// part's last fitting probe.
    pub fn average_page_bytes(&self, last_fit: Option<&Probe>) -> Option<f64> {
        self.source_avg
            .or_else(|| last_fit.map(|p| p.size() as f64 / p.len() as f64))
            .filter(|avg| *avg > 0.0)
    }

    /// Pages to add next, in `[1, remaining]` (0 only when nothing remains).
    pub fn next_width(&self, last_fit: Option<&Probe>, remaining: usize) -> usize {
        if remaining == 0 {
            return 0;
        }
        if let Some(hint) = self.hint {
            return hint.clamp(1, remaining);
        }

        let width = match self.average_page_bytes(last_fit) {
            Some(avg) => {
                let used = last_fit.map_or(0, Probe::size);
                let pages = self.budget.headroom(used) / avg * self.damping;
                // Saturating float→int cast; huge budgets clamp below.
                pages.floor() as usize
            }
            None => self.fallback,
        };

        width.clamp(1, remaining)
    }
}
