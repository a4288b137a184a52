//! The partitioner state machine.
//!
//! Per part, starting at page `s`:
//! - Accumulating: fold one batch of pages into the pending range.
//! - Probing: serialize the pending range. Fits → keep accumulating, or commit
//!   if the document is exhausted. Over → backtrack.
//! - Backtracking: shrink from the tail until the range fits, or a single
//!   page is left (committed alone and flagged as over budget).
//!
//! Pages dropped while backtracking are not lost: the next part starts right
//! after the committed one.

use tracing::{debug, info, warn};

use pagesplit_core::accessor::{
    CancellationCheck, DocumentAccessor, NeverCancel, NoProgress, ProgressSink,
};
use pagesplit_core::budget::SizeBudget;
use pagesplit_core::config::{BacktrackStrategy, SplitConfig};
use pagesplit_core::error::{Error, Result};
use pagesplit_core::part::{Part, PartitionPlan, SplitOutcome};
use pagesplit_core::range::PageRange;

use crate::batch::BatchSizer;
use crate::probe::{Probe, SizeProbe};
use crate::verify;

/// Tuning knobs. None of them change the emitted plan.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PartitionSettings {
    pub batch_hint: Option<usize>,
    pub damping: f64,
    pub fallback_batch: usize,
    pub strategy: BacktrackStrategy,
    pub max_backtrack_steps: usize,
}

impl Default for PartitionSettings {
    fn default() -> Self {
        Self::from(&SplitConfig::default())
    }
}

impl From<&SplitConfig> for PartitionSettings {
    fn from(cfg: &SplitConfig) -> Self {
        Self {
            batch_hint: cfg.batch_hint,
            damping: cfg.damping,
            fallback_batch: cfg.fallback_batch,
            strategy: cfg.backtrack,
            max_backtrack_steps: cfg.max_backtrack_steps,
        }
    }
}

/// Working memory of the part being built.
#[derive(Debug, Default)]
struct BatchState {
    pending: Option<PageRange>,
    /// Last probe of the pending range that stayed within budget.
    last_fit: Option<Probe>,
}

/// Reports the furthest page ever folded, so backtracking never makes the
/// percentage go down.
struct ProgressTracker<'a> {
    sink: &'a dyn ProgressSink,
    page_count: usize,
    furthest: usize,
}

impl<'a> ProgressTracker<'a> {
    fn new(sink: &'a dyn ProgressSink, page_count: usize) -> Self {
        Self {
            sink,
            page_count,
            furthest: 0,
        }
    }

    fn folded(&mut self, page: usize) {
        self.furthest = self.furthest.max(page + 1);
        let percent = self.furthest * 100 / self.page_count;
        self.sink.report(percent.min(100) as u8);
    }
}

/// Splits a document into size-bounded parts.
pub struct Partitioner<'a> {
    budget: SizeBudget,
    settings: PartitionSettings,
    progress: &'a dyn ProgressSink,
    cancel: &'a dyn CancellationCheck,
}

impl Partitioner<'static> {
    pub fn new(budget: SizeBudget) -> Self {
        Self {
            budget,
            settings: PartitionSettings::default(),
            progress: &NoProgress,
            cancel: &NeverCancel,
        }
    }

    /// Validate `cfg` and build a partitioner from it.
    pub fn from_config(cfg: &SplitConfig) -> Result<Self> {
        let budget = cfg.validate()?;
        Ok(Self::new(budget).with_settings(PartitionSettings::from(cfg)))
    }
}

impl<'a> Partitioner<'a> {
    pub fn with_settings(mut self, settings: PartitionSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn with_batch_hint(mut self, hint: Option<usize>) -> Self {
        self.settings.batch_hint = hint;
        self
    }

    pub fn with_strategy(mut self, strategy: BacktrackStrategy) -> Self {
        self.settings.strategy = strategy;
        self
    }

    pub fn with_progress<'b>(self, progress: &'b dyn ProgressSink) -> Partitioner<'b>
    where
        'a: 'b,
    {
        Partitioner {
            budget: self.budget,
            settings: self.settings,
            progress,
            cancel: self.cancel,
        }
    }

    pub fn with_cancellation<'b>(self, cancel: &'b dyn CancellationCheck) -> Partitioner<'b>
    where
        'a: 'b,
    {
        Partitioner {
            budget: self.budget,
            settings: self.settings,
            progress: self.progress,
            cancel,
        }
    }

    pub fn budget(&self) -> SizeBudget {
        self.budget
    }

    pub fn settings(&self) -> PartitionSettings {
        self.settings
    }

    /// Partition the whole document.
    ///
    /// Returns `Cancelled` if the cancellation check fires before any probe;
    /// any serialization failure aborts the call with no partial plan.
    pub fn run<D: DocumentAccessor + ?Sized>(&self, doc: &D) -> Result<SplitOutcome> {
        if self.settings.max_backtrack_steps == 0 {
            return Err(Error::Config("max backtrack steps must be positive".into()));
        }

        let page_count = doc.page_count();
        let mut probe = SizeProbe::new(doc);
        let mut plan = PartitionPlan::new();

        if page_count == 0 {
            debug!("empty document, nothing to partition");
            return Ok(SplitOutcome::Completed {
                plan,
                stats: probe.stats(),
            });
        }

        let sizer = BatchSizer::new(
            self.budget,
            page_count,
            doc.total_source_size_hint(),
            self.settings.damping,
            self.settings.fallback_batch,
        )
        .with_hint(self.settings.batch_hint);
        let mut progress = ProgressTracker::new(self.progress, page_count);

        let mut start = 0;
        while start < page_count {
            let Some(part) =
                self.next_part(&mut probe, &sizer, &mut progress, start, page_count)?
            else {
                info!(committed = plan.len(), "partitioning cancelled");
                return Ok(SplitOutcome::Cancelled);
            };

            if part.exceeds_budget {
                warn!(range = %part.range, size = part.size(), threshold = self.budget.threshold(),
                    "single page exceeds budget; emitted alone");
            } else {
                info!(range = %part.range, size = part.size(), "committed part");
            }
            start = part.range.end() + 1;
            plan.push(part);
        }

        verify::check_plan(&plan, page_count, &self.budget)?;

        let stats = probe.stats();
        info!(
            parts = plan.len(),
            pages = page_count,
            probes = stats.probes,
            backtrack_probes = stats.backtrack_probes,
            "partitioning finished"
        );
        Ok(SplitOutcome::Completed { plan, stats })
    }

    /// Build the part starting at `start`. `None` means cancelled.
    fn next_part<D: DocumentAccessor + ?Sized>(
        &self,
        probe: &mut SizeProbe<'_, D>,
        sizer: &BatchSizer,
        progress: &mut ProgressTracker<'_>,
        start: usize,
        page_count: usize,
    ) -> Result<Option<Part>> {
        let mut state = BatchState::default();

        loop {
            // Accumulating
            let next_page = state.pending.map_or(start, |r| r.end() + 1);
            let width = sizer.next_width(state.last_fit.as_ref(), page_count - next_page);
            let pending = PageRange::new(start, next_page + width - 1)?;
            for page in next_page..=pending.end() {
                progress.folded(page);
            }
            state.pending = Some(pending);

            // Probing
            if self.cancel.is_cancelled() {
                return Ok(None);
            }
            let measured = probe.measure(pending)?;

            if !self.budget.fits(measured.size()) {
                return self.backtrack(probe, state.last_fit.take(), measured);
            }
            if pending.end() + 1 == page_count {
                return Ok(Some(commit(measured, false)));
            }
            state.last_fit = Some(measured);
        }
    }

    /// Shrink an overflowing range until it fits or is a single page.
    ///
    /// `last_fit` is the longest prefix already known to fit (if any), `over`
    /// the overflowing probe. Both strategies settle on the longest fitting
    /// prefix, provided sizes grow with length.
    fn backtrack<D: DocumentAccessor + ?Sized>(
        &self,
        probe: &mut SizeProbe<'_, D>,
        last_fit: Option<Probe>,
        over: Probe,
    ) -> Result<Option<Part>> {
        debug!(range = %over.range, size = over.size(), strategy = ?self.settings.strategy,
            "over budget, backtracking");

        match self.settings.strategy {
            BacktrackStrategy::Linear => self.backtrack_linear(probe, last_fit, over),
            BacktrackStrategy::Bisect => self.backtrack_bisect(probe, last_fit, over),
        }
    }

    fn backtrack_linear<D: DocumentAccessor + ?Sized>(
        &self,
        probe: &mut SizeProbe<'_, D>,
        mut last_fit: Option<Probe>,
        mut over: Probe,
    ) -> Result<Option<Part>> {
        let known_fit_len = last_fit.as_ref().map_or(0, Probe::len);
        let mut violations = 0;

        while over.len() > 1 {
            let len = over.len() - 1;
            if len == known_fit_len {
                if let Some(fit) = last_fit.take() {
                    return Ok(Some(commit(fit, false)));
                }
            }

            let Some(shorter) = self.backtrack_probe(probe, &over, len, &mut violations)? else {
                return Ok(None);
            };
            if self.budget.fits(shorter.size()) {
                return Ok(Some(commit(shorter, false)));
            }
            over = shorter;
        }

        Ok(Some(commit(over, true)))
    }

    fn backtrack_bisect<D: DocumentAccessor + ?Sized>(
        &self,
        probe: &mut SizeProbe<'_, D>,
        last_fit: Option<Probe>,
        mut over: Probe,
    ) -> Result<Option<Part>> {
        // Invariant: length `lo` fits (0 = nothing known), length `hi` is over.
        let mut lo = last_fit.as_ref().map_or(0, Probe::len);
        let mut best = last_fit;
        let mut violations = 0;

        while over.len() - lo > 1 {
            let mid = lo + (over.len() - lo) / 2;
            let Some(candidate) = self.backtrack_probe(probe, &over, mid, &mut violations)? else {
                return Ok(None);
            };
            if self.budget.fits(candidate.size()) {
                lo = mid;
                best = Some(candidate);
            } else {
                over = candidate;
            }
        }

        match best {
            Some(fit) => Ok(Some(commit(fit, false))),
            // Nothing fits: `over` has shrunk to the first page of the part.
            None => Ok(Some(commit(over, true))),
        }
    }

    /// One backtracking probe of the first `len` pages of `over`. `None`
    /// means cancelled.
    ///
    /// Shrinking steps are bounded by the range length, so only steps where
    /// the shorter range measured larger count against `max_backtrack_steps`.
    fn backtrack_probe<D: DocumentAccessor + ?Sized>(
        &self,
        probe: &mut SizeProbe<'_, D>,
        over: &Probe,
        len: usize,
        violations: &mut usize,
    ) -> Result<Option<Probe>> {
        if self.cancel.is_cancelled() {
            return Ok(None);
        }

        let candidate = probe.measure_backtrack(over.range.truncate_to(len)?)?;
        if candidate.size() > over.size() {
            warn!(
                shorter = %candidate.range,
                shorter_size = candidate.size(),
                longer = %over.range,
                longer_size = over.size(),
                "serialized size shrank when pages were added"
            );
            *violations += 1;
            if *violations > self.settings.max_backtrack_steps {
                return Err(Error::serialization(
                    over.range,
                    format!(
                        "backtracking saw {} non-monotone size steps; page sizes must grow with length",
                        *violations
                    ),
                ));
            }
        }
        Ok(Some(candidate))
    }
}

fn commit(probe: Probe, exceeds_budget: bool) -> Part {
    Part {
        range: probe.range,
        bytes: probe.bytes,
        exceeds_budget,
    }
}
