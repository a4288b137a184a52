//! Runtime: validate a `SplitConfig`, partition a document, package the parts.
//!
//! The engine holds no per-run state, so one instance can serve any number of
//! concurrent jobs.

use thiserror::Error;
use tracing::info;

use pagesplit_core::accessor::{CancellationCheck, DocumentAccessor, NeverCancel, NoProgress, ProgressSink};
use pagesplit_core::budget::SizeBudget;
use pagesplit_core::config::SplitConfig;
use pagesplit_core::manifest::SplitManifest;
use pagesplit_core::part::{PartitionPlan, PartitionStats, SplitOutcome};

use pagesplit_io::package::{now_millis, package_plan, PartNamer};
use pagesplit_io::storage::Storage;

use pagesplit_plan::Partitioner;

use crate::jobs::JobError;

#[derive(Debug, Error)]
pub enum ExecError {
    #[error(transparent)]
    Split(#[from] pagesplit_core::Error),
    #[error("job store: {0}")]
    Job(#[from] JobError),
    #[error("worker: {0}")]
    Worker(String),
}

/// Result of a packaged split.
#[derive(Debug, Clone)]
pub struct SplitReport {
    pub manifest: SplitManifest,
    pub stats: PartitionStats,
}

/// Owns a validated configuration and runs splits against it.
#[derive(Debug, Clone)]
pub struct SplitEngine {
    cfg: SplitConfig,
    budget: SizeBudget,
}

impl SplitEngine {
    /// Fails with the pre-flight error if `cfg` is invalid.
    pub fn new(cfg: SplitConfig) -> Result<Self, ExecError> {
        let budget = cfg.validate()?;
        Ok(Self { cfg, budget })
    }

    /// Engine configured from `PAGESPLIT_*` variables.
    pub fn from_env() -> Result<Self, ExecError> {
        Self::new(SplitConfig::from_env())
    }

    pub fn config(&self) -> &SplitConfig {
        &self.cfg
    }

    pub fn budget(&self) -> SizeBudget {
        self.budget
    }

    fn partitioner(&self) -> Partitioner<'static> {
        Partitioner::new(self.budget).with_settings((&self.cfg).into())
    }

    /// Partition with progress reporting and cooperative cancellation.
    pub fn partition<D: DocumentAccessor + ?Sized>(
        &self,
        doc: &D,
        progress: &dyn ProgressSink,
        cancel: &dyn CancellationCheck,
    ) -> Result<SplitOutcome, ExecError> {
        let outcome = self
            .partitioner()
            .with_progress(progress)
            .with_cancellation(cancel)
            .run(doc)?;
        Ok(outcome)
    }

    /// Partition to completion; no progress, no cancellation.
    pub fn plan<D: DocumentAccessor + ?Sized>(
        &self,
        doc: &D,
    ) -> Result<(PartitionPlan, PartitionStats), ExecError> {
        match self.partition(doc, &NoProgress, &NeverCancel)? {
            SplitOutcome::Completed { plan, stats } => Ok((plan, stats)),
            SplitOutcome::Cancelled => Err(ExecError::Worker(
                "partition cancelled without a cancellation source".into(),
            )),
        }
    }

    /// Partition and write the parts plus `manifest.json` under `out_dir`.
    ///
    /// `None` if cancelled; nothing is written in that case.
    #[allow(clippy::too_many_arguments)]
    pub fn split_to<D: DocumentAccessor + ?Sized>(
        &self,
        doc: &D,
        source_name: &str,
        storage: &dyn Storage,
        out_dir: &str,
        namer: &PartNamer,
        progress: &dyn ProgressSink,
        cancel: &dyn CancellationCheck,
    ) -> Result<Option<SplitReport>, ExecError> {
        let started = now_millis();
        let (plan, stats) = match self.partition(doc, progress, cancel)? {
            SplitOutcome::Completed { plan, stats } => (plan, stats),
            SplitOutcome::Cancelled => return Ok(None),
        };

        let manifest = SplitManifest::new(source_name, doc.page_count(), self.budget, started);
        let manifest = package_plan(storage, out_dir, namer, &plan, manifest)?;

        info!(
            source = source_name,
            parts = manifest.parts.len(),
            probes = stats.probes,
            elapsed_ms = manifest.finished_ms.saturating_sub(manifest.started_ms),
            "split written"
        );
        Ok(Some(SplitReport { manifest, stats }))
    }
}
