//! Splitter configuration that downstream crates can serialize/deserialize.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::budget::SizeBudget;
use crate::error::{Error, Result};

/// How an over-budget pending range is shrunk back to its boundary.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BacktrackStrategy {
    /// Drop one tail page per probe.
    #[default]
    Linear,
    /// Binary search between the last fitting length and the overflowing one.
    Bisect,
}

impl FromStr for BacktrackStrategy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "linear" => Ok(Self::Linear),
            "bisect" | "binary" => Ok(Self::Bisect),
            other => Err(Error::Config(format!("unknown backtrack strategy '{other}'"))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SplitConfig {
    /// Nominal per-part byte budget.
    pub max_bytes: f64,

    /// Ratio in (0, 1] applied to `max_bytes` to get the probe threshold.
    pub safety_margin: f64,

    /// Fixed batch width overriding the computed one (tuning only).
    pub batch_hint: Option<usize>,

    /// Factor < 1 applied to the computed batch width to avoid overshoot.
    pub damping: f64,

    /// Batch width used when no size information is available yet.
    pub fallback_batch: usize,

    pub backtrack: BacktrackStrategy,

    /// Backtracking steps per part allowed to measure larger than the longer
    /// range before them. Shrinking steps are not counted.
    pub max_backtrack_steps: usize,

    /// Finished or idle jobs are dropped from the job store after this long.
    pub job_ttl_secs: u64,
}

impl Default for SplitConfig {
    fn default() -> Self {
        Self {
            max_bytes: 4.0 * crate::budget::BYTES_PER_MB, // 4 MiB default
            safety_margin: 0.9,
            batch_hint: None,
            damping: 0.4,
            fallback_batch: 5,
            backtrack: BacktrackStrategy::Linear,
            max_backtrack_steps: 4096,
            job_ttl_secs: 3600,
        }
    }
}

impl SplitConfig {
    /// Create a config from environment variables, falling back to defaults.
    ///
    /// Environment variables:
    /// - `PAGESPLIT_MAX_BYTES`: per-part budget in bytes
    /// - `PAGESPLIT_SAFETY_MARGIN`: margin ratio
    /// - `PAGESPLIT_BATCH_HINT`: fixed batch width
    /// - `PAGESPLIT_DAMPING`: batch damping factor
    /// - `PAGESPLIT_FALLBACK_BATCH`: batch width without size information
    /// - `PAGESPLIT_BACKTRACK`: `linear` or `bisect`
    /// - `PAGESPLIT_MAX_BACKTRACK_STEPS`: non-monotone backtracking steps allowed per part
    /// - `PAGESPLIT_JOB_TTL_SECS`: job time-to-live
    ///
    /// Values that do not parse are ignored.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as `from_env`, reading from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut cfg = Self::default();

        if let Some(v) = parse_var::<f64>(&lookup, "PAGESPLIT_MAX_BYTES") {
            cfg.max_bytes = v;
        }
        if let Some(v) = parse_var::<f64>(&lookup, "PAGESPLIT_SAFETY_MARGIN") {
            cfg.safety_margin = v;
        }
        if let Some(v) = parse_var::<usize>(&lookup, "PAGESPLIT_BATCH_HINT") {
            cfg.batch_hint = Some(v);
        }
        if let Some(v) = parse_var::<f64>(&lookup, "PAGESPLIT_DAMPING") {
            cfg.damping = v;
        }
        if let Some(v) = parse_var::<usize>(&lookup, "PAGESPLIT_FALLBACK_BATCH") {
            cfg.fallback_batch = v;
        }
        if let Some(v) = parse_var::<BacktrackStrategy>(&lookup, "PAGESPLIT_BACKTRACK") {
            cfg.backtrack = v;
        }
        if let Some(v) = parse_var::<usize>(&lookup, "PAGESPLIT_MAX_BACKTRACK_STEPS") {
            cfg.max_backtrack_steps = v;
        }
        if let Some(v) = parse_var::<u64>(&lookup, "PAGESPLIT_JOB_TTL_SECS") {
            cfg.job_ttl_secs = v;
        }

        cfg
    }

    /// Set the budget from a megabyte figure.
    pub fn with_max_megabytes(mut self, mb: f64) -> Self {
        self.max_bytes = mb * crate::budget::BYTES_PER_MB;
        self
    }

    /// The validated budget.
    pub fn budget(&self) -> Result<SizeBudget> {
        SizeBudget::new(self.max_bytes, self.safety_margin)
    }

    /// Check every field before any page is touched.
    pub fn validate(&self) -> Result<SizeBudget> {
        let budget = self.budget()?;
        if self.batch_hint == Some(0) {
            return Err(Error::Config("batch hint must be positive".into()));
        }
        if !(self.damping > 0.0 && self.damping <= 1.0) {
            return Err(Error::Config(format!(
                "damping must be in (0, 1], got {}",
                self.damping
            )));
        }
        if self.fallback_batch == 0 {
            return Err(Error::Config("fallback batch must be positive".into()));
        }
        if self.max_backtrack_steps == 0 {
            return Err(Error::Config("max backtrack steps must be positive".into()));
        }
        Ok(budget)
    }
}

fn parse_var<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    lookup(key).and_then(|s| s.trim().parse::<T>().ok())
}
