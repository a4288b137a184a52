//! Byte budget for a single part.
//!
//! The threshold the partitioner compares against is `max_bytes * safety_margin`.
//! Sizes are only observed at probe points, so the margin leaves headroom for
//! growth that happened between the last probe and the detected overflow.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Bytes per megabyte as the splitter counts them (binary MB).
pub const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SizeBudget {
    max_bytes: f64,
    safety_margin: f64,
}

impl SizeBudget {
    /// Validate and build. `max_bytes` must be positive and finite,
    /// `safety_margin` must lie in `(0, 1]`.
    pub fn new(max_bytes: f64, safety_margin: f64) -> Result<Self> {
        if !max_bytes.is_finite() || max_bytes <= 0.0 {
            return Err(Error::InvalidBudget(format!(
                "max bytes must be positive, got {max_bytes}"
            )));
        }
        if !safety_margin.is_finite() || safety_margin <= 0.0 || safety_margin > 1.0 {
            return Err(Error::InvalidBudget(format!(
                "safety margin must be in (0, 1], got {safety_margin}"
            )));
        }
        Ok(Self {
            max_bytes,
            safety_margin,
        })
    }

    /// Budget expressed in (binary) megabytes, the unit users type.
    pub fn from_megabytes(max_mb: f64, safety_margin: f64) -> Result<Self> {
        Self::new(max_mb * BYTES_PER_MB, safety_margin)
    }

    pub fn max_bytes(&self) -> f64 {
        self.max_bytes
    }

    pub fn safety_margin(&self) -> f64 {
        self.safety_margin
    }

    /// `max_bytes * safety_margin`; always positive for a validated budget.
    pub fn threshold(&self) -> f64 {
        self.max_bytes * self.safety_margin
    }

    /// Whether a serialized size stays within the threshold.
    pub fn fits(&self, size: usize) -> bool {
        size as f64 <= self.threshold()
    }

    /// Bytes still available under the threshold after `used` bytes.
    pub fn headroom(&self, used: usize) -> f64 {
        (self.threshold() - used as f64).max(0.0)
    }
}
