use thiserror::Error;

use crate::range::PageRange;

/// Canonical result for core.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid budget: {0}")]
    InvalidBudget(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Document could not be loaded: {0}")]
    DocumentLoad(String),

    #[error("Serialization failed for {range}: {reason}")]
    Serialization { range: PageRange, reason: String },

    #[error("Hashing error: {0}")]
    Hash(String),

    // The core crate does not do I/O, but higher layers map their I/O
    // errors into this variant.
    #[error("I/O error: {0}")]
    Io(String),

    #[error("Internal invariant failed: {0}")]
    Invariant(String),
}

impl Error {
    /// Shorthand used by accessors when a range cannot be rendered.
    pub fn serialization(range: PageRange, reason: impl Into<String>) -> Self {
        Error::Serialization {
            range,
            reason: reason.into(),
        }
    }

    /// True for the pre-flight failures a caller should present as validation
    /// errors rather than processing failures.
    pub fn is_preflight(&self) -> bool {
        matches!(
            self,
            Error::InvalidBudget(_) | Error::Config(_) | Error::DocumentLoad(_)
        )
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Hash(e.to_string())
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Io(e.to_string())
    }
}
