//! Destinations for packaged parts.
//!
//! - `fs`: local filesystem (default).
//! - `memory`: `HashMap` backend for tests and in-process callers.

mod fs;
mod memory;

pub use fs::FsStorage;
pub use memory::MemoryStorage;

use pagesplit_core::error::Result;

/// Abstract storage interface for part files and manifests.
pub trait Storage: Send + Sync {
    /// Write bytes to a path. Creates parent directories if needed.
    fn write(&self, path: &str, bytes: &[u8]) -> Result<()>;

    /// Read a whole object back.
    fn read(&self, path: &str) -> Result<Vec<u8>>;

    /// Delete a path. Idempotent (no error if path doesn't exist).
    fn delete(&self, path: &str) -> Result<()>;

    /// List all paths under a prefix, sorted.
    fn list(&self, prefix: &str) -> Result<Vec<String>>;

    /// Size of a path in bytes.
    fn size(&self, path: &str) -> Result<u64>;
}
