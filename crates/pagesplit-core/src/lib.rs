#![forbid(unsafe_code)]
//! pagesplit-core: the shared vocabulary of the splitter.
//!
//! - `range`/`part`: page ranges, parts and the ordered `PartitionPlan`.
//! - `budget`: the byte budget and its safety margin.
//! - `accessor`: traits for the collaborators the partitioner talks to
//!   (document, progress sink, cancellation check).
//! - `config`, `error`, `id`, `hash`, `manifest`: ambient plumbing.
//!
//! **No I/O, no threads** here. Higher crates drive these types.

pub mod accessor;
pub mod budget;
pub mod config;
pub mod error;
pub mod hash;
pub mod id;
pub mod manifest;
pub mod part;
pub mod prelude;
pub mod range;

/// Crate version stamped into manifests.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub use error::{Error, Result};
