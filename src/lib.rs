#![forbid(unsafe_code)]
//! pagesplit: split paged documents into size-bounded parts.
//!
//! Facade over the workspace crates:
//! - `core`: ranges, budgets, parts, config, errors, collaborator traits.
//! - `plan`: the partitioner.
//! - `io`: document containers, storage, packaging.
//! - `exec`: engine, job store, background tasks.

pub use pagesplit_core as core;
pub use pagesplit_exec as exec;
pub use pagesplit_io as io;
pub use pagesplit_plan as plan;

pub use pagesplit_core::{Error, Result};
pub use pagesplit_exec::SplitEngine;
pub use pagesplit_plan::Partitioner;
