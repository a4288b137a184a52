#![forbid(unsafe_code)]
//! pagesplit-io: everything that touches bytes outside the partitioner.
//!
//! - `document`: `ResourceDocument`, a shared-resource page container.
//! - `scripted`: `ScriptedDocument`, a size-profile accessor for tests and dry runs.
//! - `storage`: where packaged parts go (filesystem or memory).
//! - `package`: naming parts and writing them with a manifest.

pub mod document;
pub mod package;
pub mod scripted;
pub mod storage;

pub use document::{DocumentDescription, ResourceDocument};
pub use package::{now_millis, package_plan, PartNamer, MANIFEST_FILE};
pub use scripted::ScriptedDocument;
pub use storage::{FsStorage, MemoryStorage, Storage};
