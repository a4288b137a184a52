//! Naming committed parts and writing them out with a manifest.

use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::Serialize;
use tracing::{debug, info};

use pagesplit_core::error::{Error, Result};
use pagesplit_core::manifest::SplitManifest;
use pagesplit_core::part::PartitionPlan;

use crate::storage::Storage;

/// File name of the manifest written next to the parts.
pub const MANIFEST_FILE: &str = "manifest.json";

/// `{stem}_part_{NNN}.{ext}`, numbered from 1.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartNamer {
    stem: String,
    ext: String,
}

impl PartNamer {
    pub fn new(stem: impl Into<String>, ext: impl Into<String>) -> Self {
        Self {
            stem: stem.into(),
            ext: ext.into(),
        }
    }

    /// Stem of the source file; parts keep the `pdf` extension.
    pub fn from_source_path(path: impl AsRef<Path>) -> Self {
        let stem = path
            .as_ref()
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| "document".to_string());
        Self::new(stem, "pdf")
    }

    pub fn stem(&self) -> &str {
        &self.stem
    }

    /// Name of the 1-based part `number`.
    pub fn name(&self, number: usize) -> String {
        format!("{}_part_{number:03}.{}", self.stem, self.ext)
    }
}

/// Write every part of `plan` under `out_dir`, then the manifest.
///
/// The returned manifest is the one written to `{out_dir}/manifest.json`.
pub fn package_plan(
    storage: &dyn Storage,
    out_dir: &str,
    namer: &PartNamer,
    plan: &PartitionPlan,
    mut manifest: SplitManifest,
) -> Result<SplitManifest> {
    manifest.record_plan(plan, |n| namer.name(n))?;

    for (entry, part) in manifest.parts.iter().zip(plan.parts()) {
        let path = join(out_dir, &entry.file_name);
        storage.write(&path, &part.bytes)?;
        debug!(path = %path, bytes = part.size(), "wrote part");
    }

    let manifest = manifest.finish(now_millis());
    storage.write(&join(out_dir, MANIFEST_FILE), &encode_pretty(&manifest)?)?;

    info!(
        out_dir,
        parts = manifest.parts.len(),
        bytes = plan.total_bytes(),
        "packaged plan"
    );
    Ok(manifest)
}

/// Pretty JSON for files written next to the parts.
fn encode_pretty<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>> {
    serde_json::to_vec_pretty(value).map_err(|e| Error::Io(format!("manifest encode: {e}")))
}

fn join(dir: &str, name: &str) -> String {
    Path::new(dir).join(name).to_string_lossy().into_owned()
}

/// Milliseconds since the Unix epoch; 0 if the clock is before it.
pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
