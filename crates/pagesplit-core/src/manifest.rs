//! Split manifest written next to the packaged parts.
//!
//! Lists every part with its page span and digest so a consumer can check
//! that the whole document is accounted for without opening the parts.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::budget::SizeBudget;
use crate::hash::{hash_bytes, hash_serde, Hash256};
use crate::part::{Part, PartitionPlan};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ManifestId(pub Uuid);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartEntry {
    /// 1-based part number.
    pub number: usize,
    pub file_name: String,
    /// 1-based, inclusive page span.
    pub first_page: usize,
    pub last_page: usize,
    pub size_bytes: usize,
    pub digest: Hash256,
    pub exceeds_budget: bool,
}

impl PartEntry {
    pub fn new(number: usize, file_name: String, part: &Part) -> Self {
        Self {
            number,
            file_name,
            first_page: part.range.start() + 1,
            last_page: part.range.end() + 1,
            size_bytes: part.size(),
            digest: hash_bytes(&part.bytes),
            exceeds_budget: part.exceeds_budget,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SplitManifest {
    pub id: ManifestId,

    /// Version of the splitter that produced the parts.
    pub splitter_version: String,

    pub source_name: String,
    pub page_count: usize,
    pub budget: SizeBudget,

    pub parts: Vec<PartEntry>,

    /// Digest over the ordered entries (spans + part digests).
    pub plan_digest: Option<Hash256>,

    /// Milliseconds since Unix epoch (UTC).
    pub started_ms: u64,
    pub finished_ms: u64,
}

impl SplitManifest {
    pub fn new(source_name: &str, page_count: usize, budget: SizeBudget, started_ms: u64) -> Self {
        Self {
            id: ManifestId(Uuid::new_v4()),
            splitter_version: crate::VERSION.to_string(),
            source_name: source_name.to_string(),
            page_count,
            budget,
            parts: Vec::new(),
            plan_digest: None,
            started_ms,
            finished_ms: started_ms,
        }
    }

    /// Record entries for every part of `plan`, named by `name_of(number)`.
    pub fn record_plan(
        &mut self,
        plan: &PartitionPlan,
        mut name_of: impl FnMut(usize) -> String,
    ) -> crate::Result<()> {
        self.parts = plan
            .parts()
            .iter()
            .enumerate()
            .map(|(i, part)| PartEntry::new(i + 1, name_of(i + 1), part))
            .collect();
        self.plan_digest = Some(hash_serde(&self.parts)?);
        Ok(())
    }

    pub fn finish(mut self, finished_ms: u64) -> Self {
        self.finished_ms = finished_ms;
        self
    }
}
