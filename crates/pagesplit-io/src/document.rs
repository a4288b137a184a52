//! Shared-resource page container.
//!
//! Pages reference named resources (fonts, images, ...). Rendering a range
//! writes each referenced resource once, so the size of a group of pages is
//! sub-additive in the standalone page sizes, like real paged formats.
//!
//! Layout of a rendered range:
//! ```text
//! "PSDOC1\n"
//! for each resource, in first-use order:  'R' u32(index) u64(len) bytes
//! for each page:  'P' u64(ordinal) u32(nrefs) u32(ref)* u64(len) body
//! "END\n"
//! ```
//! Appending a page never shrinks the output.
//!
//! Documents are described in JSON:
//! ```json
//! {
//!   "name": "report",
//!   "resources": [ { "id": "font", "size": 40000 }, { "id": "logo", "text": "..." } ],
//!   "pages": [ { "size": 1200, "resources": ["font", "logo"] }, { "text": "cover" } ]
//! }
//! ```
//! A resource or page carries either `text` or a filler `size`, not both.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use pagesplit_core::accessor::DocumentAccessor;
use pagesplit_core::error::{Error, Result};
use pagesplit_core::range::PageRange;

const HEADER: &[u8] = b"PSDOC1\n";
const TRAILER: &[u8] = b"END\n";
const RESOURCE_OVERHEAD: usize = 1 + 4 + 8;
const PAGE_OVERHEAD: usize = 1 + 8 + 4 + 8;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentDescription {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub resources: Vec<ContentDef>,
    pub pages: Vec<PageDef>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentDef {
    pub id: String,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub size: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageDef {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub size: Option<usize>,
    #[serde(default)]
    pub resources: Vec<String>,
}

#[derive(Debug, Clone)]
struct Page {
    body: Vec<u8>,
    refs: Vec<u32>,
}

/// In-memory document whose pages share resources.
#[derive(Debug, Clone, Default)]
pub struct ResourceDocument {
    name: String,
    resources: Vec<Vec<u8>>,
    pages: Vec<Page>,
}

impl ResourceDocument {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Register a resource and return its index for `add_page`.
    pub fn add_resource(&mut self, bytes: Vec<u8>) -> u32 {
        self.resources.push(bytes);
        (self.resources.len() - 1) as u32
    }

    /// Append a page referencing previously added resources.
    pub fn add_page(&mut self, body: Vec<u8>, refs: &[u32]) -> Result<usize> {
        if let Some(bad) = refs.iter().find(|r| **r as usize >= self.resources.len()) {
            return Err(Error::DocumentLoad(format!(
                "page {} references unknown resource #{bad}",
                self.pages.len() + 1
            )));
        }
        self.pages.push(Page {
            body,
            refs: refs.to_vec(),
        });
        Ok(self.pages.len() - 1)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Load a JSON description from disk.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .map_err(|e| Error::DocumentLoad(format!("{}: {e}", path.display())))?;
        let mut doc = Self::from_json(&text)?;
        if doc.name.is_empty() {
            doc.name = path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default();
        }
        Ok(doc)
    }

    pub fn from_json(text: &str) -> Result<Self> {
        let desc: DocumentDescription = serde_json::from_str(text)
            .map_err(|e| Error::DocumentLoad(format!("malformed description: {e}")))?;
        Self::from_description(&desc)
    }

    pub fn from_description(desc: &DocumentDescription) -> Result<Self> {
        let mut doc = Self::new(desc.name.clone().unwrap_or_default());
        let mut ids: HashMap<&str, u32> = HashMap::new();

        for res in &desc.resources {
            let bytes = content(&format!("resource '{}'", res.id), &res.text, res.size)?;
            let idx = doc.add_resource(bytes);
            if ids.insert(res.id.as_str(), idx).is_some() {
                return Err(Error::DocumentLoad(format!(
                    "duplicate resource id '{}'",
                    res.id
                )));
            }
        }

        for (i, page) in desc.pages.iter().enumerate() {
            let body = content(&format!("page {}", i + 1), &page.text, page.size)?;
            let refs = page
                .resources
                .iter()
                .map(|id| {
                    ids.get(id.as_str()).copied().ok_or_else(|| {
                        Error::DocumentLoad(format!(
                            "page {} references unknown resource '{id}'",
                            i + 1
                        ))
                    })
                })
                .collect::<Result<Vec<_>>>()?;
            doc.add_page(body, &refs)?;
        }

        debug!(name = %doc.name, pages = doc.pages.len(), resources = doc.resources.len(),
            "loaded document");
        Ok(doc)
    }

    /// Resources referenced by `range`, in first-use order, each once.
    fn resources_used(&self, range: PageRange) -> Vec<u32> {
        let mut seen = vec![false; self.resources.len()];
        let mut order = Vec::new();
        for page in &self.pages[range.start()..=range.end()] {
            for &r in &page.refs {
                if !std::mem::replace(&mut seen[r as usize], true) {
                    order.push(r);
                }
            }
        }
        order
    }

    /// Size `serialize_range` would produce, without building the buffer.
    pub fn encoded_len(&self, range: PageRange) -> Result<usize> {
        self.check_range(range)?;
        let resources: usize = self
            .resources_used(range)
            .iter()
            .map(|&r| RESOURCE_OVERHEAD + self.resources[r as usize].len())
            .sum();
        let pages: usize = self.pages[range.start()..=range.end()]
            .iter()
            .map(|p| PAGE_OVERHEAD + 4 * p.refs.len() + p.body.len())
            .sum();
        Ok(HEADER.len() + resources + pages + TRAILER.len())
    }

    fn check_range(&self, range: PageRange) -> Result<()> {
        if range.end() >= self.pages.len() {
            return Err(Error::serialization(
                range,
                format!("document has {} pages", self.pages.len()),
            ));
        }
        Ok(())
    }
}

impl DocumentAccessor for ResourceDocument {
    fn page_count(&self) -> usize {
        self.pages.len()
    }

    fn serialize_range(&self, range: PageRange) -> Result<Vec<u8>> {
        let mut out = Vec::with_capacity(self.encoded_len(range)?);
        out.extend_from_slice(HEADER);

        for r in self.resources_used(range) {
            let bytes = &self.resources[r as usize];
            out.push(b'R');
            out.extend_from_slice(&r.to_le_bytes());
            out.extend_from_slice(&(bytes.len() as u64).to_le_bytes());
            out.extend_from_slice(bytes);
        }

        for ordinal in range.pages() {
            let page = &self.pages[ordinal];
            out.push(b'P');
            out.extend_from_slice(&(ordinal as u64).to_le_bytes());
            out.extend_from_slice(&(page.refs.len() as u32).to_le_bytes());
            for r in &page.refs {
                out.extend_from_slice(&r.to_le_bytes());
            }
            out.extend_from_slice(&(page.body.len() as u64).to_le_bytes());
            out.extend_from_slice(&page.body);
        }

        out.extend_from_slice(TRAILER);
        Ok(out)
    }

    fn total_source_size_hint(&self) -> Option<u64> {
        let all = PageRange::with_len(0, self.pages.len()).ok()?;
        self.encoded_len(all).ok().map(|n| n as u64)
    }
}

fn content(what: &str, text: &Option<String>, size: Option<usize>) -> Result<Vec<u8>> {
    match (text, size) {
        (Some(t), None) => Ok(t.as_bytes().to_vec()),
        (None, Some(n)) => Ok(filler(n)),
        (Some(_), Some(_)) => Err(Error::DocumentLoad(format!(
            "{what} has both text and size"
        ))),
        (None, None) => Err(Error::DocumentLoad(format!("{what} has no content"))),
    }
}

/// Deterministic, non-repeating-looking padding.
fn filler(n: usize) -> Vec<u8> {
    (0..n).map(|i| (i % 251) as u8).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> ResourceDocument {
        ResourceDocument::from_json(
            r#"{
                "name": "sample",
                "resources": [ { "id": "font", "size": 1000 }, { "id": "logo", "size": 500 } ],
                "pages": [
                    { "size": 100, "resources": ["font", "logo"] },
                    { "size": 100, "resources": ["font"] },
                    { "text": "appendix", "resources": [] }
                ]
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn shared_resources_are_written_once() {
        let doc = sample();
        let first = doc.serialize_range(PageRange::single(0)).unwrap().len();
        let second = doc.serialize_range(PageRange::single(1)).unwrap().len();
        let both = doc.serialize_range(PageRange::new(0, 1).unwrap()).unwrap().len();
        assert!(both < first + second);
        assert!(both > first);
    }

    #[test]
    fn encoded_len_matches_buffer() {
        let doc = sample();
        for (s, e) in [(0, 0), (0, 2), (1, 2), (2, 2)] {
            let r = PageRange::new(s, e).unwrap();
            assert_eq!(doc.encoded_len(r).unwrap(), doc.serialize_range(r).unwrap().len());
        }
        let hint = doc.total_source_size_hint().unwrap();
        assert_eq!(hint as usize, doc.encoded_len(PageRange::new(0, 2).unwrap()).unwrap());
    }

    #[test]
    fn sizes_grow_with_trailing_pages() {
        let doc = sample();
        let mut prev = 0;
        for end in 0..3 {
            let len = doc.encoded_len(PageRange::new(0, end).unwrap()).unwrap();
            assert!(len >= prev);
            prev = len;
        }
    }

    #[test]
    fn out_of_bounds_range_is_a_serialization_error() {
        let doc = sample();
        let err = doc.serialize_range(PageRange::new(2, 5).unwrap()).unwrap_err();
        assert!(matches!(err, Error::Serialization { .. }));
    }

    #[test]
    fn bad_descriptions_fail_to_load() {
        let unknown = r#"{ "pages": [ { "size": 1, "resources": ["nope"] } ] }"#;
        assert!(matches!(
            ResourceDocument::from_json(unknown),
            Err(Error::DocumentLoad(_))
        ));
        let both = r#"{ "pages": [ { "size": 1, "text": "x" } ] }"#;
        assert!(matches!(ResourceDocument::from_json(both), Err(Error::DocumentLoad(_))));
        assert!(matches!(
            ResourceDocument::from_json("not json"),
            Err(Error::DocumentLoad(_))
        ));
        assert!(matches!(
            ResourceDocument::load("/definitely/not/here.json"),
            Err(Error::DocumentLoad(_))
        ));
    }

    #[test]
    fn empty_document_has_no_hint() {
        let doc = ResourceDocument::from_json(r#"{ "pages": [] }"#).unwrap();
        assert_eq!(doc.page_count(), 0);
        assert_eq!(doc.total_source_size_hint(), None);
    }
}
