//! Partition, package to disk, and read the manifest back.

use std::fs;

use pagesplit_core::hash::hash_bytes;
use pagesplit_core::prelude::*;
use pagesplit_exec::SplitEngine;
use pagesplit_io::{FsStorage, PartNamer, ResourceDocument, Storage, MANIFEST_FILE};

const DESCRIPTION: &str = r#"{
    "name": "handbook",
    "resources": [
        { "id": "serif", "size": 3000 },
        { "id": "cover-art", "size": 9000 }
    ],
    "pages": [
        { "size": 2000, "resources": ["serif", "cover-art"] },
        { "size": 2500, "resources": ["serif"] },
        { "size": 2500, "resources": ["serif"] },
        { "size": 2500, "resources": ["serif"] },
        { "size": 2500, "resources": ["serif"] },
        { "text": "index", "resources": [] }
    ]
}"#;

fn engine(max_bytes: f64) -> SplitEngine {
    SplitEngine::new(SplitConfig {
        max_bytes,
        ..SplitConfig::default()
    })
    .unwrap()
}

#[test]
fn test_split_to_disk_writes_parts_and_manifest() {
    let dir = tempfile::tempdir().unwrap();
    let doc_path = dir.path().join("handbook.json");
    fs::write(&doc_path, DESCRIPTION).unwrap();
    let out = dir.path().join("parts");
    let out_dir = out.to_str().unwrap();

    let doc = ResourceDocument::load(&doc_path).unwrap();
    let report = engine(16_000.0)
        .split_to(
            &doc,
            doc.name(),
            &FsStorage::new(),
            out_dir,
            &PartNamer::from_source_path(&doc_path),
            &NoProgress,
            &NeverCancel,
        )
        .unwrap()
        .expect("not cancelled");

    let manifest = report.manifest;
    assert!(manifest.parts.len() >= 2);
    assert_eq!(manifest.page_count, 6);
    assert_eq!(manifest.source_name, "handbook");

    // Pages are covered in order, 1-based in the manifest.
    let mut next_page = 1;
    for (i, entry) in manifest.parts.iter().enumerate() {
        assert_eq!(entry.number, i + 1);
        assert_eq!(entry.file_name, format!("handbook_part_{:03}.pdf", i + 1));
        assert_eq!(entry.first_page, next_page);
        next_page = entry.last_page + 1;

        let bytes = fs::read(out.join(&entry.file_name)).unwrap();
        assert_eq!(bytes.len(), entry.size_bytes);
        assert_eq!(hash_bytes(&bytes), entry.digest);
        let range = PageRange::new(entry.first_page - 1, entry.last_page - 1).unwrap();
        assert_eq!(bytes, doc.serialize_range(range).unwrap());
    }
    assert_eq!(next_page, 7);

    let on_disk: SplitManifest =
        serde_json::from_slice(&fs::read(out.join(MANIFEST_FILE)).unwrap()).unwrap();
    assert_eq!(on_disk.id, manifest.id);
    assert_eq!(on_disk.parts, manifest.parts);

    let listed = FsStorage::new().list(out_dir).unwrap();
    assert_eq!(listed.len(), manifest.parts.len() + 1);
}

#[test]
fn test_oversized_page_is_packaged_and_flagged() {
    let doc = ResourceDocument::from_json(DESCRIPTION).unwrap();
    let storage = pagesplit_io::MemoryStorage::new();

    // The cover page alone is larger than the budget.
    let report = engine(8_000.0)
        .split_to(
            &doc,
            "handbook",
            &storage,
            "out",
            &PartNamer::new("handbook", "pdf"),
            &NoProgress,
            &NeverCancel,
        )
        .unwrap()
        .unwrap();

    let first = &report.manifest.parts[0];
    assert_eq!((first.first_page, first.last_page), (1, 1));
    assert!(first.exceeds_budget);
    assert!(report.manifest.parts[1..].iter().all(|p| !p.exceeds_budget));
    assert!(storage.contains("out/handbook_part_001.pdf"));
}

#[test]
fn test_missing_document_is_a_load_error() {
    let err = ResourceDocument::load("/nonexistent/handbook.json").unwrap_err();
    assert!(matches!(err, Error::DocumentLoad(_)));
    assert!(err.is_preflight());
}
