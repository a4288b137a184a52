use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

use pagesplit_core::error::{Error, Result};

use super::Storage;

/// Local filesystem storage (rooted at the host filesystem).
#[derive(Debug, Clone, Default)]
pub struct FsStorage;

impl FsStorage {
    pub fn new() -> Self {
        Self
    }
}

impl Storage for FsStorage {
    fn write(&self, path: &str, bytes: &[u8]) -> Result<()> {
        let p = Path::new(path);
        if let Some(parent) = p.parent() {
            fs::create_dir_all(parent).map_err(|e| Error::Io(format!("mkparent: {e}")))?;
        }
        let mut f = File::create(p).map_err(|e| Error::Io(format!("create {path}: {e}")))?;
        f.write_all(bytes)
            .map_err(|e| Error::Io(format!("write {path}: {e}")))?;
        f.flush().map_err(|e| Error::Io(format!("flush {path}: {e}")))?;
        Ok(())
    }

    fn read(&self, path: &str) -> Result<Vec<u8>> {
        fs::read(path).map_err(|e| Error::Io(format!("read {path}: {e}")))
    }

    fn delete(&self, path: &str) -> Result<()> {
        let p = Path::new(path);
        if p.exists() {
            fs::remove_file(p).map_err(|e| Error::Io(format!("delete {path}: {e}")))?;
        }
        Ok(())
    }

    fn list(&self, prefix: &str) -> Result<Vec<String>> {
        let prefix_path = Path::new(prefix);
        let mut results = Vec::new();

        if !prefix_path.exists() {
            return Ok(results);
        }

        if prefix_path.is_file() {
            if let Some(s) = prefix_path.to_str() {
                results.push(s.to_string());
            }
            return Ok(results);
        }

        fn visit_dirs(dir: &Path, results: &mut Vec<String>) -> std::io::Result<()> {
            if dir.is_dir() {
                for entry in fs::read_dir(dir)? {
                    let path = entry?.path();
                    if path.is_dir() {
                        visit_dirs(&path, results)?;
                    } else if let Some(s) = path.to_str() {
                        results.push(s.to_string());
                    }
                }
            }
            Ok(())
        }

        visit_dirs(prefix_path, &mut results).map_err(|e| Error::Io(format!("list: {e}")))?;
        results.sort();
        Ok(results)
    }

    fn size(&self, path: &str) -> Result<u64> {
        let meta = fs::metadata(path).map_err(|e| Error::Io(format!("size {path}: {e}")))?;
        Ok(meta.len())
    }
}
