//! In-memory storage backend.
//!
//! `HashMap`-based; used by tests and by callers that ship parts elsewhere
//! without touching the disk.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use pagesplit_core::error::{Error, Result};

use super::Storage;

/// Thread-safe in-memory storage.
#[derive(Clone, Default)]
pub struct MemoryStorage {
    data: Arc<Mutex<HashMap<String, Vec<u8>>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    // A panic while holding the lock cannot leave the map half-written.
    fn data(&self) -> MutexGuard<'_, HashMap<String, Vec<u8>>> {
        self.data.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn contains(&self, path: &str) -> bool {
        self.data().contains_key(path)
    }

    pub fn len(&self) -> usize {
        self.data().len()
    }

    pub fn is_empty(&self) -> bool {
        self.data().is_empty()
    }
}

impl Storage for MemoryStorage {
    fn write(&self, path: &str, bytes: &[u8]) -> Result<()> {
        self.data().insert(path.to_string(), bytes.to_vec());
        Ok(())
    }

    fn read(&self, path: &str) -> Result<Vec<u8>> {
        self.data()
            .get(path)
            .cloned()
            .ok_or_else(|| Error::Io(format!("path not found: {path}")))
    }

    fn delete(&self, path: &str) -> Result<()> {
        self.data().remove(path);
        Ok(())
    }

    fn list(&self, prefix: &str) -> Result<Vec<String>> {
        let mut result: Vec<String> = self
            .data()
            .keys()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect();
        result.sort();
        Ok(result)
    }

    fn size(&self, path: &str) -> Result<u64> {
        self.data()
            .get(path)
            .map(|b| b.len() as u64)
            .ok_or_else(|| Error::Io(format!("path not found: {path}")))
    }
}
