//! Storage backend seam.

use std::collections::HashMap;
use std::sync::RwLock;

use crate::error::Result;

/// A keyed text-record store.
///
/// Backends are dumb: one serialized record per key, no knowledge of what
/// the record means. Failure recovery (degrading to a no-op) happens in the
/// adapter, not here; backends report their errors honestly.
pub trait StorageBackend: Send + Sync {
    /// Reads the record under `key`, `None` when absent.
    fn read(&self, key: &str) -> Result<Option<String>>;

    /// Writes the record under `key`, replacing any previous value.
    fn write(&self, key: &str, value: &str) -> Result<()>;

    /// Removes the record under `key`. Absent keys are a no-op.
    fn remove(&self, key: &str) -> Result<()>;
}

/// In-memory backend for tests and environments without persistence.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    records: RwLock<HashMap<String, String>>,
}

impl MemoryBackend {
    /// Creates an empty backend.
    pub fn new() -> Self {
        Self::default()
    }
}

impl StorageBackend for MemoryBackend {
    fn read(&self, key: &str) -> Result<Option<String>> {
        Ok(self.records.read().unwrap().get(key).cloned())
    }

    fn write(&self, key: &str, value: &str) -> Result<()> {
        self.records
            .write()
            .unwrap()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.records.write().unwrap().remove(key);
        Ok(())
    }
}
