use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use super::RecordStore;
use crate::error::{Error, Result};

/// Process-local record store.
///
/// Can be flipped read-only to simulate an unwritable disk.
#[derive(Debug, Default)]
pub struct InMemoryRecordStore {
    records: Mutex<BTreeMap<String, String>>,
    read_only: AtomicBool,
}

impl InMemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent `write`/`remove` fail with a storage error.
    pub fn set_read_only(&self, read_only: bool) {
        self.read_only.store(read_only, Ordering::SeqCst);
    }

    fn check_writable(&self, name: &str) -> Result<()> {
        if self.read_only.load(Ordering::SeqCst) {
            return Err(Error::storage(
                name,
                std::io::Error::new(std::io::ErrorKind::PermissionDenied, "store is read-only"),
            ));
        }
        Ok(())
    }

    fn records(&self) -> std::sync::MutexGuard<'_, BTreeMap<String, String>> {
        self.records.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl RecordStore for InMemoryRecordStore {
    fn read(&self, name: &str) -> Result<Option<String>> {
        Ok(self.records().get(name).cloned())
    }

    fn write(&self, name: &str, content: &str) -> Result<()> {
        self.check_writable(name)?;
        self.records().insert(name.to_string(), content.to_string());
        Ok(())
    }

    fn remove(&self, name: &str) -> Result<bool> {
        self.check_writable(name)?;
        Ok(self.records().remove(name).is_some())
    }

    fn list(&self) -> Result<Vec<String>> {
        Ok(self.records().keys().cloned().collect())
    }
}
