//! Persistent record storage.
//!
//! A record is a named UTF-8 text document. The memory store, backups, world
//! texts, and story log all sit on top of [`RecordStore`]; the shipped backend
//! is [`FsRecordStore`] (one `.txt` file per record).

pub mod fs;
pub mod in_memory;

pub use fs::FsRecordStore;
pub use in_memory::InMemoryRecordStore;

use crate::error::Result;

/// A flat key → text store.
///
/// Reading a record that does not exist is not an error: it returns `None`.
pub trait RecordStore: Send + Sync {
    /// Read a record's full content.
    fn read(&self, name: &str) -> Result<Option<String>>;

    /// Replace a record's content, creating it if needed.
    fn write(&self, name: &str, content: &str) -> Result<()>;

    /// Delete a record. Returns `false` if it did not exist.
    fn remove(&self, name: &str) -> Result<bool>;

    /// Names of all records, sorted.
    fn list(&self) -> Result<Vec<String>>;

    fn exists(&self, name: &str) -> Result<bool> {
        Ok(self.read(name)?.is_some())
    }
}

impl<T: RecordStore + ?Sized> RecordStore for std::sync::Arc<T> {
    fn read(&self, name: &str) -> Result<Option<String>> {
        (**self).read(name)
    }

    fn write(&self, name: &str, content: &str) -> Result<()> {
        (**self).write(name, content)
    }

    fn remove(&self, name: &str) -> Result<bool> {
        (**self).remove(name)
    }

    fn list(&self) -> Result<Vec<String>> {
        (**self).list()
    }
}
