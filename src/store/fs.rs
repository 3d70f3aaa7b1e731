use std::path::{Path, PathBuf};

use super::RecordStore;
use crate::error::{Error, Result};

const EXTENSION: &str = "txt";

/// Directory-backed record store: record `name` lives at `<dir>/<name>.txt`.
///
/// The directory is created on first write. Writes go to a `.tmp` sibling and
/// are renamed into place so a crash never leaves a truncated record.
#[derive(Debug, Clone)]
pub struct FsRecordStore {
    dir: PathBuf,
}

impl FsRecordStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// On-disk path for a record.
    pub fn path_for(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{name}.{EXTENSION}"))
    }
}

impl RecordStore for FsRecordStore {
    fn read(&self, name: &str) -> Result<Option<String>> {
        match std::fs::read_to_string(self.path_for(name)) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(Error::storage(name, e)),
        }
    }

    fn write(&self, name: &str, content: &str) -> Result<()> {
        std::fs::create_dir_all(&self.dir).map_err(|e| Error::storage(name, e))?;

        let dest = self.path_for(name);
        let tmp = dest.with_extension("tmp");
        std::fs::write(&tmp, content).map_err(|e| Error::storage(name, e))?;
        std::fs::rename(&tmp, &dest).map_err(|e| {
            let _ = std::fs::remove_file(&tmp);
            Error::storage(name, e)
        })?;

        tracing::debug!(record = name, bytes = content.len(), "record written");
        Ok(())
    }

    fn remove(&self, name: &str) -> Result<bool> {
        match std::fs::remove_file(self.path_for(name)) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(Error::storage(name, e)),
        }
    }

    fn list(&self) -> Result<Vec<String>> {
        let entries = match std::fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(Error::storage(self.dir.display().to_string(), e)),
        };

        let mut names = Vec::new();
        for entry in entries {
            let path = entry
                .map_err(|e| Error::storage(self.dir.display().to_string(), e))?
                .path();
            if path.extension().and_then(|ext| ext.to_str()) != Some(EXTENSION) {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                names.push(stem.to_string());
            }
        }
        names.sort();
        Ok(names)
    }
}
