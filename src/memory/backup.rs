//! Backup-before-mutate.
//!
//! Every write to a short-term, long-term, or story record is preceded by a
//! verbatim copy of the record's prior content into the backup area, named
//! `<record>_backup_<YYYY-MM-DD_HH-MM>`. Two backups of the same record within
//! one minute share a name; the later one wins. Backups are never pruned or
//! restored automatically.

use std::sync::Arc;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::clock::{truncate_to_minute, Clock};
use crate::error::Result;
use crate::store::RecordStore;

/// Timestamp format inside backup record names.
pub const BACKUP_TIMESTAMP_FORMAT: &str = "%Y-%m-%d_%H-%M";

/// Reference to a backup that was just written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackupHandle {
    /// The record that was copied.
    pub record: String,
    /// Name of the copy in the backup area.
    pub backup: String,
    pub taken_at: NaiveDateTime,
}

/// Writes point-in-time copies of records into a dedicated store.
pub struct BackupService {
    area: Box<dyn RecordStore>,
    clock: Arc<dyn Clock>,
}

impl BackupService {
    pub fn new(area: Box<dyn RecordStore>, clock: Arc<dyn Clock>) -> Self {
        Self { area, clock }
    }

    /// Backup record name for `record` at `at`.
    pub fn backup_name(record: &str, at: NaiveDateTime) -> String {
        format!("{record}_backup_{}", at.format(BACKUP_TIMESTAMP_FORMAT))
    }

    /// Copy `record` from `source` into the backup area.
    ///
    /// Returns `None` when the record does not exist yet (nothing to protect).
    pub fn backup(&self, source: &dyn RecordStore, record: &str) -> Result<Option<BackupHandle>> {
        let Some(content) = source.read(record)? else {
            tracing::debug!(record, "no prior content, skipping backup");
            return Ok(None);
        };

        let taken_at = truncate_to_minute(self.clock.now());
        let backup = Self::backup_name(record, taken_at);
        self.area.write(&backup, &content)?;

        tracing::info!(record, backup = %backup, "backed up record");
        Ok(Some(BackupHandle {
            record: record.to_string(),
            backup,
            taken_at,
        }))
    }

    /// Read a backup's content back.
    pub fn load(&self, handle: &BackupHandle) -> Result<Option<String>> {
        self.area.read(&handle.backup)
    }

    /// All backup names for a record, oldest first.
    pub fn list_for(&self, record: &str) -> Result<Vec<String>> {
        let prefix = format!("{record}_backup_");
        Ok(self
            .area
            .list()?
            .into_iter()
            .filter(|name| name.starts_with(&prefix))
            .collect())
    }
}
