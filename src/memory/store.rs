//! Write path — character tiers, the shared story log, and recovery markers.
//!
//! [`MemoryStore`] owns three record tiers per character plus the story log.
//! Every mutation backs up the record it is about to replace first. The
//! two-record [`consolidate`](MemoryStore::consolidate) write is bracketed by a
//! recovery marker so an interrupted run is detectable on the next start.

use std::sync::Arc;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::backup::{BackupHandle, BackupService};
use super::codec::{self, TierDocument};
use super::types::{CharacterKey, CharacterProfile, ConsolidationEntry, MemoryEntry, Tier};
use crate::clock::{Clock, SystemClock};
use crate::config::StorageConfig;
use crate::error::{Error, Result};
use crate::store::{FsRecordStore, RecordStore};

/// Result of appending a short-term memory.
#[derive(Debug, Clone)]
pub struct AppendReceipt {
    /// Short-term entry count after the append.
    pub entry_count: usize,
    pub backup: Option<BackupHandle>,
}

/// Result of a committed consolidation.
#[derive(Debug, Clone)]
pub struct ConsolidationReceipt {
    pub key: CharacterKey,
    pub source_count: usize,
    /// Long-term entry count after the append.
    pub longterm_entries: usize,
    pub shortterm_backup: Option<BackupHandle>,
    pub longterm_backup: Option<BackupHandle>,
}

/// Written before the first consolidation write, removed after the second.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecoveryMarker {
    pub character: CharacterKey,
    pub started_at: NaiveDateTime,
    pub source_count: usize,
    pub shortterm_backup: Option<String>,
    pub longterm_backup: Option<String>,
}

/// Tiered per-character memory and the shared story log.
pub struct MemoryStore {
    characters: Box<dyn RecordStore>,
    story: Box<dyn RecordStore>,
    backups: BackupService,
    clock: Arc<dyn Clock>,
    story_record: String,
}

impl MemoryStore {
    pub fn new(
        characters: Box<dyn RecordStore>,
        story: Box<dyn RecordStore>,
        backups: BackupService,
        clock: Arc<dyn Clock>,
        story_record: impl Into<String>,
    ) -> Self {
        Self {
            characters,
            story,
            backups,
            clock,
            story_record: story_record.into(),
        }
    }

    /// Open the directory-backed store described by `config`.
    pub fn open(config: &StorageConfig) -> Self {
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let backups = BackupService::new(
            Box::new(FsRecordStore::new(config.backup_path())),
            clock.clone(),
        );
        tracing::debug!(root = %config.resolved_root().display(), "opening memory store");
        Self::new(
            Box::new(FsRecordStore::new(config.characters_path())),
            Box::new(FsRecordStore::new(config.story_path())),
            backups,
            clock,
            config.story_record.clone(),
        )
    }

    pub fn backups(&self) -> &BackupService {
        &self.backups
    }

    // ── Reads ────────────────────────────────────────────────────────────────

    /// Raw content of one tier. A missing record is `None`, not an error.
    pub fn load(&self, key: &CharacterKey, tier: Tier) -> Result<Option<String>> {
        self.characters.read(&key.record_name(tier))
    }

    /// Decoded short-term record; absent reads as header-only.
    pub fn shortterm(&self, key: &CharacterKey) -> Result<TierDocument<MemoryEntry>> {
        Ok(match self.load(key, Tier::Shortterm)? {
            Some(text) => codec::decode(&text),
            None => TierDocument::new(shortterm_header(key)),
        })
    }

    /// Decoded long-term record; absent reads as header-only.
    pub fn longterm(&self, key: &CharacterKey) -> Result<TierDocument<ConsolidationEntry>> {
        Ok(match self.load(key, Tier::Longterm)? {
            Some(text) => codec::decode(&text),
            None => TierDocument::new(longterm_header(key)),
        })
    }

    pub fn count_shortterm_entries(&self, key: &CharacterKey) -> Result<usize> {
        Ok(codec::count_entries(
            self.load(key, Tier::Shortterm)?.as_deref(),
        ))
    }

    /// `true` if any tier record exists for `key`.
    pub fn character_exists(&self, key: &CharacterKey) -> Result<bool> {
        for tier in Tier::ALL {
            if self.characters.exists(&key.record_name(tier))? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Every character with a background record, sorted by key.
    pub fn list_characters(&self) -> Result<Vec<CharacterKey>> {
        Ok(self
            .characters
            .list()?
            .iter()
            .filter_map(|name| CharacterKey::from_record_name(name, Tier::Background))
            .collect())
    }

    /// The story log, or an empty string if none has been written.
    pub fn story_log(&self) -> Result<String> {
        Ok(self.story.read(&self.story_record)?.unwrap_or_default())
    }

    // ── Writes ───────────────────────────────────────────────────────────────

    /// Create all three tier records for a new character.
    ///
    /// Fails with [`Error::AlreadyExists`] if any tier is already present; an
    /// existing character is never silently overwritten.
    pub fn create_character(
        &self,
        name: &str,
        profile: &CharacterProfile,
    ) -> Result<CharacterKey> {
        let key = CharacterKey::parse(name).ok_or(Error::EmptyInput {
            what: "character name",
        })?;
        if self.character_exists(&key)? {
            return Err(Error::AlreadyExists {
                key: key.to_string(),
            });
        }

        self.characters
            .write(&key.record_name(Tier::Background), &profile.render(&key))?;
        self.characters.write(
            &key.record_name(Tier::Shortterm),
            &codec::encode::<MemoryEntry>(&TierDocument::new(shortterm_header(&key))),
        )?;
        self.characters.write(
            &key.record_name(Tier::Longterm),
            &codec::encode::<ConsolidationEntry>(&TierDocument::new(longterm_header(&key))),
        )?;

        tracing::info!(key = %key, "character created");
        Ok(key)
    }

    /// Back up the short-term record, then append one timestamped entry.
    pub fn append_shortterm(&self, key: &CharacterKey, text: &str) -> Result<AppendReceipt> {
        let entry = MemoryEntry::new(self.clock.now(), text);
        if entry.text.is_empty() {
            return Err(Error::EmptyInput {
                what: "memory text",
            });
        }

        let record = key.record_name(Tier::Shortterm);
        let mut doc = self.shortterm(key)?;
        let backup = self.backups.backup(&*self.characters, &record)?;

        doc.entries.push(entry);
        self.characters.write(&record, &codec::encode(&doc))?;

        let entry_count = doc.len();
        tracing::info!(key = %key, entry_count, "short-term memory appended");
        Ok(AppendReceipt {
            entry_count,
            backup,
        })
    }

    /// Append a consolidated summary to long-term memory and reset short-term
    /// to its header.
    ///
    /// Long-term is written first. If that write fails nothing has changed. If
    /// the short-term reset then fails, [`Error::ConsolidationInterrupted`] is
    /// returned and the recovery marker stays behind.
    pub fn consolidate(
        &self,
        key: &CharacterKey,
        summary: &str,
        source_count: usize,
    ) -> Result<ConsolidationReceipt> {
        let now = self.clock.now();
        let entry = ConsolidationEntry::new(now, source_count, summary);
        if entry.text.is_empty() {
            return Err(Error::EmptyInput {
                what: "consolidated summary",
            });
        }

        let shortterm_record = key.record_name(Tier::Shortterm);
        let longterm_record = key.record_name(Tier::Longterm);

        let mut longterm = self.longterm(key)?;
        let shortterm = self.shortterm(key)?;

        let shortterm_backup = self
            .backups
            .backup(&*self.characters, &shortterm_record)?;
        let longterm_backup = self
            .backups
            .backup(&*self.characters, &longterm_record)?;

        let marker = RecoveryMarker {
            character: key.clone(),
            started_at: now,
            source_count,
            shortterm_backup: shortterm_backup.as_ref().map(|b| b.backup.clone()),
            longterm_backup: longterm_backup.as_ref().map(|b| b.backup.clone()),
        };
        self.write_marker(&marker)?;

        longterm.entries.push(entry);
        if let Err(e) = self
            .characters
            .write(&longterm_record, &codec::encode(&longterm))
        {
            self.clear_marker_after_failure(key);
            return Err(e);
        }

        let reset = TierDocument::<MemoryEntry>::new(header_or(&shortterm.header, || {
            shortterm_header(key)
        }));
        if let Err(e) = self.characters.write(&shortterm_record, &codec::encode(&reset)) {
            tracing::error!(
                key = %key,
                error = %e,
                shortterm_backup = marker.shortterm_backup.as_deref().unwrap_or("none"),
                longterm_backup = marker.longterm_backup.as_deref().unwrap_or("none"),
                "CONSOLIDATION INTERRUPTED: long-term written but short-term not reset; \
                 restore short-term by hand or clear its entries"
            );
            return Err(Error::ConsolidationInterrupted {
                key: key.to_string(),
                shortterm_backup: marker.shortterm_backup,
            });
        }

        self.characters.remove(&marker_record(key))?;

        tracing::info!(key = %key, source_count, "consolidation committed");
        Ok(ConsolidationReceipt {
            key: key.clone(),
            source_count,
            longterm_entries: longterm.len(),
            shortterm_backup,
            longterm_backup,
        })
    }

    /// Back up the story log, then append a block to it.
    pub fn append_story(&self, block: &str) -> Result<Option<BackupHandle>> {
        let block = block.trim();
        if block.is_empty() {
            return Err(Error::EmptyInput { what: "scene text" });
        }

        let current = self.story.read(&self.story_record)?.unwrap_or_default();
        let backup = self.backups.backup(&*self.story, &self.story_record)?;

        let current = current.trim_end();
        let updated = if current.is_empty() {
            format!("{block}\n")
        } else {
            format!("{current}\n\n{block}\n")
        };
        self.story.write(&self.story_record, &updated)?;

        tracing::info!(record = %self.story_record, bytes = block.len(), "scene appended to story log");
        Ok(backup)
    }

    // ── Recovery markers ─────────────────────────────────────────────────────

    /// Consolidations that started but never finished.
    pub fn pending_recoveries(&self) -> Result<Vec<RecoveryMarker>> {
        let mut markers = Vec::new();
        for name in self.characters.list()? {
            let Some(key) = marker_key(&name) else {
                continue;
            };
            let Some(content) = self.characters.read(&name)? else {
                continue;
            };
            let marker = serde_json::from_str(&content).map_err(|source| {
                Error::RecoveryMarker {
                    key: key.to_string(),
                    source,
                }
            })?;
            markers.push(marker);
        }
        Ok(markers)
    }

    /// Acknowledge a repaired consolidation. Returns `false` if none was pending.
    pub fn clear_recovery(&self, key: &CharacterKey) -> Result<bool> {
        let removed = self.characters.remove(&marker_record(key))?;
        if removed {
            tracing::info!(key = %key, "recovery marker cleared");
        }
        Ok(removed)
    }

    fn write_marker(&self, marker: &RecoveryMarker) -> Result<()> {
        let json = serde_json::to_string_pretty(marker).map_err(|source| Error::RecoveryMarker {
            key: marker.character.to_string(),
            source,
        })?;
        self.characters.write(&marker_record(&marker.character), &json)
    }

    fn clear_marker_after_failure(&self, key: &CharacterKey) {
        if let Err(e) = self.characters.remove(&marker_record(key)) {
            tracing::warn!(key = %key, error = %e, "could not remove recovery marker");
        }
    }
}

/// Header of a fresh short-term record.
pub fn shortterm_header(key: &CharacterKey) -> String {
    format!(
        "CHARACTER: {}\nSHORT-TERM MEMORY (Recent detailed memories):",
        key.display_name()
    )
}

/// Header of a fresh long-term record.
pub fn longterm_header(key: &CharacterKey) -> String {
    format!(
        "CHARACTER: {}\nLONG-TERM MEMORY (Consolidated summaries):",
        key.display_name()
    )
}

fn header_or(existing: &str, fallback: impl FnOnce() -> String) -> String {
    if existing.trim().is_empty() {
        fallback()
    } else {
        existing.to_string()
    }
}

fn marker_record(key: &CharacterKey) -> String {
    format!("consolidation_{key}_pending")
}

fn marker_key(record: &str) -> Option<CharacterKey> {
    let key = record
        .strip_prefix("consolidation_")?
        .strip_suffix("_pending")?;
    CharacterKey::parse(key)
}
