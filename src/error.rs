//! Error taxonomy for the memory store, consolidation, and scene drafting.
//!
//! Every variant is reported at the boundary of the operation that caused it.
//! None of them leaves a persisted record half-written, except
//! [`Error::ConsolidationInterrupted`], which names the backup to restore from.

use crate::oracle::OracleError;

/// Library error type.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A record could not be read or written.
    #[error("storage error on record `{record}`: {source}")]
    Storage {
        record: String,
        #[source]
        source: std::io::Error,
    },

    /// `create_character` found at least one existing tier record.
    #[error("character `{key}` already exists")]
    AlreadyExists { key: String },

    /// Short-term memory is empty or absent.
    #[error("no short-term memories to consolidate for `{key}`")]
    NothingToConsolidate { key: String },

    /// The character has no background record.
    #[error("no background found for `{key}`")]
    MissingBackground { key: String },

    /// Blank input where text is required.
    #[error("{what} must not be empty")]
    EmptyInput { what: &'static str },

    /// The story log is empty, so there is no scene to remember.
    #[error("story log is empty; commit a scene first")]
    EmptyStory,

    /// The oracle was unreachable, timed out, or answered with nothing usable.
    #[error("generation failed: {0}")]
    GenerationFailed(#[from] OracleError),

    /// Long-term memory was written but the short-term reset failed.
    #[error(
        "consolidation of `{key}` interrupted after the long-term write; \
         short-term was not reset (backup: {})",
        shortterm_backup.as_deref().unwrap_or("none")
    )]
    ConsolidationInterrupted {
        key: String,
        shortterm_backup: Option<String>,
    },

    /// A recovery marker could not be encoded or decoded.
    #[error("recovery marker for `{key}` is unreadable: {source}")]
    RecoveryMarker {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    /// Configuration is invalid.
    #[error("configuration error: {0}")]
    Config(String),
}

impl Error {
    pub fn storage(record: impl Into<String>, source: std::io::Error) -> Self {
        Self::Storage {
            record: record.into(),
            source,
        }
    }
}

/// Result alias for library operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storage_error_names_the_record() {
        let err = Error::storage(
            "character_marcus_shortterm",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only"),
        );
        let msg = err.to_string();
        assert!(msg.contains("character_marcus_shortterm"));
        assert!(msg.contains("read-only"));
    }

    #[test]
    fn oracle_error_converts_to_generation_failed() {
        let err: Error = OracleError::Empty.into();
        assert!(matches!(err, Error::GenerationFailed(OracleError::Empty)));
    }

    #[test]
    fn interrupted_consolidation_mentions_backup() {
        let err = Error::ConsolidationInterrupted {
            key: "marcus".into(),
            shortterm_backup: Some("character_marcus_shortterm_backup_2026-10-18_10-00".into()),
        };
        assert!(err.to_string().contains("backup_2026-10-18_10-00"));
    }
}
