//! Core memory type definitions.
//!
//! Defines [`CharacterKey`] (normalized character identity), [`Tier`] (the three
//! per-character memory partitions), the two entry kinds stored in tier records
//! ([`MemoryEntry`], [`ConsolidationEntry`]), and [`CharacterProfile`] (the
//! fields a background is written from).

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::clock::truncate_to_minute;

/// Normalized character identifier: trimmed, lower-case, whitespace runs
/// collapsed to `_`. `"Van der Berg"` and `" van  der berg "` are the same key.
///
/// Path separators split words like whitespace, and dots are stripped from the
/// ends of each word, so a key is always a single plain file-name component.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CharacterKey(String);

impl CharacterKey {
    /// Normalize a name. Returns `None` for blank input.
    pub fn parse(name: &str) -> Option<Self> {
        let key = name
            .split(|c: char| c.is_whitespace() || c.is_control() || matches!(c, '/' | '\\'))
            .map(|word| word.trim_matches('.'))
            .filter(|word| !word.is_empty())
            .map(str::to_lowercase)
            .collect::<Vec<_>>()
            .join("_");
        if key.is_empty() {
            None
        } else {
            Some(Self(key))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Human-facing name: `van_der_berg` → `Van Der Berg`.
    pub fn display_name(&self) -> String {
        self.0
            .split('_')
            .filter(|part| !part.is_empty())
            .map(|part| {
                let mut chars = part.chars();
                match chars.next() {
                    Some(first) => first.to_uppercase().chain(chars).collect(),
                    None => String::new(),
                }
            })
            .collect::<Vec<String>>()
            .join(" ")
    }

    /// Record name for one of this character's tiers.
    pub fn record_name(&self, tier: Tier) -> String {
        format!("character_{}_{}", self.0, tier.as_str())
    }

    /// Inverse of [`record_name`](Self::record_name) for a given tier.
    pub fn from_record_name(record: &str, tier: Tier) -> Option<Self> {
        let key = record
            .strip_prefix("character_")?
            .strip_suffix(tier.as_str())?
            .strip_suffix('_')?;
        Self::parse(key)
    }
}

impl std::fmt::Display for CharacterKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// The three memory partitions of a character.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    /// Immutable profile written at creation.
    Background,
    /// Recent per-scene memories, append-only until consolidated.
    Shortterm,
    /// Consolidated summaries of past short-term memories.
    Longterm,
}

impl Tier {
    pub const ALL: [Tier; 3] = [Tier::Background, Tier::Shortterm, Tier::Longterm];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Background => "background",
            Self::Shortterm => "shortterm",
            Self::Longterm => "longterm",
        }
    }
}

impl std::fmt::Display for Tier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Tier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "background" => Ok(Self::Background),
            "shortterm" => Ok(Self::Shortterm),
            "longterm" => Ok(Self::Longterm),
            _ => Err(format!("unknown tier: {s}")),
        }
    }
}

/// One short-term memory: what a character took away from one scene.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryEntry {
    /// Minute-granular creation time. `None` only for legacy entries without a stamp.
    pub timestamp: Option<NaiveDateTime>,
    pub text: String,
}

impl MemoryEntry {
    pub fn new(timestamp: NaiveDateTime, text: &str) -> Self {
        Self {
            timestamp: Some(truncate_to_minute(timestamp)),
            text: sanitize_entry_text(text),
        }
    }
}

/// One long-term summary produced by a consolidation run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsolidationEntry {
    pub timestamp: Option<NaiveDateTime>,
    /// Number of short-term entries this summary replaced.
    pub source_count: usize,
    pub text: String,
}

impl ConsolidationEntry {
    pub fn new(timestamp: NaiveDateTime, source_count: usize, text: &str) -> Self {
        Self {
            timestamp: Some(truncate_to_minute(timestamp)),
            source_count,
            text: sanitize_entry_text(text),
        }
    }
}

/// Trim entry text and neutralize lines that would read back as an entry marker.
pub fn sanitize_entry_text(text: &str) -> String {
    text.trim()
        .lines()
        .map(|line| {
            if line.trim() == super::codec::ENTRY_MARKER {
                "* * *"
            } else {
                line.trim_end()
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Fields a character background is rendered from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CharacterProfile {
    /// Free-form description; the only field required.
    pub summary: String,
    pub role: Option<String>,
    pub traits: Option<String>,
    pub history: Option<String>,
    pub skills: Option<String>,
    pub relationships: Option<String>,
}

impl CharacterProfile {
    pub fn new(summary: impl Into<String>) -> Self {
        Self {
            summary: summary.into(),
            ..Self::default()
        }
    }

    /// Render the background record text.
    pub fn render(&self, key: &CharacterKey) -> String {
        let mut out = format!("CHARACTER: {}\n", key.display_name());
        let sections = [
            ("ROLE", &self.role),
            ("TRAITS", &self.traits),
            ("HISTORY", &self.history),
            ("SKILLS", &self.skills),
            ("RELATIONSHIPS", &self.relationships),
        ];
        for (label, value) in sections {
            if let Some(value) = value.as_deref().map(str::trim).filter(|v| !v.is_empty()) {
                if value.contains('\n') {
                    out.push_str(&format!("\n{label}:\n{value}\n\n"));
                } else {
                    out.push_str(&format!("{label}: {value}\n"));
                }
            }
        }
        let summary = self.summary.trim();
        if !summary.is_empty() {
            out.push('\n');
            out.push_str(summary);
            out.push('\n');
        }
        out
    }
}
