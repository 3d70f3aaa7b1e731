//! Text encoding of tier records.
//!
//! A tier record is an optional free-text header followed by entries. Each
//! entry is a `---` marker line, a head line carrying the timestamp, and the
//! entry text. Blocks are separated by one blank line:
//!
//! ```text
//! CHARACTER: Marcus
//! SHORT-TERM MEMORY (Recent detailed memories):
//!
//! ---
//! [2026-10-18 09:41]
//! I let the stranger through the gate.
//!
//! ---
//! [2026-10-18 11:02]
//! Sera asked about the missing patrol.
//! ```
//!
//! Long-term heads read `[YYYY-MM-DD HH:MM] Consolidated from N memories:`.
//!
//! Decoding is lenient about older layouts: trailing markers, blank blocks,
//! an entry sitting in the header area without a leading marker, and entries
//! with no head line at all all decode without loss of the entry count.

use chrono::NaiveDateTime;

use super::types::{ConsolidationEntry, MemoryEntry};

/// Literal line separating entries.
pub const ENTRY_MARKER: &str = "---";

/// Timestamp format inside entry heads.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M";

/// An entry kind that can live in a tier record.
pub trait TierEntry: Sized {
    /// Head line, or `None` for a legacy entry without one.
    fn encode_head(&self) -> Option<String>;

    fn text(&self) -> &str;

    /// Build an entry from a head line and its text. `None` if `head` is not a
    /// valid head for this entry kind.
    fn from_block(head: &str, text: &str) -> Option<Self>;

    /// Build an entry from a block with no recognizable head line.
    fn headless(text: &str) -> Self;
}

/// A decoded tier record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TierDocument<E> {
    pub header: String,
    pub entries: Vec<E>,
}

impl<E> TierDocument<E> {
    pub fn new(header: impl Into<String>) -> Self {
        Self {
            header: header.into(),
            entries: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Render a document in the canonical layout.
pub fn encode<E: TierEntry>(doc: &TierDocument<E>) -> String {
    let mut blocks = Vec::with_capacity(doc.entries.len() + 1);

    let header = doc.header.trim();
    if !header.is_empty() {
        blocks.push(header.to_string());
    }

    for entry in &doc.entries {
        let mut block = format!("{ENTRY_MARKER}\n");
        if let Some(head) = entry.encode_head() {
            block.push_str(&head);
            block.push('\n');
        }
        block.push_str(entry.text());
        blocks.push(block);
    }

    if blocks.is_empty() {
        return String::new();
    }
    let mut out = blocks.join("\n\n");
    out.push('\n');
    out
}

/// Parse a tier record. Never fails: unrecognized content ends up in the
/// header or in headless entries.
pub fn decode<E: TierEntry>(text: &str) -> TierDocument<E> {
    let mut blocks: Vec<Vec<&str>> = vec![Vec::new()];
    for line in text.lines() {
        if line.trim() == ENTRY_MARKER {
            blocks.push(Vec::new());
        } else if let Some(current) = blocks.last_mut() {
            current.push(line);
        }
    }

    let mut blocks = blocks.into_iter();
    let preamble = blocks.next().unwrap_or_default();

    // An entry written without a leading marker sits in the preamble.
    let split = preamble
        .iter()
        .position(|line| E::from_block(line.trim(), "").is_some())
        .unwrap_or(preamble.len());
    let header = preamble[..split].join("\n").trim().to_string();

    let mut entries = Vec::new();
    entries.extend(parse_block::<E>(&preamble[split..]));
    entries.extend(blocks.filter_map(|block| parse_block::<E>(&block)));

    TierDocument { header, entries }
}

fn parse_block<E: TierEntry>(lines: &[&str]) -> Option<E> {
    let joined = lines.join("\n");
    let block = joined.trim();
    if block.is_empty() {
        return None;
    }
    let (head, rest) = block.split_once('\n').unwrap_or((block, ""));
    Some(E::from_block(head.trim(), rest.trim()).unwrap_or_else(|| E::headless(block)))
}

/// Split `[YYYY-MM-DD HH:MM] rest` into the timestamp and `rest`.
fn parse_stamp(head: &str) -> Option<(NaiveDateTime, &str)> {
    let (stamp, rest) = head.strip_prefix('[')?.split_once(']')?;
    let ts = NaiveDateTime::parse_from_str(stamp.trim(), TIMESTAMP_FORMAT).ok()?;
    Some((ts, rest.trim()))
}

fn format_stamp(ts: &NaiveDateTime) -> String {
    format!("[{}]", ts.format(TIMESTAMP_FORMAT))
}

impl TierEntry for MemoryEntry {
    fn encode_head(&self) -> Option<String> {
        self.timestamp.as_ref().map(format_stamp)
    }

    fn text(&self) -> &str {
        &self.text
    }

    fn from_block(head: &str, text: &str) -> Option<Self> {
        match parse_stamp(head)? {
            (ts, "") => Some(Self {
                timestamp: Some(ts),
                text: text.to_string(),
            }),
            _ => None,
        }
    }

    fn headless(text: &str) -> Self {
        Self {
            timestamp: None,
            text: text.to_string(),
        }
    }
}

impl TierEntry for ConsolidationEntry {
    fn encode_head(&self) -> Option<String> {
        self.timestamp.as_ref().map(|ts| {
            format!(
                "{} Consolidated from {} memories:",
                format_stamp(ts),
                self.source_count
            )
        })
    }

    fn text(&self) -> &str {
        &self.text
    }

    fn from_block(head: &str, text: &str) -> Option<Self> {
        let (ts, rest) = parse_stamp(head)?;
        let count = rest
            .strip_prefix("Consolidated from ")?
            .strip_suffix(':')?
            .trim_end_matches("memories")
            .trim_end_matches("memory")
            .trim();
        Some(Self {
            timestamp: Some(ts),
            source_count: count.parse().ok()?,
            text: text.to_string(),
        })
    }

    fn headless(text: &str) -> Self {
        Self {
            timestamp: None,
            source_count: 0,
            text: text.to_string(),
        }
    }
}

/// Number of entries in a short-term record. Empty or absent content is 0.
pub fn count_entries(text: Option<&str>) -> usize {
    text.map(|t| decode::<MemoryEntry>(t).len()).unwrap_or(0)
}
