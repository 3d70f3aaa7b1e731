//! Prompt assembly for scene generation.
//!
//! [`load_cast`] reads the memory tiers of the characters in a scene, in the
//! order the operator named them. [`ContextAssembler::assemble`] is a pure
//! function of the loaded world texts, story tail, cast, and the in-session
//! draft; it never touches the store.

use crate::error::Result;
use crate::memory::store::MemoryStore;
use crate::memory::types::{CharacterKey, Tier};
use crate::store::RecordStore;

/// Fixed closing line of every scene prompt.
pub const CLOSING_INSTRUCTION: &str = "Continue the scene. How do the other characters react?";

/// Read-only reference texts for the world.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorldContext {
    pub style_guide: String,
    pub world_encyclopedia: String,
    pub world_state: String,
}

impl WorldContext {
    pub const STYLE_GUIDE: &'static str = "style_guide";
    pub const WORLD_ENCYCLOPEDIA: &'static str = "world_encyclopedic";
    pub const WORLD_STATE: &'static str = "world_state";

    /// Load the world texts; a missing one is an empty string.
    pub fn load(store: &dyn RecordStore) -> Result<Self> {
        let read = |name: &str| -> Result<String> {
            let text = store.read(name)?.unwrap_or_default();
            if text.trim().is_empty() {
                tracing::warn!(record = name, "world text missing or empty");
            }
            Ok(text)
        };
        Ok(Self {
            style_guide: read(Self::STYLE_GUIDE)?,
            world_encyclopedia: read(Self::WORLD_ENCYCLOPEDIA)?,
            world_state: read(Self::WORLD_STATE)?,
        })
    }
}

/// One character's memory as it goes into a prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CharacterMemory {
    pub key: CharacterKey,
    pub background: String,
    pub longterm: String,
    pub shortterm: String,
}

/// The characters of a scene, in caller order.
#[derive(Debug, Clone, Default)]
pub struct Cast {
    pub members: Vec<CharacterMemory>,
    /// Names given by the caller that had no records at all.
    pub missing: Vec<String>,
}

impl Cast {
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

/// Load the memory tiers for `names`, preserving order.
///
/// A name with no records in any tier is reported and left out; a name given
/// twice is loaded once, at its first position.
pub fn load_cast<S: AsRef<str>>(memory: &MemoryStore, names: &[S]) -> Result<Cast> {
    let mut cast = Cast::default();

    for name in names {
        let name = name.as_ref().trim();
        let Some(key) = CharacterKey::parse(name) else {
            continue;
        };
        if cast.members.iter().any(|m| m.key == key) {
            continue;
        }

        let background = memory.load(&key, Tier::Background)?;
        let longterm = memory.load(&key, Tier::Longterm)?;
        let shortterm = memory.load(&key, Tier::Shortterm)?;

        if background.is_none() && longterm.is_none() && shortterm.is_none() {
            tracing::warn!(character = name, "no memory records found, skipping");
            cast.missing.push(name.to_string());
            continue;
        }

        cast.members.push(CharacterMemory {
            key,
            background: background.unwrap_or_default(),
            longterm: longterm.unwrap_or_default(),
            shortterm: shortterm.unwrap_or_default(),
        });
    }

    Ok(cast)
}

/// The per-exchange inputs of a prompt.
#[derive(Debug, Clone, Copy)]
pub struct PromptRequest<'a> {
    /// Accepted segments of the scene so far.
    pub draft: &'a [String],
    /// The protagonist passage being answered.
    pub passage: &'a str,
    pub steering: Option<&'a str>,
}

/// Builds scene prompts from fixed world and story context.
#[derive(Debug, Clone)]
pub struct ContextAssembler {
    world: WorldContext,
    story_tail: String,
}

impl ContextAssembler {
    /// `story_tail_chars` bounds how much of the story log is included (0 = all).
    pub fn new(world: WorldContext, story_log: &str, story_tail_chars: usize) -> Self {
        Self {
            world,
            story_tail: story_tail(story_log, story_tail_chars).to_string(),
        }
    }

    /// Concatenate, in order: style guide, encyclopedia, world state, each
    /// character (background, long-term, short-term), story tail, draft,
    /// latest passage, steering, closing instruction.
    pub fn assemble(&self, cast: &Cast, request: &PromptRequest<'_>) -> String {
        let characters = cast
            .members
            .iter()
            .map(render_character)
            .collect::<Vec<_>>()
            .join("\n\n");

        let mut sections = vec![
            section("STYLE GUIDE", &self.world.style_guide),
            section("WORLD ENCYCLOPEDIA", &self.world.world_encyclopedia),
            section("CURRENT WORLD STATE", &self.world.world_state),
            section("ACTIVE CHARACTERS", &characters),
            section("RECENT STORY", &self.story_tail),
            section("CURRENT SCENE SO FAR", &request.draft.join("\n\n")),
            section("LATEST ACTION", request.passage),
        ];
        if let Some(steering) = request.steering.map(str::trim).filter(|s| !s.is_empty()) {
            sections.push(steering.to_string());
        }
        sections.push(CLOSING_INSTRUCTION.to_string());

        sections.join("\n\n")
    }
}

fn section(title: &str, body: &str) -> String {
    format!("{title}:\n{}", body.trim())
}

fn render_character(member: &CharacterMemory) -> String {
    let mut out = format!("CHARACTER [{}]:", member.key.display_name().to_uppercase());
    for (label, text) in [
        ("BACKGROUND", &member.background),
        ("LONG-TERM MEMORY", &member.longterm),
        ("SHORT-TERM MEMORY", &member.shortterm),
    ] {
        let text = text.trim();
        if !text.is_empty() {
            out.push_str(&format!("\n{label}:\n{text}\n"));
        }
    }
    out.trim_end().to_string()
}

/// The last `max_chars` characters of the story log, starting at a paragraph
/// boundary when one is available. `0` returns the whole log.
pub fn story_tail(story: &str, max_chars: usize) -> &str {
    let story = story.trim();
    if max_chars == 0 {
        return story;
    }
    let Some((start, _)) = story.char_indices().rev().nth(max_chars.saturating_sub(1)) else {
        return story;
    };
    if start == 0 {
        return story;
    }

    let tail = &story[start..];
    if story[..start].ends_with("\n\n") {
        return tail.trim();
    }
    match tail.find("\n\n") {
        Some(pos) if !tail[pos..].trim().is_empty() => tail[pos..].trim(),
        _ => tail.trim(),
    }
}
