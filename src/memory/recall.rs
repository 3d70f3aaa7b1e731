//! Scene memories: what a character took away from the latest story.
//!
//! [`SceneRecall::generate`] asks the oracle for a short first-person memory
//! and stages it; [`SceneRecall::commit`] appends it to short-term memory.
//! [`SceneRecall::remember_all`] runs the same steps for every character.

use super::store::{AppendReceipt, MemoryStore};
use super::types::{CharacterKey, Tier};
use crate::config::GenerationParams;
use crate::context::story_tail;
use crate::error::{Error, Result};
use crate::oracle::{non_empty, Oracle, OracleRequest};
use crate::operator::Operator;

/// A generated memory waiting for approval.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedMemory {
    pub key: CharacterKey,
    pub text: String,
}

/// Outcome counts of a batch run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchReport {
    pub saved: Vec<CharacterKey>,
    pub declined: Vec<CharacterKey>,
    /// Characters whose background is empty.
    pub skipped: Vec<CharacterKey>,
    pub failed: Vec<(CharacterKey, String)>,
    /// Saved characters now at or above the short-term soft limit.
    pub over_limit: Vec<CharacterKey>,
}

pub struct SceneRecall<'a> {
    store: &'a MemoryStore,
    oracle: &'a dyn Oracle,
    params: &'a GenerationParams,
    soft_limit: usize,
    story_tail_chars: usize,
}

impl<'a> SceneRecall<'a> {
    pub fn new(
        store: &'a MemoryStore,
        oracle: &'a dyn Oracle,
        params: &'a GenerationParams,
        soft_limit: usize,
        story_tail_chars: usize,
    ) -> Self {
        Self {
            store,
            oracle,
            params,
            soft_limit,
            story_tail_chars,
        }
    }

    /// Generate a memory of the latest story for `key`. Writes nothing.
    pub async fn generate(&self, key: &CharacterKey) -> Result<StagedMemory> {
        let story = self.store.story_log()?;
        if story.trim().is_empty() {
            return Err(Error::EmptyStory);
        }
        let background = self.background(key)?.ok_or_else(|| Error::MissingBackground {
            key: key.to_string(),
        })?;

        let prompt = memory_prompt(key, &background, story_tail(&story, self.story_tail_chars));
        let text = non_empty(&self.oracle.generate(&OracleRequest::new(prompt, self.params)).await?)?;

        tracing::info!(key = %key, "scene memory generated");
        Ok(StagedMemory {
            key: key.clone(),
            text,
        })
    }

    /// Append an approved memory to short-term.
    pub fn commit(&self, staged: StagedMemory) -> Result<AppendReceipt> {
        let receipt = self.store.append_shortterm(&staged.key, &staged.text)?;
        if self.over_soft_limit(&receipt) {
            tracing::warn!(
                key = %staged.key,
                entries = receipt.entry_count,
                soft_limit = self.soft_limit,
                "short-term memory at soft limit; consolidate soon"
            );
        }
        Ok(receipt)
    }

    pub fn over_soft_limit(&self, receipt: &AppendReceipt) -> bool {
        receipt.entry_count >= self.soft_limit
    }

    /// Generate a memory for every character with a background.
    ///
    /// With `auto_save` each memory is committed without asking. One
    /// character's failure is recorded and the batch moves on.
    pub async fn remember_all(
        &self,
        operator: &mut dyn Operator,
        auto_save: bool,
    ) -> Result<BatchReport> {
        if self.store.story_log()?.trim().is_empty() {
            return Err(Error::EmptyStory);
        }

        let mut report = BatchReport::default();
        for key in self.store.list_characters()? {
            let name = key.display_name();
            if self.background(&key)?.is_none() {
                operator.say(&format!("Skipping {name}: background is empty."));
                report.skipped.push(key);
                continue;
            }

            operator.say(&format!("\nGenerating memory for {name}..."));
            let staged = match self.generate(&key).await {
                Ok(staged) => staged,
                Err(e) => {
                    tracing::warn!(key = %key, error = %e, "memory generation failed");
                    operator.say(&format!("Failed to generate memory for {name}: {e}"));
                    report.failed.push((key, e.to_string()));
                    continue;
                }
            };

            show_memory(operator, &staged.text);
            if !auto_save && !operator.confirm(&format!("Save memory for {name}? (y/n): ")) {
                operator.say(&format!("Skipped saving memory for {name}."));
                report.declined.push(key);
                continue;
            }

            match self.commit(staged) {
                Ok(receipt) => {
                    operator.say(&format!(
                        "Saved. Short-term entries: {}/{}",
                        receipt.entry_count, self.soft_limit
                    ));
                    if self.over_soft_limit(&receipt) {
                        operator.say(&format!(
                            "WARNING: {name} has {} short-term memories. Consider consolidating.",
                            receipt.entry_count
                        ));
                        report.over_limit.push(key.clone());
                    }
                    report.saved.push(key);
                }
                Err(e) => {
                    tracing::warn!(key = %key, error = %e, "could not save memory");
                    operator.say(&format!("Could not save memory for {name}: {e}"));
                    report.failed.push((key, e.to_string()));
                }
            }
        }

        operator.say("\nBatch run complete.");
        Ok(report)
    }

    fn background(&self, key: &CharacterKey) -> Result<Option<String>> {
        Ok(self
            .store
            .load(key, Tier::Background)?
            .filter(|text| !text.trim().is_empty()))
    }
}

/// Print a generated memory between rules.
pub fn show_memory(operator: &mut dyn Operator, text: &str) {
    operator.say("\n--- GENERATED MEMORY ---");
    operator.say(text);
    operator.say("------------------------\n");
}

fn memory_prompt(key: &CharacterKey, background: &str, scene: &str) -> String {
    let name = key.display_name();
    format!(
        "You are summarizing a scene from {name}'s perspective.\n\
         \n\
         CHARACTER BACKGROUND:\n\
         {background}\n\
         \n\
         RECENT SCENE:\n\
         {scene}\n\
         \n\
         Task: Write a brief memory summary (2-4 sentences) from {name}'s first-person \
         perspective about what they observed, experienced, or learned in this scene. Focus on:\n\
         - What they saw others do or say\n\
         - Their own actions\n\
         - Important information they learned\n\
         - Emotions they felt (without announcing internal thoughts to others)\n\
         \n\
         Do NOT include what others were thinking. Only what {name} could observe.\n\
         \n\
         Memory summary:",
        background = background.trim(),
    )
}
