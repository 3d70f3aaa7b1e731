//! Short-term → long-term consolidation.
//!
//! The flow is load, check the threshold, generate, review, then commit or
//! discard. Each step consumes the previous one's value, so a summary can only
//! be committed after it was generated from a loaded plan, and nothing is
//! written before [`Consolidator::commit`].

use super::codec::TierDocument;
use super::store::{ConsolidationReceipt, MemoryStore};
use super::types::{CharacterKey, MemoryEntry, Tier};
use crate::config::GenerationParams;
use crate::error::{Error, Result};
use crate::oracle::{non_empty, Oracle, OracleRequest};

/// Drives one consolidation for one character.
pub struct Consolidator<'a> {
    store: &'a MemoryStore,
    oracle: &'a dyn Oracle,
    params: &'a GenerationParams,
    minimum: usize,
}

/// Everything needed to ask for a summary. Holds no lock on the store.
#[derive(Debug, Clone)]
pub struct ConsolidationPlan {
    pub key: CharacterKey,
    background: String,
    shortterm: TierDocument<MemoryEntry>,
    minimum: usize,
}

impl ConsolidationPlan {
    pub fn entry_count(&self) -> usize {
        self.shortterm.len()
    }

    /// Fewer entries than the advisory minimum. Consolidating anyway is allowed.
    pub fn below_minimum(&self) -> bool {
        self.entry_count() < self.minimum
    }

    pub fn minimum(&self) -> usize {
        self.minimum
    }

    pub fn entries(&self) -> &[MemoryEntry] {
        &self.shortterm.entries
    }

    /// The summary request sent to the oracle.
    pub fn prompt(&self) -> String {
        let name = self.key.display_name();
        let memories = self
            .shortterm
            .entries
            .iter()
            .map(|entry| match entry.timestamp {
                Some(ts) => format!(
                    "[{}]\n{}",
                    ts.format(super::codec::TIMESTAMP_FORMAT),
                    entry.text
                ),
                None => entry.text.clone(),
            })
            .collect::<Vec<_>>()
            .join("\n\n");

        format!(
            "You are consolidating {name}'s recent memories into a summary.\n\
             \n\
             CHARACTER BACKGROUND:\n\
             {background}\n\
             \n\
             RECENT SHORTTERM MEMORIES (LAST {count} SCENES):\n\
             {memories}\n\
             \n\
             Task: Write a consolidated summary (4-8 sentences) in first-person from {name}'s perspective that captures:\n\
             - Key events they witnessed or participated in\n\
             - Important relationships that developed or changed\n\
             - Critical information they learned\n\
             - Significant emotional moments or realizations\n\
             - Any ongoing concerns or goals they developed\n\
             \n\
             Focus on what's important for {name} to remember long-term. \
             Compress similar events together. Keep specific details that matter.\n\
             \n\
             Consolidated memory summary:",
            background = self.background.trim(),
            count = self.entry_count(),
        )
    }
}

/// A generated summary waiting for review. Dropping it discards it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedConsolidation {
    pub key: CharacterKey,
    pub summary: String,
    pub source_count: usize,
}

impl<'a> Consolidator<'a> {
    pub fn new(
        store: &'a MemoryStore,
        oracle: &'a dyn Oracle,
        params: &'a GenerationParams,
        minimum: usize,
    ) -> Self {
        Self {
            store,
            oracle,
            params,
            minimum,
        }
    }

    /// Read the background and short-term tiers.
    pub fn load(&self, key: &CharacterKey) -> Result<ConsolidationPlan> {
        let background = self
            .store
            .load(key, Tier::Background)?
            .filter(|text| !text.trim().is_empty())
            .ok_or_else(|| Error::MissingBackground {
                key: key.to_string(),
            })?;

        let shortterm = self.store.shortterm(key)?;
        if shortterm.is_empty() {
            return Err(Error::NothingToConsolidate {
                key: key.to_string(),
            });
        }

        tracing::debug!(key = %key, entries = shortterm.len(), "consolidation plan loaded");
        Ok(ConsolidationPlan {
            key: key.clone(),
            background,
            shortterm,
            minimum: self.minimum,
        })
    }

    /// Ask the oracle for the summary. Writes nothing.
    pub async fn generate(&self, plan: &ConsolidationPlan) -> Result<StagedConsolidation> {
        let request = OracleRequest::new(plan.prompt(), self.params);
        let summary = non_empty(&self.oracle.generate(&request).await?)?;

        tracing::info!(key = %plan.key, source_count = plan.entry_count(), "consolidated summary generated");
        Ok(StagedConsolidation {
            key: plan.key.clone(),
            summary,
            source_count: plan.entry_count(),
        })
    }

    /// Append the summary to long-term memory and reset short-term.
    pub fn commit(&self, staged: StagedConsolidation) -> Result<ConsolidationReceipt> {
        self.store
            .consolidate(&staged.key, &staged.summary, staged.source_count)
    }
}
