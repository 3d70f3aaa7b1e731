//! CLI `remember` command — turn the latest story into character memories.

use anyhow::{bail, Result};

use taleweave::config::TaleweaveConfig;
use taleweave::memory::recall::{show_memory, SceneRecall};
use taleweave::memory::CharacterKey;
use taleweave::oracle::HttpOracle;
use taleweave::operator::{ConsoleOperator, Operator};

use super::SpinnerOracle;

/// Generate a memory for one character, or for every character when `name` is `None`.
pub async fn remember(config: &TaleweaveConfig, name: Option<&str>, yes: bool) -> Result<()> {
    let store = super::open_memory(config)?;
    let oracle = SpinnerOracle::new(HttpOracle::new(&config.oracle.base_url), "remembering");
    let recall = SceneRecall::new(
        &store,
        &oracle,
        &config.oracle.memory,
        config.memory.shortterm_soft_limit,
        config.context.story_tail_chars,
    );
    let mut op = ConsoleOperator;

    let Some(name) = name else {
        op.say("BATCH MEMORY GENERATOR\n");
        let auto_save = yes || op.confirm("Auto-save all generated memories? (y/n): ");
        let report = recall.remember_all(&mut op, auto_save).await?;
        println!(
            "Saved {}, declined {}, skipped {}, failed {}.",
            report.saved.len(),
            report.declined.len(),
            report.skipped.len(),
            report.failed.len()
        );
        return Ok(());
    };

    let Some(key) = CharacterKey::parse(name) else {
        bail!("no character name given");
    };
    let staged = recall.generate(&key).await?;
    show_memory(&mut op, &staged.text);

    if !yes && !op.confirm("Save this memory? (y/n): ") {
        println!("Memory discarded.");
        return Ok(());
    }

    let receipt = recall.commit(staged)?;
    println!(
        "Memory saved. Short-term entries: {}/{}",
        receipt.entry_count, config.memory.shortterm_soft_limit
    );
    if recall.over_soft_limit(&receipt) {
        println!(
            "WARNING: {} has {} short-term memories. Run `taleweave consolidate {}`.",
            key.display_name(),
            receipt.entry_count,
            key
        );
    }
    Ok(())
}
