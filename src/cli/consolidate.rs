//! CLI `consolidate` command — compress short-term memory into a long-term summary.

use anyhow::{bail, Result};

use taleweave::config::TaleweaveConfig;
use taleweave::memory::consolidate::Consolidator;
use taleweave::memory::CharacterKey;
use taleweave::oracle::HttpOracle;
use taleweave::operator::{ConsoleOperator, Operator};

use super::SpinnerOracle;

const RULE: &str = "============================================================";

pub async fn consolidate(config: &TaleweaveConfig, name: &str) -> Result<()> {
    let Some(key) = CharacterKey::parse(name) else {
        bail!("no character name given");
    };
    let store = super::open_memory(config)?;
    let oracle = SpinnerOracle::new(HttpOracle::new(&config.oracle.base_url), "consolidating");
    let consolidator = Consolidator::new(
        &store,
        &oracle,
        &config.oracle.consolidation,
        config.memory.consolidation_minimum,
    );
    let mut op = ConsoleOperator;

    let plan = consolidator.load(&key)?;
    println!(
        "{} has {} short-term memories.",
        key.display_name(),
        plan.entry_count()
    );
    if plan.below_minimum()
        && !op.confirm(&format!(
            "Only {} memories (fewer than {}). Consolidate anyway? (y/n): ",
            plan.entry_count(),
            plan.minimum()
        ))
    {
        println!("Consolidation cancelled.");
        return Ok(());
    }

    let staged = consolidator.generate(&plan).await?;
    op.say(&format!("\n{RULE}\nCONSOLIDATED SUMMARY:\n{RULE}"));
    op.say(&staged.summary);
    op.say(&format!("{RULE}\n"));

    if !op.confirm("Save this consolidated summary? (y/n): ") {
        println!("Summary discarded. Nothing was changed.");
        return Ok(());
    }

    let receipt = consolidator.commit(staged)?;
    println!(
        "Consolidated {} memories into long-term memory ({} summaries total).",
        receipt.source_count, receipt.longterm_entries
    );
    println!("Short-term memory cleared for {}.", key.display_name());
    if let Some(backup) = receipt.shortterm_backup {
        println!("Previous short-term saved as {}", backup.backup);
    }
    Ok(())
}
