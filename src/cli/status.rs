//! CLI `status` command — show characters, tier sizes, and pending repairs.

use anyhow::Result;

use taleweave::config::TaleweaveConfig;

/// Print per-character memory counts and anything that needs attention.
pub fn status(config: &TaleweaveConfig) -> Result<()> {
    let store = super::open_memory(config)?;
    let soft_limit = config.memory.shortterm_soft_limit;

    println!("Taleweave Status");
    println!("{}", "=".repeat(40));
    println!("  Root:            {}", config.storage.resolved_root().display());
    println!("  Oracle:          {}", config.oracle.base_url);
    println!(
        "  Story log:       {} bytes",
        store.story_log()?.trim().len()
    );
    println!();

    let characters = store.list_characters()?;
    if characters.is_empty() {
        println!("No characters yet. Run `taleweave new-character`.");
    } else {
        println!("{:<20} {:>10} {:>10}", "Character", "Short", "Long");
        for key in &characters {
            let shortterm = store.count_shortterm_entries(key)?;
            let longterm = store.longterm(key)?.len();
            let flag = if shortterm >= soft_limit {
                "  <- consolidate"
            } else {
                ""
            };
            println!(
                "{:<20} {:>10} {:>10}{flag}",
                key.display_name(),
                format!("{shortterm}/{soft_limit}"),
                longterm
            );
        }
    }

    let pending = store.pending_recoveries()?;
    if !pending.is_empty() {
        println!();
        println!("Interrupted consolidations:");
        for marker in pending {
            println!(
                "  {} (started {}, {} memories; short-term backup: {}, long-term backup: {})",
                marker.character,
                marker.started_at.format("%Y-%m-%d %H:%M"),
                marker.source_count,
                marker.shortterm_backup.as_deref().unwrap_or("none"),
                marker.longterm_backup.as_deref().unwrap_or("none"),
            );
        }
    }

    Ok(())
}
