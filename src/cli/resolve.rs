//! CLI `resolve` command — acknowledge a manually repaired consolidation.

use anyhow::{bail, Result};

use taleweave::config::TaleweaveConfig;
use taleweave::memory::CharacterKey;

pub fn resolve(config: &TaleweaveConfig, name: &str) -> Result<()> {
    let Some(key) = CharacterKey::parse(name) else {
        bail!("no character name given");
    };
    let store = taleweave::memory::MemoryStore::open(&config.storage);

    if store.clear_recovery(&key)? {
        println!("Cleared interrupted consolidation for {}.", key.display_name());
        println!(
            "Short-term entries now: {}",
            store.count_shortterm_entries(&key)?
        );
    } else {
        println!("No interrupted consolidation for {}.", key.display_name());
    }
    Ok(())
}
