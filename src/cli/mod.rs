pub mod consolidate;
pub mod new_character;
pub mod remember;
pub mod resolve;
pub mod scene;
pub mod status;

use anyhow::{Context, Result};
use async_trait::async_trait;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

use taleweave::config::TaleweaveConfig;
use taleweave::context::WorldContext;
use taleweave::memory::MemoryStore;
use taleweave::oracle::{Oracle, OracleError, OracleRequest};
use taleweave::store::FsRecordStore;

/// Oracle wrapper that shows a spinner on stderr while a request is in flight.
pub struct SpinnerOracle<O> {
    inner: O,
    message: &'static str,
}

impl<O: Oracle> SpinnerOracle<O> {
    pub fn new(inner: O, message: &'static str) -> Self {
        Self { inner, message }
    }
}

#[async_trait]
impl<O: Oracle> Oracle for SpinnerOracle<O> {
    async fn generate(&self, request: &OracleRequest) -> Result<String, OracleError> {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::with_template("  {spinner} {msg} ({elapsed})")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        pb.set_message(self.message);
        pb.enable_steady_tick(Duration::from_millis(120));

        let result = self.inner.generate(request).await;
        pb.finish_and_clear();
        result
    }
}

/// Open the on-disk memory store and warn about unfinished consolidations.
pub fn open_memory(config: &TaleweaveConfig) -> Result<MemoryStore> {
    let store = MemoryStore::open(&config.storage);
    let pending = store
        .pending_recoveries()
        .context("failed to check for interrupted consolidations")?;
    for marker in &pending {
        eprintln!(
            "WARNING: consolidation of `{}` started {} never finished. \
             Check its short-term record (backup: {}), then run `taleweave resolve {}`.",
            marker.character,
            marker.started_at.format("%Y-%m-%d %H:%M"),
            marker.shortterm_backup.as_deref().unwrap_or("none"),
            marker.character,
        );
    }
    Ok(store)
}

/// Load the world texts from the configured world directory.
pub fn open_world(config: &TaleweaveConfig) -> Result<WorldContext> {
    let world = FsRecordStore::new(config.storage.world_path());
    WorldContext::load(&world).context("failed to load world texts")
}
