//! CLI `scene` command — interactive scene drafting, live or replayed from a file.

use anyhow::{Context, Result};
use std::path::Path;

use taleweave::config::TaleweaveConfig;
use taleweave::oracle::HttpOracle;
use taleweave::operator::{ConsoleOperator, Operator, ScriptedOperator};
use taleweave::session::{SceneOutcome, SceneSession, SceneSettings};

use super::SpinnerOracle;

const RULE: &str = "============================================================";

/// Run a scene session. With `replay`, operator input is read line by line from the file.
pub async fn scene(config: &TaleweaveConfig, replay: Option<&Path>) -> Result<()> {
    let store = super::open_memory(config)?;
    let world = super::open_world(config)?;
    let oracle = SpinnerOracle::new(HttpOracle::new(&config.oracle.base_url), "generating");

    let mut console = ConsoleOperator;
    let mut scripted;
    let operator: &mut dyn Operator = match replay {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read replay file: {}", path.display()))?;
            scripted = ScriptedOperator::from_text(&text).echo(true);
            &mut scripted
        }
        None => &mut console,
    };

    operator.say(&format!("{RULE}\nINTERACTIVE SCENE WRITER\n{RULE}"));
    let session = SceneSession::new(
        &store,
        world,
        &oracle,
        operator,
        SceneSettings::from_config(config),
    );

    match session.run().await? {
        SceneOutcome::Committed { exchanges, backup } => {
            tracing::info!(exchanges, "scene committed");
            if let Some(backup) = backup {
                println!("Previous story log saved as {}", backup.backup);
            }
        }
        SceneOutcome::Abandoned { exchanges } => {
            tracing::info!(exchanges, "scene abandoned");
        }
        SceneOutcome::NoCast => {
            tracing::info!("scene ended without a cast");
        }
    }
    Ok(())
}
