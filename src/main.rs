mod cli;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use taleweave::config::TaleweaveConfig;

#[derive(Parser)]
#[command(
    name = "taleweave",
    version,
    about = "Tiered character memory and scene drafting for collaborative fiction"
)]
struct Cli {
    /// Config file (default: ~/.taleweave/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Project root holding the characters, world, story, and backup directories
    #[arg(long, global = true)]
    root: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create background, short-term, and long-term records for a new character
    NewCharacter,
    /// Generate short-term memories from the latest story (all characters if NAME is omitted)
    Remember {
        name: Option<String>,
        /// Save without asking
        #[arg(long)]
        yes: bool,
    },
    /// Compress a character's short-term memories into a long-term summary
    Consolidate { name: String },
    /// Draft a scene interactively with the oracle
    Scene {
        /// Read operator input from a file instead of the terminal
        #[arg(long)]
        replay: Option<PathBuf>,
    },
    /// Show characters, memory counts, and interrupted consolidations
    Status,
    /// Clear the interrupted-consolidation marker after a manual repair
    Resolve { name: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => TaleweaveConfig::load_from(path)?,
        None => TaleweaveConfig::load()?,
    };
    if let Some(root) = cli.root {
        config.storage.root = root;
    }

    // Operator output goes to stdout; logs go to stderr.
    let filter = EnvFilter::try_new(&config.logging.level)
        .unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Command::NewCharacter => cli::new_character::new_character(&config)?,
        Command::Remember { name, yes } => {
            cli::remember::remember(&config, name.as_deref(), yes).await?
        }
        Command::Consolidate { name } => cli::consolidate::consolidate(&config, &name).await?,
        Command::Scene { replay } => cli::scene::scene(&config, replay.as_deref()).await?,
        Command::Status => cli::status::status(&config)?,
        Command::Resolve { name } => cli::resolve::resolve(&config, &name)?,
    }

    Ok(())
}
