use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::oracle::OracleMode;

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct TaleweaveConfig {
    pub storage: StorageConfig,
    pub oracle: OracleConfig,
    pub memory: MemoryConfig,
    pub context: ContextConfig,
    pub session: SessionConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct StorageConfig {
    /// Project root. Area directories below are relative to it.
    pub root: String,
    pub characters_dir: String,
    pub world_dir: String,
    pub story_dir: String,
    pub backup_dir: String,
    /// Record name of the shared story log.
    pub story_record: String,
}

/// Oracle endpoint plus per-purpose generation settings.
///
/// Each `[oracle.<purpose>]` table overrides only the fields it names; the
/// rest keep that purpose's defaults from [`OracleConfig::default`].
#[derive(Debug, Deserialize, Clone)]
#[serde(from = "OracleFile")]
pub struct OracleConfig {
    /// Base URL of an OpenAI-compatible API, e.g. `http://127.0.0.1:5000/v1`.
    pub base_url: String,
    pub scene: GenerationParams,
    pub memory: GenerationParams,
    pub consolidation: GenerationParams,
}

/// Sampling and transport settings for one kind of oracle call.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationParams {
    pub mode: OracleMode,
    pub max_tokens: u32,
    pub temperature: f32,
    pub top_p: f32,
    pub stop: Vec<String>,
    pub timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct MemoryConfig {
    /// Short-term entry count at which consolidation is suggested.
    pub shortterm_soft_limit: usize,
    /// Below this many entries, consolidation asks for confirmation.
    pub consolidation_minimum: usize,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ContextConfig {
    /// Maximum characters of story log included in a prompt. 0 = whole log.
    pub story_tail_chars: usize,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct SessionConfig {
    /// Oracle attempts per generation before the exchange is abandoned.
    pub max_attempts: usize,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            root: default_taleweave_dir().to_string_lossy().into_owned(),
            characters_dir: "characters".into(),
            world_dir: "world".into(),
            story_dir: "story".into(),
            backup_dir: "backups".into(),
            story_record: "story_recent".into(),
        }
    }
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:5000/v1".into(),
            scene: GenerationParams {
                mode: OracleMode::Chat,
                max_tokens: 800,
                temperature: 0.8,
                top_p: 0.9,
                stop: Vec::new(),
                timeout_secs: 120,
            },
            memory: GenerationParams {
                max_tokens: 200,
                timeout_secs: 60,
                ..GenerationParams::default()
            },
            consolidation: GenerationParams {
                max_tokens: 400,
                timeout_secs: 90,
                ..GenerationParams::default()
            },
        }
    }
}

// ── Oracle file overlay ──────────────────────────────────────────────────────

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct OracleFile {
    base_url: Option<String>,
    scene: ParamsFile,
    memory: ParamsFile,
    consolidation: ParamsFile,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct ParamsFile {
    mode: Option<OracleMode>,
    max_tokens: Option<u32>,
    temperature: Option<f32>,
    top_p: Option<f32>,
    stop: Option<Vec<String>>,
    timeout_secs: Option<u64>,
}

impl ParamsFile {
    fn over(self, base: GenerationParams) -> GenerationParams {
        GenerationParams {
            mode: self.mode.unwrap_or(base.mode),
            max_tokens: self.max_tokens.unwrap_or(base.max_tokens),
            temperature: self.temperature.unwrap_or(base.temperature),
            top_p: self.top_p.unwrap_or(base.top_p),
            stop: self.stop.unwrap_or(base.stop),
            timeout_secs: self.timeout_secs.unwrap_or(base.timeout_secs),
        }
    }
}

impl From<OracleFile> for OracleConfig {
    fn from(file: OracleFile) -> Self {
        let defaults = OracleConfig::default();
        Self {
            base_url: file.base_url.unwrap_or(defaults.base_url),
            scene: file.scene.over(defaults.scene),
            memory: file.memory.over(defaults.memory),
            consolidation: file.consolidation.over(defaults.consolidation),
        }
    }
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            mode: OracleMode::Completion,
            max_tokens: 400,
            temperature: 0.7,
            top_p: 0.9,
            stop: vec!["---END---".into()],
            timeout_secs: 60,
        }
    }
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            shortterm_soft_limit: 10,
            consolidation_minimum: 5,
        }
    }
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            story_tail_chars: 12_000,
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self { max_attempts: 3 }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "warn".into(),
        }
    }
}

/// Returns `~/.taleweave/`, or `./.taleweave/` when there is no home directory.
pub fn default_taleweave_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".taleweave")
}

/// Returns the default config file path: `~/.taleweave/config.toml`
pub fn default_config_path() -> PathBuf {
    default_taleweave_dir().join("config.toml")
}

impl TaleweaveConfig {
    /// Load config from the default TOML file (if it exists) then apply env var overrides.
    pub fn load() -> Result<Self> {
        Self::load_from(default_config_path())
    }

    /// Load from a specific path, then apply env var overrides.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut config = if path.exists() {
            let contents =
                std::fs::read_to_string(path).context("failed to read config file")?;
            toml::from_str(&contents).context("failed to parse config TOML")?
        } else {
            info!("no config file at {}, using defaults", path.display());
            TaleweaveConfig::default()
        };

        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Apply environment variable overrides
    /// (TALEWEAVE_ROOT, TALEWEAVE_ORACLE_URL, TALEWEAVE_LOG_LEVEL).
    fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("TALEWEAVE_ROOT") {
            self.storage.root = val;
        }
        if let Ok(val) = std::env::var("TALEWEAVE_ORACLE_URL") {
            self.oracle.base_url = val;
        }
        if let Ok(val) = std::env::var("TALEWEAVE_LOG_LEVEL") {
            self.logging.level = val;
        }
    }

    fn validate(&self) -> std::result::Result<(), crate::Error> {
        if self.session.max_attempts == 0 {
            return Err(crate::Error::Config(
                "session.max_attempts must be at least 1".into(),
            ));
        }
        if self.storage.story_record.trim().is_empty() {
            return Err(crate::Error::Config(
                "storage.story_record must not be empty".into(),
            ));
        }
        Ok(())
    }
}

impl StorageConfig {
    /// Resolve the project root, expanding `~` if needed.
    pub fn resolved_root(&self) -> PathBuf {
        expand_tilde(&self.root)
    }

    pub fn characters_path(&self) -> PathBuf {
        self.resolved_root().join(&self.characters_dir)
    }

    pub fn world_path(&self) -> PathBuf {
        self.resolved_root().join(&self.world_dir)
    }

    pub fn story_path(&self) -> PathBuf {
        self.resolved_root().join(&self.story_dir)
    }

    pub fn backup_path(&self) -> PathBuf {
        self.resolved_root().join(&self.backup_dir)
    }
}

pub fn expand_tilde(path: &str) -> PathBuf {
    match (path.strip_prefix("~/"), dirs::home_dir()) {
        (Some(rest), Some(home)) => home.join(rest),
        _ => PathBuf::from(path),
    }
}
