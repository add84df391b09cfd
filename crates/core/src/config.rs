//! Application configuration layered from defaults, a TOML file and the
//! environment.

use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::{Context, Result};
use config::{Config, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use tracing::info;

/// Directory under the user config dir holding `config.toml`.
pub const CONFIG_DIR: &str = "snakes";
const CONFIG_FILE: &str = "config.toml";
const ENV_PREFIX: &str = "SNAKES";

const DEFAULT_CONFIG: &str = r#"# Snakes & Ladders configuration.

# Directory where board layouts are written, one file per game.
# boards_dir = "/tmp/snakes/boards"

# Pause after a move is announced before the next turn starts.
turn_delay_ms = 5000

# Games idle for longer than this are reclaimed.
session_ttl_secs = 3600

# Fixed seed for reproducible dice; leave unset for a fair random die.
# dice_seed = 42

# Session id used by the terminal front-end.
table_id = "local"
"#;

/// Runtime settings shared by the core and front-ends.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AppConfig {
    /// Where rendered board layouts are stored.
    pub boards_dir: PathBuf,
    /// Pacing delay between announcing a move and advancing the turn.
    pub turn_delay_ms: u64,
    /// Idle time after which a session may be expired.
    pub session_ttl_secs: u64,
    /// Seed for reproducible dice.
    #[serde(default)]
    pub dice_seed: Option<u64>,
    /// Session id the terminal front-end plays under.
    pub table_id: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            boards_dir: default_boards_dir(),
            turn_delay_ms: 5_000,
            session_ttl_secs: 3_600,
            dice_seed: None,
            table_id: "local".to_string(),
        }
    }
}

impl AppConfig {
    /// Load from the default config file plus `SNAKES_*` environment overrides.
    pub fn load() -> Result<Self> {
        Self::load_from(config_path(), true)
    }

    /// Load from `path` (optional on disk), optionally layering the environment.
    pub fn load_from(path: impl AsRef<Path>, with_env: bool) -> Result<Self> {
        let path = path.as_ref();
        let defaults = Self::default();
        let mut builder = Config::builder()
            .set_default("boards_dir", defaults.boards_dir.display().to_string())?
            .set_default("turn_delay_ms", defaults.turn_delay_ms as i64)?
            .set_default("session_ttl_secs", defaults.session_ttl_secs as i64)?
            .set_default("table_id", defaults.table_id)?
            .add_source(File::from(path).format(FileFormat::Toml).required(false));
        if with_env {
            builder = builder.add_source(Environment::with_prefix(ENV_PREFIX));
        }

        builder
            .build()
            .with_context(|| format!("failed to read config {}", path.display()))?
            .try_deserialize()
            .with_context(|| format!("invalid config in {}", path.display()))
    }

    /// Pause between a move being shown and the next turn.
    pub fn turn_delay(&self) -> Duration {
        Duration::from_millis(self.turn_delay_ms)
    }

    /// Idle time after which a session may be expired. Saturates for huge values.
    pub fn session_ttl(&self) -> chrono::Duration {
        i64::try_from(self.session_ttl_secs)
            .ok()
            .and_then(chrono::Duration::try_seconds)
            .unwrap_or(chrono::Duration::MAX)
    }
}

/// Default location of `config.toml`.
pub fn config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(CONFIG_DIR)
        .join(CONFIG_FILE)
}

fn default_boards_dir() -> PathBuf {
    dirs::cache_dir()
        .map(|dir| dir.join(CONFIG_DIR).join("boards"))
        .unwrap_or_else(|| PathBuf::from("boards"))
}

/// Write the commented default config unless one already exists.
pub fn ensure_default_config() -> Result<()> {
    ensure_default_config_at(config_path())
}

/// As [`ensure_default_config`], for an explicit path.
pub fn ensure_default_config_at(path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    if path.exists() {
        return Ok(());
    }
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    fs::write(path, DEFAULT_CONFIG)
        .with_context(|| format!("failed to write {}", path.display()))?;
    info!(path = %path.display(), "Wrote default config");
    Ok(())
}
