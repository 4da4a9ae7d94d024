//! Configuration for chunk writers and readers.
//!
//! Resolution order: environment variables → config file → defaults.
//!
//! Config file location:
//!   1. $CHUNKIO_CONFIG (explicit override)
//!   2. $XDG_CONFIG_HOME/chunkio/config.toml
//!   3. ~/.config/chunkio/config.toml

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::wire::DEFAULT_MAX_DEPTH;

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkConfig {
    /// Maximum number of chunks open at once.
    pub max_depth: usize,
    /// How many bytes a vector or quaternion read consumes.
    pub record_read: RecordReadMode,
}

/// Length used by [`ChunkReader::read_record`](crate::ChunkReader::read_record).
///
/// Files written by the legacy tools were read back with a length taken
/// from a pointer rather than the record, so a loader that must behave
/// like them consumes only 4 bytes per record. `Exact` reads the whole
/// record and matches what the writer emits.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordReadMode {
    #[default]
    Legacy,
    Exact,
}

impl std::str::FromStr for RecordReadMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "legacy" => Ok(Self::Legacy),
            "exact" => Ok(Self::Exact),
            other => Err(ConfigError::InvalidValue("CHUNKIO_RECORD_READ", other.to_string())),
        }
    }
}

impl Default for ChunkConfig {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            record_read: RecordReadMode::Legacy,
        }
    }
}

// ── Path helpers ──────────────────────────────────────────────────────────────

fn config_dir() -> PathBuf {
    std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| dirs_or_home().join(".config"))
        .join("chunkio")
}

fn dirs_or_home() -> PathBuf {
    std::env::var("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("/tmp"))
}

// ── Errors ────────────────────────────────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {0}: {1}")]
    ReadFailed(PathBuf, std::io::Error),
    #[error("failed to parse {0}: {1}")]
    ParseFailed(PathBuf, toml::de::Error),
    #[error("invalid value for {0}: {1:?}")]
    InvalidValue(&'static str, String),
    #[error("max_depth must be at least 1")]
    ZeroDepth,
}

// ── Loading ───────────────────────────────────────────────────────────────────

impl ChunkConfig {
    /// Load config: env vars → file → defaults.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::file_path();
        let mut config = if path.exists() {
            Self::from_file(&path)?
        } else {
            ChunkConfig::default()
        };
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// Parse a config file without consulting the environment.
    pub fn from_file(path: &std::path::Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::ReadFailed(path.to_path_buf(), e))?;
        let config: ChunkConfig =
            toml::from_str(&text).map_err(|e| ConfigError::ParseFailed(path.to_path_buf(), e))?;
        config.validate()?;
        Ok(config)
    }

    /// Config file path.
    pub fn file_path() -> PathBuf {
        std::env::var("CHUNKIO_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| config_dir().join("config.toml"))
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.max_depth == 0 {
            return Err(ConfigError::ZeroDepth);
        }
        Ok(())
    }

    /// Apply CHUNKIO_* env var overrides.
    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Ok(v) = std::env::var("CHUNKIO_MAX_DEPTH") {
            self.max_depth = v
                .parse()
                .map_err(|_| ConfigError::InvalidValue("CHUNKIO_MAX_DEPTH", v.clone()))?;
        }
        if let Ok(v) = std::env::var("CHUNKIO_RECORD_READ") {
            self.record_read = v.parse()?;
        }
        Ok(())
    }
}
