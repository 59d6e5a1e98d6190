//! Configuration file parser for parse settings.
//!
//! The config file is optional — a missing file yields `Config::default()`.
//! Unknown keys are accepted by serde but logged as warnings, since they are
//! most likely typos.
use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::feed::{ParseOptions, TimestampPolicy, DEFAULT_REFRESH_INTERVAL_MINUTES};

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid TOML in config file: {0}")]
    Parse(#[from] toml::de::Error),

    /// SEC-014: Config file exceeds maximum allowed size.
    #[error("Config file too large: {0}")]
    TooLarge(String),

    #[error("Refresh interval of {0} minutes is out of range")]
    RefreshOutOfRange(u64),
}

// ============================================================================
// Configuration Structs
// ============================================================================

/// Top-level configuration.
///
/// All fields use `#[serde(default)]` so any subset of keys can be specified.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Attach entry dumps to warnings and log raw documents that produced them.
    pub debug: bool,

    /// Minutes a parsed feed stays fresh.
    pub refresh_interval_minutes: u64,

    /// `"skip"` drops entries with unparseable dates, `"fail"` aborts the parse.
    pub on_bad_timestamp: TimestampPolicy,

    /// Newline-delimited list of item IDs already read.
    pub read_state_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            debug: false,
            refresh_interval_minutes: DEFAULT_REFRESH_INTERVAL_MINUTES,
            on_bad_timestamp: TimestampPolicy::default(),
            read_state_path: None,
        }
    }
}

impl Config {
    /// SEC-014: Maximum config file size (1 MB).
    const MAX_FILE_SIZE: u64 = 1_048_576;

    const KNOWN_KEYS: [&'static str; 4] = [
        "debug",
        "refresh_interval_minutes",
        "on_bad_timestamp",
        "read_state_path",
    ];

    /// Load configuration from a TOML file.
    ///
    /// - Missing file → `Ok(Config::default())`
    /// - Empty file → `Ok(Config::default())`
    /// - Invalid TOML → `Err(ConfigError::Parse)` with line number info
    /// - Unknown keys → accepted, logged as warning
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        // SEC-014: Check file size before reading to prevent memory exhaustion
        match std::fs::metadata(path) {
            Ok(meta) if meta.len() > Self::MAX_FILE_SIZE => {
                return Err(ConfigError::TooLarge(format!(
                    "Config file is {} bytes (max {} bytes)",
                    meta.len(),
                    Self::MAX_FILE_SIZE
                )));
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "No config file found, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
            Ok(_) => {}
        }

        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                // Race condition: file deleted between metadata and read
                tracing::debug!(path = %path.display(), "Config file disappeared, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
        };

        if content.trim().is_empty() {
            tracing::debug!(path = %path.display(), "Config file is empty, using defaults");
            return Ok(Self::default());
        }

        if let Ok(raw) = content.parse::<toml::Table>() {
            for key in raw.keys() {
                if !Self::KNOWN_KEYS.contains(&key.as_str()) {
                    tracing::warn!(key = %key, "Unknown key in config file, ignoring");
                }
            }
        }

        let config: Config = toml::from_str(&content)?;
        tracing::info!(path = %path.display(), debug = config.debug, "Loaded configuration");
        Ok(config)
    }

    /// Converts to the options consumed by [`crate::feed::FeedParser`].
    pub fn parse_options(&self) -> Result<ParseOptions, ConfigError> {
        let refresh_interval = i64::try_from(self.refresh_interval_minutes)
            .ok()
            .and_then(chrono::Duration::try_minutes)
            .ok_or(ConfigError::RefreshOutOfRange(self.refresh_interval_minutes))?;

        Ok(ParseOptions {
            debug: self.debug,
            refresh_interval,
            on_bad_timestamp: self.on_bad_timestamp,
        })
    }
}

// ============================================================================
// Tests
// ============================================================================
