//! Account book configuration
//!
//! Loaded from a JSON file with per-field defaults, then overridden by
//! `HOUSEHOLD_BOOK_DB` and `HOUSEHOLD_BOOK_LOG`.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const ENV_DATABASE_PATH: &str = "HOUSEHOLD_BOOK_DB";
pub const ENV_LOG_LEVEL: &str = "HOUSEHOLD_BOOK_LOG";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BookConfig {
    #[serde(default)]
    pub database: DatabaseConfig,

    #[serde(default)]
    pub log: LogConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// File path, or ":memory:"
    #[serde(default = "default_database_path")]
    pub path: String,

    #[serde(default = "default_journal_mode")]
    pub journal_mode: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogConfig {
    /// EnvFilter directive, e.g. "info" or "household_book=debug"
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Emit JSON lines instead of human-readable output
    #[serde(default)]
    pub json: bool,
}

fn default_database_path() -> String {
    "household_book.db".to_string()
}

fn default_journal_mode() -> String {
    "WAL".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_database_path(),
            journal_mode: default_journal_mode(),
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

impl BookConfig {
    /// In-memory database, default logging
    pub fn in_memory() -> Self {
        let mut config = Self::default();
        config.database.path = ":memory:".to_string();
        config
    }

    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config = serde_json::from_str(&raw)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        Ok(config)
    }

    /// Defaults when the file is missing; a malformed file is still an error
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            tracing::debug!(path = %path.display(), "config file not found, using defaults");
            Ok(Self::default())
        }
    }

    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(db_path) = std::env::var(ENV_DATABASE_PATH) {
            self.database.path = db_path;
        }
        if let Ok(level) = std::env::var(ENV_LOG_LEVEL) {
            self.log.level = level;
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = BookConfig::default();
        assert_eq!(config.database.path, "household_book.db");
        assert_eq!(config.database.journal_mode, "WAL");
        assert_eq!(config.log.level, "info");
        assert!(!config.log.json);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"database": {{"path": "/tmp/book.db"}}}}"#).unwrap();

        let config = BookConfig::load(file.path()).unwrap();
        assert_eq!(config.database.path, "/tmp/book.db");
        assert_eq!(config.database.journal_mode, "WAL");
        assert_eq!(config.log, LogConfig::default());
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = BookConfig::load_or_default(&dir.path().join("absent.json")).unwrap();
        assert_eq!(config, BookConfig::default());
    }

    #[test]
    fn test_malformed_file_is_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();
        assert!(BookConfig::load_or_default(file.path()).is_err());
    }

    #[test]
    fn test_env_overrides() {
        let saved: Vec<_> = [ENV_DATABASE_PATH, ENV_LOG_LEVEL]
            .iter()
            .map(|key| (*key, std::env::var(key).ok()))
            .collect();

        std::env::set_var(ENV_DATABASE_PATH, "/var/lib/book/household.db");
        std::env::set_var(ENV_LOG_LEVEL, "household_book=debug");
        let config = BookConfig::default().with_env_overrides();

        for (key, value) in saved {
            match value {
                Some(value) => std::env::set_var(key, value),
                None => std::env::remove_var(key),
            }
        }

        assert_eq!(config.database.path, "/var/lib/book/household.db");
        assert_eq!(config.database.journal_mode, "WAL");
        assert_eq!(config.log.level, "household_book=debug");
        assert!(!config.log.json);
    }

    #[test]
    fn test_in_memory() {
        assert_eq!(BookConfig::in_memory().database.path, ":memory:");
    }
}
