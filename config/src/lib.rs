//! Chronoshare Configuration
//!
//! Handles loading configuration from:
//! 1. CS_CONFIG env var (explicit path)
//! 2. ./config.toml (current directory)
//! 3. ~/.chronoshare/config.toml (user home)
//!
//! Environment variables take precedence over TOML config.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::{LazyLock, OnceLock};
use std::{env, fs};

/// Global config instance for convenience access
pub static GLOBAL_CONFIG: OnceLock<ChronoshareConfig> = OnceLock::new();

const CONFIG_FILE_NAME: &str = "config.toml";
const CONFIG_DIR_NAME: &str = ".chronoshare";

// ============================================================================
// Default Constants
// ============================================================================

const DEFAULT_DB_PATH: &str = "./chronoshare-db";
const DEFAULT_OPERATOR: &str = "operator";
const DEFAULT_REQUIRED_DEPOSIT: u64 = 100;
const DEFAULT_MIN_SHARE_THRESHOLD: u32 = 1;
const DEFAULT_WINDOW_SECS: u64 = 3600;

// ============================================================================
// Config Structs
// ============================================================================

/// Root configuration structure (matches TOML layout)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChronoshareConfig {
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub ledger: LedgerConfig,
    #[serde(default)]
    pub session: SessionDefaults,
}

/// Database configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: DEFAULT_DB_PATH.into(),
        }
    }
}

fn default_db_path() -> String {
    DEFAULT_DB_PATH.into()
}

/// Ledger host configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerConfig {
    /// Fixed unix time for every call. Unset means the wall clock.
    #[serde(default)]
    pub pinned_time: Option<u64>,
    /// Label of the account that acts when no `--as` is given.
    #[serde(default = "default_operator")]
    pub operator_label: String,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            pinned_time: None,
            operator_label: DEFAULT_OPERATOR.into(),
        }
    }
}

fn default_operator() -> String {
    DEFAULT_OPERATOR.into()
}

/// Defaults used when creating sessions from the CLI
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionDefaults {
    #[serde(default = "default_required_deposit")]
    pub required_deposit: u64,
    #[serde(default = "default_min_share_threshold")]
    pub min_share_threshold: u32,
    #[serde(default = "default_window_secs")]
    pub registration_secs: u64,
    #[serde(default = "default_window_secs")]
    pub voting_secs: u64,
    #[serde(default = "default_window_secs")]
    pub shares_secs: u64,
}

impl Default for SessionDefaults {
    fn default() -> Self {
        Self {
            required_deposit: DEFAULT_REQUIRED_DEPOSIT,
            min_share_threshold: DEFAULT_MIN_SHARE_THRESHOLD,
            registration_secs: DEFAULT_WINDOW_SECS,
            voting_secs: DEFAULT_WINDOW_SECS,
            shares_secs: DEFAULT_WINDOW_SECS,
        }
    }
}

fn default_required_deposit() -> u64 {
    DEFAULT_REQUIRED_DEPOSIT
}
fn default_min_share_threshold() -> u32 {
    DEFAULT_MIN_SHARE_THRESHOLD
}
fn default_window_secs() -> u64 {
    DEFAULT_WINDOW_SECS
}

// ============================================================================
// Environment Helpers
// ============================================================================

fn env_string(key: &str, field: &mut String) {
    if let Ok(v) = env::var(key) {
        *field = v;
    }
}

fn env_parse<T: std::str::FromStr>(key: &str, field: &mut T) {
    if let Ok(v) = env::var(key) {
        match v.parse() {
            Ok(parsed) => *field = parsed,
            Err(_) => log::warn!("Ignoring unparsable {}={}", key, v),
        }
    }
}

fn env_parse_option<T: std::str::FromStr>(key: &str, field: &mut Option<T>) {
    if let Ok(v) = env::var(key) {
        match v.parse() {
            Ok(parsed) => *field = Some(parsed),
            Err(_) => log::warn!("Ignoring unparsable {}={}", key, v),
        }
    }
}

// ============================================================================
// Loading
// ============================================================================

impl ChronoshareConfig {
    pub fn load() -> Result<Self> {
        let mut config = match Self::find_config_file() {
            Some(path) => {
                log::info!("Loading config from: {}", path.display());
                Self::read(&path)?
            }
            None => {
                log::info!("No config file found, using defaults and environment variables");
                Self::default()
            }
        };

        config.apply_env_overrides();
        Ok(config)
    }

    pub fn load_from(path: &std::path::Path) -> Result<Self> {
        let mut config = Self::read(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    fn read(path: &std::path::Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    fn find_config_file() -> Option<PathBuf> {
        if let Ok(path) = env::var("CS_CONFIG") {
            let path = PathBuf::from(path);
            if path.exists() {
                return Some(path);
            }
        }

        let local_path = PathBuf::from(CONFIG_FILE_NAME);
        if local_path.exists() {
            return Some(local_path);
        }

        Self::default_config_path().filter(|p| p.exists())
    }

    fn apply_env_overrides(&mut self) {
        env_string("CS_DB_PATH", &mut self.database.path);
        env_parse_option("CS_NOW", &mut self.ledger.pinned_time);
        env_string("CS_OPERATOR", &mut self.ledger.operator_label);
        env_parse("CS_REQUIRED_DEPOSIT", &mut self.session.required_deposit);
        env_parse(
            "CS_MIN_SHARE_THRESHOLD",
            &mut self.session.min_share_threshold,
        );
    }

    pub fn default_config_path() -> Option<PathBuf> {
        dirs::home_dir().map(|h| h.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
    }

    pub fn generate_sample() -> String {
        let mut sample = Self::default();
        sample.ledger.pinned_time = Some(1_700_000_000);
        toml::to_string_pretty(&sample).unwrap_or_default()
    }

    pub fn global() -> &'static ChronoshareConfig {
        GLOBAL_CONFIG.get_or_init(|| {
            Self::load().unwrap_or_else(|e| {
                log::warn!("Failed to load config: {}, using defaults", e);
                Self::default()
            })
        })
    }

    pub fn try_global() -> Option<&'static ChronoshareConfig> {
        GLOBAL_CONFIG.get()
    }

    pub fn set_global(config: ChronoshareConfig) -> Result<(), ChronoshareConfig> {
        GLOBAL_CONFIG.set(config)
    }
}

#[inline]
pub fn global_config() -> &'static ChronoshareConfig {
    ChronoshareConfig::global()
}

// ============================================================================
// Runtime Views
// ============================================================================

pub static DATABASE: LazyLock<DatabaseRuntime> = LazyLock::new(|| {
    let cfg = ChronoshareConfig::global();
    DatabaseRuntime {
        path: &cfg.database.path,
    }
});

pub struct DatabaseRuntime {
    pub path: &'static str,
}

pub static LEDGER: LazyLock<LedgerRuntime> = LazyLock::new(|| {
    let cfg = ChronoshareConfig::global();
    LedgerRuntime {
        pinned_time: cfg.ledger.pinned_time,
        operator_label: &cfg.ledger.operator_label,
    }
});

pub struct LedgerRuntime {
    pub pinned_time: Option<u64>,
    pub operator_label: &'static str,
}

/// Session defaults constant.
pub static SESSION_DEFAULTS: LazyLock<SessionDefaults> =
    LazyLock::new(|| ChronoshareConfig::global().session.clone());

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ChronoshareConfig::default();
        assert_eq!(config.database.path, DEFAULT_DB_PATH);
        assert_eq!(config.ledger.operator_label, DEFAULT_OPERATOR);
        assert_eq!(config.ledger.pinned_time, None);
        assert_eq!(config.session.required_deposit, DEFAULT_REQUIRED_DEPOSIT);
        assert_eq!(config.session.voting_secs, DEFAULT_WINDOW_SECS);
    }

    #[test]
    fn test_generate_sample() {
        let sample = ChronoshareConfig::generate_sample();
        assert!(sample.contains("[database]"));
        assert!(sample.contains("[ledger]"));
        assert!(sample.contains("[session]"));
    }

    #[test]
    fn test_parse_sample() {
        let sample = ChronoshareConfig::generate_sample();
        let parsed: ChronoshareConfig = toml::from_str(&sample).unwrap();
        assert_eq!(parsed.ledger.pinned_time, Some(1_700_000_000));
        assert_eq!(parsed.session, SessionDefaults::default());
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let parsed: ChronoshareConfig = toml::from_str(
            r#"
            [session]
            required_deposit = 5
            "#,
        )
        .unwrap();
        assert_eq!(parsed.session.required_deposit, 5);
        assert_eq!(parsed.session.min_share_threshold, DEFAULT_MIN_SHARE_THRESHOLD);
        assert_eq!(parsed.database.path, DEFAULT_DB_PATH);
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        fs::write(&path, "[database]\npath = \"/tmp/elsewhere\"\n").unwrap();

        let config = ChronoshareConfig::load_from(&path).unwrap();
        if env::var("CS_DB_PATH").is_err() {
            assert_eq!(config.database.path, "/tmp/elsewhere");
        }
    }
}
