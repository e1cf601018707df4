//! Runtime configuration for tracker callers.
//!
//! # Responsibility
//! - Resolve store location, state key and behavior policies.
//! - Resolve log level and directory for `init_logging`.
//! - Read overrides from `LEVELUP_*` environment variables.
//!
//! # Invariants
//! - Every field has a default, so an empty environment is valid.
//! - Unknown policy values are rejected, never silently defaulted.

use crate::logging::{default_log_level, init_logging, LoggingError};
use crate::model::system::QuestXpPolicy;
use crate::service::tracker_service::{MissingIdPolicy, TrackerOptions};
use crate::store::state_store::DEFAULT_STATE_KEY;
use serde::Deserialize;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;

pub const ENV_DB_PATH: &str = "LEVELUP_DB_PATH";
pub const ENV_STATE_KEY: &str = "LEVELUP_STATE_KEY";
pub const ENV_QUEST_XP: &str = "LEVELUP_QUEST_XP";
pub const ENV_MISSING_IDS: &str = "LEVELUP_MISSING_IDS";
pub const ENV_LOG_LEVEL: &str = "LEVELUP_LOG_LEVEL";
pub const ENV_LOG_DIR: &str = "LEVELUP_LOG_DIR";

const DEFAULT_DB_FILE_NAME: &str = "levelup.sqlite3";
const DEFAULT_LOG_DIR_NAME: &str = "levelup-logs";

/// Configuration parse failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    InvalidValue {
        var: &'static str,
        value: String,
        expected: &'static str,
    },
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidValue {
                var,
                value,
                expected,
            } => write!(f, "invalid value `{value}` for {var}; expected {expected}"),
        }
    }
}

impl Error for ConfigError {}

/// Resolved tracker configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    pub db_path: PathBuf,
    pub state_key: String,
    pub quest_xp_policy: QuestXpPolicy,
    pub missing_id_policy: MissingIdPolicy,
    pub log_level: String,
    pub log_dir: PathBuf,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            db_path: std::env::temp_dir().join(DEFAULT_DB_FILE_NAME),
            state_key: DEFAULT_STATE_KEY.to_string(),
            quest_xp_policy: QuestXpPolicy::default(),
            missing_id_policy: MissingIdPolicy::default(),
            log_level: default_log_level().to_string(),
            log_dir: std::env::temp_dir().join(DEFAULT_LOG_DIR_NAME),
        }
    }
}

impl TrackerConfig {
    /// Builds configuration from process environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds configuration from an arbitrary variable lookup.
    ///
    /// Blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let read = |name: &str| {
            lookup(name)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let mut config = Self::default();
        if let Some(path) = read(ENV_DB_PATH) {
            config.db_path = PathBuf::from(path);
        }
        if let Some(key) = read(ENV_STATE_KEY) {
            config.state_key = key;
        }
        if let Some(value) = read(ENV_QUEST_XP) {
            config.quest_xp_policy = parse_quest_xp_policy(&value)?;
        }
        if let Some(value) = read(ENV_MISSING_IDS) {
            config.missing_id_policy = parse_missing_id_policy(&value)?;
        }
        if let Some(level) = read(ENV_LOG_LEVEL) {
            config.log_level = level;
        }
        if let Some(dir) = read(ENV_LOG_DIR) {
            config.log_dir = PathBuf::from(dir);
        }
        Ok(config)
    }

    /// Starts process logging with the configured level and directory.
    ///
    /// Level and directory are validated by `init_logging`; a bad value is an
    /// error, not a fallback.
    pub fn init_logging(&self) -> Result<(), LoggingError> {
        let log_dir = self.log_dir.to_str().ok_or_else(|| {
            LoggingError::InvalidDirectory(format!(
                "log_dir is not valid UTF-8: {}",
                self.log_dir.display()
            ))
        })?;
        init_logging(&self.log_level, log_dir)
    }

    /// Options consumed by `TrackerService::open`.
    pub fn tracker_options(&self) -> TrackerOptions {
        TrackerOptions {
            state_key: self.state_key.clone(),
            quest_xp_policy: self.quest_xp_policy,
            missing_id_policy: self.missing_id_policy,
        }
    }
}

pub fn parse_quest_xp_policy(value: &str) -> Result<QuestXpPolicy, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "track" | "track_only" | "off" => Ok(QuestXpPolicy::TrackOnly),
        "award" | "award_xp" | "on" => Ok(QuestXpPolicy::AwardXp),
        _ => Err(ConfigError::InvalidValue {
            var: ENV_QUEST_XP,
            value: value.to_string(),
            expected: "track|award",
        }),
    }
}

pub fn parse_missing_id_policy(value: &str) -> Result<MissingIdPolicy, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "reject" | "strict" => Ok(MissingIdPolicy::Reject),
        "ignore" | "lenient" => Ok(MissingIdPolicy::Ignore),
        _ => Err(ConfigError::InvalidValue {
            var: ENV_MISSING_IDS,
            value: value.to_string(),
            expected: "reject|ignore",
        }),
    }
}
