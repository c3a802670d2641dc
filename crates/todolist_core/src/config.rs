//! Runtime configuration for the to-do core.
//!
//! Values come from explicit construction or from `TODOLIST_*` environment
//! variables; nothing here is global.

use crate::logging::default_log_level;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;
use std::time::Duration;

pub const DB_PATH_ENV: &str = "TODOLIST_DB_PATH";
pub const SHARE_GRACE_MS_ENV: &str = "TODOLIST_SHARE_GRACE_MS";
pub const LOG_LEVEL_ENV: &str = "TODOLIST_LOG_LEVEL";
pub const LOG_DIR_ENV: &str = "TODOLIST_LOG_DIR";

const DEFAULT_DB_FILE_NAME: &str = "todolist.sqlite3";
const DEFAULT_SHARE_GRACE: Duration = Duration::from_secs(5);

/// Where the store lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DbLocation {
    File(PathBuf),
    Memory,
}

/// Arguments forwarded to [`crate::logging::init_logging`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogConfig {
    pub level: String,
    /// Absolute directory for rolling log files.
    pub dir: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoreConfig {
    pub db: DbLocation,
    /// How long shared state keeps its upstream alive without observers.
    pub share_grace: Duration,
    /// `None` leaves logging to the host process.
    pub log: Option<LogConfig>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    InvalidNumber { key: &'static str, value: String },
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidNumber { key, value } => {
                write!(f, "`{key}` must be a non-negative integer, got `{value}`")
            }
        }
    }
}

impl Error for ConfigError {}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            db: DbLocation::File(default_db_path()),
            share_grace: DEFAULT_SHARE_GRACE,
            log: None,
        }
    }
}

impl CoreConfig {
    /// In-memory store, default grace period, no logging.
    pub fn in_memory() -> Self {
        Self {
            db: DbLocation::Memory,
            ..Self::default()
        }
    }

    /// Reads configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads configuration through `lookup`; blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let read = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let db = read(DB_PATH_ENV)
            .map(|path| DbLocation::File(PathBuf::from(path)))
            .unwrap_or_else(|| DbLocation::File(default_db_path()));

        let share_grace = match read(SHARE_GRACE_MS_ENV) {
            Some(value) => value
                .parse::<u64>()
                .map(Duration::from_millis)
                .map_err(|_| ConfigError::InvalidNumber {
                    key: SHARE_GRACE_MS_ENV,
                    value,
                })?,
            None => DEFAULT_SHARE_GRACE,
        };

        let log = read(LOG_DIR_ENV).map(|dir| LogConfig {
            level: read(LOG_LEVEL_ENV).unwrap_or_else(|| default_log_level().to_string()),
            dir,
        });

        Ok(Self {
            db,
            share_grace,
            log,
        })
    }
}

fn default_db_path() -> PathBuf {
    std::env::temp_dir().join(DEFAULT_DB_FILE_NAME)
}

#[cfg(test)]
mod tests {
    use super::{ConfigError, CoreConfig, DbLocation, LogConfig};
    use std::collections::HashMap;
    use std::path::PathBuf;
    use std::time::Duration;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map = pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect::<HashMap<_, _>>();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn empty_environment_uses_defaults() {
        let config = CoreConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, CoreConfig::default());
        assert!(matches!(config.db, DbLocation::File(path) if path.ends_with("todolist.sqlite3")));
    }

    #[test]
    fn reads_all_keys() {
        let config = CoreConfig::from_lookup(lookup(&[
            ("TODOLIST_DB_PATH", " /data/todo.db "),
            ("TODOLIST_SHARE_GRACE_MS", "250"),
            ("TODOLIST_LOG_LEVEL", "warn"),
            ("TODOLIST_LOG_DIR", "/var/log/todo"),
        ]))
        .unwrap();

        assert_eq!(config.db, DbLocation::File(PathBuf::from("/data/todo.db")));
        assert_eq!(config.share_grace, Duration::from_millis(250));
        assert_eq!(
            config.log,
            Some(LogConfig {
                level: "warn".to_string(),
                dir: "/var/log/todo".to_string(),
            })
        );
    }

    #[test]
    fn rejects_non_numeric_grace() {
        let err = CoreConfig::from_lookup(lookup(&[("TODOLIST_SHARE_GRACE_MS", "soon")]))
            .unwrap_err();
        assert_eq!(
            err,
            ConfigError::InvalidNumber {
                key: "TODOLIST_SHARE_GRACE_MS",
                value: "soon".to_string(),
            }
        );
    }
}
