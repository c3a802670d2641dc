//! Entity store: SQLite bootstrap, schema migrations and keyed storage for
//! task and category records.
//!
//! # Responsibility
//! - Open and configure SQLite connections for the to-do core.
//! - Apply schema migrations in deterministic order.
//! - Own raw CRUD and the task/category join behind [`SqliteStore`].
//!
//! # Invariants
//! - Migration version is tracked via `PRAGMA user_version`.
//! - Core code must not read/write application data before migrations succeed.
//! - Every successful write that changes rows invalidates its table.

use std::error::Error;
use std::fmt::{Display, Formatter};

mod invalidation;
pub mod migrations;
mod open;
mod store;

pub use invalidation::{Table, TableVersions};
pub use open::{open_db, open_db_in_memory};
pub use store::{
    CategoryRecord, LiveQuery, SqliteStore, TaskRecord, TaskWithCategoryRecord,
};

pub type DbResult<T> = Result<T, DbError>;

#[derive(Debug)]
pub enum DbError {
    Sqlite(rusqlite::Error),
    UnsupportedSchemaVersion {
        db_version: u32,
        latest_supported: u32,
    },
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    MissingRequiredTable(&'static str),
    MissingRequiredColumn {
        table: &'static str,
        column: &'static str,
    },
    /// Blocking store work could not be joined back onto the async caller.
    Runtime(String),
}

impl Display for DbError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sqlite(err) => write!(f, "{err}"),
            Self::UnsupportedSchemaVersion {
                db_version,
                latest_supported,
            } => write!(
                f,
                "database schema version {db_version} is newer than supported {latest_supported}"
            ),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "connection schema version {actual_version} does not match expected {expected_version}; open it with open_db first"
            ),
            Self::MissingRequiredTable(table) => write!(f, "required table `{table}` is missing"),
            Self::MissingRequiredColumn { table, column } => {
                write!(f, "required column `{table}.{column}` is missing")
            }
            Self::Runtime(message) => write!(f, "store task failed: {message}"),
        }
    }
}

impl Error for DbError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Sqlite(err) => Some(err),
            _ => None,
        }
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}

impl From<tokio::task::JoinError> for DbError {
    fn from(value: tokio::task::JoinError) -> Self {
        Self::Runtime(value.to_string())
    }
}
