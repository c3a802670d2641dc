//! Repository layer: domain objects over the entity store.
//!
//! # Responsibility
//! - Translate between stored records and domain objects.
//! - Expose live collections as streams and one-shot reads as futures.
//! - Keep the checklist encoding out of both store and domain code.
//!
//! # Invariants
//! - Writes call the model's `validate()` before touching storage.
//! - Reads reject undecodable persisted data (`InvalidData`) instead of
//!   masking it.

pub mod category_repo;
pub mod checklist_codec;
pub mod task_repo;

use crate::db::DbError;
use crate::model::category::CategoryValidationError;
use crate::model::task::TaskValidationError;
use checklist_codec::ChecklistCodecError;
use futures::stream::BoxStream;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type RepoResult<T> = Result<T, RepoError>;

/// Live repository collection; each item is the complete current state.
pub type RepoStream<T> = BoxStream<'static, RepoResult<T>>;

/// Repository error for task and category persistence.
#[derive(Debug)]
pub enum RepoError {
    TaskValidation(TaskValidationError),
    CategoryValidation(CategoryValidationError),
    Db(DbError),
    /// Persisted data this build cannot decode. Indicates a bug or corruption.
    InvalidData(String),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::TaskValidation(err) => write!(f, "{err}"),
            Self::CategoryValidation(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::InvalidData(message) => write!(f, "invalid persisted data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::TaskValidation(err) => Some(err),
            Self::CategoryValidation(err) => Some(err),
            Self::Db(err) => Some(err),
            Self::InvalidData(_) => None,
        }
    }
}

impl From<TaskValidationError> for RepoError {
    fn from(value: TaskValidationError) -> Self {
        Self::TaskValidation(value)
    }
}

impl From<CategoryValidationError> for RepoError {
    fn from(value: CategoryValidationError) -> Self {
        Self::CategoryValidation(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<ChecklistCodecError> for RepoError {
    fn from(value: ChecklistCodecError) -> Self {
        Self::InvalidData(value.to_string())
    }
}
