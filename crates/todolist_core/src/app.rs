//! Composition root: one store, two repositories, and view-model factories.

use crate::config::{ConfigError, CoreConfig, DbLocation};
use crate::db::{DbError, SqliteStore};
use crate::logging::{init_logging_with, LoggingError};
use crate::model::task::TaskId;
use crate::presentation::add_edit::AddEditViewModel;
use crate::presentation::list::ListViewModel;
use crate::repo::category_repo::{CategoryRepository, SqliteCategoryRepository};
use crate::repo::task_repo::{SqliteTodoRepository, TodoRepository};
use crate::repo::RepoResult;
use log::info;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;

#[derive(Debug)]
pub enum AppError {
    Config(ConfigError),
    Logging(LoggingError),
    Db(DbError),
}

impl Display for AppError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Config(err) => write!(f, "configuration error: {err}"),
            Self::Logging(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
        }
    }
}

impl Error for AppError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Config(err) => Some(err),
            Self::Logging(err) => Some(err),
            Self::Db(err) => Some(err),
        }
    }
}

impl From<ConfigError> for AppError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

impl From<LoggingError> for AppError {
    fn from(value: LoggingError) -> Self {
        Self::Logging(value)
    }
}

impl From<DbError> for AppError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

/// Process-level handle owning the store and the repositories over it.
///
/// Cloning is cheap; clones share the same connection.
#[derive(Clone)]
pub struct TodoApp {
    store: SqliteStore,
    todo_repo: Arc<dyn TodoRepository>,
    category_repo: Arc<dyn CategoryRepository>,
    share_grace: Duration,
    runtime: Handle,
}

impl TodoApp {
    /// Starts logging (when configured) and opens the store.
    pub fn open(config: &CoreConfig, runtime: Handle) -> Result<Self, AppError> {
        if let Some(log) = &config.log {
            init_logging_with(log)?;
        }

        let store = match &config.db {
            DbLocation::File(path) => SqliteStore::open(path)?,
            DbLocation::Memory => SqliteStore::open_in_memory()?,
        };
        info!(
            "event=app_open module=app status=ok share_grace_ms={}",
            config.share_grace.as_millis()
        );

        Ok(Self::with_store(store, config.share_grace, runtime))
    }

    /// Wires repositories over an already opened store.
    pub fn with_store(store: SqliteStore, share_grace: Duration, runtime: Handle) -> Self {
        Self {
            todo_repo: Arc::new(SqliteTodoRepository::new(store.clone())),
            category_repo: Arc::new(SqliteCategoryRepository::new(store.clone())),
            store,
            share_grace,
            runtime,
        }
    }

    pub fn store(&self) -> &SqliteStore {
        &self.store
    }

    pub fn todo_repository(&self) -> Arc<dyn TodoRepository> {
        Arc::clone(&self.todo_repo)
    }

    pub fn category_repository(&self) -> Arc<dyn CategoryRepository> {
        Arc::clone(&self.category_repo)
    }

    pub fn list_view_model(&self) -> ListViewModel {
        ListViewModel::new(
            self.todo_repository(),
            self.category_repository(),
            self.share_grace,
            self.runtime.clone(),
        )
    }

    /// Loads the form for `task_id`, or an empty create form for `None`.
    pub async fn add_edit_view_model(&self, task_id: Option<TaskId>) -> RepoResult<AddEditViewModel> {
        AddEditViewModel::load(
            self.todo_repository(),
            self.category_repository(),
            task_id,
            self.runtime.clone(),
        )
        .await
    }
}
