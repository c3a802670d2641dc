//! Core of the to-do list: categorized tasks with checklists, stored in
//! SQLite and exposed through live queries and view-model state.

pub mod app;
pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod presentation;
pub mod repo;

pub use app::{AppError, TodoApp};
pub use config::{ConfigError, CoreConfig, DbLocation, LogConfig};
pub use db::{DbError, DbResult, SqliteStore};
pub use logging::{
    default_log_level, init_logging, init_logging_with, logging_status, LoggingError,
};
pub use model::category::{Category, CategoryId, CategoryValidationError};
pub use model::task::{
    CategoryRef, ChecklistItem, Priority, Task, TaskId, TaskValidationError,
};
pub use presentation::add_edit::{AddEditEvent, AddEditForm, AddEditViewModel};
pub use presentation::list::{GroupedTasks, ListEvent, ListViewModel, TaskGroup};
pub use presentation::shared_state::{SharedState, StateObserver};
pub use presentation::ui_event::{Route, UiEvent};
pub use repo::category_repo::{CategoryRepository, SqliteCategoryRepository};
pub use repo::task_repo::{SqliteTodoRepository, TodoRepository};
pub use repo::{RepoError, RepoResult, RepoStream};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
