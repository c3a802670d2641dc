//! Task repository contract and SQLite implementation.
//!
//! # Responsibility
//! - Materialize joined task/category rows into `Task` values.
//! - Own the priority and checklist persistence encodings.
//!
//! # Invariants
//! - `insert` is a full-record upsert keyed by id (`0` inserts).
//! - Unknown priority strings and malformed checklists surface as
//!   `RepoError::InvalidData`.
//! - A task whose category row is gone is returned with
//!   `CategoryRef::Dangling`.

use crate::db::{SqliteStore, Table, TaskRecord, TaskWithCategoryRecord};
use crate::model::category::Category;
use crate::model::task::{CategoryRef, Priority, Task, TaskId};
use crate::repo::checklist_codec::{decode_checklist, encode_checklist};
use crate::repo::{RepoError, RepoResult, RepoStream};
use async_trait::async_trait;
use futures::StreamExt;

const TASK_QUERY_TABLES: &[Table] = &[Table::Tasks, Table::Categories];

/// Repository interface for tasks.
#[async_trait]
pub trait TodoRepository: Send + Sync {
    /// Live list of all tasks, newest id first.
    ///
    /// Lazy: nothing is read until the stream is polled.
    fn get_all(&self) -> RepoStream<Vec<Task>>;
    /// One-shot read; `None` when the id does not exist.
    async fn get_by_id(&self, id: TaskId) -> RepoResult<Option<Task>>;
    /// Inserts or fully replaces a task and returns its id.
    async fn insert(&self, task: &Task) -> RepoResult<TaskId>;
    /// Deletes a task; deleting a missing task is not an error.
    async fn delete(&self, task: &Task) -> RepoResult<()>;
}

/// SQLite-backed task repository.
#[derive(Clone)]
pub struct SqliteTodoRepository {
    store: SqliteStore,
}

impl SqliteTodoRepository {
    pub fn new(store: SqliteStore) -> Self {
        Self { store }
    }
}

#[async_trait]
impl TodoRepository for SqliteTodoRepository {
    fn get_all(&self) -> RepoStream<Vec<Task>> {
        self.store
            .live_query(TASK_QUERY_TABLES, |store| {
                store.query_all_tasks_with_category()
            })
            .map(|result| -> RepoResult<Vec<Task>> {
                result?
                    .into_iter()
                    .map(task_from_record)
                    .collect::<RepoResult<Vec<_>>>()
            })
            .boxed()
    }

    async fn get_by_id(&self, id: TaskId) -> RepoResult<Option<Task>> {
        let record = self
            .store
            .run(move |store| store.query_task_with_category(id))
            .await?;
        record.map(task_from_record).transpose()
    }

    async fn insert(&self, task: &Task) -> RepoResult<TaskId> {
        task.validate()?;
        let record = task_to_record(task)?;
        let id = self
            .store
            .run(move |store| store.upsert_task(&record))
            .await?;
        Ok(id)
    }

    async fn delete(&self, task: &Task) -> RepoResult<()> {
        let id = task.id;
        self.store.run(move |store| store.delete_task(id)).await?;
        Ok(())
    }
}

fn task_to_record(task: &Task) -> RepoResult<TaskRecord> {
    Ok(TaskRecord {
        id: task.id,
        title: task.title.clone(),
        description: task.description.clone(),
        is_completed: task.is_completed,
        priority: priority_to_db(task.priority).to_string(),
        category_id: task.category_id(),
        checklist_json: Some(encode_checklist(&task.checklist)?),
    })
}

fn task_from_record(record: TaskWithCategoryRecord) -> RepoResult<Task> {
    let TaskWithCategoryRecord { task, category } = record;

    let priority = parse_priority(&task.priority).ok_or_else(|| {
        RepoError::InvalidData(format!(
            "invalid priority `{}` in tasks.priority for task {}",
            task.priority, task.id
        ))
    })?;

    let category = match category {
        Some(row) => CategoryRef::Resolved(Category {
            id: row.id,
            name: row.name,
            emoji: row.emoji,
        }),
        None => CategoryRef::Dangling(task.category_id),
    };

    Ok(Task {
        id: task.id,
        title: task.title,
        description: task.description,
        is_completed: task.is_completed,
        priority,
        category,
        checklist: decode_checklist(task.checklist_json.as_deref())?,
    })
}

fn priority_to_db(priority: Priority) -> &'static str {
    match priority {
        Priority::Low => "LOW",
        Priority::Medium => "MEDIUM",
        Priority::High => "HIGH",
    }
}

fn parse_priority(value: &str) -> Option<Priority> {
    match value {
        "LOW" => Some(Priority::Low),
        "MEDIUM" => Some(Priority::Medium),
        "HIGH" => Some(Priority::High),
        _ => None,
    }
}
