//! Keyed SQLite storage for task and category rows.
//!
//! # Responsibility
//! - Own the single shared connection and serialize access to it.
//! - Provide full-record upserts, deletes and the task/category join.
//! - Turn writes into table invalidations that drive live queries.
//!
//! # Invariants
//! - Upserts replace every column; id `0` inserts a new row.
//! - Deleting an absent id is a no-op and does not invalidate.
//! - The task/category join is a single statement, so each pair comes from
//!   one consistent snapshot.
//! - `tasks.category_id` may reference a deleted category; the join then
//!   yields `category = None`.

use super::invalidation::{InvalidationTracker, Table, TableVersions};
use super::migrations::{current_user_version, latest_version};
use super::open::{open_db, open_db_in_memory};
use super::{DbError, DbResult};
use futures::stream::{self, BoxStream, StreamExt};
use log::debug;
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::watch;

const TASK_WITH_CATEGORY_SELECT_SQL: &str = "SELECT
    t.id,
    t.title,
    t.description,
    t.is_completed,
    t.priority,
    t.category_id,
    t.checklist_json,
    c.id AS category_row_id,
    c.name AS category_name,
    c.emoji AS category_emoji
FROM tasks t
LEFT JOIN categories c ON c.id = t.category_id";

const REQUIRED_COLUMNS: &[(&str, &[&str])] = &[
    ("categories", &["id", "name", "emoji"]),
    (
        "tasks",
        &[
            "id",
            "title",
            "description",
            "is_completed",
            "priority",
            "category_id",
            "checklist_json",
        ],
    ),
];

/// Stored shape of a task row. `priority` and `checklist_json` are opaque here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskRecord {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub is_completed: bool,
    pub priority: String,
    pub category_id: i64,
    pub checklist_json: Option<String>,
}

/// Stored shape of a category row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryRecord {
    pub id: i64,
    pub name: String,
    pub emoji: String,
}

/// One row of the task/category join.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskWithCategoryRecord {
    pub task: TaskRecord,
    /// `None` when `task.category_id` no longer resolves.
    pub category: Option<CategoryRecord>,
}

/// Continuously updating query result. The first item is produced on the
/// first poll; later items follow writes to the tables the query reads.
pub type LiveQuery<T> = BoxStream<'static, DbResult<T>>;

/// Shared handle to the process-wide store.
///
/// Cloning is cheap and every clone talks to the same connection.
#[derive(Clone)]
pub struct SqliteStore {
    inner: Arc<StoreInner>,
}

struct StoreInner {
    conn: Mutex<Connection>,
    tracker: InvalidationTracker,
}

impl SqliteStore {
    /// Wraps a migrated connection.
    ///
    /// # Errors
    /// - `UninitializedConnection` when migrations were not applied.
    /// - `MissingRequiredTable` / `MissingRequiredColumn` on schema drift.
    pub fn try_new(conn: Connection) -> DbResult<Self> {
        ensure_connection_ready(&conn)?;
        Ok(Self {
            inner: Arc::new(StoreInner {
                conn: Mutex::new(conn),
                tracker: InvalidationTracker::new(),
            }),
        })
    }

    /// Opens (or creates) a database file and wraps it.
    pub fn open(path: impl AsRef<Path>) -> DbResult<Self> {
        Self::try_new(open_db(path)?)
    }

    /// Opens a fresh in-memory database.
    pub fn open_in_memory() -> DbResult<Self> {
        Self::try_new(open_db_in_memory()?)
    }

    pub fn upsert_task(&self, record: &TaskRecord) -> DbResult<i64> {
        let id = {
            let conn = self.inner.conn.lock();
            conn.execute(
                "INSERT INTO tasks (
                    id,
                    title,
                    description,
                    is_completed,
                    priority,
                    category_id,
                    checklist_json
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                ON CONFLICT(id) DO UPDATE SET
                    title = excluded.title,
                    description = excluded.description,
                    is_completed = excluded.is_completed,
                    priority = excluded.priority,
                    category_id = excluded.category_id,
                    checklist_json = excluded.checklist_json;",
                params![
                    id_for_insert(record.id),
                    record.title.as_str(),
                    record.description.as_deref(),
                    record.is_completed,
                    record.priority.as_str(),
                    record.category_id,
                    record.checklist_json.as_deref(),
                ],
            )?;
            resolved_id(&conn, record.id)
        };

        self.inner.tracker.invalidate(Table::Tasks);
        debug!("event=task_upsert module=store status=ok task_id={id}");
        Ok(id)
    }

    /// Removes a task row. Returns whether a row was deleted.
    pub fn delete_task(&self, id: i64) -> DbResult<bool> {
        let changed = self
            .inner
            .conn
            .lock()
            .execute("DELETE FROM tasks WHERE id = ?1;", [id])?;
        self.finish_delete(Table::Tasks, id, changed)
    }

    /// All tasks with their categories, newest id first.
    pub fn query_all_tasks_with_category(&self) -> DbResult<Vec<TaskWithCategoryRecord>> {
        let conn = self.inner.conn.lock();
        let mut stmt = conn.prepare(&format!(
            "{TASK_WITH_CATEGORY_SELECT_SQL} ORDER BY t.id DESC;"
        ))?;
        let mut rows = stmt.query([])?;
        let mut records = Vec::new();
        while let Some(row) = rows.next()? {
            records.push(parse_task_with_category_row(row)?);
        }
        Ok(records)
    }

    pub fn query_task_with_category(&self, id: i64) -> DbResult<Option<TaskWithCategoryRecord>> {
        let conn = self.inner.conn.lock();
        let record = conn
            .query_row(
                &format!("{TASK_WITH_CATEGORY_SELECT_SQL} WHERE t.id = ?1;"),
                [id],
                parse_task_with_category_row,
            )
            .optional()?;
        Ok(record)
    }

    pub fn upsert_category(&self, record: &CategoryRecord) -> DbResult<i64> {
        let id = {
            let conn = self.inner.conn.lock();
            conn.execute(
                "INSERT INTO categories (id, name, emoji) VALUES (?1, ?2, ?3)
                ON CONFLICT(id) DO UPDATE SET
                    name = excluded.name,
                    emoji = excluded.emoji;",
                params![
                    id_for_insert(record.id),
                    record.name.as_str(),
                    record.emoji.as_str(),
                ],
            )?;
            resolved_id(&conn, record.id)
        };

        self.inner.tracker.invalidate(Table::Categories);
        debug!("event=category_upsert module=store status=ok category_id={id}");
        Ok(id)
    }

    /// Removes a category row without touching tasks that reference it.
    pub fn delete_category(&self, id: i64) -> DbResult<bool> {
        let changed = self
            .inner
            .conn
            .lock()
            .execute("DELETE FROM categories WHERE id = ?1;", [id])?;
        self.finish_delete(Table::Categories, id, changed)
    }

    /// All categories sorted by name.
    pub fn query_all_categories(&self) -> DbResult<Vec<CategoryRecord>> {
        let conn = self.inner.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT id, name, emoji
             FROM categories
             ORDER BY name ASC, id ASC;",
        )?;
        let records = stmt
            .query_map([], parse_category_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(records)
    }

    pub fn query_category(&self, id: i64) -> DbResult<Option<CategoryRecord>> {
        let conn = self.inner.conn.lock();
        let record = conn
            .query_row(
                "SELECT id, name, emoji FROM categories WHERE id = ?1;",
                [id],
                parse_category_row,
            )
            .optional()?;
        Ok(record)
    }

    /// Runs blocking store work off the async executor.
    pub async fn run<T, F>(&self, work: F) -> DbResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&SqliteStore) -> DbResult<T> + Send + 'static,
    {
        let store = self.clone();
        tokio::task::spawn_blocking(move || work(&store)).await?
    }

    /// Current write counters.
    pub fn versions(&self) -> TableVersions {
        self.inner.tracker.current()
    }

    pub fn subscribe_invalidations(&self) -> watch::Receiver<TableVersions> {
        self.inner.tracker.subscribe()
    }

    /// Builds a live query that re-runs `query` whenever one of `tables`
    /// is written.
    ///
    /// Bursts of writes may be coalesced into one re-run, but an emission is
    /// never older than the one before it.
    pub fn live_query<T, F>(&self, tables: &'static [Table], query: F) -> LiveQuery<T>
    where
        T: Send + 'static,
        F: Fn(&SqliteStore) -> DbResult<T> + Send + Sync + 'static,
    {
        let state = LiveQueryState {
            store: self.clone(),
            rx: self.subscribe_invalidations(),
            seen: None,
            query: Arc::new(query),
        };

        stream::unfold(state, move |mut state| async move {
            if let Some(seen) = state.seen {
                loop {
                    if state.rx.changed().await.is_err() {
                        return None;
                    }
                    let current = *state.rx.borrow_and_update();
                    if current.changed_since(&seen, tables) {
                        break;
                    }
                }
            }

            // Snapshot before reading: a write racing the query bumps past it
            // and triggers another run.
            state.seen = Some(*state.rx.borrow_and_update());
            let query = Arc::clone(&state.query);
            let result = state.store.run(move |store| query(store)).await;
            Some((result, state))
        })
        .boxed()
    }

    fn finish_delete(&self, table: Table, id: i64, changed: usize) -> DbResult<bool> {
        if changed == 0 {
            debug!("event=row_delete module=store status=noop table={table:?} id={id}");
            return Ok(false);
        }
        self.inner.tracker.invalidate(table);
        debug!("event=row_delete module=store status=ok table={table:?} id={id}");
        Ok(true)
    }
}

struct LiveQueryState<F> {
    store: SqliteStore,
    rx: watch::Receiver<TableVersions>,
    seen: Option<TableVersions>,
    query: Arc<F>,
}

fn id_for_insert(id: i64) -> Option<i64> {
    if id == 0 {
        None
    } else {
        Some(id)
    }
}

fn resolved_id(conn: &Connection, requested: i64) -> i64 {
    if requested == 0 {
        conn.last_insert_rowid()
    } else {
        requested
    }
}

fn parse_task_with_category_row(row: &Row<'_>) -> rusqlite::Result<TaskWithCategoryRecord> {
    let task = TaskRecord {
        id: row.get("id")?,
        title: row.get("title")?,
        description: row.get("description")?,
        is_completed: row.get("is_completed")?,
        priority: row.get("priority")?,
        category_id: row.get("category_id")?,
        checklist_json: row.get("checklist_json")?,
    };

    let category = match row.get::<_, Option<i64>>("category_row_id")? {
        Some(id) => Some(CategoryRecord {
            id,
            name: row.get("category_name")?,
            emoji: row.get("category_emoji")?,
        }),
        None => None,
    };

    Ok(TaskWithCategoryRecord { task, category })
}

fn parse_category_row(row: &Row<'_>) -> rusqlite::Result<CategoryRecord> {
    Ok(CategoryRecord {
        id: row.get("id")?,
        name: row.get("name")?,
        emoji: row.get("emoji")?,
    })
}

fn ensure_connection_ready(conn: &Connection) -> DbResult<()> {
    let expected_version = latest_version();
    let actual_version = current_user_version(conn)?;
    if actual_version != expected_version {
        return Err(DbError::UninitializedConnection {
            expected_version,
            actual_version,
        });
    }

    for &(table, columns) in REQUIRED_COLUMNS {
        if !table_exists(conn, table)? {
            return Err(DbError::MissingRequiredTable(table));
        }
        for &column in columns {
            if !table_has_column(conn, table, column)? {
                return Err(DbError::MissingRequiredColumn { table, column });
            }
        }
    }

    Ok(())
}

fn table_exists(conn: &Connection, table: &str) -> DbResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM sqlite_master
            WHERE type = 'table' AND name = ?1
        );",
        [table],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

fn table_has_column(conn: &Connection, table: &str, column: &str) -> DbResult<bool> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({table});"))?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let current: String = row.get(1)?;
        if current == column {
            return Ok(true);
        }
    }
    Ok(false)
}
