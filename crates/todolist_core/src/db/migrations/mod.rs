//! Ordered schema steps for the task store.
//!
//! # Invariants
//! - Step versions start at 1 and increase by exactly one.
//! - `PRAGMA user_version` always equals the last step applied.
//! - All pending steps of one open run in a single transaction.

use crate::db::{DbError, DbResult};
use log::{debug, info};
use rusqlite::Connection;

struct SchemaStep {
    version: u32,
    name: &'static str,
    sql: &'static str,
}

const SCHEMA_STEPS: &[SchemaStep] = &[
    SchemaStep {
        version: 1,
        name: "categories_and_tasks",
        sql: include_str!("0001_init.sql"),
    },
    SchemaStep {
        version: 2,
        name: "task_category_index",
        sql: include_str!("0002_task_category_index.sql"),
    },
];

/// Highest schema version this build can produce.
pub fn latest_version() -> u32 {
    SCHEMA_STEPS.len() as u32
}

/// Brings `conn` up to [`latest_version`].
///
/// # Errors
/// - `UnsupportedSchemaVersion` when the file was written by a newer build.
pub fn apply_migrations(conn: &mut Connection) -> DbResult<()> {
    let from = current_user_version(conn)?;
    let pending = pending_steps(from)?;
    if pending.is_empty() {
        return Ok(());
    }

    let tx = conn.transaction()?;
    for step in pending {
        debug!(
            "event=db_migrate_step module=db status=start version={} name={}",
            step.version, step.name
        );
        tx.execute_batch(step.sql)?;
        tx.pragma_update(None, "user_version", step.version)?;
    }
    tx.commit()?;

    info!(
        "event=db_migrate module=db status=ok from_version={from} to_version={} steps={}",
        latest_version(),
        pending.len()
    );
    Ok(())
}

/// Reads `PRAGMA user_version`.
pub fn current_user_version(conn: &Connection) -> DbResult<u32> {
    Ok(conn.pragma_query_value(None, "user_version", |row| row.get::<_, u32>(0))?)
}

fn pending_steps(from: u32) -> DbResult<&'static [SchemaStep]> {
    let latest = latest_version();
    if from > latest {
        return Err(DbError::UnsupportedSchemaVersion {
            db_version: from,
            latest_supported: latest,
        });
    }
    Ok(&SCHEMA_STEPS[from as usize..])
}
