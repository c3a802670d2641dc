use rusqlite::Connection;
use todolist_core::db::migrations::latest_version;
use todolist_core::db::{open_db, open_db_in_memory, DbError, SqliteStore};

#[test]
fn open_db_in_memory_applies_all_migrations() {
    let conn = open_db_in_memory().unwrap();

    assert_eq!(schema_version(&conn), latest_version());
    assert_table_exists(&conn, "categories");
    assert_table_exists(&conn, "tasks");
    assert!(index_exists(&conn, "idx_tasks_category_id"));
}

#[test]
fn reopening_a_file_keeps_schema_and_rows() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("todolist.sqlite3");

    let conn = open_db(&path).unwrap();
    conn.execute(
        "INSERT INTO categories (name, emoji) VALUES ('Work', '💼');",
        [],
    )
    .unwrap();
    drop(conn);

    let reopened = open_db(&path).unwrap();
    assert_eq!(schema_version(&reopened), latest_version());
    let count: i64 = reopened
        .query_row("SELECT COUNT(*) FROM categories;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(count, 1);
}

#[test]
fn newer_schema_version_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("future.sqlite3");

    let conn = Connection::open(&path).unwrap();
    conn.execute_batch("PRAGMA user_version = 999;").unwrap();
    drop(conn);

    match open_db(&path).unwrap_err() {
        DbError::UnsupportedSchemaVersion {
            db_version,
            latest_supported,
        } => {
            assert_eq!(db_version, 999);
            assert_eq!(latest_supported, latest_version());
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn store_refuses_unmigrated_connection() {
    let conn = Connection::open_in_memory().unwrap();
    let err = SqliteStore::try_new(conn).err().unwrap();
    assert!(matches!(
        err,
        DbError::UninitializedConnection {
            actual_version: 0,
            ..
        }
    ));
}

#[test]
fn deleting_a_category_keeps_referencing_tasks() {
    let conn = open_db_in_memory().unwrap();
    conn.execute("INSERT INTO categories (id, name) VALUES (1, 'Home');", [])
        .unwrap();
    conn.execute(
        "INSERT INTO tasks (title, priority, category_id) VALUES ('Sweep', 'LOW', 1);",
        [],
    )
    .unwrap();

    conn.execute("DELETE FROM categories WHERE id = 1;", [])
        .unwrap();

    let remaining: i64 = conn
        .query_row("SELECT COUNT(*) FROM tasks WHERE category_id = 1;", [], |row| {
            row.get(0)
        })
        .unwrap();
    assert_eq!(remaining, 1);
}

fn schema_version(conn: &Connection) -> u32 {
    conn.query_row("PRAGMA user_version;", [], |row| row.get(0))
        .unwrap()
}

fn index_exists(conn: &Connection, index_name: &str) -> bool {
    let exists: i64 = conn
        .query_row(
            "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type = 'index' AND name = ?1);",
            [index_name],
            |row| row.get(0),
        )
        .unwrap();
    exists == 1
}

fn assert_table_exists(conn: &Connection, table_name: &str) {
    let exists: i64 = conn
        .query_row(
            "SELECT EXISTS(
                SELECT 1
                FROM sqlite_master
                WHERE type = 'table' AND name = ?1
            );",
            [table_name],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(exists, 1, "table {table_name} does not exist");
}
