use pivot_core::db::migrations::{apply_migrations, latest_version, pivot_table_exists};
use pivot_core::db::{open_db, open_db_in_memory, DbError};
use pivot_core::{ObjectRef, ObjectType, PivotRepository, SqlitePivotRepository};
use rusqlite::Connection;

#[test]
fn fresh_database_has_no_pivot_table_until_first_write() {
    let conn = open_db_in_memory().unwrap();
    assert_eq!(schema_version(&conn), 0);
    assert!(!pivot_table_exists(&conn).unwrap());

    let repo = SqlitePivotRepository::new(&conn);
    let source = ObjectRef::parse("article", "42").unwrap();
    let image = ObjectType::parse("image").unwrap();
    assert!(repo.list_targets(&source, &image).unwrap().is_empty());
    assert_eq!(repo.count_pivots(&source, &image).unwrap(), 0);
    assert!(!pivot_table_exists(&conn).unwrap());

    repo.ensure_table().unwrap();
    assert!(pivot_table_exists(&conn).unwrap());
    assert_eq!(schema_version(&conn), latest_version());
    assert_index_exists(&conn, "idx_pivots_source_order");
}

#[test]
fn applying_migrations_twice_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("pivot.db");

    let conn_first = open_db(&path).unwrap();
    apply_migrations(&conn_first).unwrap();
    apply_migrations(&conn_first).unwrap();
    drop(conn_first);

    let conn_second = open_db(&path).unwrap();
    assert_eq!(schema_version(&conn_second), latest_version());
    assert!(pivot_table_exists(&conn_second).unwrap());
}

#[test]
fn opening_database_with_newer_schema_version_returns_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("future.db");

    let conn = Connection::open(&path).unwrap();
    conn.execute_batch("PRAGMA user_version = 999;").unwrap();
    drop(conn);

    let err = open_db(&path).unwrap_err();
    match err {
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

fn schema_version(conn: &Connection) -> u32 {
    conn.query_row("PRAGMA user_version;", [], |row| row.get(0))
        .unwrap()
}

fn assert_index_exists(conn: &Connection, index_name: &str) {
    let exists: i64 = conn
        .query_row(
            "SELECT EXISTS(
                SELECT 1
                FROM sqlite_master
                WHERE type = 'index' AND name = ?1
            );",
            [index_name],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(exists, 1, "index {index_name} does not exist");
}
