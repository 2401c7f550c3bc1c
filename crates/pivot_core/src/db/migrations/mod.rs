//! Pivot schema migration registry and lazy executor.
//!
//! # Responsibility
//! - Register join-table migrations in strictly increasing order.
//! - Apply pending migrations atomically, on the first write only.
//!
//! # Invariants
//! - `version` values must remain monotonic.
//! - Applied migration version is mirrored to `PRAGMA user_version`.
//! - A database at version 0 has no `pivots` table yet; that is a valid state.

use crate::db::{table_exists, DbError, DbResult};
use log::info;
use rusqlite::{Connection, Transaction, TransactionBehavior};

/// Join table name shared by every pivot query.
pub const PIVOT_TABLE: &str = "pivots";

#[derive(Debug, Clone, Copy)]
struct Migration {
    version: u32,
    sql: &'static str,
}

const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        sql: include_str!("0001_pivots.sql"),
    },
    Migration {
        version: 2,
        sql: include_str!("0002_pivot_order_index.sql"),
    },
];

/// Returns the latest migration version known by this binary.
pub fn latest_version() -> u32 {
    MIGRATIONS.last().map_or(0, |migration| migration.version)
}

/// Fails when the database was provisioned by a newer binary.
pub fn check_schema_version(conn: &Connection) -> DbResult<()> {
    let current_version = current_user_version(conn)?;
    let latest = latest_version();
    if current_version > latest {
        return Err(DbError::UnsupportedSchemaVersion {
            db_version: current_version,
            latest_supported: latest,
        });
    }
    Ok(())
}

/// Returns whether the pivot join table has been provisioned.
pub fn pivot_table_exists(conn: &Connection) -> DbResult<bool> {
    table_exists(conn, PIVOT_TABLE)
}

/// Applies all pending migrations on the provided connection.
///
/// Must not be called while another transaction is open on `conn`.
pub fn apply_migrations(conn: &Connection) -> DbResult<()> {
    let current_version = current_user_version(conn)?;
    let latest = latest_version();

    if current_version > latest {
        return Err(DbError::UnsupportedSchemaVersion {
            db_version: current_version,
            latest_supported: latest,
        });
    }

    if current_version == latest {
        return Ok(());
    }

    let tx = Transaction::new_unchecked(conn, TransactionBehavior::Immediate)?;
    for migration in MIGRATIONS {
        if migration.version <= current_version {
            continue;
        }

        tx.execute_batch(migration.sql)?;
        tx.execute_batch(&format!("PRAGMA user_version = {};", migration.version))?;
    }
    tx.commit()?;

    info!(
        "event=schema_provision module=db status=ok from_version={} to_version={}",
        current_version, latest
    );
    Ok(())
}

fn current_user_version(conn: &Connection) -> DbResult<u32> {
    let version = conn.query_row("PRAGMA user_version;", [], |row| row.get::<_, u32>(0))?;
    Ok(version)
}
