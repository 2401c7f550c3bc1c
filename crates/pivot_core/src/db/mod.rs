//! SQLite storage bootstrap and lazy schema provisioning.
//!
//! # Responsibility
//! - Open and configure SQLite connections for pivot storage.
//! - Provision the `pivots` join table on first write, in deterministic order.
//!
//! # Invariants
//! - Provisioned schema version is tracked via `PRAGMA user_version`.
//! - Read paths never create tables; a missing join table reads as empty.

use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod migrations;
mod open;

pub use open::{open_db, open_db_in_memory};

pub type DbResult<T> = Result<T, DbError>;

/// Storage bootstrap and provisioning failures.
///
/// Repositories wrap these as `Db`; the pivot actions answer them with
/// status 500. Opening a database written by a newer binary fails with
/// `UnsupportedSchemaVersion` before any pivot query runs.
#[derive(Debug)]
pub enum DbError {
    /// SQLite rejected a statement or pragma.
    Sqlite(rusqlite::Error),
    /// `PRAGMA user_version` is ahead of the bundled migrations.
    UnsupportedSchemaVersion {
        db_version: u32,
        latest_supported: u32,
    },
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
                "pivot schema version {db_version} is newer than supported {latest_supported}; upgrade the server"
            ),
        }
    }
}

impl Error for DbError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Sqlite(err) => Some(err),
            Self::UnsupportedSchemaVersion { .. } => None,
        }
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}

/// Returns whether a table with the given name exists.
pub fn table_exists(conn: &rusqlite::Connection, table: &str) -> DbResult<bool> {
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
