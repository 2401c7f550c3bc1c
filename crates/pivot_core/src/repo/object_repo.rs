//! Object store contracts and SQLite implementation.
//!
//! # Responsibility
//! - Load, save and delete container/target objects by type and id.
//! - Report per-type table existence; tables are created on first save.
//!
//! # Invariants
//! - One table per object type, named by `ObjectType::table_name()`.
//! - `data` is persisted as JSON text and must parse back to a JSON value.

use crate::db::{table_exists, DbError};
use crate::model::object::{ObjectId, ObjectRef, ObjectType, StoredObject};
use log::info;
use rusqlite::{params, Connection};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type ObjectRepoResult<T> = Result<T, ObjectRepoError>;

/// Errors from object store operations.
#[derive(Debug)]
pub enum ObjectRepoError {
    /// Underlying SQLite error.
    Db(DbError),
    /// Object row does not exist.
    NotFound(ObjectRef),
    /// Storage table for the type has not been created yet.
    MissingTable(ObjectType),
    /// Persisted data cannot be converted to a valid read model.
    InvalidData(String),
}

impl Display for ObjectRepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound(object) => write!(f, "object not found: {object}"),
            Self::MissingTable(obj_type) => {
                write!(f, "storage table for object type `{obj_type}` does not exist")
            }
            Self::InvalidData(message) => write!(f, "invalid persisted object data: {message}"),
        }
    }
}

impl Error for ObjectRepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::NotFound(_) => None,
            Self::MissingTable(_) => None,
            Self::InvalidData(_) => None,
        }
    }
}

impl From<DbError> for ObjectRepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for ObjectRepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Persistence interface for pivot sources and targets.
pub trait ObjectRepository {
    /// Returns whether storage for `obj_type` exists.
    fn table_exists(&self, obj_type: &ObjectType) -> ObjectRepoResult<bool>;
    /// Creates storage for `obj_type` if absent.
    fn create_table(&self, obj_type: &ObjectType) -> ObjectRepoResult<()>;
    /// Inserts or replaces one object.
    fn save_object(&self, object: &StoredObject) -> ObjectRepoResult<()>;
    /// Loads one object. Fails with `MissingTable` when storage is absent.
    fn load_object(&self, object: &ObjectRef) -> ObjectRepoResult<Option<StoredObject>>;
    /// Deletes one object. Fails with `NotFound` when no row was removed.
    fn delete_object(&self, object: &ObjectRef) -> ObjectRepoResult<()>;
}

/// SQLite-backed object store.
pub struct SqliteObjectRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteObjectRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    fn require_table(&self, obj_type: &ObjectType) -> ObjectRepoResult<()> {
        if !self.table_exists(obj_type)? {
            return Err(ObjectRepoError::MissingTable(obj_type.clone()));
        }
        Ok(())
    }
}

impl ObjectRepository for SqliteObjectRepository<'_> {
    fn table_exists(&self, obj_type: &ObjectType) -> ObjectRepoResult<bool> {
        Ok(table_exists(self.conn, &obj_type.table_name())?)
    }

    fn create_table(&self, obj_type: &ObjectType) -> ObjectRepoResult<()> {
        if self.table_exists(obj_type)? {
            return Ok(());
        }

        let table = obj_type.table_name();
        self.conn.execute_batch(&format!(
            "CREATE TABLE IF NOT EXISTS \"{table}\" (
                id TEXT PRIMARY KEY NOT NULL,
                active INTEGER NOT NULL DEFAULT 1 CHECK (active IN (0, 1)),
                data TEXT NOT NULL DEFAULT '{{}}',
                created_at INTEGER NOT NULL DEFAULT (strftime('%s', 'now') * 1000),
                updated_at INTEGER NOT NULL DEFAULT (strftime('%s', 'now') * 1000)
            );"
        ))?;
        info!(
            "event=object_table_create module=object status=ok obj_type={}",
            obj_type
        );
        Ok(())
    }

    fn save_object(&self, object: &StoredObject) -> ObjectRepoResult<()> {
        self.create_table(&object.obj_type)?;

        let data = serde_json::to_string(&object.data)
            .map_err(|err| ObjectRepoError::InvalidData(err.to_string()))?;
        self.conn.execute(
            &format!(
                "INSERT INTO \"{}\" (id, active, data)
                 VALUES (?1, ?2, ?3)
                 ON CONFLICT(id) DO UPDATE SET
                    active = excluded.active,
                    data = excluded.data,
                    updated_at = (strftime('%s', 'now') * 1000);",
                object.obj_type.table_name()
            ),
            params![object.id.as_str(), bool_to_int(object.active), data],
        )?;
        Ok(())
    }

    fn load_object(&self, object: &ObjectRef) -> ObjectRepoResult<Option<StoredObject>> {
        self.require_table(&object.obj_type)?;

        let mut stmt = self.conn.prepare(&format!(
            "SELECT id, active, data
             FROM \"{}\"
             WHERE id = ?1;",
            object.obj_type.table_name()
        ))?;
        let mut rows = stmt.query([object.id.as_str()])?;
        if let Some(row) = rows.next()? {
            let loaded = decode_object(
                &object.obj_type,
                row.get("id")?,
                row.get("active")?,
                row.get("data")?,
            )
            .map_err(ObjectRepoError::InvalidData)?;
            return Ok(Some(loaded));
        }
        Ok(None)
    }

    fn delete_object(&self, object: &ObjectRef) -> ObjectRepoResult<()> {
        self.require_table(&object.obj_type)?;

        let changed = self.conn.execute(
            &format!(
                "DELETE FROM \"{}\" WHERE id = ?1;",
                object.obj_type.table_name()
            ),
            [object.id.as_str()],
        )?;
        if changed == 0 {
            return Err(ObjectRepoError::NotFound(object.clone()));
        }
        Ok(())
    }
}

/// Builds a `StoredObject` from raw column values.
pub(crate) fn decode_object(
    obj_type: &ObjectType,
    id: String,
    active: i64,
    data: String,
) -> Result<StoredObject, String> {
    let table = obj_type.table_name();
    let id = ObjectId::parse(&id).map_err(|_| format!("empty id in {table}.id"))?;
    let active = match active {
        0 => false,
        1 => true,
        other => return Err(format!("invalid active value `{other}` in {table}.active")),
    };
    let data = serde_json::from_str(&data)
        .map_err(|err| format!("invalid json in {table}.data: {err}"))?;

    Ok(StoredObject {
        obj_type: obj_type.clone(),
        id,
        active,
        data,
    })
}

pub(crate) fn bool_to_int(value: bool) -> i64 {
    if value {
        1
    } else {
        0
    }
}
