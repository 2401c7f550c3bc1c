//! Pivot repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Persist and query `pivots` join rows.
//! - Materialize joined target/source objects ordered by pivot position.
//!
//! # Invariants
//! - Listing is deterministic: `position ASC`, then insertion order.
//! - Reads on a database without the join table return empty results.
//! - Writes provision the join table before touching it.
//! - `replace_pivots` deletes and reinserts inside one transaction.

use crate::db::migrations::{apply_migrations, pivot_table_exists, PIVOT_TABLE};
use crate::db::{table_exists, DbError};
use crate::model::object::{ObjectId, ObjectRef, ObjectType, StoredObject};
use crate::model::pivot::{Pivot, PivotId, PivotValidationError};
use crate::repo::object_repo::{bool_to_int, decode_object};
use rusqlite::{params, Connection, Row, Transaction, TransactionBehavior};
use serde::Serialize;
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

const PIVOT_SELECT_SQL: &str = "SELECT
    id,
    source_object_type,
    source_object_id,
    target_object_type,
    target_object_id,
    position,
    active
FROM pivots";

pub type PivotRepoResult<T> = Result<T, PivotRepoError>;

/// Errors from pivot repository operations.
#[derive(Debug)]
pub enum PivotRepoError {
    /// Pivot row failed validation before persistence.
    Validation(PivotValidationError),
    /// Underlying SQLite/bootstrap error.
    Db(DbError),
    /// Pivot row does not exist.
    NotFound(PivotId),
    /// Join table has not been provisioned yet.
    MissingTable,
    /// Persisted data cannot be converted to valid read model.
    InvalidData(String),
}

impl Display for PivotRepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound(id) => write!(f, "pivot not found: {id}"),
            Self::MissingTable => write!(f, "pivot table `{PIVOT_TABLE}` does not exist"),
            Self::InvalidData(message) => write!(f, "invalid persisted pivot data: {message}"),
        }
    }
}

impl Error for PivotRepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Db(err) => Some(err),
            Self::NotFound(_) => None,
            Self::MissingTable => None,
            Self::InvalidData(_) => None,
        }
    }
}

impl From<PivotValidationError> for PivotRepoError {
    fn from(value: PivotValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<DbError> for PivotRepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for PivotRepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Joined read model: one object reached through one pivot row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PivotedObject {
    pub pivot_id: PivotId,
    pub position: i64,
    pub object: StoredObject,
}

/// Repository interface for pivot rows.
pub trait PivotRepository {
    /// Returns whether the join table exists.
    fn table_exists(&self) -> PivotRepoResult<bool>;
    /// Provisions the join table if absent.
    fn ensure_table(&self) -> PivotRepoResult<()>;
    /// Loads one pivot by id. `None` when absent or when the table is missing.
    fn get_pivot(&self, id: PivotId) -> PivotRepoResult<Option<Pivot>>;
    /// Lists pivot rows of one source for one target type, ordered by position.
    fn list_pivots(
        &self,
        source: &ObjectRef,
        target_type: &ObjectType,
    ) -> PivotRepoResult<Vec<Pivot>>;
    /// Counts pivot rows of one source for one target type.
    fn count_pivots(&self, source: &ObjectRef, target_type: &ObjectType) -> PivotRepoResult<usize>;
    /// Inserts one validated pivot row.
    fn insert_pivot(&self, pivot: &Pivot) -> PivotRepoResult<()>;
    /// Deletes every pivot of (source, target type) and inserts `pivots`.
    fn replace_pivots(
        &self,
        source: &ObjectRef,
        target_type: &ObjectType,
        pivots: &[Pivot],
    ) -> PivotRepoResult<()>;
    /// Inserts one pivot per target, starting at `count(existing)`.
    fn append_pivots(
        &self,
        source: &ObjectRef,
        target_type: &ObjectType,
        target_ids: &[ObjectId],
    ) -> PivotRepoResult<Vec<Pivot>>;
    /// Deletes one pivot by id.
    fn delete_pivot(&self, id: PivotId) -> PivotRepoResult<()>;
    /// Deletes every pivot matching the full (source, target) tuple.
    fn delete_matching(&self, source: &ObjectRef, target: &ObjectRef) -> PivotRepoResult<usize>;
    /// Deletes every pivot whose source is `source`, across target types.
    fn delete_for_source(&self, source: &ObjectRef) -> PivotRepoResult<usize>;
    /// Deletes every pivot whose target is `target`, across source types.
    fn delete_for_target(&self, target: &ObjectRef) -> PivotRepoResult<usize>;
    /// Lists active target objects attached to `source`, ordered by position.
    fn list_targets(
        &self,
        source: &ObjectRef,
        target_type: &ObjectType,
    ) -> PivotRepoResult<Vec<PivotedObject>>;
    /// Lists active source objects referencing `target`, ordered by position.
    fn list_sources(
        &self,
        target: &ObjectRef,
        source_type: &ObjectType,
    ) -> PivotRepoResult<Vec<PivotedObject>>;
}

/// SQLite-backed pivot repository.
pub struct SqlitePivotRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqlitePivotRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl PivotRepository for SqlitePivotRepository<'_> {
    fn table_exists(&self) -> PivotRepoResult<bool> {
        Ok(pivot_table_exists(self.conn)?)
    }

    fn ensure_table(&self) -> PivotRepoResult<()> {
        apply_migrations(self.conn)?;
        Ok(())
    }

    fn get_pivot(&self, id: PivotId) -> PivotRepoResult<Option<Pivot>> {
        if !self.table_exists()? {
            return Ok(None);
        }

        let mut stmt = self
            .conn
            .prepare(&format!("{PIVOT_SELECT_SQL} WHERE id = ?1;"))?;
        let mut rows = stmt.query([id.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_pivot_row(row)?));
        }
        Ok(None)
    }

    fn list_pivots(
        &self,
        source: &ObjectRef,
        target_type: &ObjectType,
    ) -> PivotRepoResult<Vec<Pivot>> {
        if !self.table_exists()? {
            return Ok(Vec::new());
        }
        list_pivots_on(self.conn, source, target_type)
    }

    fn count_pivots(&self, source: &ObjectRef, target_type: &ObjectType) -> PivotRepoResult<usize> {
        if !self.table_exists()? {
            return Ok(0);
        }
        count_pivots_on(self.conn, source, target_type)
    }

    fn insert_pivot(&self, pivot: &Pivot) -> PivotRepoResult<()> {
        pivot.validate()?;
        self.ensure_table()?;
        insert_pivot_on(self.conn, pivot)
    }

    fn replace_pivots(
        &self,
        source: &ObjectRef,
        target_type: &ObjectType,
        pivots: &[Pivot],
    ) -> PivotRepoResult<()> {
        for pivot in pivots {
            pivot.validate()?;
            if pivot.source() != *source || pivot.target_object_type != *target_type {
                return Err(PivotRepoError::InvalidData(format!(
                    "pivot {} does not belong to {source} / {target_type}",
                    pivot.id
                )));
            }
        }
        self.ensure_table()?;

        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        tx.execute(
            "DELETE FROM pivots
             WHERE source_object_type = ?1
               AND source_object_id = ?2
               AND target_object_type = ?3;",
            params![source.obj_type.as_str(), source.id.as_str(), target_type.as_str()],
        )?;
        for pivot in pivots {
            insert_pivot_on(&tx, pivot)?;
        }
        tx.commit()?;
        Ok(())
    }

    fn append_pivots(
        &self,
        source: &ObjectRef,
        target_type: &ObjectType,
        target_ids: &[ObjectId],
    ) -> PivotRepoResult<Vec<Pivot>> {
        self.ensure_table()?;

        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let next_position = count_pivots_on(&tx, source, target_type)? as i64;
        let mut created = Vec::with_capacity(target_ids.len());
        for (offset, target_id) in target_ids.iter().enumerate() {
            let target = ObjectRef::new(target_type.clone(), target_id.clone());
            let pivot = Pivot::new(source, &target, next_position + offset as i64);
            pivot.validate()?;
            insert_pivot_on(&tx, &pivot)?;
            created.push(pivot);
        }
        tx.commit()?;
        Ok(created)
    }

    fn delete_pivot(&self, id: PivotId) -> PivotRepoResult<()> {
        if !self.table_exists()? {
            return Err(PivotRepoError::MissingTable);
        }

        let changed = self
            .conn
            .execute("DELETE FROM pivots WHERE id = ?1;", [id.to_string()])?;
        if changed == 0 {
            return Err(PivotRepoError::NotFound(id));
        }
        Ok(())
    }

    fn delete_matching(&self, source: &ObjectRef, target: &ObjectRef) -> PivotRepoResult<usize> {
        if !self.table_exists()? {
            return Err(PivotRepoError::MissingTable);
        }

        let changed = self.conn.execute(
            "DELETE FROM pivots
             WHERE source_object_type = ?1
               AND source_object_id = ?2
               AND target_object_type = ?3
               AND target_object_id = ?4;",
            params![
                source.obj_type.as_str(),
                source.id.as_str(),
                target.obj_type.as_str(),
                target.id.as_str(),
            ],
        )?;
        Ok(changed)
    }

    fn delete_for_source(&self, source: &ObjectRef) -> PivotRepoResult<usize> {
        if !self.table_exists()? {
            return Ok(0);
        }

        let changed = self.conn.execute(
            "DELETE FROM pivots
             WHERE source_object_type = ?1
               AND source_object_id = ?2;",
            params![source.obj_type.as_str(), source.id.as_str()],
        )?;
        Ok(changed)
    }

    fn delete_for_target(&self, target: &ObjectRef) -> PivotRepoResult<usize> {
        if !self.table_exists()? {
            return Ok(0);
        }

        let changed = self.conn.execute(
            "DELETE FROM pivots
             WHERE target_object_type = ?1
               AND target_object_id = ?2;",
            params![target.obj_type.as_str(), target.id.as_str()],
        )?;
        Ok(changed)
    }

    fn list_targets(
        &self,
        source: &ObjectRef,
        target_type: &ObjectType,
    ) -> PivotRepoResult<Vec<PivotedObject>> {
        let target_table = target_type.table_name();
        if !self.table_exists()? || !table_exists(self.conn, &target_table)? {
            return Ok(Vec::new());
        }

        let mut stmt = self.conn.prepare(&format!(
            "SELECT
                obj.id AS id,
                obj.active AS active,
                obj.data AS data,
                p.id AS pivot_id,
                p.position AS position
             FROM \"{target_table}\" obj
             INNER JOIN pivots p ON p.target_object_id = obj.id
             WHERE obj.active = 1
               AND p.source_object_type = ?1
               AND p.source_object_id = ?2
               AND p.target_object_type = ?3
             ORDER BY p.position ASC, p.rowid ASC;"
        ))?;
        let mut rows = stmt.query(params![
            source.obj_type.as_str(),
            source.id.as_str(),
            target_type.as_str(),
        ])?;

        let mut items = Vec::new();
        while let Some(row) = rows.next()? {
            items.push(parse_pivoted_row(row, target_type)?);
        }
        Ok(items)
    }

    fn list_sources(
        &self,
        target: &ObjectRef,
        source_type: &ObjectType,
    ) -> PivotRepoResult<Vec<PivotedObject>> {
        let source_table = source_type.table_name();
        if !self.table_exists()? || !table_exists(self.conn, &source_table)? {
            return Ok(Vec::new());
        }

        let mut stmt = self.conn.prepare(&format!(
            "SELECT
                obj.id AS id,
                obj.active AS active,
                obj.data AS data,
                p.id AS pivot_id,
                p.position AS position
             FROM \"{source_table}\" obj
             INNER JOIN pivots p ON p.source_object_id = obj.id
             WHERE obj.active = 1
               AND p.target_object_type = ?1
               AND p.target_object_id = ?2
               AND p.source_object_type = ?3
             ORDER BY p.position ASC, p.rowid ASC;"
        ))?;
        let mut rows = stmt.query(params![
            target.obj_type.as_str(),
            target.id.as_str(),
            source_type.as_str(),
        ])?;

        let mut items = Vec::new();
        while let Some(row) = rows.next()? {
            items.push(parse_pivoted_row(row, source_type)?);
        }
        Ok(items)
    }
}

fn list_pivots_on(
    conn: &Connection,
    source: &ObjectRef,
    target_type: &ObjectType,
) -> PivotRepoResult<Vec<Pivot>> {
    let mut stmt = conn.prepare(&format!(
        "{PIVOT_SELECT_SQL}
         WHERE source_object_type = ?1
           AND source_object_id = ?2
           AND target_object_type = ?3
         ORDER BY position ASC, rowid ASC;"
    ))?;
    let mut rows = stmt.query(params![
        source.obj_type.as_str(),
        source.id.as_str(),
        target_type.as_str(),
    ])?;

    let mut pivots = Vec::new();
    while let Some(row) = rows.next()? {
        pivots.push(parse_pivot_row(row)?);
    }
    Ok(pivots)
}

fn count_pivots_on(
    conn: &Connection,
    source: &ObjectRef,
    target_type: &ObjectType,
) -> PivotRepoResult<usize> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*)
         FROM pivots
         WHERE source_object_type = ?1
           AND source_object_id = ?2
           AND target_object_type = ?3;",
        params![source.obj_type.as_str(), source.id.as_str(), target_type.as_str()],
        |row| row.get(0),
    )?;
    Ok(count.max(0) as usize)
}

fn insert_pivot_on(conn: &Connection, pivot: &Pivot) -> PivotRepoResult<()> {
    conn.execute(
        "INSERT INTO pivots (
            id,
            source_object_type,
            source_object_id,
            target_object_type,
            target_object_id,
            position,
            active
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7);",
        params![
            pivot.id.to_string(),
            pivot.source_object_type.as_str(),
            pivot.source_object_id.as_str(),
            pivot.target_object_type.as_str(),
            pivot.target_object_id.as_str(),
            pivot.position,
            bool_to_int(pivot.active),
        ],
    )?;
    Ok(())
}

fn parse_pivot_row(row: &Row<'_>) -> PivotRepoResult<Pivot> {
    let id_text: String = row.get("id")?;
    let id = parse_uuid(&id_text, "pivots.id")?;

    let active = match row.get::<_, i64>("active")? {
        0 => false,
        1 => true,
        other => {
            return Err(PivotRepoError::InvalidData(format!(
                "invalid active value `{other}` in pivots.active"
            )));
        }
    };

    let pivot = Pivot {
        id,
        source_object_type: parse_type(row.get("source_object_type")?, "pivots.source_object_type")?,
        source_object_id: parse_id(row.get("source_object_id")?, "pivots.source_object_id")?,
        target_object_type: parse_type(row.get("target_object_type")?, "pivots.target_object_type")?,
        target_object_id: parse_id(row.get("target_object_id")?, "pivots.target_object_id")?,
        position: row.get("position")?,
        active,
    };
    pivot.validate()?;
    Ok(pivot)
}

fn parse_pivoted_row(row: &Row<'_>, obj_type: &ObjectType) -> PivotRepoResult<PivotedObject> {
    let pivot_id_text: String = row.get("pivot_id")?;
    let object = decode_object(obj_type, row.get("id")?, row.get("active")?, row.get("data")?)
        .map_err(PivotRepoError::InvalidData)?;
    Ok(PivotedObject {
        pivot_id: parse_uuid(&pivot_id_text, "pivots.id")?,
        position: row.get("position")?,
        object,
    })
}

fn parse_uuid(value: &str, column: &'static str) -> PivotRepoResult<Uuid> {
    Uuid::parse_str(value)
        .map_err(|_| PivotRepoError::InvalidData(format!("invalid uuid `{value}` in {column}")))
}

fn parse_type(value: String, column: &'static str) -> PivotRepoResult<ObjectType> {
    ObjectType::parse(&value)
        .map_err(|_| PivotRepoError::InvalidData(format!("invalid type `{value}` in {column}")))
}

fn parse_id(value: String, column: &'static str) -> PivotRepoResult<ObjectId> {
    ObjectId::parse(&value)
        .map_err(|_| PivotRepoError::InvalidData(format!("empty id in {column}")))
}

#[cfg(test)]
mod tests {
    use super::{PivotRepoError, PivotRepository, SqlitePivotRepository};
    use crate::db::open_db_in_memory;
    use crate::model::object::{ObjectRef, ObjectType};
    use crate::model::pivot::Pivot;

    fn source() -> ObjectRef {
        ObjectRef::parse("article", "42").unwrap()
    }

    fn image(id: &str) -> ObjectRef {
        ObjectRef::parse("image", id).unwrap()
    }

    #[test]
    fn insert_provisions_table_and_lists_by_position_then_insertion() {
        let conn = open_db_in_memory().unwrap();
        let repo = SqlitePivotRepository::new(&conn);
        assert!(!repo.table_exists().unwrap());

        let first = Pivot::new(&source(), &image("1"), 1);
        let second = Pivot::new(&source(), &image("2"), 0);
        let third = Pivot::new(&source(), &image("3"), 1);
        for pivot in [&first, &second, &third] {
            repo.insert_pivot(pivot).unwrap();
        }

        let listed = repo
            .list_pivots(&source(), &ObjectType::parse("image").unwrap())
            .unwrap();
        let ids = listed.iter().map(|pivot| pivot.id).collect::<Vec<_>>();
        assert_eq!(ids, vec![second.id, first.id, third.id]);
        assert_eq!(repo.get_pivot(first.id).unwrap(), Some(first));
    }

    #[test]
    fn replace_rejects_pivots_of_another_source() {
        let conn = open_db_in_memory().unwrap();
        let repo = SqlitePivotRepository::new(&conn);
        let foreign = Pivot::new(&ObjectRef::parse("article", "7").unwrap(), &image("1"), 0);

        let err = repo
            .replace_pivots(&source(), &ObjectType::parse("image").unwrap(), &[foreign])
            .unwrap_err();
        assert!(matches!(err, PivotRepoError::InvalidData(_)));
        assert!(!repo.table_exists().unwrap());
    }

    #[test]
    fn deletes_report_missing_table_and_unknown_rows() {
        let conn = open_db_in_memory().unwrap();
        let repo = SqlitePivotRepository::new(&conn);
        let pivot = Pivot::new(&source(), &image("1"), 0);

        assert!(matches!(
            repo.delete_pivot(pivot.id),
            Err(PivotRepoError::MissingTable)
        ));
        assert_eq!(repo.delete_for_source(&source()).unwrap(), 0);

        repo.ensure_table().unwrap();
        assert!(matches!(
            repo.delete_pivot(pivot.id),
            Err(PivotRepoError::NotFound(id)) if id == pivot.id
        ));
    }

    #[test]
    fn negative_position_is_rejected_before_sql() {
        let conn = open_db_in_memory().unwrap();
        let repo = SqlitePivotRepository::new(&conn);
        let mut pivot = Pivot::new(&source(), &image("1"), 0);
        pivot.position = -2;

        assert!(matches!(
            repo.insert_pivot(&pivot),
            Err(PivotRepoError::Validation(_))
        ));
        assert!(!repo.table_exists().unwrap());
    }
}
