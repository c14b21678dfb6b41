//! Repository layer abstractions and SQLite implementations.
//!
//! # Responsibility
//! - Define use-case oriented data access contracts per aggregate.
//! - Keep SQL details out of service orchestration.
//!
//! # Invariants
//! - Every note/tag/link query is constrained by the owning `user_id`.
//! - Rows that exist but belong to another owner are reported exactly like
//!   missing rows (`RepoError::NotFound`).
//! - Multi-row check-then-write sequences run inside one transaction.

use crate::db::DbError;
use rusqlite::{Connection, ErrorCode};
use thiserror::Error;
use uuid::Uuid;

pub mod link_repo;
pub mod note_repo;
pub mod tag_repo;
pub mod user_repo;

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error for persistence and query operations.
#[derive(Debug, Error)]
pub enum RepoError {
    #[error(transparent)]
    Db(#[from] DbError),
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: Uuid },
    #[error("{0}")]
    Conflict(String),
    #[error("invalid persisted data: {0}")]
    InvalidData(String),
    #[error("required table `{0}` is missing")]
    MissingRequiredTable(&'static str),
}

impl RepoError {
    pub(crate) fn note_not_found(id: Uuid) -> Self {
        Self::NotFound { entity: "note", id }
    }

    pub(crate) fn tag_not_found(id: Uuid) -> Self {
        Self::NotFound { entity: "tag", id }
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

pub(crate) fn parse_uuid(value: &str, column: &str) -> RepoResult<Uuid> {
    Uuid::parse_str(value)
        .map_err(|_| RepoError::InvalidData(format!("invalid uuid value `{value}` in {column}")))
}

pub(crate) fn parse_bool(value: i64, column: &str) -> RepoResult<bool> {
    match value {
        0 => Ok(false),
        1 => Ok(true),
        other => Err(RepoError::InvalidData(format!(
            "invalid boolean value `{other}` in {column}"
        ))),
    }
}

pub(crate) fn bool_to_int(value: bool) -> i64 {
    if value {
        1
    } else {
        0
    }
}

/// True when SQLite rejected a write because of a UNIQUE/PRIMARY KEY clash.
pub(crate) fn is_unique_violation(err: &rusqlite::Error) -> bool {
    match err {
        rusqlite::Error::SqliteFailure(failure, _) => {
            failure.code == ErrorCode::ConstraintViolation
                && matches!(
                    failure.extended_code,
                    rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
                        | rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY
                )
        }
        _ => false,
    }
}

/// Verifies that migrations created the tables a repository depends on.
pub(crate) fn ensure_tables(conn: &Connection, tables: &[&'static str]) -> RepoResult<()> {
    for &table in tables {
        let exists: i64 = conn.query_row(
            "SELECT EXISTS(
                SELECT 1
                FROM sqlite_master
                WHERE type = 'table' AND name = ?1
            );",
            [table],
            |row| row.get(0),
        )?;
        if exists != 1 {
            return Err(RepoError::MissingRequiredTable(table));
        }
    }
    Ok(())
}

/// Owner-scoped existence check shared by note, tag and link repositories.
pub(crate) fn owned_row_exists(
    conn: &Connection,
    table: &'static str,
    owner: Uuid,
    id: Uuid,
) -> RepoResult<bool> {
    let exists: i64 = conn.query_row(
        &format!("SELECT EXISTS(SELECT 1 FROM {table} WHERE id = ?1 AND user_id = ?2);"),
        [id.to_string(), owner.to_string()],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

#[cfg(test)]
mod tests {
    use super::{ensure_tables, is_unique_violation, parse_bool, RepoError};
    use crate::db::open_db_in_memory;

    #[test]
    fn parse_bool_rejects_out_of_range_values() {
        assert!(!parse_bool(0, "notes.is_archived").unwrap());
        assert!(parse_bool(1, "notes.is_archived").unwrap());
        assert!(matches!(
            parse_bool(7, "notes.is_archived"),
            Err(RepoError::InvalidData(_))
        ));
    }

    #[test]
    fn ensure_tables_reports_missing_table() {
        let conn = open_db_in_memory().unwrap();
        ensure_tables(&conn, &["notes", "tags"]).unwrap();
        let err = ensure_tables(&conn, &["not_a_table"]).unwrap_err();
        assert!(matches!(err, RepoError::MissingRequiredTable("not_a_table")));
    }

    #[test]
    fn unique_violation_is_detected() {
        let conn = rusqlite::Connection::open_in_memory().unwrap();
        conn.execute_batch("CREATE TABLE t (name TEXT UNIQUE);")
            .unwrap();
        conn.execute("INSERT INTO t (name) VALUES ('a');", []).unwrap();
        let err = conn
            .execute("INSERT INTO t (name) VALUES ('a');", [])
            .unwrap_err();
        assert!(is_unique_violation(&err));
    }
}
