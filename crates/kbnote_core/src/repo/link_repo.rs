//! Directed note link graph.
//!
//! # Invariants
//! - An edge only exists between two notes of the same owner.
//! - `(from_note_id, to_note_id)` is unique; linking twice is a no-op.
//! - Edges disappear with either endpoint through `ON DELETE CASCADE`.

use crate::model::note::{Backlinks, LinkedNote};
use crate::model::{NoteId, UserId};
use crate::repo::{ensure_tables, owned_row_exists, parse_uuid, RepoError, RepoResult};
use rusqlite::Connection;

/// Repository interface for note-to-note edges.
pub trait LinkRepository {
    fn link(&self, owner: UserId, from: NoteId, to: NoteId) -> RepoResult<()>;
    fn unlink(&self, owner: UserId, from: NoteId, to: NoteId) -> RepoResult<()>;
    fn backlinks(&self, owner: UserId, note_id: NoteId) -> RepoResult<Backlinks>;
    /// True when `note_id` exists and belongs to `owner`.
    fn note_owned(&self, owner: UserId, note_id: NoteId) -> RepoResult<bool>;
}

/// SQLite-backed link repository.
pub struct SqliteLinkRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteLinkRepository<'conn> {
    /// Constructs a repository from a migrated/ready connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_tables(conn, &["notes", "note_links"])?;
        Ok(Self { conn })
    }

    fn ensure_endpoints_owned(
        conn: &Connection,
        owner: UserId,
        from: NoteId,
        to: NoteId,
    ) -> RepoResult<()> {
        for id in [from, to] {
            if !owned_row_exists(conn, "notes", owner, id)? {
                return Err(RepoError::note_not_found(id));
            }
        }
        Ok(())
    }

    fn linked_notes(
        &self,
        sql: &str,
        owner: UserId,
        note_id: NoteId,
    ) -> RepoResult<Vec<LinkedNote>> {
        let mut stmt = self.conn.prepare(sql)?;
        let mut rows = stmt.query([note_id.to_string(), owner.to_string()])?;
        let mut linked = Vec::new();
        while let Some(row) = rows.next()? {
            let id: String = row.get("id")?;
            linked.push(LinkedNote {
                id: parse_uuid(&id, "notes.id")?,
                title: row.get("title")?,
            });
        }
        Ok(linked)
    }
}

impl LinkRepository for SqliteLinkRepository<'_> {
    fn link(&self, owner: UserId, from: NoteId, to: NoteId) -> RepoResult<()> {
        let tx = self.conn.unchecked_transaction()?;
        Self::ensure_endpoints_owned(&tx, owner, from, to)?;
        tx.execute(
            "INSERT OR IGNORE INTO note_links (from_note_id, to_note_id) VALUES (?1, ?2);",
            [from.to_string(), to.to_string()],
        )?;
        tx.commit()?;
        Ok(())
    }

    fn unlink(&self, owner: UserId, from: NoteId, to: NoteId) -> RepoResult<()> {
        let tx = self.conn.unchecked_transaction()?;
        Self::ensure_endpoints_owned(&tx, owner, from, to)?;
        tx.execute(
            "DELETE FROM note_links WHERE from_note_id = ?1 AND to_note_id = ?2;",
            [from.to_string(), to.to_string()],
        )?;
        tx.commit()?;
        Ok(())
    }

    fn note_owned(&self, owner: UserId, note_id: NoteId) -> RepoResult<bool> {
        owned_row_exists(self.conn, "notes", owner, note_id)
    }

    fn backlinks(&self, owner: UserId, note_id: NoteId) -> RepoResult<Backlinks> {
        if !self.note_owned(owner, note_id)? {
            return Err(RepoError::note_not_found(note_id));
        }

        let outgoing = self.linked_notes(
            "SELECT n.id AS id, n.title AS title
             FROM note_links l
             INNER JOIN notes n ON n.id = l.to_note_id
             WHERE l.from_note_id = ?1
               AND n.user_id = ?2
             ORDER BY n.title COLLATE NOCASE ASC, n.id ASC;",
            owner,
            note_id,
        )?;
        let incoming = self.linked_notes(
            "SELECT n.id AS id, n.title AS title
             FROM note_links l
             INNER JOIN notes n ON n.id = l.from_note_id
             WHERE l.to_note_id = ?1
               AND n.user_id = ?2
             ORDER BY n.title COLLATE NOCASE ASC, n.id ASC;",
            owner,
            note_id,
        )?;

        Ok(Backlinks { outgoing, incoming })
    }
}
