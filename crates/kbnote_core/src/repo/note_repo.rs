//! Note repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Owner-scoped CRUD over the `notes` table.
//! - Load the tag projection for one or many notes.
//!
//! # Invariants
//! - Every statement filters by `user_id`; a foreign id behaves as missing.
//! - Lists are sorted by `updated_at DESC, id ASC`.
//! - Deleting a note relies on `ON DELETE CASCADE` to drop its tag
//!   associations and both directions of its links.

use crate::model::note::{Note, NotePatch};
use crate::model::tag::Tag;
use crate::model::{NoteId, UserId};
use crate::repo::{bool_to_int, ensure_tables, parse_bool, parse_uuid, RepoError, RepoResult};
use crate::search::filter::{search_notes, NoteSearchQuery};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Row};
use std::collections::HashMap;

/// Column list shared by every note read path, including search.
pub(crate) const NOTE_COLUMNS: &str =
    "notes.id, notes.user_id, notes.title, notes.content, notes.is_archived, notes.created_at, notes.updated_at";

/// Notes per tag-projection query; keeps bound variables far below
/// SQLite's per-statement limit.
const TAG_LOOKUP_CHUNK_SIZE: usize = 500;

/// Repository interface for notes.
pub trait NoteRepository {
    /// Persists a freshly built note.
    fn create_note(&self, note: &Note) -> RepoResult<()>;
    /// Gets one note owned by `owner`.
    fn get_note(&self, owner: UserId, id: NoteId) -> RepoResult<Option<Note>>;
    /// Lists owned notes, newest update first.
    fn list_notes(&self, owner: UserId, include_archived: bool) -> RepoResult<Vec<Note>>;
    /// Applies a partial update and stamps `updated_at`.
    fn update_note(&self, owner: UserId, id: NoteId, patch: &NotePatch, now: i64)
        -> RepoResult<()>;
    /// Sets the archive flag; repeated calls with the same value succeed.
    fn set_archived(&self, owner: UserId, id: NoteId, archived: bool) -> RepoResult<()>;
    /// Hard-deletes one note and, through cascades, its tags and links.
    fn delete_note(&self, owner: UserId, id: NoteId) -> RepoResult<()>;
    /// Tags attached to each of `ids`, ordered by name.
    fn tags_for_notes(&self, ids: &[NoteId]) -> RepoResult<HashMap<NoteId, Vec<Tag>>>;
    /// Substring + tag filter search, see [`crate::search`].
    fn search_notes(&self, owner: UserId, query: &NoteSearchQuery) -> RepoResult<Vec<Note>>;
}

/// SQLite-backed note repository.
pub struct SqliteNoteRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteNoteRepository<'conn> {
    /// Constructs a repository from a migrated/ready connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_tables(conn, &["notes", "tags", "note_tags"])?;
        Ok(Self { conn })
    }
}

impl NoteRepository for SqliteNoteRepository<'_> {
    fn create_note(&self, note: &Note) -> RepoResult<()> {
        self.conn.execute(
            "INSERT INTO notes (
                id,
                user_id,
                title,
                content,
                is_archived,
                created_at,
                updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7);",
            params![
                note.id.to_string(),
                note.user_id.to_string(),
                note.title.as_str(),
                note.content.as_str(),
                bool_to_int(note.is_archived),
                note.created_at,
                note.updated_at,
            ],
        )?;
        Ok(())
    }

    fn get_note(&self, owner: UserId, id: NoteId) -> RepoResult<Option<Note>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {NOTE_COLUMNS}
             FROM notes
             WHERE notes.id = ?1
               AND notes.user_id = ?2;"
        ))?;

        let mut rows = stmt.query([id.to_string(), owner.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_note_row(row)?));
        }

        Ok(None)
    }

    fn list_notes(&self, owner: UserId, include_archived: bool) -> RepoResult<Vec<Note>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {NOTE_COLUMNS}
             FROM notes
             WHERE notes.user_id = ?1
               AND (?2 = 1 OR notes.is_archived = 0)
             ORDER BY notes.updated_at DESC, notes.id ASC;"
        ))?;

        let mut rows = stmt.query(params![owner.to_string(), bool_to_int(include_archived)])?;
        let mut notes = Vec::new();
        while let Some(row) = rows.next()? {
            notes.push(parse_note_row(row)?);
        }

        Ok(notes)
    }

    fn update_note(
        &self,
        owner: UserId,
        id: NoteId,
        patch: &NotePatch,
        now: i64,
    ) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE notes
             SET
                title = COALESCE(?3, title),
                content = COALESCE(?4, content),
                updated_at = ?5
             WHERE id = ?1
               AND user_id = ?2;",
            params![
                id.to_string(),
                owner.to_string(),
                patch.title.as_deref(),
                patch.content.as_deref(),
                now,
            ],
        )?;

        if changed == 0 {
            return Err(RepoError::note_not_found(id));
        }

        Ok(())
    }

    fn set_archived(&self, owner: UserId, id: NoteId, archived: bool) -> RepoResult<()> {
        // SQLite counts matched rows, so re-archiving still reports one change.
        let changed = self.conn.execute(
            "UPDATE notes
             SET is_archived = ?3
             WHERE id = ?1
               AND user_id = ?2;",
            params![id.to_string(), owner.to_string(), bool_to_int(archived)],
        )?;

        if changed == 0 {
            return Err(RepoError::note_not_found(id));
        }

        Ok(())
    }

    fn delete_note(&self, owner: UserId, id: NoteId) -> RepoResult<()> {
        let changed = self.conn.execute(
            "DELETE FROM notes WHERE id = ?1 AND user_id = ?2;",
            [id.to_string(), owner.to_string()],
        )?;

        if changed == 0 {
            return Err(RepoError::note_not_found(id));
        }

        Ok(())
    }

    fn tags_for_notes(&self, ids: &[NoteId]) -> RepoResult<HashMap<NoteId, Vec<Tag>>> {
        let mut by_note: HashMap<NoteId, Vec<Tag>> = HashMap::new();
        if ids.is_empty() {
            return Ok(by_note);
        }

        // Each note of a chunk lands wholly in that chunk, so per-note tag
        // order from `ORDER BY` survives the split.
        for chunk in ids.chunks(TAG_LOOKUP_CHUNK_SIZE) {
            let placeholders = vec!["?"; chunk.len()].join(", ");
            let sql = format!(
                "SELECT nt.note_id, t.id, t.user_id, t.name
                 FROM note_tags nt
                 INNER JOIN tags t ON t.id = nt.tag_id
                 WHERE nt.note_id IN ({placeholders})
                 ORDER BY t.name COLLATE NOCASE ASC, t.name ASC, t.id ASC;"
            );
            let bind_values = chunk
                .iter()
                .map(|id| Value::Text(id.to_string()))
                .collect::<Vec<_>>();

            let mut stmt = self.conn.prepare_cached(&sql)?;
            let mut rows = stmt.query(params_from_iter(bind_values))?;
            while let Some(row) = rows.next()? {
                let note_id: String = row.get(0)?;
                let note_id = parse_uuid(&note_id, "note_tags.note_id")?;
                let tag_id: String = row.get(1)?;
                let user_id: String = row.get(2)?;
                by_note.entry(note_id).or_default().push(Tag {
                    id: parse_uuid(&tag_id, "tags.id")?,
                    user_id: parse_uuid(&user_id, "tags.user_id")?,
                    name: row.get(3)?,
                });
            }
        }

        Ok(by_note)
    }

    fn search_notes(&self, owner: UserId, query: &NoteSearchQuery) -> RepoResult<Vec<Note>> {
        search_notes(self.conn, owner, query)
    }
}

pub(crate) fn parse_note_row(row: &Row<'_>) -> RepoResult<Note> {
    let id: String = row.get("id")?;
    let user_id: String = row.get("user_id")?;
    Ok(Note {
        id: parse_uuid(&id, "notes.id")?,
        user_id: parse_uuid(&user_id, "notes.user_id")?,
        title: row.get("title")?,
        content: row.get("content")?,
        is_archived: parse_bool(row.get("is_archived")?, "notes.is_archived")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}
