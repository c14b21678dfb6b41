//! Tag repository and note-tag association.
//!
//! # Invariants
//! - `(user_id, name)` is unique; duplicates surface as `RepoError::Conflict`.
//! - Assign/unassign validate that both the note and the tag belong to the
//!   caller before touching `note_tags`, inside one transaction.
//! - Assign is insert-if-absent; unassign of a missing pair is a no-op.

use crate::model::tag::{Tag, TagWithCount};
use crate::model::{NoteId, TagId, UserId};
use crate::repo::{
    ensure_tables, is_unique_violation, owned_row_exists, parse_uuid, RepoError, RepoResult,
};
use rusqlite::{params, Connection, Row};

/// Repository interface for tags and their note associations.
pub trait TagRepository {
    fn create_tag(&self, tag: &Tag) -> RepoResult<()>;
    fn get_tag(&self, owner: UserId, id: TagId) -> RepoResult<Option<Tag>>;
    /// Owned tags sorted by name, each with its association count.
    fn list_tags(&self, owner: UserId) -> RepoResult<Vec<TagWithCount>>;
    fn delete_tag(&self, owner: UserId, id: TagId) -> RepoResult<()>;
    fn assign(&self, owner: UserId, note_id: NoteId, tag_id: TagId) -> RepoResult<()>;
    fn unassign(&self, owner: UserId, note_id: NoteId, tag_id: TagId) -> RepoResult<()>;
}

/// SQLite-backed tag repository.
pub struct SqliteTagRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteTagRepository<'conn> {
    /// Constructs a repository from a migrated/ready connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_tables(conn, &["notes", "tags", "note_tags"])?;
        Ok(Self { conn })
    }

    fn ensure_pair_owned(
        conn: &Connection,
        owner: UserId,
        note_id: NoteId,
        tag_id: TagId,
    ) -> RepoResult<()> {
        if !owned_row_exists(conn, "notes", owner, note_id)? {
            return Err(RepoError::note_not_found(note_id));
        }
        if !owned_row_exists(conn, "tags", owner, tag_id)? {
            return Err(RepoError::tag_not_found(tag_id));
        }
        Ok(())
    }
}

impl TagRepository for SqliteTagRepository<'_> {
    fn create_tag(&self, tag: &Tag) -> RepoResult<()> {
        let inserted = self.conn.execute(
            "INSERT INTO tags (id, user_id, name) VALUES (?1, ?2, ?3);",
            params![tag.id.to_string(), tag.user_id.to_string(), tag.name.as_str()],
        );

        match inserted {
            Ok(_) => Ok(()),
            Err(err) if is_unique_violation(&err) => {
                Err(RepoError::Conflict("Tag already exists".to_string()))
            }
            Err(err) => Err(err.into()),
        }
    }

    fn get_tag(&self, owner: UserId, id: TagId) -> RepoResult<Option<Tag>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, user_id, name
             FROM tags
             WHERE id = ?1
               AND user_id = ?2;",
        )?;

        let mut rows = stmt.query([id.to_string(), owner.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_tag_row(row)?));
        }

        Ok(None)
    }

    fn list_tags(&self, owner: UserId) -> RepoResult<Vec<TagWithCount>> {
        let mut stmt = self.conn.prepare(
            "SELECT
                t.id AS id,
                t.user_id AS user_id,
                t.name AS name,
                COUNT(nt.note_id) AS note_count
             FROM tags t
             LEFT JOIN note_tags nt ON nt.tag_id = t.id
             WHERE t.user_id = ?1
             GROUP BY t.id, t.user_id, t.name
             ORDER BY t.name COLLATE NOCASE ASC, t.name ASC, t.id ASC;",
        )?;

        let mut rows = stmt.query([owner.to_string()])?;
        let mut tags = Vec::new();
        while let Some(row) = rows.next()? {
            let count: i64 = row.get("note_count")?;
            let note_count = u32::try_from(count).map_err(|_| {
                RepoError::InvalidData(format!("invalid note count `{count}` for tag"))
            })?;
            tags.push(TagWithCount {
                tag: parse_tag_row(row)?,
                note_count,
            });
        }

        Ok(tags)
    }

    fn delete_tag(&self, owner: UserId, id: TagId) -> RepoResult<()> {
        let changed = self.conn.execute(
            "DELETE FROM tags WHERE id = ?1 AND user_id = ?2;",
            [id.to_string(), owner.to_string()],
        )?;

        if changed == 0 {
            return Err(RepoError::tag_not_found(id));
        }

        Ok(())
    }

    fn assign(&self, owner: UserId, note_id: NoteId, tag_id: TagId) -> RepoResult<()> {
        let tx = self.conn.unchecked_transaction()?;
        Self::ensure_pair_owned(&tx, owner, note_id, tag_id)?;
        tx.execute(
            "INSERT OR IGNORE INTO note_tags (note_id, tag_id) VALUES (?1, ?2);",
            [note_id.to_string(), tag_id.to_string()],
        )?;
        tx.commit()?;
        Ok(())
    }

    fn unassign(&self, owner: UserId, note_id: NoteId, tag_id: TagId) -> RepoResult<()> {
        let tx = self.conn.unchecked_transaction()?;
        Self::ensure_pair_owned(&tx, owner, note_id, tag_id)?;
        tx.execute(
            "DELETE FROM note_tags WHERE note_id = ?1 AND tag_id = ?2;",
            [note_id.to_string(), tag_id.to_string()],
        )?;
        tx.commit()?;
        Ok(())
    }
}

fn parse_tag_row(row: &Row<'_>) -> RepoResult<Tag> {
    let id: String = row.get("id")?;
    let user_id: String = row.get("user_id")?;
    Ok(Tag {
        id: parse_uuid(&id, "tags.id")?,
        user_id: parse_uuid(&user_id, "tags.user_id")?,
        name: row.get("name")?,
    })
}
