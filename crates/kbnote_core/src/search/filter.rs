//! Substring + tag filter over owned notes.
//!
//! # Invariants
//! - Results are always scoped to the owner, including the tag existence
//!   checks (a foreign tag id matches nothing).
//! - Text matching is a case-insensitive substring test on `title` OR
//!   `content` via `LIKE`; `%`, `_` and `\` in the query are literal.
//!   SQLite folds case for ASCII letters only.
//! - Every requested tag must be attached (AND, never OR).
//! - Ordering is recency only: `updated_at DESC, id ASC`.

use crate::model::note::Note;
use crate::model::{TagId, UserId};
use crate::repo::note_repo::{parse_note_row, NOTE_COLUMNS};
use crate::repo::RepoResult;
use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection};
use std::collections::BTreeSet;

/// Search criteria. At least one of `text` / `tag_ids` must be meaningful,
/// see [`NoteSearchQuery::has_criteria`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NoteSearchQuery {
    /// Raw user text; surrounding whitespace is ignored.
    pub text: String,
    /// Tags the note must all carry. Duplicates are ignored.
    pub tag_ids: Vec<TagId>,
    pub include_archived: bool,
}

impl NoteSearchQuery {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }

    pub fn with_tags(mut self, tag_ids: impl IntoIterator<Item = TagId>) -> Self {
        self.tag_ids.extend(tag_ids);
        self
    }

    pub fn including_archived(mut self, include_archived: bool) -> Self {
        self.include_archived = include_archived;
        self
    }

    /// Trimmed text, or `None` when blank.
    pub fn text_term(&self) -> Option<&str> {
        let trimmed = self.text.trim();
        (!trimmed.is_empty()).then_some(trimmed)
    }

    pub fn has_criteria(&self) -> bool {
        self.text_term().is_some() || !self.tag_ids.is_empty()
    }
}

/// Runs the owner-scoped search. Callers validate [`NoteSearchQuery::has_criteria`]
/// first; without criteria every owned note would match.
pub fn search_notes(
    conn: &Connection,
    owner: UserId,
    query: &NoteSearchQuery,
) -> RepoResult<Vec<Note>> {
    let owner_text = owner.to_string();
    let mut sql = format!(
        "SELECT {NOTE_COLUMNS}
         FROM notes
         WHERE notes.user_id = ?"
    );
    let mut bind_values: Vec<Value> = vec![Value::Text(owner_text.clone())];

    if let Some(term) = query.text_term() {
        let pattern = like_pattern(term);
        sql.push_str(
            " AND (notes.title LIKE ? ESCAPE '\\' OR notes.content LIKE ? ESCAPE '\\')",
        );
        bind_values.push(Value::Text(pattern.clone()));
        bind_values.push(Value::Text(pattern));
    }

    if !query.include_archived {
        sql.push_str(" AND notes.is_archived = 0");
    }

    let unique_tags = query.tag_ids.iter().collect::<BTreeSet<_>>();
    for tag_id in unique_tags {
        sql.push_str(
            " AND EXISTS (
                SELECT 1
                FROM note_tags nt
                INNER JOIN tags t ON t.id = nt.tag_id
                WHERE nt.note_id = notes.id
                  AND nt.tag_id = ?
                  AND t.user_id = ?
            )",
        );
        bind_values.push(Value::Text(tag_id.to_string()));
        bind_values.push(Value::Text(owner_text.clone()));
    }

    sql.push_str(" ORDER BY notes.updated_at DESC, notes.id ASC");

    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt.query(params_from_iter(bind_values))?;
    let mut notes = Vec::new();
    while let Some(row) = rows.next()? {
        notes.push(parse_note_row(row)?);
    }

    Ok(notes)
}

fn like_pattern(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len() + 2);
    escaped.push('%');
    for ch in term.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped.push('%');
    escaped
}

#[cfg(test)]
mod tests {
    use super::{like_pattern, NoteSearchQuery};
    use uuid::Uuid;

    #[test]
    fn like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("50%_off"), "%50\\%\\_off%");
        assert_eq!(like_pattern("a\\b"), "%a\\\\b%");
    }

    #[test]
    fn blank_text_without_tags_has_no_criteria() {
        assert!(!NoteSearchQuery::new("   ").has_criteria());
        assert!(NoteSearchQuery::new(" x ").has_criteria());
        assert_eq!(NoteSearchQuery::new(" x ").text_term(), Some("x"));
        assert!(NoteSearchQuery::new("")
            .with_tags([Uuid::new_v4()])
            .has_criteria());
    }
}
