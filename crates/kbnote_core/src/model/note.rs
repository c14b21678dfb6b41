//! Note model and its read projections.
//!
//! # Invariants
//! - `user_id` is fixed at creation.
//! - `updated_at` moves forward on every title/content update.
//! - `title` is never blank once persisted.

use super::tag::Tag;
use super::{NoteId, UserId};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Canonical note record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    pub id: NoteId,
    pub user_id: UserId,
    pub title: String,
    /// Markdown source; empty string when the note has no body.
    pub content: String,
    pub is_archived: bool,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Note {
    /// Builds a fresh, unarchived note owned by `owner`.
    pub fn new(
        owner: UserId,
        title: impl Into<String>,
        content: impl Into<String>,
        now: i64,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id: owner,
            title: title.into(),
            content: content.into(),
            is_archived: false,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Partial update; `None` leaves the field untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NotePatch {
    pub title: Option<String>,
    pub content: Option<String>,
}

/// Note plus its tags, ordered by tag name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteWithTags {
    #[serde(flatten)]
    pub note: Note,
    pub tags: Vec<Tag>,
}

/// One end of a link edge as shown next to a note.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkedNote {
    pub id: NoteId,
    pub title: String,
}

/// Both directions of the link graph around one note.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Backlinks {
    /// Edges where the note is the source.
    pub outgoing: Vec<LinkedNote>,
    /// Edges where the note is the target.
    pub incoming: Vec<LinkedNote>,
}

/// Full detail view used by `notes.getById`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteDetail {
    #[serde(flatten)]
    pub note: Note,
    pub tags: Vec<Tag>,
    pub outgoing_links: Vec<LinkedNote>,
    pub incoming_links: Vec<LinkedNote>,
    /// `content` rendered by the minimal markdown renderer.
    pub content_html: String,
}
