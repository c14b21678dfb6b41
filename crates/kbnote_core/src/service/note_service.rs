//! Note use-case service.
//!
//! # Responsibility
//! - Owner-scoped create/get/list/update/archive/delete for notes.
//! - Attach the tag projection to note views.
//! - Front the search engine with criteria validation.
//!
//! # Invariants
//! - Titles are never blank.
//! - `update` is partial and always bumps `updated_at`.
//! - Archive/unarchive are idempotent and leave `updated_at` untouched.

use crate::model::note::{Note, NotePatch, NoteWithTags};
use crate::model::{now_millis, NoteId, UserId};
use crate::repo::note_repo::NoteRepository;
use crate::search::filter::NoteSearchQuery;
use crate::service::{ServiceError, ServiceResult};

/// Note service facade over repository implementations.
pub struct NoteService<R: NoteRepository> {
    repo: R,
}

impl<R: NoteRepository> NoteService<R> {
    /// Creates a service using the provided repository implementation.
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Creates one note; `content` defaults to empty at the call sites.
    pub fn create_note(
        &self,
        owner: UserId,
        title: impl Into<String>,
        content: impl Into<String>,
    ) -> ServiceResult<NoteWithTags> {
        let title = title.into();
        validate_title(&title)?;

        let note = Note::new(owner, title, content, now_millis());
        self.repo.create_note(&note)?;
        Ok(NoteWithTags {
            note,
            tags: Vec::new(),
        })
    }

    /// Gets one owned note.
    pub fn get_note(&self, owner: UserId, id: NoteId) -> ServiceResult<Note> {
        self.repo
            .get_note(owner, id)?
            .ok_or(ServiceError::NotFound { entity: "note", id })
    }

    /// Gets one owned note with its tags.
    pub fn get_note_with_tags(&self, owner: UserId, id: NoteId) -> ServiceResult<NoteWithTags> {
        let note = self.get_note(owner, id)?;
        let mut views = self.attach_tags(vec![note])?;
        views
            .pop()
            .ok_or_else(|| ServiceError::Internal("note vanished while loading tags".to_string()))
    }

    /// Lists owned notes by recency; archived ones only on request.
    pub fn list_notes(
        &self,
        owner: UserId,
        include_archived: bool,
    ) -> ServiceResult<Vec<NoteWithTags>> {
        let notes = self.repo.list_notes(owner, include_archived)?;
        self.attach_tags(notes)
    }

    /// Applies a partial update; omitted fields keep their values.
    ///
    /// # Errors
    /// - `NotFound` for a missing or foreign note, checked before the patch
    ///   is validated.
    /// - `Validation` for a blank title.
    pub fn update_note(
        &self,
        owner: UserId,
        id: NoteId,
        patch: NotePatch,
    ) -> ServiceResult<NoteWithTags> {
        self.get_note(owner, id)?;
        if let Some(title) = patch.title.as_deref() {
            validate_title(title)?;
        }

        self.repo.update_note(owner, id, &patch, now_millis())?;
        self.get_note_with_tags(owner, id)
    }

    pub fn archive_note(&self, owner: UserId, id: NoteId) -> ServiceResult<Note> {
        self.repo.set_archived(owner, id, true)?;
        self.get_note(owner, id)
    }

    pub fn unarchive_note(&self, owner: UserId, id: NoteId) -> ServiceResult<Note> {
        self.repo.set_archived(owner, id, false)?;
        self.get_note(owner, id)
    }

    /// Permanently deletes a note together with its tag associations and links.
    pub fn delete_note(&self, owner: UserId, id: NoteId) -> ServiceResult<()> {
        self.repo.delete_note(owner, id)?;
        Ok(())
    }

    /// Searches owned notes.
    ///
    /// # Errors
    /// - `Validation` when the query has neither text nor tags; callers
    ///   wanting everything should use [`Self::list_notes`].
    pub fn search_notes(
        &self,
        owner: UserId,
        query: &NoteSearchQuery,
    ) -> ServiceResult<Vec<NoteWithTags>> {
        if !query.has_criteria() {
            return Err(ServiceError::validation(
                "search requires query text or at least one tag",
            ));
        }

        let notes = self.repo.search_notes(owner, query)?;
        self.attach_tags(notes)
    }

    fn attach_tags(&self, notes: Vec<Note>) -> ServiceResult<Vec<NoteWithTags>> {
        let ids = notes.iter().map(|note| note.id).collect::<Vec<_>>();
        let mut tags_by_note = self.repo.tags_for_notes(&ids)?;
        Ok(notes
            .into_iter()
            .map(|note| NoteWithTags {
                tags: tags_by_note.remove(&note.id).unwrap_or_default(),
                note,
            })
            .collect())
    }
}

fn validate_title(title: &str) -> ServiceResult<()> {
    if title.trim().is_empty() {
        return Err(ServiceError::validation("Title is required"));
    }
    Ok(())
}
