//! Tag use-case service.
//!
//! # Invariants
//! - Tag names are trimmed and 1-50 characters long.
//! - Name uniqueness is per owner and case-sensitive.

use crate::model::tag::{Tag, TagWithCount};
use crate::model::{NoteId, TagId, UserId};
use crate::repo::tag_repo::TagRepository;
use crate::service::{ServiceError, ServiceResult};
use uuid::Uuid;

pub const TAG_NAME_MAX_CHARS: usize = 50;

/// Tag service facade over repository implementations.
pub struct TagService<R: TagRepository> {
    repo: R,
}

impl<R: TagRepository> TagService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Creates an owned tag.
    ///
    /// # Errors
    /// - `Validation` for blank or over-long names.
    /// - `Conflict` when the owner already has a tag with this name.
    pub fn create_tag(&self, owner: UserId, name: &str) -> ServiceResult<Tag> {
        let name = normalize_tag_name(name)?;
        let tag = Tag {
            id: Uuid::new_v4(),
            user_id: owner,
            name,
        };
        self.repo.create_tag(&tag)?;
        Ok(tag)
    }

    pub fn list_tags(&self, owner: UserId) -> ServiceResult<Vec<TagWithCount>> {
        Ok(self.repo.list_tags(owner)?)
    }

    pub fn delete_tag(&self, owner: UserId, id: TagId) -> ServiceResult<()> {
        self.repo.delete_tag(owner, id)?;
        Ok(())
    }

    /// Attaches a tag to a note; already-attached pairs are left as is.
    pub fn assign_to_note(
        &self,
        owner: UserId,
        note_id: NoteId,
        tag_id: TagId,
    ) -> ServiceResult<()> {
        self.repo.assign(owner, note_id, tag_id)?;
        Ok(())
    }

    /// Detaches a tag from a note; a missing association is not an error.
    pub fn remove_from_note(
        &self,
        owner: UserId,
        note_id: NoteId,
        tag_id: TagId,
    ) -> ServiceResult<()> {
        self.repo.unassign(owner, note_id, tag_id)?;
        Ok(())
    }
}

fn normalize_tag_name(name: &str) -> ServiceResult<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(ServiceError::validation("Tag name is required"));
    }
    if trimmed.chars().count() > TAG_NAME_MAX_CHARS {
        return Err(ServiceError::validation(format!(
            "Tag name must be at most {TAG_NAME_MAX_CHARS} characters"
        )));
    }
    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::normalize_tag_name;

    #[test]
    fn tag_names_are_trimmed_and_bounded() {
        assert_eq!(normalize_tag_name("  work ").unwrap(), "work");
        assert!(normalize_tag_name("").is_err());
        assert!(normalize_tag_name(&"x".repeat(50)).is_ok());
        assert!(normalize_tag_name(&"x".repeat(51)).is_err());
        // Counted in characters, not bytes.
        assert!(normalize_tag_name(&"é".repeat(50)).is_ok());
    }
}
