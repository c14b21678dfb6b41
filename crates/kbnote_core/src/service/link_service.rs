//! Link graph use-case service.
//!
//! # Invariants
//! - Both endpoints must be owned by the caller for link and unlink.
//! - Self-links are rejected, but only after ownership is confirmed, so a
//!   foreign id always reports `NotFound`.

use crate::model::note::Backlinks;
use crate::model::{NoteId, UserId};
use crate::repo::link_repo::LinkRepository;
use crate::service::{ServiceError, ServiceResult};

pub struct LinkService<R: LinkRepository> {
    repo: R,
}

impl<R: LinkRepository> LinkService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Adds the edge `from -> to`; an existing edge is left untouched.
    pub fn link(&self, owner: UserId, from: NoteId, to: NoteId) -> ServiceResult<()> {
        if from == to {
            if !self.repo.note_owned(owner, from)? {
                return Err(ServiceError::NotFound {
                    entity: "note",
                    id: from,
                });
            }
            return Err(ServiceError::validation("A note cannot link to itself"));
        }
        self.repo.link(owner, from, to)?;
        Ok(())
    }

    /// Removes the edge `from -> to`; a missing edge is not an error.
    pub fn unlink(&self, owner: UserId, from: NoteId, to: NoteId) -> ServiceResult<()> {
        self.repo.unlink(owner, from, to)?;
        Ok(())
    }

    /// Outgoing and incoming neighbours of one owned note.
    pub fn backlinks(&self, owner: UserId, note_id: NoteId) -> ServiceResult<Backlinks> {
        Ok(self.repo.backlinks(owner, note_id)?)
    }
}
