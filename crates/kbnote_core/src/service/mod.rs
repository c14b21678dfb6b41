//! Core use-case services.
//!
//! # Responsibility
//! - Validate caller input and orchestrate repository calls.
//! - Translate persistence errors into the caller-facing error kinds.
//!
//! # Invariants
//! - Every owner-scoped call takes the owner id explicitly; services never
//!   read ambient session state.
//! - "Missing" and "owned by someone else" both surface as `NotFound`.

use crate::repo::RepoError;
use thiserror::Error;
use uuid::Uuid;

pub mod auth_service;
pub mod link_service;
pub mod note_service;
pub mod tag_service;

pub type ServiceResult<T> = Result<T, ServiceError>;

/// Caller-facing error for every use-case.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Malformed or missing input.
    #[error("{0}")]
    Validation(String),
    /// Missing, malformed, tampered or expired credential, or bad login.
    #[error("{0}")]
    Unauthenticated(String),
    /// Uniqueness clash (email, tag name).
    #[error("{0}")]
    Conflict(String),
    /// Entity absent or not owned by the caller.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: Uuid },
    /// RPC operation name that does not exist.
    #[error("unknown operation `{0}`")]
    UnknownOperation(String),
    /// Storage or invariant failure the caller cannot fix.
    #[error(transparent)]
    Storage(RepoError),
    #[error("internal error: {0}")]
    Internal(String),
}

/// Stable error classification exposed on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    Unauthenticated,
    Conflict,
    NotFound,
    Internal,
}

impl ErrorKind {
    pub fn as_code(self) -> &'static str {
        match self {
            Self::Validation => "VALIDATION_ERROR",
            Self::Unauthenticated => "UNAUTHENTICATED",
            Self::Conflict => "CONFLICT",
            Self::NotFound => "NOT_FOUND",
            Self::Internal => "INTERNAL_ERROR",
        }
    }
}

impl ServiceError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::Validation,
            Self::Unauthenticated(_) => ErrorKind::Unauthenticated,
            Self::Conflict(_) => ErrorKind::Conflict,
            Self::NotFound { .. } | Self::UnknownOperation(_) => ErrorKind::NotFound,
            Self::Storage(_) | Self::Internal(_) => ErrorKind::Internal,
        }
    }

    pub(crate) fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }
}

impl From<RepoError> for ServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::NotFound { entity, id } => Self::NotFound { entity, id },
            RepoError::Conflict(message) => Self::Conflict(message),
            other => Self::Storage(other),
        }
    }
}
