//! Core domain logic for the kbnote personal knowledge base.
//! This crate is the single source of truth for ownership and data invariants.

pub mod auth;
pub mod config;
pub mod db;
pub mod logging;
pub mod markdown;
pub mod model;
pub mod repo;
pub mod rpc;
pub mod search;
pub mod service;

pub use auth::session::{
    cleared_session_cookie, session_cookie, token_from_cookie_header, Identity, SessionGuard,
    SESSION_COOKIE_NAME,
};
pub use config::{AppConfig, ConfigError};
pub use db::{open_db, open_db_in_memory, DbError, DbResult};
pub use logging::{default_log_level, init_logging, logging_status};
pub use markdown::render_markdown;
pub use model::note::{Backlinks, LinkedNote, Note, NoteDetail, NotePatch, NoteWithTags};
pub use model::tag::{Tag, TagWithCount};
pub use model::user::{AccountProfile, AccountSummary, User};
pub use model::{NoteId, TagId, UserId};
pub use repo::{RepoError, RepoResult};
pub use rpc::{KnowledgeBase, Operation, RpcErrorBody, RpcOutcome, RpcRequest, SessionUpdate};
pub use search::filter::NoteSearchQuery;
pub use service::auth_service::AuthService;
pub use service::link_service::LinkService;
pub use service::note_service::NoteService;
pub use service::tag_service::TagService;
pub use service::{ErrorKind, ServiceError, ServiceResult};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
