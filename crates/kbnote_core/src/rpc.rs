//! Request/response boundary for UI and CLI callers.
//!
//! # Responsibility
//! - Map operation names (`notes.create`, `tags.list`, ...) to services.
//! - Run the session guard before every protected operation.
//! - Decode camelCase JSON input and encode JSON payloads.
//!
//! # Invariants
//! - Only `auth.register` and `auth.login` run without a credential.
//! - The resolved user id is the only owner ever passed to services.
//! - One call touches one connection and completes before returning.

use crate::auth::session::{Identity, SessionGuard};
use crate::config::AppConfig;
use crate::db::{open_db, DbResult};
use crate::markdown::render_markdown;
use crate::model::note::{NoteDetail, NotePatch};
use crate::model::user::User;
use crate::model::{NoteId, TagId};
use crate::repo::link_repo::SqliteLinkRepository;
use crate::repo::note_repo::SqliteNoteRepository;
use crate::repo::tag_repo::SqliteTagRepository;
use crate::repo::user_repo::SqliteUserRepository;
use crate::search::filter::NoteSearchQuery;
use crate::service::auth_service::AuthService;
use crate::service::link_service::LinkService;
use crate::service::note_service::NoteService;
use crate::service::tag_service::TagService;
use crate::service::{ErrorKind, ServiceError, ServiceResult};
use log::{error, info, warn};
use rusqlite::Connection;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::Instant;

/// Every operation exposed at the boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Register,
    Login,
    Logout,
    Me,
    NotesCreate,
    NotesGetById,
    NotesList,
    NotesUpdate,
    NotesArchive,
    NotesUnarchive,
    NotesDelete,
    NotesLink,
    NotesUnlink,
    TagsCreate,
    TagsList,
    TagsDelete,
    TagsAssignToNote,
    TagsRemoveFromNote,
    SearchNotes,
}

impl Operation {
    pub const ALL: [Operation; 19] = [
        Self::Register,
        Self::Login,
        Self::Logout,
        Self::Me,
        Self::NotesCreate,
        Self::NotesGetById,
        Self::NotesList,
        Self::NotesUpdate,
        Self::NotesArchive,
        Self::NotesUnarchive,
        Self::NotesDelete,
        Self::NotesLink,
        Self::NotesUnlink,
        Self::TagsCreate,
        Self::TagsList,
        Self::TagsDelete,
        Self::TagsAssignToNote,
        Self::TagsRemoveFromNote,
        Self::SearchNotes,
    ];

    /// Resolves a wire name; bare `register`/`login`/`logout`/`me` are
    /// accepted as aliases of the `auth.` names.
    pub fn parse(name: &str) -> Option<Self> {
        let name = name.trim();
        let qualified = match name {
            "register" | "login" | "logout" | "me" => format!("auth.{name}"),
            other => other.to_string(),
        };
        Self::ALL
            .into_iter()
            .find(|operation| operation.name() == qualified)
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Register => "auth.register",
            Self::Login => "auth.login",
            Self::Logout => "auth.logout",
            Self::Me => "auth.me",
            Self::NotesCreate => "notes.create",
            Self::NotesGetById => "notes.getById",
            Self::NotesList => "notes.list",
            Self::NotesUpdate => "notes.update",
            Self::NotesArchive => "notes.archive",
            Self::NotesUnarchive => "notes.unarchive",
            Self::NotesDelete => "notes.delete",
            Self::NotesLink => "notes.link",
            Self::NotesUnlink => "notes.unlink",
            Self::TagsCreate => "tags.create",
            Self::TagsList => "tags.list",
            Self::TagsDelete => "tags.delete",
            Self::TagsAssignToNote => "tags.assignToNote",
            Self::TagsRemoveFromNote => "tags.removeFromNote",
            Self::SearchNotes => "search.notes",
        }
    }

    /// Operations reachable without a session.
    pub fn is_public(self) -> bool {
        matches!(self, Self::Register | Self::Login)
    }
}

/// One inbound call.
#[derive(Debug, Clone, PartialEq)]
pub struct RpcRequest {
    pub op: String,
    /// Session token (bearer value or `kb_token` cookie value).
    pub credential: Option<String>,
    /// JSON input; `null` is treated as `{}`.
    pub input: Value,
}

impl RpcRequest {
    pub fn new(op: impl Into<String>, input: Value) -> Self {
        Self {
            op: op.into(),
            credential: None,
            input,
        }
    }

    pub fn with_credential(mut self, credential: impl Into<String>) -> Self {
        self.credential = Some(credential.into());
        self
    }
}

/// What the transport must do with the caller's stored credential.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionUpdate {
    Unchanged,
    Issued(String),
    Cleared,
}

/// Successful call result.
#[derive(Debug, Clone, PartialEq)]
pub struct RpcOutcome {
    pub payload: Value,
    pub session: SessionUpdate,
}

impl RpcOutcome {
    fn from_payload(payload: Value) -> Self {
        Self {
            payload,
            session: SessionUpdate::Unchanged,
        }
    }

    fn success() -> Self {
        Self::from_payload(json!({ "success": true }))
    }
}

/// Serialized failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RpcErrorBody {
    pub code: String,
    pub message: String,
}

impl From<&ServiceError> for RpcErrorBody {
    fn from(err: &ServiceError) -> Self {
        let kind = err.kind();
        let message = match kind {
            // Storage details stay in the logs.
            ErrorKind::Internal => "Internal error".to_string(),
            _ => err.to_string(),
        };
        Self {
            code: kind.as_code().to_string(),
            message,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct CredentialsInput {
    email: String,
    password: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct CreateNoteInput {
    title: String,
    #[serde(default)]
    content: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct IdInput {
    id: NoteId,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
struct ListNotesInput {
    include_archived: bool,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct UpdateNoteInput {
    id: NoteId,
    title: Option<String>,
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct LinkInput {
    from_note_id: NoteId,
    to_note_id: NoteId,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct CreateTagInput {
    name: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct TagIdInput {
    id: TagId,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct NoteTagInput {
    note_id: NoteId,
    tag_id: TagId,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct SearchInput {
    query: String,
    #[serde(default)]
    tags: Option<Vec<TagId>>,
    #[serde(default)]
    include_archived: bool,
}

/// Knowledge-base facade: one SQLite connection plus the session guard.
pub struct KnowledgeBase {
    conn: Connection,
    sessions: SessionGuard,
}

impl KnowledgeBase {
    pub fn new(conn: Connection, sessions: SessionGuard) -> Self {
        Self { conn, sessions }
    }

    /// Opens the configured database file.
    pub fn open(config: &AppConfig) -> DbResult<Self> {
        let conn = open_db(&config.db_path)?;
        let sessions = SessionGuard::new(config.session_secret.as_bytes(), config.session_ttl);
        Ok(Self::new(conn, sessions))
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    pub fn sessions(&self) -> &SessionGuard {
        &self.sessions
    }

    /// Executes one call and logs its outcome.
    pub fn call(&self, request: RpcRequest) -> ServiceResult<RpcOutcome> {
        let started_at = Instant::now();
        let result = self.dispatch(&request);
        let duration_ms = started_at.elapsed().as_millis();
        let op = Operation::parse(&request.op).map_or("unknown", Operation::name);

        match &result {
            Ok(_) => info!("event=rpc_call module=rpc op={op} status=ok duration_ms={duration_ms}"),
            Err(err) if err.kind() == ErrorKind::Internal => error!(
                "event=rpc_call module=rpc op={op} status=error duration_ms={duration_ms} error_code={} error={err}",
                err.kind().as_code()
            ),
            Err(err) => warn!(
                "event=rpc_call module=rpc op={op} status=rejected duration_ms={duration_ms} error_code={}",
                err.kind().as_code()
            ),
        }

        result
    }

    fn dispatch(&self, request: &RpcRequest) -> ServiceResult<RpcOutcome> {
        let operation = Operation::parse(&request.op)
            .ok_or_else(|| ServiceError::UnknownOperation(request.op.clone()))?;

        if operation.is_public() {
            return self.public_call(operation, &request.input);
        }

        let identity = self.sessions.authenticate(request.credential.as_deref())?;
        let owner = identity.user_id;
        let input = &request.input;

        match operation {
            Operation::Register | Operation::Login => self.public_call(operation, input),
            Operation::Logout => Ok(RpcOutcome {
                payload: json!({ "success": true }),
                session: SessionUpdate::Cleared,
            }),
            Operation::Me => self.me(&identity),
            Operation::NotesCreate => {
                let input: CreateNoteInput = parse_input(input)?;
                let note = self
                    .notes()?
                    .create_note(owner, input.title, input.content)?;
                encode(&note)
            }
            Operation::NotesGetById => {
                let input: IdInput = parse_input(input)?;
                encode(&self.note_detail(&identity, input.id)?)
            }
            Operation::NotesList => {
                let input: ListNotesInput = parse_input(input)?;
                encode(&self.notes()?.list_notes(owner, input.include_archived)?)
            }
            Operation::NotesUpdate => {
                let input: UpdateNoteInput = parse_input(input)?;
                let patch = NotePatch {
                    title: input.title,
                    content: input.content,
                };
                encode(&self.notes()?.update_note(owner, input.id, patch)?)
            }
            Operation::NotesArchive => {
                let input: IdInput = parse_input(input)?;
                encode(&self.notes()?.archive_note(owner, input.id)?)
            }
            Operation::NotesUnarchive => {
                let input: IdInput = parse_input(input)?;
                encode(&self.notes()?.unarchive_note(owner, input.id)?)
            }
            Operation::NotesDelete => {
                let input: IdInput = parse_input(input)?;
                self.notes()?.delete_note(owner, input.id)?;
                Ok(RpcOutcome::success())
            }
            Operation::NotesLink => {
                let input: LinkInput = parse_input(input)?;
                self.links()?
                    .link(owner, input.from_note_id, input.to_note_id)?;
                Ok(RpcOutcome::success())
            }
            Operation::NotesUnlink => {
                let input: LinkInput = parse_input(input)?;
                self.links()?
                    .unlink(owner, input.from_note_id, input.to_note_id)?;
                Ok(RpcOutcome::success())
            }
            Operation::TagsCreate => {
                let input: CreateTagInput = parse_input(input)?;
                encode(&self.tags()?.create_tag(owner, &input.name)?)
            }
            Operation::TagsList => {
                parse_input::<EmptyInput>(input)?;
                encode(&self.tags()?.list_tags(owner)?)
            }
            Operation::TagsDelete => {
                let input: TagIdInput = parse_input(input)?;
                self.tags()?.delete_tag(owner, input.id)?;
                Ok(RpcOutcome::success())
            }
            Operation::TagsAssignToNote => {
                let input: NoteTagInput = parse_input(input)?;
                self.tags()?
                    .assign_to_note(owner, input.note_id, input.tag_id)?;
                Ok(RpcOutcome::success())
            }
            Operation::TagsRemoveFromNote => {
                let input: NoteTagInput = parse_input(input)?;
                self.tags()?
                    .remove_from_note(owner, input.note_id, input.tag_id)?;
                Ok(RpcOutcome::success())
            }
            Operation::SearchNotes => {
                let input: SearchInput = parse_input(input)?;
                let query = NoteSearchQuery::new(input.query)
                    .with_tags(input.tags.unwrap_or_default())
                    .including_archived(input.include_archived);
                encode(&self.notes()?.search_notes(owner, &query)?)
            }
        }
    }

    fn public_call(&self, operation: Operation, input: &Value) -> ServiceResult<RpcOutcome> {
        let credentials: CredentialsInput = parse_input(input)?;
        match operation {
            Operation::Register => self.register(credentials),
            _ => self.login(credentials),
        }
    }

    fn register(&self, input: CredentialsInput) -> ServiceResult<RpcOutcome> {
        let user = self.accounts()?.register(&input.email, &input.password)?;
        self.signed_in(&user)
    }

    fn login(&self, input: CredentialsInput) -> ServiceResult<RpcOutcome> {
        let user = self.accounts()?.login(&input.email, &input.password)?;
        self.signed_in(&user)
    }

    fn signed_in(&self, user: &User) -> ServiceResult<RpcOutcome> {
        let token = self.sessions.issue(user.id, &user.email)?;
        let mut outcome = encode(&user.identity())?;
        outcome.session = SessionUpdate::Issued(token);
        Ok(outcome)
    }

    fn me(&self, identity: &Identity) -> ServiceResult<RpcOutcome> {
        encode(&self.accounts()?.profile(identity.user_id)?)
    }

    fn note_detail(&self, identity: &Identity, id: NoteId) -> ServiceResult<NoteDetail> {
        let with_tags = self.notes()?.get_note_with_tags(identity.user_id, id)?;
        let backlinks = self.links()?.backlinks(identity.user_id, id)?;
        let content_html = render_markdown(&with_tags.note.content);
        Ok(NoteDetail {
            note: with_tags.note,
            tags: with_tags.tags,
            outgoing_links: backlinks.outgoing,
            incoming_links: backlinks.incoming,
            content_html,
        })
    }

    fn accounts(&self) -> ServiceResult<AuthService<SqliteUserRepository<'_>>> {
        Ok(AuthService::new(SqliteUserRepository::try_new(&self.conn)?))
    }

    fn notes(&self) -> ServiceResult<NoteService<SqliteNoteRepository<'_>>> {
        Ok(NoteService::new(SqliteNoteRepository::try_new(&self.conn)?))
    }

    fn tags(&self) -> ServiceResult<TagService<SqliteTagRepository<'_>>> {
        Ok(TagService::new(SqliteTagRepository::try_new(&self.conn)?))
    }

    fn links(&self) -> ServiceResult<LinkService<SqliteLinkRepository<'_>>> {
        Ok(LinkService::new(SqliteLinkRepository::try_new(&self.conn)?))
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct EmptyInput {}

fn parse_input<T: DeserializeOwned>(input: &Value) -> ServiceResult<T> {
    let value = if input.is_null() {
        Value::Object(Default::default())
    } else {
        input.clone()
    };
    serde_json::from_value(value)
        .map_err(|err| ServiceError::Validation(format!("invalid input: {err}")))
}

fn encode<T: Serialize>(payload: &T) -> ServiceResult<RpcOutcome> {
    serde_json::to_value(payload)
        .map(RpcOutcome::from_payload)
        .map_err(|err| ServiceError::Internal(format!("failed to encode payload: {err}")))
}

#[cfg(test)]
mod tests {
    use super::{parse_input, ListNotesInput, Operation, RpcErrorBody, SearchInput};
    use crate::repo::RepoError;
    use crate::service::ServiceError;
    use serde_json::{json, Value};

    #[test]
    fn operation_names_round_trip_and_aliases_resolve() {
        for operation in Operation::ALL {
            assert_eq!(Operation::parse(operation.name()), Some(operation));
        }
        assert_eq!(Operation::parse("login"), Some(Operation::Login));
        assert_eq!(Operation::parse("me"), Some(Operation::Me));
        assert_eq!(Operation::parse("notes.explode"), None);
        assert!(Operation::Register.is_public());
        assert!(!Operation::Logout.is_public());
    }

    #[test]
    fn null_input_uses_defaults() {
        let input: ListNotesInput = parse_input(&Value::Null).unwrap();
        assert!(!input.include_archived);
        let input: ListNotesInput = parse_input(&json!({ "includeArchived": true })).unwrap();
        assert!(input.include_archived);
    }

    #[test]
    fn malformed_input_is_a_validation_error() {
        let err = parse_input::<SearchInput>(&json!({ "query": "x", "tags": ["nope"] }))
            .unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
        let err = parse_input::<ListNotesInput>(&json!({ "bogus": 1 })).unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
    }

    #[test]
    fn internal_errors_are_masked_on_the_wire() {
        let body = RpcErrorBody::from(&ServiceError::from(RepoError::InvalidData(
            "notes.id is garbage".to_string(),
        )));
        assert_eq!(body.code, "INTERNAL_ERROR");
        assert_eq!(body.message, "Internal error");
    }
}
