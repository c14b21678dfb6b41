//! Domain model for users, notes, tags and note links.
//!
//! # Invariants
//! - Every domain object is identified by a stable UUID.
//! - Every note and tag carries the id of exactly one owning user.
//! - Timestamps are Unix epoch milliseconds.

pub mod note;
pub mod tag;
pub mod user;

use uuid::Uuid;

/// Owner identity attached to every note and tag.
pub type UserId = Uuid;
/// Stable note identifier; also the endpoint type of link edges.
pub type NoteId = Uuid;
/// Stable tag identifier.
pub type TagId = Uuid;

/// Current wall-clock time in Unix epoch milliseconds.
pub fn now_millis() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|elapsed| i64::try_from(elapsed.as_millis()).unwrap_or(i64::MAX))
        .unwrap_or(0)
}
