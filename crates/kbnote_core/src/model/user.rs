//! User account model.

use super::UserId;
use serde::{Deserialize, Serialize};

/// Stored account row. Never serialized to callers: it carries the hash.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: UserId,
    pub email: String,
    /// Argon2id PHC string.
    pub password_hash: String,
    pub created_at: i64,
}

impl User {
    pub fn identity(&self) -> AccountSummary {
        AccountSummary {
            id: self.id,
            email: self.email.clone(),
        }
    }

    pub fn profile(&self) -> AccountProfile {
        AccountProfile {
            id: self.id,
            email: self.email.clone(),
            created_at: self.created_at,
        }
    }
}

/// Payload returned by register/login.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountSummary {
    pub id: UserId,
    pub email: String,
}

/// Payload returned by `me`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountProfile {
    pub id: UserId,
    pub email: String,
    pub created_at: i64,
}
