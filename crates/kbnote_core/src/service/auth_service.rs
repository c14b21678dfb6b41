//! Account registration, login and profile lookup.
//!
//! # Invariants
//! - Emails are unique; passwords are stored only as Argon2id hashes.
//! - Login failures never reveal whether the email exists.

use crate::auth::password::{hash_password, verify_password};
use crate::model::user::{AccountProfile, User};
use crate::model::{now_millis, UserId};
use crate::repo::user_repo::UserRepository;
use crate::service::{ServiceError, ServiceResult};
use once_cell::sync::Lazy;
use regex::Regex;
use uuid::Uuid;

pub const PASSWORD_MIN_CHARS: usize = 8;

static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("valid email regex"));

const INVALID_CREDENTIALS: &str = "Invalid email or password";

pub struct AuthService<R: UserRepository> {
    repo: R,
}

impl<R: UserRepository> AuthService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Creates an account.
    ///
    /// # Errors
    /// - `Validation` for a malformed email or a short password.
    /// - `Conflict` when the email is already registered.
    pub fn register(&self, email: &str, password: &str) -> ServiceResult<User> {
        validate_email(email)?;
        if password.chars().count() < PASSWORD_MIN_CHARS {
            return Err(ServiceError::validation(format!(
                "Password must be at least {PASSWORD_MIN_CHARS} characters"
            )));
        }

        if self.repo.find_by_email(email)?.is_some() {
            return Err(ServiceError::Conflict("Email already registered".to_string()));
        }

        let user = User {
            id: Uuid::new_v4(),
            email: email.to_string(),
            password_hash: hash_password(password)?,
            created_at: now_millis(),
        };
        // The unique index still guards the race between lookup and insert.
        self.repo.create_user(&user)?;
        Ok(user)
    }

    /// Checks credentials and returns the account.
    pub fn login(&self, email: &str, password: &str) -> ServiceResult<User> {
        validate_email(email)?;
        let Some(user) = self.repo.find_by_email(email)? else {
            return Err(ServiceError::Unauthenticated(INVALID_CREDENTIALS.to_string()));
        };
        if !verify_password(password, &user.password_hash)? {
            return Err(ServiceError::Unauthenticated(INVALID_CREDENTIALS.to_string()));
        }
        Ok(user)
    }

    pub fn profile(&self, user_id: UserId) -> ServiceResult<AccountProfile> {
        self.repo
            .find_by_id(user_id)?
            .map(|user| user.profile())
            .ok_or(ServiceError::NotFound {
                entity: "user",
                id: user_id,
            })
    }
}

fn validate_email(email: &str) -> ServiceResult<()> {
    if EMAIL_RE.is_match(email) {
        Ok(())
    } else {
        Err(ServiceError::validation("Invalid email address"))
    }
}
