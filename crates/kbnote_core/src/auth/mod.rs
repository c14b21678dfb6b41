//! Identity primitives: password hashing and the session guard.
//!
//! # Responsibility
//! - Hash and verify account passwords.
//! - Issue and verify signed session tokens bound to `{user id, email}`.
//!
//! # Invariants
//! - Plaintext passwords and raw tokens are never logged.

pub mod password;
pub mod session;
