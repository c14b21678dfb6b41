//! Session guard: signed, expiring credentials.
//!
//! Token layout: `base64url(claims json) "." hex(HMAC-SHA256(secret, payload))`.
//! The payload segment is what gets signed, so claims cannot be edited
//! without invalidating the signature.
//!
//! # Invariants
//! - Signature comparison is constant-time (`Mac::verify_slice`).
//! - Any malformed, tampered or expired token is `Unauthenticated`.

use crate::model::UserId;
use crate::service::{ServiceError, ServiceResult};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::fmt::{Debug, Formatter};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

type HmacSha256 = Hmac<Sha256>;

/// Cookie carrying the session token.
pub const SESSION_COOKIE_NAME: &str = "kb_token";
pub const DEFAULT_SESSION_TTL: Duration = Duration::from_secs(7 * 24 * 60 * 60);
/// Shortest accepted signing secret, in bytes.
pub const MIN_SECRET_BYTES: usize = 32;

/// Signed token body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionClaims {
    pub sub: UserId,
    pub email: String,
    /// Issued-at, Unix seconds.
    pub iat: u64,
    /// Expiry, Unix seconds.
    pub exp: u64,
}

/// Authenticated caller resolved from a credential.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub user_id: UserId,
    pub email: String,
}

/// Issues and verifies session tokens with one signing secret.
pub struct SessionGuard {
    secret: Vec<u8>,
    ttl: Duration,
}

impl Debug for SessionGuard {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionGuard")
            .field("secret", &"<redacted>")
            .field("ttl", &self.ttl)
            .finish()
    }
}

impl SessionGuard {
    pub fn new(secret: impl Into<Vec<u8>>, ttl: Duration) -> Self {
        Self {
            secret: secret.into(),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Issues a token for `user_id`/`email` valid for the configured TTL.
    pub fn issue(&self, user_id: UserId, email: &str) -> ServiceResult<String> {
        self.issue_at(user_id, email, unix_now_secs())
    }

    /// Resolves the caller identity from an optional credential.
    pub fn authenticate(&self, credential: Option<&str>) -> ServiceResult<Identity> {
        self.authenticate_at(credential, unix_now_secs())
    }

    pub(crate) fn issue_at(
        &self,
        user_id: UserId,
        email: &str,
        now: u64,
    ) -> ServiceResult<String> {
        let claims = SessionClaims {
            sub: user_id,
            email: email.to_string(),
            iat: now,
            exp: now.saturating_add(self.ttl.as_secs()),
        };
        let body = serde_json::to_vec(&claims)
            .map_err(|err| ServiceError::Internal(format!("failed to encode session: {err}")))?;
        let payload = URL_SAFE_NO_PAD.encode(body);

        let mut mac = self.mac()?;
        mac.update(payload.as_bytes());
        let signature = hex::encode(mac.finalize().into_bytes());
        Ok(format!("{payload}.{signature}"))
    }

    pub(crate) fn authenticate_at(
        &self,
        credential: Option<&str>,
        now: u64,
    ) -> ServiceResult<Identity> {
        let token = credential
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .ok_or_else(|| unauthenticated("Not authenticated"))?;

        let (payload, signature_hex) = token
            .split_once('.')
            .ok_or_else(|| unauthenticated("Invalid session"))?;
        let signature =
            hex::decode(signature_hex).map_err(|_| unauthenticated("Invalid session"))?;

        let mut mac = self.mac()?;
        mac.update(payload.as_bytes());
        mac.verify_slice(&signature)
            .map_err(|_| unauthenticated("Invalid session"))?;

        let body = URL_SAFE_NO_PAD
            .decode(payload)
            .map_err(|_| unauthenticated("Invalid session"))?;
        let claims: SessionClaims =
            serde_json::from_slice(&body).map_err(|_| unauthenticated("Invalid session"))?;

        if claims.exp <= now {
            return Err(unauthenticated("Session expired"));
        }

        Ok(Identity {
            user_id: claims.sub,
            email: claims.email,
        })
    }

    fn mac(&self) -> ServiceResult<HmacSha256> {
        HmacSha256::new_from_slice(&self.secret)
            .map_err(|err| ServiceError::Internal(format!("invalid session secret: {err}")))
    }
}

/// `Set-Cookie` value carrying a freshly issued token.
pub fn session_cookie(token: &str, ttl: Duration) -> String {
    format!(
        "{SESSION_COOKIE_NAME}={token}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
        ttl.as_secs()
    )
}

/// `Set-Cookie` value that clears the session cookie.
pub fn cleared_session_cookie() -> String {
    format!("{SESSION_COOKIE_NAME}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0")
}

/// Extracts the session token from a `Cookie` request header.
pub fn token_from_cookie_header(header: &str) -> Option<&str> {
    header
        .split(';')
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE_NAME)
        .map(|(_, value)| value)
        .filter(|value| !value.is_empty())
}

fn unauthenticated(message: &str) -> ServiceError {
    ServiceError::Unauthenticated(message.to_string())
}

fn unix_now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::{
        cleared_session_cookie, session_cookie, token_from_cookie_header, SessionGuard,
    };
    use crate::service::ErrorKind;
    use std::time::Duration;
    use uuid::Uuid;

    const SECRET: &str = "0123456789abcdef0123456789abcdef";

    fn guard() -> SessionGuard {
        SessionGuard::new(SECRET, Duration::from_secs(60))
    }

    #[test]
    fn issued_token_resolves_identity() {
        let user_id = Uuid::new_v4();
        let token = guard().issue_at(user_id, "a@x.com", 1_000).unwrap();
        let identity = guard().authenticate_at(Some(&token), 1_030).unwrap();
        assert_eq!(identity.user_id, user_id);
        assert_eq!(identity.email, "a@x.com");
    }

    #[test]
    fn expired_token_is_rejected() {
        let token = guard().issue_at(Uuid::new_v4(), "a@x.com", 1_000).unwrap();
        let err = guard().authenticate_at(Some(&token), 1_060).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unauthenticated);
        assert_eq!(err.to_string(), "Session expired");
    }

    #[test]
    fn tampered_or_foreign_tokens_are_rejected() {
        let token = guard().issue_at(Uuid::new_v4(), "a@x.com", 1_000).unwrap();
        let (payload, signature) = token.split_once('.').unwrap();

        let mut flipped = signature.to_string();
        let last = if flipped.ends_with('0') { "1" } else { "0" };
        flipped.replace_range(flipped.len() - 1.., last);
        let tampered = format!("{payload}.{flipped}");
        assert!(guard().authenticate_at(Some(&tampered), 1_001).is_err());

        let other = SessionGuard::new(
            "another-secret-another-secret-xx",
            Duration::from_secs(60),
        );
        assert!(other.authenticate_at(Some(&token), 1_001).is_err());
    }

    #[test]
    fn missing_or_garbage_credentials_are_rejected() {
        for credential in [None, Some(""), Some("   "), Some("no-dot"), Some("abc.zz")] {
            let err = guard().authenticate_at(credential, 1).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Unauthenticated);
        }
    }

    #[test]
    fn cookie_helpers_round_trip_the_token() {
        let cookie = session_cookie("tok.sig", Duration::from_secs(10));
        assert!(cookie.starts_with("kb_token=tok.sig;"));
        assert!(cookie.contains("Max-Age=10"));
        assert!(cleared_session_cookie().contains("Max-Age=0"));

        assert_eq!(
            token_from_cookie_header("theme=dark; kb_token=tok.sig; other=1"),
            Some("tok.sig")
        );
        assert_eq!(token_from_cookie_header("kb_token="), None);
        assert_eq!(token_from_cookie_header("theme=dark"), None);
    }

    #[test]
    fn debug_output_hides_the_secret() {
        assert!(!format!("{:?}", guard()).contains(SECRET));
    }
}
