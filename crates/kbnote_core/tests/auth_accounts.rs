use kbnote_core::db::open_db_in_memory;
use kbnote_core::repo::user_repo::SqliteUserRepository;
use kbnote_core::{AuthService, ErrorKind, ServiceError, SessionGuard};
use std::time::Duration;
use uuid::Uuid;

const SECRET: &str = "integration-secret-integration-secret";

#[test]
fn register_stores_an_argon2_hash_and_login_accepts_the_password() {
    let conn = open_db_in_memory().unwrap();
    let auth = AuthService::new(SqliteUserRepository::try_new(&conn).unwrap());

    let user = auth.register("a@x.com", "password1").unwrap();
    assert!(user.password_hash.starts_with("$argon2id$"));
    assert_ne!(user.password_hash, "password1");

    let logged_in = auth.login("a@x.com", "password1").unwrap();
    assert_eq!(logged_in.id, user.id);

    let profile = auth.profile(user.id).unwrap();
    assert_eq!(profile.email, "a@x.com");
    assert_eq!(profile.created_at, user.created_at);
}

#[test]
fn register_validates_and_rejects_duplicates() {
    let conn = open_db_in_memory().unwrap();
    let auth = AuthService::new(SqliteUserRepository::try_new(&conn).unwrap());

    assert!(matches!(
        auth.register("not-an-email", "password1"),
        Err(ServiceError::Validation(_))
    ));
    assert!(matches!(
        auth.register("a@x.com", "short"),
        Err(ServiceError::Validation(_))
    ));

    auth.register("a@x.com", "password1").unwrap();
    let err = auth.register("a@x.com", "password2").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conflict);
    assert_eq!(err.to_string(), "Email already registered");
}

#[test]
fn login_failures_do_not_reveal_which_part_was_wrong() {
    let conn = open_db_in_memory().unwrap();
    let auth = AuthService::new(SqliteUserRepository::try_new(&conn).unwrap());
    auth.register("a@x.com", "password1").unwrap();

    let wrong_password = auth.login("a@x.com", "password2").unwrap_err();
    let unknown_email = auth.login("b@x.com", "password1").unwrap_err();
    assert_eq!(wrong_password.kind(), ErrorKind::Unauthenticated);
    assert_eq!(wrong_password.to_string(), unknown_email.to_string());
    assert_eq!(unknown_email.to_string(), "Invalid email or password");
}

#[test]
fn profile_of_a_vanished_user_is_not_found() {
    let conn = open_db_in_memory().unwrap();
    let auth = AuthService::new(SqliteUserRepository::try_new(&conn).unwrap());

    assert!(matches!(
        auth.profile(Uuid::new_v4()),
        Err(ServiceError::NotFound { entity: "user", .. })
    ));
}

#[test]
fn session_guard_round_trips_identity() {
    let guard = SessionGuard::new(SECRET, Duration::from_secs(3_600));
    let user_id = Uuid::new_v4();

    let token = guard.issue(user_id, "a@x.com").unwrap();
    let identity = guard.authenticate(Some(&token)).unwrap();
    assert_eq!(identity.user_id, user_id);
    assert_eq!(identity.email, "a@x.com");

    let err = guard.authenticate(None).unwrap_err();
    assert_eq!(err.to_string(), "Not authenticated");
}
