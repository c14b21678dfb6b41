use kbnote_core::db::open_db_in_memory;
use kbnote_core::repo::note_repo::SqliteNoteRepository;
use kbnote_core::repo::tag_repo::SqliteTagRepository;
use kbnote_core::repo::user_repo::{SqliteUserRepository, UserRepository};
use kbnote_core::{NotePatch, NoteSearchQuery, NoteService, ServiceError, TagService, User, UserId};
use rusqlite::{params, Connection};
use uuid::Uuid;

#[test]
fn create_then_get_round_trips_with_defaults() {
    let conn = open_db_in_memory().unwrap();
    let owner = seed_user(&conn, "a@x.com");
    let service = NoteService::new(SqliteNoteRepository::try_new(&conn).unwrap());

    let created = service.create_note(owner, "Test", "").unwrap();
    assert!(created.tags.is_empty());
    assert_eq!(created.note.content, "");
    assert!(!created.note.is_archived);
    assert_eq!(created.note.created_at, created.note.updated_at);

    let loaded = service.get_note(owner, created.note.id).unwrap();
    assert_eq!(loaded, created.note);
}

#[test]
fn blank_title_is_rejected_on_create_and_update() {
    let conn = open_db_in_memory().unwrap();
    let owner = seed_user(&conn, "a@x.com");
    let service = NoteService::new(SqliteNoteRepository::try_new(&conn).unwrap());

    let err = service.create_note(owner, "   ", "body").unwrap_err();
    assert!(matches!(err, ServiceError::Validation(ref message) if message == "Title is required"));

    let note = service.create_note(owner, "kept", "").unwrap().note;
    let err = service
        .update_note(
            owner,
            note.id,
            NotePatch {
                title: Some(String::new()),
                content: None,
            },
        )
        .unwrap_err();
    assert!(matches!(err, ServiceError::Validation(_)));
    assert_eq!(service.get_note(owner, note.id).unwrap().title, "kept");
}

#[test]
fn update_is_partial_and_bumps_updated_at() {
    let conn = open_db_in_memory().unwrap();
    let owner = seed_user(&conn, "a@x.com");
    let service = NoteService::new(SqliteNoteRepository::try_new(&conn).unwrap());
    let note = service.create_note(owner, "title", "body").unwrap().note;
    force_updated_at(&conn, note.id, 1);

    let updated = service
        .update_note(
            owner,
            note.id,
            NotePatch {
                title: None,
                content: Some("new body".to_string()),
            },
        )
        .unwrap();
    assert_eq!(updated.note.title, "title");
    assert_eq!(updated.note.content, "new body");
    assert!(updated.note.updated_at > 1);
    assert_eq!(updated.note.created_at, note.created_at);

    force_updated_at(&conn, note.id, 1);
    let untouched = service
        .update_note(owner, note.id, NotePatch::default())
        .unwrap();
    assert_eq!(untouched.note.content, "new body");
    assert!(untouched.note.updated_at > 1);
}

#[test]
fn list_orders_by_recency_and_hides_archived_by_default() {
    let conn = open_db_in_memory().unwrap();
    let owner = seed_user(&conn, "a@x.com");
    let service = NoteService::new(SqliteNoteRepository::try_new(&conn).unwrap());

    let old = service.create_note(owner, "old", "").unwrap().note;
    let new = service.create_note(owner, "new", "").unwrap().note;
    let archived = service.create_note(owner, "archived", "").unwrap().note;
    force_updated_at(&conn, old.id, 1_000);
    force_updated_at(&conn, new.id, 2_000);
    force_updated_at(&conn, archived.id, 3_000);
    service.archive_note(owner, archived.id).unwrap();

    let visible_notes = service.list_notes(owner, false).unwrap();
    let visible = titles(&visible_notes);
    assert_eq!(visible, vec!["new", "old"]);

    let all_notes = service.list_notes(owner, true).unwrap();
    let all = titles(&all_notes);
    assert_eq!(all, vec!["archived", "new", "old"]);
}

#[test]
fn archive_and_unarchive_are_idempotent() {
    let conn = open_db_in_memory().unwrap();
    let owner = seed_user(&conn, "a@x.com");
    let service = NoteService::new(SqliteNoteRepository::try_new(&conn).unwrap());
    let note = service.create_note(owner, "title", "").unwrap().note;

    assert!(service.archive_note(owner, note.id).unwrap().is_archived);
    assert!(service.archive_note(owner, note.id).unwrap().is_archived);
    assert!(!service.unarchive_note(owner, note.id).unwrap().is_archived);
    let restored = service.unarchive_note(owner, note.id).unwrap();
    assert!(!restored.is_archived);
    assert_eq!(restored.updated_at, note.updated_at);
}

#[test]
fn delete_is_permanent() {
    let conn = open_db_in_memory().unwrap();
    let owner = seed_user(&conn, "a@x.com");
    let service = NoteService::new(SqliteNoteRepository::try_new(&conn).unwrap());
    let note = service.create_note(owner, "title", "").unwrap().note;

    service.delete_note(owner, note.id).unwrap();
    assert!(service.list_notes(owner, true).unwrap().is_empty());
    assert!(matches!(
        service.get_note(owner, note.id),
        Err(ServiceError::NotFound { entity: "note", .. })
    ));
    assert!(matches!(
        service.delete_note(owner, note.id),
        Err(ServiceError::NotFound { .. })
    ));
}

#[test]
fn missing_note_ids_are_not_found() {
    let conn = open_db_in_memory().unwrap();
    let owner = seed_user(&conn, "a@x.com");
    let service = NoteService::new(SqliteNoteRepository::try_new(&conn).unwrap());
    let missing = Uuid::new_v4();

    assert!(matches!(
        service.update_note(owner, missing, NotePatch::default()),
        Err(ServiceError::NotFound { id, .. }) if id == missing
    ));
    assert!(matches!(
        service.archive_note(owner, missing),
        Err(ServiceError::NotFound { .. })
    ));
}

#[test]
fn update_reports_not_found_before_validating_the_patch() {
    let conn = open_db_in_memory().unwrap();
    let alice = seed_user(&conn, "alice@x.com");
    let bob = seed_user(&conn, "bob@x.com");
    let service = NoteService::new(SqliteNoteRepository::try_new(&conn).unwrap());
    let note = service.create_note(alice, "private", "").unwrap().note;

    let blank_title = NotePatch {
        title: Some(String::new()),
        content: None,
    };
    assert!(matches!(
        service.update_note(bob, note.id, blank_title.clone()),
        Err(ServiceError::NotFound { id, .. }) if id == note.id
    ));
    assert!(matches!(
        service.update_note(alice, note.id, blank_title),
        Err(ServiceError::Validation(_))
    ));
}

#[test]
fn list_and_search_handle_more_notes_than_sqlite_bind_variables() {
    const NOTE_COUNT: i64 = 33_000;

    let conn = open_db_in_memory().unwrap();
    let owner = seed_user(&conn, "a@x.com");
    {
        let tx = conn.unchecked_transaction().unwrap();
        let mut insert = tx
            .prepare(
                "INSERT INTO notes (id, user_id, title, content, is_archived, created_at, updated_at)
                 VALUES (?1, ?2, ?3, '', 0, ?4, ?4);",
            )
            .unwrap();
        for index in 0..NOTE_COUNT {
            insert
                .execute(params![
                    Uuid::new_v4().to_string(),
                    owner.to_string(),
                    format!("bulk {index}"),
                    index,
                ])
                .unwrap();
        }
        drop(insert);
        tx.commit().unwrap();
    }

    let service = NoteService::new(SqliteNoteRepository::try_new(&conn).unwrap());
    let tags = TagService::new(SqliteTagRepository::try_new(&conn).unwrap());
    let oldest = service.create_note(owner, "oldest", "").unwrap().note.id;
    force_updated_at(&conn, oldest, -1);
    let tag = tags.create_tag(owner, "deep").unwrap().id;
    tags.assign_to_note(owner, oldest, tag).unwrap();

    let listed = service.list_notes(owner, false).unwrap();
    assert_eq!(listed.len(), NOTE_COUNT as usize + 1);
    assert_eq!(listed[0].note.title, format!("bulk {}", NOTE_COUNT - 1));
    let last = listed.last().unwrap();
    assert_eq!(last.note.id, oldest);
    assert_eq!(last.tags.len(), 1);
    assert_eq!(last.tags[0].name, "deep");

    let hits = service
        .search_notes(owner, &NoteSearchQuery::new("bulk"))
        .unwrap();
    assert_eq!(hits.len(), NOTE_COUNT as usize);
}

fn seed_user(conn: &Connection, email: &str) -> UserId {
    let user = User {
        id: Uuid::new_v4(),
        email: email.to_string(),
        password_hash: "unused".to_string(),
        created_at: 0,
    };
    SqliteUserRepository::try_new(conn)
        .unwrap()
        .create_user(&user)
        .unwrap();
    user.id
}

fn force_updated_at(conn: &Connection, id: Uuid, updated_at: i64) {
    conn.execute(
        "UPDATE notes SET updated_at = ?1 WHERE id = ?2;",
        params![updated_at, id.to_string()],
    )
    .unwrap();
}

fn titles(notes: &[kbnote_core::NoteWithTags]) -> Vec<&str> {
    notes.iter().map(|view| view.note.title.as_str()).collect()
}
