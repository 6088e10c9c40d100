use super::*;
use crate::net::types::Role;
use crate::test_support::identity;

// =============================================================================
// MemoryStorage
// =============================================================================

#[test]
fn memory_set_get_remove() {
    let storage = MemoryStorage::new();
    storage.set_all(&[("a", "1"), ("b", "2")]).unwrap();
    assert_eq!(storage.get("a").as_deref(), Some("1"));
    assert_eq!(storage.get("b").as_deref(), Some("2"));

    storage.remove_all(&["a", "missing"]).unwrap();
    assert_eq!(storage.get("a"), None);
    assert_eq!(storage.get("b").as_deref(), Some("2"));
}

// =============================================================================
// FileStorage
// =============================================================================

#[test]
fn file_storage_round_trips_through_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("session.json");
    let storage = FileStorage::new(&path);

    storage.set_all(&[(TOKEN_KEY, "tok"), (USER_KEY, "{}")]).unwrap();
    assert!(path.exists());

    let reopened = FileStorage::new(&path);
    assert_eq!(reopened.get(TOKEN_KEY).as_deref(), Some("tok"));
    assert_eq!(reopened.get(USER_KEY).as_deref(), Some("{}"));
}

#[test]
fn file_storage_removes_file_when_emptied() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("session.json");
    let storage = FileStorage::new(&path);

    storage.set_all(&[(TOKEN_KEY, "tok")]).unwrap();
    storage.remove_all(&[TOKEN_KEY, USER_KEY]).unwrap();
    assert!(!path.exists());

    // Idempotent on a missing file.
    storage.remove_all(&[TOKEN_KEY, USER_KEY]).unwrap();
    assert!(!path.exists());
}

#[test]
fn file_storage_leaves_no_temp_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("session.json");
    FileStorage::new(&path).set_all(&[(TOKEN_KEY, "tok")]).unwrap();

    let names: Vec<_> = std::fs::read_dir(dir.path())
        .unwrap()
        .map(|entry| entry.unwrap().file_name().into_string().unwrap())
        .collect();
    assert_eq!(names, vec!["session.json".to_owned()]);
}

#[test]
fn file_storage_reads_corrupt_file_as_empty_and_recovers() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("session.json");
    std::fs::write(&path, "{not json").unwrap();
    let storage = FileStorage::new(&path);

    assert_eq!(storage.get(TOKEN_KEY), None);
    storage.remove_all(&[TOKEN_KEY, USER_KEY]).unwrap();
    assert!(!path.exists());
}

#[cfg(unix)]
#[test]
fn file_storage_is_owner_only() {
    use std::os::unix::fs::PermissionsExt;

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("session.json");
    FileStorage::new(&path).set_all(&[(TOKEN_KEY, "tok")]).unwrap();

    let mode = std::fs::metadata(&path).unwrap().permissions().mode();
    assert_eq!(mode & 0o777, 0o600);
}

#[test]
fn file_storage_write_failure_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    // A regular file where a directory is expected.
    let blocker = dir.path().join("blocker");
    std::fs::write(&blocker, "x").unwrap();
    let storage = FileStorage::new(blocker.join("session.json"));

    let err = storage.set_all(&[(TOKEN_KEY, "tok")]).unwrap_err();
    assert!(matches!(err, StorageError::Io { .. }));
}

#[test]
fn file_storage_failed_replace_leaves_no_temp_file() {
    let dir = tempfile::tempdir().unwrap();
    // A non-empty directory at the target path makes the final rename fail.
    let path = dir.path().join("session.json");
    std::fs::create_dir(&path).unwrap();
    std::fs::write(path.join("keep"), "x").unwrap();
    let storage = FileStorage::new(&path);

    let err = storage.set_all(&[(TOKEN_KEY, "tok")]).unwrap_err();
    assert!(matches!(err, StorageError::Io { .. }));
    assert!(!dir.path().join("session.json.tmp").exists());
    assert!(path.join("keep").exists());
}

// =============================================================================
// Session pair
// =============================================================================

#[test]
fn load_empty_storage() {
    assert_eq!(load_session(&MemoryStorage::new()), PersistedSession::Empty);
}

#[test]
fn save_then_load_is_valid() {
    let storage = MemoryStorage::new();
    let admin = identity(Role::Admin);
    save_session(&storage, "jwt", &admin).unwrap();

    assert_eq!(load_session(&storage), PersistedSession::Valid { token: "jwt".to_owned(), identity: admin });
}

#[test]
fn persisted_user_record_excludes_token() {
    let storage = MemoryStorage::new();
    save_session(&storage, "jwt", &identity(Role::Student)).unwrap();

    let user = storage.get(USER_KEY).unwrap();
    assert!(!user.contains("jwt"));
    assert!(!user.contains("token"));
}

#[test]
fn load_torn_pairs_are_invalid() {
    let token_only = MemoryStorage::with_entries(&[(TOKEN_KEY, "jwt")]);
    assert!(matches!(load_session(&token_only), PersistedSession::Invalid(_)));

    let user = serde_json::to_string(&identity(Role::Student)).unwrap();
    let user_only = MemoryStorage::with_entries(&[(USER_KEY, &user)]);
    assert!(matches!(load_session(&user_only), PersistedSession::Invalid(_)));
}

#[test]
fn load_malformed_user_is_invalid() {
    let cases = [
        "not json",
        "null",
        "[]",
        r#"{"id":1}"#,
        r#"{"id":1,"username":"x","email":"e","role":"OVERLORD"}"#,
        r#"{"id":"one","username":"x","email":"e","role":"ADMIN"}"#,
    ];
    for raw in cases {
        let storage = MemoryStorage::with_entries(&[(TOKEN_KEY, "jwt"), (USER_KEY, raw)]);
        assert!(matches!(load_session(&storage), PersistedSession::Invalid(_)), "case {raw}");
    }
}

#[test]
fn load_blank_values_count_as_missing() {
    let storage = MemoryStorage::with_entries(&[(TOKEN_KEY, " "), (USER_KEY, "")]);
    assert_eq!(load_session(&storage), PersistedSession::Empty);
}

#[test]
fn clear_removes_both_keys_only() {
    let storage = MemoryStorage::with_entries(&[(TOKEN_KEY, "jwt"), (USER_KEY, "{}"), ("theme", "dark")]);
    clear_session(&storage).unwrap();
    assert_eq!(storage.get(TOKEN_KEY), None);
    assert_eq!(storage.get(USER_KEY), None);
    assert_eq!(storage.get("theme").as_deref(), Some("dark"));
}
