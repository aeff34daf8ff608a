//! End-to-end persistence tests against a real on-disk database, exercising
//! the store the way the CLI uses it: open, write, drop, reopen.

use bichat::session::{MessageRole, Session, SessionManager, SessionStore, DEFAULT_USER_ID};
use tempfile::TempDir;

fn store_at(dir: &TempDir) -> SessionStore {
    SessionStore::new(dir.path().join("sessions.db")).unwrap()
}

#[test]
fn sessions_survive_process_restart() {
    let dir = TempDir::new().unwrap();

    let id = {
        let manager = SessionManager::new(store_at(&dir));
        let mut session = manager.create_session("Restart test", DEFAULT_USER_ID).unwrap();
        manager
            .add_message_to_session(&mut session, MessageRole::User, "show revenue", None)
            .unwrap();
        manager
            .add_message_to_session(&mut session, MessageRole::Assistant, "3 rows in 0.21s", None)
            .unwrap();
        session.id.unwrap()
    };

    // New store over the same file simulates a fresh process.
    let manager = SessionManager::new(store_at(&dir));
    let session = manager.get_session_by_id(id).unwrap().unwrap();
    assert_eq!(session.title, "Restart test");
    assert_eq!(session.message_count(), 2);
    assert_eq!(session.conversation_history[0].content, "show revenue");
    assert_eq!(session.conversation_history[1].role, MessageRole::Assistant);
}

#[test]
fn load_all_orders_by_recency_across_reopens() {
    let dir = TempDir::new().unwrap();

    {
        let manager = SessionManager::new(store_at(&dir));
        manager.create_session("older", DEFAULT_USER_ID).unwrap();
        std::thread::sleep(std::time::Duration::from_millis(5));
        manager.create_session("newer", DEFAULT_USER_ID).unwrap();
    }

    let manager = SessionManager::new(store_at(&dir));
    let mut older = manager
        .get_all_sessions(DEFAULT_USER_ID)
        .unwrap()
        .into_iter()
        .find(|s| s.title == "older")
        .unwrap();
    std::thread::sleep(std::time::Duration::from_millis(5));
    manager.update_session_activity(&mut older).unwrap();

    let titles: Vec<String> = manager
        .get_all_sessions(DEFAULT_USER_ID)
        .unwrap()
        .into_iter()
        .map(|s| s.title)
        .collect();
    assert_eq!(titles, vec!["older".to_string(), "newer".to_string()]);
}

#[test]
fn users_only_see_their_own_sessions() {
    let dir = TempDir::new().unwrap();
    let manager = SessionManager::new(store_at(&dir));

    manager.create_session("mine", "alice").unwrap();
    manager.create_session("theirs", "bob").unwrap();

    let alice = manager.get_all_sessions("alice").unwrap();
    assert_eq!(alice.len(), 1);
    assert_eq!(alice[0].title, "mine");
    assert_eq!(alice[0].user_id, "alice");
}

#[test]
fn deleted_session_ids_are_never_reused() {
    let dir = TempDir::new().unwrap();
    let manager = SessionManager::new(store_at(&dir));

    let first = manager.create_session("one", DEFAULT_USER_ID).unwrap();
    let first_id = first.id.unwrap();
    assert!(manager.delete_session(first_id).unwrap());
    assert!(!manager.delete_session(first_id).unwrap());

    let second = manager.create_session("two", DEFAULT_USER_ID).unwrap();
    assert!(second.id.unwrap() > first_id);
}

#[test]
fn unsaved_session_has_no_id() {
    let session = Session::new("draft", DEFAULT_USER_ID);
    assert!(session.id.is_none());
    assert!(session.conversation_history.is_empty());
}

#[test]
fn history_with_metadata_roundtrips_exactly() {
    let dir = TempDir::new().unwrap();
    let manager = SessionManager::new(store_at(&dir));
    let mut session = manager.create_session("meta", DEFAULT_USER_ID).unwrap();

    let mut metadata = std::collections::HashMap::new();
    metadata.insert("route".to_string(), serde_json::json!("QUERY_THEN_ANALYSIS"));
    metadata.insert("row_count".to_string(), serde_json::json!(42));
    manager
        .add_message_to_session(
            &mut session,
            MessageRole::Assistant,
            "Revenue rose 12% über Nacht 📈",
            Some(metadata),
        )
        .unwrap();

    let loaded = manager.get_session_by_id(session.id.unwrap()).unwrap().unwrap();
    let message = &loaded.conversation_history[0];
    assert_eq!(message.content, "Revenue rose 12% über Nacht 📈");
    assert_eq!(message.metadata["route"], serde_json::json!("QUERY_THEN_ANALYSIS"));
    assert_eq!(message.metadata["row_count"], serde_json::json!(42));
}
