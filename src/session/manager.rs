//! High-level session lifecycle operations.
//!
//! The manager is the only writer of session business logic; everything it
//! does ends in a `SessionStore::save`. Store errors propagate unchanged;
//! the interactive loop is the recovery boundary.

use crate::error::Result;
use crate::session::model::{MessageRole, Session};
use crate::session::store::SessionStore;
use chrono::Utc;
use std::collections::HashMap;

pub struct SessionManager {
    store: SessionStore,
}

impl SessionManager {
    pub fn new(store: SessionStore) -> Self {
        Self { store }
    }

    /// Creates and persists a new session; the returned session carries its
    /// freshly assigned id.
    pub fn create_session(&self, title: &str, user_id: &str) -> Result<Session> {
        let mut session = Session::new(title, user_id);
        self.store.save(&mut session)?;
        Ok(session)
    }

    pub fn get_all_sessions(&self, user_id: &str) -> Result<Vec<Session>> {
        self.store.load_all(user_id)
    }

    pub fn get_session_by_id(&self, session_id: i64) -> Result<Option<Session>> {
        self.store.load(session_id)
    }

    pub fn delete_session(&self, session_id: i64) -> Result<bool> {
        self.store.delete(session_id)
    }

    /// Appends a message to the session's in-memory history and persists the
    /// whole session. This is the only path by which history grows; the
    /// passed session is mutated in place so the caller sees the new message
    /// without re-fetching.
    pub fn add_message_to_session(
        &self,
        session: &mut Session,
        role: MessageRole,
        content: &str,
        metadata: Option<HashMap<String, serde_json::Value>>,
    ) -> Result<()> {
        session.add_message(role, content, metadata);
        self.store.save(session)
    }

    /// Touches `last_activity` and persists, without adding a message.
    pub fn update_session_activity(&self, session: &mut Session) -> Result<()> {
        session.last_activity = Utc::now();
        self.store.save(session)
    }
}
