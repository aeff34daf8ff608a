//! Session and message domain types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// User id used when the caller does not specify one. Sessions are
/// partitioned per user for listing.
pub const DEFAULT_USER_ID: &str = "default_user";

/// Role of a message in a conversation turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
}

impl MessageRole {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

/// One turn in a session's conversation history.
///
/// `metadata` is an open key/value map carried through verbatim; the core
/// never interprets it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub timestamp: DateTime<Utc>,
    pub role: MessageRole,
    pub content: String,
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,
}

/// A persisted conversation thread.
///
/// `id` is `None` until the first save; the store assigns a fresh,
/// strictly-increasing integer id and it is stable thereafter. A session
/// without an id exists only in memory and is invisible to listing/lookup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub id: Option<i64>,
    pub user_id: String,
    pub title: String,
    pub created_at: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
    pub conversation_history: Vec<Message>,
}

impl Session {
    /// A fresh, not-yet-persisted session with empty history.
    pub fn new(title: impl Into<String>, user_id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: None,
            user_id: user_id.into(),
            title: title.into(),
            created_at: now,
            last_activity: now,
            conversation_history: Vec::new(),
        }
    }

    /// Appends a message with a fresh timestamp and touches `last_activity`.
    pub fn add_message(
        &mut self,
        role: MessageRole,
        content: impl Into<String>,
        metadata: Option<HashMap<String, serde_json::Value>>,
    ) {
        let now = Utc::now();
        self.conversation_history.push(Message {
            timestamp: now,
            role,
            content: content.into(),
            metadata: metadata.unwrap_or_default(),
        });
        self.last_activity = now;
    }

    /// Replaces the history with an empty sequence. The session itself and
    /// its id are untouched.
    pub fn clear_history(&mut self) {
        self.conversation_history.clear();
    }

    pub fn message_count(&self) -> usize {
        self.conversation_history.len()
    }
}
