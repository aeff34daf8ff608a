//! SQLite persistence for sessions.
//!
//! Each operation opens its own short-lived connection and releases it on
//! return, so a second process can read the same database file between our
//! operations without fighting a long-lived lock. Concurrent writes to the
//! same session id from two processes are last-writer-wins; the store does
//! not arbitrate beyond SQLite's own locking.

use crate::error::{Error, Result};
use crate::session::model::Session;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::{Path, PathBuf};

pub struct SessionStore {
    db_path: PathBuf,
}

impl SessionStore {
    /// Opens (or creates) the database at `db_path` and ensures the schema.
    pub fn new(db_path: impl Into<PathBuf>) -> Result<Self> {
        let store = Self {
            db_path: db_path.into(),
        };
        let conn = store.connect()?;
        Self::init_schema(&conn)?;
        Ok(store)
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    fn connect(&self) -> Result<Connection> {
        let conn = Connection::open(&self.db_path)?;
        conn.busy_timeout(std::time::Duration::from_secs(5))?;
        Ok(conn)
    }

    fn init_schema(conn: &Connection) -> Result<()> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS sessions (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id TEXT NOT NULL,
                title TEXT NOT NULL,
                created_at TEXT NOT NULL,
                last_activity TEXT NOT NULL,
                conversation_history TEXT NOT NULL
             );

             CREATE INDEX IF NOT EXISTS idx_user_sessions
                ON sessions(user_id, last_activity DESC);",
        )?;
        Ok(())
    }

    /// Saves a session. Inserts when `id` is `None` and populates the fresh
    /// id on the passed session; otherwise replaces title, last_activity,
    /// and history of the existing row (`user_id` and `created_at` are
    /// immutable after insert).
    pub fn save(&self, session: &mut Session) -> Result<()> {
        let conn = self.connect()?;
        let history = serde_json::to_string(&session.conversation_history)?;

        match session.id {
            None => {
                conn.execute(
                    "INSERT INTO sessions
                        (user_id, title, created_at, last_activity, conversation_history)
                     VALUES (?1, ?2, ?3, ?4, ?5)",
                    params![
                        session.user_id,
                        session.title,
                        session.created_at.to_rfc3339(),
                        session.last_activity.to_rfc3339(),
                        history,
                    ],
                )?;
                session.id = Some(conn.last_insert_rowid());
            }
            Some(id) => {
                conn.execute(
                    "UPDATE sessions
                     SET title = ?1, last_activity = ?2, conversation_history = ?3
                     WHERE id = ?4",
                    params![
                        session.title,
                        session.last_activity.to_rfc3339(),
                        history,
                        id,
                    ],
                )?;
            }
        }
        Ok(())
    }

    /// Loads the session with the given id, or `None` if no row matches.
    pub fn load(&self, session_id: i64) -> Result<Option<Session>> {
        let conn = self.connect()?;
        let row = conn
            .query_row(
                "SELECT id, user_id, title, created_at, last_activity, conversation_history
                 FROM sessions
                 WHERE id = ?1",
                params![session_id],
                Self::read_row,
            )
            .optional()?;

        row.map(Self::decode_row).transpose()
    }

    /// All sessions for `user_id`, most recently active first.
    pub fn load_all(&self, user_id: &str) -> Result<Vec<Session>> {
        let conn = self.connect()?;
        let mut stmt = conn.prepare(
            "SELECT id, user_id, title, created_at, last_activity, conversation_history
             FROM sessions
             WHERE user_id = ?1
             ORDER BY last_activity DESC",
        )?;

        let rows = stmt
            .query_map(params![user_id], Self::read_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        rows.into_iter().map(Self::decode_row).collect()
    }

    /// Removes the session if present. Returns `true` only when a row was
    /// actually deleted; deleting a missing id is a no-op returning `false`.
    pub fn delete(&self, session_id: i64) -> Result<bool> {
        let conn = self.connect()?;
        let changed = conn.execute("DELETE FROM sessions WHERE id = ?1", params![session_id])?;
        Ok(changed > 0)
    }

    fn read_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawSessionRow> {
        Ok(RawSessionRow {
            id: row.get(0)?,
            user_id: row.get(1)?,
            title: row.get(2)?,
            created_at: row.get(3)?,
            last_activity: row.get(4)?,
            conversation_history: row.get(5)?,
        })
    }

    fn decode_row(raw: RawSessionRow) -> Result<Session> {
        Ok(Session {
            id: Some(raw.id),
            user_id: raw.user_id,
            title: raw.title,
            created_at: parse_timestamp(&raw.created_at)?,
            last_activity: parse_timestamp(&raw.last_activity)?,
            conversation_history: serde_json::from_str(&raw.conversation_history)?,
        })
    }
}

struct RawSessionRow {
    id: i64,
    user_id: String,
    title: String,
    created_at: String,
    last_activity: String,
    conversation_history: String,
}

fn parse_timestamp(text: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(text)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(Error::from)
}
