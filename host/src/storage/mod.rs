//! StorageManager (§4.14): persists conversation history keyed by
//! `(agent_name, session_id)`. Grounded on the teacher's
//! `agent/src/db/{mod,schema,conversations,messages}.rs`, collapsed from a
//! synthetic-UUID conversation table to one keyed by the caller-supplied
//! pair, since sessions here are not created through this API — they're
//! named by whoever calls `run_agent`.

pub mod messages;
mod schema;

pub use messages::{MessageRole, StoredMessage, ToolCallRecord};

use anyhow::{Context, Result};
use chrono::Utc;
use rusqlite::Connection;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    pub fn open() -> Result<Self> {
        Self::open_at(Self::default_path()?)
    }

    pub fn open_at(path: PathBuf) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create directory: {parent:?}"))?;
        }

        let conn = Connection::open(&path).with_context(|| format!("failed to open database at {path:?}"))?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;

        let db = Self { conn: Arc::new(Mutex::new(conn)) };
        {
            let conn = db.conn.lock().unwrap();
            schema::create_tables(&conn)?;
        }

        tracing::info!(?path, "storage database opened");
        Ok(db)
    }

    pub fn default_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir().context("could not determine config directory")?;
        Ok(config_dir.join("mcp-host").join("history.db"))
    }

    fn ensure_session(&self, conn: &Connection, agent_name: &str, session_id: &str) -> Result<()> {
        let now = Utc::now().to_rfc3339();
        conn.execute(
            "INSERT OR IGNORE INTO sessions (agent_name, session_id, created_at, updated_at) VALUES (?1, ?2, ?3, ?3)",
            (agent_name, session_id, &now),
        )?;
        Ok(())
    }

    /// Empty vec if no history has ever been recorded for this session.
    pub fn load_history(&self, agent_name: &str, session_id: &str) -> Result<Vec<StoredMessage>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT role, content, tool_calls FROM messages
             WHERE agent_name = ?1 AND session_id = ?2
             ORDER BY created_at ASC",
        )?;

        let messages = stmt
            .query_map((agent_name, session_id), |row| {
                let role_str: String = row.get(0)?;
                let content: String = row.get(1)?;
                let tool_calls_str: Option<String> = row.get(2)?;
                Ok((role_str, content, tool_calls_str))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        messages
            .into_iter()
            .map(|(role_str, content, tool_calls_str)| {
                Ok(StoredMessage {
                    role: role_str.parse()?,
                    content,
                    tool_calls: tool_calls_str
                        .map(|s| serde_json::from_str(&s))
                        .transpose()?
                        .unwrap_or_default(),
                })
            })
            .collect()
    }

    /// Append-only: called once per completed turn. Not transactional
    /// across a turn — a crash mid-turn simply never calls this, so the
    /// turn's tail is dropped rather than partially persisted.
    pub fn append_messages(&self, agent_name: &str, session_id: &str, messages: &[StoredMessage]) -> Result<()> {
        if messages.is_empty() {
            return Ok(());
        }

        let mut conn = self.conn.lock().unwrap();
        self.ensure_session(&conn, agent_name, session_id)?;

        let tx = conn.transaction()?;
        let now = Utc::now().to_rfc3339();
        for message in messages {
            let tool_calls_json = if message.tool_calls.is_empty() {
                None
            } else {
                Some(serde_json::to_string(&message.tool_calls)?)
            };
            tx.execute(
                "INSERT INTO messages (id, agent_name, session_id, role, content, tool_calls, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                (
                    Uuid::new_v4().to_string(),
                    agent_name,
                    session_id,
                    message.role.to_string(),
                    &message.content,
                    &tool_calls_json,
                    &now,
                ),
            )?;
        }
        tx.execute(
            "UPDATE sessions SET updated_at = ?1 WHERE agent_name = ?2 AND session_id = ?3",
            (&now, agent_name, session_id),
        )?;
        tx.commit()?;
        Ok(())
    }

    pub fn delete_history(&self, agent_name: &str, session_id: &str) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "DELETE FROM sessions WHERE agent_name = ?1 AND session_id = ?2",
            (agent_name, session_id),
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn test_db() -> Database {
        let dir = tempdir().unwrap();
        Database::open_at(dir.path().join("test.db")).unwrap()
    }

    #[test]
    fn empty_history_for_unknown_session() {
        let db = test_db();
        assert!(db.load_history("agent", "session").unwrap().is_empty());
    }

    #[test]
    fn append_then_load_round_trips() {
        let db = test_db();
        db.append_messages("agent", "s1", &[StoredMessage::user("hi"), StoredMessage::assistant("hello")]).unwrap();

        let history = db.load_history("agent", "s1").unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].content, "hi");
        assert_eq!(history[1].content, "hello");
    }

    #[test]
    fn delete_history_removes_messages() {
        let db = test_db();
        db.append_messages("agent", "s1", &[StoredMessage::user("hi")]).unwrap();
        db.delete_history("agent", "s1").unwrap();
        assert!(db.load_history("agent", "s1").unwrap().is_empty());
    }

    #[test]
    fn sessions_are_independent() {
        let db = test_db();
        db.append_messages("agent", "s1", &[StoredMessage::user("one")]).unwrap();
        db.append_messages("agent", "s2", &[StoredMessage::user("two")]).unwrap();

        assert_eq!(db.load_history("agent", "s1").unwrap().len(), 1);
        assert_eq!(db.load_history("agent", "s2").unwrap().len(), 1);
    }
}
