use crate::Database;
use crate::models::MessageRow;
use anyhow::{Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use parley_types::models::ChatMessage;
use rusqlite::Connection;
use uuid::Uuid;

impl Database {
    // -- Messages --

    pub fn insert_message(&self, message: &ChatMessage) -> Result<()> {
        let recipient_id = message.recipient_id.map(|id| id.to_string());
        let created_at = message.timestamp.to_rfc3339_opts(SecondsFormat::Nanos, true);

        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO messages (id, sender, sender_id, body, recipient_id, is_private, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                rusqlite::params![
                    message.id.to_string(),
                    message.sender,
                    message.sender_id.to_string(),
                    message.body,
                    recipient_id,
                    message.is_private,
                    created_at,
                ],
            )?;
            Ok(())
        })
    }

    /// The newest `limit` public messages, oldest first.
    pub fn recent_messages(&self, limit: u32) -> Result<Vec<ChatMessage>> {
        let rows = self.with_conn(|conn| query_recent(conn, limit))?;
        rows.into_iter().map(MessageRow::into_message).collect()
    }
}

fn query_recent(conn: &Connection, limit: u32) -> Result<Vec<MessageRow>> {
    // Take the newest window by insertion order, then flip it back to chronological
    let mut stmt = conn.prepare(
        "SELECT id, sender, sender_id, body, recipient_id, is_private, created_at
         FROM (
             SELECT * FROM messages
             WHERE is_private = 0
             ORDER BY seq DESC
             LIMIT ?1
         )
         ORDER BY seq ASC",
    )?;

    let rows = stmt
        .query_map([limit], |row| {
            Ok(MessageRow {
                id: row.get(0)?,
                sender: row.get(1)?,
                sender_id: row.get(2)?,
                body: row.get(3)?,
                recipient_id: row.get(4)?,
                is_private: row.get(5)?,
                created_at: row.get(6)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(rows)
}

impl MessageRow {
    pub fn into_message(self) -> Result<ChatMessage> {
        let recipient_id = match self.recipient_id {
            Some(id) => Some(id.parse::<Uuid>().with_context(|| format!("corrupt recipient_id '{}'", id))?),
            None => None,
        };

        Ok(ChatMessage {
            id: self
                .id
                .parse::<Uuid>()
                .with_context(|| format!("corrupt message id '{}'", self.id))?,
            sender_id: self
                .sender_id
                .parse::<Uuid>()
                .with_context(|| format!("corrupt sender_id '{}' on message '{}'", self.sender_id, self.id))?,
            timestamp: DateTime::parse_from_rfc3339(&self.created_at)
                .with_context(|| format!("corrupt created_at '{}' on message '{}'", self.created_at, self.id))?
                .with_timezone(&Utc),
            sender: self.sender,
            body: self.body,
            recipient_id,
            is_private: self.is_private,
        })
    }
}
