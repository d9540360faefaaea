use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A registered participant. `id` is the connection id assigned by the gateway,
/// so a refreshed browser tab shows up as a brand new user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub display_name: String,
}

/// A chat message as relayed to clients and as returned by the history endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: Uuid,
    /// Display name of the sender, or the connection id if it never joined.
    pub sender: String,
    pub sender_id: Uuid,
    pub body: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recipient_id: Option<Uuid>,
    #[serde(default)]
    pub is_private: bool,
    pub timestamp: DateTime<Utc>,
}

impl ChatMessage {
    /// Build a public message stamped with the current time.
    pub fn public(sender: String, sender_id: Uuid, body: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            sender,
            sender_id,
            body,
            recipient_id: None,
            is_private: false,
            timestamp: Utc::now(),
        }
    }

    /// Build a private message addressed to a single connection.
    pub fn private(sender: String, sender_id: Uuid, recipient_id: Uuid, body: String) -> Self {
        Self {
            recipient_id: Some(recipient_id),
            is_private: true,
            ..Self::public(sender, sender_id, body)
        }
    }
}
