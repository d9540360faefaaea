use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{ChatMessage, User};

/// Events sent FROM client TO server over the WebSocket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum ClientEvent {
    /// Register this connection under a display name
    Join(String),

    /// Post a message to everyone else
    SendMessage { body: String },

    /// Typing indicator on/off
    Typing(bool),

    /// Message for exactly one other connection
    PrivateMessage { recipient_id: Uuid, body: String },
}

impl ClientEvent {
    /// Short name used in logs.
    pub fn kind(&self) -> EventKind {
        match self {
            Self::Join(_) => EventKind::Join,
            Self::SendMessage { .. } => EventKind::SendMessage,
            Self::Typing(_) => EventKind::Typing,
            Self::PrivateMessage { .. } => EventKind::PrivateMessage,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Join,
    SendMessage,
    Typing,
    PrivateMessage,
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Join => "join",
            Self::SendMessage => "send_message",
            Self::Typing => "typing",
            Self::PrivateMessage => "private_message",
        };
        f.write_str(name)
    }
}

/// Events sent FROM server TO client over the WebSocket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum ServerEvent {
    /// First frame on every connection
    Ready { connection_id: Uuid },

    /// Someone registered a display name
    UserJoined { id: Uuid, display_name: String },

    /// A registered user disconnected
    UserLeft { id: Uuid, display_name: String },

    /// Full presence snapshot
    UserList(Vec<User>),

    /// A public message from another connection
    ReceiveMessage(ChatMessage),

    /// Another connection started or stopped typing
    Typing {
        id: Uuid,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        display_name: Option<String>,
        is_typing: bool,
    },

    /// A private message, delivered to the recipient and echoed to the sender
    PrivateMessage(ChatMessage),
}
