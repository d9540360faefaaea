use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info};
use uuid::Uuid;

use parley_db::Database;
use parley_types::events::{ClientEvent, ServerEvent};
use parley_types::models::ChatMessage;

use crate::dispatcher::{Dispatcher, JoinOutcome};

#[derive(Debug, Error)]
pub enum RelayError {
    #[error("display name must not be empty")]
    EmptyDisplayName,

    #[error("failed to persist message {id}: {cause:#}")]
    Persist { id: Uuid, cause: anyhow::Error },

    #[error("store task failed: {0}")]
    StoreTask(#[from] tokio::task::JoinError),
}

/// Applies client events to the registry and the store, then fans out the results.
#[derive(Clone)]
pub struct Relay {
    dispatcher: Dispatcher,
    db: Arc<Database>,
}

impl Relay {
    pub fn new(dispatcher: Dispatcher, db: Arc<Database>) -> Self {
        Self { dispatcher, db }
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Route one inbound event from `conn_id` to its handler.
    pub async fn dispatch(&self, conn_id: Uuid, event: ClientEvent) -> Result<(), RelayError> {
        debug!("{} from {}", event.kind(), conn_id);

        match event {
            ClientEvent::Join(display_name) => self.join(conn_id, display_name).await,
            ClientEvent::SendMessage { body } => self.send_message(conn_id, body).await,
            ClientEvent::Typing(is_typing) => {
                self.typing(conn_id, is_typing).await;
                Ok(())
            }
            ClientEvent::PrivateMessage { recipient_id, body } => {
                self.private_message(conn_id, recipient_id, body).await;
                Ok(())
            }
        }
    }

    async fn join(&self, conn_id: Uuid, display_name: String) -> Result<(), RelayError> {
        let display_name = display_name.trim();
        if display_name.is_empty() {
            return Err(RelayError::EmptyDisplayName);
        }

        match self.dispatcher.join(conn_id, display_name.to_string()).await {
            JoinOutcome::Joined => info!(
                "{} joined as {} ({} users online)",
                conn_id,
                display_name,
                self.dispatcher.user_count().await
            ),
            JoinOutcome::Renamed => info!("{} renamed to {}", conn_id, display_name),
            JoinOutcome::Disconnected => debug!("{} joined after disconnecting, ignored", conn_id),
        }
        Ok(())
    }

    /// Persist, then broadcast to everyone but the sender. The broadcast goes out
    /// even if the store rejects the write; the store error is still returned.
    async fn send_message(&self, conn_id: Uuid, body: String) -> Result<(), RelayError> {
        let message = ChatMessage::public(self.sender_name(conn_id).await, conn_id, body);

        let db = self.db.clone();
        let record = message.clone();
        let persisted = tokio::task::spawn_blocking(move || db.insert_message(&record)).await;

        let id = message.id;
        self.dispatcher
            .broadcast_except(ServerEvent::ReceiveMessage(message), &[conn_id])
            .await;

        persisted?.map_err(|cause| RelayError::Persist { id, cause })
    }

    async fn typing(&self, conn_id: Uuid, is_typing: bool) {
        let display_name = self.dispatcher.display_name(conn_id).await;
        self.dispatcher
            .broadcast_except(
                ServerEvent::Typing {
                    id: conn_id,
                    display_name,
                    is_typing,
                },
                &[conn_id],
            )
            .await;
    }

    /// Deliver to the recipient and echo to the sender. A stale recipient is a no-op
    /// apart from the echo.
    async fn private_message(&self, conn_id: Uuid, recipient_id: Uuid, body: String) {
        let message =
            ChatMessage::private(self.sender_name(conn_id).await, conn_id, recipient_id, body);

        if recipient_id != conn_id
            && !self
                .dispatcher
                .send_to(recipient_id, ServerEvent::PrivateMessage(message.clone()))
                .await
        {
            debug!("private message from {} to unknown connection {}", conn_id, recipient_id);
        }

        self.dispatcher
            .send_to(conn_id, ServerEvent::PrivateMessage(message))
            .await;
    }

    async fn sender_name(&self, conn_id: Uuid) -> String {
        self.dispatcher
            .display_name(conn_id)
            .await
            .unwrap_or_else(|| conn_id.to_string())
    }
}
