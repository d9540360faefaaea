use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{RwLock, mpsc};
use uuid::Uuid;

use parley_types::events::ServerEvent;
use parley_types::models::User;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinOutcome {
    /// First join from this connection
    Joined,
    /// The connection was already registered under another name
    Renamed,
    /// The connection is gone; nothing was registered
    Disconnected,
}

/// Owns every live connection and the user registry, and fans events out to them.
#[derive(Clone, Default)]
pub struct Dispatcher {
    inner: Arc<DispatcherInner>,
}

#[derive(Default)]
struct DispatcherInner {
    /// Per-connection send channels: conn_id -> sender
    connections: RwLock<HashMap<Uuid, mpsc::UnboundedSender<ServerEvent>>>,

    /// Joined users: conn_id -> display name
    users: RwLock<HashMap<Uuid, String>>,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new connection. Returns (conn_id, receiver).
    pub async fn register_connection(&self) -> (Uuid, mpsc::UnboundedReceiver<ServerEvent>) {
        let conn_id = Uuid::new_v4();
        let (tx, rx) = mpsc::unbounded_channel();
        self.inner.connections.write().await.insert(conn_id, tx);
        (conn_id, rx)
    }

    /// Send an event to every connection except those in `except`.
    pub async fn broadcast_except(&self, event: ServerEvent, except: &[Uuid]) {
        let connections = self.inner.connections.read().await;
        for (conn_id, tx) in connections.iter() {
            if !except.contains(conn_id) {
                let _ = tx.send(event.clone());
            }
        }
    }

    /// Send an event to every connection.
    pub async fn broadcast(&self, event: ServerEvent) {
        self.broadcast_except(event, &[]).await;
    }

    /// Send a targeted event to one connection. Returns false if it's gone.
    pub async fn send_to(&self, conn_id: Uuid, event: ServerEvent) -> bool {
        let connections = self.inner.connections.read().await;
        match connections.get(&conn_id) {
            Some(tx) => tx.send(event).is_ok(),
            None => false,
        }
    }

    /// Register (or rename) the user behind a connection and announce it.
    /// A connection that has already been dropped is never registered.
    pub async fn join(&self, conn_id: Uuid, display_name: String) -> JoinOutcome {
        let outcome = {
            // Hold the connection map so a concurrent disconnect can't slip in between
            let connections = self.inner.connections.read().await;
            if !connections.contains_key(&conn_id) {
                return JoinOutcome::Disconnected;
            }

            let previous = self
                .inner
                .users
                .write()
                .await
                .insert(conn_id, display_name.clone());
            match previous {
                Some(_) => JoinOutcome::Renamed,
                None => JoinOutcome::Joined,
            }
        };

        self.broadcast_except(
            ServerEvent::UserJoined {
                id: conn_id,
                display_name,
            },
            &[conn_id],
        )
        .await;
        self.broadcast(ServerEvent::UserList(self.users().await)).await;

        outcome
    }

    /// Drop a connection. If it had joined, the departure is announced and the
    /// removed user is returned.
    pub async fn disconnect(&self, conn_id: Uuid) -> Option<User> {
        self.inner.connections.write().await.remove(&conn_id);

        let display_name = self.inner.users.write().await.remove(&conn_id)?;

        self.broadcast(ServerEvent::UserLeft {
            id: conn_id,
            display_name: display_name.clone(),
        })
        .await;
        self.broadcast(ServerEvent::UserList(self.users().await)).await;

        Some(User {
            id: conn_id,
            display_name,
        })
    }

    pub async fn display_name(&self, conn_id: Uuid) -> Option<String> {
        self.inner.users.read().await.get(&conn_id).cloned()
    }

    /// Snapshot of joined users, sorted by display name then id.
    pub async fn users(&self) -> Vec<User> {
        let mut users: Vec<User> = self
            .inner
            .users
            .read()
            .await
            .iter()
            .map(|(id, name)| User {
                id: *id,
                display_name: name.clone(),
            })
            .collect();
        users.sort_by(|a, b| a.display_name.cmp(&b.display_name).then(a.id.cmp(&b.id)));
        users
    }

    pub async fn user_count(&self) -> usize {
        self.inner.users.read().await.len()
    }

    pub async fn connection_count(&self) -> usize {
        self.inner.connections.read().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drain(rx: &mut mpsc::UnboundedReceiver<ServerEvent>) -> Vec<ServerEvent> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    #[tokio::test]
    async fn join_announces_to_others_and_lists_to_all() {
        let dispatcher = Dispatcher::new();
        let (alice, mut alice_rx) = dispatcher.register_connection().await;
        let (_bob, mut bob_rx) = dispatcher.register_connection().await;

        assert_eq!(dispatcher.join(alice, "Alice".into()).await, JoinOutcome::Joined);
        assert_eq!(dispatcher.user_count().await, 1);

        let expected_list = ServerEvent::UserList(vec![User {
            id: alice,
            display_name: "Alice".into(),
        }]);
        assert_eq!(drain(&mut alice_rx), vec![expected_list.clone()]);
        assert_eq!(
            drain(&mut bob_rx),
            vec![
                ServerEvent::UserJoined {
                    id: alice,
                    display_name: "Alice".into()
                },
                expected_list,
            ]
        );
    }

    #[tokio::test]
    async fn rejoin_renames_without_growing_registry() {
        let dispatcher = Dispatcher::new();
        let (conn, _rx) = dispatcher.register_connection().await;

        assert_eq!(dispatcher.join(conn, "Alice".into()).await, JoinOutcome::Joined);
        assert_eq!(dispatcher.join(conn, "Alicia".into()).await, JoinOutcome::Renamed);
        assert_eq!(dispatcher.user_count().await, 1);
        assert_eq!(dispatcher.display_name(conn).await.as_deref(), Some("Alicia"));
    }

    #[tokio::test]
    async fn disconnect_removes_user_and_announces_departure() {
        let dispatcher = Dispatcher::new();
        let (alice, _alice_rx) = dispatcher.register_connection().await;
        let (_bob, mut bob_rx) = dispatcher.register_connection().await;
        dispatcher.join(alice, "Alice".into()).await;
        drain(&mut bob_rx);

        let removed = dispatcher.disconnect(alice).await;
        assert_eq!(removed.map(|u| u.display_name).as_deref(), Some("Alice"));
        assert_eq!(dispatcher.user_count().await, 0);
        assert_eq!(dispatcher.connection_count().await, 1);
        assert_eq!(
            drain(&mut bob_rx),
            vec![
                ServerEvent::UserLeft {
                    id: alice,
                    display_name: "Alice".into()
                },
                ServerEvent::UserList(vec![]),
            ]
        );
    }

    #[tokio::test]
    async fn join_after_disconnect_registers_nothing() {
        let dispatcher = Dispatcher::new();
        let (gone, _gone_rx) = dispatcher.register_connection().await;
        let (_bob, mut bob_rx) = dispatcher.register_connection().await;

        dispatcher.disconnect(gone).await;
        let outcome = dispatcher.join(gone, "Ghost".into()).await;

        assert_eq!(outcome, JoinOutcome::Disconnected);
        assert!(dispatcher.users().await.is_empty());
        assert_eq!(dispatcher.connection_count().await, 1);
        assert!(drain(&mut bob_rx).is_empty());
    }

    #[tokio::test]
    async fn disconnect_without_join_is_silent() {
        let dispatcher = Dispatcher::new();
        let (lurker, _lurker_rx) = dispatcher.register_connection().await;
        let (_other, mut other_rx) = dispatcher.register_connection().await;

        assert!(dispatcher.disconnect(lurker).await.is_none());
        assert!(drain(&mut other_rx).is_empty());
        assert_eq!(dispatcher.connection_count().await, 1);
    }

    #[tokio::test]
    async fn broadcast_except_skips_excluded() {
        let dispatcher = Dispatcher::new();
        let (a, mut a_rx) = dispatcher.register_connection().await;
        let (_b, mut b_rx) = dispatcher.register_connection().await;
        let (_c, mut c_rx) = dispatcher.register_connection().await;

        let event = ServerEvent::Typing {
            id: a,
            display_name: None,
            is_typing: true,
        };
        dispatcher.broadcast_except(event.clone(), &[a]).await;

        assert!(drain(&mut a_rx).is_empty());
        assert_eq!(drain(&mut b_rx), vec![event.clone()]);
        assert_eq!(drain(&mut c_rx), vec![event]);
    }

    #[tokio::test]
    async fn send_to_unknown_connection_reports_failure() {
        let dispatcher = Dispatcher::new();
        let delivered = dispatcher
            .send_to(Uuid::new_v4(), ServerEvent::UserList(vec![]))
            .await;
        assert!(!delivered);
    }

    #[tokio::test]
    async fn users_are_sorted_by_display_name() {
        let dispatcher = Dispatcher::new();
        for name in ["Carol", "Alice", "Bob"] {
            let (conn, _rx) = dispatcher.register_connection().await;
            dispatcher.join(conn, name.into()).await;
        }

        let names: Vec<String> = dispatcher
            .users()
            .await
            .into_iter()
            .map(|u| u.display_name)
            .collect();
        assert_eq!(names, ["Alice", "Bob", "Carol"]);
    }
}
