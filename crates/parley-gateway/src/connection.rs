use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use axum::body::Bytes;
use axum::extract::ws::{Message, WebSocket};
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tracing::{error, info, warn};
use uuid::Uuid;

use parley_types::events::{ClientEvent, ServerEvent};

use crate::relay::{Relay, RelayError};

/// Default heartbeat interval: the server sends a Ping every 15 seconds.
pub const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(15);

/// Consecutive unanswered Pings before the connection is dropped.
const MAX_MISSED_HEARTBEATS: u8 = 2;

/// Drive one WebSocket from upgrade to disconnect.
pub async fn handle_connection(socket: WebSocket, relay: Relay, heartbeat_interval: Duration) {
    let (mut sender, receiver) = socket.split();
    let dispatcher = relay.dispatcher().clone();

    let (conn_id, events_rx) = dispatcher.register_connection().await;
    info!(
        "{} connected to gateway ({} connections)",
        conn_id,
        dispatcher.connection_count().await
    );

    // Anything broadcast before Ready is flushed stays queued in events_rx
    let ready = ServerEvent::Ready {
        connection_id: conn_id,
    };
    if send_event(&mut sender, &ready).await.is_ok() {
        run_connection_loop(sender, receiver, relay, conn_id, events_rx, heartbeat_interval).await;
    }

    if let Some(user) = dispatcher.disconnect(conn_id).await {
        info!("{} ({}) left", user.display_name, conn_id);
    }
    info!(
        "{} disconnected from gateway ({} connections)",
        conn_id,
        dispatcher.connection_count().await
    );
}

async fn run_connection_loop(
    mut sender: SplitSink<WebSocket, Message>,
    mut receiver: SplitStream<WebSocket>,
    relay: Relay,
    conn_id: Uuid,
    mut events_rx: tokio::sync::mpsc::UnboundedReceiver<ServerEvent>,
    heartbeat_interval: Duration,
) {
    let pong_received = Arc::new(AtomicBool::new(true));
    let pong_flag_send = pong_received.clone();
    let pong_flag_recv = pong_received;

    // Forward queued events -> client, with heartbeat
    let mut send_task = tokio::spawn(async move {
        let mut heartbeat = tokio::time::interval(heartbeat_interval);
        heartbeat.tick().await;
        let mut missed_heartbeats: u8 = 0;

        loop {
            tokio::select! {
                event = events_rx.recv() => {
                    let Some(event) = event else { break };
                    if send_event(&mut sender, &event).await.is_err() {
                        break;
                    }
                }
                _ = heartbeat.tick() => {
                    if pong_flag_send.swap(false, Ordering::Acquire) {
                        missed_heartbeats = 0;
                    } else {
                        missed_heartbeats += 1;
                        if missed_heartbeats >= MAX_MISSED_HEARTBEATS {
                            warn!("{} heartbeat timeout (missed {} pongs), dropping connection", conn_id, missed_heartbeats);
                            break;
                        }
                    }
                    if sender.send(Message::Ping(Bytes::new())).await.is_err() {
                        break;
                    }
                }
            }
        }
    });

    // Read events from client
    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = receiver.next().await {
            match msg {
                Message::Text(text) => match serde_json::from_str::<ClientEvent>(&text) {
                    Ok(event) => {
                        if let Err(e) = relay.dispatch(conn_id, event).await {
                            log_relay_error(conn_id, &e);
                        }
                    }
                    Err(e) => {
                        let raw = text.as_str();
                        warn!(
                            "{} bad event: {} -- raw: {}",
                            conn_id,
                            e,
                            raw.chars().take(200).collect::<String>()
                        );
                    }
                },
                Message::Pong(_) => {
                    pong_flag_recv.store(true, Ordering::Release);
                }
                Message::Close(_) => break,
                _ => {}
            }
        }
    });

    // Wait for either task to finish, then for the other to wind down, so no
    // event from this connection is still in flight when it deregisters
    tokio::select! {
        _ = &mut send_task => {
            recv_task.abort();
            let _ = recv_task.await;
        }
        _ = &mut recv_task => {
            send_task.abort();
            let _ = send_task.await;
        }
    }
}

async fn send_event(
    sender: &mut SplitSink<WebSocket, Message>,
    event: &ServerEvent,
) -> Result<(), axum::Error> {
    let text = match serde_json::to_string(event) {
        Ok(text) => text,
        Err(e) => {
            error!("failed to encode {:?}: {}", event, e);
            return Ok(());
        }
    };
    sender.send(Message::Text(text.into())).await
}

fn log_relay_error(conn_id: Uuid, err: &RelayError) {
    match err {
        RelayError::EmptyDisplayName => warn!("{} rejected: {}", conn_id, err),
        RelayError::Persist { .. } | RelayError::StoreTask(_) => error!("{}: {}", conn_id, err),
    }
}
