use std::collections::HashMap;

use axum::body::Bytes;
use axum::extract::ws::Message;
use homefix_core::protocol::OutboundEvent;
use homefix_core::status::Role;
use homefix_core::types::{ParticipantId, Timestamp};
use tokio::sync::{mpsc, RwLock};

/// Channel sender half for pushing messages to a WebSocket connection.
pub type WsSender = mpsc::UnboundedSender<Message>;

/// The live channel currently bound to a participant.
pub struct Connection {
    /// Generated per socket; lets a closing socket tell whether it still
    /// owns the mapping after its participant has reconnected.
    pub conn_id: String,
    pub role: Role,
    /// Channel sender for outbound messages to this connection.
    pub sender: WsSender,
    pub connected_at: Timestamp,
}

/// Maps participant ids to their live channel.
///
/// The only source of truth for "is this participant reachable". Thread-safe
/// via interior `RwLock`; designed to be wrapped in `Arc` and shared.
pub struct ConnectionRegistry {
    connections: RwLock<HashMap<ParticipantId, Connection>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self {
            connections: RwLock::new(HashMap::new()),
        }
    }

    /// Bind `participant_id` to a fresh channel, replacing any previous one.
    ///
    /// Returns the receiver half so the caller can forward messages to the
    /// WebSocket sink.
    pub async fn register(
        &self,
        participant_id: &str,
        role: Role,
        conn_id: &str,
    ) -> mpsc::UnboundedReceiver<Message> {
        let (tx, rx) = mpsc::unbounded_channel();
        let conn = Connection {
            conn_id: conn_id.to_string(),
            role,
            sender: tx,
            connected_at: chrono::Utc::now(),
        };
        let previous = self
            .connections
            .write()
            .await
            .insert(participant_id.to_string(), conn);
        if let Some(previous) = previous {
            tracing::info!(
                participant_id,
                old_conn_id = %previous.conn_id,
                conn_id,
                "Participant reconnected, replacing channel"
            );
        }
        rx
    }

    /// Remove the mapping if it still belongs to `conn_id`.
    ///
    /// Returns `true` when a mapping was removed.
    pub async fn unregister(&self, participant_id: &str, conn_id: &str) -> bool {
        let mut conns = self.connections.write().await;
        match conns.get(participant_id) {
            Some(conn) if conn.conn_id == conn_id => {
                conns.remove(participant_id);
                true
            }
            _ => false,
        }
    }

    /// Whether `conn_id` is the channel currently bound to `participant_id`.
    pub async fn is_current(&self, participant_id: &str, conn_id: &str) -> bool {
        self.connections
            .read()
            .await
            .get(participant_id)
            .is_some_and(|conn| conn.conn_id == conn_id)
    }

    /// Sender for the participant's live channel, if connected.
    pub async fn lookup(&self, participant_id: &str) -> Option<WsSender> {
        self.connections
            .read()
            .await
            .get(participant_id)
            .map(|conn| conn.sender.clone())
    }

    /// Serialize `event` and push it to `participant_id`.
    ///
    /// An unreachable participant is not an error for the caller: the event
    /// is dropped and logged. Returns whether the event was queued.
    pub async fn send(&self, participant_id: &str, event: &OutboundEvent) -> bool {
        let text = match event.to_json() {
            Ok(text) => text,
            Err(e) => {
                tracing::error!(error = %e, event = event.name(), "Failed to encode event");
                return false;
            }
        };

        let Some(sender) = self.lookup(participant_id).await else {
            tracing::warn!(participant_id, event = event.name(), "Participant unreachable, event dropped");
            return false;
        };

        if sender.send(Message::Text(text.into())).is_err() {
            tracing::warn!(participant_id, event = event.name(), "Channel closed, event dropped");
            return false;
        }
        tracing::debug!(participant_id, event = event.name(), "Event emitted");
        true
    }

    pub async fn connection_count(&self) -> usize {
        self.connections.read().await.len()
    }

    /// Send a Close frame to every connection, then clear the map.
    ///
    /// Used during graceful shutdown to notify all clients before the
    /// server stops.
    pub async fn shutdown_all(&self) {
        let mut conns = self.connections.write().await;
        let count = conns.len();
        for conn in conns.values() {
            let _ = conn.sender.send(Message::Close(None));
        }
        conns.clear();
        tracing::info!(count, "Closed all WebSocket connections");
    }

    /// Send a Ping frame to every connected participant.
    pub async fn ping_all(&self) {
        let conns = self.connections.read().await;
        for conn in conns.values() {
            let _ = conn.sender.send(Message::Ping(Bytes::new()));
        }
    }
}

impl Default for ConnectionRegistry {
    fn default() -> Self {
        Self::new()
    }
}
