use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::response::IntoResponse;
use futures::{SinkExt, StreamExt};
use homefix_core::error::CoreError;
use homefix_core::status::Role;
use homefix_core::types::Participant;
use serde::Deserialize;

use crate::engine::Choreographer;
use crate::error::AppResult;
use crate::state::AppState;

/// Query string identifying who is connecting.
#[derive(Debug, Deserialize)]
pub struct ConnectParams {
    pub participant_id: Option<String>,
    pub role: Option<String>,
}

impl ConnectParams {
    fn into_participant(self) -> Result<Participant, CoreError> {
        let id = self
            .participant_id
            .filter(|id| !id.trim().is_empty())
            .ok_or(CoreError::MissingField("participant_id"))?;
        let role = self
            .role
            .ok_or(CoreError::MissingField("role"))?
            .parse::<Role>()?;
        Ok(Participant { id, role })
    }
}

/// HTTP handler that upgrades the connection to WebSocket.
///
/// The participant is identified before the upgrade so a bad query string
/// is answered with a plain 400.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Query(params): Query<ConnectParams>,
    State(state): State<AppState>,
) -> AppResult<impl IntoResponse> {
    let participant = params.into_participant()?;
    let choreographer = Arc::clone(&state.choreographer);
    Ok(ws.on_upgrade(move |socket| handle_socket(socket, choreographer, participant)))
}

/// Manage a single WebSocket connection after upgrade.
///
/// Splits the socket into a sink (outbound) and stream (inbound), then:
///   1. Registers the participant with the connection registry.
///   2. Spawns a sender task that forwards messages from the registry channel.
///   3. Routes inbound text frames through the choreographer.
///   4. Cleans up on disconnect.
async fn handle_socket(socket: WebSocket, choreographer: Arc<Choreographer>, participant: Participant) {
    let conn_id = uuid::Uuid::new_v4().to_string();
    tracing::info!(
        conn_id = %conn_id,
        participant_id = %participant.id,
        role = %participant.role,
        "WebSocket connected"
    );

    let mut rx = choreographer
        .registry()
        .register(&participant.id, participant.role, &conn_id)
        .await;
    choreographer.connected(&participant).await;

    let (mut sink, mut stream) = socket.split();

    let sender_conn_id = conn_id.clone();
    let send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if sink.send(msg).await.is_err() {
                tracing::debug!(conn_id = %sender_conn_id, "WebSocket sink closed");
                break;
            }
        }
    });

    while let Some(result) = stream.next().await {
        match result {
            Ok(Message::Text(text)) => {
                choreographer.handle_text(&participant, text.as_str()).await;
            }
            Ok(Message::Close(_)) => break,
            Ok(Message::Pong(_)) => {
                tracing::trace!(conn_id = %conn_id, "Pong received");
            }
            Ok(_) => {
                tracing::debug!(conn_id = %conn_id, "Ignoring non-text frame");
            }
            Err(e) => {
                tracing::debug!(conn_id = %conn_id, error = %e, "WebSocket receive error");
                break;
            }
        }
    }

    choreographer.disconnected(&participant, &conn_id).await;
    send_task.abort();
    tracing::info!(conn_id = %conn_id, participant_id = %participant.id, "WebSocket disconnected");
}
