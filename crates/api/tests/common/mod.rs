#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::extract::ws::Message;
use axum::http::{Method, Request, Response};
use axum::Router;
use http_body_util::BodyExt;
use tokio::sync::mpsc::UnboundedReceiver;
use tower::ServiceExt;

use homefix_api::config::ServerConfig;
use homefix_api::router::build_app_router;
use homefix_api::state::AppState;
use homefix_core::protocol::{InboundEvent, OutboundEvent};
use homefix_core::status::TechnicianStatus;
use homefix_core::types::Participant;
use homefix_gateway::InMemoryGateway;

/// Build a test `ServerConfig` with safe defaults and a short gateway bound.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:8081".to_string()],
        request_timeout_secs: 30,
        service_api_url: "http://collaborators.invalid/services".to_string(),
        technician_api_url: "http://collaborators.invalid/technicians".to_string(),
        booking_api_url: "http://collaborators.invalid/bookings".to_string(),
        gateway_timeout_ms: 200,
        otp_code: "123456".to_string(),
        heartbeat_interval_secs: 30,
    }
}

/// Collaborator records shared by most tests.
///
/// S1 is plumbing, S2 electrical; T1 is a plumber, T2 an electrician.
pub fn directory() -> InMemoryGateway {
    InMemoryGateway::new()
        .with_service("S1", "Plumbing")
        .with_service("S2", "Electrical")
        .with_technician("T1", "Plumbing")
        .with_technician("T2", "Electrical")
        .with_credential("T1", "$argon2id$v=19$hash-of-t1")
}

/// Wire an engine around `gateway`, keeping a handle for inspection.
pub fn build_state(gateway: InMemoryGateway) -> (AppState, Arc<InMemoryGateway>) {
    build_state_with(test_config(), gateway)
}

pub fn build_state_with(
    config: ServerConfig,
    gateway: InMemoryGateway,
) -> (AppState, Arc<InMemoryGateway>) {
    let gateway = Arc::new(gateway);
    let state = AppState::new(config, gateway.clone());
    (state, gateway)
}

/// Build the full application router with all middleware layers.
pub fn build_test_app(state: AppState) -> Router {
    build_app_router(state)
}

/// Connection id used for a participant registered by [`connect`].
pub fn conn_id(participant: &Participant) -> String {
    format!("conn-{}", participant.id)
}

/// Register a participant's channel the way the socket handler does,
/// consuming the greeting.
pub async fn connect(state: &AppState, participant: &Participant) -> UnboundedReceiver<Message> {
    let mut rx = state
        .registry
        .register(&participant.id, participant.role, &conn_id(participant))
        .await;
    state.choreographer.connected(participant).await;
    match next_event(&mut rx) {
        OutboundEvent::Response { .. } => rx,
        other => panic!("expected greeting, got {other:?}"),
    }
}

pub async fn disconnect(state: &AppState, participant: &Participant) {
    state
        .choreographer
        .disconnected(participant, &conn_id(participant))
        .await;
}

pub async fn activate(state: &AppState, technician_id: &str) {
    state
        .availability
        .set_status(technician_id, TechnicianStatus::Active)
        .await
        .expect("status update should succeed");
}

/// Route a raw JSON frame as if `sender` had sent it.
pub async fn send(state: &AppState, sender: &Participant, frame: serde_json::Value) {
    state
        .choreographer
        .handle_text(sender, &frame.to_string())
        .await;
}

pub async fn dispatch(state: &AppState, sender: &Participant, event: InboundEvent) {
    state.choreographer.handle(sender, event).await;
}

/// Pop the next queued event; panics if nothing was emitted.
pub fn next_event(rx: &mut UnboundedReceiver<Message>) -> OutboundEvent {
    match rx.try_recv() {
        Ok(Message::Text(text)) => {
            serde_json::from_str(text.as_str()).expect("emitted frame should be an OutboundEvent")
        }
        Ok(other) => panic!("expected a text frame, got {other:?}"),
        Err(e) => panic!("expected an event, channel was {e:?}"),
    }
}

pub fn assert_silent(rx: &mut UnboundedReceiver<Message>) {
    if let Ok(msg) = rx.try_recv() {
        panic!("expected no event, got {msg:?}");
    }
}

// ---------------------------------------------------------------------------
// HTTP helpers
// ---------------------------------------------------------------------------

pub async fn get(app: Router, uri: &str) -> Response<Body> {
    app.oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap()
}

pub async fn post_json(app: Router, uri: &str, body: serde_json::Value) -> Response<Body> {
    app.oneshot(
        Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
    )
    .await
    .unwrap()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}
