pub mod health;
pub mod technicians;

use axum::routing::get;
use axum::Router;

use crate::state::AppState;
use crate::ws;

/// Build the `/api/v1` route tree.
///
/// ```text
/// /ws?participant_id=..&role=..     WebSocket (customers and technicians)
///
/// /technicians/status               set availability (POST)
/// /technicians/active               active technician ids (GET)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/ws", get(ws::ws_handler))
        .nest("/technicians", technicians::router())
}
