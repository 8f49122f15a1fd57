//! Route definitions for technician availability.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::technicians;
use crate::state::AppState;

/// Routes mounted at `/technicians`.
///
/// ```text
/// POST  /status  -> update_status
/// GET   /active  -> list_active
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/status", post(technicians::update_status))
        .route("/active", get(technicians::list_active))
}
