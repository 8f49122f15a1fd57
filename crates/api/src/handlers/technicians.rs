//! Handlers for technician availability.

use axum::extract::State;
use axum::Json;
use homefix_core::protocol::StatusUpdate;
use homefix_core::types::ParticipantId;
use serde::Serialize;

use crate::error::AppResult;
use crate::response::DataResponse;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct StatusUpdated {
    pub message: &'static str,
    pub technician_id: ParticipantId,
    pub status: &'static str,
}

// ---------------------------------------------------------------------------
// POST /technicians/status
// ---------------------------------------------------------------------------

/// Mark a technician active or inactive.
///
/// Independent of the technician's socket: a technician may go active
/// before connecting.
pub async fn update_status(
    State(state): State<AppState>,
    Json(input): Json<StatusUpdate>,
) -> AppResult<Json<DataResponse<StatusUpdated>>> {
    let (technician_id, status) = state.choreographer.apply_status_update(input).await?;

    Ok(Json(DataResponse {
        data: StatusUpdated {
            message: "Status updated",
            technician_id,
            status: status.as_str(),
        },
    }))
}

// ---------------------------------------------------------------------------
// GET /technicians/active
// ---------------------------------------------------------------------------

/// Active technicians in the order the match engine scans them.
pub async fn list_active(State(state): State<AppState>) -> Json<DataResponse<Vec<ParticipantId>>> {
    Json(DataResponse {
        data: state.availability.active_ids().await,
    })
}
