use crate::booking::BookingState;

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    #[error("Invalid status: {0}")]
    InvalidStatus(String),

    #[error("Event {event} not permitted for customer {customer_id} in state {state:?}")]
    InvalidTransition {
        customer_id: String,
        state: Option<BookingState>,
        event: &'static str,
    },

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Internal error: {0}")]
    Internal(String),
}
