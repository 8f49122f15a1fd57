//! Collaborator gateway.
//!
//! The dispatch engine never talks to the service catalogue, technician
//! directory or booking store directly; it goes through the
//! [`CollaboratorGateway`] trait. [`HttpGateway`] is the production
//! implementation; tests substitute an in-memory one.

pub mod error;
pub mod http;
pub mod memory;

use async_trait::async_trait;
use homefix_core::types::{BookingId, ParticipantId, ServiceId};

pub use error::GatewayError;
pub use http::{GatewayEndpoints, HttpGateway};
pub use memory::InMemoryGateway;

/// A booking to be persisted once a technician has been matched.
#[derive(Debug, Clone, PartialEq)]
pub struct NewBooking {
    pub customer_id: ParticipantId,
    pub technician_id: ParticipantId,
    pub service_id: ServiceId,
    pub address: String,
    pub latitude: f64,
    pub longitude: f64,
}

/// Narrow request/response interface to the external stores.
///
/// Implementations report a missing record as [`GatewayError::NotFound`] so
/// callers can tell "does not exist" apart from "could not ask".
#[async_trait]
pub trait CollaboratorGateway: Send + Sync {
    /// Category of the service with the given id.
    async fn service_category(&self, service_id: &str) -> Result<String, GatewayError>;

    /// Category the technician is qualified for.
    async fn technician_category(&self, technician_id: &str) -> Result<String, GatewayError>;

    /// Hashed credential of the technician, used by the OTP side-flow.
    async fn technician_credential(&self, technician_id: &str) -> Result<String, GatewayError>;

    /// Persist a booking and return its identifier.
    async fn create_booking(&self, booking: &NewBooking) -> Result<BookingId, GatewayError>;
}
