//! Dispatch coordination engine.
//!
//! Holds the technician availability index, the match engine, the booking
//! session table and the choreographer that routes inbound real-time events
//! between customers and technicians.

pub mod availability;
pub mod choreographer;
pub mod locations;
pub mod matcher;
pub mod sessions;

use std::future::Future;
use std::time::Duration;

use homefix_gateway::GatewayError;

pub use availability::AvailabilityIndex;
pub use choreographer::{Choreographer, DispatchSettings};
pub use locations::LocationBook;
pub use matcher::MatchEngine;
pub use sessions::SessionTable;

/// Run a collaborator call, treating an overrun of `limit` as a failure.
pub(crate) async fn bounded<T>(
    limit: Duration,
    call: impl Future<Output = Result<T, GatewayError>>,
) -> Result<T, GatewayError> {
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result,
        Err(_) => Err(GatewayError::Timeout(limit)),
    }
}
