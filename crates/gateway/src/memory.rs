//! In-memory [`CollaboratorGateway`] for local runs and tests.
//!
//! Records are registered with the builder methods; failures and latency can
//! be scripted to exercise the engine's degraded paths.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use homefix_core::types::BookingId;

use crate::{CollaboratorGateway, GatewayError, NewBooking};

#[derive(Default)]
pub struct InMemoryGateway {
    service_categories: HashMap<String, String>,
    technician_categories: HashMap<String, String>,
    credentials: HashMap<String, String>,
    latency: Option<Duration>,
    fail_service_lookups: bool,
    fail_bookings: bool,
    bookings: Mutex<Vec<NewBooking>>,
}

impl InMemoryGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_service(mut self, service_id: &str, category: &str) -> Self {
        self.service_categories
            .insert(service_id.to_string(), category.to_string());
        self
    }

    pub fn with_technician(mut self, technician_id: &str, category: &str) -> Self {
        self.technician_categories
            .insert(technician_id.to_string(), category.to_string());
        self
    }

    pub fn with_credential(mut self, technician_id: &str, hashed_password: &str) -> Self {
        self.credentials
            .insert(technician_id.to_string(), hashed_password.to_string());
        self
    }

    /// Delay every call by `latency` before answering.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Answer service lookups with a 503 instead of a record.
    pub fn failing_service_lookups(mut self) -> Self {
        self.fail_service_lookups = true;
        self
    }

    /// Reject every booking creation with a 500.
    pub fn failing_bookings(mut self) -> Self {
        self.fail_bookings = true;
        self
    }

    /// Bookings persisted so far, in creation order.
    pub fn bookings(&self) -> Vec<NewBooking> {
        self.bookings
            .lock()
            .map(|b| b.clone())
            .unwrap_or_default()
    }

    async fn simulate_latency(&self) {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
    }

    fn lookup(
        map: &HashMap<String, String>,
        entity: &'static str,
        id: &str,
    ) -> Result<String, GatewayError> {
        map.get(id).cloned().ok_or_else(|| GatewayError::NotFound {
            entity,
            id: id.to_string(),
        })
    }
}

#[async_trait]
impl CollaboratorGateway for InMemoryGateway {
    async fn service_category(&self, service_id: &str) -> Result<String, GatewayError> {
        self.simulate_latency().await;
        if self.fail_service_lookups {
            return Err(GatewayError::Api {
                status: 503,
                body: "service catalogue unavailable".into(),
            });
        }
        Self::lookup(&self.service_categories, "Service", service_id)
    }

    async fn technician_category(&self, technician_id: &str) -> Result<String, GatewayError> {
        self.simulate_latency().await;
        Self::lookup(&self.technician_categories, "Technician", technician_id)
    }

    async fn technician_credential(&self, technician_id: &str) -> Result<String, GatewayError> {
        self.simulate_latency().await;
        Self::lookup(&self.credentials, "Technician", technician_id)
    }

    async fn create_booking(&self, booking: &NewBooking) -> Result<BookingId, GatewayError> {
        self.simulate_latency().await;
        if self.fail_bookings {
            return Err(GatewayError::Api {
                status: 500,
                body: "booking store unavailable".into(),
            });
        }
        let mut bookings = self
            .bookings
            .lock()
            .map_err(|_| GatewayError::Api {
                status: 500,
                body: "booking ledger poisoned".into(),
            })?;
        bookings.push(booking.clone());
        Ok(format!("booking-{}", bookings.len()))
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[tokio::test]
    async fn unknown_ids_are_not_found() {
        let gateway = InMemoryGateway::new().with_service("S1", "Plumbing");

        assert_eq!(gateway.service_category("S1").await.unwrap(), "Plumbing");
        let err = gateway.technician_category("T9").await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn bookings_are_numbered_in_order() {
        let gateway = InMemoryGateway::new();
        let booking = NewBooking {
            customer_id: "C1".into(),
            technician_id: "T1".into(),
            service_id: "S1".into(),
            address: String::new(),
            latitude: 0.0,
            longitude: 0.0,
        };

        assert_eq!(gateway.create_booking(&booking).await.unwrap(), "booking-1");
        assert_eq!(gateway.create_booking(&booking).await.unwrap(), "booking-2");
        assert_eq!(gateway.bookings().len(), 2);
    }

    #[tokio::test]
    async fn scripted_failures_are_not_not_found() {
        let gateway = InMemoryGateway::new()
            .with_service("S1", "Plumbing")
            .failing_service_lookups();

        let err = gateway.service_category("S1").await.unwrap_err();
        assert!(!err.is_not_found());
        assert_matches!(err, GatewayError::Api { status: 503, .. });
    }
}
