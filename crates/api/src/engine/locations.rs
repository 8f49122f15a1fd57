use std::collections::HashMap;

use homefix_core::geo::GeoPoint;
use homefix_core::types::ParticipantId;
use tokio::sync::RwLock;

/// Last known position of each participant, last write wins.
///
/// Customers and technicians are kept apart so an id collision between the
/// two directories cannot mix their positions.
#[derive(Default)]
pub struct LocationBook {
    customers: RwLock<HashMap<ParticipantId, GeoPoint>>,
    technicians: RwLock<HashMap<ParticipantId, GeoPoint>>,
}

impl LocationBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn record_customer(&self, customer_id: &str, location: GeoPoint) {
        self.customers
            .write()
            .await
            .insert(customer_id.to_string(), location);
    }

    pub async fn record_technician(&self, technician_id: &str, location: GeoPoint) {
        self.technicians
            .write()
            .await
            .insert(technician_id.to_string(), location);
    }

    pub async fn customer(&self, customer_id: &str) -> Option<GeoPoint> {
        self.customers.read().await.get(customer_id).copied()
    }

    pub async fn technician(&self, technician_id: &str) -> Option<GeoPoint> {
        self.technicians.read().await.get(technician_id).copied()
    }
}
