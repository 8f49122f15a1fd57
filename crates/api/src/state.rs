use std::sync::Arc;

use homefix_gateway::CollaboratorGateway;

use crate::config::ServerConfig;
use crate::engine::{AvailabilityIndex, Choreographer};
use crate::ws::ConnectionRegistry;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// Cheaply cloneable; everything inside is behind an `Arc`.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServerConfig>,
    /// Live participant channels.
    pub registry: Arc<ConnectionRegistry>,
    /// Technician availability.
    pub availability: Arc<AvailabilityIndex>,
    /// Routes inbound real-time events.
    pub choreographer: Arc<Choreographer>,
}

impl AppState {
    /// Wire the engine together around `gateway`.
    pub fn new(config: ServerConfig, gateway: Arc<dyn CollaboratorGateway>) -> Self {
        let registry = Arc::new(ConnectionRegistry::new());
        let availability = Arc::new(AvailabilityIndex::new());
        let choreographer = Arc::new(Choreographer::new(
            Arc::clone(&registry),
            Arc::clone(&availability),
            gateway,
            config.dispatch_settings(),
        ));

        Self {
            config: Arc::new(config),
            registry,
            availability,
            choreographer,
        }
    }
}
