use std::sync::Arc;
use std::time::Duration;

use crate::ws::registry::ConnectionRegistry;

/// Spawn a background task that sends periodic Ping frames to every
/// connected participant.
///
/// The returned `JoinHandle` is aborted during shutdown.
pub fn start_heartbeat(
    registry: Arc<ConnectionRegistry>,
    interval: Duration,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);

        loop {
            ticker.tick().await;
            let count = registry.connection_count().await;
            tracing::debug!(count, "WebSocket heartbeat ping");
            registry.ping_all().await;
        }
    })
}
