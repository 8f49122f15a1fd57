use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use homefix_api::config::ServerConfig;
use homefix_api::router::build_app_router;
use homefix_api::state::AppState;
use homefix_api::ws::{self, ConnectionRegistry};
use homefix_gateway::HttpGateway;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "homefix_api=debug,homefix_gateway=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = ServerConfig::from_env();
    tracing::info!(host = %config.host, port = %config.port, "Loaded server configuration");

    // --- Collaborator gateway ---
    let gateway = HttpGateway::new(config.gateway_endpoints(), config.gateway_timeout())
        .expect("Failed to build collaborator HTTP client");
    tracing::info!(
        service_api_url = %config.service_api_url,
        technician_api_url = %config.technician_api_url,
        booking_api_url = %config.booking_api_url,
        timeout_ms = config.gateway_timeout_ms,
        "Collaborator gateway ready"
    );

    // --- App state ---
    let addr = SocketAddr::new(
        config.host.parse().expect("Invalid HOST address"),
        config.port,
    );
    let heartbeat_interval = Duration::from_secs(config.heartbeat_interval_secs);
    let state = AppState::new(config, Arc::new(gateway));
    let registry = Arc::clone(&state.registry);

    // --- Heartbeat ---
    let heartbeat_handle = ws::start_heartbeat(Arc::clone(&registry), heartbeat_interval);

    // --- Router ---
    let app = build_app_router(state);

    // --- Start server ---
    tracing::info!(%addr, "Starting dispatch server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(Arc::clone(&registry)))
        .await
        .expect("Server error");

    heartbeat_handle.abort();
    tracing::info!("Dispatch server stopped");
}

/// Resolve on SIGINT or SIGTERM, after sending Close to every open socket.
///
/// Graceful shutdown waits for open connections, so sockets must be closed
/// before this resolves.
async fn shutdown_signal(registry: Arc<ConnectionRegistry>) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Ctrl-C handler unavailable");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "SIGTERM handler unavailable");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    let signal = tokio::select! {
        () = ctrl_c => "SIGINT",
        () = terminate => "SIGTERM",
    };

    let open = registry.connection_count().await;
    tracing::info!(signal, open_sockets = open, "Shutting down, closing participant sockets");
    registry.shutdown_all().await;
}
