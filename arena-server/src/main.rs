use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tracing::info;

use arena_persistence::{
    connection::connect_and_migrate,
    repositories::{ScoreRepository, UserRepository},
};
use arena_server::{
    auth::SessionIssuer, config::Config, create_routes, state::LiveStateManager,
    websocket::ConnectionManager,
};

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    info!("Starting Arena server...");

    let config = Config::new();
    let connection_manager = Arc::new(ConnectionManager::new());
    let live_state = Arc::new(LiveStateManager::new(connection_manager.clone()));

    // Initialize database connection and run migrations
    let db = match connect_and_migrate().await {
        Ok(db) => db,
        Err(e) => {
            tracing::error!("Failed to connect to database and run migrations: {}", e);
            std::process::exit(1);
        }
    };
    let user_repository = Arc::new(UserRepository::new(db.clone()));
    let score_repository = Arc::new(ScoreRepository::new(db));

    let session_issuer = Arc::new(SessionIssuer::new(
        &config.jwt_secret,
        Duration::from_secs(config.token_ttl_seconds),
    ));

    let routes = create_routes(
        connection_manager.clone(),
        live_state,
        session_issuer,
        user_repository,
        score_repository,
    );

    // Start cleanup task
    let cleanup_connection_manager = connection_manager.clone();
    let connection_timeout = Duration::from_secs(config.connection_timeout_seconds);
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(30));
        loop {
            interval.tick().await;
            cleanup_connection_manager
                .cleanup_inactive_connections(connection_timeout)
                .await;
        }
    });

    info!("Server starting on {}:{}", config.host, config.port);

    let addr = (
        config
            .host
            .parse::<std::net::IpAddr>()
            .expect("Invalid HOST"),
        config.port,
    );

    let (addr, server) = warp::serve(routes).bind_with_graceful_shutdown(addr, async {
        // Wait for SIGINT (Ctrl+C) or SIGTERM
        #[cfg(unix)]
        {
            let mut sigint = signal::unix::signal(signal::unix::SignalKind::interrupt()).unwrap();
            let mut sigterm = signal::unix::signal(signal::unix::SignalKind::terminate()).unwrap();

            tokio::select! {
                _ = sigint.recv() => {
                    info!("Received SIGINT, shutting down gracefully...");
                }
                _ = sigterm.recv() => {
                    info!("Received SIGTERM, shutting down gracefully...");
                }
            }
        }

        #[cfg(not(unix))]
        {
            signal::ctrl_c().await.expect("Failed to listen for ctrl+c");
            info!("Received Ctrl+C, shutting down gracefully...");
        }
    });

    info!(
        "Server started successfully on {}. Press Ctrl+C to stop.",
        addr
    );
    server.await;
    info!("Server shutdown complete.");
}
