use std::net::SocketAddr;
use std::sync::Arc;

use fairchance_core::gateway::PersistenceGateway;
use fairchance_core::memory::MemoryGateway;
use fairchance_core::profile::{MemoryProfiles, ProfileDirectory};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use fairchance_api::config::ServerConfig;
use fairchance_api::router::build_app_router;
use fairchance_api::state::AppState;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "fairchance_api=debug,fairchance_core=info,tower_http=debug".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = ServerConfig::from_env();
    tracing::info!(
        host = %config.host,
        port = %config.port,
        memory_store = config.memory_store,
        "Loaded server configuration"
    );

    // --- Storage ---
    let (gateway, profiles) = open_storage(&config).await;

    // --- Router ---
    let state = AppState::new(gateway, profiles, config.clone());
    let app = build_app_router(state, &config);

    // --- Start server ---
    let addr = SocketAddr::new(
        config.host.parse().expect("Invalid HOST address"),
        config.port,
    );
    tracing::info!(%addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    tracing::info!("Graceful shutdown complete");
}

/// Open the assessment store and profile directory.
///
/// With `MEMORY_STORE` set everything lives in process memory and is lost
/// on exit. Otherwise `DATABASE_URL` must point at PostgreSQL; the pool is
/// health-checked and migrated before the server starts.
async fn open_storage(
    config: &ServerConfig,
) -> (Arc<dyn PersistenceGateway>, Arc<dyn ProfileDirectory>) {
    if config.memory_store {
        tracing::warn!("Using in-memory store; assessments will not survive a restart");
        return (
            Arc::new(MemoryGateway::new()),
            Arc::new(MemoryProfiles::new()),
        );
    }

    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");

    let pool = fairchance_db::create_pool(&database_url)
        .await
        .expect("Failed to connect to database");
    tracing::info!("Database connection pool created");

    fairchance_db::health_check(&pool)
        .await
        .expect("Database health check failed");

    fairchance_db::run_migrations(&pool)
        .await
        .expect("Failed to run database migrations");
    tracing::info!("Database migrations applied");

    (
        Arc::new(fairchance_db::PgGateway::new(pool.clone())),
        Arc::new(fairchance_db::PgProfiles::new(pool)),
    )
}

/// Resolve on SIGINT, or SIGTERM on Unix.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => tracing::info!("Received SIGINT, shutting down"),
        () = terminate => tracing::info!("Received SIGTERM, shutting down"),
    }
}
