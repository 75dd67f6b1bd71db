//! Compliance portal server entry point.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use compliance_api::AppState;
use compliance_common::config::{LogFormat, StorageKind};
use compliance_common::{Config, storage};
use compliance_core::{AccountService, SystemClock, ViolationService};
use compliance_db::repositories::{AccountRepository, ViolationRepository};
use tokio::signal;
use tower_http::{
    cors::{Any, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};
use tracing::info;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Waits for a shutdown signal (SIGINT or SIGTERM).
///
/// On Unix systems, this listens for both SIGINT (Ctrl+C) and SIGTERM.
/// On Windows, this only listens for Ctrl+C.
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            info!("Received SIGINT, initiating graceful shutdown...");
        },
        () = terminate => {
            info!("Received SIGTERM, initiating graceful shutdown...");
        },
    }
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "compliance=debug,tower_http=debug".into());

    let registry = tracing_subscriber::registry().with(filter);
    match format {
        LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).init(),
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).init(),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config = Config::load()?;

    init_tracing(config.logging.format);
    info!("Starting compliance portal server...");

    // Connect to database
    let db = Arc::new(compliance_db::init(&config).await?);
    info!("Connected to database");

    // Run migrations
    info!("Running database migrations...");
    compliance_db::migrate(&db).await?;
    info!("Migrations completed");

    // Collaborators
    let clock = Arc::new(SystemClock);
    let blob_store = storage::from_settings(&config.storage);
    let account_repo = AccountRepository::new(Arc::clone(&db));
    let violation_repo = ViolationRepository::new(Arc::clone(&db));

    let state = AppState {
        account_service: AccountService::new(
            Arc::new(account_repo),
            clock.clone(),
            config.lifecycle.collaborator_timeout(),
        ),
        violation_service: ViolationService::new(
            Arc::new(violation_repo),
            blob_store,
            clock,
            config.lifecycle.collaborator_timeout(),
        ),
    };

    let mut app = Router::new().nest("/api", compliance_api::app(state));

    if config.storage.kind == StorageKind::Local && config.storage.base_url.starts_with('/') {
        info!(
            path = %config.storage.base_path.display(),
            url = %config.storage.base_url,
            "Serving uploaded files"
        );
        app = app.nest_service(
            config.storage.base_url.trim_end_matches('/'),
            ServeDir::new(&config.storage.base_path),
        );
    }

    let app = app.layer(TraceLayer::new_for_http()).layer(
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any),
    );

    // Start server with graceful shutdown
    let addr = SocketAddr::new(config.server.host.parse()?, config.server.port);
    info!(public_url = %config.server.url, "Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}
