pub mod auth;
pub mod error;
pub mod handlers;
pub mod routes;

pub use error::ApiError;

use std::sync::Arc;
use std::time::Duration;

use axum::{Router, middleware};
use secrecy::SecretString;
use tokio::net::TcpListener;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;

use crate::cache::{ArtifactStore, RefreshCoordinator};
use crate::config::ServiceConfig;
use crate::generator::PgDumpGenerator;
use auth::require_bearer;
use handlers::not_found_handler;
use routes::{create_dump_routes, create_status_routes};

/// Shared by every request handler.
#[derive(Clone)]
pub struct AppState {
    pub coordinator: RefreshCoordinator,
    pub default_ttl: Duration,
    pub api_token: Arc<SecretString>,
}

impl AppState {
    pub fn new(coordinator: RefreshCoordinator, default_ttl: Duration, api_token: SecretString) -> Self {
        Self {
            coordinator,
            default_ttl,
            api_token: Arc::new(api_token),
        }
    }
}

/// All routes require the bearer token; unknown paths answer 404 without it.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .merge(create_status_routes())
        .merge(create_dump_routes())
        .route_layer(middleware::from_fn_with_state(state.clone(), require_bearer))
        .fallback(not_found_handler)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .with_state(state)
}

#[tracing::instrument(level = "info", name = "Server", skip_all)]
pub async fn start_server(
    config: ServiceConfig,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let store = ArtifactStore::new(&config.dump_dir);
    store.ensure_dir().await?;

    let partials = store.clean_partials().await?;
    if partials > 0 {
        tracing::info!("Removed {} partial dumps from an earlier run", partials);
    }

    let generator = PgDumpGenerator::new(config.database_url).with_program(config.pg_dump);
    let coordinator = RefreshCoordinator::new(store, Arc::new(generator), config.retention);

    coordinator.recover().await?;
    if coordinator.trigger_refresh(config.ttl) {
        tracing::info!("Cached dump is missing or stale, warming up in the background");
    }

    let app = create_router(AppState::new(coordinator, config.ttl, config.api_token));

    let listener = TcpListener::bind((config.host.as_str(), config.port)).await?;
    tracing::info!("Starting dump cache server at http://{}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl-C: {}", e);
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
                tracing::error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }

    tracing::info!("Shutdown signal received, draining connections");
}
