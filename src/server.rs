use anyhow::Context;
use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, limit::RequestBodyLimitLayer, trace::TraceLayer};
use tracing::info;

use crate::config::{AppConfig, StorageBackend};
use crate::database::{DatabaseManager, MemoryResourceStore, PgResourceStore, ResourceStore};
use crate::handlers;
use crate::permissions::{build_gate, PermissionGate};
use crate::resource::{ResourceHandler, ResourceUrls};

/// Shared state handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub handler: ResourceHandler,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub fn new(
        config: AppConfig,
        store: Arc<dyn ResourceStore>,
        permissions: Arc<dyn PermissionGate>,
    ) -> Self {
        let urls = ResourceUrls::new(config.service.collection_path());
        Self {
            handler: ResourceHandler::new(store, permissions, urls),
            config: Arc::new(config),
        }
    }
}

/// Build the router: the collection, its items, and /health
pub fn app(state: AppState) -> Router {
    let urls = state.handler.urls().clone();
    let config = Arc::clone(&state.config);

    let mut router = Router::new()
        .route(urls.collection_path(), post(handlers::resource_create))
        .route(
            &urls.item_route(),
            get(handlers::resource_get)
                .delete(handlers::resource_delete)
                .patch(handlers::resource_patch)
                .put(handlers::resource_put),
        )
        .route("/health", get(handlers::health))
        .fallback(handlers::not_found)
        .with_state(state)
        // API_MAX_REQUEST_SIZE_BYTES is the only limit; axum's own 2 MB default is off
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(config.api.max_request_size_bytes));

    if config.api.enable_request_logging {
        router = router.layer(TraceLayer::new_for_http());
    }
    if config.security.enable_cors {
        router = router.layer(CorsLayer::permissive());
    }
    router
}

/// Storage backend chosen by configuration
pub async fn build_store(config: &AppConfig) -> anyhow::Result<Arc<dyn ResourceStore>> {
    let store: Arc<dyn ResourceStore> = match config.database.backend {
        StorageBackend::Postgres => {
            let pool = DatabaseManager::connect(&config.database)
                .await
                .context("failed to connect to PostgreSQL")?;
            Arc::new(PgResourceStore::new(pool, &config.database.table)?)
        }
        StorageBackend::Memory => {
            info!("Using in-memory resource store; data will not survive a restart");
            Arc::new(MemoryResourceStore::new())
        }
    };
    Ok(store)
}

/// Wire storage and permissions for `config` and run storage initialisation
pub async fn build_state(config: AppConfig) -> anyhow::Result<AppState> {
    let store = build_store(&config).await?;
    store.init().await.context("failed to initialise resource storage")?;

    let permissions = build_gate(&config.permissions).context("failed to build permission client")?;
    Ok(AppState::new(config, store, permissions))
}

/// Bind `addr` and serve until ctrl-c
pub async fn serve(state: AppState, addr: SocketAddr) -> anyhow::Result<()> {
    let collection = state.handler.urls().collection_path().to_string();
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;

    info!("Serving {} on http://{}", collection, addr);

    axum::serve(listener, app(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Unable to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
