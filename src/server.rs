use crate::config::{Config, StoreKind};
use crate::ingestion::handlers::{
    handle_get_story, handle_ingest, handle_list_method_not_allowed, handle_list_stories,
    handle_story_method_not_allowed,
};
use crate::storage::memory::MemoryStore;
use crate::storage::sqlite::SqliteStore;
use crate::storage::StoryStore;

use anyhow::Result;
use axum::{routing::get, Extension, Router};
use std::future::Future;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal::ctrl_c;

/// Public path observed by existing clients.
pub const ENDPOINT_STORY: &str = "/api/story";
/// Generic alias of `ENDPOINT_STORY`.
pub const ENDPOINT_INGEST: &str = "/ingest";
pub const ENDPOINT_ALL_STORIES: &str = "/api/all_story";
pub const ENDPOINT_STORIES: &str = "/stories";
pub const ENDPOINT_HEALTH: &str = "/health";

pub fn open_store(kind: &StoreKind) -> Result<Arc<dyn StoryStore>> {
    let store: Arc<dyn StoryStore> = match kind {
        StoreKind::Sqlite(path) => Arc::new(SqliteStore::open(path)?),
        StoreKind::Memory => {
            tracing::warn!("Using in-memory store, stories will not survive a restart");
            Arc::new(MemoryStore::new())
        }
    };
    Ok(store)
}

pub fn build_router(store: Arc<dyn StoryStore>) -> Router {
    let story_routes = get(handle_get_story)
        .post(handle_ingest)
        .fallback(handle_story_method_not_allowed);
    let list_routes = get(handle_list_stories).fallback(handle_list_method_not_allowed);

    Router::new()
        .route(ENDPOINT_STORY, story_routes.clone())
        .route(ENDPOINT_INGEST, story_routes)
        .route(ENDPOINT_ALL_STORIES, list_routes.clone())
        .route(ENDPOINT_STORIES, list_routes)
        .route(ENDPOINT_HEALTH, get(|| async { "ok" }))
        .layer(Extension(store))
}

/// Serves the API on `listener` until `shutdown` resolves.
pub async fn serve<F>(listener: TcpListener, store: Arc<dyn StoryStore>, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let app = build_router(store);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;
    Ok(())
}

pub async fn run(config: Config) -> Result<()> {
    tracing::info!("Initializing store {:?}", config.store);
    let store = open_store(&config.store)?;

    let listener = TcpListener::bind(config.bind_addr).await?;
    tracing::info!("Server running on {}", listener.local_addr()?);

    serve(listener, store, shutdown_signal()).await?;

    tracing::info!("Server shut down");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }

        tracing::info!("Received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                tracing::info!("Received terminate signal, shutting down");
            }
            Err(e) => {
                tracing::error!("Failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
