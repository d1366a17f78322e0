use std::sync::Arc;

use axum::{extract::DefaultBodyLimit, routing::get, Router};
use plaudit_core::config::{PlauditConfig, StoreBackend, StoreConfig, MAX_PAYLOAD_BYTES};
use plaudit_store::{CommentStore, FileStore, MemoryStore, StoreError};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::hub::Hub;

/// Central shared state: passed as Arc<AppState> to all Axum handlers.
pub struct AppState {
    pub config: PlauditConfig,
    /// The one Comment Store for this process.
    pub store: Arc<dyn CommentStore>,
    pub hub: Hub,
}

impl AppState {
    pub fn new(config: PlauditConfig, store: Arc<dyn CommentStore>) -> Self {
        let hub = Hub::new(config.broadcast.queue_capacity);
        Self { config, store, hub }
    }
}

/// Construct the backend selected by `[store] backend`.
pub async fn open_store(config: &StoreConfig) -> Result<Arc<dyn CommentStore>, StoreError> {
    let store: Arc<dyn CommentStore> = match config.backend {
        StoreBackend::Memory => Arc::new(MemoryStore::new()),
        StoreBackend::File => Arc::new(FileStore::open(&config.path).await?),
    };
    Ok(store)
}

/// Assemble the full Axum router.
pub fn build_router(state: Arc<AppState>) -> Router {
    use crate::http::{comments, health};

    Router::new()
        .route("/health", get(health::health_handler))
        .route(
            "/comments",
            get(comments::list_comments)
                .post(comments::create_comment)
                .delete(comments::clear_comments),
        )
        .route(
            "/comments/{id}",
            get(comments::get_comment)
                .patch(comments::update_comment)
                .delete(comments::delete_comment),
        )
        .route("/ws", get(crate::ws::connection::ws_handler))
        .with_state(state)
        .layer(DefaultBodyLimit::max(MAX_PAYLOAD_BYTES))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}
