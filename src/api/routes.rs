//! API Routes
//!
//! Configures the Axum router with all admin endpoints.

use axum::{
    routing::{delete, get, post, put},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers::{
    cleanup_handler, clear_category_handler, delete_metadata_handler, get_metadata_handler,
    health_handler, invalidate_handler, keys_handler, persist_handler, pin_handler,
    put_metadata_handler, stats_handler, unpin_handler, AppState,
};

/// Creates the main router with all endpoints configured.
///
/// # Middleware
/// - CORS: Allows any origin (configurable for production)
/// - Tracing: Logs all requests for debugging
pub fn create_router(state: AppState) -> Router {
    // Configure CORS middleware
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_handler))
        .route("/stats", get(stats_handler))
        .route("/metadata", put(put_metadata_handler))
        .route(
            "/metadata/:category/:key",
            get(get_metadata_handler).delete(delete_metadata_handler),
        )
        .route("/entries/pin", post(pin_handler))
        .route("/entries/unpin", post(unpin_handler))
        .route("/keys", get(keys_handler))
        .route("/cleanup", post(cleanup_handler))
        .route("/invalidate", post(invalidate_handler))
        .route("/persist", post(persist_handler))
        .route("/categories/:category", delete(clear_category_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
