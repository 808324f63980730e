//! API Handlers
//!
//! HTTP request handlers for each admin endpoint.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{Path, Query, State},
    Json,
};

use crate::cache::{media_codecs, metadata_key, CacheStatistics, CleanupSummary, MediaCache};
use crate::config::Config;
use crate::error::{CacheError, Result};
use crate::models::{
    CleanupRequest, CleanupResponse, HealthResponse, KeyRequest, KeysQuery, KeysResponse,
    MessageResponse, MetadataRequest, MetadataResponse, PersistResponse,
};

/// Application state shared across all handlers.
///
/// The cache synchronizes internally, so handlers share it through a plain
/// `Arc`.
#[derive(Clone)]
pub struct AppState {
    pub cache: Arc<MediaCache>,
}

impl AppState {
    pub fn new(cache: Arc<MediaCache>) -> Self {
        Self { cache }
    }

    /// Creates a new AppState with a cache built from configuration and
    /// the media codecs.
    pub fn from_config(config: &Config) -> Self {
        Self::new(Arc::new(MediaCache::new(config, media_codecs())))
    }

    fn cleanup_response(&self, summary: CleanupSummary) -> CleanupResponse {
        CleanupResponse {
            entries_removed: summary.entries_removed,
            bytes_freed: summary.bytes_freed,
            current_memory_usage: self.cache.current_memory_usage(),
        }
    }
}

/// Handler for PUT /metadata
///
/// Stores a JSON value under `meta:<category>:<key>` with optional TTL.
pub async fn put_metadata_handler(
    State(state): State<AppState>,
    Json(req): Json<MetadataRequest>,
) -> Result<Json<MessageResponse>> {
    if let Some(error_msg) = req.validate() {
        return Err(CacheError::InvalidRequest(error_msg));
    }

    let category = req.category().to_string();
    let ttl = req.ttl.map(Duration::from_secs);
    state.cache.put_metadata(&req.key, req.value, &category, ttl);

    Ok(Json(MessageResponse::new(
        metadata_key(&category, &req.key),
        "stored",
    )))
}

/// Handler for GET /metadata/:category/:key
pub async fn get_metadata_handler(
    State(state): State<AppState>,
    Path((category, key)): Path<(String, String)>,
) -> Result<Json<MetadataResponse>> {
    let full_key = metadata_key(&category, &key);
    let value = state
        .cache
        .get_metadata(&key, &category)
        .ok_or_else(|| CacheError::NotFound(full_key.clone()))?;

    Ok(Json(MetadataResponse {
        key: full_key,
        category,
        value,
    }))
}

/// Handler for DELETE /metadata/:category/:key
pub async fn delete_metadata_handler(
    State(state): State<AppState>,
    Path((category, key)): Path<(String, String)>,
) -> Result<Json<MessageResponse>> {
    let full_key = metadata_key(&category, &key);
    if !state.cache.remove_metadata(&key, &category) {
        return Err(CacheError::NotFound(full_key));
    }

    Ok(Json(MessageResponse::new(full_key, "deleted")))
}

/// Handler for POST /entries/pin
pub async fn pin_handler(
    State(state): State<AppState>,
    Json(req): Json<KeyRequest>,
) -> Result<Json<MessageResponse>> {
    set_pinned(&state, req, true)
}

/// Handler for POST /entries/unpin
pub async fn unpin_handler(
    State(state): State<AppState>,
    Json(req): Json<KeyRequest>,
) -> Result<Json<MessageResponse>> {
    set_pinned(&state, req, false)
}

fn set_pinned(state: &AppState, req: KeyRequest, pinned: bool) -> Result<Json<MessageResponse>> {
    if let Some(error_msg) = req.validate() {
        return Err(CacheError::InvalidRequest(error_msg));
    }

    let category = state
        .cache
        .entry_info(&req.key)
        .map(|entry| entry.category)
        .ok_or_else(|| CacheError::NotFound(req.key.clone()))?;

    let changed = if pinned {
        state.cache.pin(&req.key, &category)
    } else {
        state.cache.unpin(&req.key, &category)
    };
    if !changed {
        return Err(CacheError::NotFound(req.key));
    }

    let action = if pinned { "pinned" } else { "unpinned" };
    Ok(Json(MessageResponse::new(req.key, action)))
}

/// Handler for GET /keys?category=
pub async fn keys_handler(
    State(state): State<AppState>,
    Query(query): Query<KeysQuery>,
) -> Json<KeysResponse> {
    let keys = state.cache.keys(query.category.as_deref());
    Json(KeysResponse::new(keys))
}

/// Handler for POST /cleanup
///
/// Cleans up to the requested target, or to 70% of the ceiling.
pub async fn cleanup_handler(
    State(state): State<AppState>,
    Json(req): Json<CleanupRequest>,
) -> Json<CleanupResponse> {
    let summary = state.cache.cleanup(req.target_bytes).unwrap_or_default();
    Json(state.cleanup_response(summary))
}

/// Handler for POST /invalidate
///
/// Removes every stale entry.
pub async fn invalidate_handler(State(state): State<AppState>) -> Json<CleanupResponse> {
    let summary = state.cache.invalidate_expired();
    Json(state.cleanup_response(summary))
}

/// Handler for DELETE /categories/:category
pub async fn clear_category_handler(
    State(state): State<AppState>,
    Path(category): Path<String>,
) -> Json<CleanupResponse> {
    let summary = state.cache.clear_category(&category);
    Json(state.cleanup_response(summary))
}

/// Handler for POST /persist
///
/// Saves a snapshot to the configured path. The write runs on the blocking
/// pool.
pub async fn persist_handler(State(state): State<AppState>) -> Result<Json<PersistResponse>> {
    let path = state
        .cache
        .persistence_path()
        .ok_or_else(|| CacheError::InvalidRequest("No persistence path configured".to_string()))?;

    let cache = state.cache.clone();
    let target = path.clone();
    let entries_saved = tokio::task::spawn_blocking(move || cache.save_to_file(&target))
        .await
        .map_err(|e| CacheError::Internal(e.to_string()))??;

    Ok(Json(PersistResponse {
        path: path.display().to_string(),
        entries_saved,
    }))
}

/// Handler for GET /stats
///
/// Returns the diagnostics export document.
pub async fn stats_handler(State(state): State<AppState>) -> Json<CacheStatistics> {
    Json(state.cache.statistics())
}

/// Handler for GET /health
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}
