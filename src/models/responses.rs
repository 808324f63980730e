//! Response DTOs for the admin API
//!
//! Defines the structure of outgoing HTTP response bodies.

use serde::Serialize;
use serde_json::Value;

/// Response body for GET /metadata/:category/:key
#[derive(Debug, Clone, Serialize)]
pub struct MetadataResponse {
    /// Full cache key
    pub key: String,
    pub category: String,
    pub value: Value,
}

/// Response body for writes, deletes and pin changes
#[derive(Debug, Clone, Serialize)]
pub struct MessageResponse {
    pub message: String,
    /// Full cache key affected
    pub key: String,
}

impl MessageResponse {
    pub fn new(key: impl Into<String>, action: &str) -> Self {
        let key = key.into();
        Self {
            message: format!("Key '{}' {} successfully", key, action),
            key,
        }
    }
}

/// Response body for GET /keys
#[derive(Debug, Clone, Serialize)]
pub struct KeysResponse {
    pub count: usize,
    pub keys: Vec<String>,
}

impl KeysResponse {
    pub fn new(keys: Vec<String>) -> Self {
        Self {
            count: keys.len(),
            keys,
        }
    }
}

/// Response body for POST /cleanup, POST /invalidate and
/// DELETE /categories/:category
#[derive(Debug, Clone, Serialize)]
pub struct CleanupResponse {
    pub entries_removed: usize,
    pub bytes_freed: u64,
    pub current_memory_usage: u64,
}

/// Response body for POST /persist
#[derive(Debug, Clone, Serialize)]
pub struct PersistResponse {
    pub path: String,
    pub entries_saved: usize,
}

/// Response body for the health endpoint (GET /health)
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Health status (e.g., "healthy")
    pub status: String,
    /// Current timestamp in ISO 8601 format
    pub timestamp: String,
}

impl HealthResponse {
    /// Creates a new HealthResponse with current timestamp
    pub fn healthy() -> Self {
        Self {
            status: "healthy".to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}
