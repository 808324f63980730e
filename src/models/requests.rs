//! Request DTOs for the admin API
//!
//! Defines the structure of incoming HTTP request bodies.

use serde::Deserialize;
use serde_json::Value;

/// Maximum accepted key length in bytes
pub const MAX_KEY_LENGTH: usize = 256;

/// Category used when a metadata request names none
pub const DEFAULT_METADATA_CATEGORY: &str = "metadata";

fn validate_key(key: &str) -> Option<String> {
    if key.is_empty() {
        return Some("Key cannot be empty".to_string());
    }
    if key.len() > MAX_KEY_LENGTH {
        return Some(format!(
            "Key exceeds maximum length of {} characters",
            MAX_KEY_LENGTH
        ));
    }
    None
}

/// Request body for PUT /metadata
///
/// # Fields
/// - `key`: Metadata key, namespaced by the server
/// - `category`: Defaults to `metadata`
/// - `value`: Any JSON value
/// - `ttl`: Optional TTL in seconds (uses default if not specified)
#[derive(Debug, Clone, Deserialize)]
pub struct MetadataRequest {
    pub key: String,
    #[serde(default)]
    pub category: Option<String>,
    pub value: Value,
    #[serde(default)]
    pub ttl: Option<u64>,
}

impl MetadataRequest {
    pub fn category(&self) -> &str {
        self.category.as_deref().unwrap_or(DEFAULT_METADATA_CATEGORY)
    }

    /// Validates the request data
    ///
    /// Returns an error message if validation fails, None if valid.
    pub fn validate(&self) -> Option<String> {
        if let Some(error) = validate_key(&self.key) {
            return Some(error);
        }
        if self.category().is_empty() || self.category().contains(':') {
            return Some("Category must be non-empty and must not contain ':'".to_string());
        }
        None
    }
}

/// Request body for POST /entries/pin and POST /entries/unpin
#[derive(Debug, Clone, Deserialize)]
pub struct KeyRequest {
    /// Full cache key, e.g. `music:music:42`
    pub key: String,
}

impl KeyRequest {
    pub fn validate(&self) -> Option<String> {
        validate_key(&self.key)
    }
}

/// Request body for POST /cleanup
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CleanupRequest {
    /// Usage to clean down to; 70% of the ceiling when absent
    #[serde(default)]
    pub target_bytes: Option<u64>,
}

/// Query string for GET /keys
#[derive(Debug, Clone, Default, Deserialize)]
pub struct KeysQuery {
    #[serde(default)]
    pub category: Option<String>,
}
