//! Namespaced cache keys
//!
//! Keys follow `namespace:discriminator:id` so that item, search and metadata
//! entries can never collide.

use sha2::{Digest, Sha256};

pub const ITEM_NAMESPACE: &str = "music";
pub const SEARCH_NAMESPACE: &str = "search";
pub const METADATA_NAMESPACE: &str = "meta";

/// Category under which search results are stored.
pub const SEARCH_CATEGORY: &str = "search";

/// Key for a single media item: `music:<category>:<id>`.
pub fn item_key(category: &str, id: i64) -> String {
    format!("{ITEM_NAMESPACE}:{category}:{id}")
}

/// Key for a search result set: `search:<digest>`.
///
/// The digest is the first 128 bits of SHA-256 over the search string, so
/// arbitrary queries map to a fixed-length key.
pub fn search_key(search: &str) -> String {
    let digest = Sha256::digest(search.as_bytes());
    format!("{SEARCH_NAMESPACE}:{}", hex::encode(&digest[..16]))
}

/// Key for a metadata value: `meta:<category>:<key>`.
pub fn metadata_key(category: &str, key: &str) -> String {
    format!("{METADATA_NAMESPACE}:{category}:{key}")
}
