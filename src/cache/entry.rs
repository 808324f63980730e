//! Cache Entry Module
//!
//! Defines the structure for individual cache entries and their bookkeeping.

use std::collections::HashMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::cache::payload::Payload;

// == Cache Entry ==
/// Represents a single cache entry with its payload and metadata.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    /// Namespaced key
    pub key: String,
    /// The cached value
    pub payload: Payload,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Last successful read, or creation time if never read
    pub last_accessed: DateTime<Utc>,
    /// Absolute expiry, None = no expiration
    pub expires_at: Option<DateTime<Utc>>,
    /// Number of successful reads
    pub access_count: u64,
    /// Byte cost charged to the memory accountant
    pub size_bytes: u64,
    /// Logical bucket for statistics and bulk clearing
    pub category: String,
    /// Where the data came from ("manual", "search", "metadata", ...)
    pub source: String,
    /// Pinned entries are never evicted for memory, but still expire
    pub is_pinned: bool,
    /// Category generation current when the entry was written
    pub version: u64,
    /// Free-form side information
    pub metadata: HashMap<String, Value>,
}

impl CacheEntry {
    // == Constructor ==
    /// Creates a new entry at `now` with an optional time-to-live.
    pub fn new(
        key: impl Into<String>,
        payload: Payload,
        category: impl Into<String>,
        now: DateTime<Utc>,
        ttl: Option<Duration>,
    ) -> Self {
        // A TTL too large to represent means the entry never expires.
        let expires_at = ttl.and_then(|ttl| now.checked_add_signed(to_chrono(ttl)));

        Self {
            key: key.into(),
            payload,
            created_at: now,
            last_accessed: now,
            expires_at,
            access_count: 0,
            size_bytes: 0,
            category: category.into(),
            source: String::new(),
            is_pinned: false,
            version: 0,
            metadata: HashMap::new(),
        }
    }

    // == Builders ==
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = source.into();
        self
    }

    pub fn with_metadata(mut self, metadata: HashMap<String, Value>) -> Self {
        self.metadata = metadata;
        self
    }

    // == Touch ==
    /// Records a successful read.
    pub fn touch(&mut self, now: DateTime<Utc>) {
        // Keep last_accessed >= created_at even if the clock steps backwards.
        self.last_accessed = now.max(self.created_at);
        self.access_count += 1;
    }

    // == Time To Live ==
    /// Returns remaining time before `expires_at`, or None if no expiration
    /// is set. Zero once the deadline has passed.
    pub fn ttl_remaining(&self, now: DateTime<Utc>) -> Option<Duration> {
        self.expires_at
            .map(|expires| (expires - now).to_std().unwrap_or(Duration::ZERO))
    }

    /// Time since the last successful read.
    pub fn idle_for(&self, now: DateTime<Utc>) -> chrono::Duration {
        now - self.last_accessed
    }
}

// == Utility Functions ==
/// Converts a std duration, saturating at chrono's maximum.
pub fn to_chrono(duration: Duration) -> chrono::Duration {
    chrono::Duration::from_std(duration).unwrap_or(chrono::Duration::MAX)
}
