//! Cache Statistics Module
//!
//! Tracks cache performance metrics including hits, misses, and evictions,
//! overall and per category.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;

use crate::cache::events::CacheEvent;

// == Cache Statistics ==
/// Point-in-time view of cache performance. Serializes to the diagnostics
/// export document.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheStatistics {
    /// Number of successful cache retrievals
    pub total_hits: u64,
    /// Number of failed cache retrievals (key not found or stale)
    pub total_misses: u64,
    /// Number of entries removed by expiry, LRU or bulk clears
    pub total_evictions: u64,
    /// Current number of entries in the cache
    pub current_entries: usize,
    /// Bytes charged to live entries
    pub current_memory_usage: u64,
    /// Configured ceiling
    pub max_memory_usage: u64,
    /// hits / (hits + misses), 0.0 before any access
    pub hit_ratio: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_cleanup: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_warmup: Option<DateTime<Utc>>,
    pub category_hits: HashMap<String, u64>,
    pub category_misses: HashMap<String, u64>,
    pub category_size: HashMap<String, u64>,
}

impl CacheStatistics {
    // == Hit Ratio ==
    /// Calculates the cache hit ratio.
    ///
    /// Returns hits / (hits + misses), or 0.0 if no requests have been made.
    pub fn compute_hit_ratio(hits: u64, misses: u64) -> f64 {
        let total = hits + misses;
        if total == 0 {
            0.0
        } else {
            hits as f64 / total as f64
        }
    }

    // == Export ==
    /// Renders the statistics as a pretty-printed JSON document.
    pub fn export_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|_| "{}".to_string())
    }
}

/// Store-side figures the collector does not own.
#[derive(Debug, Clone, Default)]
pub struct MemorySnapshot {
    pub entries: usize,
    pub current_usage: u64,
    pub max_usage: u64,
    pub category_sizes: HashMap<String, u64>,
}

#[derive(Debug, Default)]
struct Counters {
    hits: u64,
    misses: u64,
    evictions: u64,
    category_hits: HashMap<String, u64>,
    category_misses: HashMap<String, u64>,
    last_cleanup: Option<DateTime<Utc>>,
    last_warmup: Option<DateTime<Utc>>,
}

// == Statistics Collector ==
/// Counts cache events. Guarded by its own lock so that recording never
/// contends with the store lock.
#[derive(Debug, Default)]
pub struct StatisticsCollector {
    counters: Mutex<Counters>,
}

impl StatisticsCollector {
    // == Constructor ==
    /// Creates a new collector with all counters at zero.
    pub fn new() -> Self {
        Self::default()
    }

    // == Observe ==
    /// Updates counters for one event. Events that carry no counter are
    /// ignored.
    pub fn observe(&self, event: &CacheEvent) {
        let mut counters = self.counters.lock();
        match event {
            CacheEvent::Hit { category, .. } => {
                counters.hits += 1;
                *counters.category_hits.entry(category.clone()).or_insert(0) += 1;
            }
            CacheEvent::Miss { category, .. } => {
                counters.misses += 1;
                *counters.category_misses.entry(category.clone()).or_insert(0) += 1;
            }
            CacheEvent::Evicted { .. } => {
                counters.evictions += 1;
            }
            _ => {}
        }
    }

    // == Record Maintenance ==
    pub fn record_cleanup(&self, at: DateTime<Utc>) {
        self.counters.lock().last_cleanup = Some(at);
    }

    pub fn record_warmup(&self, at: DateTime<Utc>) {
        self.counters.lock().last_warmup = Some(at);
    }

    // == Accessors ==
    pub fn hits(&self) -> u64 {
        self.counters.lock().hits
    }

    pub fn misses(&self) -> u64 {
        self.counters.lock().misses
    }

    pub fn evictions(&self) -> u64 {
        self.counters.lock().evictions
    }

    /// Hit ratio computed from the current counters.
    pub fn hit_ratio(&self) -> f64 {
        let counters = self.counters.lock();
        CacheStatistics::compute_hit_ratio(counters.hits, counters.misses)
    }

    // == Snapshot ==
    /// Combines the counters with store figures into a statistics view.
    pub fn snapshot(&self, memory: MemorySnapshot) -> CacheStatistics {
        let counters = self.counters.lock();
        CacheStatistics {
            total_hits: counters.hits,
            total_misses: counters.misses,
            total_evictions: counters.evictions,
            current_entries: memory.entries,
            current_memory_usage: memory.current_usage,
            max_memory_usage: memory.max_usage,
            hit_ratio: CacheStatistics::compute_hit_ratio(counters.hits, counters.misses),
            last_cleanup: counters.last_cleanup,
            last_warmup: counters.last_warmup,
            category_hits: counters.category_hits.clone(),
            category_misses: counters.category_misses.clone(),
            category_size: memory.category_sizes,
        }
    }

    // == Reset ==
    /// Zeroes every counter.
    pub fn reset(&self) {
        *self.counters.lock() = Counters::default();
    }
}
