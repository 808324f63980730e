//! Cache Events
//!
//! Observable side effects of cache operations.

use std::fmt;

use serde::Serialize;

use crate::cache::stats::CacheStatistics;

// == Eviction Reason ==
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EvictionReason {
    /// Judged stale by the invalidation strategy
    Expired,
    /// Removed to bring memory usage under a target
    Lru,
    /// Removed by a bulk clear
    Manual,
}

impl fmt::Display for EvictionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EvictionReason::Expired => f.write_str("expired"),
            EvictionReason::Lru => f.write_str("lru"),
            EvictionReason::Manual => f.write_str("manual"),
        }
    }
}

// == Cache Event ==
/// Something that happened inside the cache.
///
/// Events are collected under the store lock and published after it is
/// released, so observers may call back into the cache.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum CacheEvent {
    Hit {
        key: String,
        category: String,
    },
    Miss {
        key: String,
        category: String,
    },
    Evicted {
        key: String,
        category: String,
        reason: EvictionReason,
    },
    /// Usage stayed above the pressure threshold after a cleanup
    MemoryThresholdExceeded {
        current: u64,
        max: u64,
    },
    CleanupCompleted {
        entries_removed: usize,
        bytes_freed: u64,
    },
    WarmupCompleted {
        entries_warmed: usize,
    },
    StatisticsUpdated(CacheStatistics),
}

impl CacheEvent {
    pub(crate) fn hit(key: &str, category: &str) -> Self {
        CacheEvent::Hit {
            key: key.to_string(),
            category: category.to_string(),
        }
    }

    pub(crate) fn miss(key: &str, category: &str) -> Self {
        CacheEvent::Miss {
            key: key.to_string(),
            category: category.to_string(),
        }
    }

    pub(crate) fn evicted(key: &str, category: &str, reason: EvictionReason) -> Self {
        CacheEvent::Evicted {
            key: key.to_string(),
            category: category.to_string(),
            reason,
        }
    }
}
