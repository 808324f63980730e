//! Cache Store Module
//!
//! Keyed entry storage combining memory accounting, staleness checks and
//! LRU cleanup. Not synchronized: `MediaCache` owns it behind a single lock.

use std::collections::HashMap;
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::cache::entry::CacheEntry;
use crate::cache::events::{CacheEvent, EvictionReason};
use crate::cache::eviction::EvictionPolicy;
use crate::cache::invalidation::{InvalidationStrategy, StalenessContext};
use crate::cache::memory::MemoryAccountant;
use crate::cache::payload::Payload;

// == Cleanup Summary ==
/// What a cleanup, sweep or clear removed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CleanupSummary {
    pub entries_removed: usize,
    pub bytes_freed: u64,
}

impl CleanupSummary {
    fn add(&mut self, entry: &CacheEntry) {
        self.entries_removed += 1;
        self.bytes_freed += entry.size_bytes;
    }
}

// == Cache Store ==
/// Entry storage with memory accounting and eviction.
#[derive(Debug)]
pub struct CacheStore {
    /// Key-entry storage
    entries: HashMap<String, CacheEntry>,
    /// Running byte totals
    memory: MemoryAccountant,
    /// LRU victim selection
    policy: EvictionPolicy,
    /// Staleness policy
    strategy: InvalidationStrategy,
    /// TTL applied when a write has no override; zero means none
    default_expiration: Duration,
    /// Current generation per category
    versions: HashMap<String, u64>,
}

impl CacheStore {
    // == Constructor ==
    /// Creates a new store.
    ///
    /// # Arguments
    /// * `max_memory_bytes` - Ceiling that triggers cleanup on write
    /// * `default_expiration` - TTL for writes without an override, zero for none
    /// * `strategy` - Staleness policy
    pub fn new(
        max_memory_bytes: u64,
        default_expiration: Duration,
        strategy: InvalidationStrategy,
    ) -> Self {
        Self {
            entries: HashMap::new(),
            memory: MemoryAccountant::new(max_memory_bytes),
            policy: EvictionPolicy::default(),
            strategy,
            default_expiration,
            versions: HashMap::new(),
        }
    }

    // == Settings ==
    pub fn strategy(&self) -> InvalidationStrategy {
        self.strategy
    }

    pub fn set_strategy(&mut self, strategy: InvalidationStrategy) {
        self.strategy = strategy;
    }

    pub fn default_expiration(&self) -> Duration {
        self.default_expiration
    }

    pub fn set_default_expiration(&mut self, default_expiration: Duration) {
        self.default_expiration = default_expiration;
    }

    pub fn policy(&self) -> &EvictionPolicy {
        &self.policy
    }

    pub fn max_memory_bytes(&self) -> u64 {
        self.memory.max_bytes()
    }

    /// Changes the ceiling. If usage is above the new ceiling a cleanup to
    /// the implicit target runs immediately.
    pub fn set_max_memory_bytes(
        &mut self,
        max_bytes: u64,
        now: DateTime<Utc>,
        events: &mut Vec<CacheEvent>,
    ) -> Option<CleanupSummary> {
        self.memory.set_max_bytes(max_bytes);
        if self.memory.current_usage() > max_bytes {
            let target = self.policy.implicit_target(max_bytes);
            self.cleanup(target, now, events)
        } else {
            None
        }
    }

    /// Resolves the TTL for a write.
    pub fn resolve_ttl(&self, ttl_override: Option<Duration>) -> Option<Duration> {
        match ttl_override {
            Some(ttl) if !ttl.is_zero() => Some(ttl),
            _ if self.default_expiration.is_zero() => None,
            _ => Some(self.default_expiration),
        }
    }

    // == Versions ==
    pub fn version_of(&self, category: &str) -> u64 {
        self.versions.get(category).copied().unwrap_or(0)
    }

    /// Advances a category's generation, making every existing entry of that
    /// category stale under `VersionBased`.
    pub fn bump_version(&mut self, category: &str) -> u64 {
        let version = self.versions.entry(category.to_string()).or_insert(0);
        *version += 1;
        *version
    }

    // == Insert ==
    /// Stores an entry, replacing any existing one under the same key.
    ///
    /// The size is computed here. If the write would push usage past the
    /// ceiling, existing entries are cleaned up until usage plus the new
    /// entry fits the implicit target; the new entry is not a candidate for
    /// that cleanup. If usage still ends above the ceiling, a
    /// `MemoryThresholdExceeded` event is pushed.
    pub fn insert(&mut self, mut entry: CacheEntry, now: DateTime<Utc>, events: &mut Vec<CacheEvent>) {
        entry.size_bytes = MemoryAccountant::estimate(&entry.key, entry.payload.as_ref());
        entry.version = self.version_of(&entry.category);

        if let Some(previous) = self.entries.remove(&entry.key) {
            self.memory.release(&previous.category, previous.size_bytes);
            entry.is_pinned = entry.is_pinned || previous.is_pinned;
        }

        let max = self.memory.max_bytes();
        let mark = events.len();
        if self.memory.would_exceed(entry.size_bytes) {
            let target = self.policy.implicit_target(max).saturating_sub(entry.size_bytes);
            self.cleanup(target, now, events);
        }

        self.memory.charge(&entry.category, entry.size_bytes);
        self.entries.insert(entry.key.clone(), entry);

        let usage = self.memory.current_usage();
        let reported = events[mark..]
            .iter()
            .any(|event| matches!(event, CacheEvent::MemoryThresholdExceeded { .. }));
        if usage > max && !reported {
            events.push(CacheEvent::MemoryThresholdExceeded { current: usage, max });
        }
    }

    /// Stores an entry read back from a snapshot. Bookkeeping fields are kept
    /// as loaded; size and version are recomputed. No cleanup runs.
    pub fn restore(&mut self, mut entry: CacheEntry) {
        entry.size_bytes = MemoryAccountant::estimate(&entry.key, entry.payload.as_ref());
        entry.version = self.version_of(&entry.category);

        if let Some(previous) = self.entries.remove(&entry.key) {
            self.memory.release(&previous.category, previous.size_bytes);
        }
        self.memory.charge(&entry.category, entry.size_bytes);
        self.entries.insert(entry.key.clone(), entry);
    }

    // == Get ==
    /// Retrieves a payload, recording the access.
    ///
    /// Stale entries are removed and counted as misses. An entry stored
    /// under another category is a miss and is left untouched.
    pub fn get(
        &mut self,
        key: &str,
        category: &str,
        now: DateTime<Utc>,
        events: &mut Vec<CacheEvent>,
    ) -> Option<Payload> {
        if self.entries.get(key).is_some_and(|entry| entry.category != category) {
            events.push(CacheEvent::miss(key, category));
            return None;
        }
        if self.evict_if_stale(key, now, events) {
            events.push(CacheEvent::miss(key, category));
            return None;
        }

        match self.entries.get_mut(key) {
            Some(entry) => {
                entry.touch(now);
                events.push(CacheEvent::hit(key, &entry.category));
                Some(entry.payload.clone())
            }
            None => {
                events.push(CacheEvent::miss(key, category));
                None
            }
        }
    }

    // == Contains ==
    /// Same staleness check as `get`, without touching access metadata.
    pub fn contains(&mut self, key: &str, now: DateTime<Utc>, events: &mut Vec<CacheEvent>) -> bool {
        if self.evict_if_stale(key, now, events) {
            return false;
        }
        self.entries.contains_key(key)
    }

    // == Remove ==
    /// Removes an entry by key.
    pub fn remove(&mut self, key: &str) -> Option<CacheEntry> {
        let entry = self.entries.remove(key)?;
        self.memory.release(&entry.category, entry.size_bytes);
        Some(entry)
    }

    // == Pinning ==
    /// Sets the pinned flag. Returns false if the key is absent.
    pub fn set_pinned(&mut self, key: &str, pinned: bool) -> bool {
        match self.entries.get_mut(key) {
            Some(entry) => {
                entry.is_pinned = pinned;
                true
            }
            None => false,
        }
    }

    // == Clear ==
    /// Removes every entry.
    pub fn clear(&mut self, events: &mut Vec<CacheEvent>) -> CleanupSummary {
        let mut summary = CleanupSummary::default();
        for (key, entry) in self.entries.drain() {
            summary.add(&entry);
            events.push(CacheEvent::evicted(&key, &entry.category, EvictionReason::Manual));
        }
        self.memory.reset();
        events.push(CacheEvent::CleanupCompleted {
            entries_removed: summary.entries_removed,
            bytes_freed: summary.bytes_freed,
        });
        summary
    }

    /// Removes every entry of one category.
    pub fn clear_category(&mut self, category: &str, events: &mut Vec<CacheEvent>) -> CleanupSummary {
        let keys = self.keys(Some(category));
        let summary = self.remove_all(&keys, EvictionReason::Manual, events);
        events.push(CacheEvent::CleanupCompleted {
            entries_removed: summary.entries_removed,
            bytes_freed: summary.bytes_freed,
        });
        summary
    }

    // == Cleanup Expired ==
    /// Removes every stale entry, pinned or not.
    pub fn invalidate_expired(&mut self, now: DateTime<Utc>, events: &mut Vec<CacheEvent>) -> CleanupSummary {
        let stale: Vec<String> = self
            .entries
            .values()
            .filter(|entry| self.is_stale(entry, now))
            .map(|entry| entry.key.clone())
            .collect();

        self.remove_all(&stale, EvictionReason::Expired, events)
    }

    // == Cleanup ==
    /// Frees memory down to `target_bytes`.
    ///
    /// Stale non-pinned entries go first, then non-pinned entries in LRU
    /// order. Pinned entries are never removed here, so the target may be
    /// missed. Returns None if usage was already at or below the target.
    pub fn cleanup(
        &mut self,
        target_bytes: u64,
        now: DateTime<Utc>,
        events: &mut Vec<CacheEvent>,
    ) -> Option<CleanupSummary> {
        if self.memory.current_usage() <= target_bytes {
            return None;
        }

        let stale: Vec<String> = self
            .entries
            .values()
            .filter(|entry| !entry.is_pinned && self.is_stale(entry, now))
            .map(|entry| entry.key.clone())
            .collect();
        let mut summary = self.remove_all(&stale, EvictionReason::Expired, events);

        let victims = self
            .policy
            .plan(self.entries.values(), self.memory.current_usage(), target_bytes);
        let lru = self.remove_all(&victims, EvictionReason::Lru, events);
        summary.entries_removed += lru.entries_removed;
        summary.bytes_freed += lru.bytes_freed;

        events.push(CacheEvent::CleanupCompleted {
            entries_removed: summary.entries_removed,
            bytes_freed: summary.bytes_freed,
        });

        let usage = self.memory.current_usage();
        let max = self.memory.max_bytes();
        if usage > target_bytes || self.policy.over_threshold(usage, max) {
            events.push(CacheEvent::MemoryThresholdExceeded { current: usage, max });
        }

        Some(summary)
    }

    // == Queries ==
    /// Returns an entry without touching access metadata.
    pub fn entry(&self, key: &str) -> Option<&CacheEntry> {
        self.entries.get(key)
    }

    /// True if `key` is present and stored under `category`.
    pub fn holds(&self, key: &str, category: &str) -> bool {
        self.entries.get(key).is_some_and(|entry| entry.category == category)
    }

    /// Keys of all entries, or of one category. Sorted.
    pub fn keys(&self, category: Option<&str>) -> Vec<String> {
        let mut keys: Vec<String> = self
            .entries
            .values()
            .filter(|entry| category.map_or(true, |c| entry.category == c))
            .map(|entry| entry.key.clone())
            .collect();
        keys.sort();
        keys
    }

    pub fn entries(&self) -> impl Iterator<Item = &CacheEntry> {
        self.entries.values()
    }

    pub fn memory(&self) -> &MemoryAccountant {
        &self.memory
    }

    // == Length ==
    /// Returns the current number of entries in the store.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    // == Is Empty ==
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Recomputes usage by full scan and compares it with the running totals.
    pub fn verify_accounting(&self) -> bool {
        let total: u64 = self.entries.values().map(|entry| entry.size_bytes).sum();
        total == self.memory.current_usage()
    }

    // == Staleness ==
    /// Judges an entry under the current strategy and its category generation.
    pub fn is_stale(&self, entry: &CacheEntry, now: DateTime<Utc>) -> bool {
        let ctx = StalenessContext {
            now,
            default_expiration: self.default_expiration,
            category_version: self.version_of(&entry.category),
        };
        self.strategy.is_stale(entry, &ctx)
    }

    // == Internals ==
    /// Removes `key` if present and stale. Returns true if it was removed.
    fn evict_if_stale(&mut self, key: &str, now: DateTime<Utc>, events: &mut Vec<CacheEvent>) -> bool {
        let stale = self
            .entries
            .get(key)
            .is_some_and(|entry| self.is_stale(entry, now));
        if stale {
            if let Some(entry) = self.remove(key) {
                events.push(CacheEvent::evicted(key, &entry.category, EvictionReason::Expired));
            }
        }
        stale
    }

    fn remove_all(
        &mut self,
        keys: &[String],
        reason: EvictionReason,
        events: &mut Vec<CacheEvent>,
    ) -> CleanupSummary {
        let mut summary = CleanupSummary::default();
        for key in keys {
            if let Some(entry) = self.remove(key) {
                summary.add(&entry);
                events.push(CacheEvent::evicted(key, &entry.category, reason));
            }
        }
        summary
    }
}
