//! Media Cache Engine
//!
//! Thread-safe front of the cache. Owns the store behind one lock, the
//! statistics collector behind another, and the event channel.
//!
//! # Locking
//! Every operation takes the store lock once, collects the events it causes,
//! releases the lock and only then publishes them. Observers can therefore
//! call back into the cache without deadlocking.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use serde_json::{json, Value};
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

use crate::cache::clock::{Clock, SharedClock, SystemClock};
use crate::cache::entry::CacheEntry;
use crate::cache::events::CacheEvent;
use crate::cache::invalidation::InvalidationStrategy;
use crate::cache::keys::{item_key, metadata_key, search_key, SEARCH_CATEGORY};
use crate::cache::payload::{Cacheable, CodecRegistry, JsonCodec, Payload};
use crate::cache::persistence::{read_document, write_document, PersistenceCodec};
use crate::cache::stats::{CacheStatistics, MemorySnapshot, StatisticsCollector};
use crate::cache::store::{CacheStore, CleanupSummary};
use crate::cache::warmup::{WarmupPlanner, WarmupSource, WarmupStrategy};
use crate::config::Config;
use crate::error::Result;
use crate::models::MediaItem;

/// Buffered events per subscriber before the slowest one starts lagging.
pub const EVENT_CHANNEL_CAPACITY: usize = 256;

const LOG_KEY_LIMIT: usize = 50;

// == Put Options ==
/// Per-write settings for `MediaCache::put_with`.
#[derive(Debug, Clone)]
pub struct PutOptions {
    /// TTL override; None or zero falls back to the default expiration
    pub ttl: Option<Duration>,
    pub source: String,
    pub metadata: HashMap<String, Value>,
    pub pinned: bool,
}

impl Default for PutOptions {
    fn default() -> Self {
        Self {
            ttl: None,
            source: "manual".to_string(),
            metadata: HashMap::new(),
            pinned: false,
        }
    }
}

impl PutOptions {
    pub fn ttl(mut self, ttl: Option<Duration>) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn source(mut self, source: impl Into<String>) -> Self {
        self.source = source.into();
        self
    }

    pub fn metadata(mut self, key: impl Into<String>, value: Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    pub fn pinned(mut self, pinned: bool) -> Self {
        self.pinned = pinned;
        self
    }
}

#[derive(Debug, Clone)]
struct Settings {
    warmup_strategy: WarmupStrategy,
    auto_persistence: bool,
    persistence_path: Option<PathBuf>,
}

// == Media Cache ==
#[derive(Debug)]
pub struct MediaCache {
    store: Mutex<CacheStore>,
    stats: StatisticsCollector,
    codecs: CodecRegistry,
    clock: SharedClock,
    events: broadcast::Sender<CacheEvent>,
    settings: RwLock<Settings>,
}

impl MediaCache {
    // == Constructors ==
    /// Creates a cache driven by the system clock.
    pub fn new(config: &Config, codecs: CodecRegistry) -> Self {
        Self::with_clock(config, codecs, Arc::new(SystemClock))
    }

    /// Creates a cache reading time from `clock`.
    pub fn with_clock(config: &Config, codecs: CodecRegistry, clock: SharedClock) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let store = CacheStore::new(
            config.max_memory_bytes,
            config.default_expiration(),
            config.invalidation_strategy,
        );

        Self {
            store: Mutex::new(store),
            stats: StatisticsCollector::new(),
            codecs,
            clock,
            events,
            settings: RwLock::new(Settings {
                warmup_strategy: config.warmup_strategy,
                auto_persistence: config.auto_persistence,
                persistence_path: config.persistence_path.clone(),
            }),
        }
    }

    // == Put ==
    /// Stores a payload under `key`, replacing any existing entry.
    pub fn put(&self, key: &str, payload: Payload, category: &str, ttl: Option<Duration>) {
        self.put_with(key, payload, category, PutOptions::default().ttl(ttl));
    }

    pub fn put_with(&self, key: &str, payload: Payload, category: &str, options: PutOptions) {
        debug!("PUT key={} category={}", short_key(key), category);
        self.with_store(|store, now, events| {
            let ttl = store.resolve_ttl(options.ttl);
            let mut entry = CacheEntry::new(key, payload, category, now, ttl)
                .with_source(options.source)
                .with_metadata(options.metadata);
            entry.is_pinned = options.pinned;
            store.insert(entry, now, events);
        });
    }

    // == Get ==
    /// Retrieves a payload. Stale entries are removed and reported as misses.
    pub fn get(&self, key: &str, category: &str) -> Option<Payload> {
        let payload = self.with_store(|store, now, events| store.get(key, category, now, events));
        debug!(
            "GET key={} category={} {}",
            short_key(key),
            category,
            if payload.is_some() { "hit" } else { "miss" }
        );
        payload
    }

    /// Retrieves a payload and clones it out as `T`. None if absent, stale
    /// or of another type.
    pub fn get_as<T: Cacheable + Clone>(&self, key: &str, category: &str) -> Option<T> {
        self.get(key, category)
            .and_then(|payload| payload.downcast_ref::<T>().cloned())
    }

    // == Contains ==
    /// Same staleness check as `get`, without touching access metadata or
    /// counting a hit or miss. False if the key is stored under another
    /// category.
    pub fn contains(&self, key: &str, category: &str) -> bool {
        self.with_store(|store, now, events| {
            store.holds(key, category) && store.contains(key, now, events)
        })
    }

    // == Remove ==
    /// Removes an entry. Returns whether something was removed; an entry
    /// stored under another category is left alone.
    pub fn remove(&self, key: &str, category: &str) -> bool {
        let removed = self.with_store(|store, _, _| {
            store.holds(key, category) && store.remove(key).is_some()
        });
        debug!("REMOVE key={} category={} removed={}", short_key(key), category, removed);
        removed
    }

    // == Pinning ==
    /// Exempts an entry from eviction. Returns false if the key is absent
    /// or stored under another category.
    pub fn pin(&self, key: &str, category: &str) -> bool {
        self.with_store(|store, _, _| store.holds(key, category) && store.set_pinned(key, true))
    }

    pub fn unpin(&self, key: &str, category: &str) -> bool {
        self.with_store(|store, _, _| store.holds(key, category) && store.set_pinned(key, false))
    }

    // == Bulk Removal ==
    pub fn clear(&self) -> CleanupSummary {
        let summary = self.with_store(|store, _, events| store.clear(events));
        info!("Cache cleared: {} entries removed", summary.entries_removed);
        summary
    }

    pub fn clear_category(&self, category: &str) -> CleanupSummary {
        let summary = self.with_store(|store, _, events| store.clear_category(category, events));
        info!(
            "Category '{}' cleared: {} entries removed",
            category, summary.entries_removed
        );
        summary
    }

    // == Maintenance ==
    /// Removes every stale entry, pinned ones included.
    pub fn invalidate_expired(&self) -> CleanupSummary {
        let summary = self.with_store(|store, now, events| store.invalidate_expired(now, events));
        if summary.entries_removed > 0 {
            info!("Invalidated {} expired entries", summary.entries_removed);
        }
        summary
    }

    /// Frees memory down to `target_bytes`, or to 70% of the ceiling when no
    /// target is given. Returns None if usage was already at or below it.
    pub fn cleanup(&self, target_bytes: Option<u64>) -> Option<CleanupSummary> {
        let summary = self.with_store(|store, now, events| {
            let target = target_bytes
                .unwrap_or_else(|| store.policy().implicit_target(store.max_memory_bytes()));
            store.cleanup(target, now, events)
        });
        if let Some(summary) = summary {
            info!(
                "Cleanup freed {} bytes from {} entries",
                summary.bytes_freed, summary.entries_removed
            );
        }
        summary
    }

    /// Whether usage is above 90% of the ceiling.
    pub fn over_threshold(&self) -> bool {
        let store = self.store.lock();
        store
            .policy()
            .over_threshold(store.memory().current_usage(), store.max_memory_bytes())
    }

    /// Advances a category's generation. Under `VersionBased` every entry
    /// stored before the bump becomes stale.
    pub fn bump_version(&self, category: &str) -> u64 {
        let version = self.with_store(|store, _, _| store.bump_version(category));
        debug!("Category '{}' now at version {}", category, version);
        version
    }

    // == Statistics ==
    pub fn statistics(&self) -> CacheStatistics {
        let memory = {
            let store = self.store.lock();
            MemorySnapshot {
                entries: store.len(),
                current_usage: store.memory().current_usage(),
                max_usage: store.max_memory_bytes(),
                category_sizes: store.memory().category_totals(),
            }
        };
        self.stats.snapshot(memory)
    }

    /// Takes a statistics snapshot and publishes it as `StatisticsUpdated`.
    pub fn publish_statistics(&self) -> CacheStatistics {
        let statistics = self.statistics();
        self.publish(
            self.clock.now(),
            vec![CacheEvent::StatisticsUpdated(statistics.clone())],
        );
        statistics
    }

    /// Diagnostics document as pretty JSON.
    pub fn export_statistics(&self) -> String {
        self.statistics().export_json()
    }

    pub fn reset_statistics(&self) {
        self.stats.reset();
    }

    // == Introspection ==
    /// Copy of an entry, without bumping access metadata.
    pub fn entry_info(&self, key: &str) -> Option<CacheEntry> {
        self.store.lock().entry(key).cloned()
    }

    pub fn keys(&self, category: Option<&str>) -> Vec<String> {
        self.store.lock().keys(category)
    }

    pub fn len(&self) -> usize {
        self.store.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.lock().is_empty()
    }

    pub fn current_memory_usage(&self) -> u64 {
        self.store.lock().memory().current_usage()
    }

    pub fn max_memory_bytes(&self) -> u64 {
        self.store.lock().max_memory_bytes()
    }

    /// Recomputes usage by full scan and compares it with the running total.
    pub fn verify_accounting(&self) -> bool {
        self.store.lock().verify_accounting()
    }

    // == Settings ==
    /// Changes the ceiling, cleaning up immediately if usage is above it.
    pub fn set_max_memory_bytes(&self, max_bytes: u64) -> Option<CleanupSummary> {
        info!("Max memory set to {} bytes", max_bytes);
        self.with_store(|store, now, events| store.set_max_memory_bytes(max_bytes, now, events))
    }

    pub fn default_expiration(&self) -> Duration {
        self.store.lock().default_expiration()
    }

    /// Applies to later writes only. Zero disables the default TTL.
    pub fn set_default_expiration(&self, default_expiration: Duration) {
        self.store.lock().set_default_expiration(default_expiration);
    }

    pub fn invalidation_strategy(&self) -> InvalidationStrategy {
        self.store.lock().strategy()
    }

    pub fn set_invalidation_strategy(&self, strategy: InvalidationStrategy) {
        info!("Invalidation strategy set to {}", strategy);
        self.store.lock().set_strategy(strategy);
    }

    pub fn warmup_strategy(&self) -> WarmupStrategy {
        self.settings.read().warmup_strategy
    }

    pub fn set_warmup_strategy(&self, strategy: WarmupStrategy) {
        self.settings.write().warmup_strategy = strategy;
    }

    pub fn auto_persistence(&self) -> bool {
        self.settings.read().auto_persistence
    }

    pub fn persistence_path(&self) -> Option<PathBuf> {
        self.settings.read().persistence_path.clone()
    }

    /// Enables or disables periodic snapshots. A given path replaces the
    /// configured one.
    pub fn set_auto_persistence(&self, enabled: bool, path: Option<PathBuf>) {
        let mut settings = self.settings.write();
        settings.auto_persistence = enabled;
        if let Some(path) = path {
            settings.persistence_path = Some(path);
        }
    }

    // == Events ==
    /// Receives every event published after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<CacheEvent> {
        self.events.subscribe()
    }

    pub fn clock(&self) -> &SharedClock {
        &self.clock
    }

    // == Persistence ==
    /// Writes every entry to `path`. Returns the number of entries written.
    ///
    /// Encoding happens under the store lock; file I/O does not.
    pub fn save_to_file(&self, path: &Path) -> Result<usize> {
        let now = self.clock.now();
        let document = {
            let store = self.store.lock();
            PersistenceCodec::new(&self.codecs).encode(store.entries(), now)
        };
        let count = document.entries.len();

        match write_document(path, &document) {
            Ok(()) => {
                info!("Saved {} cache entries to {}", count, path.display());
                Ok(count)
            }
            Err(e) => {
                error!("Failed to save cache to {}: {}", path.display(), e);
                Err(e)
            }
        }
    }

    /// Loads entries from `path`, skipping those already stale under the
    /// current strategy. Returns the number of entries loaded.
    ///
    /// A file that cannot be read or decoded leaves the cache untouched.
    pub fn load_from_file(&self, path: &Path) -> Result<usize> {
        let decoded = read_document(path).and_then(|document| {
            PersistenceCodec::new(&self.codecs).decode(document, self.clock.now())
        });
        let entries = match decoded {
            Ok(entries) => entries,
            Err(e) => {
                error!("Failed to load cache from {}: {}", path.display(), e);
                return Err(e);
            }
        };

        let loaded = self.with_store(|store, now, events| {
            let mut loaded = 0;
            for mut entry in entries {
                entry.version = store.version_of(&entry.category);
                if store.is_stale(&entry, now) {
                    debug!("Skipping stale snapshot entry {}", short_key(&entry.key));
                    continue;
                }
                store.restore(entry);
                loaded += 1;
            }

            if store.memory().current_usage() > store.max_memory_bytes() {
                let target = store.policy().implicit_target(store.max_memory_bytes());
                store.cleanup(target, now, events);
            }
            loaded
        });

        info!("Loaded {} cache entries from {}", loaded, path.display());
        Ok(loaded)
    }

    /// Saves to the configured path if auto-persistence is enabled.
    /// Returns None when nothing was attempted.
    pub fn persist(&self) -> Result<Option<usize>> {
        let settings = self.settings.read().clone();
        match (settings.auto_persistence, settings.persistence_path) {
            (true, Some(path)) => self.save_to_file(&path).map(Some),
            _ => Ok(None),
        }
    }

    // == Lifecycle ==
    /// Loads the snapshot when auto-persistence is enabled and the file
    /// exists. Returns the number of entries loaded.
    pub fn initialize(&self) -> Result<usize> {
        let settings = self.settings.read().clone();
        match settings.persistence_path {
            Some(path) if settings.auto_persistence && path.exists() => self.load_from_file(&path),
            _ => Ok(0),
        }
    }

    /// Saves when auto-persistence is enabled, then empties the cache and
    /// resets statistics. The cache stays usable afterwards.
    pub fn shutdown(&self) -> Result<()> {
        let saved = self.persist();
        self.with_store(|store, _, events| {
            store.clear(events);
        });
        self.stats.reset();
        info!("Media cache shut down");
        saved.map(|_| ())
    }

    // == Warmup ==
    /// Pre-loads entries from `source` using the configured warmup strategy.
    pub fn warmup(&self, source: &dyn WarmupSource) -> usize {
        WarmupPlanner::default().warmup(self, source, self.warmup_strategy())
    }

    pub(crate) fn finish_warmup(&self, entries_warmed: usize) {
        let now = self.clock.now();
        self.stats.record_warmup(now);
        self.publish(now, vec![CacheEvent::WarmupCompleted { entries_warmed }]);
    }

    // == Media Items ==
    /// Caches a library item under `music:<category>:<id>`.
    pub fn put_item(&self, id: i64, item: MediaItem, category: &str, ttl: Option<Duration>) {
        let options = PutOptions::default()
            .ttl(ttl)
            .metadata("itemId", json!(id))
            .metadata("category", json!(category));
        self.put_with(&item_key(category, id), Arc::new(item), category, options);
    }

    pub fn get_item(&self, id: i64, category: &str) -> Option<MediaItem> {
        self.get_as(&item_key(category, id), category)
    }

    pub fn contains_item(&self, id: i64, category: &str) -> bool {
        self.contains(&item_key(category, id), category)
    }

    pub fn remove_item(&self, id: i64, category: &str) -> bool {
        self.remove(&item_key(category, id), category)
    }

    // == Search Results ==
    /// Caches a search result set. Without an override the TTL is half the
    /// default expiration.
    pub fn put_search_results(&self, search: &str, items: Vec<MediaItem>, ttl: Option<Duration>) {
        let ttl = ttl.filter(|ttl| !ttl.is_zero()).or_else(|| {
            let default = self.default_expiration();
            (!default.is_zero()).then(|| default / 2)
        });
        let options = PutOptions::default()
            .ttl(ttl)
            .source("search")
            .metadata("searchKey", json!(search))
            .metadata("resultCount", json!(items.len()));
        self.put_with(&search_key(search), Arc::new(items), SEARCH_CATEGORY, options);
    }

    pub fn get_search_results(&self, search: &str) -> Option<Vec<MediaItem>> {
        self.get_as(&search_key(search), SEARCH_CATEGORY)
    }

    pub fn contains_search_results(&self, search: &str) -> bool {
        self.contains(&search_key(search), SEARCH_CATEGORY)
    }

    pub fn remove_search_results(&self, search: &str) -> bool {
        self.remove(&search_key(search), SEARCH_CATEGORY)
    }

    // == Metadata ==
    /// Caches a JSON value under `meta:<category>:<key>`.
    pub fn put_metadata(&self, key: &str, value: Value, category: &str, ttl: Option<Duration>) {
        let options = PutOptions::default()
            .ttl(ttl)
            .source("metadata")
            .metadata("originalKey", json!(key))
            .metadata("category", json!(category));
        self.put_with(&metadata_key(category, key), Arc::new(value), category, options);
    }

    pub fn get_metadata(&self, key: &str, category: &str) -> Option<Value> {
        self.get_as(&metadata_key(category, key), category)
    }

    pub fn contains_metadata(&self, key: &str, category: &str) -> bool {
        self.contains(&metadata_key(category, key), category)
    }

    pub fn remove_metadata(&self, key: &str, category: &str) -> bool {
        self.remove(&metadata_key(category, key), category)
    }

    // == Internals ==
    fn with_store<R>(&self, f: impl FnOnce(&mut CacheStore, DateTime<Utc>, &mut Vec<CacheEvent>) -> R) -> R {
        let now = self.clock.now();
        let mut events = Vec::new();
        let result = {
            let mut store = self.store.lock();
            f(&mut store, now, &mut events)
        };
        self.publish(now, events);
        result
    }

    /// Feeds events to the statistics collector, then to subscribers.
    fn publish(&self, now: DateTime<Utc>, events: Vec<CacheEvent>) {
        for event in events {
            self.stats.observe(&event);
            match &event {
                CacheEvent::CleanupCompleted { .. } => self.stats.record_cleanup(now),
                CacheEvent::MemoryThresholdExceeded { current, max } => {
                    warn!("Memory usage {} bytes still above threshold (max {})", current, max);
                }
                _ => {}
            }
            // No subscribers is not an error
            let _ = self.events.send(event);
        }
    }
}

/// Codecs for every payload type the media library caches.
pub fn media_codecs() -> CodecRegistry {
    let mut codecs = CodecRegistry::with_builtin_types();
    codecs
        .register_type("media_item", JsonCodec::<MediaItem>::new())
        .register_type("media_items", JsonCodec::<Vec<MediaItem>>::new());
    codecs
}

fn short_key(key: &str) -> &str {
    match key.char_indices().nth(LOG_KEY_LIMIT) {
        Some((idx, _)) => &key[..idx],
        None => key,
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::clock::ManualClock;
    use crate::cache::events::EvictionReason;

    fn config() -> Config {
        Config {
            persistence_path: None,
            ..Config::default()
        }
    }

    fn cache_with_clock() -> (MediaCache, ManualClock) {
        let clock = ManualClock::starting_now();
        let cache = MediaCache::with_clock(&config(), media_codecs(), Arc::new(clock.clone()));
        (cache, clock)
    }

    fn text(value: &str) -> Payload {
        Arc::new(value.to_string())
    }

    #[test]
    fn test_put_get_counts_hit() {
        let (cache, _) = cache_with_clock();
        cache.put("music:music:1", text("song"), "music", None);

        let payload = cache.get("music:music:1", "music").unwrap();

        assert_eq!(payload.downcast_ref::<String>().unwrap(), "song");
        let stats = cache.statistics();
        assert_eq!(stats.total_hits, 1);
        assert_eq!(stats.category_hits.get("music"), Some(&1));
    }

    #[test]
    fn test_contains_does_not_count() {
        let (cache, _) = cache_with_clock();
        cache.put("k", text("v"), "music", None);

        assert!(cache.contains("k", "music"));
        assert!(!cache.contains("other", "music"));

        let stats = cache.statistics();
        assert_eq!(stats.total_hits, 0);
        assert_eq!(stats.total_misses, 0);
    }

    #[test]
    fn test_get_as_wrong_type_is_none() {
        let (cache, _) = cache_with_clock();
        cache.put("k", text("v"), "music", None);

        assert!(cache.get_as::<MediaItem>("k", "music").is_none());
        assert_eq!(cache.get_as::<String>("k", "music").as_deref(), Some("v"));
    }

    #[test]
    fn test_expired_get_counts_eviction_and_miss() {
        let (cache, clock) = cache_with_clock();
        cache.put("k", text("v"), "music", Some(Duration::from_secs(10)));

        clock.advance(Duration::from_secs(11));

        assert!(cache.get("k", "music").is_none());
        let stats = cache.statistics();
        assert_eq!(stats.total_misses, 1);
        assert_eq!(stats.total_evictions, 1);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_events_published_after_operation() {
        let (cache, _) = cache_with_clock();
        let mut rx = cache.subscribe();

        cache.put("k", text("v"), "music", None);
        cache.get("k", "music");
        cache.get("missing", "music");

        assert_eq!(rx.try_recv().unwrap(), CacheEvent::hit("k", "music"));
        assert_eq!(rx.try_recv().unwrap(), CacheEvent::miss("missing", "music"));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_clear_category_publishes_manual_evictions() {
        let (cache, _) = cache_with_clock();
        cache.put("a", text("v"), "music", None);
        cache.put("b", text("v"), "search", None);
        let mut rx = cache.subscribe();

        cache.clear_category("search");

        assert_eq!(
            rx.try_recv().unwrap(),
            CacheEvent::evicted("b", "search", EvictionReason::Manual)
        );
        assert!(matches!(
            rx.try_recv().unwrap(),
            CacheEvent::CleanupCompleted { entries_removed: 1, .. }
        ));
        assert_eq!(cache.keys(None), vec!["a".to_string()]);
        assert!(cache.statistics().last_cleanup.is_some());
    }

    #[test]
    fn test_item_facade() {
        let (cache, _) = cache_with_clock();
        let item = MediaItem::new(7, "Nina Simone", "Sinnerman");
        cache.put_item(7, item.clone(), "music", None);

        assert!(cache.contains_item(7, "music"));
        assert_eq!(cache.get_item(7, "music"), Some(item));

        let info = cache.entry_info("music:music:7").unwrap();
        assert_eq!(info.source, "manual");
        assert_eq!(info.metadata.get("itemId"), Some(&json!(7)));

        assert!(cache.remove_item(7, "music"));
        assert!(!cache.remove_item(7, "music"));
    }

    #[test]
    fn test_search_results_default_to_half_ttl() {
        let (cache, clock) = cache_with_clock();
        let items = vec![MediaItem::new(1, "A", "B"), MediaItem::new(2, "C", "D")];
        cache.put_search_results("genre:jazz", items.clone(), None);

        let key = search_key("genre:jazz");
        let info = cache.entry_info(&key).unwrap();
        assert_eq!(info.category, SEARCH_CATEGORY);
        assert_eq!(info.source, "search");
        assert_eq!(info.metadata.get("resultCount"), Some(&json!(2)));
        assert_eq!(
            info.expires_at,
            Some(clock.now() + chrono::Duration::seconds(1800))
        );
        assert_eq!(cache.get_search_results("genre:jazz"), Some(items));
    }

    #[test]
    fn test_metadata_facade() {
        let (cache, _) = cache_with_clock();
        cache.put_metadata("cover:12", json!({"url": "x.png"}), "metadata", None);

        assert!(cache.contains_metadata("cover:12", "metadata"));
        assert_eq!(
            cache.get_metadata("cover:12", "metadata"),
            Some(json!({"url": "x.png"}))
        );
        assert!(cache.keys(Some("metadata")).contains(&"meta:metadata:cover:12".to_string()));
        assert!(cache.remove_metadata("cover:12", "metadata"));
    }

    #[test]
    fn test_pin_unknown_key() {
        let (cache, _) = cache_with_clock();
        assert!(!cache.pin("nope", "music"));
        assert!(!cache.unpin("nope", "music"));
    }

    #[test]
    fn test_raw_key_calls_respect_category() {
        let (cache, _) = cache_with_clock();
        cache.put("k", text("v"), "music", None);

        assert!(!cache.contains("k", "search"));
        assert!(!cache.pin("k", "search"));
        assert!(!cache.entry_info("k").unwrap().is_pinned);
        assert!(!cache.remove("k", "search"));
        assert!(cache.get("k", "search").is_none());

        let stats = cache.statistics();
        assert_eq!(stats.total_hits, 0);
        assert_eq!(stats.total_misses, 1);
        assert_eq!(stats.category_hits.get("music"), None);

        assert!(cache.get("k", "music").is_some());
        assert_eq!(cache.statistics().category_hits.get("music"), Some(&1));
        assert!(cache.pin("k", "music"));
        assert!(cache.remove("k", "music"));
    }

    #[test]
    fn test_persist_disabled_is_noop() {
        let (cache, _) = cache_with_clock();
        assert!(matches!(cache.persist(), Ok(None)));
        assert!(matches!(cache.initialize(), Ok(0)));
    }

    #[test]
    fn test_shutdown_clears_and_resets() {
        let (cache, _) = cache_with_clock();
        cache.put("k", text("v"), "music", None);
        cache.get("k", "music");

        cache.shutdown().unwrap();

        assert!(cache.is_empty());
        assert_eq!(cache.statistics().total_hits, 0);
        assert_eq!(cache.statistics().total_evictions, 0);
    }

    #[test]
    fn test_short_key_truncates_on_char_boundary() {
        let long = "é".repeat(80);
        assert_eq!(short_key(&long).chars().count(), LOG_KEY_LIMIT);
        assert_eq!(short_key("music:music:1"), "music:music:1");
    }
}
