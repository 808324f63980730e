//! Cache Module
//!
//! In-memory media cache with memory-bounded LRU eviction, pluggable
//! staleness policies, snapshot persistence and warmup.

mod clock;
mod engine;
mod entry;
mod events;
mod eviction;
mod invalidation;
mod keys;
mod memory;
mod payload;
mod persistence;
mod stats;
mod store;
mod warmup;


// Re-export public types
pub use clock::{Clock, ManualClock, SharedClock, SystemClock};
pub use engine::{media_codecs, MediaCache, PutOptions, EVENT_CHANNEL_CAPACITY};
pub use entry::{to_chrono, CacheEntry};
pub use events::{CacheEvent, EvictionReason};
pub use eviction::{EvictionPolicy, CLEANUP_TARGET_FRACTION, CLEANUP_THRESHOLD_FRACTION};
pub use invalidation::{InvalidationStrategy, ParseStrategyError, StalenessContext};
pub use keys::{
    item_key, metadata_key, search_key, ITEM_NAMESPACE, METADATA_NAMESPACE, SEARCH_CATEGORY,
    SEARCH_NAMESPACE,
};
pub use memory::MemoryAccountant;
pub use payload::{serialized_len, Cacheable, CodecRegistry, JsonCodec, Payload, PayloadCodec};
pub use persistence::{
    read_document, write_document, PersistenceCodec, SnapshotDocument, SnapshotEntry,
    SnapshotPayload, SNAPSHOT_VERSION,
};
pub use stats::{CacheStatistics, MemorySnapshot, StatisticsCollector};
pub use store::{CacheStore, CleanupSummary};
pub use warmup::{
    NoopWarmupSource, WarmupCandidate, WarmupPlanner, WarmupSource, WarmupStrategy,
    DEFAULT_WARMUP_LIMIT,
};
