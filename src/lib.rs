//! Media Cache - metadata caching engine for a media library
//!
//! Memory-bounded in-memory cache with LRU eviction, pluggable staleness
//! policies, snapshot persistence, warmup and a small admin HTTP API.

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod models;
pub mod tasks;

pub use api::AppState;
pub use cache::{media_codecs, MediaCache};
pub use config::Config;
pub use error::{CacheError, Result};
pub use tasks::{spawn_maintenance_task, MaintenanceScheduler};
