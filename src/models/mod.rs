//! Domain records and admin API models
//!
//! `media` holds the library records the cache stores. `requests` and
//! `responses` define the DTOs used for HTTP request and response bodies.

pub mod media;
pub mod requests;
pub mod responses;

// Re-export commonly used types
pub use media::MediaItem;
pub use requests::{CleanupRequest, KeyRequest, KeysQuery, MetadataRequest};
pub use responses::{
    CleanupResponse, HealthResponse, KeysResponse, MessageResponse, MetadataResponse,
    PersistResponse,
};
