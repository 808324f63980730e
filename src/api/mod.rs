//! API Module
//!
//! HTTP handlers and routing for the cache admin API.
//!
//! # Endpoints
//! - `GET /health` - Health check endpoint
//! - `GET /stats` - Diagnostics export
//! - `PUT /metadata` - Store a metadata value
//! - `GET /metadata/:category/:key` - Retrieve a metadata value
//! - `DELETE /metadata/:category/:key` - Delete a metadata value
//! - `POST /entries/pin` - Exempt an entry from eviction
//! - `POST /entries/unpin` - Make an entry evictable again
//! - `GET /keys` - List keys, optionally of one category
//! - `POST /cleanup` - Free memory down to a target
//! - `POST /invalidate` - Remove stale entries
//! - `POST /persist` - Write a snapshot
//! - `DELETE /categories/:category` - Clear one category

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;
