//! Invalidation Strategy Module
//!
//! Decides whether an entry is stale at read or sweep time.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::cache::entry::{to_chrono, CacheEntry};

/// Error type for parsing an invalidation strategy
#[derive(Debug, Clone)]
pub struct ParseStrategyError(String);

impl fmt::Display for ParseStrategyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Invalid strategy: {}", self.0)
    }
}

impl std::error::Error for ParseStrategyError {}

impl ParseStrategyError {
    pub(crate) fn new(value: &str) -> Self {
        Self(value.to_string())
    }
}

// == Invalidation Strategy ==
/// Policy used to decide staleness.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum InvalidationStrategy {
    /// Stale once `expires_at` has passed
    TimeBased,
    /// Stale once unread for longer than the default expiration
    AccessBased,
    /// Time-based, plus stale once the category generation moves past the
    /// entry's version
    VersionBased,
    /// Never stale; only explicit removal takes effect
    Manual,
    /// Time-based, plus stale once unread for twice the default expiration
    #[default]
    Smart,
}

/// Inputs a staleness check needs besides the entry itself.
#[derive(Debug, Clone, Copy)]
pub struct StalenessContext {
    pub now: DateTime<Utc>,
    /// Zero disables the access-based clauses.
    pub default_expiration: Duration,
    /// Current generation of the entry's category.
    pub category_version: u64,
}

impl InvalidationStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            InvalidationStrategy::TimeBased => "time_based",
            InvalidationStrategy::AccessBased => "access_based",
            InvalidationStrategy::VersionBased => "version_based",
            InvalidationStrategy::Manual => "manual",
            InvalidationStrategy::Smart => "smart",
        }
    }

    // == Is Stale ==
    /// Returns true if `entry` should be treated as a miss and removed.
    ///
    /// Boundary: an entry is stale only when `now` is strictly after
    /// `expires_at`, or when idle time strictly exceeds the threshold.
    pub fn is_stale(&self, entry: &CacheEntry, ctx: &StalenessContext) -> bool {
        match self {
            InvalidationStrategy::TimeBased => past_deadline(entry, ctx.now),
            InvalidationStrategy::AccessBased => idle_longer_than(entry, ctx, 1),
            InvalidationStrategy::VersionBased => {
                past_deadline(entry, ctx.now) || entry.version < ctx.category_version
            }
            InvalidationStrategy::Manual => false,
            InvalidationStrategy::Smart => {
                past_deadline(entry, ctx.now) || idle_longer_than(entry, ctx, 2)
            }
        }
    }
}

fn past_deadline(entry: &CacheEntry, now: DateTime<Utc>) -> bool {
    entry.expires_at.is_some_and(|expires| now > expires)
}

fn idle_longer_than(entry: &CacheEntry, ctx: &StalenessContext, multiplier: u32) -> bool {
    if ctx.default_expiration.is_zero() {
        return false;
    }
    let threshold = to_chrono(ctx.default_expiration.saturating_mul(multiplier));
    entry.idle_for(ctx.now) > threshold
}

impl fmt::Display for InvalidationStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InvalidationStrategy {
    type Err = ParseStrategyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "time_based" | "time" | "ttl" => Ok(InvalidationStrategy::TimeBased),
            "access_based" | "access" => Ok(InvalidationStrategy::AccessBased),
            "version_based" | "version" => Ok(InvalidationStrategy::VersionBased),
            "manual" => Ok(InvalidationStrategy::Manual),
            "smart" => Ok(InvalidationStrategy::Smart),
            _ => Err(ParseStrategyError::new(s)),
        }
    }
}
