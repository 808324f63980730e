//! Cache Warmup
//!
//! Pre-loads entries before first access. Which entries are worth loading is
//! the backing store's business; this module only asks and inserts.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::cache::engine::{MediaCache, PutOptions};
use crate::cache::invalidation::ParseStrategyError;
use crate::cache::payload::Payload;

/// Candidate cap for every strategy except `Full`.
pub const DEFAULT_WARMUP_LIMIT: usize = 500;

// == Warmup Strategy ==
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum WarmupStrategy {
    NoWarmup,
    /// Most played items
    #[default]
    PopularItems,
    /// Most recently played items
    RecentItems,
    /// Items the source predicts will be requested
    Predictive,
    /// Everything the source offers
    Full,
}

impl WarmupStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            WarmupStrategy::NoWarmup => "no_warmup",
            WarmupStrategy::PopularItems => "popular_items",
            WarmupStrategy::RecentItems => "recent_items",
            WarmupStrategy::Predictive => "predictive",
            WarmupStrategy::Full => "full",
        }
    }
}

impl fmt::Display for WarmupStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WarmupStrategy {
    type Err = ParseStrategyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "no_warmup" | "none" | "off" => Ok(WarmupStrategy::NoWarmup),
            "popular_items" | "popular" => Ok(WarmupStrategy::PopularItems),
            "recent_items" | "recent" => Ok(WarmupStrategy::RecentItems),
            "predictive" => Ok(WarmupStrategy::Predictive),
            "full" => Ok(WarmupStrategy::Full),
            _ => Err(ParseStrategyError::new(s)),
        }
    }
}

// == Warmup Source ==
/// An entry the backing store suggests pre-loading.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WarmupCandidate {
    pub key: String,
    pub category: String,
}

/// The backing store, seen from the warmup side.
pub trait WarmupSource: Send + Sync {
    /// Keys worth pre-loading under `strategy`, best first, at most `limit`.
    fn candidates(&self, strategy: WarmupStrategy, limit: usize) -> Vec<WarmupCandidate>;

    /// Loads the payload for one candidate. None if it no longer exists.
    fn fetch(&self, candidate: &WarmupCandidate) -> Option<Payload>;
}

/// Source that never suggests anything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopWarmupSource;

impl WarmupSource for NoopWarmupSource {
    fn candidates(&self, _strategy: WarmupStrategy, _limit: usize) -> Vec<WarmupCandidate> {
        Vec::new()
    }

    fn fetch(&self, _candidate: &WarmupCandidate) -> Option<Payload> {
        None
    }
}

// == Warmup Planner ==
#[derive(Debug, Clone, Copy)]
pub struct WarmupPlanner {
    pub limit: usize,
}

impl Default for WarmupPlanner {
    fn default() -> Self {
        Self {
            limit: DEFAULT_WARMUP_LIMIT,
        }
    }
}

impl WarmupPlanner {
    pub fn new(limit: usize) -> Self {
        Self { limit }
    }

    /// Asks `source` for candidates and inserts each one it can fetch.
    /// Returns the number of entries warmed.
    pub fn warmup(&self, cache: &MediaCache, source: &dyn WarmupSource, strategy: WarmupStrategy) -> usize {
        if strategy == WarmupStrategy::NoWarmup {
            return 0;
        }

        let limit = match strategy {
            WarmupStrategy::Full => usize::MAX,
            _ => self.limit,
        };
        info!("Starting cache warmup ({})", strategy);

        let mut warmed = 0;
        for candidate in source.candidates(strategy, limit).into_iter().take(limit) {
            match source.fetch(&candidate) {
                Some(payload) => {
                    let options = PutOptions::default().source("warmup");
                    cache.put_with(&candidate.key, payload, &candidate.category, options);
                    warmed += 1;
                }
                None => debug!("Warmup candidate '{}' unavailable", candidate.key),
            }
        }

        cache.finish_warmup(warmed);
        info!("Cache warmup completed: {} entries warmed", warmed);
        warmed
    }
}
