//! Eviction Policy Module
//!
//! Orders evictable entries by recency and picks victims to reach a memory target.

use crate::cache::entry::CacheEntry;

/// Fraction of the ceiling that cleanup aims for.
pub const CLEANUP_TARGET_FRACTION: f64 = 0.7;

/// Fraction of the ceiling above which maintenance runs a cleanup.
pub const CLEANUP_THRESHOLD_FRACTION: f64 = 0.9;

// == Eviction Policy ==
/// Approximate LRU over non-pinned entries.
///
/// Ordering is by `last_accessed` ascending (oldest first), ties broken by
/// key so that the same store state always yields the same plan.
#[derive(Debug, Clone, Copy)]
pub struct EvictionPolicy {
    /// Target fraction used when cleanup is triggered implicitly
    pub target_fraction: f64,
    /// Usage fraction that counts as memory pressure
    pub threshold_fraction: f64,
}

impl Default for EvictionPolicy {
    fn default() -> Self {
        Self {
            target_fraction: CLEANUP_TARGET_FRACTION,
            threshold_fraction: CLEANUP_THRESHOLD_FRACTION,
        }
    }
}

impl EvictionPolicy {
    // == Targets ==
    /// Target used when a write pushes usage over the ceiling.
    pub fn implicit_target(&self, max_bytes: u64) -> u64 {
        (max_bytes as f64 * self.target_fraction) as u64
    }

    /// Returns true if usage is above the pressure threshold.
    pub fn over_threshold(&self, usage: u64, max_bytes: u64) -> bool {
        usage as f64 > max_bytes as f64 * self.threshold_fraction
    }

    // == Plan ==
    /// Returns the keys to remove, in removal order, so that usage drops to
    /// `target_bytes` or below.
    ///
    /// Pinned entries are never selected; if they alone exceed the target the
    /// plan frees what it can and stops.
    pub fn plan<'a, I>(&self, entries: I, current_usage: u64, target_bytes: u64) -> Vec<String>
    where
        I: IntoIterator<Item = &'a CacheEntry>,
    {
        if current_usage <= target_bytes {
            return Vec::new();
        }

        let mut candidates: Vec<&CacheEntry> =
            entries.into_iter().filter(|entry| !entry.is_pinned).collect();
        candidates.sort_by(|a, b| {
            a.last_accessed
                .cmp(&b.last_accessed)
                .then_with(|| a.key.cmp(&b.key))
        });

        let mut usage = current_usage;
        let mut victims = Vec::new();
        for entry in candidates {
            if usage <= target_bytes {
                break;
            }
            usage = usage.saturating_sub(entry.size_bytes);
            victims.push(entry.key.clone());
        }
        victims
    }
}
