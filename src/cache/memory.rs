//! Memory Accountant Module
//!
//! Byte cost estimation and running usage totals, overall and per category.

use std::collections::HashMap;

use crate::cache::payload::Cacheable;

// == Memory Accountant ==
/// Tracks how many bytes the live entries cost.
///
/// Totals are maintained incrementally: every `charge` must be matched by a
/// `release` of the same size when the entry leaves the store.
#[derive(Debug, Default, Clone)]
pub struct MemoryAccountant {
    current: u64,
    max: u64,
    by_category: HashMap<String, u64>,
}

impl MemoryAccountant {
    // == Constructor ==
    /// Creates an accountant with the given ceiling.
    pub fn new(max_bytes: u64) -> Self {
        Self {
            current: 0,
            max: max_bytes,
            by_category: HashMap::new(),
        }
    }

    // == Estimate ==
    /// Byte cost of storing `payload` under `key`.
    pub fn estimate(key: &str, payload: &dyn Cacheable) -> u64 {
        (key.len() + payload.size_hint()) as u64
    }

    // == Charge / Release ==
    /// Adds an entry's cost to the totals.
    pub fn charge(&mut self, category: &str, bytes: u64) {
        self.current += bytes;
        *self.by_category.entry(category.to_string()).or_insert(0) += bytes;
    }

    /// Removes an entry's cost from the totals.
    pub fn release(&mut self, category: &str, bytes: u64) {
        self.current = self.current.saturating_sub(bytes);
        if let Some(total) = self.by_category.get_mut(category) {
            *total = total.saturating_sub(bytes);
            if *total == 0 {
                self.by_category.remove(category);
            }
        }
    }

    /// Drops all totals.
    pub fn reset(&mut self) {
        self.current = 0;
        self.by_category.clear();
    }

    // == Queries ==
    /// Returns true if adding `new_bytes` would push usage past the ceiling.
    pub fn would_exceed(&self, new_bytes: u64) -> bool {
        self.current.saturating_add(new_bytes) > self.max
    }

    pub fn current_usage(&self) -> u64 {
        self.current
    }

    pub fn max_bytes(&self) -> u64 {
        self.max
    }

    pub fn set_max_bytes(&mut self, max_bytes: u64) {
        self.max = max_bytes;
    }

    /// Bytes charged to one category.
    pub fn category_usage(&self, category: &str) -> u64 {
        self.by_category.get(category).copied().unwrap_or(0)
    }

    /// Snapshot of per-category totals.
    pub fn category_totals(&self) -> HashMap<String, u64> {
        self.by_category.clone()
    }

    /// `fraction` of the ceiling, in bytes.
    pub fn fraction_of_max(&self, fraction: f64) -> u64 {
        (self.max as f64 * fraction) as u64
    }
}
