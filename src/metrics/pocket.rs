//! Pocket Cache Metrics
//!
//! Core counters plus a histogram of victim group sizes, which shows how well
//! an eviction policy spreads pressure across quotient groups.

extern crate alloc;

use super::{CacheMetrics, CoreCacheMetrics};
use crate::bucket::{Insertion, CAPACITY};
use alloc::collections::BTreeMap;
use alloc::format;
use alloc::string::{String, ToString};

/// Metrics for sharded pocket caches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PocketCacheMetrics {
    /// Core metrics common to all caches.
    pub core: CoreCacheMetrics,

    /// `victim_group_sizes[n]` counts evictions whose victim group held `n`
    /// entries just before the eviction.
    pub victim_group_sizes: [u64; CAPACITY + 1],
}

impl Default for PocketCacheMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl PocketCacheMetrics {
    /// Creates zeroed metrics.
    pub fn new() -> Self {
        Self {
            core: CoreCacheMetrics::new(),
            victim_group_sizes: [0; CAPACITY + 1],
        }
    }

    /// Folds the outcome of one bucket insert into the counters.
    pub fn record_insertion<V>(&mut self, outcome: &Insertion<V>) {
        match outcome {
            Insertion::Inserted => self.core.record_insertion(),
            Insertion::Replaced(eviction) => {
                self.core.record_insertion();
                self.core.record_eviction();
                let size = (eviction.group_len as usize).min(CAPACITY);
                self.victim_group_sizes[size] += 1;
            }
            Insertion::Dropped => self.core.record_drop(),
        }
    }

    /// Adds another set of metrics into this one.
    pub fn merge(&mut self, other: &PocketCacheMetrics) {
        self.core.merge(&other.core);
        for (mine, theirs) in self
            .victim_group_sizes
            .iter_mut()
            .zip(other.victim_group_sizes.iter())
        {
            *mine += *theirs;
        }
    }

    /// Mean size of the victim group over all evictions, or 0.0 if nothing
    /// was evicted.
    pub fn mean_victim_group_size(&self) -> f64 {
        let (count, weighted) = self
            .victim_group_sizes
            .iter()
            .enumerate()
            .fold((0u64, 0u64), |(count, weighted), (size, &n)| {
                (count + n, weighted + size as u64 * n)
            });
        if count > 0 {
            weighted as f64 / count as f64
        } else {
            0.0
        }
    }

    /// Converts the metrics to a sorted map for reporting.
    ///
    /// Histogram buckets appear as `victim_group_size_NN` for every non-zero
    /// bin, zero-padded so they sort numerically.
    pub fn to_btreemap(&self) -> BTreeMap<String, f64> {
        let mut metrics = self.core.to_btreemap();
        metrics.insert(
            "mean_victim_group_size".to_string(),
            self.mean_victim_group_size(),
        );
        for (size, &n) in self.victim_group_sizes.iter().enumerate() {
            if n > 0 {
                metrics.insert(format!("victim_group_size_{:02}", size), n as f64);
            }
        }
        metrics
    }
}

impl CacheMetrics for PocketCacheMetrics {
    fn metrics(&self) -> BTreeMap<String, f64> {
        self.to_btreemap()
    }

    fn algorithm_name(&self) -> &'static str {
        "PocketCache"
    }
}
