//! Cache Metrics System
//!
//! The cache never logs. Instead every request and every insertion outcome is
//! folded into plain counters that callers read back as a `BTreeMap`, so
//! reports from different runs always list metrics in the same order.
//!
//! Per-eviction details come back from the buckets as
//! [`Eviction`](crate::bucket::Eviction) values and are aggregated here, never
//! in process-wide state.

extern crate alloc;

use alloc::collections::BTreeMap;
use alloc::string::{String, ToString};

pub mod pocket;

pub use pocket::PocketCacheMetrics;

/// Counters shared by every cache in this crate.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CoreCacheMetrics {
    /// Total number of lookups.
    pub requests: u64,

    /// Lookups that found a matching entry.
    pub cache_hits: u64,

    /// Entries stored, with or without an eviction.
    pub insertions: u64,

    /// Entries discarded to make room.
    pub evictions: u64,

    /// Inserts rejected by a full bucket whose policy does not evict.
    pub drops: u64,
}

impl CoreCacheMetrics {
    /// Creates zeroed metrics.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a lookup that hit.
    #[inline]
    pub fn record_hit(&mut self) {
        self.requests += 1;
        self.cache_hits += 1;
    }

    /// Records a lookup that missed.
    ///
    /// Misses are derived as `requests - cache_hits`.
    #[inline]
    pub fn record_miss(&mut self) {
        self.requests += 1;
    }

    /// Records a stored entry.
    #[inline]
    pub fn record_insertion(&mut self) {
        self.insertions += 1;
    }

    /// Records an evicted entry.
    #[inline]
    pub fn record_eviction(&mut self) {
        self.evictions += 1;
    }

    /// Records a dropped insert.
    #[inline]
    pub fn record_drop(&mut self) {
        self.drops += 1;
    }

    /// Adds another set of counters into this one.
    pub fn merge(&mut self, other: &CoreCacheMetrics) {
        self.requests += other.requests;
        self.cache_hits += other.cache_hits;
        self.insertions += other.insertions;
        self.evictions += other.evictions;
        self.drops += other.drops;
    }

    /// Fraction of lookups that hit, or 0.0 before the first lookup.
    pub fn hit_rate(&self) -> f64 {
        if self.requests > 0 {
            self.cache_hits as f64 / self.requests as f64
        } else {
            0.0
        }
    }

    /// Fraction of lookups that missed, or 0.0 before the first lookup.
    pub fn miss_rate(&self) -> f64 {
        if self.requests > 0 {
            (self.requests - self.cache_hits) as f64 / self.requests as f64
        } else {
            0.0
        }
    }

    /// Converts the counters to a sorted map for reporting.
    pub fn to_btreemap(&self) -> BTreeMap<String, f64> {
        let mut metrics = BTreeMap::new();

        metrics.insert("cache_hits".to_string(), self.cache_hits as f64);
        metrics.insert(
            "cache_misses".to_string(),
            (self.requests - self.cache_hits) as f64,
        );
        metrics.insert("drops".to_string(), self.drops as f64);
        metrics.insert("evictions".to_string(), self.evictions as f64);
        metrics.insert("insertions".to_string(), self.insertions as f64);
        metrics.insert("requests".to_string(), self.requests as f64);

        metrics.insert("hit_rate".to_string(), self.hit_rate());
        metrics.insert("miss_rate".to_string(), self.miss_rate());

        if self.requests > 0 {
            metrics.insert(
                "eviction_rate".to_string(),
                self.evictions as f64 / self.requests as f64,
            );
        }

        metrics
    }
}

/// Uniform metrics access for every cache type.
pub trait CacheMetrics {
    /// All metrics as name/value pairs in sorted order.
    fn metrics(&self) -> BTreeMap<String, f64>;

    /// Short name identifying the cache, e.g. `"PocketCache"`.
    fn algorithm_name(&self) -> &'static str;
}
