//! Sharded Pocket Cache
//!
//! A fixed array of pocket-dictionary buckets. Each key is hashed once; the
//! hash picks the bucket and supplies the fingerprint stored inside it.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                        ShardedCache                          │
//! │                                                              │
//! │   key ──▶ MulShift ──▶ hash % E ──▶ bucket index             │
//! │                        hash / E ──▶ fingerprint (q, r)       │
//! │                                                              │
//! │  ┌──────────┐ ┌──────────┐            ┌──────────┐           │
//! │  │ bucket 0 │ │ bucket 1 │    ...     │bucket E-1│           │
//! │  │ 27 slots │ │ 27 slots │            │ 27 slots │           │
//! │  └──────────┘ └──────────┘            └──────────┘           │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! There is no global recency order. A miss only ever evicts from the
//! bucket that owns the key, so capacity is managed per bucket.
//!
//! # False Positives
//!
//! Two keys that land in the same bucket with the same 16-bit fingerprint are
//! indistinguishable to [`set`](ShardedCache::set). When payloads identify
//! the stored object, [`set_with`](ShardedCache::set_with) lets the caller
//! confirm each candidate and rule collisions out.
//!
//! # Example
//!
//! ```
//! use pocket_cache::config::ShardedCacheConfig;
//! use pocket_cache::ShardedCache;
//! use core::num::NonZeroUsize;
//!
//! let config = ShardedCacheConfig {
//!     capacity: NonZeroUsize::new(1024).unwrap(),
//! };
//! let mut cache: ShardedCache = ShardedCache::init(config);
//!
//! assert!(!cache.set(42, 0));
//! assert!(cache.set(42, 0));
//! assert_eq!(cache.capacity(), 37 * 27);
//! ```

extern crate alloc;

use crate::bucket::{Bucket, InvariantViolation, PackedBucket, CAPACITY};
use crate::config::ShardedCacheConfig;
use crate::hash::{Fingerprint, HashSplitter};
use crate::metrics::{CacheMetrics, PocketCacheMetrics};
use alloc::boxed::Box;
use alloc::collections::BTreeMap;
use alloc::string::String;
use alloc::vec::Vec;
use core::fmt;
use core::marker::PhantomData;

/// An invariant violation found in one bucket of a cache.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BucketViolation {
    /// Index of the offending bucket.
    pub bucket: usize,
    /// What was wrong with it.
    pub violation: InvariantViolation,
}

impl fmt::Display for BucketViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "bucket {}: {}", self.bucket, self.violation)
    }
}

#[cfg(feature = "std")]
impl std::error::Error for BucketViolation {}

/// A single-threaded cache of `E` independent pocket-dictionary buckets.
///
/// # Type Parameters
///
/// - `V`: Payload type, a small `Copy` handle. Defaults to `u64`.
/// - `B`: Bucket layout and policy. Defaults to [`PackedBucket`] with
///   round-robin eviction.
pub struct ShardedCache<V = u64, B = PackedBucket<V>> {
    buckets: Box<[B]>,
    splitter: HashSplitter,
    metrics: PocketCacheMetrics,
    _payload: PhantomData<fn() -> V>,
}

impl<V: Copy, B: Bucket<V> + Default> ShardedCache<V, B> {
    /// Creates a cache with `config.bucket_count()` empty buckets.
    pub fn init(config: ShardedCacheConfig) -> Self {
        Self::init_with(config, B::default)
    }
}

impl<V: Copy, B: Bucket<V>> ShardedCache<V, B> {
    /// Creates a cache whose buckets are built by `make_bucket`, e.g. to give
    /// each bucket a configured [`Policy`](crate::policy::Policy).
    pub fn init_with<F>(config: ShardedCacheConfig, make_bucket: F) -> Self
    where
        F: FnMut() -> B,
    {
        let count = config.bucket_count();
        let buckets: Vec<B> = core::iter::repeat_with(make_bucket)
            .take(count.get())
            .collect();
        ShardedCache {
            buckets: buckets.into_boxed_slice(),
            splitter: HashSplitter::new(count),
            metrics: PocketCacheMetrics::new(),
            _payload: PhantomData,
        }
    }

    /// Returns the owning bucket index and fingerprint of `key`.
    #[inline]
    pub fn locate(&self, key: u64) -> (usize, Fingerprint) {
        self.splitter.split(key)
    }

    /// Looks `key` up and inserts it on a miss.
    ///
    /// Returns `true` on a hit. A hit refreshes the entry's recency; a miss
    /// stores `payload`, possibly evicting an entry of the same bucket.
    #[inline]
    pub fn set(&mut self, key: u64, payload: V) -> bool {
        self.set_with(key, payload, |_| true)
    }

    /// Like [`set`](Self::set), but a candidate only counts as a hit if
    /// `confirm` accepts its payload.
    pub fn set_with<F>(&mut self, key: u64, payload: V, confirm: F) -> bool
    where
        F: FnMut(&V) -> bool,
    {
        let (index, fp) = self.splitter.split(key);
        let bucket = &mut self.buckets[index];
        if bucket.find_with(fp, confirm).is_some() {
            self.metrics.core.record_hit();
            return true;
        }
        self.metrics.core.record_miss();
        let outcome = bucket.insert(fp, payload);
        self.metrics.record_insertion(&outcome);
        false
    }

    /// Looks `key` up without inserting on a miss.
    #[inline]
    pub fn get(&mut self, key: u64) -> Option<V> {
        self.get_with(key, |_| true)
    }

    /// Like [`get`](Self::get), with a confirmation predicate.
    pub fn get_with<F>(&mut self, key: u64, confirm: F) -> Option<V>
    where
        F: FnMut(&V) -> bool,
    {
        let (index, fp) = self.splitter.split(key);
        let found = self.buckets[index].find_with(fp, confirm);
        match found {
            Some(_) => self.metrics.core.record_hit(),
            None => self.metrics.core.record_miss(),
        }
        found
    }

    /// Removes the entry stored for `key` with exactly this `payload`.
    pub fn remove(&mut self, key: u64, payload: &V) -> bool
    where
        V: PartialEq,
    {
        let (index, fp) = self.splitter.split(key);
        self.buckets[index].remove(fp, payload)
    }

    /// Total number of entries the cache can hold, `bucket_count() * 27`.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.buckets.len() * CAPACITY
    }

    /// Number of entries currently stored.
    pub fn len(&self) -> usize {
        self.buckets.iter().map(|b| b.len()).sum()
    }

    /// Returns `true` if no bucket holds an entry.
    pub fn is_empty(&self) -> bool {
        self.buckets.iter().all(|b| b.is_empty())
    }

    /// Number of buckets.
    #[inline]
    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }

    /// The bucket at `index`, if any.
    pub fn bucket(&self, index: usize) -> Option<&B> {
        self.buckets.get(index)
    }

    /// All buckets, in index order.
    pub fn buckets(&self) -> &[B] {
        &self.buckets
    }

    /// Accumulated hit, insertion and eviction counters.
    pub fn pocket_metrics(&self) -> &PocketCacheMetrics {
        &self.metrics
    }

    /// Checks every bucket, reporting the first violation found.
    pub fn check_invariants(&self) -> Result<(), BucketViolation> {
        for (bucket, b) in self.buckets.iter().enumerate() {
            b.check_invariants()
                .map_err(|violation| BucketViolation { bucket, violation })?;
        }
        Ok(())
    }
}

impl<V: Copy, B: Bucket<V>> CacheMetrics for ShardedCache<V, B> {
    fn metrics(&self) -> BTreeMap<String, f64> {
        self.metrics.to_btreemap()
    }

    fn algorithm_name(&self) -> &'static str {
        "PocketCache"
    }
}

impl<V, B> fmt::Debug for ShardedCache<V, B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShardedCache")
            .field("buckets", &self.buckets.len())
            .field("splitter", &self.splitter)
            .finish()
    }
}
