//! Concurrent sharded cache: one spin-locked bucket per shard.

extern crate alloc;

use super::RawSpinLock;
use crate::bucket::{Bucket, PackedBucket, CAPACITY};
use crate::config::ShardedCacheConfig;
use crate::hash::{Fingerprint, HashSplitter};
use crate::metrics::{CacheMetrics, PocketCacheMetrics};
use crate::sharded::BucketViolation;
use alloc::boxed::Box;
use alloc::collections::BTreeMap;
use alloc::string::String;
use alloc::vec::Vec;
use core::fmt;
use core::marker::PhantomData;
use parking_lot::lock_api::{Mutex, RawMutex};

/// State guarded by one lock: the bucket and the counters of requests routed
/// to it.
struct Shard<B> {
    bucket: B,
    metrics: PocketCacheMetrics,
}

/// A thread-safe cache of independently locked pocket-dictionary buckets.
///
/// # Type Parameters
///
/// - `V`: Payload type. Defaults to `u64`.
/// - `B`: Bucket layout and policy. Defaults to [`PackedBucket`].
/// - `R`: Raw lock guarding each bucket. Defaults to [`RawSpinLock`].
///
/// # Example
///
/// ```rust
/// use pocket_cache::concurrent::ConcurrentShardedCache;
/// use pocket_cache::config::ShardedCacheConfig;
/// use core::num::NonZeroUsize;
///
/// let config = ShardedCacheConfig {
///     capacity: NonZeroUsize::new(270).unwrap(),
/// };
/// let cache: ConcurrentShardedCache = ConcurrentShardedCache::init(config);
///
/// assert!(!cache.set(9, 90));
/// assert_eq!(cache.get(9), Some(90));
/// assert_eq!(cache.bucket_count(), 10);
/// ```
pub struct ConcurrentShardedCache<V = u64, B = PackedBucket<V>, R = RawSpinLock> {
    shards: Box<[Mutex<R, Shard<B>>]>,
    splitter: HashSplitter,
    _payload: PhantomData<fn() -> V>,
}

impl<V, B, R> ConcurrentShardedCache<V, B, R>
where
    V: Copy,
    B: Bucket<V> + Default,
    R: RawMutex,
{
    /// Creates a cache with `config.bucket_count()` empty, unlocked buckets.
    pub fn init(config: ShardedCacheConfig) -> Self {
        Self::init_with(config, B::default)
    }
}

impl<V, B, R> ConcurrentShardedCache<V, B, R>
where
    V: Copy,
    B: Bucket<V>,
    R: RawMutex,
{
    /// Creates a cache whose buckets are built by `make_bucket`.
    pub fn init_with<F>(config: ShardedCacheConfig, mut make_bucket: F) -> Self
    where
        F: FnMut() -> B,
    {
        let count = config.bucket_count();
        let shards: Vec<_> = (0..count.get())
            .map(|_| {
                Mutex::new(Shard {
                    bucket: make_bucket(),
                    metrics: PocketCacheMetrics::new(),
                })
            })
            .collect();
        ConcurrentShardedCache {
            shards: shards.into_boxed_slice(),
            splitter: HashSplitter::new(count),
            _payload: PhantomData,
        }
    }

    /// Returns the owning bucket index and fingerprint of `key`.
    #[inline]
    pub fn locate(&self, key: u64) -> (usize, Fingerprint) {
        self.splitter.split(key)
    }

    /// Looks `key` up and inserts it on a miss, under the owning bucket's lock.
    ///
    /// Returns `true` on a hit.
    #[inline]
    pub fn set(&self, key: u64, payload: V) -> bool {
        self.set_with(key, payload, |_| true)
    }

    /// Like [`set`](Self::set), with a confirmation predicate run while the
    /// lock is held.
    pub fn set_with<F>(&self, key: u64, payload: V, confirm: F) -> bool
    where
        F: FnMut(&V) -> bool,
    {
        let (index, fp) = self.splitter.split(key);
        let mut shard = self.shards[index].lock();
        let Shard { bucket, metrics } = &mut *shard;
        if bucket.find_with(fp, confirm).is_some() {
            metrics.core.record_hit();
            return true;
        }
        metrics.core.record_miss();
        let outcome = bucket.insert(fp, payload);
        metrics.record_insertion(&outcome);
        false
    }

    /// Looks `key` up without inserting on a miss.
    pub fn get(&self, key: u64) -> Option<V> {
        let (index, fp) = self.splitter.split(key);
        let mut shard = self.shards[index].lock();
        let Shard { bucket, metrics } = &mut *shard;
        let found = bucket.find(fp);
        match found {
            Some(_) => metrics.core.record_hit(),
            None => metrics.core.record_miss(),
        }
        found
    }

    /// Removes the entry stored for `key` with exactly this `payload`.
    pub fn remove(&self, key: u64, payload: &V) -> bool
    where
        V: PartialEq,
    {
        let (index, fp) = self.splitter.split(key);
        self.shards[index].lock().bucket.remove(fp, payload)
    }

    /// Runs `f` on bucket `index` while holding its lock.
    pub fn with_bucket<F, T>(&self, index: usize, f: F) -> Option<T>
    where
        F: FnOnce(&B) -> T,
    {
        self.shards.get(index).map(|shard| f(&shard.lock().bucket))
    }

    /// Total number of entries the cache can hold, `bucket_count() * 27`.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.shards.len() * CAPACITY
    }

    /// Number of buckets.
    #[inline]
    pub fn bucket_count(&self) -> usize {
        self.shards.len()
    }

    /// Number of entries currently stored.
    ///
    /// Locks each bucket in turn, so under concurrent writes the total is
    /// only a snapshot.
    pub fn len(&self) -> usize {
        self.shards.iter().map(|s| s.lock().bucket.len()).sum()
    }

    /// Returns `true` if no bucket holds an entry.
    pub fn is_empty(&self) -> bool {
        self.shards.iter().all(|s| s.lock().bucket.is_empty())
    }

    /// Counters summed over all buckets.
    pub fn pocket_metrics(&self) -> PocketCacheMetrics {
        let mut total = PocketCacheMetrics::new();
        for shard in self.shards.iter() {
            total.merge(&shard.lock().metrics);
        }
        total
    }

    /// Checks every bucket, reporting the first violation found.
    pub fn check_invariants(&self) -> Result<(), BucketViolation> {
        for (bucket, shard) in self.shards.iter().enumerate() {
            shard
                .lock()
                .bucket
                .check_invariants()
                .map_err(|violation| BucketViolation { bucket, violation })?;
        }
        Ok(())
    }
}

impl<V, B, R> CacheMetrics for ConcurrentShardedCache<V, B, R>
where
    V: Copy,
    B: Bucket<V>,
    R: RawMutex,
{
    fn metrics(&self) -> BTreeMap<String, f64> {
        self.pocket_metrics().to_btreemap()
    }

    fn algorithm_name(&self) -> &'static str {
        "ConcurrentPocketCache"
    }
}

impl<V, B, R> fmt::Debug for ConcurrentShardedCache<V, B, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConcurrentShardedCache")
            .field("buckets", &self.shards.len())
            .field("splitter", &self.splitter)
            .finish()
    }
}
