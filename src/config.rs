//! Cache Configuration Module
//!
//! Configuration structs have public fields and are built with a struct
//! literal; there are no builders.
//!
//! # Sizing
//!
//! A sharded cache is an array of 27-entry buckets. The requested capacity is
//! rounded down to a whole number of buckets, with at least one bucket:
//!
//! ```text
//! buckets  = max(1, capacity / 27)
//! capacity = buckets × 27          (what ShardedCache::capacity() reports)
//! ```
//!
//! Each packed bucket occupies a fixed `8 + 54 + 27 × size_of::<Cell<V>>()`
//! bytes plus padding. For `u64` payloads that is roughly 500 bytes, or about
//! 18 bytes per cached key.
//!
//! # Examples
//!
//! ```
//! use pocket_cache::config::ShardedCacheConfig;
//! use core::num::NonZeroUsize;
//!
//! let config = ShardedCacheConfig {
//!     capacity: NonZeroUsize::new(1 << 16).unwrap(),
//! };
//! assert_eq!(config.bucket_count().get(), 2427);
//! ```

use crate::bucket::CAPACITY;
use core::fmt;
use core::num::NonZeroUsize;

/// Configuration for a [`ShardedCache`](crate::ShardedCache) or its
/// concurrent counterpart.
///
/// # Fields
///
/// - `capacity`: Requested number of entries across all buckets.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct ShardedCacheConfig {
    /// Requested total number of entries. Rounded down to a multiple of 27,
    /// but never below one bucket.
    pub capacity: NonZeroUsize,
}

impl ShardedCacheConfig {
    /// Number of buckets a cache built from this config will own.
    pub fn bucket_count(&self) -> NonZeroUsize {
        NonZeroUsize::new(self.capacity.get() / CAPACITY).unwrap_or(NonZeroUsize::MIN)
    }

    /// Capacity actually provisioned, `bucket_count() * 27`.
    pub fn effective_capacity(&self) -> usize {
        self.bucket_count().get() * CAPACITY
    }
}

impl fmt::Debug for ShardedCacheConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShardedCacheConfig")
            .field("capacity", &self.capacity)
            .field("buckets", &self.bucket_count())
            .finish()
    }
}
