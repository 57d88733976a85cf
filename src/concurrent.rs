//! Concurrent Pocket Cache
//!
//! Thread-safe counterpart of [`ShardedCache`](crate::ShardedCache). Every
//! bucket is paired with its own lock, so threads touching different buckets
//! never contend and no ordering exists between buckets.
//!
//! # Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────────┐
//! │                     ConcurrentShardedCache                         │
//! │                                                                    │
//! │  hash(key) % E  ──▶  shard selection                               │
//! │                                                                    │
//! │  ┌───────────────┐ ┌───────────────┐       ┌───────────────┐       │
//! │  │ RawSpinLock   │ │ RawSpinLock   │  ...  │ RawSpinLock   │       │
//! │  │ ┌───────────┐ │ │ ┌───────────┐ │       │ ┌───────────┐ │       │
//! │  │ │ bucket    │ │ │ │ bucket    │ │       │ │ bucket    │ │       │
//! │  │ │ metrics   │ │ │ │ metrics   │ │       │ │ metrics   │ │       │
//! │  │ └───────────┘ │ │ └───────────┘ │       │ └───────────┘ │       │
//! │  └───────────────┘ └───────────────┘       └───────────────┘       │
//! └────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Why a Spin Lock?
//!
//! A critical section is one bucket lookup plus at most one insert: a few
//! dozen instructions on 27 entries. Parking a thread costs far more than
//! waiting that out, so the default lock is [`RawSpinLock`], a
//! test-and-test-and-set flag plugged into `lock_api`.
//!
//! The spin lock is unfair and never backs off. Under heavy contention on one
//! hot bucket a thread can, in principle, spin indefinitely; nothing detects
//! or reports this. The lock is a type parameter, so workloads that
//! oversubscribe cores can substitute `parking_lot::RawMutex`:
//!
//! ```rust
//! use pocket_cache::bucket::PackedBucket;
//! use pocket_cache::concurrent::ConcurrentShardedCache;
//! use pocket_cache::config::ShardedCacheConfig;
//! use core::num::NonZeroUsize;
//!
//! let config = ShardedCacheConfig {
//!     capacity: NonZeroUsize::new(4096).unwrap(),
//! };
//! let cache: ConcurrentShardedCache<u64, PackedBucket<u64>, parking_lot::RawMutex> =
//!     ConcurrentShardedCache::init(config);
//! assert!(!cache.set(1, 1));
//! ```
//!
//! # Thread Safety
//!
//! All operations take `&self`. The cache is `Send + Sync` whenever its
//! buckets are `Send`, and can be shared by reference across scoped threads
//! or wrapped in `Arc`. A bucket's header, slots and free list are only ever
//! touched while its lock is held, so no thread observes a half-finished
//! insert.
//!
//! # Example
//!
//! ```rust
//! use pocket_cache::concurrent::ConcurrentShardedCache;
//! use pocket_cache::config::ShardedCacheConfig;
//! use core::num::NonZeroUsize;
//! use std::thread;
//!
//! let config = ShardedCacheConfig {
//!     capacity: NonZeroUsize::new(1 << 14).unwrap(),
//! };
//! let cache: ConcurrentShardedCache = ConcurrentShardedCache::init(config);
//!
//! thread::scope(|s| {
//!     for t in 0..4u64 {
//!         let cache = &cache;
//!         s.spawn(move || {
//!             for key in t * 1000..(t + 1) * 1000 {
//!                 cache.set(key, key);
//!             }
//!         });
//!     }
//! });
//!
//! assert!(cache.len() <= cache.capacity());
//! assert!(cache.check_invariants().is_ok());
//! ```

mod sharded;
mod spin;

pub use self::sharded::ConcurrentShardedCache;
pub use self::spin::RawSpinLock;
