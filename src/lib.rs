#![doc = include_str!("../README.md")]
//!
//! ---
//!
//! # Code Reference
//!
//! ## Choosing a Bucket
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────────┐
//! │                    Which bucket layout and policy?                   │
//! ├──────────────────────────────────────────────────────────────────────┤
//! │                                                                      │
//! │  Need allocation-free, cache-line-dense storage?                     │
//! │        │                                                             │
//! │   Yes  │  No ──▶ DequeBucket  (reference layout, easy to inspect)    │
//! │        ▼                                                             │
//! │   PackedBucket                                                       │
//! │        │                                                             │
//! │        ▼                                                             │
//! │  Must a full bucket keep what it has?                                │
//! │        │                                                             │
//! │   Yes  │  No ──▶ RoundRobin (default), LargestGroup,                 │
//! │        ▼         or LargestThenRoundRobin                            │
//! │     DropNew                                                          │
//! │                                                                      │
//! └──────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Reference
//!
//! | Type | Description |
//! |------|-------------|
//! | [`ShardedCache`] | Single-threaded array of buckets, keyed by `u64` |
//! | [`PackedBucket`] | 27-entry pocket dictionary, select-indexed header, no allocation |
//! | [`DequeBucket`] | 27-entry pocket dictionary, one `VecDeque` per quotient |
//! | [`Policy`] | Runtime choice of eviction heuristic |
//! | `ConcurrentShardedCache` | Spin-locked buckets shared across threads (`concurrent` feature) |
//!
//! ## Performance Characteristics
//!
//! | Operation | Packed | Deque |
//! |-----------|--------|-------|
//! | find      | O(group) scan + O(1) select | O(group) scan |
//! | insert    | O(27) shift + O(32) policy  | O(1) push + O(32) policy |
//! | remove    | O(27) shift | O(group) |
//! | memory    | ~18 bytes/entry for `u64` payloads | heap per group |
//!
//! ## Code Examples
//!
//! ### Replaying a trace
//!
//! ```rust
//! use pocket_cache::ShardedCache;
//! use pocket_cache::config::ShardedCacheConfig;
//! use core::num::NonZeroUsize;
//!
//! let config = ShardedCacheConfig {
//!     capacity: NonZeroUsize::new(1 << 13).unwrap(),
//! };
//! let mut cache: ShardedCache = ShardedCache::init(config);
//!
//! let trace = [1u64, 2, 3, 1, 2, 3, 4];
//! let hits = trace.iter().filter(|&&key| cache.set(key, 0)).count();
//! assert_eq!(hits, 3);
//! ```
//!
//! ### Picking a policy at runtime
//!
//! ```rust
//! use pocket_cache::{DequeBucket, Policy, ShardedCache};
//! use pocket_cache::config::ShardedCacheConfig;
//! use core::num::NonZeroUsize;
//!
//! let config = ShardedCacheConfig {
//!     capacity: NonZeroUsize::new(270).unwrap(),
//! };
//! let policy: Policy = Policy::LargestGroup;
//! let mut cache: ShardedCache<u64, DequeBucket<u64, Policy>> =
//!     ShardedCache::init_with(config, || DequeBucket::with_policy(policy));
//! cache.set(5, 50);
//! assert_eq!(cache.get(5), Some(50));
//! ```
//!
//! ### Confirming candidates
//!
//! Fingerprints collide. When the payload identifies the stored object,
//! confirm it before trusting a hit:
//!
//! ```rust
//! use pocket_cache::ShardedCache;
//! use pocket_cache::config::ShardedCacheConfig;
//! use core::num::NonZeroUsize;
//!
//! let config = ShardedCacheConfig {
//!     capacity: NonZeroUsize::new(1024).unwrap(),
//! };
//! let mut cache: ShardedCache = ShardedCache::init(config);
//!
//! // the payload is the key itself, so confirmation is exact
//! let key = 99;
//! assert!(!cache.set_with(key, key, |&stored| stored == key));
//! assert!(cache.set_with(key, key, |&stored| stored == key));
//! ```
//!
//! ## Modules
//!
//! - [`hash`]: Key hashing and fingerprint splitting
//! - [`bits`]: Select and deposit primitives for the packed header
//! - [`bucket`]: The two pocket-dictionary layouts
//! - [`policy`]: Eviction heuristics for full buckets
//! - [`sharded`]: The single-threaded sharded cache
//! - [`config`]: Configuration structures
//! - [`metrics`]: Hit, eviction and victim-group counters
//! - `concurrent`: Spin-locked sharded cache (requires `concurrent` feature)

#![no_std]

extern crate alloc;

#[cfg(feature = "std")]
extern crate std;

/// Broadword bit primitives.
///
/// `select`, `deposit` and `bit_index`, compiled to BMI2 instructions where
/// the target enables them.
pub mod bits;

/// Key hashing.
///
/// The fixed multiplicative hash and the split of each hash into a bucket
/// index and a 16-bit fingerprint.
pub mod hash;

/// Eviction policies.
///
/// Heuristics that pick which quotient group of a full bucket gives up its
/// least-recent entry.
pub mod policy;

/// Pocket-dictionary buckets.
///
/// The 27-entry associative structures a sharded cache is built from.
pub mod bucket;

/// Cache configuration structures.
pub mod config;

/// Sharded pocket cache.
pub mod sharded;

/// Cache metrics system.
///
/// Counters collected by every cache, reported as sorted name/value maps.
pub mod metrics;

/// Concurrent cache implementation.
///
/// Available when the `concurrent` feature is enabled.
#[cfg(feature = "concurrent")]
pub mod concurrent;

pub use bucket::{Bucket, DequeBucket, Eviction, Insertion, InvariantViolation, PackedBucket};
pub use hash::Fingerprint;
pub use policy::{EvictionPolicy, Policy};
pub use sharded::{BucketViolation, ShardedCache};

#[cfg(feature = "concurrent")]
pub use concurrent::{ConcurrentShardedCache, RawSpinLock};
