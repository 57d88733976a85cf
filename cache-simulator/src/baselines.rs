//! Reference eviction policies to compare the pocket caches against
//!
//! Every cache here answers one question per request: was the key already
//! cached? A miss always admits the key, evicting first if the cache is full.
//! Payloads are irrelevant to hit rates, so none are stored.

use std::collections::{BTreeMap, BTreeSet, BinaryHeap};
use std::num::NonZeroUsize;

use hashbrown::{HashMap, HashSet};
use pocket_cache::bucket::{Bucket, DequeBucket, PackedBucket};
use pocket_cache::config::ShardedCacheConfig;
use pocket_cache::metrics::CacheMetrics;
use pocket_cache::{Policy, ShardedCache};

// External cache for comparison
use moka::sync::Cache as MokaCache;

// Use ahash for faster hashing with Moka
use ahash::RandomState as AHashRandomState;

use crate::input::Trace;
use crate::models::{CacheAlgorithm, Layout};

/// A cache that can replay a trace of keys
pub trait ReplayCache {
    /// Name used in reports
    fn name(&self) -> String;

    /// Looks `key` up, admitting it on a miss. Returns `true` on a hit.
    fn set(&mut self, key: u64) -> bool;

    /// Number of cached keys
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Cache-specific counters, if the cache keeps any
    fn metrics(&self) -> Option<BTreeMap<String, f64>> {
        None
    }
}

/// Least recently used, backed by the `lru` crate
pub struct LruBaseline {
    cache: lru::LruCache<u64, ()>,
}

impl LruBaseline {
    pub fn new(capacity: NonZeroUsize) -> Self {
        Self {
            cache: lru::LruCache::new(capacity),
        }
    }
}

impl ReplayCache for LruBaseline {
    fn name(&self) -> String {
        "LRU".to_string()
    }

    fn set(&mut self, key: u64) -> bool {
        if self.cache.get(&key).is_some() {
            return true;
        }
        self.cache.put(key, ());
        false
    }

    fn len(&self) -> usize {
        self.cache.len()
    }
}

/// Most recently used: a full cache evicts the key touched last.
///
/// Only the most recent key is ever a victim, and it is replaced by the
/// admitted key at once, so no full recency list is needed.
pub struct MruBaseline {
    capacity: usize,
    keys: HashSet<u64>,
    most_recent: Option<u64>,
}

impl MruBaseline {
    pub fn new(capacity: NonZeroUsize) -> Self {
        Self {
            capacity: capacity.get(),
            keys: HashSet::with_capacity(capacity.get()),
            most_recent: None,
        }
    }
}

impl ReplayCache for MruBaseline {
    fn name(&self) -> String {
        "MRU".to_string()
    }

    fn set(&mut self, key: u64) -> bool {
        let hit = self.keys.contains(&key);
        if !hit {
            if self.keys.len() >= self.capacity {
                if let Some(victim) = self.most_recent {
                    self.keys.remove(&victim);
                }
            }
            self.keys.insert(key);
        }
        self.most_recent = Some(key);
        hit
    }

    fn len(&self) -> usize {
        self.keys.len()
    }
}

/// Least frequently used; ties go to the key inserted earliest
pub struct LfuBaseline {
    capacity: usize,
    /// key -> (hits, insertion time)
    frames: HashMap<u64, (u64, u64)>,
    /// (hits, insertion time, key), smallest first
    order: BTreeSet<(u64, u64, u64)>,
    clock: u64,
}

impl LfuBaseline {
    pub fn new(capacity: NonZeroUsize) -> Self {
        Self {
            capacity: capacity.get(),
            frames: HashMap::with_capacity(capacity.get()),
            order: BTreeSet::new(),
            clock: 0,
        }
    }
}

impl ReplayCache for LfuBaseline {
    fn name(&self) -> String {
        "LFU".to_string()
    }

    fn set(&mut self, key: u64) -> bool {
        let now = self.clock;
        self.clock += 1;

        if let Some(frame) = self.frames.get_mut(&key) {
            self.order.remove(&(frame.0, frame.1, key));
            frame.0 += 1;
            self.order.insert((frame.0, frame.1, key));
            return true;
        }

        if self.frames.len() >= self.capacity {
            if let Some((_, _, victim)) = self.order.pop_first() {
                self.frames.remove(&victim);
            }
        }
        self.frames.insert(key, (0, now));
        self.order.insert((0, now, key));
        false
    }

    fn len(&self) -> usize {
        self.frames.len()
    }
}

/// History of one key under LRU-K
#[derive(Debug, Clone, Copy)]
struct KFrame<const K: usize> {
    /// Hits so far, capped at `K - 1`
    hits: usize,
    /// Times of the last `hits + 1` references, oldest first
    window: [u64; K],
}

impl<const K: usize> KFrame<K> {
    fn rank(&self, key: u64) -> (usize, u64, u64) {
        (self.hits, self.window[0], key)
    }
}

/// LRU-K: evicts the key with the fewest recorded references, then the one
/// whose oldest remembered reference is furthest in the past.
pub struct LruKBaseline<const K: usize> {
    capacity: usize,
    frames: HashMap<u64, KFrame<K>>,
    order: BTreeSet<(usize, u64, u64)>,
    clock: u64,
}

impl<const K: usize> LruKBaseline<K> {
    /// # Panics
    ///
    /// Panics if `K` is zero.
    pub fn new(capacity: NonZeroUsize) -> Self {
        assert!(K > 0, "LRU-K needs K of at least one");
        Self {
            capacity: capacity.get(),
            frames: HashMap::with_capacity(capacity.get()),
            order: BTreeSet::new(),
            clock: 0,
        }
    }
}

impl<const K: usize> ReplayCache for LruKBaseline<K> {
    fn name(&self) -> String {
        format!("LRU-{K}")
    }

    fn set(&mut self, key: u64) -> bool {
        let now = self.clock;
        self.clock += 1;

        if let Some(frame) = self.frames.get_mut(&key) {
            self.order.remove(&frame.rank(key));
            if frame.hits == K - 1 {
                frame.window.rotate_left(1);
            } else {
                frame.hits += 1;
            }
            frame.window[frame.hits] = now;
            self.order.insert(frame.rank(key));
            return true;
        }

        if self.frames.len() >= self.capacity {
            if let Some((_, _, victim)) = self.order.pop_first() {
                self.frames.remove(&victim);
            }
        }
        let frame = KFrame {
            hits: 0,
            window: [now; K],
        };
        self.order.insert(frame.rank(key));
        self.frames.insert(key, frame);
        false
    }

    fn len(&self) -> usize {
        self.frames.len()
    }
}

/// CLOCK (second chance): a hit sets the key's reference bit; the hand
/// clears set bits as it sweeps and replaces the first key whose bit is clear.
pub struct ClockBaseline {
    capacity: usize,
    ring: Vec<(u64, bool)>,
    slots: HashMap<u64, usize>,
    hand: usize,
}

impl ClockBaseline {
    pub fn new(capacity: NonZeroUsize) -> Self {
        Self {
            capacity: capacity.get(),
            ring: Vec::with_capacity(capacity.get()),
            slots: HashMap::with_capacity(capacity.get()),
            hand: 0,
        }
    }
}

impl ReplayCache for ClockBaseline {
    fn name(&self) -> String {
        "CLOCK".to_string()
    }

    fn set(&mut self, key: u64) -> bool {
        if let Some(&slot) = self.slots.get(&key) {
            self.ring[slot].1 = true;
            return true;
        }

        if self.ring.len() < self.capacity {
            self.slots.insert(key, self.ring.len());
            self.ring.push((key, false));
            return false;
        }

        loop {
            let (victim, referenced) = &mut self.ring[self.hand];
            if *referenced {
                *referenced = false;
                self.hand = (self.hand + 1) % self.capacity;
                continue;
            }
            self.slots.remove(&*victim);
            *victim = key;
            self.slots.insert(key, self.hand);
            self.hand = (self.hand + 1) % self.capacity;
            return false;
        }
    }

    fn len(&self) -> usize {
        self.ring.len()
    }
}

/// Belady's offline optimum: evicts the key whose next request is furthest
/// away. Built from the trace it will replay; replaying anything else gives
/// meaningless results.
pub struct BeladyBaseline {
    capacity: usize,
    /// For request `i`, the index of the next request for the same key
    next_use: Vec<usize>,
    cursor: usize,
    /// key -> next use as of its latest request
    table: HashMap<u64, usize>,
    /// (next use, key), with stale entries skipped on pop
    heap: BinaryHeap<(usize, u64)>,
}

impl BeladyBaseline {
    pub fn new(trace: &Trace, capacity: NonZeroUsize) -> Self {
        let keys = trace.keys();
        let mut next_use = vec![usize::MAX; keys.len()];
        let mut seen: HashMap<u64, usize> = HashMap::new();
        for (i, &key) in keys.iter().enumerate().rev() {
            if let Some(later) = seen.insert(key, i) {
                next_use[i] = later;
            }
        }

        Self {
            capacity: capacity.get(),
            next_use,
            cursor: 0,
            table: HashMap::with_capacity(capacity.get()),
            heap: BinaryHeap::new(),
        }
    }

    fn evict(&mut self) {
        while let Some((next, key)) = self.heap.pop() {
            if self.table.get(&key) == Some(&next) {
                self.table.remove(&key);
                return;
            }
        }
    }
}

impl ReplayCache for BeladyBaseline {
    fn name(&self) -> String {
        "Belady".to_string()
    }

    fn set(&mut self, key: u64) -> bool {
        let next = self
            .next_use
            .get(self.cursor)
            .copied()
            .unwrap_or(usize::MAX);
        self.cursor += 1;

        let hit = self.table.contains_key(&key);
        if !hit && self.table.len() >= self.capacity {
            self.evict();
        }
        self.table.insert(key, next);
        self.heap.push((next, key));
        hit
    }

    fn len(&self) -> usize {
        self.table.len()
    }
}

/// Moka's concurrent TinyLFU cache, for an external point of comparison
pub struct MokaBaseline {
    cache: MokaCache<u64, (), AHashRandomState>,
}

impl MokaBaseline {
    pub fn new(capacity: NonZeroUsize) -> Self {
        let cache = MokaCache::builder()
            .max_capacity(capacity.get() as u64)
            .initial_capacity(capacity.get())
            .build_with_hasher(AHashRandomState::default());
        Self { cache }
    }
}

impl ReplayCache for MokaBaseline {
    fn name(&self) -> String {
        "Moka".to_string()
    }

    fn set(&mut self, key: u64) -> bool {
        if self.cache.get(&key).is_some() {
            return true;
        }
        self.cache.insert(key, ());
        false
    }

    fn len(&self) -> usize {
        self.cache.run_pending_tasks();
        self.cache.entry_count() as usize
    }
}

/// A sharded pocket cache. The payload is the key itself, so hits can be
/// confirmed exactly.
pub struct PocketBaseline<B> {
    cache: ShardedCache<u64, B>,
    name: String,
    confirm: bool,
}

impl<B: Bucket<u64>> PocketBaseline<B> {
    pub fn new(cache: ShardedCache<u64, B>, name: String, confirm: bool) -> Self {
        Self {
            cache,
            name,
            confirm,
        }
    }

    pub fn cache(&self) -> &ShardedCache<u64, B> {
        &self.cache
    }
}

impl<B: Bucket<u64>> ReplayCache for PocketBaseline<B> {
    fn name(&self) -> String {
        self.name.clone()
    }

    fn set(&mut self, key: u64) -> bool {
        if self.confirm {
            self.cache.set_with(key, key, |&stored| stored == key)
        } else {
            self.cache.set(key, key)
        }
    }

    fn len(&self) -> usize {
        self.cache.len()
    }

    fn metrics(&self) -> Option<BTreeMap<String, f64>> {
        Some(self.cache.metrics())
    }
}

/// Build the cache for `algorithm`.
///
/// `trace` is only read by Belady, which needs the future. A zero capacity
/// is raised to one.
pub fn create(
    algorithm: CacheAlgorithm,
    capacity: usize,
    trace: &Trace,
    confirm: bool,
) -> Box<dyn ReplayCache> {
    let cap = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
    match algorithm {
        CacheAlgorithm::Belady => Box::new(BeladyBaseline::new(trace, cap)),
        CacheAlgorithm::Lru => Box::new(LruBaseline::new(cap)),
        CacheAlgorithm::Mru => Box::new(MruBaseline::new(cap)),
        CacheAlgorithm::Lfu => Box::new(LfuBaseline::new(cap)),
        CacheAlgorithm::Lru2 => Box::new(LruKBaseline::<2>::new(cap)),
        CacheAlgorithm::Lru3 => Box::new(LruKBaseline::<3>::new(cap)),
        CacheAlgorithm::Clock => Box::new(ClockBaseline::new(cap)),
        CacheAlgorithm::Moka => Box::new(MokaBaseline::new(cap)),
        CacheAlgorithm::Pocket(layout, policy) => {
            let config = ShardedCacheConfig { capacity: cap };
            let name = algorithm.name();
            match layout {
                Layout::Packed => {
                    let cache: ShardedCache<u64, PackedBucket<u64, Policy>> =
                        ShardedCache::init_with(config, || PackedBucket::with_policy(policy));
                    Box::new(PocketBaseline::new(cache, name, confirm))
                }
                Layout::Deque => {
                    let cache: ShardedCache<u64, DequeBucket<u64, Policy>> =
                        ShardedCache::init_with(config, || DequeBucket::with_policy(policy));
                    Box::new(PocketBaseline::new(cache, name, confirm))
                }
            }
        }
    }
}
