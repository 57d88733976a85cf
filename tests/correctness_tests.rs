//! Correctness Tests for Pocket Buckets and the Sharded Cache
//!
//! These tests drive buckets with hand-built fingerprints so that every
//! eviction is predictable, then check both the observable results and the
//! internal bookkeeping.
//!
//! ## Test Strategy
//! - Fingerprints built with `Fingerprint::from_parts` to target exact groups
//! - Every policy and both layouts exercised through the same helpers
//! - Packed header cross-checked against a reference group-count array
//! - Deterministic pseudo-random sequences for the long-running checks

use pocket_cache::bucket::{Bucket, DequeBucket, Insertion, PackedBucket, CAPACITY};
use pocket_cache::config::ShardedCacheConfig;
use pocket_cache::hash::{Fingerprint, QUOTIENTS};
use pocket_cache::policy::{DropNew, LargestGroup, LargestThenRoundRobin, Policy, RoundRobin};
use pocket_cache::{EvictionPolicy, ShardedCache};
use std::num::NonZeroUsize;

// ============================================================================
// HELPER FUNCTIONS
// ============================================================================

fn fp(q: u8, r: u16) -> Fingerprint {
    Fingerprint::from_parts(q, r)
}

fn make_cache(capacity: usize) -> ShardedCache {
    let config = ShardedCacheConfig {
        capacity: NonZeroUsize::new(capacity).unwrap(),
    };
    ShardedCache::init(config)
}

/// Small xorshift generator so long sequences are reproducible.
struct XorShift(u64);

impl XorShift {
    fn next(&mut self) -> u64 {
        let mut x = self.0;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.0 = x;
        x
    }

    fn below(&mut self, n: u64) -> u64 {
        self.next() % n
    }
}

/// Fills a bucket with 27 entries of quotient 0, remainders 0..27.
fn scenario_a<B: Bucket<u64>>(bucket: &mut B) {
    for r in 0..CAPACITY as u16 {
        assert_eq!(bucket.insert(fp(0, r), r as u64), Insertion::Inserted);
    }
}

fn policies() -> [Policy; 3] {
    [
        Policy::LargestGroup,
        Policy::RoundRobin,
        Policy::LargestThenRoundRobin,
    ]
}

// ============================================================================
// SCENARIO A / B: A SINGLE CROWDED GROUP
// ============================================================================

fn check_scenario_a<B: Bucket<u64>>(mut bucket: B) {
    scenario_a(&mut bucket);
    assert_eq!(bucket.len(), CAPACITY);
    assert!(bucket.is_full());
    for r in 0..CAPACITY as u16 {
        assert_eq!(bucket.find(fp(0, r)), Some(r as u64), "remainder {r}");
    }
    assert!(bucket.check_invariants().is_ok());
}

#[test]
fn test_scenario_a_packed() {
    for policy in policies() {
        check_scenario_a(PackedBucket::<u64, Policy>::with_policy(policy));
    }
}

#[test]
fn test_scenario_a_deque() {
    for policy in policies() {
        check_scenario_a(DequeBucket::<u64, Policy>::with_policy(policy));
    }
}

fn check_scenario_b<B: Bucket<u64>>(mut bucket: B) {
    scenario_a(&mut bucket);
    // touch every entry in ascending order, leaving remainder 0 least recent
    for r in 0..CAPACITY as u16 {
        bucket.find(fp(0, r));
    }

    let outcome = bucket.insert(fp(0, 27), 27);
    let eviction = outcome.eviction().copied().expect("full bucket must evict");
    assert_eq!(eviction.quotient, 0);
    assert_eq!(eviction.remainder, 0);
    assert_eq!(eviction.payload, 0);
    assert_eq!(eviction.group_len, 27);

    assert_eq!(bucket.len(), CAPACITY);
    assert_eq!(bucket.find(fp(0, 0)), None);
    assert_eq!(bucket.find(fp(0, 27)), Some(27));
    for r in 1..CAPACITY as u16 {
        assert_eq!(bucket.find(fp(0, r)), Some(r as u64));
    }
    assert!(bucket.check_invariants().is_ok());
}

#[test]
fn test_scenario_b_packed() {
    for policy in policies() {
        check_scenario_b(PackedBucket::<u64, Policy>::with_policy(policy));
    }
}

#[test]
fn test_scenario_b_deque() {
    for policy in policies() {
        check_scenario_b(DequeBucket::<u64, Policy>::with_policy(policy));
    }
}

#[test]
fn test_scenario_b_respects_recent_hits() {
    let mut bucket: PackedBucket<u64> = PackedBucket::new();
    scenario_a(&mut bucket);
    // remainder 0 is the oldest insert; a hit rescues it
    assert_eq!(bucket.find(fp(0, 0)), Some(0));

    let outcome = bucket.insert(fp(0, 27), 27);
    assert_eq!(outcome.eviction().map(|e| e.remainder), Some(1));
    assert_eq!(bucket.find(fp(0, 0)), Some(0));
    assert_eq!(bucket.find(fp(0, 1)), None);
}

// ============================================================================
// ROUND TRIP AND PLAIN (DROP-NEW) VARIANT
// ============================================================================

#[test]
fn test_round_trip_every_quotient() {
    for q in 0..QUOTIENTS as u8 {
        let mut packed: PackedBucket<u64> = PackedBucket::new();
        let mut deque: DequeBucket<u64> = DequeBucket::new();
        let f = fp(q, 2047);
        packed.insert(f, 0xABCD);
        deque.insert(f, 0xABCD);
        assert_eq!(packed.find(f), Some(0xABCD));
        assert_eq!(deque.find(f), Some(0xABCD));
    }
}

#[test]
fn test_drop_new_rejects_when_full() {
    let mut bucket: PackedBucket<u64, DropNew> = PackedBucket::default();
    scenario_a(&mut bucket);
    let sizes = bucket.group_sizes();

    assert_eq!(bucket.insert(fp(0, 27), 27), Insertion::Dropped);
    assert_eq!(bucket.insert(fp(19, 3), 3), Insertion::Dropped);
    assert_eq!(bucket.group_sizes(), sizes);
    assert_eq!(bucket.find(fp(0, 27)), None);
    assert_eq!(bucket.find(fp(0, 0)), Some(0));

    // room appears only through explicit removal
    assert!(bucket.remove(fp(0, 5), &5));
    assert_eq!(bucket.insert(fp(19, 3), 3), Insertion::Inserted);
    assert!(bucket.check_invariants().is_ok());
}

// ============================================================================
// EVICTION NECESSITY
// ============================================================================

fn check_eviction_necessity<P: EvictionPolicy>(mut bucket: PackedBucket<u64, P>, seed: u64) {
    let mut rng = XorShift(seed);
    while !bucket.is_full() {
        let q = rng.below(QUOTIENTS as u64) as u8;
        bucket.insert(fp(q, rng.below(2048) as u16), rng.next());
    }

    for _ in 0..500 {
        let before = bucket.group_sizes();
        let q = rng.below(QUOTIENTS as u64) as u8;
        let outcome = bucket.insert(fp(q, rng.below(2048) as u16), rng.next());
        let after = bucket.group_sizes();

        let eviction = outcome.eviction().copied().expect("full bucket must evict");
        let victim = eviction.quotient as usize;
        assert_eq!(eviction.group_len, before[victim]);
        assert!(before[victim] > 0);

        let mut expected = before;
        expected[victim] -= 1;
        expected[q as usize] += 1;
        assert_eq!(after, expected);
        assert_eq!(bucket.len(), CAPACITY);
    }
    assert!(bucket.check_invariants().is_ok());
}

#[test]
fn test_eviction_necessity_every_policy() {
    check_eviction_necessity(PackedBucket::<u64, LargestGroup>::default(), 1);
    check_eviction_necessity(PackedBucket::<u64, RoundRobin>::default(), 2);
    check_eviction_necessity(PackedBucket::<u64, LargestThenRoundRobin>::default(), 3);
}

#[test]
fn test_largest_group_victim_is_a_maximum() {
    let mut bucket: PackedBucket<u64, LargestGroup> = PackedBucket::default();
    let mut rng = XorShift(77);
    for _ in 0..2_000 {
        let before = bucket.group_sizes();
        let max = *before.iter().max().unwrap();
        let q = rng.below(QUOTIENTS as u64) as u8;
        if let Insertion::Replaced(e) = bucket.insert(fp(q, rng.below(2048) as u16), 0) {
            assert_eq!(e.group_len, max);
        }
    }
}

#[test]
fn test_round_robin_avoids_incoming_group() {
    let mut bucket: PackedBucket<u64> = PackedBucket::new();
    for r in 0..20 {
        bucket.insert(fp(10, r), 0);
    }
    for r in 0..7 {
        bucket.insert(fp(3, r), 0);
    }
    // the next non-empty group after 10, wrapping, is 3
    let outcome = bucket.insert(fp(10, 500), 0);
    assert_eq!(outcome.eviction().map(|e| e.quotient), Some(3));
    assert_eq!(bucket.group_len(10), 21);
    assert_eq!(bucket.group_len(3), 6);
}

// ============================================================================
// HEADER CONSISTENCY
// ============================================================================

#[test]
fn test_header_matches_reference_counts() {
    let mut bucket: PackedBucket<u64, Policy> = PackedBucket::with_policy(Policy::LargestGroup);
    let mut counts = [0usize; QUOTIENTS];
    let mut live: Vec<(Fingerprint, u64)> = Vec::new();
    let mut rng = XorShift(0x5eed);

    for step in 0..5_000u64 {
        if rng.below(4) == 0 && !live.is_empty() {
            let (f, payload) = live.swap_remove(rng.below(live.len() as u64) as usize);
            if bucket.remove(f, &payload) {
                counts[f.quotient() as usize] -= 1;
            }
        } else {
            // few remainders, so collisions and duplicates are common
            let f = fp(rng.below(8) as u8, rng.below(4) as u16);
            match bucket.insert(f, step) {
                Insertion::Inserted => counts[f.quotient() as usize] += 1,
                Insertion::Replaced(e) => {
                    counts[e.quotient as usize] -= 1;
                    counts[f.quotient() as usize] += 1;
                    live.retain(|&(lf, lp)| !(lf == e.fingerprint() && lp == e.payload));
                }
                Insertion::Dropped => unreachable!("largest-group policy always evicts"),
            }
            live.push((f, step));
        }

        for q in 0..QUOTIENTS as u8 {
            assert_eq!(bucket.group_len(q), counts[q as usize], "step {step} group {q}");
        }
        assert_eq!(bucket.len(), counts.iter().sum::<usize>());
        assert!(bucket.check_invariants().is_ok(), "step {step}");
    }
}

#[test]
fn test_header_after_draining() {
    let mut bucket: PackedBucket<u64> = PackedBucket::new();
    let entries: Vec<_> = (0..CAPACITY as u16)
        .map(|i| (fp((i * 7 % 32) as u8, i), i as u64))
        .collect();
    for &(f, p) in &entries {
        bucket.insert(f, p);
    }
    for &(f, p) in entries.iter().rev() {
        assert!(bucket.remove(f, &p));
        assert!(bucket.check_invariants().is_ok());
    }
    assert!(bucket.is_empty());
    assert_eq!(bucket.header(), 0xFFFF_FFFF);
}

// ============================================================================
// CONFIRMATION HOOK
// ============================================================================

#[test]
fn test_confirm_skips_false_positives() {
    let mut bucket: PackedBucket<u64> = PackedBucket::new();
    // three distinct objects that share one fingerprint
    for object in [100, 200, 300] {
        bucket.insert(fp(6, 42), object);
    }

    assert_eq!(bucket.find(fp(6, 42)), Some(300));
    assert_eq!(bucket.find_with(fp(6, 42), |&p| p == 100), Some(100));
    assert_eq!(bucket.find_with(fp(6, 42), |&p| p == 400), None);
    assert_eq!(bucket.group_len(6), 3);

    let mut calls = 0;
    bucket.find_with(fp(6, 42), |_| {
        calls += 1;
        false
    });
    assert_eq!(calls, 3);
}

// ============================================================================
// RECENCY EFFECT (DEQUE LAYOUT)
// ============================================================================

fn check_hot_key_survives<P: EvictionPolicy>(mut bucket: DequeBucket<u64, P>) {
    scenario_a(&mut bucket);
    let hot = fp(0, 13);

    for r in 100..400u16 {
        assert_eq!(bucket.find(hot), Some(13));
        let outcome = bucket.insert(fp(0, r), r as u64);
        let victim = outcome.eviction().map(|e| e.remainder);
        assert!(victim.is_some());
        assert_ne!(victim, Some(13));
    }
    assert_eq!(bucket.find(hot), Some(13));
}

#[test]
fn test_deque_recency_protects_hot_key() {
    check_hot_key_survives(DequeBucket::<u64, RoundRobin>::default());
    check_hot_key_survives(DequeBucket::<u64, LargestGroup>::default());
    check_hot_key_survives(DequeBucket::<u64, LargestThenRoundRobin>::default());
}

#[test]
fn test_deque_without_hits_evicts_oldest() {
    let mut bucket: DequeBucket<u64> = DequeBucket::new();
    scenario_a(&mut bucket);
    for (i, r) in (100..110u16).enumerate() {
        let outcome = bucket.insert(fp(0, r), 0);
        assert_eq!(outcome.eviction().map(|e| e.remainder), Some(i as u16));
    }
}

// ============================================================================
// LAYOUT EQUIVALENCE
// ============================================================================

#[test]
fn test_layouts_agree_on_every_operation() {
    for policy in policies() {
        let mut packed: PackedBucket<u64, Policy> = PackedBucket::with_policy(policy);
        let mut deque: DequeBucket<u64, Policy> = DequeBucket::with_policy(policy);
        let mut rng = XorShift(policy as u64 + 11);

        for step in 0..3_000u64 {
            let f = fp(rng.below(6) as u8, rng.below(6) as u16);
            match rng.below(3) {
                0 => assert_eq!(packed.find(f), deque.find(f), "step {step}"),
                1 => assert_eq!(packed.insert(f, step), deque.insert(f, step), "step {step}"),
                _ => {
                    let payload = rng.below(step + 1);
                    assert_eq!(packed.remove(f, &payload), deque.remove(f, &payload));
                }
            }
            assert_eq!(packed.group_sizes(), deque.group_sizes());
        }

        let a: Vec<_> = packed.entries().map(|(f, &p)| (f, p)).collect();
        let b: Vec<_> = deque.entries().map(|(f, &p)| (f, p)).collect();
        assert_eq!(a, b);
    }
}

// ============================================================================
// SCENARIO C: BUCKET ISOLATION
// ============================================================================

/// Keys owned by `bucket` in a two-bucket cache, in ascending order.
fn keys_in_bucket(cache: &ShardedCache, bucket: usize, count: usize) -> Vec<u64> {
    (0u64..)
        .filter(|&key| cache.locate(key).0 == bucket)
        .take(count)
        .collect()
}

#[test]
fn test_scenario_c_buckets_are_isolated() {
    let probe = make_cache(54);
    assert_eq!(probe.bucket_count(), 2);
    let zero = keys_in_bucket(&probe, 0, 40);
    let one = keys_in_bucket(&probe, 1, 40);

    // a repeating access pattern over bucket-0 keys
    let pattern: Vec<u64> = (0..400).map(|i| zero[(i * i + 3 * i) % zero.len()]).collect();

    let mut alone = make_cache(54);
    let solo: Vec<bool> = pattern.iter().map(|&k| alone.set(k, k)).collect();

    let mut shared = make_cache(54);
    let mut interleaved = Vec::with_capacity(pattern.len());
    for (i, &k) in pattern.iter().enumerate() {
        for j in 0..3 {
            shared.set(one[(i * 3 + j) % one.len()], 0);
        }
        interleaved.push(shared.set(k, k));
    }

    assert_eq!(solo, interleaved);
    assert!(solo.iter().any(|&hit| hit));
    assert!(solo.iter().any(|&hit| !hit));
    assert_eq!(shared.bucket(1).map(|b| b.len()), Some(CAPACITY));
    assert_eq!(alone.bucket(1).map(|b| b.len()), Some(0));
    assert!(shared.check_invariants().is_ok());
}

// ============================================================================
// SHARDED CACHE CAPACITY
// ============================================================================

#[test]
fn test_sharded_capacity_invariant() {
    let mut cache = make_cache(27 * 10);
    let mut rng = XorShift(99);
    for _ in 0..20_000 {
        let key = rng.below(5_000);
        cache.set(key, key);
        assert!(cache.len() <= cache.capacity());
    }
    for bucket in cache.buckets() {
        assert!(bucket.len() <= CAPACITY);
        assert_eq!(
            bucket.group_sizes().iter().map(|&n| n as usize).sum::<usize>(),
            bucket.len()
        );
    }
    assert!(cache.check_invariants().is_ok());
}

#[test]
fn test_hit_rate_on_repeated_working_set() {
    // a working set well under capacity should hit on every repeat
    let mut cache = make_cache(1 << 14);
    for key in 0..500u64 {
        cache.set_with(key, key, |&p| p == key);
    }
    let hits = (0..500u64).filter(|&k| cache.set_with(k, k, |&p| p == k)).count();
    assert_eq!(hits, 500);
}
