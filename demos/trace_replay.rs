//! Replays a synthetic skewed trace through every eviction policy and both
//! bucket layouts, printing hit rates and the victim-group histogram.
//!
//! Run with `cargo run --example trace_replay`.

use pocket_cache::bucket::{Bucket, DequeBucket, PackedBucket};
use pocket_cache::config::ShardedCacheConfig;
use pocket_cache::metrics::CacheMetrics;
use pocket_cache::policy::Policy;
use pocket_cache::ShardedCache;
use std::num::NonZeroUsize;

const CAPACITY: usize = 1 << 12;
const KEYS: u64 = 1 << 15;
const REQUESTS: usize = 500_000;

/// Squared-uniform key stream: low keys are requested far more often.
fn trace() -> Vec<u64> {
    let mut state = 0x2545_F491_4F6C_DD1Du64;
    (0..REQUESTS)
        .map(|_| {
            state ^= state << 13;
            state ^= state >> 7;
            state ^= state << 17;
            let a = state % KEYS;
            let b = (state >> 32) % KEYS;
            a * b / KEYS
        })
        .collect()
}

fn replay<B: Bucket<u64>>(mut cache: ShardedCache<u64, B>, trace: &[u64]) -> ShardedCache<u64, B> {
    for &key in trace {
        cache.set_with(key, key, |&stored| stored == key);
    }
    cache
}

fn report<B: Bucket<u64>>(layout: &str, policy: Policy, cache: &ShardedCache<u64, B>) {
    let metrics = cache.pocket_metrics();
    println!(
        "{:<7} {:<12} hit rate {:>6.2}%  evictions {:>7}  drops {:>7}  mean victim group {:>5.2}",
        layout,
        policy.as_str(),
        metrics.core.hit_rate() * 100.0,
        metrics.core.evictions,
        metrics.core.drops,
        metrics.mean_victim_group_size(),
    );
}

fn main() {
    let config = ShardedCacheConfig {
        capacity: NonZeroUsize::new(CAPACITY).unwrap(),
    };
    let trace = trace();
    println!(
        "{} requests over {} keys, {} buckets ({} entries)",
        trace.len(),
        KEYS,
        config.bucket_count(),
        config.effective_capacity()
    );

    for policy in Policy::all() {
        let packed = replay(
            ShardedCache::init_with(config, || PackedBucket::<u64, Policy>::with_policy(policy)),
            &trace,
        );
        report("packed", policy, &packed);

        let deque = replay(
            ShardedCache::init_with(config, || DequeBucket::<u64, Policy>::with_policy(policy)),
            &trace,
        );
        report("deque", policy, &deque);
    }

    let last = replay(ShardedCache::<u64>::init(config), &trace);
    println!("\n{} metrics:", last.algorithm_name());
    for (name, value) in last.metrics() {
        println!("  {name:<26} {value}");
    }
}
