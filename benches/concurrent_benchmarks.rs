//! Concurrent Cache Benchmarks
//!
//! Benchmarks for measuring concurrent pocket-cache throughput across access
//! patterns, thread counts and lock types.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use pocket_cache::bucket::{Bucket, PackedBucket};
use pocket_cache::config::ShardedCacheConfig;
use pocket_cache::policy::LargestGroup;
use pocket_cache::{ConcurrentShardedCache, RawSpinLock};
use parking_lot::lock_api::RawMutex;
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::thread;

const CACHE_SIZE: usize = 1 << 16;
const OPS_PER_THREAD: usize = 10_000;

fn make_cache<B, R>() -> Arc<ConcurrentShardedCache<u64, B, R>>
where
    B: Bucket<u64> + Default,
    R: RawMutex,
{
    let config = ShardedCacheConfig {
        capacity: NonZeroUsize::new(CACHE_SIZE).unwrap(),
    };
    let cache = ConcurrentShardedCache::init(config);
    for key in 0..CACHE_SIZE as u64 {
        cache.set(key, key);
    }
    Arc::new(cache)
}

/// Benchmark concurrent lookups of resident keys
fn concurrent_reads(c: &mut Criterion) {
    let mut group = c.benchmark_group("Concurrent Reads");
    group.throughput(Throughput::Elements((8 * OPS_PER_THREAD) as u64));

    let spin = make_cache::<PackedBucket<u64>, RawSpinLock>();
    let parking = make_cache::<PackedBucket<u64>, parking_lot::RawMutex>();

    group.bench_function("spin lock", |b| {
        b.iter(|| run_concurrent_reads(Arc::clone(&spin), 8, OPS_PER_THREAD));
    });
    group.bench_function("parking_lot", |b| {
        b.iter(|| run_concurrent_reads(Arc::clone(&parking), 8, OPS_PER_THREAD));
    });

    group.finish();
}

/// Benchmark concurrent inserts of fresh keys
fn concurrent_writes(c: &mut Criterion) {
    let mut group = c.benchmark_group("Concurrent Writes");
    group.throughput(Throughput::Elements((8 * OPS_PER_THREAD) as u64));

    let round_robin = make_cache::<PackedBucket<u64>, RawSpinLock>();
    let largest = make_cache::<PackedBucket<u64, LargestGroup>, RawSpinLock>();

    group.bench_function("round-robin", |b| {
        b.iter(|| run_concurrent_writes(Arc::clone(&round_robin), 8, OPS_PER_THREAD));
    });
    group.bench_function("largest", |b| {
        b.iter(|| run_concurrent_writes(Arc::clone(&largest), 8, OPS_PER_THREAD));
    });

    group.finish();
}

/// Benchmark thread scaling on a mixed workload
fn thread_count_comparison(c: &mut Criterion) {
    let mut group = c.benchmark_group("Thread Count Comparison");

    for threads in [1, 2, 4, 8, 16] {
        group.throughput(Throughput::Elements((threads * OPS_PER_THREAD) as u64));
        group.bench_with_input(BenchmarkId::new("threads", threads), &threads, |b, &n| {
            let cache = make_cache::<PackedBucket<u64>, RawSpinLock>();
            b.iter(|| run_concurrent_mixed(Arc::clone(&cache), n, OPS_PER_THREAD));
        });
    }

    group.finish();
}

fn run_concurrent_reads<B, R>(
    cache: Arc<ConcurrentShardedCache<u64, B, R>>,
    num_threads: usize,
    ops_per_thread: usize,
) where
    B: Bucket<u64> + Send + 'static,
    R: RawMutex + Send + Sync + 'static,
{
    let mut handles = Vec::with_capacity(num_threads);
    for t in 0..num_threads {
        let cache = Arc::clone(&cache);
        handles.push(thread::spawn(move || {
            for i in 0..ops_per_thread {
                let key = ((t * ops_per_thread + i) % CACHE_SIZE) as u64;
                black_box(cache.get(key));
            }
        }));
    }
    for handle in handles {
        handle.join().unwrap();
    }
}

fn run_concurrent_writes<B, R>(
    cache: Arc<ConcurrentShardedCache<u64, B, R>>,
    num_threads: usize,
    ops_per_thread: usize,
) where
    B: Bucket<u64> + Send + 'static,
    R: RawMutex + Send + Sync + 'static,
{
    let mut handles = Vec::with_capacity(num_threads);
    for t in 0..num_threads {
        let cache = Arc::clone(&cache);
        handles.push(thread::spawn(move || {
            for i in 0..ops_per_thread {
                let key = (CACHE_SIZE + t * ops_per_thread + i) as u64;
                black_box(cache.set(key, key));
            }
        }));
    }
    for handle in handles {
        handle.join().unwrap();
    }
}

// 80% resident lookups, 20% fresh inserts
fn run_concurrent_mixed<B, R>(
    cache: Arc<ConcurrentShardedCache<u64, B, R>>,
    num_threads: usize,
    ops_per_thread: usize,
) where
    B: Bucket<u64> + Send + 'static,
    R: RawMutex + Send + Sync + 'static,
{
    let mut handles = Vec::with_capacity(num_threads);
    for t in 0..num_threads {
        let cache = Arc::clone(&cache);
        handles.push(thread::spawn(move || {
            for i in 0..ops_per_thread {
                let key = (t * ops_per_thread + i) as u64;
                if i % 5 == 0 {
                    black_box(cache.set(key + CACHE_SIZE as u64, key));
                } else {
                    black_box(cache.set(key % CACHE_SIZE as u64, key));
                }
            }
        }));
    }
    for handle in handles {
        handle.join().unwrap();
    }
}

criterion_group!(
    benches,
    concurrent_reads,
    concurrent_writes,
    thread_count_comparison
);
criterion_main!(benches);
