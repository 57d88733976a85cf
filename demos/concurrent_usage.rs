//! Shares one spin-locked sharded cache between worker threads.
//!
//! Run with `cargo run --example concurrent_usage --features concurrent`.

use pocket_cache::config::ShardedCacheConfig;
use pocket_cache::metrics::CacheMetrics;
use pocket_cache::ConcurrentShardedCache;
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::thread;
use std::time::Instant;

const THREADS: u64 = 8;
const OPS_PER_THREAD: u64 = 250_000;

fn main() {
    let config = ShardedCacheConfig {
        capacity: NonZeroUsize::new(1 << 16).unwrap(),
    };
    let cache: Arc<ConcurrentShardedCache> = Arc::new(ConcurrentShardedCache::init(config));

    let start = Instant::now();
    let handles: Vec<_> = (0..THREADS)
        .map(|t| {
            let cache = Arc::clone(&cache);
            thread::spawn(move || {
                let mut hits = 0u64;
                for i in 0..OPS_PER_THREAD {
                    // half the traffic is shared, half private to this thread
                    let key = if i % 2 == 0 {
                        i % 20_000
                    } else {
                        (t + 1) * 1_000_000 + i % 50_000
                    };
                    if cache.set_with(key, key, |&stored| stored == key) {
                        hits += 1;
                    }
                }
                hits
            })
        })
        .collect();

    let mut hits = 0;
    for (t, handle) in handles.into_iter().enumerate() {
        match handle.join() {
            Ok(local) => {
                println!("thread {t}: {local} hits");
                hits += local;
            }
            Err(_) => eprintln!("thread {t} panicked"),
        }
    }
    let elapsed = start.elapsed();

    let total = THREADS * OPS_PER_THREAD;
    println!(
        "{} requests in {:?} ({:.1} Mops/s), {} hits",
        total,
        elapsed,
        total as f64 / elapsed.as_secs_f64() / 1e6,
        hits
    );
    println!("{} entries in {} buckets", cache.len(), cache.bucket_count());

    match cache.check_invariants() {
        Ok(()) => println!("all buckets consistent"),
        Err(violation) => eprintln!("{violation}"),
    }
    for (name, value) in cache.metrics() {
        println!("  {name:<26} {value}");
    }
}
