//! Simulation runner for cache algorithms
//!
//! The whole trace is loaded once and replayed through one cache at a time,
//! so only a single cache is alive at any point. Belady needs the trace up
//! front anyway.
//!
//! Parallel runs split the trace into contiguous slices, one per thread, all
//! hitting the same concurrent pocket cache.

use std::io::{self, Write};
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread;
use std::time::Instant;

use parking_lot::lock_api::RawMutex;
use pocket_cache::bucket::{Bucket, DequeBucket, PackedBucket};
use pocket_cache::config::ShardedCacheConfig;
use pocket_cache::metrics::CacheMetrics;
use pocket_cache::{ConcurrentShardedCache, Policy, RawSpinLock};

use crate::baselines::{self, ReplayCache};
use crate::input::{load_pattern, load_pattern_to, Trace, TraceError};
use crate::models::{Layout, ParallelConfig, ParallelPoint, RunStats, SimulationConfig, SimulationResult};
use crate::stats::ParallelReport;

/// Replay every key of `trace` through `cache`
pub fn replay(trace: &Trace, cache: &mut dyn ReplayCache) -> RunStats {
    let start = Instant::now();
    let mut hits = 0u64;
    for key in trace.iter() {
        if cache.set(key) {
            hits += 1;
        }
    }
    let elapsed = start.elapsed();

    RunStats {
        name: cache.name(),
        hits,
        total: trace.len() as u64,
        elapsed,
        final_len: cache.len(),
    }
}

/// Replay `trace` through a shared concurrent cache from `threads` scoped
/// threads, each owning one contiguous slice.
///
/// With more than one thread the interleaving is up to the scheduler, so the
/// hit count varies between runs.
///
/// # Panics
///
/// Panics if `threads` is zero.
pub fn replay_parallel<B, R>(
    trace: &Trace,
    cache: &ConcurrentShardedCache<u64, B, R>,
    threads: usize,
    confirm: bool,
) -> RunStats
where
    B: Bucket<u64> + Send,
    R: RawMutex + Sync,
{
    assert!(threads > 0, "parallel replay needs at least one thread");
    let slices = trace.chunks(threads);
    let hits = AtomicU64::new(0);

    let start = Instant::now();
    thread::scope(|scope| {
        for &slice in &slices {
            let hits = &hits;
            scope.spawn(move || {
                let mut local = 0u64;
                for &key in slice {
                    let hit = if confirm {
                        cache.set_with(key, key, |&stored| stored == key)
                    } else {
                        cache.set(key, key)
                    };
                    if hit {
                        local += 1;
                    }
                }
                hits.fetch_add(local, Ordering::Relaxed);
            });
        }
    });
    let elapsed = start.elapsed();

    RunStats {
        name: format!("{}x{threads}", cache.algorithm_name()),
        hits: hits.into_inner(),
        total: trace.len() as u64,
        elapsed,
        final_len: cache.len(),
    }
}

/// Sweep cache sizes and thread counts over one trace, writing one line per
/// point to `progress`
pub fn sweep(
    trace: &Trace,
    config: &ParallelConfig,
    progress: &mut dyn Write,
) -> io::Result<Vec<ParallelPoint>> {
    let policy = config.policy;
    match config.layout {
        Layout::Packed => sweep_with(trace, config, progress, || {
            PackedBucket::<u64, Policy>::with_policy(policy)
        }),
        Layout::Deque => sweep_with(trace, config, progress, || {
            DequeBucket::<u64, Policy>::with_policy(policy)
        }),
    }
}

fn sweep_with<B, F>(
    trace: &Trace,
    config: &ParallelConfig,
    progress: &mut dyn Write,
    mut make_bucket: F,
) -> io::Result<Vec<ParallelPoint>>
where
    B: Bucket<u64> + Send,
    F: FnMut() -> B,
{
    let mut points = Vec::with_capacity(config.sizes.len() * config.max_threads);
    for &size in &config.sizes {
        let Some(capacity) = std::num::NonZeroUsize::new(size) else {
            writeln!(progress, "Skipping cache size 0")?;
            continue;
        };
        for threads in 1..=config.max_threads {
            let cache: ConcurrentShardedCache<u64, B, RawSpinLock> =
                ConcurrentShardedCache::init_with(ShardedCacheConfig { capacity }, &mut make_bucket);
            let stats = replay_parallel(trace, &cache, threads, config.confirm);
            writeln!(
                progress,
                "  size {size:>7} threads {threads}: {:.2}% hits, {:.2} ops/us",
                stats.hit_rate(),
                stats.throughput()
            )?;
            points.push(ParallelPoint {
                size,
                threads,
                hit_rate: stats.hit_rate() / 100.0,
                throughput: stats.throughput(),
            });
        }
    }
    Ok(points)
}

/// Load the configured trace and sweep it. Everything but the returned
/// report is written to `progress`.
pub fn run_sweep(config: &ParallelConfig, progress: &mut dyn Write) -> Result<ParallelReport, TraceError> {
    writeln!(progress, "Loading trace from {}...", config.input)?;
    let trace = load_pattern_to(&config.input, config.format, progress)?;
    writeln!(
        progress,
        "Sweeping {} sizes x {} thread counts over {} requests ({} {})",
        config.sizes.len(),
        config.max_threads,
        trace.len(),
        config.layout,
        config.policy.as_str()
    )?;

    let points = sweep(&trace, config, progress)?;
    let name = format!("pocket_{}_{}", config.layout, config.policy.as_str()).replace('-', "_");
    Ok(ParallelReport::new(name, points))
}

/// Runner for cache simulations
#[derive(Debug)]
pub struct SimulationRunner {
    config: SimulationConfig,
}

impl SimulationRunner {
    /// Create a new simulation runner
    pub fn new(config: SimulationConfig) -> Self {
        Self { config }
    }

    /// Load the configured trace and replay it through every algorithm
    pub fn run(&self) -> Result<SimulationResult, TraceError> {
        println!("Loading trace from {}...", self.config.input);
        let load_start = Instant::now();
        let trace = load_pattern(&self.config.input, self.config.format)?;
        println!("Load completed in {:.2?}", load_start.elapsed());

        Ok(self.run_on(&trace))
    }

    /// Replay an in-memory trace through every configured algorithm
    pub fn run_on(&self, trace: &Trace) -> SimulationResult {
        let unique_keys = trace.unique_keys();
        let capacity = self.config.capacity;

        println!("\nDataset statistics:");
        println!("  Total requests: {}", trace.len());
        println!("  Unique keys: {unique_keys}");
        if unique_keys > 0 {
            println!(
                "  Avg requests per key: {:.2}",
                trace.len() as f64 / unique_keys as f64
            );
        }

        println!("\nSimulation configuration:");
        println!("  Cache capacity: {capacity} entries");
        println!("  Algorithms: {}", self.config.algorithms.len());
        if self.config.confirm {
            println!("  Pocket hits confirmed against stored keys");
        }

        let start = Instant::now();
        let mut runs = Vec::with_capacity(self.config.algorithms.len());

        for &algorithm in &self.config.algorithms {
            println!("\nRunning {algorithm}...");

            let mut cache = baselines::create(algorithm, capacity, trace, self.config.confirm);
            let stats = replay(trace, cache.as_mut());

            println!(
                "  Wall time: {:.2?} ({:.2} ops/us)",
                stats.elapsed,
                stats.throughput()
            );
            println!(
                "  Hit rate: {:.2}% ({} of {}), {} entries held",
                stats.hit_rate(),
                stats.hits,
                stats.total,
                stats.final_len
            );
            if let Some(metrics) = cache.metrics() {
                let get = |name: &str| metrics.get(name).copied().unwrap_or(0.0);
                println!(
                    "  Insertions: {:.0}, evictions: {:.0}, drops: {:.0}",
                    get("insertions"),
                    get("evictions"),
                    get("drops")
                );
            }

            runs.push(stats);
            // Cache is dropped here, freeing memory before the next algorithm
        }

        SimulationResult {
            runs,
            total_requests: trace.len(),
            unique_keys,
            capacity,
            duration: start.elapsed(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CacheAlgorithm;
    use pocket_cache::ShardedCache;
    use std::fs;
    use std::num::NonZeroUsize;
    use std::path::PathBuf;

    fn create_temp_dir(test_name: &str) -> PathBuf {
        let temp_dir = std::env::temp_dir().join(format!("runner_test_{}", test_name));
        let _ = fs::remove_dir_all(&temp_dir);
        fs::create_dir_all(&temp_dir).expect("Failed to create temp directory");
        temp_dir
    }

    fn skewed_trace(len: usize) -> Trace {
        let mut state = 0x2545_f491_4f6c_dd1du64;
        let keys = (0..len)
            .map(|_| {
                state ^= state << 13;
                state ^= state >> 7;
                state ^= state << 17;
                let u = (state >> 11) % 4096;
                u * u / 4096
            })
            .collect();
        Trace::from_keys(keys)
    }

    fn config(capacity: usize) -> ShardedCacheConfig {
        ShardedCacheConfig {
            capacity: NonZeroUsize::new(capacity).unwrap(),
        }
    }

    #[test]
    fn test_replay_counts_hits() {
        let trace = Trace::from_keys(vec![1, 2, 1, 3, 1, 2]);
        let mut cache = baselines::create(CacheAlgorithm::Lru, 3, &trace, false);
        let stats = replay(&trace, cache.as_mut());
        assert_eq!(stats.name, "LRU");
        assert_eq!(stats.hits, 3);
        assert_eq!(stats.misses(), 3);
        assert_eq!(stats.final_len, 3);
    }

    #[test]
    fn test_single_thread_matches_serial() {
        let trace = skewed_trace(20_000);

        let mut serial: ShardedCache<u64> = ShardedCache::init(config(540));
        let expected = trace.iter().filter(|&key| serial.set(key, key)).count() as u64;

        let concurrent: ConcurrentShardedCache<u64> = ConcurrentShardedCache::init(config(540));
        let stats = replay_parallel(&trace, &concurrent, 1, false);

        assert_eq!(stats.hits, expected);
        assert_eq!(stats.final_len, serial.len());
        assert_eq!(stats.name, "ConcurrentPocketCachex1");
    }

    #[test]
    fn test_parallel_replay_keeps_invariants() {
        let trace = skewed_trace(40_000);
        let cache: ConcurrentShardedCache<u64> = ConcurrentShardedCache::init(config(1080));
        let stats = replay_parallel(&trace, &cache, 4, true);

        assert_eq!(stats.total, 40_000);
        assert!(stats.hits > 0);
        assert!(stats.final_len <= cache.capacity());
        assert_eq!(cache.pocket_metrics().core.requests, 40_000);
        assert_eq!(cache.pocket_metrics().core.cache_hits, stats.hits);
        assert!(cache.check_invariants().is_ok());
    }

    #[test]
    #[should_panic(expected = "at least one thread")]
    fn test_zero_threads_panics() {
        let cache: ConcurrentShardedCache<u64> = ConcurrentShardedCache::init(config(27));
        replay_parallel(&Trace::from_keys(vec![1]), &cache, 0, false);
    }

    #[test]
    fn test_sweep_covers_grid() {
        let trace = skewed_trace(5_000);
        let config = ParallelConfig {
            input: String::new(),
            format: None,
            sizes: vec![270, 540],
            max_threads: 2,
            layout: Layout::Deque,
            policy: Policy::LargestGroup,
            confirm: false,
        };
        let mut progress = Vec::new();
        let points = sweep(&trace, &config, &mut progress).unwrap();
        let grid: Vec<_> = points.iter().map(|p| (p.size, p.threads)).collect();
        assert_eq!(grid, vec![(270, 1), (270, 2), (540, 1), (540, 2)]);
        assert!(points.iter().all(|p| (0.0..=1.0).contains(&p.hit_rate)));
        assert_eq!(String::from_utf8(progress).unwrap().lines().count(), 4);
    }

    #[test]
    fn test_sweep_report_stays_out_of_progress() {
        let dir = create_temp_dir("sweep");
        let keys: String = (0..2_000).map(|i| format!("- {}\n", i % 300)).collect();
        fs::write(dir.join("trace.yaml"), keys).unwrap();

        let config = ParallelConfig {
            input: dir.join("*.yaml").to_string_lossy().into_owned(),
            format: None,
            sizes: vec![0, 54, 108],
            max_threads: 2,
            layout: Layout::Packed,
            policy: Policy::RoundRobin,
            confirm: false,
        };
        let mut progress = Vec::new();
        let report = run_sweep(&config, &mut progress).unwrap();
        let mut out = Vec::new();
        report.write_yaml(&mut out).unwrap();

        let out = String::from_utf8(out).unwrap();
        let mut lines = out.lines();
        assert_eq!(lines.next(), Some("pocket_packed_round_robin:"));
        let report_line = |line: &str| {
            matches!(line, "  -" | "    threads:" | "      -")
                || ["    size: ", "        num: ", "        throughput: ", "        hit_rate: "]
                    .iter()
                    .any(|prefix| {
                        line.strip_prefix(prefix)
                            .is_some_and(|value| value.parse::<f64>().is_ok())
                    })
        };
        for line in lines {
            assert!(report_line(line), "unexpected report line {line:?}");
        }
        assert_eq!(out.matches("    size: ").count(), 2);
        assert_eq!(out.matches("        num: ").count(), 4);

        let progress = String::from_utf8(progress).unwrap();
        assert!(progress.contains("Loaded 2000 requests"));
        assert!(progress.contains("Skipping cache size 0"));
        assert_eq!(progress.matches(" threads ").count(), 4);
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_runner_loads_and_replays() {
        let dir = create_temp_dir("run");
        let keys: String = (0..300).map(|i| format!("- {}\n", i % 60)).collect();
        fs::write(dir.join("trace.yaml"), keys).unwrap();

        let runner = SimulationRunner::new(SimulationConfig {
            input: dir.join("*.yaml").to_string_lossy().into_owned(),
            format: None,
            capacity: 100,
            algorithms: vec![
                CacheAlgorithm::Lru,
                CacheAlgorithm::Belady,
                CacheAlgorithm::Pocket(Layout::Packed, Policy::RoundRobin),
            ],
            confirm: true,
        });
        let result = runner.run().unwrap();

        assert_eq!(result.total_requests, 300);
        assert_eq!(result.unique_keys, 60);
        assert_eq!(result.runs.len(), 3);
        // 60 keys fit in every cache: only first touches miss
        assert_eq!(result.runs[0].hits, 240);
        assert_eq!(result.runs[1].hits, 240);
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_runner_reports_missing_input() {
        let runner = SimulationRunner::new(SimulationConfig {
            input: "/nonexistent/pocket-cache/*.trace".to_string(),
            format: None,
            capacity: 10,
            algorithms: vec![CacheAlgorithm::Lru],
            confirm: false,
        });
        assert!(matches!(runner.run(), Err(TraceError::Pattern(_))));
    }
}
