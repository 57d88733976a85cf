// Data models for cache simulation

use pocket_cache::Policy;
use serde::Serialize;
use std::fmt;
use std::time::Duration;

use crate::input::TraceFormat;

/// Bucket layout of a pocket cache
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Layout {
    /// Select-indexed header over a fixed slot array
    Packed,
    /// One `VecDeque` per quotient group
    Deque,
}

impl Layout {
    pub fn as_str(&self) -> &'static str {
        match self {
            Layout::Packed => "packed",
            Layout::Deque => "deque",
        }
    }

    /// Parse a layout name as given on the command line
    pub fn parse(name: &str) -> Option<Layout> {
        match name.to_lowercase().as_str() {
            "packed" => Some(Layout::Packed),
            "deque" => Some(Layout::Deque),
            _ => None,
        }
    }
}

impl fmt::Display for Layout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// Parse an eviction policy by its report name (`largest`, `round-robin`, ...)
pub fn parse_policy(name: &str) -> Option<Policy> {
    let name = name.to_lowercase();
    Policy::all().into_iter().find(|p| p.as_str() == name)
}

/// Cache algorithm types supported for simulation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CacheAlgorithm {
    /// Offline optimal, needs the whole trace up front
    Belady,
    Lru,
    Mru,
    Lfu,
    /// LRU-K with K = 2
    Lru2,
    /// LRU-K with K = 3
    Lru3,
    Clock,
    /// Moka cache (external crate for comparison)
    Moka,
    /// Sharded pocket-dictionary cache
    Pocket(Layout, Policy),
}

impl CacheAlgorithm {
    /// Name used in reports
    pub fn name(&self) -> String {
        match self {
            CacheAlgorithm::Belady => "Belady".to_string(),
            CacheAlgorithm::Lru => "LRU".to_string(),
            CacheAlgorithm::Mru => "MRU".to_string(),
            CacheAlgorithm::Lfu => "LFU".to_string(),
            CacheAlgorithm::Lru2 => "LRU-2".to_string(),
            CacheAlgorithm::Lru3 => "LRU-3".to_string(),
            CacheAlgorithm::Clock => "CLOCK".to_string(),
            CacheAlgorithm::Moka => "Moka".to_string(),
            CacheAlgorithm::Pocket(layout, policy) => format!("Pocket-{layout}-{policy}"),
        }
    }

    /// Get all available algorithms: the baselines, then every packed policy
    pub fn all() -> Vec<CacheAlgorithm> {
        let mut all = vec![
            CacheAlgorithm::Belady,
            CacheAlgorithm::Lru,
            CacheAlgorithm::Mru,
            CacheAlgorithm::Lru2,
            CacheAlgorithm::Lru3,
            CacheAlgorithm::Lfu,
            CacheAlgorithm::Clock,
            CacheAlgorithm::Moka,
        ];
        all.extend(Self::pocket(Layout::Packed));
        all
    }

    /// Every policy on one layout
    pub fn pocket(layout: Layout) -> Vec<CacheAlgorithm> {
        Policy::all()
            .into_iter()
            .map(|policy| CacheAlgorithm::Pocket(layout, policy))
            .collect()
    }

    /// Parse a command-line name into one or more algorithms.
    ///
    /// `pocket` and `pocket-deque` expand to every policy on that layout;
    /// `pocket-<policy>` and `pocket-deque-<policy>` select one.
    pub fn parse(name: &str) -> Option<Vec<CacheAlgorithm>> {
        let name = name.to_lowercase();
        let single = match name.as_str() {
            "belady" | "opt" => CacheAlgorithm::Belady,
            "lru" => CacheAlgorithm::Lru,
            "mru" => CacheAlgorithm::Mru,
            "lfu" => CacheAlgorithm::Lfu,
            "lru2" | "lru-2" => CacheAlgorithm::Lru2,
            "lru3" | "lru-3" => CacheAlgorithm::Lru3,
            "clock" => CacheAlgorithm::Clock,
            "moka" => CacheAlgorithm::Moka,
            "pocket" | "pocket-packed" => return Some(Self::pocket(Layout::Packed)),
            "pocket-deque" => return Some(Self::pocket(Layout::Deque)),
            other => {
                let rest = other.strip_prefix("pocket-")?;
                let (layout, policy) = match rest.strip_prefix("deque-") {
                    Some(policy) => (Layout::Deque, policy),
                    None => (
                        Layout::Packed,
                        rest.strip_prefix("packed-").unwrap_or(rest),
                    ),
                };
                CacheAlgorithm::Pocket(layout, parse_policy(policy)?)
            }
        };
        Some(vec![single])
    }
}

impl fmt::Display for CacheAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(&self.name())
    }
}

/// Configuration for a simulation run
#[derive(Debug, Clone)]
pub struct SimulationConfig {
    /// Trace file or glob pattern
    pub input: String,
    /// Trace format; detected from each file's extension when `None`
    pub format: Option<TraceFormat>,
    /// Cache capacity in number of entries
    pub capacity: usize,
    /// Algorithms to simulate
    pub algorithms: Vec<CacheAlgorithm>,
    /// Confirm pocket-cache hits against the stored key
    pub confirm: bool,
}

/// Configuration for a parallel sweep of the concurrent pocket cache
#[derive(Debug, Clone)]
pub struct ParallelConfig {
    /// Trace file or glob pattern
    pub input: String,
    /// Trace format; detected from each file's extension when `None`
    pub format: Option<TraceFormat>,
    /// Cache capacities to sweep
    pub sizes: Vec<usize>,
    /// Thread counts run are `1..=max_threads`
    pub max_threads: usize,
    /// Bucket layout
    pub layout: Layout,
    /// Eviction policy of every bucket
    pub policy: Policy,
    /// Confirm hits against the stored key
    pub confirm: bool,
}

impl ParallelConfig {
    /// Sizes swept when none are given: 2^13 through 2^17
    pub fn default_sizes() -> Vec<usize> {
        (13..=17).map(|shift| 1usize << shift).collect()
    }
}

/// Outcome of replaying one trace through one cache
#[derive(Debug, Clone)]
pub struct RunStats {
    /// Cache name
    pub name: String,
    /// Number of cache hits
    pub hits: u64,
    /// Number of requests replayed
    pub total: u64,
    /// Wall-clock replay time
    pub elapsed: Duration,
    /// Entries held at the end of the run
    pub final_len: usize,
}

impl RunStats {
    /// Number of cache misses
    pub fn misses(&self) -> u64 {
        self.total - self.hits
    }

    /// Calculate hit rate as percentage
    pub fn hit_rate(&self) -> f64 {
        if self.total > 0 {
            (self.hits as f64 / self.total as f64) * 100.0
        } else {
            0.0
        }
    }

    /// Requests per microsecond
    pub fn throughput(&self) -> f64 {
        let micros = self.elapsed.as_secs_f64() * 1_000_000.0;
        if micros > 0.0 {
            self.total as f64 / micros
        } else {
            0.0
        }
    }
}

/// Results of a simulation run
#[derive(Debug)]
pub struct SimulationResult {
    /// Statistics for each algorithm, in run order
    pub runs: Vec<RunStats>,
    /// Total number of requests in the trace
    pub total_requests: usize,
    /// Number of distinct keys in the trace
    pub unique_keys: usize,
    /// Cache capacity used
    pub capacity: usize,
    /// Duration of the whole simulation
    pub duration: Duration,
}

/// One point of a parallel sweep
#[derive(Debug, Clone, Serialize)]
pub struct ParallelPoint {
    /// Cache capacity
    pub size: usize,
    /// Worker threads
    pub threads: usize,
    /// Fraction of requests that hit, in `[0, 1]`
    pub hit_rate: f64,
    /// Requests per microsecond
    pub throughput: f64,
}

/// CSV export row for simulation results
#[derive(Debug, Serialize)]
pub struct CsvResultRow {
    pub algorithm: String,
    pub capacity: usize,
    pub hits: u64,
    pub misses: u64,
    pub hit_rate: f64,
    pub elapsed_ms: f64,
    pub throughput_ops_per_us: f64,
    pub final_len: usize,
}
