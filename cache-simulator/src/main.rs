use cache_simulator::generator::{ZipfConfig, ZipfGenerator};
use cache_simulator::input::TraceFormat;
use cache_simulator::models::{self, CacheAlgorithm, Layout, ParallelConfig};
use cache_simulator::runner::{self, SimulationRunner};
use cache_simulator::stats::SimulationStats;
use clap::{Parser, Subcommand};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Pocket cache simulator CLI
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Trace file or glob pattern (for simulation)
    #[arg(short, long, value_name = "PATTERN")]
    input: Option<String>,

    /// Cache capacity (number of entries)
    #[arg(short, long, default_value = "10000")]
    capacity: usize,

    /// Algorithms to simulate (belady, lru, mru, lfu, lru2, lru3, clock, moka, pocket, ...)
    /// If not provided, all algorithms will be used
    #[arg(short, long, value_name = "ALGOS", num_args = 1.., value_delimiter = ',')]
    algorithms: Option<Vec<String>>,
}

/// Subcommands for the CLI
#[derive(Subcommand, Debug)]
enum Commands {
    /// Replay a trace through each algorithm
    Simulate {
        /// Trace file or glob pattern; generated when omitted
        #[arg(short, long, value_name = "PATTERN")]
        input: Option<String>,

        /// Trace format (wiki, arc, dash); detected from the extension by default
        #[arg(short, long)]
        format: Option<String>,

        /// Cache capacity (number of entries)
        #[arg(short, long, default_value = "10000")]
        capacity: usize,

        /// Algorithms to simulate. `pocket` and `pocket-deque` expand to every
        /// policy; `pocket-<policy>` and `pocket-deque-<policy>` pick one.
        #[arg(short, long, value_name = "ALGOS", num_args = 1.., value_delimiter = ',')]
        algorithms: Option<Vec<String>>,

        /// Count a pocket-cache hit only if the stored key matches
        #[arg(long)]
        confirm: bool,

        /// Export results to CSV file
        #[arg(long, value_name = "PATH")]
        output_csv: Option<PathBuf>,
    },

    /// Sweep cache sizes and thread counts over the concurrent pocket cache
    Parallel {
        /// Trace file or glob pattern; generated when omitted
        #[arg(short, long, value_name = "PATTERN")]
        input: Option<String>,

        /// Trace format (wiki, arc, dash); detected from the extension by default
        #[arg(short, long)]
        format: Option<String>,

        /// Cache sizes to sweep (default: 8192 through 131072)
        #[arg(short, long, num_args = 1.., value_delimiter = ',')]
        sizes: Option<Vec<usize>>,

        /// Run 1 through this many threads
        #[arg(short, long, default_value = "8")]
        threads: usize,

        /// Bucket layout: packed or deque
        #[arg(long, default_value = "packed")]
        layout: String,

        /// Eviction policy: largest, round-robin, largest-rr or drop-new
        #[arg(long, default_value = "round-robin")]
        policy: String,

        /// Count a hit only if the stored key matches
        #[arg(long)]
        confirm: bool,

        /// Print a table instead of the YAML report
        #[arg(long)]
        table: bool,

        /// Export the sweep to CSV file
        #[arg(long, value_name = "PATH")]
        output_csv: Option<PathBuf>,
    },

    /// Generate a synthetic Zipf trace
    Generate {
        /// Number of distinct keys
        #[arg(long, default_value = "100000")]
        keys: u64,

        /// Number of requests
        #[arg(long, default_value = "1000000")]
        requests: usize,

        /// Zipf exponent
        #[arg(long, default_value = "0.99")]
        exponent: f64,

        /// RNG seed
        #[arg(long, default_value = "42")]
        seed: u64,

        /// Output file (Dash format)
        #[arg(short, long, default_value = "zipf.yaml")]
        output: PathBuf,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Parse command line arguments
    let args = Args::parse();

    match args.command {
        Some(Commands::Generate {
            keys,
            requests,
            exponent,
            seed,
            output,
        }) => {
            let config = ZipfConfig {
                keys,
                requests,
                exponent,
                seed,
                output,
                ..ZipfConfig::default()
            };
            ZipfGenerator::new(config).generate()
        }

        Some(Commands::Simulate {
            input,
            format,
            capacity,
            algorithms,
            confirm,
            output_csv,
        }) => run_simulator(input, format, capacity, algorithms, confirm, output_csv),

        Some(Commands::Parallel {
            input,
            format,
            sizes,
            threads,
            layout,
            policy,
            confirm,
            table,
            output_csv,
        }) => {
            if threads == 0 {
                return Err("--threads must be at least 1".into());
            }
            let layout = Layout::parse(&layout).ok_or_else(|| format!("Unknown layout '{layout}'"))?;
            let policy =
                models::parse_policy(&policy).ok_or_else(|| format!("Unknown policy '{policy}'"))?;
            let config = ParallelConfig {
                // Progress goes to stderr so the YAML report on stdout stays clean
                input: resolve_input(input, &mut io::stderr())?,
                format: parse_format(format)?,
                sizes: sizes.unwrap_or_else(ParallelConfig::default_sizes),
                max_threads: threads,
                layout,
                policy,
                confirm,
            };
            run_parallel(config, table, output_csv)
        }

        None => {
            // No subcommand: simulate every algorithm
            run_simulator(args.input, None, args.capacity, args.algorithms, false, None)
        }
    }
}

fn parse_format(format: Option<String>) -> Result<Option<TraceFormat>, Box<dyn std::error::Error>> {
    Ok(format
        .map(|name| name.parse::<TraceFormat>())
        .transpose()?)
}

/// Use the given pattern, or generate a default trace to replay
fn resolve_input(
    input: Option<String>,
    progress: &mut dyn Write,
) -> Result<String, Box<dyn std::error::Error>> {
    match input {
        Some(pattern) => Ok(pattern),
        None => {
            let path = ensure_test_data(progress)?;
            Ok(path.to_string_lossy().into_owned())
        }
    }
}

/// Parse algorithm names, falling back to every algorithm
fn select_algorithms(names: Option<Vec<String>>) -> Vec<CacheAlgorithm> {
    let names = match names {
        Some(names) if !names.is_empty() => names,
        _ => return CacheAlgorithm::all(),
    };

    let mut selected = Vec::new();
    for name in &names {
        match CacheAlgorithm::parse(name) {
            Some(algorithms) => selected.extend(algorithms),
            None => println!("Warning: Unknown algorithm '{name}', skipping"),
        }
    }
    if selected.is_empty() {
        println!("No valid algorithms selected, using all available algorithms");
        return CacheAlgorithm::all();
    }
    selected.dedup();
    selected
}

/// Run the simulator with the given parameters
fn run_simulator(
    input: Option<String>,
    format: Option<String>,
    capacity: usize,
    algorithms: Option<Vec<String>>,
    confirm: bool,
    output_csv: Option<PathBuf>,
) -> Result<(), Box<dyn std::error::Error>> {
    if capacity == 0 {
        return Err("--capacity must be at least 1".into());
    }
    let input = resolve_input(input, &mut io::stdout())?;
    let format = parse_format(format)?;
    let algorithms = select_algorithms(algorithms);

    println!("Cache Simulation");
    println!("================");
    println!("Input: {input}");
    println!("Cache capacity: {capacity} entries");
    println!(
        "Algorithms: {:?}",
        algorithms.iter().map(|a| a.name()).collect::<Vec<_>>()
    );
    println!();

    let runner = SimulationRunner::new(models::SimulationConfig {
        input,
        format,
        capacity,
        algorithms,
        confirm,
    });
    let result = match runner.run() {
        Ok(result) => result,
        Err(e) => {
            eprintln!("Error running simulation: {e}");
            return Err(e.into());
        }
    };

    println!("\nSimulation completed in {:.2?}", result.duration);
    let stats = SimulationStats::from_result(&result);
    stats.print_summary();

    if let Some(csv_path) = output_csv {
        match stats.export_csv(&csv_path) {
            Ok(()) => println!("\nResults exported to: {}", csv_path.display()),
            Err(e) => eprintln!("Failed to export CSV: {e}"),
        }
    }

    Ok(())
}

/// Run the parallel sweep and report it
fn run_parallel(
    config: ParallelConfig,
    table: bool,
    output_csv: Option<PathBuf>,
) -> Result<(), Box<dyn std::error::Error>> {
    let report = runner::run_sweep(&config, &mut io::stderr())?;

    if table {
        report.print_table();
    } else {
        report.print_yaml()?;
    }

    if let Some(csv_path) = output_csv {
        match report.export_csv(&csv_path) {
            Ok(()) => eprintln!("Sweep exported to: {}", csv_path.display()),
            Err(e) => eprintln!("Failed to export CSV: {e}"),
        }
    }

    Ok(())
}

/// Ensure a default trace exists and return its path
fn ensure_test_data(progress: &mut dyn Write) -> Result<PathBuf, Box<dyn std::error::Error>> {
    let path = Path::new("test_data").join("zipf.yaml");
    if !path.exists() {
        writeln!(progress, "Creating test data...")?;
        let config = ZipfConfig {
            keys: 50_000,
            requests: 500_000,
            exponent: 0.9,
            output: path.clone(),
            ..ZipfConfig::default()
        };
        ZipfGenerator::new(config).generate_to(progress)?;
        writeln!(progress, "Created test data in {}", path.display())?;
    }
    Ok(path)
}
