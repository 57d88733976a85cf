use cache_simulator::generator::{ZipfConfig, ZipfGenerator};
use clap::Parser;
use std::path::PathBuf;

/// Zipf trace generator for cache simulations
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Number of distinct keys
    #[arg(long, default_value = "100000")]
    keys: u64,

    /// Number of requests
    #[arg(long, default_value = "1000000")]
    requests: usize,

    /// Zipf exponent; 0 draws keys uniformly
    #[arg(long, default_value = "0.99")]
    exponent: f64,

    /// RNG seed
    #[arg(long, default_value = "42")]
    seed: u64,

    /// Output file, one `- key` line per request
    #[arg(short, long, default_value = "zipf.yaml")]
    output: PathBuf,

    /// Write buffer size in KB (default: 1024 = 1 MB)
    #[arg(long, default_value = "1024")]
    buffer_size: u32,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Parse command line arguments
    let args = Args::parse();

    if args.keys == 0 {
        return Err("--keys must be at least 1".into());
    }
    if args.exponent.is_nan() || args.exponent < 0.0 {
        return Err(format!("--exponent must be non-negative, got {}", args.exponent).into());
    }

    let config = ZipfConfig {
        keys: args.keys,
        requests: args.requests,
        exponent: args.exponent,
        seed: args.seed,
        output: args.output,
        buffer_size_kb: args.buffer_size,
    };

    println!("Trace Generator");
    println!("===============");

    ZipfGenerator::new(config).generate()
}
