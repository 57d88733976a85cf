use std::env;

use cache_simulator::generator::{ZipfConfig, ZipfGenerator};
use cache_simulator::models::{CacheAlgorithm, Layout, SimulationConfig};
use cache_simulator::runner::SimulationRunner;

fn main() -> Result<(), String> {
    // Parse command line arguments
    let args: Vec<String> = env::args().collect();

    // Capacity (default: 4096 entries) and Zipf exponent (default: 0.9)
    let capacity = match args.get(1) {
        Some(arg) => arg
            .parse::<usize>()
            .map_err(|e| format!("Invalid capacity '{arg}': {e}"))?,
        None => 4096,
    };
    let exponent = match args.get(2) {
        Some(arg) => arg
            .parse::<f64>()
            .map_err(|e| format!("Invalid exponent '{arg}': {e}"))?,
        None => 0.9,
    };
    if capacity == 0 {
        return Err("Capacity must be at least 1".to_string());
    }

    println!("Policy Comparison");
    println!("=================");
    println!("Capacity: {capacity} entries");
    println!("Zipf exponent: {exponent}");

    let trace = ZipfGenerator::new(ZipfConfig {
        keys: capacity as u64 * 16,
        requests: 200_000,
        exponent,
        ..ZipfConfig::default()
    })
    .trace();

    let mut algorithms = vec![
        CacheAlgorithm::Belady,
        CacheAlgorithm::Lru,
        CacheAlgorithm::Lru2,
        CacheAlgorithm::Clock,
    ];
    algorithms.extend(CacheAlgorithm::pocket(Layout::Packed));
    algorithms.extend(CacheAlgorithm::pocket(Layout::Deque));

    let runner = SimulationRunner::new(SimulationConfig {
        input: String::new(),
        format: None,
        capacity,
        algorithms,
        confirm: true,
    });
    let result = runner.run_on(&trace);

    println!("\nSimulation completed in {:.2?}", result.duration);

    // Display algorithm comparison, relative to the offline optimum
    let optimal = result.runs.first().map(|run| run.hits).unwrap_or(0).max(1);
    println!("\nAlgorithm comparison:");
    println!(
        "| {:<28} | {:<10} | {:<12} |",
        "Algorithm", "Hit Rate", "Of Optimal"
    );
    println!("|{:-<30}|{:-<12}|{:-<14}|", "", "", "");

    for run in &result.runs {
        println!(
            "| {:<28} | {:>9.2}% | {:>11.1}% |",
            run.name,
            run.hit_rate(),
            run.hits as f64 / optimal as f64 * 100.0
        );
    }

    Ok(())
}
