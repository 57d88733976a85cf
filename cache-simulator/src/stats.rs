// Statistics reporting for cache simulation

use crate::models::{CsvResultRow, ParallelPoint, RunStats, SimulationResult};
use std::io::{self, Write};
use std::path::Path;

/// Reports the runs of one simulation
#[derive(Debug)]
pub struct SimulationStats {
    runs: Vec<RunStats>,
    total_requests: usize,
    unique_keys: usize,
    capacity: usize,
}

impl SimulationStats {
    pub fn from_result(result: &SimulationResult) -> Self {
        Self {
            runs: result.runs.clone(),
            total_requests: result.total_requests,
            unique_keys: result.unique_keys,
            capacity: result.capacity,
        }
    }

    /// The run with the most hits, first one on ties
    pub fn best(&self) -> Option<&RunStats> {
        self.runs
            .iter()
            .reduce(|best, run| if run.hits > best.hits { run } else { best })
    }

    pub fn print_summary(&self) {
        println!("\nCache Simulation Summary");
        println!("========================");
        println!("Total requests: {}", self.total_requests);
        println!("Unique keys: {}", self.unique_keys);
        println!("Cache capacity: {} entries", self.capacity);

        println!("\nResults by Algorithm:");
        println!(
            "{:<28} {:>8} {:>12} {:>12} {:>10} {:>10} {:>10}",
            "Algo", "HitRate", "Hits", "Misses", "Duration", "Ops/us", "Entries"
        );
        println!("{}", "-".repeat(96));

        for run in &self.runs {
            println!(
                "{:<28} {:>7.2}% {:>12} {:>12} {:>9.3}s {:>10.2} {:>10}",
                run.name,
                run.hit_rate(),
                run.hits,
                run.misses(),
                run.elapsed.as_secs_f64(),
                run.throughput(),
                run.final_len
            );
        }

        if let Some(best) = self.best() {
            println!("\nBest hit rate: {} ({:.2}%)", best.name, best.hit_rate());
        }
    }

    pub fn rows(&self) -> Vec<CsvResultRow> {
        self.runs
            .iter()
            .map(|run| CsvResultRow {
                algorithm: run.name.clone(),
                capacity: self.capacity,
                hits: run.hits,
                misses: run.misses(),
                hit_rate: run.hit_rate(),
                elapsed_ms: run.elapsed.as_secs_f64() * 1000.0,
                throughput_ops_per_us: run.throughput(),
                final_len: run.final_len,
            })
            .collect()
    }

    /// Export results to a CSV file
    pub fn export_csv(&self, path: &Path) -> Result<(), csv::Error> {
        self.write_csv(csv::Writer::from_path(path)?)
    }

    /// Write the CSV rows, with a header, to any writer
    pub fn write_csv<W: Write>(&self, mut writer: csv::Writer<W>) -> Result<(), csv::Error> {
        for row in self.rows() {
            writer.serialize(row)?;
        }
        writer.flush()?;
        Ok(())
    }
}

/// Reports a parallel sweep, grouped by cache size
#[derive(Debug)]
pub struct ParallelReport {
    name: String,
    points: Vec<ParallelPoint>,
}

impl ParallelReport {
    /// `name` heads the YAML report; points are kept in sweep order
    pub fn new(name: impl Into<String>, points: Vec<ParallelPoint>) -> Self {
        Self {
            name: name.into(),
            points,
        }
    }

    pub fn points(&self) -> &[ParallelPoint] {
        &self.points
    }

    /// Write the sweep as a YAML list: one item per size, each holding one
    /// item per thread count.
    pub fn write_yaml<W: Write>(&self, out: &mut W) -> io::Result<()> {
        writeln!(out, "{}:", self.name)?;
        let mut current = None;
        for point in &self.points {
            if current != Some(point.size) {
                current = Some(point.size);
                writeln!(out, "  -")?;
                writeln!(out, "    size: {}", point.size)?;
                writeln!(out, "    threads:")?;
            }
            writeln!(out, "      -")?;
            writeln!(out, "        num: {}", point.threads)?;
            writeln!(out, "        throughput: {}", point.throughput)?;
            writeln!(out, "        hit_rate: {}", point.hit_rate)?;
        }
        Ok(())
    }

    pub fn print_yaml(&self) -> io::Result<()> {
        let stdout = io::stdout();
        let mut lock = stdout.lock();
        self.write_yaml(&mut lock)?;
        lock.flush()
    }

    pub fn print_table(&self) {
        println!("\nParallel Sweep: {}", self.name);
        println!("{:>10} {:>8} {:>10} {:>10}", "Size", "Threads", "HitRate", "Ops/us");
        println!("{}", "-".repeat(41));
        for point in &self.points {
            println!(
                "{:>10} {:>8} {:>9.2}% {:>10.2}",
                point.size,
                point.threads,
                point.hit_rate * 100.0,
                point.throughput
            );
        }
    }

    /// Export the sweep to a CSV file
    pub fn export_csv(&self, path: &Path) -> Result<(), csv::Error> {
        let mut writer = csv::Writer::from_path(path)?;
        for point in &self.points {
            writer.serialize(point)?;
        }
        writer.flush()?;
        Ok(())
    }
}
