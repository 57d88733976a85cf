use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;

use crate::input::Trace;

/// Parameters for a synthetic Zipf trace
#[derive(Debug, Clone)]
pub struct ZipfConfig {
    /// Number of distinct keys; key `k` has popularity rank `k`
    pub keys: u64,
    /// Number of requests to draw
    pub requests: usize,
    /// Skew exponent; 0 is uniform
    pub exponent: f64,
    /// RNG seed, so traces are reproducible
    pub seed: u64,
    /// Output file, written in Dash format
    pub output: PathBuf,
    /// Write buffer size in KB
    pub buffer_size_kb: u32,
}

impl Default for ZipfConfig {
    fn default() -> Self {
        Self {
            keys: 100_000,
            requests: 1_000_000,
            exponent: 0.99,
            seed: 42,
            output: PathBuf::from("zipf.yaml"),
            buffer_size_kb: 1024,
        }
    }
}

/// Draws keys from a truncated Zipf distribution by inverting its CDF
#[derive(Debug)]
pub struct ZipfGenerator {
    config: ZipfConfig,
    cdf: Vec<f64>,
    rng: StdRng,
}

impl ZipfGenerator {
    /// # Panics
    ///
    /// Panics if `config.keys` is zero or the exponent is negative or NaN.
    pub fn new(config: ZipfConfig) -> Self {
        assert!(config.keys > 0, "a Zipf trace needs at least one key");
        assert!(
            config.exponent >= 0.0,
            "Zipf exponent must be non-negative, got {}",
            config.exponent
        );

        let mut cdf = Vec::with_capacity(config.keys as usize);
        let mut total = 0.0;
        for rank in 1..=config.keys {
            total += (rank as f64).powf(-config.exponent);
            cdf.push(total);
        }
        for weight in &mut cdf {
            *weight /= total;
        }

        let rng = StdRng::seed_from_u64(config.seed);
        Self { config, cdf, rng }
    }

    /// Draw one key in `1..=keys`
    pub fn sample(&mut self) -> u64 {
        let u: f64 = self.rng.gen();
        let rank = self.cdf.partition_point(|&p| p < u);
        // Rounding can leave the last CDF entry just below 1
        rank.min(self.cdf.len() - 1) as u64 + 1
    }

    /// Draw `config.requests` keys into memory
    pub fn trace(&mut self) -> Trace {
        let keys = (0..self.config.requests).map(|_| self.sample()).collect();
        Trace::from_keys(keys)
    }

    /// Write the trace to `config.output` as `- key` lines
    pub fn generate(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        self.generate_to(&mut io::stdout())
    }

    /// Like [`generate`](Self::generate), with the parameter summary written
    /// to `progress`
    pub fn generate_to(&mut self, progress: &mut dyn Write) -> Result<(), Box<dyn std::error::Error>> {
        if let Some(parent) = self.config.output.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        writeln!(progress, "Generating Zipf trace with the following parameters:")?;
        writeln!(progress, "  Keys: {}", self.config.keys)?;
        writeln!(progress, "  Requests: {}", self.config.requests)?;
        writeln!(progress, "  Exponent: {}", self.config.exponent)?;
        writeln!(progress, "  Seed: {}", self.config.seed)?;
        writeln!(progress, "  Output file: {}", self.config.output.display())?;

        let file = File::create(&self.config.output)?;
        let buffer_size = self.config.buffer_size_kb as usize * 1024;
        let mut writer = BufWriter::with_capacity(buffer_size, file);
        for _ in 0..self.config.requests {
            let key = self.sample();
            writeln!(writer, "- {key}")?;
        }
        writer.flush()?;

        writeln!(progress, "Trace generation complete")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::parse_dash;
    use std::io::BufReader;
    use std::path::Path;

    fn create_temp_dir(test_name: &str) -> PathBuf {
        let temp_dir = std::env::temp_dir().join(format!("zipf_generator_test_{}", test_name));
        let _ = fs::remove_dir_all(&temp_dir);
        fs::create_dir_all(&temp_dir).expect("Failed to create temp directory");
        temp_dir
    }

    fn cleanup_temp_dir(path: &Path) {
        let _ = fs::remove_dir_all(path);
    }

    fn config(keys: u64, requests: usize, exponent: f64) -> ZipfConfig {
        ZipfConfig {
            keys,
            requests,
            exponent,
            ..ZipfConfig::default()
        }
    }

    #[test]
    fn test_same_seed_same_trace() {
        let a = ZipfGenerator::new(config(1000, 5000, 0.9)).trace();
        let b = ZipfGenerator::new(config(1000, 5000, 0.9)).trace();
        assert_eq!(a.keys(), b.keys());

        let c = ZipfGenerator::new(ZipfConfig {
            seed: 7,
            ..config(1000, 5000, 0.9)
        })
        .trace();
        assert_ne!(a.keys(), c.keys());
    }

    #[test]
    fn test_keys_within_range() {
        let trace = ZipfGenerator::new(config(50, 10_000, 1.2)).trace();
        assert_eq!(trace.len(), 10_000);
        assert!(trace.iter().all(|key| (1..=50).contains(&key)));
    }

    #[test]
    fn test_skew_favours_low_ranks() {
        let trace = ZipfGenerator::new(config(1000, 50_000, 1.0)).trace();
        let top_ten = trace.iter().filter(|&key| key <= 10).count();
        // Ranks 1..=10 carry about 39% of the mass at s = 1 over 1000 keys
        assert!(top_ten > 15_000, "top ten drew {top_ten}");

        let uniform = ZipfGenerator::new(config(1000, 50_000, 0.0)).trace();
        let top_ten = uniform.iter().filter(|&key| key <= 10).count();
        assert!(top_ten < 1_500, "uniform top ten drew {top_ten}");
    }

    #[test]
    fn test_single_key() {
        let trace = ZipfGenerator::new(config(1, 100, 0.99)).trace();
        assert!(trace.iter().all(|key| key == 1));
    }

    #[test]
    fn test_generate_writes_dash_format() {
        let dir = create_temp_dir("dash");
        let output = dir.join("nested").join("trace.yaml");
        let mut cfg = config(200, 1000, 0.8);
        cfg.output = output.clone();

        let mut progress = Vec::new();
        ZipfGenerator::new(cfg.clone()).generate_to(&mut progress).unwrap();
        let progress = String::from_utf8(progress).unwrap();
        assert!(progress.starts_with("Generating Zipf trace"));
        assert!(progress.contains("  Requests: 1000"));
        let file = File::open(&output).unwrap();
        let parsed = parse_dash(BufReader::new(file)).unwrap();

        let expected = ZipfGenerator::new(cfg).trace();
        assert_eq!(parsed.keys(), expected.keys());
        cleanup_temp_dir(&dir);
    }

    #[test]
    #[should_panic(expected = "at least one key")]
    fn test_zero_keys_panics() {
        ZipfGenerator::new(config(0, 10, 1.0));
    }
}
