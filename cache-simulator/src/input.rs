//! Trace loading for cache simulation
//!
//! Three whitespace-separated formats are understood:
//!
//! - **Wiki**: `counter time url flag` records from Wikibench request logs.
//!   Keys are a fixed-seed hash of the url; requests are replayed in
//!   `counter` order and a repeated counter keeps its first record.
//! - **Arc**: `start length _ _` records from the ARC block traces. Each
//!   record requests every block in `start..start + length`.
//! - **Dash**: `- key` pairs, the YAML-style list the trace generator writes.
//!
//! A record cut short by the end of the file ends the trace, and so does a
//! record with a malformed number: the keys read before it are kept. Only a
//! file whose very first record is malformed is rejected with
//! [`TraceError::Parse`].

use hashbrown::HashSet;
use std::collections::BTreeMap;
use std::fmt;
use std::fs::File;
use std::hash::BuildHasher;
use std::io::{self, BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Fixed seeds so Wiki url keys are stable across runs and machines.
const URL_SEEDS: [u64; 4] = [
    0x243f_6a88_85a3_08d3,
    0x1319_8a2e_0370_7344,
    0xa409_3822_299f_31d0,
    0x082e_fa98_ec4e_6c89,
];

/// Error types for trace loading
#[derive(Debug)]
pub enum TraceError {
    /// The trace could not be read
    Io(io::Error),
    /// A token could not be parsed
    Parse { line: usize, message: String },
    /// A format name that is none of `wiki`, `arc`, `dash`
    UnknownFormat(String),
    /// A bad glob pattern, or one that matched no files
    Pattern(String),
}

impl fmt::Display for TraceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TraceError::Io(err) => write!(f, "I/O error: {err}"),
            TraceError::Parse { line, message } => write!(f, "line {line}: {message}"),
            TraceError::UnknownFormat(name) => {
                write!(f, "unknown trace format '{name}' (expected wiki, arc or dash)")
            }
            TraceError::Pattern(message) => write!(f, "input pattern: {message}"),
        }
    }
}

impl std::error::Error for TraceError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            TraceError::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<io::Error> for TraceError {
    fn from(err: io::Error) -> Self {
        TraceError::Io(err)
    }
}

/// Supported trace formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TraceFormat {
    Wiki,
    Arc,
    Dash,
}

impl TraceFormat {
    /// Detect the format from a file extension: `.lis` is Arc, `.yaml` and
    /// `.yml` are Dash, anything else is Wiki.
    pub fn detect(path: &Path) -> TraceFormat {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("lis") => TraceFormat::Arc,
            Some("yaml") | Some("yml") => TraceFormat::Dash,
            _ => TraceFormat::Wiki,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TraceFormat::Wiki => "wiki",
            TraceFormat::Arc => "arc",
            TraceFormat::Dash => "dash",
        }
    }
}

impl FromStr for TraceFormat {
    type Err = TraceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "wiki" => Ok(TraceFormat::Wiki),
            "arc" | "lis" => Ok(TraceFormat::Arc),
            "dash" | "yaml" | "zipf" => Ok(TraceFormat::Dash),
            _ => Err(TraceError::UnknownFormat(s.to_string())),
        }
    }
}

impl fmt::Display for TraceFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// A sequence of keys to replay
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Trace {
    keys: Vec<u64>,
}

impl Trace {
    pub fn from_keys(keys: Vec<u64>) -> Self {
        Self { keys }
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn keys(&self) -> &[u64] {
        &self.keys
    }

    pub fn iter(&self) -> impl Iterator<Item = u64> + '_ {
        self.keys.iter().copied()
    }

    /// Number of distinct keys
    pub fn unique_keys(&self) -> usize {
        self.keys.iter().collect::<HashSet<_>>().len()
    }

    /// Appends another trace after this one
    pub fn extend(&mut self, other: Trace) {
        self.keys.extend(other.keys);
    }

    /// Splits the trace into `n` contiguous slices of `len / n` keys; the
    /// last slice also takes the remainder.
    ///
    /// # Panics
    ///
    /// Panics if `n` is zero.
    pub fn chunks(&self, n: usize) -> Vec<&[u64]> {
        assert!(n > 0, "a trace must be split into at least one chunk");
        let stride = self.keys.len() / n;
        let mut slices = Vec::with_capacity(n);
        let mut rest = self.keys.as_slice();
        for _ in 1..n {
            let (head, tail) = rest.split_at(stride);
            slices.push(head);
            rest = tail;
        }
        slices.push(rest);
        slices
    }
}

/// Whitespace tokens of a reader, each tagged with its 1-based line number
struct Tokens<R> {
    lines: io::Lines<R>,
    line: usize,
    pending: std::vec::IntoIter<String>,
}

impl<R: BufRead> Tokens<R> {
    fn new(reader: R) -> Self {
        Self {
            lines: reader.lines(),
            line: 0,
            pending: Vec::new().into_iter(),
        }
    }

    fn next_token(&mut self) -> Result<Option<(usize, String)>, TraceError> {
        loop {
            if let Some(token) = self.pending.next() {
                return Ok(Some((self.line, token)));
            }
            match self.lines.next() {
                Some(line) => {
                    let line = line?;
                    self.line += 1;
                    let tokens: Vec<String> =
                        line.split_whitespace().map(str::to_string).collect();
                    self.pending = tokens.into_iter();
                }
                None => return Ok(None),
            }
        }
    }

    /// Reads a full record of `N` tokens, or `None` if the input ends first.
    fn record<const N: usize>(&mut self) -> Result<Option<[(usize, String); N]>, TraceError> {
        let mut fields: [(usize, String); N] = std::array::from_fn(|_| (0, String::new()));
        for field in fields.iter_mut() {
            match self.next_token()? {
                Some(token) => *field = token,
                None => return Ok(None),
            }
        }
        Ok(Some(fields))
    }
}

fn parse_field<T: FromStr>(field: &(usize, String), what: &str) -> Result<T, TraceError> {
    let (line, token) = field;
    token.parse().map_err(|_| TraceError::Parse {
        line: *line,
        message: format!("invalid {what} '{token}'"),
    })
}

/// A malformed record ends the trace, unless no record was read before it
fn end_of_trace(err: TraceError, records: usize) -> Result<(), TraceError> {
    if records == 0 {
        Err(err)
    } else {
        Ok(())
    }
}

/// Parse a Wikibench log
pub fn parse_wiki<R: BufRead>(reader: R) -> Result<Trace, TraceError> {
    let hasher = ahash::RandomState::with_seeds(
        URL_SEEDS[0],
        URL_SEEDS[1],
        URL_SEEDS[2],
        URL_SEEDS[3],
    );
    let mut tokens = Tokens::new(reader);
    let mut timeline: BTreeMap<u64, u64> = BTreeMap::new();
    let mut records = 0;

    while let Some([counter, time, url, _flag]) = tokens.record::<4>()? {
        let parsed = parse_field::<u64>(&counter, "counter")
            .and_then(|counter| parse_field::<f64>(&time, "timestamp").map(|_| counter));
        let counter = match parsed {
            Ok(counter) => counter,
            Err(err) => {
                end_of_trace(err, records)?;
                break;
            }
        };
        records += 1;
        timeline
            .entry(counter)
            .or_insert_with(|| BuildHasher::hash_one(&hasher, url.1.as_str()));
    }

    Ok(Trace::from_keys(timeline.into_values().collect()))
}

/// Parse an ARC `.lis` block trace
pub fn parse_arc<R: BufRead>(reader: R) -> Result<Trace, TraceError> {
    let mut tokens = Tokens::new(reader);
    let mut keys = Vec::new();
    let mut records = 0;

    while let Some([start, length, _, _]) = tokens.record::<4>()? {
        let parsed = parse_field::<u64>(&start, "start block")
            .and_then(|first| parse_field::<u64>(&length, "length").map(|count| (first, count)));
        let (first, count) = match parsed {
            Ok(range) => range,
            Err(err) => {
                end_of_trace(err, records)?;
                break;
            }
        };
        records += 1;
        keys.extend(first..first.saturating_add(count));
    }

    Ok(Trace::from_keys(keys))
}

/// Parse a `- key` list
pub fn parse_dash<R: BufRead>(reader: R) -> Result<Trace, TraceError> {
    let mut tokens = Tokens::new(reader);
    let mut keys = Vec::new();

    while let Some([_, key]) = tokens.record::<2>()? {
        match parse_field(&key, "key") {
            Ok(key) => keys.push(key),
            Err(err) => {
                end_of_trace(err, keys.len())?;
                break;
            }
        }
    }

    Ok(Trace::from_keys(keys))
}

/// Parse a trace in the given format
pub fn parse<R: BufRead>(reader: R, format: TraceFormat) -> Result<Trace, TraceError> {
    match format {
        TraceFormat::Wiki => parse_wiki(reader),
        TraceFormat::Arc => parse_arc(reader),
        TraceFormat::Dash => parse_dash(reader),
    }
}

/// Load one trace file, detecting its format unless one is given
pub fn load(path: &Path, format: Option<TraceFormat>) -> Result<Trace, TraceError> {
    let format = format.unwrap_or_else(|| TraceFormat::detect(path));
    // 1MB buffer, traces are read once front to back
    let reader = BufReader::with_capacity(1024 * 1024, File::open(path)?);
    parse(reader, format)
}

/// Files matched by a glob pattern, sorted by path
pub fn matching_files(pattern: &str) -> Result<Vec<PathBuf>, TraceError> {
    let paths = glob::glob(pattern).map_err(|err| TraceError::Pattern(err.to_string()))?;
    let mut files = Vec::new();
    for entry in paths {
        let path = entry.map_err(|err| TraceError::Io(err.into_error()))?;
        if path.is_file() {
            files.push(path);
        }
    }
    if files.is_empty() {
        return Err(TraceError::Pattern(format!("'{pattern}' matched no files")));
    }
    files.sort();
    Ok(files)
}

/// Load and concatenate every file matched by `pattern`, reporting each
/// file on stdout
pub fn load_pattern(pattern: &str, format: Option<TraceFormat>) -> Result<Trace, TraceError> {
    load_pattern_to(pattern, format, &mut io::stdout())
}

/// Like [`load_pattern`], with the per-file lines written to `progress`
pub fn load_pattern_to(
    pattern: &str,
    format: Option<TraceFormat>,
    progress: &mut dyn Write,
) -> Result<Trace, TraceError> {
    let mut trace = Trace::default();
    for path in matching_files(pattern)? {
        let part = load(&path, format)?;
        writeln!(progress, "  Loaded {} requests from {}", part.len(), path.display())?;
        trace.extend(part);
    }
    Ok(trace)
}
