//! Choosing and running a scan.
//!
//! [`run`] picks one of three modes from the configuration:
//!
//! - **diagnostic sample**: standard input is traced record by record, and
//!   nothing is counted
//! - **segmented file scan**: a named regular file is read concurrently in
//!   line-aligned segments
//! - **streaming scan**: anything else (standard input, pipes, devices) is
//!   read sequentially on the calling thread

use crate::config::Config;
use crate::counter::{Counter, KeyCount};
use crate::error::{TopfewError, TopfewResult};
use crate::filter::{Filters, RecordFilter};
use crate::keys::KeySource;
use crate::pipeline::RecordPipeline;
use crate::record::{RecordReader, READ_BUFFER_SIZE};
use crate::segment::read_file_in_segments;
use crate::stats::ScanStats;
use std::fs::File;
use std::io::{self, BufReader, Read, Write};
use tracing::debug;

/// Which kind of scan a run performed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Sequential read of a stream.
    StreamingScan,
    /// Per-record trace written to the output; nothing counted.
    DiagnosticSample,
    /// Concurrent read of a named file in segments.
    SegmentedFileScan,
}

/// Outcome of [`run`].
#[derive(Debug, Clone)]
pub struct Report {
    /// The mode that ran.
    pub mode: Mode,
    /// Top keys in descending count order. Empty in sample mode.
    pub top: Vec<KeyCount>,
    /// Record statistics.
    pub stats: ScanStats,
}

/// Runs topfew as configured.
///
/// `input` is read only when the configuration names no file. `out`
/// receives the diagnostic sample; in the counting modes the caller formats
/// [`Report::top`] itself (see [`write_top`]).
pub fn run<R, W>(config: &Config, input: R, out: &mut W) -> TopfewResult<Report>
where
    R: Read,
    W: Write,
{
    config.validate()?;
    let keys = config.key_finder();

    if config.sample {
        let stats = sample(input, &config.filters, &keys, out)?;
        return Ok(Report {
            mode: Mode::DiagnosticSample,
            top: Vec::new(),
            stats,
        });
    }

    let mut counter = Counter::new(config.size);
    let (mode, stats) = match &config.path {
        Some(path) => {
            let metadata = std::fs::metadata(path).map_err(|e| TopfewError::open(path, e))?;
            if metadata.is_file() {
                let stats =
                    read_file_in_segments(path, &config.filters, &keys, &mut counter, config.width)?;
                (Mode::SegmentedFileScan, stats)
            } else {
                // pipes and devices can't be seeked into segments
                debug!(path = %path.display(), "not a regular file, streaming it");
                let file = File::open(path).map_err(|e| TopfewError::open(path, e))?;
                let stats = from_stream(file, &config.filters, &keys, &mut counter)?;
                (Mode::StreamingScan, stats)
            }
        }
        None => {
            let stats = from_stream(input, &config.filters, &keys, &mut counter)?;
            (Mode::StreamingScan, stats)
        }
    };

    Ok(Report {
        mode,
        top: counter.get_top(),
        stats,
    })
}

/// Reads `input` sequentially, adding every key to `counter`.
///
/// Records that are filtered out or have no extractable key are skipped; a
/// read error ends the scan.
pub fn from_stream<R, K, F>(
    input: R,
    filter: &F,
    keys: &K,
    counter: &mut Counter,
) -> TopfewResult<ScanStats>
where
    R: Read,
    K: KeySource,
    F: RecordFilter,
{
    let mut records = RecordReader::new(BufReader::with_capacity(READ_BUFFER_SIZE, input));
    let mut pipeline = RecordPipeline::new(keys, filter);
    records.for_each(|record| pipeline.feed(record, |key| counter.add(key)))?;

    let stats = pipeline.stats();
    debug!(
        records = stats.records,
        counted = stats.counted,
        distinct = counter.distinct_keys(),
        "stream scan done"
    );
    Ok(stats)
}

/// Counts the keys of `input` and returns the top `size` of them.
pub fn count_stream<R, K, F>(
    input: R,
    filter: &F,
    keys: &K,
    size: usize,
) -> TopfewResult<Vec<KeyCount>>
where
    R: Read,
    K: KeySource,
    F: RecordFilter,
{
    let mut counter = Counter::new(size);
    from_stream(input, filter, keys, &mut counter)?;
    Ok(counter.get_top())
}

/// Writes a trace of how each record of `input` is filtered and keyed.
///
/// The sed stages are listed first. Then, per record, `ACCEPT` or `REJECT`,
/// and for accepted records either the key as-is or the key before and after
/// the sed stages. A record with no extractable key is reported and the
/// trace goes on.
pub fn sample<R, K, W>(
    input: R,
    filters: &Filters,
    keys: &K,
    out: &mut W,
) -> TopfewResult<ScanStats>
where
    R: Read,
    K: KeySource,
    W: Write,
{
    for (i, sed) in filters.seds().iter().enumerate() {
        writeln!(
            out,
            "SED {i}: s/{}/{}/",
            sed.pattern.as_str(),
            String::from_utf8_lossy(&sed.replacement)
        )?;
    }

    let mut records = RecordReader::new(BufReader::with_capacity(READ_BUFFER_SIZE, input));
    let mut scratch = Vec::new();
    let mut stats = ScanStats::new();
    loop {
        let mut written = Ok(());
        let more = records.next_record(|record| {
            written = sample_record(record, filters, keys, &mut scratch, &mut stats, &mut *out);
        })?;
        written?;
        if !more {
            break;
        }
    }
    Ok(stats)
}

fn sample_record<K, W>(
    record: &[u8],
    filters: &Filters,
    keys: &K,
    scratch: &mut Vec<u8>,
    stats: &mut ScanStats,
    out: &mut W,
) -> io::Result<()>
where
    K: KeySource,
    W: Write,
{
    stats.records += 1;
    if !filters.accept(record) {
        stats.rejected += 1;
        return write_line(out, "   REJECT: ", record);
    }
    write_line(out, "   ACCEPT: ", record)?;

    let key = match keys.extract_key(record, scratch) {
        Ok(key) => key,
        Err(err) => {
            stats.key_errors += 1;
            return writeln!(out, " KEY ERR: {err}");
        }
    };
    stats.counted += 1;

    let filtered = filters.rewrite(key);
    if *filtered == *key {
        write_line(out, "KEY AS IS: ", &filtered)
    } else {
        write_line(out, "   KEY IN: ", key)?;
        write_line(out, " FILTERED: ", &filtered)
    }
}

fn write_line<W: Write>(out: &mut W, label: &str, bytes: &[u8]) -> io::Result<()> {
    out.write_all(label.as_bytes())?;
    out.write_all(bytes)?;
    out.write_all(b"\n")
}

/// Writes `top` as `<count> <key>` lines.
pub fn write_top<W: Write>(top: &[KeyCount], out: &mut W) -> io::Result<()> {
    for kc in top {
        write!(out, "{} ", kc.count)?;
        out.write_all(&kc.key)?;
        out.write_all(b"\n")?;
    }
    Ok(())
}
