//! Reading one segment into a local tally.

use super::Segment;
use crate::error::{TopfewError, TopfewResult};
use crate::filter::RecordFilter;
use crate::keys::KeySource;
use crate::pipeline::RecordPipeline;
use crate::record::{RecordReader, READ_BUFFER_SIZE};
use crate::stats::ScanStats;
use crate::tally::LocalTally;
use std::io::{self, BufReader};
use std::sync::atomic::{AtomicBool, Ordering};

/// What a segment worker sends back on success.
#[derive(Debug)]
pub struct SegmentReport {
    /// Segment start offset.
    pub start: u64,
    /// Segment end offset.
    pub end: u64,
    /// Key counts for this segment.
    pub tally: LocalTally,
    /// Record statistics for this segment.
    pub stats: ScanStats,
}

/// Reads every record of `segment` into a fresh [`LocalTally`].
///
/// Records rejected by `filter` or without an extractable key are skipped.
/// An I/O error, or the file ending before the segment does, fails the whole
/// segment. Between records the worker checks `abort` and stops early once
/// it is raised; the collector discards anything sent after that.
pub fn read_segment<K, F>(
    segment: Segment,
    keys: &K,
    filter: &F,
    abort: &AtomicBool,
) -> TopfewResult<SegmentReport>
where
    K: KeySource,
    F: RecordFilter,
{
    let (start, end, file) = segment.into_parts();
    let len = end - start;
    let read_err = |source| TopfewError::SegmentRead { start, end, source };

    let mut records =
        RecordReader::with_limit(BufReader::with_capacity(READ_BUFFER_SIZE, file), len);
    let mut pipeline = RecordPipeline::new(keys, filter);
    let mut tally = LocalTally::new();

    loop {
        if abort.load(Ordering::Relaxed) {
            break;
        }
        let more = records
            .next_record(|record| pipeline.feed(record, |key| tally.add(key)))
            .map_err(read_err)?;
        if !more {
            if records.consumed() < len {
                return Err(read_err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    format!(
                        "file ended {} bytes into a {len}-byte segment",
                        records.consumed()
                    ),
                )));
            }
            break;
        }
    }

    Ok(SegmentReport {
        start,
        end,
        tally,
        stats: pipeline.stats(),
    })
}
