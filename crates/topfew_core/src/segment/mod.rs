//! Line-aligned file segments.
//!
//! A named file is cut into byte ranges that are read concurrently, one
//! worker per range. This module provides:
//!
//! - [`Segment`]: one range and the read handle that belongs to it
//! - [`plan_segments`]: cuts a file into segments
//! - [`read_file_in_segments`]: reads every segment concurrently and merges
//!   the results into one [`Counter`](crate::Counter)
//!
//! ## Invariants
//!
//! - A segment starts at offset 0 or right after a line feed
//! - A segment ends right after a line feed or at end of file
//! - Segments tile the file: no gaps, no overlaps
//! - Every segment has its own file handle; handles are never shared

mod reader;
mod segmenter;

pub use reader::{read_segment, SegmentReport};
pub use segmenter::read_file_in_segments;

use crate::error::{TopfewError, TopfewResult};
use std::fs::File;
use std::io::{self, BufRead, BufReader, Seek, SeekFrom};
use std::path::Path;
use tracing::debug;

/// A line-aligned byte range `[start, end)` of a file, with its own handle
/// positioned at `start`.
#[derive(Debug)]
pub struct Segment {
    start: u64,
    end: u64,
    file: File,
}

impl Segment {
    /// Opens a segment that starts at `start`, which must already be on a
    /// record boundary, and ends at the first record boundary at or after
    /// `nominal_end` (or at `file_size`).
    pub fn open(path: &Path, start: u64, nominal_end: u64, file_size: u64) -> TopfewResult<Self> {
        let mut file = File::open(path).map_err(|e| TopfewError::open(path, e))?;

        let end = if nominal_end >= file_size {
            file_size
        } else {
            align_end(&mut file, start, nominal_end)?
        };

        seek_exact(&mut file, start, (start, end))?;

        Ok(Self { start, end, file })
    }

    /// First byte of the segment.
    pub fn start(&self) -> u64 {
        self.start
    }

    /// One past the last byte of the segment.
    pub fn end(&self) -> u64 {
        self.end
    }

    /// Length in bytes.
    pub fn len(&self) -> u64 {
        self.end - self.start
    }

    /// Whether the segment covers no bytes.
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    pub(crate) fn into_parts(self) -> (u64, u64, File) {
        (self.start, self.end, self.file)
    }
}

/// Cuts the file at `path` into about `count` line-aligned segments.
///
/// Each segment's nominal size is `file_size / count`; its end is pushed
/// forward to the next record boundary, so there may be fewer segments than
/// asked for. An empty file yields no segments.
pub fn plan_segments(path: &Path, count: usize) -> TopfewResult<Vec<Segment>> {
    let file_size = std::fs::metadata(path)
        .map_err(|e| TopfewError::open(path, e))?
        .len();
    let target = (file_size / count.max(1) as u64).max(1);

    let mut segments = Vec::new();
    let mut base = 0u64;
    while base < file_size {
        let segment = Segment::open(path, base, base + target, file_size)?;
        base = segment.end;
        segments.push(segment);
    }

    debug!(
        path = %path.display(),
        file_size,
        requested = count,
        segments = segments.len(),
        target,
        "planned segments"
    );
    Ok(segments)
}

/// Finds the first record boundary at or after `nominal_end`.
///
/// Reads from the byte just before `nominal_end` up to and including the
/// next line feed; if that byte is itself a line feed, `nominal_end` is
/// already aligned.
fn align_end(file: &mut File, start: u64, nominal_end: u64) -> TopfewResult<u64> {
    let probe = nominal_end - 1;
    seek_exact(file, probe, (start, nominal_end))?;

    let mut reader = BufReader::new(&mut *file);
    let skipped =
        skip_past_newline(&mut reader).map_err(|source| TopfewError::SegmentRead {
            start,
            end: nominal_end,
            source,
        })?;
    Ok(probe + skipped)
}

/// Seeks to `target`, failing if the seek lands anywhere else. `range` is
/// the segment being set up, for error reporting.
fn seek_exact(file: &mut File, target: u64, range: (u64, u64)) -> TopfewResult<()> {
    let reached = file
        .seek(SeekFrom::Start(target))
        .map_err(|source| TopfewError::SegmentRead {
            start: range.0,
            end: range.1,
            source,
        })?;
    if reached != target {
        return Err(TopfewError::SeekMismatch { target, reached });
    }
    Ok(())
}

/// Consumes bytes through the next line feed; returns how many were
/// consumed. Stops at end of input if there is no line feed.
fn skip_past_newline<R: BufRead>(reader: &mut R) -> io::Result<u64> {
    let mut skipped = 0u64;
    loop {
        let buf = reader.fill_buf()?;
        if buf.is_empty() {
            return Ok(skipped);
        }
        if let Some(i) = buf.iter().position(|&b| b == b'\n') {
            reader.consume(i + 1);
            return Ok(skipped + i as u64 + 1);
        }
        let n = buf.len();
        reader.consume(n);
        skipped += n as u64;
    }
}
