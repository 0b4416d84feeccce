//! Line-feed delimited record reading.

use std::io::{self, BufRead};

/// Buffer size used for segment and stream readers.
pub const READ_BUFFER_SIZE: usize = 16 * 1024;

/// Hands out the line-feed delimited records of a byte range.
///
/// Records that sit entirely inside the reader's buffer are handed out in
/// place. A record longer than the buffer is detected when the buffered
/// window holds no line feed; the window is copied aside and the rest of the
/// record is read with an unbounded `read_until`, so long records are never
/// truncated.
///
/// The reader never hands out bytes beyond `limit`. Records are passed to the
/// callback without their trailing line feed.
pub struct RecordReader<R> {
    inner: R,
    limit: u64,
    consumed: u64,
    overflow: Vec<u8>,
}

impl<R: BufRead> RecordReader<R> {
    /// Reads records until end of input.
    pub fn new(inner: R) -> Self {
        Self::with_limit(inner, u64::MAX)
    }

    /// Reads records from the next `limit` bytes of `inner`.
    ///
    /// `limit` must fall on a record boundary (or end of input).
    pub fn with_limit(inner: R, limit: u64) -> Self {
        Self {
            inner,
            limit,
            consumed: 0,
            overflow: Vec::new(),
        }
    }

    /// Bytes consumed so far, line feeds included.
    pub fn consumed(&self) -> u64 {
        self.consumed
    }

    /// Passes the next record to `f`. Returns `Ok(false)` once the range is
    /// exhausted.
    pub fn next_record<F>(&mut self, f: F) -> io::Result<bool>
    where
        F: FnOnce(&[u8]),
    {
        let remaining = self.limit.saturating_sub(self.consumed);
        if remaining == 0 {
            return Ok(false);
        }

        let available = self.inner.fill_buf()?;
        if available.is_empty() {
            return Ok(false);
        }
        let window = &available[..available.len().min(clamp(remaining))];

        if let Some(newline) = window.iter().position(|&b| b == b'\n') {
            f(&window[..newline]);
            self.advance(newline + 1);
            return Ok(true);
        }

        if (window.len() as u64) == remaining {
            // last record of the range has no line feed
            let len = window.len();
            f(window);
            self.advance(len);
            return Ok(true);
        }

        // buffer exhausted mid-record
        self.overflow.clear();
        self.overflow.extend_from_slice(window);
        let len = window.len();
        self.advance(len);
        let rest = self.inner.read_until(b'\n', &mut self.overflow)?;
        self.consumed += rest as u64;

        let record = self.overflow.strip_suffix(b"\n").unwrap_or(&self.overflow[..]);
        f(record);
        Ok(true)
    }

    /// Calls `f` for every remaining record.
    pub fn for_each<F>(&mut self, mut f: F) -> io::Result<()>
    where
        F: FnMut(&[u8]),
    {
        while self.next_record(&mut f)? {}
        Ok(())
    }

    fn advance(&mut self, n: usize) {
        self.inner.consume(n);
        self.consumed += n as u64;
    }
}

fn clamp(n: u64) -> usize {
    usize::try_from(n).unwrap_or(usize::MAX)
}
