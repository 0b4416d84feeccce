//! Scan statistics.

/// Record counts for one scan, one segment or one stream.
///
/// Each worker owns its own copy; the collecting thread sums them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ScanStats {
    /// Records read.
    pub records: u64,
    /// Records rejected by the filter chain.
    pub rejected: u64,
    /// Records skipped because no key could be extracted.
    pub key_errors: u64,
    /// Records whose key was counted.
    pub counted: u64,
}

impl ScanStats {
    /// Creates zeroed statistics.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds another worker's statistics into these.
    pub fn merge(&mut self, other: &ScanStats) {
        self.records += other.records;
        self.rejected += other.rejected;
        self.key_errors += other.key_errors;
        self.counted += other.counted;
    }
}
