//! The per-record steps shared by segment workers and the stream path:
//! filter, extract, rewrite, count.

use crate::filter::RecordFilter;
use crate::keys::KeySource;
use crate::stats::ScanStats;
use tracing::warn;

/// Applies the filter chain and key source to records, one at a time.
///
/// Owns the key scratch buffer, so each worker needs its own pipeline.
pub(crate) struct RecordPipeline<'a, K, F> {
    keys: &'a K,
    filter: &'a F,
    scratch: Vec<u8>,
    stats: ScanStats,
}

impl<'a, K: KeySource, F: RecordFilter> RecordPipeline<'a, K, F> {
    pub(crate) fn new(keys: &'a K, filter: &'a F) -> Self {
        Self {
            keys,
            filter,
            scratch: Vec::with_capacity(128),
            stats: ScanStats::new(),
        }
    }

    /// Runs one record through the pipeline, handing the final key to
    /// `count`. Rejected records and records without a key are skipped.
    pub(crate) fn feed<C>(&mut self, record: &[u8], count: C)
    where
        C: FnOnce(&[u8]),
    {
        self.stats.records += 1;
        if !self.filter.accept(record) {
            self.stats.rejected += 1;
            return;
        }

        match self.keys.extract_key(record, &mut self.scratch) {
            Ok(key) => {
                let key = self.filter.rewrite(key);
                count(&key);
                self.stats.counted += 1;
            }
            Err(err) => {
                self.stats.key_errors += 1;
                warn!(
                    record = %String::from_utf8_lossy(record),
                    error = %err,
                    "can't extract key"
                );
            }
        }
    }

    pub(crate) fn stats(&self) -> ScanStats {
        self.stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::Filters;
    use crate::keys::KeyFinder;

    #[test]
    fn counts_rejects_and_key_errors() {
        let keys = KeyFinder::fields(vec![1]);
        let mut filters = Filters::new();
        filters.add_vgrep("^#").unwrap();
        filters.add_sed("x", "y").unwrap();

        let mut pipeline = RecordPipeline::new(&keys, &filters);
        let mut counted = Vec::new();
        for record in ["a x1", "# b x2", "lonely", "c x3"] {
            pipeline.feed(record.as_bytes(), |k| counted.push(k.to_vec()));
        }

        assert_eq!(counted, vec![b"y1".to_vec(), b"y3".to_vec()]);
        assert_eq!(
            pipeline.stats(),
            ScanStats {
                records: 4,
                rejected: 1,
                key_errors: 1,
                counted: 2,
            }
        );
    }
}
