//! Segment-private key counts.

use std::collections::hash_map;
use std::collections::HashMap;

/// A plain key → count map owned by one segment worker.
///
/// A tally is produced once per segment, handed to the collecting thread by
/// value and merged into the [`Counter`](crate::Counter) exactly once.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LocalTally {
    counts: HashMap<Vec<u8>, u64>,
}

impl LocalTally {
    /// Creates an empty tally.
    pub fn new() -> Self {
        Self {
            counts: HashMap::with_capacity(1024),
        }
    }

    /// Records one occurrence of `key`.
    pub fn add(&mut self, key: &[u8]) {
        self.add_count(key, 1);
    }

    /// Records `n` occurrences of `key`.
    pub fn add_count(&mut self, key: &[u8], n: u64) {
        // only allocate the owned key the first time it shows up
        match self.counts.get_mut(key) {
            Some(count) => *count += n,
            None => {
                self.counts.insert(key.to_vec(), n);
            }
        }
    }

    /// Returns the count recorded for `key`, if any.
    pub fn get(&self, key: &[u8]) -> Option<u64> {
        self.counts.get(key).copied()
    }

    /// Number of distinct keys.
    pub fn len(&self) -> usize {
        self.counts.len()
    }

    /// Whether no key has been recorded.
    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Sum of all counts.
    pub fn total(&self) -> u64 {
        self.counts.values().sum()
    }

    /// Iterates over `(key, count)` pairs in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = (&[u8], u64)> {
        self.counts.iter().map(|(k, &c)| (k.as_slice(), c))
    }
}

impl IntoIterator for LocalTally {
    type Item = (Vec<u8>, u64);
    type IntoIter = hash_map::IntoIter<Vec<u8>, u64>;

    fn into_iter(self) -> Self::IntoIter {
        self.counts.into_iter()
    }
}

impl<K: AsRef<[u8]>> FromIterator<(K, u64)> for LocalTally {
    fn from_iter<I: IntoIterator<Item = (K, u64)>>(iter: I) -> Self {
        let mut tally = Self::new();
        for (key, n) in iter {
            tally.add_count(key.as_ref(), n);
        }
        tally
    }
}
