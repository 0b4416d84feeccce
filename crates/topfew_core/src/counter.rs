//! Exact top-N counting with a bounded candidate set.
//!
//! The [`Counter`] keeps two views of the same counts:
//!
//! - the **exact tally**: every distinct key ever seen and its count, never pruned;
//! - the **candidate set**: the keys that can still finish in the top N.
//!
//! Counts live in a single arena of slots. The key index maps a key to its
//! slot and the candidate set holds slot numbers, so a candidate's count is
//! the exact tally's count and an increment is visible through both views.
//!
//! ## Invariants
//!
//! - Every key's count in the exact tally is exact
//! - The threshold never decreases
//! - A key outside the candidate set has a count no greater than the threshold
//! - The candidate set never holds more than `2 * size` slots; compaction
//!   shrinks it back to exactly `size`
//!
//! Together these make [`Counter::get_top`] equal to the exact top N over all
//! keys seen so far (up to the order of tied counts).

use crate::tally::LocalTally;
use std::borrow::Cow;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::trace;

/// A key and its occurrence count.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct KeyCount {
    /// The key bytes.
    pub key: Arc<[u8]>,
    /// Number of occurrences.
    pub count: u64,
}

impl KeyCount {
    /// The key as text, with invalid UTF-8 replaced.
    pub fn key_lossy(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.key)
    }
}

#[derive(Debug)]
struct Slot {
    key: Arc<[u8]>,
    count: u64,
    candidate: bool,
}

/// Exact top-N counter. Single writer per instance.
#[derive(Debug)]
pub struct Counter {
    /// Count storage, one slot per distinct key.
    slots: Vec<Slot>,
    /// Key → slot number.
    index: HashMap<Arc<[u8]>, usize>,
    /// Slot numbers of the keys that may reach the top N.
    candidates: Vec<usize>,
    threshold: u64,
    size: usize,
}

impl Counter {
    /// Creates an empty counter tracking the top `size` keys.
    ///
    /// # Panics
    ///
    /// Panics if `size` is zero; configuration validation rejects that
    /// before a counter is ever built.
    #[must_use]
    pub fn new(size: usize) -> Self {
        assert!(size >= 1, "counter size must be at least 1");
        Self {
            slots: Vec::with_capacity(1024),
            index: HashMap::with_capacity(1024),
            candidates: Vec::with_capacity(2 * size),
            threshold: 0,
            size,
        }
    }

    /// Adds one occurrence of `key`.
    pub fn add(&mut self, key: &[u8]) {
        let slot = self.bump(key, 1);
        self.consider(slot);
    }

    /// Adds every count from a segment's tally.
    ///
    /// Counts are added to the exact tally, never replaced, and the
    /// candidate set is maintained key by key, so compaction runs each time
    /// the set fills up rather than once at the end.
    pub fn merge(&mut self, tally: LocalTally) {
        for (key, count) in tally {
            let slot = self.bump(&key, count);
            self.consider(slot);
        }
    }

    /// Returns the top keys in descending order of count, at most `size` of
    /// them. Order among equal counts is unspecified.
    pub fn get_top(&self) -> Vec<KeyCount> {
        let mut top: Vec<KeyCount> = self
            .candidates
            .iter()
            .map(|&i| {
                let slot = &self.slots[i];
                KeyCount {
                    key: Arc::clone(&slot.key),
                    count: slot.count,
                }
            })
            .collect();
        top.sort_unstable_by(|a, b| b.count.cmp(&a.count));
        top.truncate(self.size);
        top
    }

    /// Number of top entries this counter tracks.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Current admission threshold.
    pub fn threshold(&self) -> u64 {
        self.threshold
    }

    /// Exact count for `key`, if it has been seen.
    pub fn count(&self, key: &[u8]) -> Option<u64> {
        self.index.get(key).map(|&i| self.slots[i].count)
    }

    /// Number of distinct keys in the exact tally.
    pub fn distinct_keys(&self) -> usize {
        self.slots.len()
    }

    /// Number of keys currently in the candidate set.
    pub fn candidate_count(&self) -> usize {
        self.candidates.len()
    }

    /// Adds `by` to the key's count, creating its slot if needed.
    fn bump(&mut self, key: &[u8], by: u64) -> usize {
        if let Some(&slot) = self.index.get(key) {
            self.slots[slot].count += by;
            return slot;
        }

        let slot = self.slots.len();
        let key: Arc<[u8]> = Arc::from(key);
        self.index.insert(Arc::clone(&key), slot);
        self.slots.push(Slot {
            key,
            count: by,
            candidate: false,
        });
        slot
    }

    /// Admits the slot to the candidate set if its count has reached the
    /// threshold. Runs after every increment, so no key can pass the
    /// threshold unnoticed.
    fn consider(&mut self, slot: usize) {
        let entry = &mut self.slots[slot];
        if entry.candidate || entry.count < self.threshold {
            return;
        }
        entry.candidate = true;
        self.candidates.push(slot);

        if self.candidates.len() >= 2 * self.size {
            self.compact();
        }
    }

    /// Keeps the `size` highest candidates and raises the threshold to the
    /// last one kept.
    fn compact(&mut self) {
        let slots = &self.slots;
        self.candidates
            .sort_unstable_by(|&a, &b| slots[b].count.cmp(&slots[a].count));

        for &evicted in &self.candidates[self.size..] {
            self.slots[evicted].candidate = false;
        }
        self.candidates.truncate(self.size);

        // every candidate was admitted at or above the old threshold and
        // counts only grow, so this cannot move the threshold down
        let floor = self.slots[self.candidates[self.size - 1]].count;
        debug_assert!(floor >= self.threshold);
        trace!(
            old_threshold = self.threshold,
            new_threshold = floor,
            distinct = self.slots.len(),
            "compacted candidate set"
        );
        self.threshold = floor;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn key_counts(top: &[KeyCount]) -> Vec<(String, u64)> {
        top.iter()
            .map(|kc| (kc.key_lossy().into_owned(), kc.count))
            .collect()
    }

    /// Checks `top` against a full count-and-sort of `keys`, without
    /// depending on the order of tied counts.
    fn assert_exact_top(top: &[KeyCount], keys: &[Vec<u8>], n: usize) {
        let mut exact: HashMap<&[u8], u64> = HashMap::new();
        for key in keys {
            *exact.entry(key.as_slice()).or_insert(0) += 1;
        }
        let mut want: Vec<u64> = exact.values().copied().collect();
        want.sort_unstable_by(|a, b| b.cmp(a));
        want.truncate(n);

        let got: Vec<u64> = top.iter().map(|kc| kc.count).collect();
        assert_eq!(got, want);

        let mut seen = std::collections::HashSet::new();
        for kc in top {
            assert_eq!(exact.get(&*kc.key).copied(), Some(kc.count));
            assert!(seen.insert(kc.key.clone()), "duplicate key in top list");
        }
    }

    fn table_keys() -> Vec<&'static str> {
        vec![
            "a", "b", "c", "d", "e", "f", "g", "h", //
            "a", "b", "c", "d", "e", "f", "g", //
            "a", "c", "d", "e", "f", "g", //
            "a", "c", "e", "f", "g", //
            "c", "e", "f", "g", //
            "c", "e", "g", //
            "c", "g", //
            "c",
        ]
    }

    #[test]
    fn table_add_top5() {
        let mut counter = Counter::new(5);
        for key in table_keys() {
            counter.add(key.as_bytes());
        }

        let top = counter.get_top();
        assert_eq!(
            key_counts(&top),
            vec![
                ("c".to_string(), 8),
                ("g".to_string(), 7),
                ("e".to_string(), 6),
                ("f".to_string(), 5),
                ("a".to_string(), 4),
            ]
        );
    }

    #[test]
    fn table_add_top3() {
        let mut counter = Counter::new(3);
        for key in table_keys() {
            counter.add(key.as_bytes());
        }

        assert_eq!(
            key_counts(&counter.get_top()),
            vec![
                ("c".to_string(), 8),
                ("g".to_string(), 7),
                ("e".to_string(), 6),
            ]
        );
    }

    #[test]
    fn new_counter_is_empty() {
        let counter = Counter::new(333);
        assert!(counter.get_top().is_empty());
        assert_eq!(counter.threshold(), 0);
        assert_eq!(counter.distinct_keys(), 0);
    }

    #[test]
    fn fewer_keys_than_size() {
        let mut counter = Counter::new(10);
        counter.add(b"x");
        counter.add(b"y");
        counter.add(b"x");

        let top = counter.get_top();
        assert_eq!(top.len(), 2);
        assert_eq!(top[0].count, 2);
        assert_eq!(&*top[0].key, b"x");
    }

    #[test]
    fn scenario_sequential_adds() {
        let mut counter = Counter::new(2);
        for key in ["a", "b", "a", "c", "a", "b"] {
            counter.add(key.as_bytes());
        }
        assert_eq!(
            key_counts(&counter.get_top()),
            vec![("a".to_string(), 3), ("b".to_string(), 2)]
        );
    }

    #[test]
    fn scenario_merge_two_tallies() {
        let mut counter = Counter::new(2);
        counter.merge([("x", 3), ("y", 1)].into_iter().collect());
        counter.merge([("x", 2), ("z", 5)].into_iter().collect());

        let top = counter.get_top();
        assert_eq!(top.len(), 2);
        let got: std::collections::HashSet<(String, u64)> =
            key_counts(&top).into_iter().collect();
        let want: std::collections::HashSet<(String, u64)> =
            [("z".to_string(), 5), ("x".to_string(), 5)].into_iter().collect();
        assert_eq!(got, want);
        assert_eq!(counter.count(b"y"), Some(1));
    }

    #[test]
    fn compaction_bounds_candidates_and_raises_threshold() {
        let mut counter = Counter::new(2);
        // hot keys first so compaction has something to keep
        for _ in 0..5 {
            counter.add(b"hot1");
            counter.add(b"hot2");
        }
        for i in 0..100 {
            counter.add(format!("cold{i}").as_bytes());
            assert!(counter.candidate_count() < 4);
        }

        assert_eq!(counter.threshold(), 5);
        assert_eq!(counter.distinct_keys(), 102);
        // cold keys were never admitted, but their counts are still exact
        assert_eq!(counter.count(b"cold7"), Some(1));
    }

    #[test]
    fn bulk_merge_compacts_as_it_goes() {
        let n = 3;
        let mut counter = Counter::new(n);
        counter.merge((1..=100u64).map(|i| (format!("k{i}"), i)).collect());

        assert!(counter.candidate_count() < 2 * n);
        assert!(counter.threshold() > 0);
        assert_eq!(counter.distinct_keys(), 100);
        let counts: Vec<u64> = counter.get_top().iter().map(|kc| kc.count).collect();
        assert_eq!(counts, vec![100, 99, 98]);
    }

    #[test]
    fn evicted_key_is_readmitted() {
        let mut counter = Counter::new(1);
        counter.add(b"a");
        counter.add(b"a");
        counter.add(b"b"); // candidates {a, b} -> compact, keep a, threshold 2
        assert_eq!(counter.threshold(), 2);
        assert_eq!(counter.candidate_count(), 1);

        counter.add(b"b"); // b reaches 2, re-admitted
        counter.add(b"b"); // b at 3 overtakes a
        let top = counter.get_top();
        assert_eq!(key_counts(&top), vec![("b".to_string(), 3)]);
    }

    #[test]
    fn get_top_is_idempotent() {
        let mut counter = Counter::new(3);
        for key in table_keys() {
            counter.add(key.as_bytes());
        }
        let first = counter.get_top();
        let second = counter.get_top();
        assert_eq!(first, second);
    }

    #[test]
    #[should_panic(expected = "at least 1")]
    fn zero_size_rejected() {
        let _ = Counter::new(0);
    }

    fn keys_strategy() -> impl Strategy<Value = Vec<Vec<u8>>> {
        prop::collection::vec(
            (0u16..60).prop_map(|k| format!("k{k}").into_bytes()),
            0..600,
        )
    }

    proptest! {
        #![proptest_config(ProptestConfig { cases: 64, ..ProptestConfig::default() })]

        #[test]
        fn add_matches_full_sort(keys in keys_strategy(), n in 1usize..12) {
            let mut counter = Counter::new(n);
            for key in &keys {
                counter.add(key);
            }
            assert_exact_top(&counter.get_top(), &keys, n);
        }

        #[test]
        fn merge_matches_sequential_adds(
            keys in keys_strategy(),
            n in 1usize..12,
            split in 0usize..600,
        ) {
            let split = split.min(keys.len());
            let (left, right) = keys.split_at(split);

            let mut sequential = Counter::new(n);
            for key in &keys {
                sequential.add(key);
            }

            let mut merged = Counter::new(n);
            merged.merge(left.iter().map(|k| (k, 1)).collect());
            merged.merge(right.iter().map(|k| (k, 1)).collect());

            let seq_counts: Vec<u64> = sequential.get_top().iter().map(|kc| kc.count).collect();
            let merged_counts: Vec<u64> = merged.get_top().iter().map(|kc| kc.count).collect();
            prop_assert_eq!(seq_counts, merged_counts);
            assert_exact_top(&merged.get_top(), &keys, n);
        }

        #[test]
        fn threshold_never_decreases(keys in keys_strategy(), n in 1usize..6) {
            let mut counter = Counter::new(n);
            let mut last = counter.threshold();
            for (i, key) in keys.iter().enumerate() {
                if i % 7 == 0 {
                    counter.merge([(key, 2)].into_iter().collect());
                } else {
                    counter.add(key);
                }
                prop_assert!(counter.threshold() >= last);
                prop_assert!(counter.candidate_count() < 2 * n);
                last = counter.threshold();
            }
        }
    }
}
