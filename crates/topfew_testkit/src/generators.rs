//! Property-based test generators.
//!
//! Strategies for key sequences and log file contents.

use proptest::prelude::*;

/// Generates a short key from a small alphabet, so sequences repeat keys
/// often enough to produce ties and evictions.
pub fn key_strategy() -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(prop::sample::select(b"abcde".to_vec()), 1..=3)
}

/// Generates a sequence of keys.
pub fn key_sequence_strategy(max_len: usize) -> impl Strategy<Value = Vec<Vec<u8>>> {
    prop::collection::vec(key_strategy(), 0..=max_len)
}

/// Generates a key sequence and a split point within it.
pub fn split_sequence_strategy(max_len: usize) -> impl Strategy<Value = (Vec<Vec<u8>>, usize)> {
    key_sequence_strategy(max_len).prop_flat_map(|keys| {
        let len = keys.len();
        (Just(keys), 0..=len)
    })
}

/// Generates a printable line without a line feed, sometimes empty and
/// sometimes long.
pub fn line_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        4 => "[a-e ]{0,12}",
        1 => "[a-z]{0,400}",
    ]
}

/// Generates log file contents: lines joined by line feeds, with or without
/// a final line feed.
pub fn log_contents_strategy(max_lines: usize) -> impl Strategy<Value = Vec<u8>> {
    (
        prop::collection::vec(line_strategy(), 0..=max_lines),
        any::<bool>(),
    )
        .prop_map(|(lines, trailing)| {
            let mut contents = lines.join("\n");
            if trailing && !lines.is_empty() {
                contents.push('\n');
            }
            contents.into_bytes()
        })
}

/// Case and shrink budgets for property tests.
#[derive(Debug, Clone)]
pub struct PropTestConfig {
    /// Number of test cases to run.
    pub cases: u32,
    /// Maximum shrink iterations.
    pub max_shrink_iters: u32,
}

impl Default for PropTestConfig {
    fn default() -> Self {
        Self {
            cases: 256,
            max_shrink_iters: 1000,
        }
    }
}

impl PropTestConfig {
    /// Creates a configuration for quick tests.
    #[must_use]
    pub fn quick() -> Self {
        Self {
            cases: 32,
            max_shrink_iters: 100,
        }
    }

    /// Creates a configuration for property tests that write a temporary log
    /// per case, such as the segment tiling and segmented-scan equivalence
    /// properties in `tests/equivalence.rs`.
    #[must_use]
    pub fn io() -> Self {
        Self {
            cases: 64,
            max_shrink_iters: 200,
        }
    }

    /// Converts to proptest config.
    #[must_use]
    pub fn to_proptest_config(&self) -> ProptestConfig {
        ProptestConfig {
            cases: self.cases,
            max_shrink_iters: self.max_shrink_iters,
            ..ProptestConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    proptest! {
        #![proptest_config(PropTestConfig::quick().to_proptest_config())]

        #[test]
        fn keys_use_small_alphabet(key in key_strategy()) {
            prop_assert!(!key.is_empty() && key.len() <= 3);
            prop_assert!(key.iter().all(|b| b"abcde".contains(b)));
        }

        #[test]
        fn split_point_in_range((keys, split) in split_sequence_strategy(50)) {
            prop_assert!(split <= keys.len());
        }

        #[test]
        fn lines_have_no_line_feed(line in line_strategy()) {
            prop_assert!(!line.contains('\n'));
        }
    }
}
