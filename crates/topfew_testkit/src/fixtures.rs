//! Test fixtures and log helpers.
//!
//! Provides temporary log files, synthetic access-log lines and an exact
//! reference count to check top lists against.

use std::collections::HashMap;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;
use topfew_core::{KeyCount, KeySource};

/// A log file on disk, removed when dropped.
pub struct TestLog {
    file: NamedTempFile,
    contents: Vec<u8>,
}

impl TestLog {
    /// Writes `contents` to a new temporary file.
    pub fn new(contents: impl Into<Vec<u8>>) -> Self {
        let contents = contents.into();
        let mut file = NamedTempFile::new().expect("Failed to create temp file");
        file.write_all(&contents).expect("Failed to write log");
        file.flush().expect("Failed to flush log");
        Self { file, contents }
    }

    /// Writes each line followed by a line feed.
    pub fn with_lines<S: AsRef<str>>(lines: &[S]) -> Self {
        let mut contents = String::new();
        for line in lines {
            contents.push_str(line.as_ref());
            contents.push('\n');
        }
        Self::new(contents)
    }

    /// Path of the file.
    pub fn path(&self) -> &Path {
        self.file.path()
    }

    /// What was written.
    pub fn contents(&self) -> &[u8] {
        &self.contents
    }

    /// File size in bytes.
    pub fn len(&self) -> u64 {
        self.contents.len() as u64
    }

    /// Whether the file is empty.
    pub fn is_empty(&self) -> bool {
        self.contents.is_empty()
    }
}

const PATHS: [&str; 8] = [
    "/ongoing/ongoing.atom",
    "/ongoing/When/202x/2026/10/12/Topfew",
    "/ongoing/serif.css",
    "/favicon.ico",
    "/ongoing/picInfo.xml?o=https://www.tbray.org/ongoing/",
    "/robots.txt",
    "/ongoing/",
    "/ongoing/When/201x/2019/02/24/Topfew-Rust",
];

const AGENTS: [&str; 4] = [
    "Mozilla/5.0 (X11; Linux x86_64) Gecko/20100101 Firefox/131.0",
    "NetNewsWire (RSS Reader; https://netnewswire.com/)",
    "Googlebot/2.1 (+http://www.google.com/bot.html)",
    "curl/8.4.0",
];

/// One combined-format access log line, deterministic in `i`.
///
/// Whitespace fields: 0 is the client address, 6 the path, 8 the status.
/// With quoted fields, 5 is the whole request line and 9 the user agent.
pub fn access_log_line(i: usize) -> String {
    // skew the paths so the top entries are well separated
    let path = PATHS[(i * i) % 7 % PATHS.len()];
    let status = if i % 13 == 0 { 404 } else { 200 };
    format!(
        "192.168.{}.{} - - [12/Oct/2026:10:{:02}:{:02} -0700] \"GET {} HTTP/1.1\" {} {} \"-\" \"{}\"",
        i % 4,
        (i * 31) % 97,
        (i / 60) % 60,
        i % 60,
        path,
        status,
        1000 + (i * 17) % 5000,
        AGENTS[i % AGENTS.len()],
    )
}

/// `count` access log lines.
pub fn access_log(count: usize) -> Vec<String> {
    (0..count).map(access_log_line).collect()
}

/// Exact key counts of `contents`, computed without the counter.
///
/// Records without a key are skipped, as the scans do.
pub fn reference_counts<K: KeySource>(contents: &[u8], keys: &K) -> HashMap<Vec<u8>, u64> {
    let mut counts = HashMap::new();
    let mut scratch = Vec::new();
    if contents.is_empty() {
        return counts;
    }
    let body = contents.strip_suffix(b"\n").unwrap_or(contents);
    for record in body.split(|&b| b == b'\n') {
        if let Ok(key) = keys.extract_key(record, &mut scratch) {
            *counts.entry(key.to_vec()).or_insert(0) += 1;
        }
    }
    counts
}

/// Asserts that `top` is a correct top-`n` list for `expected`.
///
/// Counts must be descending, each reported count exact, and the list must
/// hold every key whose count beats the cut-off. Keys tied at the cut-off
/// may be any of the tied ones.
pub fn assert_exact_top(top: &[KeyCount], expected: &HashMap<Vec<u8>, u64>, n: usize) {
    let mut counts: Vec<u64> = expected.values().copied().collect();
    counts.sort_unstable_by(|a, b| b.cmp(a));
    counts.truncate(n);

    let got: Vec<u64> = top.iter().map(|kc| kc.count).collect();
    assert_eq!(got, counts, "top counts differ");

    for kc in top {
        assert_eq!(
            expected.get(&*kc.key).copied(),
            Some(kc.count),
            "wrong count for {:?}",
            kc.key_lossy()
        );
    }

    if let Some(&cutoff) = counts.last() {
        for (key, &count) in expected {
            if count > cutoff {
                assert!(
                    top.iter().any(|kc| *kc.key == **key),
                    "{:?} ({count}) missing from top list",
                    String::from_utf8_lossy(key)
                );
            }
        }
    }
}

/// The top list as `(key, count)` pairs, sorted by key so ties compare
/// equal regardless of order.
pub fn as_sorted_pairs(top: &[KeyCount]) -> Vec<(String, u64)> {
    let mut pairs: Vec<(String, u64)> = top
        .iter()
        .map(|kc| (kc.key_lossy().into_owned(), kc.count))
        .collect();
    pairs.sort();
    pairs
}

#[cfg(test)]
mod tests {
    use super::*;
    use topfew_core::KeyFinder;

    #[test]
    fn test_log_roundtrip() {
        let log = TestLog::with_lines(&["a", "b"]);
        assert_eq!(log.contents(), b"a\nb\n");
        assert_eq!(std::fs::read(log.path()).unwrap(), b"a\nb\n");
        assert_eq!(log.len(), 4);
    }

    #[test]
    fn access_lines_have_expected_fields() {
        let line = access_log_line(0);
        let mut scratch = Vec::new();

        let keys = KeyFinder::fields(vec![6]);
        let path = keys.extract_key(line.as_bytes(), &mut scratch).unwrap().to_vec();
        assert!(path.starts_with(b"/"));

        let quoted = KeyFinder::quoted_fields(vec![5]);
        let request = quoted.extract_key(line.as_bytes(), &mut scratch).unwrap();
        assert!(request.starts_with(b"GET /"));
        assert!(request.ends_with(b"HTTP/1.1"));
    }

    #[test]
    fn reference_skips_keyless_records() {
        let counts = reference_counts(b"a b\nc\na b\n", &KeyFinder::fields(vec![1]));
        assert_eq!(counts.len(), 1);
        assert_eq!(counts.get(&b"b"[..]), Some(&2));
    }
}
