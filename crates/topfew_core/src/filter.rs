//! Record filtering and key rewriting.

use crate::error::TopfewResult;
use regex::bytes::Regex;
use std::borrow::Cow;

/// Decides which records are counted and how their keys are rewritten.
pub trait RecordFilter: Sync {
    /// Whether `record` should be counted.
    fn accept(&self, record: &[u8]) -> bool;

    /// Rewrites an extracted key. Returns the key unchanged (borrowed) when
    /// there is nothing to do.
    fn rewrite<'a>(&self, key: &'a [u8]) -> Cow<'a, [u8]>;
}

/// A sed(1)-style `s/pattern/replacement/g` applied to keys.
#[derive(Debug, Clone)]
pub struct Sed {
    /// What to replace.
    pub pattern: Regex,
    /// Replacement; `$1` and `${name}` refer to capture groups.
    pub replacement: Vec<u8>,
}

/// grep, grep -v and sed stages, each applied in the order supplied.
#[derive(Debug, Clone, Default)]
pub struct Filters {
    greps: Vec<Regex>,
    vgreps: Vec<Regex>,
    seds: Vec<Sed>,
}

impl Filters {
    /// Creates a filter chain that accepts everything and rewrites nothing.
    pub fn new() -> Self {
        Self::default()
    }

    /// Only records matching `pattern` are counted.
    pub fn add_grep(&mut self, pattern: &str) -> TopfewResult<()> {
        self.greps.push(Regex::new(pattern)?);
        Ok(())
    }

    /// Records matching `pattern` are discarded.
    pub fn add_vgrep(&mut self, pattern: &str) -> TopfewResult<()> {
        self.vgreps.push(Regex::new(pattern)?);
        Ok(())
    }

    /// Replaces every match of `pattern` in the key with `replacement`.
    pub fn add_sed(&mut self, pattern: &str, replacement: &str) -> TopfewResult<()> {
        self.seds.push(Sed {
            pattern: Regex::new(pattern)?,
            replacement: replacement.as_bytes().to_vec(),
        });
        Ok(())
    }

    /// The sed stages, in application order.
    pub fn seds(&self) -> &[Sed] {
        &self.seds
    }

    /// Whether this chain neither rejects nor rewrites anything.
    pub fn is_empty(&self) -> bool {
        self.greps.is_empty() && self.vgreps.is_empty() && self.seds.is_empty()
    }
}

impl RecordFilter for Filters {
    fn accept(&self, record: &[u8]) -> bool {
        self.greps.iter().all(|re| re.is_match(record))
            && !self.vgreps.iter().any(|re| re.is_match(record))
    }

    fn rewrite<'a>(&self, key: &'a [u8]) -> Cow<'a, [u8]> {
        let mut key = Cow::Borrowed(key);
        for sed in &self.seds {
            let replaced = match sed.pattern.replace_all(&key, sed.replacement.as_slice()) {
                Cow::Owned(bytes) => Some(bytes),
                Cow::Borrowed(_) => None,
            };
            if let Some(bytes) = replaced {
                key = Cow::Owned(bytes);
            }
        }
        key
    }
}
