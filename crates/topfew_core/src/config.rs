//! Run configuration.

use crate::error::{TopfewError, TopfewResult};
use crate::filter::Filters;
use crate::keys::KeyFinder;
use regex::bytes::Regex;
use std::path::PathBuf;

/// Default number of top entries reported.
pub const DEFAULT_SIZE: usize = 10;

/// Configuration for one topfew run.
#[derive(Debug, Clone)]
pub struct Config {
    /// How many top entries to report.
    pub size: usize,

    /// 0-based field numbers making up the key, ascending. Empty means the
    /// whole record is the key.
    pub fields: Vec<usize>,

    /// Regex separating fields, instead of runs of whitespace.
    pub field_separator: Option<Regex>,

    /// Whether `"quoted strings"` count as a single field.
    pub quoted_fields: bool,

    /// grep, grep -v and sed stages.
    pub filters: Filters,

    /// Number of segments for a file scan (0 = one per available CPU).
    pub width: usize,

    /// Print a per-record trace of filtering and key extraction instead of
    /// counting.
    pub sample: bool,

    /// File to read. Standard input when absent.
    pub path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            size: DEFAULT_SIZE,
            fields: Vec::new(),
            field_separator: None,
            quoted_fields: false,
            filters: Filters::new(),
            width: 0,
            sample: false,
            path: None,
        }
    }
}

impl Config {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets how many top entries to report.
    #[must_use]
    pub fn size(mut self, size: usize) -> Self {
        self.size = size;
        self
    }

    /// Sets the 0-based key fields.
    #[must_use]
    pub fn fields(mut self, fields: Vec<usize>) -> Self {
        self.fields = fields;
        self
    }

    /// Splits records on `pattern` instead of whitespace.
    pub fn with_field_separator(mut self, pattern: &str) -> TopfewResult<Self> {
        self.field_separator = Some(Regex::new(pattern)?);
        Ok(self)
    }

    /// Sets whether quoted strings count as one field.
    #[must_use]
    pub fn quoted_fields(mut self, value: bool) -> Self {
        self.quoted_fields = value;
        self
    }

    /// Sets the filter chain.
    #[must_use]
    pub fn filters(mut self, filters: Filters) -> Self {
        self.filters = filters;
        self
    }

    /// Sets the number of segments for a file scan.
    #[must_use]
    pub fn width(mut self, width: usize) -> Self {
        self.width = width;
        self
    }

    /// Sets diagnostic sample mode.
    #[must_use]
    pub fn sample(mut self, value: bool) -> Self {
        self.sample = value;
        self
    }

    /// Sets the file to read.
    #[must_use]
    pub fn path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Checks for values and combinations that cannot run.
    pub fn validate(&self) -> TopfewResult<()> {
        if self.size == 0 {
            return Err(TopfewError::invalid_config("number of results must be at least 1"));
        }
        if self.field_separator.is_some() && self.quoted_fields {
            return Err(TopfewError::invalid_config(
                "a field separator can't be combined with quoted fields",
            ));
        }
        if self.sample && self.path.is_some() {
            return Err(TopfewError::invalid_config(
                "sample mode reads standard input only",
            ));
        }
        Ok(())
    }

    /// Builds the key finder for this configuration.
    pub fn key_finder(&self) -> KeyFinder {
        let fields = self.fields.clone();
        match &self.field_separator {
            Some(separator) => KeyFinder::separated_by(fields, separator.clone()),
            None if self.quoted_fields => KeyFinder::quoted_fields(fields),
            None => KeyFinder::fields(fields),
        }
    }
}

/// Parses a field list such as `"1,3,7"`.
///
/// Field numbers are 1-based on input, must be strictly ascending, and are
/// returned 0-based.
pub fn parse_fields(list: &str) -> TopfewResult<Vec<usize>> {
    let mut fields: Vec<usize> = Vec::new();
    for part in list.split(',') {
        let part = part.trim();
        let number: usize = part
            .parse()
            .map_err(|_| TopfewError::invalid_config(format!("bad field number {part:?}")))?;
        if number == 0 {
            return Err(TopfewError::invalid_config("field numbers start at 1"));
        }
        if let Some(&last) = fields.last() {
            if number - 1 <= last {
                return Err(TopfewError::invalid_config(format!(
                    "fields must be in ascending order: {list}"
                )));
            }
        }
        fields.push(number - 1);
    }
    Ok(fields)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::KeySource;

    #[test]
    fn default_config() {
        let config = Config::default();
        assert_eq!(config.size, 10);
        assert!(config.fields.is_empty());
        assert!(config.field_separator.is_none());
        assert!(!config.quoted_fields);
        assert!(config.filters.is_empty());
        assert_eq!(config.width, 0);
        assert!(!config.sample);
        assert!(config.path.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn builder_pattern() {
        let config = Config::new()
            .size(3)
            .fields(vec![0, 2])
            .quoted_fields(true)
            .width(4)
            .path("/var/log/access.log");

        assert_eq!(config.size, 3);
        assert_eq!(config.fields, vec![0, 2]);
        assert!(config.quoted_fields);
        assert_eq!(config.width, 4);
        assert!(config.path.is_some());
    }

    #[test]
    fn zero_size_is_rejected() {
        let err = Config::new().size(0).validate().unwrap_err();
        assert!(matches!(err, TopfewError::InvalidConfig { .. }));
    }

    #[test]
    fn separator_and_quotes_conflict() {
        let config = Config::new()
            .with_field_separator(",")
            .unwrap()
            .quoted_fields(true);
        assert!(config.validate().is_err());
    }

    #[test]
    fn sample_needs_stdin() {
        assert!(Config::new().sample(true).validate().is_ok());
        assert!(Config::new().sample(true).path("x.log").validate().is_err());
    }

    #[test]
    fn bad_separator_pattern() {
        let err = Config::new().with_field_separator("(").unwrap_err();
        assert!(matches!(err, TopfewError::Pattern(_)));
    }

    #[test]
    fn key_finder_follows_mode() {
        let mut scratch = Vec::new();

        let plain = Config::new().fields(vec![1]).key_finder();
        assert_eq!(plain.extract_key(b"a \"b c\" d", &mut scratch).unwrap(), b"\"b");

        let quoted = Config::new().fields(vec![1]).quoted_fields(true).key_finder();
        assert_eq!(quoted.extract_key(b"a \"b c\" d", &mut scratch).unwrap(), b"b c");

        let separated = Config::new()
            .fields(vec![1])
            .with_field_separator(";")
            .unwrap()
            .key_finder();
        assert_eq!(separated.extract_key(b"a b;c d", &mut scratch).unwrap(), b"c d");

        let whole = Config::new().key_finder();
        assert_eq!(whole.extract_key(b"a b c", &mut scratch).unwrap(), b"a b c");
    }

    #[test]
    fn parse_field_list() {
        assert_eq!(parse_fields("1").unwrap(), vec![0]);
        assert_eq!(parse_fields("1,3,7").unwrap(), vec![0, 2, 6]);
        assert_eq!(parse_fields(" 2, 4 ").unwrap(), vec![1, 3]);
    }

    #[test]
    fn parse_field_list_errors() {
        for bad in ["", "0", "a", "3,1", "2,2", "1,,2", "-1"] {
            assert!(
                matches!(parse_fields(bad), Err(TopfewError::InvalidConfig { .. })),
                "{bad:?} should be rejected"
            );
        }
    }
}
