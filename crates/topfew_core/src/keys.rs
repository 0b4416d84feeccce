//! Key extraction.
//!
//! A key is derived from every record, so extraction must be cheap. The
//! whitespace and quoted-field modes are hand-rolled byte scanners that only
//! care whether a byte is a space or a tab; the regex separator mode is
//! slower and only used when asked for.

use crate::error::KeyError;
use regex::bytes::Regex;

/// Derives the key to count from one record.
///
/// `record` never includes its trailing line feed. Implementations may build
/// the key in `scratch`, which belongs to the calling worker and is reused
/// from record to record.
pub trait KeySource: Sync {
    /// Extracts the key from `record`.
    fn extract_key<'a>(
        &self,
        record: &'a [u8],
        scratch: &'a mut Vec<u8>,
    ) -> Result<&'a [u8], KeyError>;
}

/// How a record is split into fields.
#[derive(Debug, Clone)]
enum Splitter {
    /// Runs of spaces and tabs separate fields.
    Whitespace,
    /// Like `Whitespace`, but `"..."` is one field, quotes stripped.
    Quoted,
    /// Fields are separated by matches of a regex.
    Pattern(Regex),
}

/// Extracts a key from selected fields, joined with single spaces.
///
/// With no fields selected the key is the whole record.
#[derive(Debug, Clone)]
pub struct KeyFinder {
    /// 0-based field numbers, ascending.
    fields: Vec<usize>,
    splitter: Splitter,
}

impl KeyFinder {
    /// A key finder that uses the whole record as the key.
    pub fn whole_record() -> Self {
        Self {
            fields: Vec::new(),
            splitter: Splitter::Whitespace,
        }
    }

    /// Selects whitespace-separated fields. `fields` are 0-based and ascending.
    pub fn fields(fields: Vec<usize>) -> Self {
        Self {
            fields,
            splitter: Splitter::Whitespace,
        }
    }

    /// Selects fields where `"quoted strings"` count as one field.
    pub fn quoted_fields(fields: Vec<usize>) -> Self {
        Self {
            fields,
            splitter: Splitter::Quoted,
        }
    }

    /// Selects fields separated by matches of `separator`.
    pub fn separated_by(fields: Vec<usize>, separator: Regex) -> Self {
        Self {
            fields,
            splitter: Splitter::Pattern(separator),
        }
    }

    /// The 0-based field numbers this finder selects.
    pub fn selected(&self) -> &[usize] {
        &self.fields
    }
}

impl Default for KeyFinder {
    fn default() -> Self {
        Self::whole_record()
    }
}

impl KeySource for KeyFinder {
    fn extract_key<'a>(
        &self,
        record: &'a [u8],
        scratch: &'a mut Vec<u8>,
    ) -> Result<&'a [u8], KeyError> {
        if self.fields.is_empty() {
            return Ok(record);
        }

        scratch.clear();
        match &self.splitter {
            Splitter::Whitespace => gather_fields(record, &self.fields, scratch, false)?,
            Splitter::Quoted => gather_fields(record, &self.fields, scratch, true)?,
            Splitter::Pattern(separator) => {
                let mut parts = separator.split(record);
                let mut consumed = 0usize;
                for (i, &wanted) in self.fields.iter().enumerate() {
                    // fields are ascending, so the iterator only moves forward
                    let Some(part) = parts.nth(wanted - consumed) else {
                        return Err(KeyError::NotEnoughFields {
                            wanted: wanted + 1,
                            found: separator.split(record).count(),
                        });
                    };
                    consumed = wanted + 1;
                    if i > 0 {
                        scratch.push(b' ');
                    }
                    scratch.extend_from_slice(part);
                }
            }
        }
        Ok(scratch.as_slice())
    }
}

#[inline]
fn is_space(b: u8) -> bool {
    b == b' ' || b == b'\t'
}

/// Walks the record once, copying the wanted fields into `key`.
fn gather_fields(
    record: &[u8],
    fields: &[usize],
    key: &mut Vec<u8>,
    quoted: bool,
) -> Result<(), KeyError> {
    let mut index = 0usize;
    let mut field = 0usize;

    for (i, &wanted) in fields.iter().enumerate() {
        while field < wanted {
            index = next_field(record, index, quoted)
                .map(|(_, end)| end)
                .ok_or(KeyError::NotEnoughFields {
                    wanted: wanted + 1,
                    found: field,
                })?;
            field += 1;
        }

        let (start, end) = next_field(record, index, quoted).ok_or(KeyError::NotEnoughFields {
            wanted: wanted + 1,
            found: field,
        })?;
        if i > 0 {
            key.push(b' ');
        }
        key.extend_from_slice(field_body(record, start, end, quoted));
        index = end;
        field += 1;
    }
    Ok(())
}

/// Finds the next field at or after `index`. Returns its byte span
/// (including quotes, for a quoted field) or `None` when only whitespace
/// remains.
fn next_field(record: &[u8], mut index: usize, quoted: bool) -> Option<(usize, usize)> {
    while index < record.len() && is_space(record[index]) {
        index += 1;
    }
    if index == record.len() {
        return None;
    }

    let start = index;
    if quoted && record[index] == b'"' {
        index += 1;
        while index < record.len() && record[index] != b'"' {
            index += 1;
        }
        // step past the closing quote, if there is one
        return Some((start, (index + 1).min(record.len())));
    }

    while index < record.len() && !is_space(record[index]) {
        index += 1;
    }
    Some((start, index))
}

fn field_body(record: &[u8], start: usize, end: usize, quoted: bool) -> &[u8] {
    let span = &record[start..end];
    if !quoted || span.first() != Some(&b'"') {
        return span;
    }
    let inner = &span[1..];
    inner.strip_suffix(b"\"").unwrap_or(inner)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(kf: &KeyFinder, record: &str) -> Result<String, KeyError> {
        let mut scratch = Vec::new();
        kf.extract_key(record.as_bytes(), &mut scratch)
            .map(|k| String::from_utf8_lossy(k).into_owned())
    }

    const LOG_LINES: [&str; 3] = [
        r#"i577a483c.versanet.de - - [12/Mar/2007:08:03:37 -0800] "GET /ongoing/ongoing.atom HTTP/1.1" 304 - "-" "NetNewsWire/2.1 (Mac OS X; http://ranchero.com/netnewswire/)""#,
        r#"105.66.1.178 - - [19/Apr/2020:06:38:44 -0700] "-" 408 156 "-" "-""#,
        r#"css6.csee.usf.edu - - [12/Mar/2007:08:03:42 -0800] "GET /ongoing/When/200x/2007/03/11/Ramirez.png HTTP/1.1" 200 67663 "http://www.tbray.org/ongoing/When/200x/2007/03/11/Misa-Criolla" "endo/1.0 (Mac OS X; ppc i386; http://kula.jp/endo)""#,
    ];

    #[test]
    fn whole_record_is_key() {
        let kf = KeyFinder::whole_record();
        assert_eq!(key(&kf, "a b c").unwrap(), "a b c");
        assert_eq!(key(&kf, "").unwrap(), "");
    }

    #[test]
    fn every_spaced_field_is_selectable() {
        for line in LOG_LINES {
            for (n, field) in line.split(' ').enumerate() {
                let kf = KeyFinder::fields(vec![n]);
                assert_eq!(key(&kf, line).unwrap(), field, "field {n} of {line}");
            }
        }
    }

    #[test]
    fn multiple_fields_joined_with_space() {
        let kf = KeyFinder::fields(vec![0, 2]);
        assert_eq!(key(&kf, "  one\ttwo   three four").unwrap(), "one three");
    }

    #[test]
    fn too_few_fields() {
        let kf = KeyFinder::fields(vec![2]);
        assert_eq!(
            key(&kf, "alpha"),
            Err(KeyError::NotEnoughFields {
                wanted: 3,
                found: 1
            })
        );
        assert!(key(&kf, "a b   ").is_err());
    }

    #[test]
    fn quoted_fields() {
        let kf = KeyFinder::quoted_fields(vec![5]);
        assert_eq!(
            key(&kf, LOG_LINES[0]).unwrap(),
            "GET /ongoing/ongoing.atom HTTP/1.1"
        );
        assert_eq!(key(&kf, LOG_LINES[1]).unwrap(), "-");

        let kf = KeyFinder::quoted_fields(vec![9]);
        assert_eq!(
            key(&kf, LOG_LINES[2]).unwrap(),
            "endo/1.0 (Mac OS X; ppc i386; http://kula.jp/endo)"
        );
    }

    #[test]
    fn quoted_mode_leaves_plain_fields_alone() {
        let kf = KeyFinder::quoted_fields(vec![3]);
        assert_eq!(key(&kf, LOG_LINES[0]).unwrap(), "[12/Mar/2007:08:03:37");
    }

    #[test]
    fn unterminated_quote_runs_to_end() {
        let kf = KeyFinder::quoted_fields(vec![1]);
        assert_eq!(key(&kf, r#"a "b c"#).unwrap(), "b c");
    }

    #[test]
    fn regex_separator() {
        let kf = KeyFinder::separated_by(vec![1, 3], Regex::new("tt*").unwrap());
        assert_eq!(key(&kf, "atbttctttttdtttte").unwrap(), "b d");
        assert!(matches!(
            key(&kf, "atbtc"),
            Err(KeyError::NotEnoughFields { wanted: 4, .. })
        ));
    }
}
