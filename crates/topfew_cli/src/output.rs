//! Result formatting.

use serde::Serialize;
use std::borrow::Cow;
use std::io::{self, Write};
use topfew_core::{write_top, KeyCount};

/// How the top list is printed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    /// `<count> <key>` lines.
    Text,
    /// A JSON array of `{"count", "key"}` objects.
    Json,
}

impl Format {
    pub fn parse(name: &str) -> Result<Self, String> {
        match name {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            other => Err(format!("unknown output format {other:?} (expected text or json)")),
        }
    }
}

#[derive(Debug, Serialize)]
struct Entry<'a> {
    count: u64,
    key: Cow<'a, str>,
}

/// Prints `top` to `out` in `format`.
pub fn print_top<W: Write>(top: &[KeyCount], format: Format, out: &mut W) -> io::Result<()> {
    match format {
        Format::Text => write_top(top, out),
        Format::Json => {
            let entries: Vec<Entry<'_>> = top
                .iter()
                .map(|kc| Entry {
                    count: kc.count,
                    key: kc.key_lossy(),
                })
                .collect();
            serde_json::to_writer_pretty(&mut *out, &entries)?;
            out.write_all(b"\n")
        }
    }
}
