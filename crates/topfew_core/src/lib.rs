//! # Topfew Core
//!
//! Finds the N most frequent keys in line-structured input, exactly, with
//! memory bounded by the number of distinct keys.
//!
//! This crate provides:
//! - [`Counter`]: exact top-N counting with a bounded candidate set
//! - [`KeyFinder`] and [`Filters`]: key extraction, grep/vgrep and sed stages
//! - [`segment`]: line-aligned concurrent reading of a named file
//! - [`run`]: picks a streaming, segmented or diagnostic scan from a [`Config`]
//!
//! ```
//! use topfew_core::{count_stream, Filters, KeyFinder};
//!
//! let log = "10.0.0.1 GET /\n10.0.0.2 GET /\n10.0.0.1 GET /about\n";
//! let top = count_stream(log.as_bytes(), &Filters::new(), &KeyFinder::fields(vec![0]), 1)?;
//! assert_eq!(&*top[0].key, b"10.0.0.1");
//! assert_eq!(top[0].count, 2);
//! # Ok::<(), topfew_core::TopfewError>(())
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod counter;
mod driver;
mod error;
mod filter;
mod keys;
mod pipeline;
mod record;
pub mod segment;
mod stats;
mod tally;

pub use config::{parse_fields, Config, DEFAULT_SIZE};
pub use counter::{Counter, KeyCount};
pub use driver::{count_stream, from_stream, run, sample, write_top, Mode, Report};
pub use error::{KeyError, TopfewError, TopfewResult};
pub use filter::{Filters, RecordFilter, Sed};
pub use keys::{KeyFinder, KeySource};
pub use record::{RecordReader, READ_BUFFER_SIZE};
pub use segment::{plan_segments, read_file_in_segments, read_segment, Segment, SegmentReport};
pub use stats::ScanStats;
pub use tally::LocalTally;

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
