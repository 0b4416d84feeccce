//! # Topfew Testkit
//!
//! Test utilities for topfew.
//!
//! This crate provides:
//! - Temporary log files and synthetic access-log lines
//! - Reference counting and tie-agnostic top-list comparison
//! - Property-based test generators using proptest
//!
//! ## Usage
//!
//! ```rust,ignore
//! use topfew_testkit::prelude::*;
//!
//! #[test]
//! fn counts_client_addresses() {
//!     let log = TestLog::with_lines(&access_log(1_000));
//!     // ... run a scan over log.path()
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::fixtures::*;
    pub use crate::generators::*;
}

pub use fixtures::*;
pub use generators::*;
