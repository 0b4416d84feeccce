//! Benchmark utilities.

use rand::Rng;
use std::io::{BufWriter, Write};
use std::path::Path;
use topfew_core::LocalTally;

/// Generates `count` keys drawn from `distinct` possibilities, skewed so
/// that low-numbered keys are far more frequent than high-numbered ones.
pub fn skewed_keys(count: usize, distinct: usize) -> Vec<Vec<u8>> {
    let mut rng = rand::thread_rng();
    (0..count)
        .map(|_| {
            // product of two uniforms leans toward zero
            let a: f64 = rng.gen();
            let b: f64 = rng.gen();
            let rank = ((a * b) * distinct as f64) as usize;
            format!("/key/{rank}").into_bytes()
        })
        .collect()
}

/// Builds a tally of `keys`.
pub fn tally_of(keys: &[Vec<u8>]) -> LocalTally {
    let mut tally = LocalTally::new();
    for key in keys {
        tally.add(key);
    }
    tally
}

/// Writes an access-log-like file of `lines` lines to `path`.
pub fn write_log(path: &Path, lines: usize) -> std::io::Result<()> {
    let mut rng = rand::thread_rng();
    let mut out = BufWriter::new(std::fs::File::create(path)?);
    for i in 0..lines {
        let client: u8 = rng.gen_range(1..=254);
        let page = (rng.gen::<f64>() * rng.gen::<f64>() * 500.0) as usize;
        writeln!(
            out,
            "10.1.{}.{client} - - [12/Oct/2026:10:{:02}:{:02} -0700] \"GET /ongoing/{page} HTTP/1.1\" 200 {} \"-\" \"bench\"",
            i % 16,
            (i / 60) % 60,
            i % 60,
            rng.gen_range(100..60_000),
        )?;
    }
    out.flush()
}
