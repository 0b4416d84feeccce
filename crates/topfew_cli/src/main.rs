//! tf
//!
//! Prints the most frequent keys in a log file or standard input.
//!
//! ```text
//! tf -n 5 -f 1 /var/log/nginx/access.log
//! tf -q -f 5 -g 'POST' -s '\?.*' '' access.log
//! cat access.log | tf --sample -f 7 -s '/[0-9]+' '/N'
//! ```

mod output;

use clap::{ArgAction, Parser};
use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use topfew_core::{parse_fields, run, Config, Filters, Mode, TopfewResult};
use tracing::debug;
use tracing_subscriber::EnvFilter;

/// Find the most frequent keys in line-structured input.
///
/// Regular expressions given with -g, -v and -s are applied in the order
/// supplied. -s works on the extracted key, the others on the whole record.
#[derive(Parser, Debug)]
#[command(name = "tf")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Number of top keys to print
    #[arg(short = 'n', long = "number", default_value_t = 10,
          value_parser = clap::value_parser!(u64).range(1..))]
    number: u64,

    /// Comma-separated 1-based field numbers making up the key, e.g. 1,3,7
    /// [default: the whole record]
    #[arg(short = 'f', long = "fields", value_name = "LIST")]
    fields: Option<String>,

    /// Regex separating fields instead of whitespace
    #[arg(short = 'p', long = "fieldseparator", value_name = "REGEX")]
    field_separator: Option<String>,

    /// Treat "quoted strings" as single fields
    #[arg(short = 'q', long = "quotedfields")]
    quoted_fields: bool,

    /// Only count records matching REGEX (may repeat)
    #[arg(short = 'g', long = "grep", value_name = "REGEX")]
    grep: Vec<String>,

    /// Discard records matching REGEX (may repeat)
    #[arg(short = 'v', long = "vgrep", value_name = "REGEX")]
    vgrep: Vec<String>,

    /// Replace REGEX with REPLACEMENT in the key (may repeat)
    #[arg(short = 's', long = "sed", num_args = 2,
          value_names = ["REGEX", "REPLACEMENT"], action = ArgAction::Append)]
    sed: Vec<String>,

    /// Number of segments to read a file in [default: number of CPUs]
    #[arg(short = 'w', long = "width",
          value_parser = clap::value_parser!(u64).range(1..))]
    width: Option<u64>,

    /// Print how records are filtered and keyed instead of counting
    /// (standard input only)
    #[arg(long)]
    sample: bool,

    /// Output format (text, json)
    #[arg(long, default_value = "text")]
    format: String,

    /// Log progress to standard error
    #[arg(long)]
    verbose: bool,

    /// File to read [default: standard input]
    file: Option<PathBuf>,
}

impl Cli {
    fn to_config(&self) -> TopfewResult<Config> {
        let mut filters = Filters::new();
        for pattern in &self.grep {
            filters.add_grep(pattern)?;
        }
        for pattern in &self.vgrep {
            filters.add_vgrep(pattern)?;
        }
        for pair in self.sed.chunks(2) {
            if let [pattern, replacement] = pair {
                filters.add_sed(pattern, replacement)?;
            }
        }

        let mut config = Config::new()
            .size(clamp(self.number))
            .quoted_fields(self.quoted_fields)
            .filters(filters)
            .width(self.width.map_or(0, clamp))
            .sample(self.sample);
        if let Some(fields) = &self.fields {
            config = config.fields(parse_fields(fields)?);
        }
        if let Some(separator) = &self.field_separator {
            config = config.with_field_separator(separator)?;
        }
        if let Some(path) = &self.file {
            config = config.path(path);
        }
        config.validate()?;
        Ok(config)
    }
}

fn clamp(n: u64) -> usize {
    usize::try_from(n).unwrap_or(usize::MAX)
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize logging
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if cli.verbose {
            EnvFilter::new("debug")
        } else {
            EnvFilter::new("warn")
        }
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    match execute(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("tf: {err}");
            ExitCode::FAILURE
        }
    }
}

fn execute(cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    let format = output::Format::parse(&cli.format)?;
    let config = cli.to_config()?;

    let stdout = io::stdout();
    let mut out = io::BufWriter::new(stdout.lock());
    let report = run(&config, io::stdin().lock(), &mut out)?;
    debug!(
        mode = ?report.mode,
        records = report.stats.records,
        rejected = report.stats.rejected,
        key_errors = report.stats.key_errors,
        counted = report.stats.counted,
        "scan finished"
    );

    if report.mode != Mode::DiagnosticSample {
        output::print_top(&report.top, format, &mut out)?;
    }
    out.flush()?;
    Ok(())
}
