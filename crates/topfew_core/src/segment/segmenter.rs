//! Concurrent segmented scan of a named file.

use super::{plan_segments, read_segment, SegmentReport};
use crate::counter::Counter;
use crate::error::{TopfewError, TopfewResult};
use crate::filter::RecordFilter;
use crate::keys::KeySource;
use crate::stats::ScanStats;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::thread;
use tracing::{debug, error};

/// Reads the file at `path` in about `width` concurrent segments and merges
/// every key into `counter`.
///
/// A `width` of 0 means one segment per available CPU. Each worker owns its
/// segment's file handle and a private tally; tallies are merged only on
/// the calling thread, as workers report in.
///
/// The first failing segment wins: its error is returned, the remaining
/// workers are told to stop, and their results are dropped. A worker that
/// panics is reported as [`TopfewError::WorkerLost`]. By the time this
/// returns, every worker has exited.
pub fn read_file_in_segments<K, F>(
    path: &Path,
    filter: &F,
    keys: &K,
    counter: &mut Counter,
    width: usize,
) -> TopfewResult<ScanStats>
where
    K: KeySource,
    F: RecordFilter,
{
    let width = if width == 0 {
        thread::available_parallelism().map_or(1, |n| n.get())
    } else {
        width
    };

    let segments = plan_segments(path, width)?;
    let expected = segments.len();
    let abort = AtomicBool::new(false);
    let mut stats = ScanStats::new();

    thread::scope(|scope| {
        let (tx, rx) = mpsc::channel::<TopfewResult<SegmentReport>>();
        let abort = &abort;
        let workers: Vec<_> = segments
            .into_iter()
            .map(|segment| {
                let tx = tx.clone();
                scope.spawn(move || {
                    let result = read_segment(segment, keys, filter, abort);
                    // the collector may already have given up
                    let _ = tx.send(result);
                })
            })
            .collect();
        drop(tx);

        let collected = collect_reports(&rx, expected, abort, counter, &mut stats);

        // a handle joined here doesn't re-raise its panic when the scope ends
        let panicked = workers
            .into_iter()
            .map(|worker| worker.join())
            .filter(Result::is_err)
            .count();
        if panicked > 0 {
            error!(panicked, "segment worker panicked");
        }
        collected
    })?;

    debug!(
        segments = expected,
        records = stats.records,
        counted = stats.counted,
        distinct = counter.distinct_keys(),
        "segmented scan done"
    );
    Ok(stats)
}

/// Receives `expected` segment reports and merges each into `counter`.
///
/// Stops at the first failed segment or when the channel closes early,
/// raising `abort` either way.
fn collect_reports(
    rx: &mpsc::Receiver<TopfewResult<SegmentReport>>,
    expected: usize,
    abort: &AtomicBool,
    counter: &mut Counter,
    stats: &mut ScanStats,
) -> TopfewResult<()> {
    for received in 0..expected {
        let report = match rx.recv() {
            Ok(Ok(report)) => report,
            Ok(Err(err)) => {
                abort.store(true, Ordering::Relaxed);
                error!(error = %err, "segment failed, abandoning scan");
                return Err(err);
            }
            Err(_) => {
                abort.store(true, Ordering::Relaxed);
                let missing = expected - received;
                error!(missing, "segment workers exited without reporting");
                return Err(TopfewError::WorkerLost { missing });
            }
        };

        debug!(
            start = report.start,
            end = report.end,
            records = report.stats.records,
            keys = report.tally.len(),
            "segment done"
        );
        stats.merge(&report.stats);
        counter.merge(report.tally);
    }
    Ok(())
}
