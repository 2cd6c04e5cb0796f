use std::fmt::Display;
use std::io::{self, BufRead, BufReader, Read};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::Duration;

use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::constants::TICK_RATE_MS;
use crate::error::{Error, Result};
use crate::store::HistogramStore;

/// What to do with a line that does not parse as a timestamp.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ParsePolicy {
    /// Log the line and keep going.
    #[default]
    Skip,
    /// Stop and report the error; already-counted lines stay in the store.
    Abort,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestReport {
    pub accepted: u64,
    pub rejected: u64,
    /// The producer failed or a stop was requested before exhaustion.
    pub interrupted: bool,
}

/// Feed raw timestamps into `store` until the producer is exhausted, yields
/// an error, or `stop` is raised.
///
/// Producer errors end ingestion without failing it, so whatever was read so
/// far can still be aggregated. `stop` is only seen between items; use
/// [`ingest_reader`] when the producer may block.
pub fn ingest<I, E>(
    store: &mut HistogramStore,
    source: I,
    policy: ParsePolicy,
    stop: &AtomicBool,
) -> Result<IngestReport>
where
    I: IntoIterator<Item = std::result::Result<String, E>>,
    E: Display,
{
    let mut report = IngestReport::default();

    for (index, item) in source.into_iter().enumerate() {
        if stop.load(Ordering::Relaxed) {
            warn!(accepted = report.accepted, "ingestion stopped on request");
            report.interrupted = true;
            break;
        }

        match item {
            Ok(raw) => report.line(store, index + 1, &raw, policy)?,
            Err(e) => {
                warn!(line = index + 1, error = %e, "source failed, keeping partial data");
                report.interrupted = true;
                break;
            }
        }
    }

    report.finish(store);
    Ok(report)
}

/// Read newline-separated timestamps from `reader` on a worker thread.
///
/// Lines that are not valid UTF-8 are decoded lossily and go through `policy`
/// like any other malformed timestamp. `stop` is polled while the reader is
/// blocked, so a raised flag ends ingestion even when no input arrives. The
/// worker is left detached in that case.
pub fn ingest_reader<R>(
    store: &mut HistogramStore,
    reader: R,
    policy: ParsePolicy,
    stop: &AtomicBool,
) -> Result<IngestReport>
where
    R: Read + Send + 'static,
{
    let (tx, rx) = mpsc::channel::<io::Result<String>>();
    thread::Builder::new()
        .name("timehist-reader".into())
        .spawn(move || {
            for chunk in BufReader::new(reader).split(b'\n') {
                let line = chunk.map(|bytes| String::from_utf8_lossy(&bytes).into_owned());
                let failed = line.is_err();
                if tx.send(line).is_err() || failed {
                    break;
                }
            }
            debug!("reader thread finished");
        })?;

    let tick = Duration::from_millis(TICK_RATE_MS);
    let mut report = IngestReport::default();
    let mut index = 0usize;

    loop {
        if stop.load(Ordering::Relaxed) {
            warn!(accepted = report.accepted, "ingestion stopped on request");
            report.interrupted = true;
            break;
        }
        match rx.recv_timeout(tick) {
            Ok(Ok(raw)) => {
                index += 1;
                report.line(store, index, &raw, policy)?;
            }
            Ok(Err(e)) => {
                warn!(line = index + 1, error = %e, "source failed, keeping partial data");
                report.interrupted = true;
                break;
            }
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }

    report.finish(store);
    Ok(report)
}

impl IngestReport {
    fn line(
        &mut self,
        store: &mut HistogramStore,
        line: usize,
        raw: &str,
        policy: ParsePolicy,
    ) -> Result<()> {
        if raw.trim().is_empty() {
            return Ok(());
        }
        match store.insert(raw) {
            Ok(_) => self.accepted += 1,
            Err(err @ Error::Parse { .. }) => match policy {
                ParsePolicy::Skip => {
                    warn!(line, error = %err, "skipping line");
                    self.rejected += 1;
                }
                ParsePolicy::Abort => return Err(err),
            },
            Err(other) => return Err(other),
        }
        Ok(())
    }

    fn finish(&self, store: &HistogramStore) {
        info!(
            accepted = self.accepted,
            rejected = self.rejected,
            interrupted = self.interrupted,
            minutes = store.len(),
            "ingestion finished"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(raw: &[&str]) -> Vec<std::result::Result<String, String>> {
        raw.iter().map(|line| Ok(line.to_string())).collect()
    }

    #[test]
    fn skips_blank_lines_silently() {
        let mut store = HistogramStore::new();
        let stop = AtomicBool::new(false);
        let report = ingest(
            &mut store,
            lines(&["2020-01-01T00:00:00", "", "   ", "2020-01-01T00:01:00"]),
            ParsePolicy::Abort,
            &stop,
        )
        .unwrap();
        assert_eq!(report.accepted, 2);
        assert_eq!(report.rejected, 0);
        assert!(!report.interrupted);
    }

    #[test]
    fn raised_stop_flag_ends_early() {
        let mut store = HistogramStore::new();
        let stop = AtomicBool::new(true);
        let report = ingest(
            &mut store,
            lines(&["2020-01-01T00:00:00"]),
            ParsePolicy::Skip,
            &stop,
        )
        .unwrap();
        assert!(report.interrupted);
        assert!(store.is_empty());
    }
}
