use std::io::{self, BufRead, Cursor, Read};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};
use std::thread;
use std::time::Duration;

use chrono::NaiveDate;
use timehist::{
    aggregate_at, ingest, ingest_reader, Error, HistogramStore, ParsePolicy, Result, WindowConfig,
};

const FEED: &str = "\
2015-11-02T21:45:13+0000
2015-11-02T21:45:50+0000
not a timestamp
2015-11-03T08:00:00+0000

2015-12-24T23:59:59+0000
";

#[test]
fn skip_policy_counts_rejections() -> Result<()> {
    let mut store = HistogramStore::new();
    let stop = AtomicBool::new(false);

    let report = ingest(&mut store, Cursor::new(FEED).lines(), ParsePolicy::Skip, &stop)?;

    assert_eq!(report.accepted, 4);
    assert_eq!(report.rejected, 1);
    assert!(!report.interrupted);
    assert_eq!(store.len(), 3);
    assert_eq!(store.total(), 4);
    Ok(())
}

#[test]
fn abort_policy_keeps_earlier_lines() {
    let mut store = HistogramStore::new();
    let stop = AtomicBool::new(false);

    let result = ingest(&mut store, Cursor::new(FEED).lines(), ParsePolicy::Abort, &stop);

    match result {
        Err(Error::Parse { raw, .. }) => assert_eq!(raw, "not a timestamp"),
        other => panic!("expected a parse error, got {other:?}"),
    }
    assert_eq!(store.total(), 2);
}

#[test]
fn producer_failure_still_allows_aggregation() -> Result<()> {
    let source: Vec<std::result::Result<String, String>> = vec![
        Ok("2015-11-02T21:45:13+0000".to_string()),
        Ok("2015-11-02T22:10:00+0000".to_string()),
        Err("connection reset".to_string()),
        Ok("2016-01-01T00:00:00+0000".to_string()),
    ];
    let mut store = HistogramStore::new();
    let stop = AtomicBool::new(false);

    let report = ingest(&mut store, source, ParsePolicy::Abort, &stop)?;
    assert!(report.interrupted);
    assert_eq!(report.accepted, 2);

    let reference = NaiveDate::from_ymd_opt(2015, 11, 2)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap();
    let stats = aggregate_at(&store, reference, &WindowConfig::new(60, 1)?)?;
    assert_eq!(stats.intraday.total(), 2);
    assert_eq!(stats.yearly.counts(), vec![2]);
    Ok(())
}

#[test]
fn invalid_utf8_line_is_just_a_bad_timestamp() -> Result<()> {
    let mut bytes = b"2020-01-01T00:00:00\n".to_vec();
    bytes.extend_from_slice(b"\xff\xfe garbage\n");
    bytes.extend_from_slice(b"2020-01-01T00:01:00\r\n2020-01-01T00:02:00");
    let mut store = HistogramStore::new();
    let stop = AtomicBool::new(false);

    let report = ingest_reader(&mut store, Cursor::new(bytes), ParsePolicy::Skip, &stop)?;

    assert_eq!(report.accepted, 3);
    assert_eq!(report.rejected, 1);
    assert!(!report.interrupted);
    assert_eq!(store.total(), 3);
    Ok(())
}

#[test]
fn invalid_utf8_line_aborts_under_abort_policy() {
    let bytes = b"2020-01-01T00:00:00\n\xff\n2020-01-01T00:01:00\n".to_vec();
    let mut store = HistogramStore::new();
    let stop = AtomicBool::new(false);

    let result = ingest_reader(&mut store, Cursor::new(bytes), ParsePolicy::Abort, &stop);

    assert!(matches!(result, Err(Error::Parse { .. })));
    assert_eq!(store.total(), 1);
}

/// Hands out one chunk, then blocks until its sender goes away.
struct Stalled {
    first: Option<Vec<u8>>,
    hold: mpsc::Receiver<()>,
}

impl Read for Stalled {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if let Some(chunk) = self.first.take() {
            buf[..chunk.len()].copy_from_slice(&chunk);
            return Ok(chunk.len());
        }
        let _ = self.hold.recv();
        Ok(0)
    }
}

#[test]
fn stop_flag_ends_a_blocked_reader() -> Result<()> {
    let (release, hold) = mpsc::channel();
    let reader = Stalled {
        first: Some(b"2020-01-01T00:00:00\n".to_vec()),
        hold,
    };
    let stop = Arc::new(AtomicBool::new(false));
    let raiser = {
        let stop = Arc::clone(&stop);
        thread::spawn(move || {
            thread::sleep(Duration::from_millis(300));
            stop.store(true, Ordering::SeqCst);
        })
    };

    let mut store = HistogramStore::new();
    let report = ingest_reader(&mut store, reader, ParsePolicy::Skip, &stop)?;
    raiser.join().unwrap();

    assert!(report.interrupted);
    assert_eq!(report.accepted, 1);
    assert_eq!(store.total(), 1);
    drop(release);
    Ok(())
}
