//! Multi-resolution event histograms.
//!
//! Raw timestamps are counted per minute in a [`HistogramStore`]. From that
//! store, [`aggregate`] derives four dense series relative to a reference
//! instant: intraday slices, days around the reference, every month and
//! every year covered by the data. The store is never modified by
//! aggregation, so it can be refocused as often as needed.
//!
//! ```
//! use timehist::{aggregate_at, parse_timestamp, HistogramStore, WindowConfig};
//!
//! let mut store = HistogramStore::new();
//! store.insert("2020-01-15T10:05:00+0000").unwrap();
//! store.insert("2020-03-05T08:00:00+0000").unwrap();
//!
//! let reference = parse_timestamp("2020-01-15T10:03:00").unwrap();
//! let stats = aggregate_at(&store, reference, &WindowConfig::default()).unwrap();
//! assert_eq!(stats.monthly.counts(), vec![1, 0, 1]);
//! ```

pub mod aggregate;
pub mod app;
pub mod bucket;
pub mod config;
pub mod constants;
pub mod error;
pub mod ingest;
pub mod logging;
pub mod parse;
pub mod render;
pub mod snapshot;
pub mod store;
pub mod ui;
pub mod util;

pub use aggregate::{aggregate, aggregate_at, Statistics, WindowConfig};
pub use bucket::{Bucket, BucketSeries, SeriesKind};
pub use error::{Error, Result};
pub use ingest::{ingest, ingest_reader, IngestReport, ParsePolicy};
pub use parse::{parse_focus, parse_timestamp};
pub use store::{truncate, Frequency, HistogramStore};
