use std::collections::btree_map::{self, BTreeMap};

use chrono::{DateTime, NaiveDateTime};

use crate::constants::{SECONDS_PER_DAY, SECONDS_PER_MINUTE};
use crate::error::{Error, Result};
use crate::parse::parse_timestamp;

/// A fixed-width flooring step, in whole seconds since the Unix epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Frequency {
    seconds: i64,
}

impl Frequency {
    pub const MINUTE: Frequency = Frequency {
        seconds: SECONDS_PER_MINUTE,
    };
    pub const DAY: Frequency = Frequency {
        seconds: SECONDS_PER_DAY,
    };

    pub fn minutes(n: i64) -> Result<Self> {
        Self::from_seconds(n, SECONDS_PER_MINUTE, "minutes")
    }

    pub fn days(n: i64) -> Result<Self> {
        Self::from_seconds(n, SECONDS_PER_DAY, "days")
    }

    fn from_seconds(n: i64, unit: i64, what: &str) -> Result<Self> {
        if n <= 0 {
            return Err(Error::InvalidConfig(format!(
                "frequency in {what} must be > 0, got {n}"
            )));
        }
        let seconds = n
            .checked_mul(unit)
            .ok_or_else(|| Error::InvalidConfig(format!("frequency of {n} {what} overflows")))?;
        Ok(Self { seconds })
    }

    pub fn seconds(&self) -> i64 {
        self.seconds
    }
}

pub(crate) fn epoch_seconds(instant: NaiveDateTime) -> i64 {
    instant.and_utc().timestamp()
}

pub(crate) fn from_epoch_seconds(secs: i64) -> Result<NaiveDateTime> {
    DateTime::from_timestamp(secs, 0)
        .map(|dt| dt.naive_utc())
        .ok_or(Error::OutOfRange(secs))
}

/// Floor `instant` to the latest multiple of `frequency` since the epoch.
///
/// Sub-second precision is always dropped. Floors that would fall before the
/// earliest representable instant clamp to the first representable multiple,
/// so the result is always a multiple of `frequency`.
pub fn truncate(instant: NaiveDateTime, frequency: Frequency) -> NaiveDateTime {
    let step = frequency.seconds;
    let floored = epoch_seconds(instant).div_euclid(step) * step;
    let secs = if floored < epoch_seconds(NaiveDateTime::MIN) {
        // floored is a negative multiple here, so this stays <= 0
        floored + step
    } else {
        floored
    };
    from_epoch_seconds(secs).unwrap_or(instant)
}

/// Minute-resolution event counts.
///
/// Keys are always minute-truncated; counts are always positive. The store
/// only grows.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HistogramStore {
    counts: BTreeMap<NaiveDateTime, u64>,
}

impl HistogramStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse `raw` and count it. The store is untouched on a parse error.
    pub fn insert(&mut self, raw: &str) -> Result<NaiveDateTime> {
        let instant = parse_timestamp(raw)?;
        Ok(self.record(instant))
    }

    pub fn record(&mut self, instant: NaiveDateTime) -> NaiveDateTime {
        let key = truncate(instant, Frequency::MINUTE);
        self.add(key, 1);
        key
    }

    pub(crate) fn add(&mut self, key: NaiveDateTime, count: u64) {
        let slot = self.counts.entry(key).or_insert(0);
        *slot = slot.saturating_add(count);
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Number of distinct minutes.
    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn total(&self) -> u64 {
        self.counts
            .values()
            .fold(0u64, |acc, count| acc.saturating_add(*count))
    }

    pub fn count_at(&self, instant: NaiveDateTime) -> u64 {
        self.counts
            .get(&truncate(instant, Frequency::MINUTE))
            .copied()
            .unwrap_or(0)
    }

    pub fn min(&self) -> Result<NaiveDateTime> {
        self.counts
            .keys()
            .next()
            .copied()
            .ok_or(Error::EmptyData)
    }

    pub fn max(&self) -> Result<NaiveDateTime> {
        self.counts
            .keys()
            .next_back()
            .copied()
            .ok_or(Error::EmptyData)
    }

    /// Chronological `(minute, count)` pairs.
    pub fn iter(&self) -> Iter<'_> {
        Iter {
            inner: self.counts.iter(),
        }
    }
}

pub struct Iter<'a> {
    inner: btree_map::Iter<'a, NaiveDateTime, u64>,
}

impl<'a> Iterator for Iter<'a> {
    type Item = (NaiveDateTime, u64);

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(key, count)| (*key, *count))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl DoubleEndedIterator for Iter<'_> {
    fn next_back(&mut self) -> Option<Self::Item> {
        self.inner.next_back().map(|(key, count)| (*key, *count))
    }
}

impl ExactSizeIterator for Iter<'_> {}

impl<'a> IntoIterator for &'a HistogramStore {
    type Item = (NaiveDateTime, u64);
    type IntoIter = Iter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
