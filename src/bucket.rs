//! Dense, zero-filled bucket series.
//!
//! A [`Scale`] maps instants onto integer ordinals; a [`DenseSeries`] is a
//! pre-sized run of counters over a contiguous ordinal span. Every series the
//! aggregator emits, whatever its resolution, is built with these two types.

use chrono::{Datelike, NaiveDate, NaiveDateTime};
use serde::Serialize;

use crate::error::{Error, Result};
use crate::store::{epoch_seconds, from_epoch_seconds};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SeriesKind {
    Intraday,
    Daily,
    Monthly,
    Yearly,
}

impl SeriesKind {
    pub const ALL: [SeriesKind; 4] = [
        SeriesKind::Intraday,
        SeriesKind::Daily,
        SeriesKind::Monthly,
        SeriesKind::Yearly,
    ];

    /// `strftime` pattern for a bucket key at this resolution.
    pub fn key_format(&self) -> &'static str {
        match self {
            SeriesKind::Intraday => "%Y-%m-%d %H:%M",
            SeriesKind::Daily => "%Y-%m-%d",
            SeriesKind::Monthly => "%Y-%m",
            SeriesKind::Yearly => "%Y",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Bucket {
    pub start: NaiveDateTime,
    pub count: u64,
}

/// Chronologically ascending buckets with no gaps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BucketSeries {
    kind: SeriesKind,
    buckets: Vec<Bucket>,
}

impl BucketSeries {
    pub fn kind(&self) -> SeriesKind {
        self.kind
    }

    pub fn buckets(&self) -> &[Bucket] {
        &self.buckets
    }

    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Bucket> {
        self.buckets.iter()
    }

    pub fn counts(&self) -> Vec<u64> {
        self.buckets.iter().map(|bucket| bucket.count).collect()
    }

    pub fn total(&self) -> u64 {
        self.buckets
            .iter()
            .fold(0u64, |acc, bucket| acc.saturating_add(bucket.count))
    }

    /// Busiest bucket; the earliest one wins ties.
    pub fn peak(&self) -> Option<&Bucket> {
        self.buckets
            .iter()
            .fold(None, |best: Option<&Bucket>, bucket| match best {
                Some(current) if current.count >= bucket.count => Some(current),
                _ => Some(bucket),
            })
    }

    pub fn get(&self, start: NaiveDateTime) -> Option<u64> {
        self.buckets
            .binary_search_by_key(&start, |bucket| bucket.start)
            .ok()
            .map(|index| self.buckets[index].count)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scale {
    /// Fixed-width buckets whose edges fall on `anchor + k * width` (seconds).
    Interval { anchor: i64, width: i64 },
    Month,
    Year,
}

impl Scale {
    pub fn ordinal(&self, instant: NaiveDateTime) -> i64 {
        match *self {
            Scale::Interval { anchor, width } => (epoch_seconds(instant) - anchor).div_euclid(width),
            Scale::Month => i64::from(instant.year()) * 12 + i64::from(instant.month0()),
            Scale::Year => i64::from(instant.year()),
        }
    }

    pub fn start_of(&self, ordinal: i64) -> Result<NaiveDateTime> {
        match *self {
            Scale::Interval { anchor, width } => {
                let secs = ordinal
                    .checked_mul(width)
                    .and_then(|offset| offset.checked_add(anchor))
                    .ok_or(Error::OutOfRange(ordinal))?;
                from_epoch_seconds(secs)
            }
            Scale::Month => {
                let month0 = ordinal.rem_euclid(12) as u32;
                calendar_start(ordinal.div_euclid(12), month0 + 1)
            }
            Scale::Year => calendar_start(ordinal, 1),
        }
    }
}

fn calendar_start(year: i64, month: u32) -> Result<NaiveDateTime> {
    i32::try_from(year)
        .ok()
        .and_then(|year| NaiveDate::from_ymd_opt(year, month, 1))
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .ok_or(Error::OutOfRange(year))
}

/// Counters for a contiguous ordinal span, allocated up front.
#[derive(Debug, Clone)]
pub struct DenseSeries {
    scale: Scale,
    first: i64,
    counts: Vec<u64>,
}

impl DenseSeries {
    pub fn spanning(scale: Scale, first: i64, len: usize) -> Self {
        Self {
            scale,
            first,
            counts: vec![0; len],
        }
    }

    /// Every bucket from the one holding `lo` through the one holding `hi`.
    pub fn covering(scale: Scale, lo: NaiveDateTime, hi: NaiveDateTime) -> Self {
        let first = scale.ordinal(lo);
        let last = scale.ordinal(hi);
        let len = usize::try_from(last - first + 1).unwrap_or(0);
        Self::spanning(scale, first, len)
    }

    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    pub fn position(&self, instant: NaiveDateTime) -> Option<usize> {
        let offset = self.scale.ordinal(instant) - self.first;
        usize::try_from(offset)
            .ok()
            .filter(|index| *index < self.counts.len())
    }

    /// Add `count` to the bucket holding `instant`. Returns `false` and
    /// leaves the series untouched when the instant is outside the span.
    pub fn record(&mut self, instant: NaiveDateTime, count: u64) -> bool {
        match self.position(instant) {
            Some(index) => {
                let slot = &mut self.counts[index];
                *slot = slot.saturating_add(count);
                true
            }
            None => false,
        }
    }

    pub fn finish(self, kind: SeriesKind) -> Result<BucketSeries> {
        let scale = self.scale;
        let first = self.first;
        let buckets = self
            .counts
            .into_iter()
            .enumerate()
            .map(|(index, count)| -> Result<Bucket> {
                Ok(Bucket {
                    start: scale.start_of(first + index as i64)?,
                    count,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(BucketSeries { kind, buckets })
    }
}
