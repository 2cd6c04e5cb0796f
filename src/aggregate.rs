use chrono::{NaiveDateTime, Utc};
use serde::Serialize;
use tracing::debug;

use crate::bucket::{BucketSeries, DenseSeries, Scale, SeriesKind};
use crate::constants::{
    DEFAULT_INTERVAL_MINUTES, DEFAULT_WINDOW_DAYS, MAX_WINDOW_DAYS, MINUTES_PER_DAY,
    SECONDS_PER_DAY, SECONDS_PER_MINUTE,
};
use crate::error::{Error, Result};
use crate::store::{epoch_seconds, truncate, Frequency, HistogramStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct WindowConfig {
    /// Width of an intraday bucket.
    pub interval_minutes: i64,
    /// Days shown on each side of the focus date.
    pub window_days: i64,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            interval_minutes: DEFAULT_INTERVAL_MINUTES,
            window_days: DEFAULT_WINDOW_DAYS,
        }
    }
}

impl WindowConfig {
    pub fn new(interval_minutes: i64, window_days: i64) -> Result<Self> {
        let config = Self {
            interval_minutes,
            window_days,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.interval_minutes <= 0 {
            return Err(Error::InvalidConfig(format!(
                "interval must be > 0 minutes, got {}",
                self.interval_minutes
            )));
        }
        if self.interval_minutes.checked_mul(SECONDS_PER_MINUTE).is_none() {
            return Err(Error::InvalidConfig(format!(
                "interval of {} minutes overflows",
                self.interval_minutes
            )));
        }
        if self.window_days < 0 {
            return Err(Error::InvalidConfig(format!(
                "window must be >= 0 days, got {}",
                self.window_days
            )));
        }
        if self.window_days > MAX_WINDOW_DAYS {
            return Err(Error::InvalidConfig(format!(
                "window must be <= {MAX_WINDOW_DAYS} days, got {}",
                self.window_days
            )));
        }
        Ok(())
    }

    pub fn intraday_buckets(&self) -> usize {
        (MINUTES_PER_DAY / self.interval_minutes + 1) as usize
    }

    pub fn daily_buckets(&self) -> usize {
        (2 * self.window_days + 1) as usize
    }
}

/// The four views produced by one aggregation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Statistics {
    pub reference: NaiveDateTime,
    pub config: WindowConfig,
    pub intraday: BucketSeries,
    pub daily: BucketSeries,
    pub monthly: BucketSeries,
    pub yearly: BucketSeries,
}

impl Statistics {
    /// Finest to coarsest.
    pub fn series(&self) -> [&BucketSeries; 4] {
        [&self.intraday, &self.daily, &self.monthly, &self.yearly]
    }
}

/// Aggregate around `reference`, or around the current UTC minute when absent.
pub fn aggregate(
    store: &HistogramStore,
    reference: Option<NaiveDateTime>,
    config: &WindowConfig,
) -> Result<Statistics> {
    let reference = reference.unwrap_or_else(|| Utc::now().naive_utc());
    aggregate_at(store, reference, config)
}

/// Build the intraday, daily, monthly and yearly series in a single pass over
/// the store.
///
/// Intraday edges sit on `reference + k * interval` and the series starts at
/// the first such edge on the reference's calendar day, covering
/// `1440 / interval + 1` buckets. The daily series covers `window_days` days
/// on each side of the reference date. Monthly and yearly series span the
/// whole store regardless of the reference. Events outside the intraday or
/// daily windows only count toward the coarser series.
pub fn aggregate_at(
    store: &HistogramStore,
    reference: NaiveDateTime,
    config: &WindowConfig,
) -> Result<Statistics> {
    config.validate()?;
    let oldest = store.min()?;
    let newest = store.max()?;
    let reference = truncate(reference, Frequency::MINUTE);

    let mut intraday = intraday_axis(reference, config);
    let mut daily = daily_axis(reference, config);
    let mut monthly = DenseSeries::covering(Scale::Month, oldest, newest);
    let mut yearly = DenseSeries::covering(Scale::Year, oldest, newest);

    let mut in_day = 0usize;
    let mut in_window = 0usize;
    for (instant, count) in store {
        yearly.record(instant, count);
        monthly.record(instant, count);
        if daily.record(instant, count) {
            in_window += 1;
        }
        if intraday.record(instant, count) {
            in_day += 1;
        }
    }

    debug!(
        %reference,
        keys = store.len(),
        in_window,
        in_day,
        months = monthly.len(),
        years = yearly.len(),
        "aggregated histogram"
    );

    Ok(Statistics {
        reference,
        config: *config,
        intraday: intraday.finish(SeriesKind::Intraday)?,
        daily: daily.finish(SeriesKind::Daily)?,
        monthly: monthly.finish(SeriesKind::Monthly)?,
        yearly: yearly.finish(SeriesKind::Yearly)?,
    })
}

fn intraday_axis(reference: NaiveDateTime, config: &WindowConfig) -> DenseSeries {
    let width = config.interval_minutes * SECONDS_PER_MINUTE;
    let anchor = epoch_seconds(reference);
    let since_midnight = anchor.rem_euclid(SECONDS_PER_DAY);
    let first = -(since_midnight / width);
    DenseSeries::spanning(
        Scale::Interval { anchor, width },
        first,
        config.intraday_buckets(),
    )
}

fn daily_axis(reference: NaiveDateTime, config: &WindowConfig) -> DenseSeries {
    let scale = Scale::Interval {
        anchor: 0,
        width: SECONDS_PER_DAY,
    };
    let first = scale.ordinal(reference) - config.window_days;
    DenseSeries::spanning(scale, first, config.daily_buckets())
}
