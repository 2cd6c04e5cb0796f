use std::path::PathBuf;

use chrono::{NaiveDateTime, Utc};
use tracing::info;

use crate::aggregate::{aggregate, Statistics, WindowConfig};
use crate::constants::{SECONDS_PER_DAY, SECONDS_PER_MINUTE};
use crate::error::{Error, Result};
use crate::render::{self, OutputFormat};
use crate::store::{epoch_seconds, from_epoch_seconds, truncate, Frequency, HistogramStore};

/// State of an interactive session: one immutable store, a moving focus.
pub struct App<'a> {
    store: &'a HistogramStore,
    config: WindowConfig,
    // None follows the wall clock
    focus: Option<NaiveDateTime>,
    output: Option<(PathBuf, OutputFormat)>,
    pub stats: Statistics,
    pub status: Option<String>,
}

impl<'a> App<'a> {
    pub fn new(
        store: &'a HistogramStore,
        config: WindowConfig,
        focus: Option<NaiveDateTime>,
        output: Option<(PathBuf, OutputFormat)>,
    ) -> Result<Self> {
        let stats = aggregate(store, focus, &config)?;
        let app = Self {
            store,
            config,
            focus,
            output,
            stats,
            status: None,
        };
        app.publish()?;
        Ok(app)
    }

    pub fn store(&self) -> &HistogramStore {
        self.store
    }

    pub fn focus(&self) -> Option<NaiveDateTime> {
        self.focus
    }

    pub fn shift_days(&mut self, days: i64) -> Result<()> {
        self.shift_seconds(days.checked_mul(SECONDS_PER_DAY))
    }

    pub fn shift_intervals(&mut self, intervals: i64) -> Result<()> {
        let width = self.config.interval_minutes * SECONDS_PER_MINUTE;
        self.shift_seconds(intervals.checked_mul(width))
    }

    /// Follow the wall clock again.
    pub fn reset_focus(&mut self) -> Result<()> {
        self.focus = None;
        self.refresh()
    }

    /// Re-aggregate when following the wall clock and the minute has moved.
    pub fn on_tick(&mut self) -> Result<()> {
        if self.focus.is_some() {
            return Ok(());
        }
        let now = truncate(Utc::now().naive_utc(), Frequency::MINUTE);
        if now != self.stats.reference {
            self.refresh()?;
        }
        Ok(())
    }

    pub fn refresh(&mut self) -> Result<()> {
        let stats = aggregate(self.store, self.focus, &self.config)?;
        self.stats = stats;
        self.publish()?;
        info!(reference = %self.stats.reference, "refocused");
        Ok(())
    }

    fn shift_seconds(&mut self, delta: Option<i64>) -> Result<()> {
        let current = epoch_seconds(self.stats.reference);
        let target = delta
            .and_then(|delta| current.checked_add(delta))
            .ok_or(Error::OutOfRange(current))?;
        self.focus = Some(from_epoch_seconds(target)?);
        self.refresh()
    }

    fn publish(&self) -> Result<()> {
        if let Some((path, format)) = &self.output {
            render::write_to_path(path, &self.stats, self.focus, *format)?;
        }
        Ok(())
    }
}
