//! Plain-text and JSON sinks for [`Statistics`].

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::aggregate::Statistics;
use crate::bucket::BucketSeries;
use crate::error::Result;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Titles for the four series, finest first. `focus` is the reference the
/// user asked for, `None` when it defaulted to now.
pub fn labels(focus: Option<NaiveDateTime>) -> [String; 4] {
    match focus {
        None => [
            "Today".to_string(),
            "Around today".to_string(),
            "By month".to_string(),
            "By year".to_string(),
        ],
        Some(focus) => {
            let day = focus.format("%d %B %Y").to_string();
            [
                day.clone(),
                format!("Around {day}"),
                "By month".to_string(),
                "By year".to_string(),
            ]
        }
    }
}

pub fn write_text<W: Write>(
    out: &mut W,
    stats: &Statistics,
    focus: Option<NaiveDateTime>,
) -> Result<()> {
    for (label, series) in labels(focus).iter().zip(stats.series()) {
        writeln!(out, "{label}:")?;
        let format = series.kind().key_format();
        for bucket in series.iter() {
            writeln!(out, "    {}:    {}", bucket.start.format(format), bucket.count)?;
        }
    }
    Ok(())
}

#[derive(Serialize)]
struct Document<'a> {
    reference: NaiveDateTime,
    interval_minutes: i64,
    window_days: i64,
    series: Vec<LabelledSeries<'a>>,
}

#[derive(Serialize)]
struct LabelledSeries<'a> {
    label: String,
    #[serde(flatten)]
    series: &'a BucketSeries,
}

pub fn write_json<W: Write>(
    out: &mut W,
    stats: &Statistics,
    focus: Option<NaiveDateTime>,
) -> Result<()> {
    let document = Document {
        reference: stats.reference,
        interval_minutes: stats.config.interval_minutes,
        window_days: stats.config.window_days,
        series: labels(focus)
            .into_iter()
            .zip(stats.series())
            .map(|(label, series)| LabelledSeries { label, series })
            .collect(),
    };
    serde_json::to_writer_pretty(&mut *out, &document).map_err(std::io::Error::from)?;
    writeln!(out)?;
    Ok(())
}

pub fn write<W: Write>(
    out: &mut W,
    stats: &Statistics,
    focus: Option<NaiveDateTime>,
    format: OutputFormat,
) -> Result<()> {
    match format {
        OutputFormat::Text => write_text(out, stats, focus),
        OutputFormat::Json => write_json(out, stats, focus),
    }
}

/// Replace the contents of `path` with a freshly rendered document.
pub fn write_to_path(
    path: &Path,
    stats: &Statistics,
    focus: Option<NaiveDateTime>,
    format: OutputFormat,
) -> Result<()> {
    let mut out = BufWriter::new(File::create(path)?);
    write(&mut out, stats, focus, format)?;
    out.flush()?;
    Ok(())
}
