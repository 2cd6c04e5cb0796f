use std::fs;
use std::path::Path;

use anyhow::Context;
use serde::Deserialize;

use crate::aggregate::WindowConfig;
use crate::constants::{DEFAULT_INTERVAL_MINUTES, DEFAULT_WINDOW_DAYS};
use crate::error::Result;
use crate::ingest::ParsePolicy;
use crate::render::OutputFormat;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct WindowSettings {
    /// Days analyzed on each side of the focus date.
    pub days: i64,
    /// Width of the intraday slices.
    pub minutes: i64,
}

impl Default for WindowSettings {
    fn default() -> Self {
        Self {
            days: DEFAULT_WINDOW_DAYS,
            minutes: DEFAULT_INTERVAL_MINUTES,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct IngestSettings {
    pub on_parse_error: ParsePolicy,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct OutputSettings {
    pub format: OutputFormat,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub window: WindowSettings,
    pub ingest: IngestSettings,
    pub output: OutputSettings,
}

/// Command-line values that take precedence over the file.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub days: Option<i64>,
    pub minutes: Option<i64>,
    pub on_parse_error: Option<ParsePolicy>,
    pub format: Option<OutputFormat>,
}

impl Settings {
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        Self::from_toml(&contents)
            .with_context(|| format!("invalid config file {}", path.display()))
    }

    pub fn from_toml(contents: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    pub fn apply_overrides(&mut self, overrides: &Overrides) {
        if let Some(days) = overrides.days {
            self.window.days = days;
        }
        if let Some(minutes) = overrides.minutes {
            self.window.minutes = minutes;
        }
        if let Some(policy) = overrides.on_parse_error {
            self.ingest.on_parse_error = policy;
        }
        if let Some(format) = overrides.format {
            self.output.format = format;
        }
    }

    pub fn window(&self) -> Result<WindowConfig> {
        WindowConfig::new(self.window.minutes, self.window.days)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    #[test]
    fn empty_file_yields_defaults() {
        let settings = Settings::from_toml("").unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.window().unwrap(), WindowConfig::default());
    }

    #[test]
    fn reads_every_section() {
        let settings = Settings::from_toml(
            r#"
            [window]
            days = 3
            minutes = 15

            [ingest]
            on_parse_error = "abort"

            [output]
            format = "json"
            "#,
        )
        .unwrap();
        assert_eq!(settings.window.days, 3);
        assert_eq!(settings.window.minutes, 15);
        assert_eq!(settings.ingest.on_parse_error, ParsePolicy::Abort);
        assert_eq!(settings.output.format, OutputFormat::Json);
    }

    #[test]
    fn partial_sections_keep_defaults() {
        let settings = Settings::from_toml("[window]\nminutes = 5\n").unwrap();
        assert_eq!(settings.window.minutes, 5);
        assert_eq!(settings.window.days, DEFAULT_WINDOW_DAYS);
    }

    #[test]
    fn unknown_sections_are_rejected() {
        assert!(Settings::from_toml("[render]\ncolor = true\n").is_err());
    }

    #[test]
    fn overrides_win_over_file() {
        let mut settings = Settings::from_toml("[window]\ndays = 3\nminutes = 15\n").unwrap();
        settings.apply_overrides(&Overrides {
            minutes: Some(30),
            format: Some(OutputFormat::Json),
            ..Default::default()
        });
        assert_eq!(settings.window.days, 3);
        assert_eq!(settings.window.minutes, 30);
        assert_eq!(settings.output.format, OutputFormat::Json);
    }

    #[test]
    fn invalid_window_surfaces_as_config_error() {
        let mut settings = Settings::default();
        settings.window.minutes = 0;
        assert!(matches!(settings.window(), Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn missing_file_mentions_path() {
        let err = Settings::from_file(Path::new("/nonexistent/timehist.toml")).unwrap_err();
        assert!(format!("{err:#}").contains("/nonexistent/timehist.toml"));
    }
}
