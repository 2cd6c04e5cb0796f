use std::path::PathBuf;

use tracing_subscriber::{fmt, EnvFilter};

#[derive(Debug, Clone, Default)]
pub struct LogOptions {
    /// Emit one JSON object per event instead of human-readable lines.
    pub json: bool,
    /// Append to this file instead of stderr.
    pub file: Option<PathBuf>,
    /// The terminal belongs to the interactive session.
    pub interactive: bool,
}

impl LogOptions {
    fn default_directive(&self) -> &'static str {
        if self.interactive && self.file.is_none() {
            "off"
        } else {
            "info"
        }
    }
}

/// Install the global subscriber. `RUST_LOG` overrides the default level.
pub fn init_logging(options: &LogOptions) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(options.default_directive()));
    let builder = fmt().with_env_filter(filter).with_target(false);

    match (&options.file, options.json) {
        (Some(path), json) => {
            let directory = path
                .parent()
                .filter(|dir| !dir.as_os_str().is_empty())
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("."));
            let file_name = path
                .file_name()
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("timehist.log"));
            let appender = tracing_appender::rolling::never(directory, file_name);
            if json {
                builder
                    .json()
                    .flatten_event(true)
                    .with_writer(appender)
                    .init();
            } else {
                builder.with_ansi(false).with_writer(appender).init();
            }
        }
        (None, true) => builder
            .json()
            .flatten_event(true)
            .with_writer(std::io::stderr)
            .init(),
        (None, false) => builder.with_writer(std::io::stderr).init(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interactive_sessions_stay_quiet_without_a_file() {
        let quiet = LogOptions {
            interactive: true,
            ..Default::default()
        };
        assert_eq!(quiet.default_directive(), "off");

        let to_file = LogOptions {
            interactive: true,
            file: Some(PathBuf::from("session.log")),
            ..Default::default()
        };
        assert_eq!(to_file.default_directive(), "info");
        assert_eq!(LogOptions::default().default_directive(), "info");
    }
}
