use std::fs::File;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::{info, warn};

use timehist::app::App;
use timehist::config::{Overrides, Settings};
use timehist::logging::{init_logging, LogOptions};
use timehist::render::{self, OutputFormat};
use timehist::{aggregate, ingest_reader, parse_focus, snapshot, ui, HistogramStore, ParsePolicy};

#[derive(Parser, Debug)]
#[command(
    name = "timehist",
    version,
    about = "Count events per minute and explore them at several time scales"
)]
struct Cli {
    /// File with one raw timestamp per line ('-' for stdin), or a snapshot
    /// written by --export when --snapshot is given
    input: String,

    /// Read INPUT as a snapshot instead of raw timestamps
    #[arg(long)]
    snapshot: bool,

    /// Write the rendered series to FILE instead of stdout
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Date around which the detailed analysis is performed
    #[arg(
        short = 'f',
        long = "focus-on",
        visible_alias = "find",
        value_name = "DATE",
        default_value = "now"
    )]
    focus: String,

    /// Days before and after the focus date to analyze [default: 15]
    #[arg(short, long, value_name = "N", allow_negative_numbers = true)]
    days: Option<i64>,

    /// Minutes per slice of the focus day [default: 20]
    #[arg(short, long, value_name = "N", allow_negative_numbers = true)]
    minutes: Option<i64>,

    /// Browse the data in a terminal session, moving the focus with the keyboard
    #[arg(short, long)]
    interactive: bool,

    /// Save the ingested histogram to FILE for later runs
    #[arg(short, long, value_name = "FILE")]
    export: Option<PathBuf>,

    #[arg(long, value_enum)]
    format: Option<OutputFormat>,

    /// What to do with lines that are not valid timestamps
    #[arg(long, value_enum)]
    on_parse_error: Option<ParsePolicy>,

    /// TOML file with default settings
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    #[arg(long, value_name = "FILE")]
    log_file: Option<PathBuf>,

    #[arg(long)]
    json_logs: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    init_logging(&LogOptions {
        json: cli.json_logs,
        file: cli.log_file.clone(),
        interactive: cli.interactive,
    });

    let mut settings = match &cli.config {
        Some(path) => Settings::from_file(path)?,
        None => Settings::default(),
    };
    settings.apply_overrides(&Overrides {
        days: cli.days,
        minutes: cli.minutes,
        on_parse_error: cli.on_parse_error,
        format: cli.format,
    });
    let window = settings.window()?;
    let focus = parse_focus(&cli.focus)
        .with_context(|| format!("invalid focus date '{}'", cli.focus))?;

    let store = if cli.snapshot {
        load_snapshot(&cli.input)?
    } else {
        load_raw(&cli.input, settings.ingest.on_parse_error)?
    };

    if let Some(path) = &cli.export {
        snapshot::write_snapshot(path, &store)
            .with_context(|| format!("failed to export to {}", path.display()))?;
    }

    if cli.interactive {
        let output = cli.output.clone().map(|path| (path, settings.output.format));
        let app = App::new(&store, window, focus, output)?;
        ui::run(app)?;
        return Ok(());
    }

    let stats = aggregate(&store, focus, &window)?;
    match &cli.output {
        Some(path) => render::write_to_path(path, &stats, focus, settings.output.format)
            .with_context(|| format!("failed to write {}", path.display()))?,
        None => {
            let stdout = io::stdout();
            let mut out = stdout.lock();
            render::write(&mut out, &stats, focus, settings.output.format)?;
            out.flush()?;
        }
    }
    Ok(())
}

fn load_snapshot(input: &str) -> anyhow::Result<HistogramStore> {
    if input == "-" {
        let mut bytes = Vec::new();
        io::stdin().lock().read_to_end(&mut bytes)?;
        return Ok(HistogramStore::deserialize(&bytes)?);
    }
    snapshot::read_snapshot(Path::new(input))
        .with_context(|| format!("failed to read snapshot {input}"))
}

fn load_raw(input: &str, policy: ParsePolicy) -> anyhow::Result<HistogramStore> {
    // First Ctrl-C ends ingestion early, a second one exits.
    let stop = Arc::new(AtomicBool::new(false));
    let handler_flag = Arc::clone(&stop);
    if let Err(e) = ctrlc::set_handler(move || {
        if handler_flag.swap(true, Ordering::SeqCst) {
            std::process::exit(130);
        }
    }) {
        warn!(error = %e, "could not install Ctrl-C handler");
    }

    let reader: Box<dyn Read + Send> = if input == "-" {
        Box::new(io::stdin())
    } else {
        Box::new(File::open(input).with_context(|| format!("failed to open {input}"))?)
    };

    let mut store = HistogramStore::new();
    let report = ingest_reader(&mut store, reader, policy, &stop)
        .with_context(|| format!("failed to ingest {input}"))?;
    if report.interrupted {
        warn!(
            accepted = report.accepted,
            "ingestion interrupted, analyzing partial data"
        );
    }
    info!(events = store.total(), minutes = store.len(), "histogram ready");
    Ok(store)
}
