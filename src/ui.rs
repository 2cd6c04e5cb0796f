use std::{
    io,
    time::{Duration, Instant},
};
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    symbols::Marker,
    text::{Line, Span},
    widgets::{
        canvas::{Canvas, Line as CanvasLine},
        Block, BorderType, Borders, Cell, Paragraph, Row, Sparkline, Table,
    },
    Frame, Terminal,
};

use crate::app::App;
use crate::bucket::BucketSeries;
use crate::constants::TICK_RATE_MS;
use crate::render::labels;
use crate::util::{format_count, format_share};

pub fn run(app: App<'_>) -> io::Result<()> {
    // Initialize terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let res = run_app_loop(&mut terminal, app);

    // Cleanup
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    res
}

enum Action {
    Continue,
    Quit,
}

fn run_app_loop<B: ratatui::backend::Backend>(
    terminal: &mut Terminal<B>,
    mut app: App<'_>,
) -> io::Result<()> {
    let tick_rate = Duration::from_millis(TICK_RATE_MS);
    let mut last_tick = Instant::now();

    loop {
        terminal.draw(|f| draw(f, &app))?;

        let timeout = tick_rate
            .checked_sub(last_tick.elapsed())
            .unwrap_or_else(|| Duration::from_secs(0));
        if event::poll(timeout)? {
            if let Event::Key(key) = event::read()? {
                if let Action::Quit = handle_key(&mut app, key) {
                    return Ok(());
                }
            }
        }
        if last_tick.elapsed() >= tick_rate {
            if let Err(err) = app.on_tick() {
                app.status = Some(err.to_string());
            }
            last_tick = Instant::now();
        }
    }
}

fn handle_key(app: &mut App<'_>, key: KeyEvent) -> Action {
    if key.kind != KeyEventKind::Press {
        return Action::Continue;
    }
    let result = match key.code {
        KeyCode::Char('q') | KeyCode::Esc => return Action::Quit,
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            return Action::Quit
        }
        KeyCode::Left | KeyCode::Char('h') => app.shift_days(-1),
        KeyCode::Right | KeyCode::Char('l') => app.shift_days(1),
        KeyCode::Down | KeyCode::Char('j') => app.shift_intervals(-1),
        KeyCode::Up | KeyCode::Char('k') => app.shift_intervals(1),
        KeyCode::Char('n') => app.reset_focus(),
        _ => return Action::Continue,
    };
    app.status = result.err().map(|err| err.to_string());
    Action::Continue
}

fn draw(f: &mut Frame, app: &App<'_>) {
    let stats = &app.stats;
    let titles = labels(app.focus());

    // ============= whole screen layout ============
    let main_chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(0)
        .constraints([
            Constraint::Length(16), // Focus box
            Constraint::Min(8),     // Long range
            Constraint::Length(1),  // Status bar
        ].as_ref())
        .split(f.size());

    // ============= Focus box ============
    let focus_block = Block::default()
        .borders(Borders::ALL)
        .title(format!(
            " Focus [{}] every {} min, ±{} days ",
            stats.reference.format("%Y-%m-%d %H:%M"),
            stats.config.interval_minutes,
            stats.config.window_days,
        ))
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(Color::Cyan));
    f.render_widget(focus_block.clone(), main_chunks[0]);

    let inner_area = focus_block.inner(main_chunks[0]);
    let focus_chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(75), Constraint::Percentage(25)].as_ref())
        .split(inner_area);

    let chart_chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)].as_ref())
        .split(focus_chunks[0]);

    draw_bars(f, chart_chunks[0], &stats.intraday, &titles[0], Color::Red);
    draw_bars(f, chart_chunks[1], &stats.daily, &titles[1], Color::Blue);

    // textual summary on the right
    let summary_chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)].as_ref())
        .split(focus_chunks[1]);

    f.render_widget(summary(&stats.intraday, "%H:%M", Color::Red), summary_chunks[0]);
    f.render_widget(summary(&stats.daily, "%d %b", Color::Blue), summary_chunks[1]);

    // ============= Long range ============
    let range_chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(70), Constraint::Percentage(30)].as_ref())
        .split(main_chunks[1]);

    let month_counts = stats.monthly.counts();
    let first_month = stats.monthly.buckets().first().map(|b| b.start.format("%b %Y").to_string());
    let last_month = stats.monthly.buckets().last().map(|b| b.start.format("%b %Y").to_string());
    let months = Sparkline::default()
        .block(
            Block::default()
                .title(format!(
                    " {} [{} .. {}] ",
                    titles[2],
                    first_month.unwrap_or_default(),
                    last_month.unwrap_or_default()
                ))
                .borders(Borders::ALL)
                .border_type(BorderType::Rounded),
        )
        .data(&month_counts)
        .style(Style::default().fg(Color::Green));
    f.render_widget(months, range_chunks[0]);

    let header_cells = ["Year", "Events", "Share"]
        .iter()
        .map(|h| Cell::from(*h).style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)));
    let header = Row::new(header_cells)
        .style(Style::default().bg(Color::Rgb(40, 40, 40)))
        .height(1)
        .bottom_margin(0);

    let grand_total = stats.yearly.total();
    let rows = stats.yearly.iter().rev().map(|bucket| {
        let color = if bucket.count == 0 { Color::DarkGray } else { Color::White };
        Row::new(vec![
            Cell::from(bucket.start.format("%Y").to_string()),
            Cell::from(format_count(bucket.count)).style(Style::default().fg(color)),
            Cell::from(format_share(bucket.count, grand_total)).style(Style::default().fg(Color::Cyan)),
        ])
        .height(1)
    });

    let table = Table::new(
        rows,
        [
            Constraint::Percentage(30),
            Constraint::Percentage(40),
            Constraint::Percentage(30),
        ],
    )
    .header(header)
    .block(
        Block::default()
            .title(format!(" {} ", titles[3]))
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded),
    );
    f.render_widget(table, range_chunks[1]);

    // ============ Bottom Status Bar ============
    let status = match &app.status {
        Some(message) => Span::styled(format!(" {message} "), Style::default().fg(Color::Red)),
        None => Span::styled(
            format!(
                " {} events in {} minutes ",
                format_count(app.store().total()),
                format_count(app.store().len() as u64)
            ),
            Style::default().fg(Color::DarkGray),
        ),
    };
    let status_content = Line::from(vec![
        Span::styled(" FOCUS ", Style::default().bg(Color::White).fg(Color::Black).add_modifier(Modifier::BOLD)),
        Span::raw(" ←/→ day | ↑/↓ interval | n now | q quit |"),
        status,
    ]);
    let status_bar = Paragraph::new(status_content).style(Style::default().bg(Color::Rgb(20, 20, 20)));
    f.render_widget(status_bar, main_chunks[2]);
}

fn draw_bars(f: &mut Frame, area: Rect, series: &BucketSeries, title: &str, color: Color) {
    let max = series.iter().map(|b| b.count).max().unwrap_or(0).max(1) as f64;
    let x_limit = series.len() as f64;

    let canvas = Canvas::default()
        .block(Block::default().title(format!(" {title} ")).title_style(Style::default().fg(color)))
        .marker(Marker::Braille)
        .x_bounds([0.0, x_limit])
        .y_bounds([0.0, max])
        .paint(|ctx| {
            for (i, bucket) in series.iter().enumerate() {
                ctx.draw(&CanvasLine {
                    x1: i as f64,
                    y1: 0.0,
                    x2: i as f64,
                    y2: bucket.count as f64,
                    color,
                });
            }
        });
    f.render_widget(canvas, area);
}

fn summary<'a>(series: &'a BucketSeries, peak_format: &str, color: Color) -> Paragraph<'a> {
    let total = series.total();
    let peak = series
        .peak()
        .filter(|b| b.count > 0)
        .map(|b| format!("{} @{}", format_count(b.count), b.start.format(peak_format)))
        .unwrap_or_else(|| "-".to_string());

    let text = vec![
        Line::from(vec![
            Span::raw("Σ "),
            Span::styled(format_count(total), Style::default().fg(Color::White).add_modifier(Modifier::BOLD)),
        ]),
        Line::from(vec![Span::styled("  Peak: ", Style::default().fg(Color::DarkGray)), Span::raw(peak)]),
        Line::from(vec![
            Span::styled("  Slots: ", Style::default().fg(Color::DarkGray)),
            Span::raw(series.len().to_string()),
        ]),
    ];
    Paragraph::new(text).block(Block::default().style(Style::default().fg(color)))
}
