mod app;

use std::io;
use std::time::Duration;

use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table, TableState, Wrap},
    Frame, Terminal,
};
use app::{format_reference, format_time, format_weight, truncate, AppState, ConnectionStatus};

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> io::Result<()> {
    let base_url = std::env::var("API_URL").unwrap_or_else(|_| "http://localhost:3000".to_string());

    // Long enough to cover a server-side extraction on POST /api/refresh.
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(30))
        .build()
        .map_err(io::Error::other)?;

    let mut app = AppState::new(base_url);

    // Initial fetch before rendering
    app.refresh(&client).await;

    // Terminal setup
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut table_state = TableState::default();

    let result = run_loop(&mut terminal, &mut app, &client, &mut table_state).await;

    // Restore terminal regardless of result
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

// ---------------------------------------------------------------------------
// Main event loop
// ---------------------------------------------------------------------------

async fn run_loop(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut AppState,
    client: &reqwest::Client,
    table_state: &mut TableState,
) -> io::Result<()> {
    let poll_interval = Duration::from_secs(5);
    let mut last_tick = std::time::Instant::now();

    loop {
        terminal.draw(|f| render(f, app, table_state))?;

        let timeout = poll_interval
            .checked_sub(last_tick.elapsed())
            .unwrap_or(Duration::ZERO);

        if event::poll(timeout)? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    match key.code {
                        KeyCode::Char('q') | KeyCode::Char('Q') => return Ok(()),
                        KeyCode::Char('r') | KeyCode::Char('R') => {
                            app.refreshing = true;
                            terminal.draw(|f| render(f, app, table_state))?;
                            app.trigger_extraction(client).await;
                            last_tick = std::time::Instant::now();
                        }
                        KeyCode::Down | KeyCode::Char('j') => {
                            let max = app.prices.products.len().saturating_sub(1);
                            let next = table_state.selected().map_or(0, |i| (i + 1).min(max));
                            table_state.select(Some(next));
                        }
                        KeyCode::Up | KeyCode::Char('k') => {
                            let prev = table_state.selected().map_or(0, |i| i.saturating_sub(1));
                            table_state.select(Some(prev));
                        }
                        _ => {}
                    }
                }
            }
        }

        if last_tick.elapsed() >= poll_interval {
            app.refresh(client).await;
            last_tick = std::time::Instant::now();
        }
    }
}

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

fn render(f: &mut Frame, app: &AppState, table_state: &mut TableState) {
    let area = f.area();
    let error_height = if app.prices.error.is_some() { 3 } else { 0 };

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),            // header
            Constraint::Min(0),               // products
            Constraint::Length(error_height), // last error
            Constraint::Length(1),            // footer
        ])
        .split(area);

    render_header(f, app, chunks[0]);
    render_products(f, app, table_state, chunks[1]);
    if let Some(err) = &app.prices.error {
        render_error(f, err, chunks[2]);
    }
    render_footer(f, app, chunks[3]);
}

fn status_color(status: &str) -> Color {
    match status {
        "success" => Color::Green,
        "manual" => Color::Cyan,
        "pending" => Color::Yellow,
        "error" => Color::Red,
        _ => Color::White,
    }
}

fn render_header(f: &mut Frame, app: &AppState, area: Rect) {
    let (conn_text, conn_color) = match &app.status {
        ConnectionStatus::Connected => ("● connected".to_string(), Color::Green),
        ConnectionStatus::Connecting => ("◌ connecting".to_string(), Color::Yellow),
        ConnectionStatus::Error(e) => (format!("✗ {}", truncate(e, 40)), Color::Red),
    };

    let status = if app.refreshing { "extracting…" } else { app.prices.status.as_str() };
    let source = app.prices.source.as_deref().unwrap_or("—");

    let spans = vec![
        Span::styled(
            " Gold Price Board  ",
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
        ),
        Span::styled(conn_text, Style::default().fg(conn_color)),
        Span::raw("  │  "),
        Span::styled(
            format_reference(app.prices.gold_price_per_gram),
            Style::default().fg(Color::White).add_modifier(Modifier::BOLD),
        ),
        Span::raw("  │  "),
        Span::styled(status.to_string(), Style::default().fg(status_color(status))),
        Span::raw(format!(" ({source})")),
        Span::raw("  │  updated "),
        Span::styled(
            format_time(app.prices.last_updated.as_deref()),
            Style::default().fg(Color::White),
        ),
    ];

    let paragraph = Paragraph::new(Line::from(spans)).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::DarkGray)),
    );
    f.render_widget(paragraph, area);
}

fn render_products(f: &mut Frame, app: &AppState, state: &mut TableState, area: Rect) {
    let header_cells = ["Category", "Product", "Weight", "Type", "Price"]
        .iter()
        .map(|h| Cell::from(*h).style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)));
    let header = Row::new(header_cells).height(1);

    let mut last_category: Option<&str> = None;
    let rows: Vec<Row> = app
        .prices
        .products
        .iter()
        .map(|p| {
            // Only label the first row of each category group.
            let category = if last_category == Some(p.category.as_str()) {
                String::new()
            } else {
                p.category.clone()
            };
            last_category = Some(p.category.as_str());

            Row::new(vec![
                Cell::from(category).style(Style::default().fg(Color::Cyan)),
                Cell::from(truncate(&p.name, 24)),
                Cell::from(format_weight(p.weight)).style(Style::default().fg(Color::DarkGray)),
                Cell::from(p.product_type.clone()).style(Style::default().fg(Color::DarkGray)),
                Cell::from(p.price_formatted.clone())
                    .style(Style::default().fg(Color::Green).add_modifier(Modifier::BOLD)),
            ])
        })
        .collect();

    let title = if rows.is_empty() { " PRICES (none yet) " } else { " PRICES " };

    let table = Table::new(
        rows,
        [
            Constraint::Length(12),
            Constraint::Min(12),
            Constraint::Length(8),
            Constraint::Length(9),
            Constraint::Length(14),
        ],
    )
    .header(header)
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::DarkGray))
            .title(Span::styled(
                title,
                Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
            )),
    )
    .row_highlight_style(Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD));

    f.render_stateful_widget(table, area, state);
}

fn render_error(f: &mut Frame, err: &str, area: Rect) {
    let paragraph = Paragraph::new(Span::styled(err.to_string(), Style::default().fg(Color::Red)))
        .wrap(Wrap { trim: true })
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Red))
                .title(" LAST ERROR "),
        );
    f.render_widget(paragraph, area);
}

fn render_footer(f: &mut Frame, app: &AppState, area: Rect) {
    let since = app.last_refresh.elapsed().as_secs();
    let line = Line::from(vec![
        Span::styled(" [q] ", Style::default().fg(Color::Yellow)),
        Span::raw("quit  "),
        Span::styled("[r] ", Style::default().fg(Color::Yellow)),
        Span::raw("extract now  "),
        Span::styled("[↑↓ / j k] ", Style::default().fg(Color::Yellow)),
        Span::raw("scroll  "),
        Span::styled(
            format!("polled {since}s ago, auto-poll: 5s"),
            Style::default().fg(Color::DarkGray),
        ),
    ]);
    f.render_widget(Paragraph::new(line).style(Style::default().fg(Color::White)), area);
}
