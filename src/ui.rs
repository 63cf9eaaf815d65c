use crate::app::{
    App, Command, Focus, HistoryStatus, NoticeLevel, RateStatus, EMPTY_FAVORITES_TEXT,
};
use crate::chart::HistoryChart;
use crate::runtime::{dispatch, Services};
use crate::storage::KeyValueStore;
use anyhow::Result;
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    symbols,
    text::{Line, Span},
    widgets::{Axis, Block, Borders, Chart, Dataset, GraphType, List, ListItem, ListState, Paragraph},
    Frame, Terminal,
};
use std::io;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::mpsc::unbounded_channel;

/// Input poll interval; network results are drained once per tick
const TICK: Duration = Duration::from_millis(100);

pub fn run_ui<S: KeyValueStore>(app: &mut App<S>, services: &Services, handle: &Handle) -> Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Run the app
    let res = run_app(&mut terminal, app, services, handle);

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        log::error!("UI loop failed: {:?}", err);
        println!("Error: {:?}", err);
    }

    Ok(())
}

fn run_app<B: ratatui::backend::Backend, S: KeyValueStore>(
    terminal: &mut Terminal<B>,
    app: &mut App<S>,
    services: &Services,
    handle: &Handle,
) -> Result<()> {
    let (tx, mut rx) = unbounded_channel();

    for command in app.start() {
        dispatch(handle, services, &tx, command);
    }

    loop {
        terminal.draw(|f| ui(f, &*app))?;

        while let Ok(message) = rx.try_recv() {
            for command in app.update(message) {
                dispatch(handle, services, &tx, command);
            }
        }

        if event::poll(TICK)? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    for command in handle_key(app, key) {
                        dispatch(handle, services, &tx, command);
                    }
                }
            }
        }

        if app.should_quit {
            return Ok(());
        }
    }
}

pub fn handle_key<S: KeyValueStore>(app: &mut App<S>, key: KeyEvent) -> Vec<Command> {
    let command = match key.code {
        KeyCode::Esc | KeyCode::Char('q') => {
            app.quit();
            None
        }
        KeyCode::Tab => {
            app.next_focus();
            None
        }
        KeyCode::BackTab => {
            app.previous_focus();
            None
        }
        KeyCode::Up | KeyCode::Char('k') => app.move_selection(-1),
        KeyCode::Down | KeyCode::Char('j') => app.move_selection(1),
        KeyCode::Enter => app.activate(),
        KeyCode::Char('c') => Some(app.convert()),
        KeyCode::Char('s') => Some(app.swap()),
        KeyCode::Char('h') => Some(app.fetch_history()),
        KeyCode::Char('f') => {
            app.add_favorite();
            None
        }
        KeyCode::Char('d') | KeyCode::Delete => {
            app.remove_selected_favorite();
            None
        }
        KeyCode::Backspace if app.focus == Focus::Amount => app.pop_amount_char(),
        KeyCode::Char(c) if app.focus == Focus::Amount => app.push_amount_char(c),
        _ => None,
    };

    command.into_iter().collect()
}

fn ui<S: KeyValueStore>(f: &mut Frame, app: &App<S>) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header
            Constraint::Min(0),    // Content area
            Constraint::Length(3), // Status bar
        ])
        .split(f.size());

    render_header(f, chunks[0], app);

    let content_chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage(42), // Converter + favorites
            Constraint::Percentage(58), // History
        ])
        .split(chunks[1]);

    let left_chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(9), Constraint::Min(0)])
        .split(content_chunks[0]);

    render_converter(f, left_chunks[0], app);
    render_favorites(f, left_chunks[1], app);
    render_history(f, content_chunks[1], app);

    render_status_bar(f, chunks[2], app);
}

fn field_style(focused: bool) -> Style {
    if focused {
        Style::default()
            .fg(Color::Yellow)
            .add_modifier(Modifier::BOLD | Modifier::UNDERLINED)
    } else {
        Style::default().fg(Color::White)
    }
}

fn label(text: &str) -> Span<'_> {
    Span::styled(text, Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD))
}

fn currency_label<S: KeyValueStore>(app: &App<S>, code: &crate::currency::CurrencyCode) -> String {
    app.currencies
        .iter()
        .find(|c| &c.code == code)
        .map(|c| c.label())
        .unwrap_or_else(|| code.to_string())
}

fn render_header<S: KeyValueStore>(f: &mut Frame, area: Rect, app: &App<S>) {
    let spans = vec![
        Span::styled(
            "Currency Converter",
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        ),
        Span::raw("  |  "),
        Span::styled(app.pair().label(), Style::default().fg(Color::White)),
        Span::raw("  |  "),
        Span::styled(
            format!("★ {}", app.favorites.len()),
            Style::default().fg(Color::Yellow),
        ),
        Span::raw("  |  "),
        Span::styled(
            format!("{} currencies", app.currencies.len()),
            Style::default().fg(Color::DarkGray),
        ),
    ];

    let header = Paragraph::new(vec![Line::from(spans)]).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Cyan)),
    );

    f.render_widget(header, area);
}

fn render_converter<S: KeyValueStore>(f: &mut Frame, area: Rect, app: &App<S>) {
    let amount_text = if app.focus == Focus::Amount {
        format!("{}_", app.amount)
    } else {
        app.amount.clone()
    };

    let rate_style = match app.rate {
        RateStatus::Error => Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
        RateStatus::Displayed(_) => Style::default().fg(Color::Green),
        RateStatus::Idle | RateStatus::Loading => Style::default().fg(Color::DarkGray),
    };

    let content = vec![
        Line::from(vec![
            label("  From:   "),
            Span::styled(currency_label(app, &app.from), field_style(app.focus == Focus::From)),
        ]),
        Line::from(vec![
            label("  To:     "),
            Span::styled(currency_label(app, &app.to), field_style(app.focus == Focus::To)),
        ]),
        Line::from(""),
        Line::from(vec![
            label("  Amount: "),
            Span::styled(amount_text, field_style(app.focus == Focus::Amount)),
        ]),
        Line::from(vec![
            label("  Result: "),
            Span::styled(app.result.clone(), Style::default().fg(Color::Green)),
        ]),
        Line::from(""),
        Line::from(vec![
            Span::raw(format!("  {}", app.rate_info_text())),
            Span::styled(app.rate_value_text(), rate_style),
        ]),
    ];

    let converter = Paragraph::new(content).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::White))
            .title(" Convert "),
    );

    f.render_widget(converter, area);
}

fn render_favorites<S: KeyValueStore>(f: &mut Frame, area: Rect, app: &App<S>) {
    let border = if app.focus == Focus::Favorites {
        Color::Yellow
    } else {
        Color::White
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border))
        .title(" Favorites ");

    if app.favorites.is_empty() {
        let empty = Paragraph::new(Line::from(Span::styled(
            format!("  {}", EMPTY_FAVORITES_TEXT),
            Style::default()
                .fg(Color::DarkGray)
                .add_modifier(Modifier::ITALIC),
        )))
        .block(block);
        f.render_widget(empty, area);
        return;
    }

    let items: Vec<ListItem> = app
        .favorites
        .list()
        .iter()
        .map(|fav| {
            ListItem::new(Line::from(vec![
                Span::styled(
                    format!("{:<10}", fav.currency_pair().label()),
                    Style::default().fg(Color::White).add_modifier(Modifier::BOLD),
                ),
                Span::styled(fav.rate_label(), Style::default().fg(Color::Green)),
            ]))
        })
        .collect();

    let list = List::new(items)
        .block(block)
        .highlight_style(
            Style::default()
                .bg(Color::DarkGray)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("→ ");

    let mut state = ListState::default();
    state.select(app.selected_favorite);
    f.render_stateful_widget(list, area, &mut state);
}

fn render_history<S: KeyValueStore>(f: &mut Frame, area: Rect, app: &App<S>) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(0)])
        .split(area);

    let selectors = Paragraph::new(Line::from(vec![
        label("  Pair: "),
        Span::styled(
            app.history_pair().label(),
            field_style(app.focus == Focus::HistoryPair),
        ),
        Span::raw("    "),
        label("Period: "),
        Span::styled(
            format!("{} days", app.history_days()),
            field_style(app.focus == Focus::HistoryPeriod),
        ),
    ]))
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::White))
            .title(" Historical Rates "),
    );
    f.render_widget(selectors, chunks[0]);

    let message = match (&app.history, app.chart.current()) {
        (HistoryStatus::Ready, Some(chart)) => {
            render_chart(f, chunks[1], chart);
            return;
        }
        (HistoryStatus::Loading, _) => Span::styled(
            "  Loading historical data...",
            Style::default().fg(Color::DarkGray),
        ),
        (HistoryStatus::Error(text), _) => {
            Span::styled(format!("  {}", text), Style::default().fg(Color::Red))
        }
        _ => Span::styled(
            "  Press h to load historical rates",
            Style::default()
                .fg(Color::DarkGray)
                .add_modifier(Modifier::ITALIC),
        ),
    };

    let placeholder = Paragraph::new(vec![Line::from(""), Line::from(message)])
        .block(Block::default().borders(Borders::ALL));
    f.render_widget(placeholder, chunks[1]);
}

fn render_chart(f: &mut Frame, area: Rect, chart: &HistoryChart) {
    let datasets = vec![Dataset::default()
        .name(chart.dataset_label.clone())
        .marker(symbols::Marker::Braille)
        .graph_type(GraphType::Line)
        .style(Style::default().fg(Color::Cyan))
        .data(&chart.points)];

    let [y_min, y_max] = chart.y_bounds;
    let y_labels = vec![
        Span::raw(format!("{:.4}", y_min)),
        Span::raw(format!("{:.4}", (y_min + y_max) / 2.0)),
        Span::raw(format!("{:.4}", y_max)),
    ];
    let x_labels: Vec<Span> = chart.axis_labels().into_iter().map(Span::raw).collect();

    let title_style = if chart.simulated {
        Style::default().fg(Color::Magenta)
    } else {
        Style::default().fg(Color::White)
    };

    let widget = Chart::new(datasets)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::White))
                .title(Span::styled(format!(" {} ", chart.title), title_style)),
        )
        .x_axis(
            Axis::default()
                .style(Style::default().fg(Color::DarkGray))
                .bounds(chart.x_bounds())
                .labels(x_labels),
        )
        .y_axis(
            Axis::default()
                .style(Style::default().fg(Color::DarkGray))
                .bounds(chart.y_bounds)
                .labels(y_labels),
        );

    f.render_widget(widget, area);
}

fn render_status_bar<S: KeyValueStore>(f: &mut Frame, area: Rect, app: &App<S>) {
    let mut status_spans = Vec::new();

    if let Some(notice) = &app.notice {
        let color = match notice.level {
            NoticeLevel::Info => Color::Green,
            NoticeLevel::Warning => Color::Yellow,
            NoticeLevel::Error => Color::Red,
        };
        status_spans.push(Span::styled(
            format!(" {} ", truncate(&notice.text, 70)),
            Style::default().fg(color),
        ));
        status_spans.push(Span::raw(" | "));
    }

    for (key, action) in [
        ("Tab", " Focus | "),
        ("↑/↓", " Select | "),
        ("Enter", " Go | "),
        ("s", " Swap | "),
        ("f", " Fav | "),
        ("d", " Del | "),
        ("h", " History | "),
    ] {
        status_spans.push(Span::styled(key, Style::default().fg(Color::Yellow)));
        status_spans.push(Span::raw(action));
    }
    status_spans.push(Span::styled("q", Style::default().fg(Color::Red)));
    status_spans.push(Span::raw(" Quit"));

    let status_bar = Paragraph::new(vec![Line::from(status_spans)]).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::White)),
    );

    f.render_widget(status_bar, area);
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let head: String = s.chars().take(max_len - 3).collect();
        format!("{}...", head)
    }
}
