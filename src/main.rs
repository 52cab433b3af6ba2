use std::io;
use std::sync::mpsc;
use std::time::{Duration, Instant};

use chrono::DateTime;
use crossterm::event::{
    self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind,
};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::prelude::*;
use ratatui::style::{Color, Modifier, Style};
use ratatui::widgets::{Bar, BarChart, BarGroup, Block, Borders, Cell, Clear, Paragraph, Row, Table};

use cs2_terminal::aggregate::{classify_result, per_match_kd, MatchVerdict, UNKNOWN_MAP};
use cs2_terminal::feed;
use cs2_terminal::reconcile::UNKNOWN_LABEL;
use cs2_terminal::settings;
use cs2_terminal::state::{
    self, apply_delta, AppState, DashboardData, MatchRecord, Resolved, Screen, SetupField,
};

const WEAPON_CHART_LIMIT: usize = 6;

struct App {
    state: AppState,
    should_quit: bool,
    cmd_tx: mpsc::Sender<state::ProviderCommand>,
}

impl App {
    fn new(cmd_tx: mpsc::Sender<state::ProviderCommand>) -> Self {
        let mut state = AppState::new();
        state.settings = settings::load();
        Self {
            state,
            should_quit: false,
            cmd_tx,
        }
    }

    fn on_key(&mut self, key: KeyEvent) {
        if self.state.help_overlay {
            self.state.help_overlay = false;
            return;
        }
        match self.state.screen {
            Screen::Setup => self.on_setup_key(key),
            Screen::Dashboard => self.on_dashboard_key(key),
        }
    }

    fn on_setup_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Esc => {
                if self.state.dashboard.is_some() {
                    self.state.screen = Screen::Dashboard;
                } else {
                    self.should_quit = true;
                }
            }
            KeyCode::Tab | KeyCode::Down => {
                self.state.setup_focus = self.state.setup_focus.next();
            }
            KeyCode::BackTab | KeyCode::Up => {
                self.state.setup_focus = self.state.setup_focus.prev();
            }
            KeyCode::Enter => self.connect(),
            KeyCode::Backspace => {
                if let Some(field) = self.state.setup_field_mut() {
                    field.pop();
                }
            }
            KeyCode::Char(' ') if self.state.setup_focus == SetupField::UseProxy => {
                self.state.settings.use_proxy = !self.state.settings.use_proxy;
            }
            KeyCode::Char(c) => {
                if let Some(field) = self.state.setup_field_mut() {
                    field.push(c);
                }
            }
            _ => {}
        }
    }

    fn on_dashboard_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('q') => self.should_quit = true,
            KeyCode::Char('e') | KeyCode::Esc => self.state.screen = Screen::Setup,
            KeyCode::Char('r') => self.connect(),
            KeyCode::Char('?') => self.state.help_overlay = true,
            _ => {}
        }
    }

    fn connect(&mut self) {
        let settings = &self.state.settings;
        if !settings.has_identity_credentials() && !settings.has_analytics_id() {
            self.state.connect_error =
                Some("enter credentials for at least one source".to_string());
            return;
        }
        settings::save(settings);
        let settings = settings.clone();
        self.state.begin_connect();
        self.state.push_log("[INFO] Connecting...");
        if self
            .cmd_tx
            .send(state::ProviderCommand::Connect(settings))
            .is_err()
        {
            self.state.connecting = false;
            self.state.connect_error = Some("provider thread is gone".to_string());
        }
    }
}

fn main() -> io::Result<()> {
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::from_filename(".env");

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = ratatui::backend::CrosstermBackend::new(stdout);
    let mut terminal = ratatui::Terminal::new(backend)?;

    let (tx, rx) = mpsc::channel();
    let (cmd_tx, cmd_rx) = mpsc::channel();
    feed::spawn_provider(tx, cmd_rx);

    let mut app = App::new(cmd_tx);
    let res = run_app(&mut terminal, &mut app, rx);

    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        eprintln!("error: {err}");
    }
    Ok(())
}

fn run_app<B: Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
    rx: mpsc::Receiver<state::Delta>,
) -> io::Result<()> {
    let tick_rate = Duration::from_millis(250);
    let mut last_tick = Instant::now();

    loop {
        while let Ok(delta) = rx.try_recv() {
            apply_delta(&mut app.state, delta);
        }

        terminal.draw(|f| ui(f, app))?;

        let timeout = tick_rate
            .checked_sub(last_tick.elapsed())
            .unwrap_or(Duration::ZERO);
        if event::poll(timeout)? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    app.on_key(key);
                }
            }
        }

        if last_tick.elapsed() >= tick_rate {
            last_tick = Instant::now();
        }

        if app.should_quit {
            return Ok(());
        }
    }
}

fn ui(frame: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(2),
            Constraint::Min(1),
            Constraint::Length(1),
        ])
        .split(frame.size());

    let header = Paragraph::new(header_text(&app.state))
        .style(Style::default().fg(Color::Yellow))
        .block(Block::default().borders(Borders::BOTTOM));
    frame.render_widget(header, chunks[0]);

    match app.state.screen {
        Screen::Setup => render_setup(frame, chunks[1], &app.state),
        Screen::Dashboard => render_dashboard(frame, chunks[1], &app.state),
    }

    let footer = Paragraph::new(footer_text(&app.state));
    frame.render_widget(footer, chunks[2]);

    if app.state.help_overlay {
        render_help_overlay(frame, frame.size());
    }
}

fn header_text(state: &AppState) -> String {
    let title = match state.screen {
        Screen::Setup => "CS2 TERMINAL | CONNECT",
        Screen::Dashboard => "CS2 TERMINAL | DASHBOARD",
    };
    if state.connecting {
        format!("{title} | fetching...")
    } else {
        title.to_string()
    }
}

fn footer_text(state: &AppState) -> String {
    if let Some(err) = &state.connect_error {
        return format!("! {err}");
    }
    match state.screen {
        Screen::Setup => {
            "Tab/↑/↓ Field | Space Toggle proxy | Enter Connect | Esc Back/Quit".to_string()
        }
        Screen::Dashboard => {
            "r Refresh | e Edit settings | ? Help | q Quit".to_string()
        }
    }
}

fn render_setup(frame: &mut Frame, area: Rect, state: &AppState) {
    let card = centered_rect(area, 64, 14);
    let block = Block::default().borders(Borders::ALL).title(" connect ");
    frame.render_widget(block, card);

    let inner = card.inner(ratatui::layout::Margin {
        horizontal: 2,
        vertical: 1,
    });

    let field_line = |label: &str, value: &str, field: SetupField| -> Line<'static> {
        let focused = state.setup_focus == field;
        let marker = if focused { "> " } else { "  " };
        let style = if focused {
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
        } else {
            Style::default()
        };
        Line::from(vec![
            Span::styled(format!("{marker}{label:<14}"), style),
            Span::raw(value.to_string()),
        ])
    };

    let proxy_value = if state.settings.use_proxy { "[x]" } else { "[ ]" };
    let mut lines = vec![
        Line::from("Paste your provider credentials. Stored locally only."),
        Line::from(""),
        field_line(
            "Steam key",
            &state.settings.identity_key,
            SetupField::IdentityKey,
        ),
        field_line(
            "Steam ID64",
            &state.settings.identity_id,
            SetupField::IdentityId,
        ),
        field_line(
            "Analytics ID",
            &state.settings.analytics_id,
            SetupField::AnalyticsId,
        ),
        field_line("Use proxy", proxy_value, SetupField::UseProxy),
        Line::from(""),
    ];
    if state.connecting {
        lines.push(Line::from(Span::styled(
            "Connecting to both sources...",
            Style::default().fg(Color::DarkGray),
        )));
    } else if let Some(err) = &state.connect_error {
        lines.push(Line::from(Span::styled(
            err.clone(),
            Style::default().fg(Color::Red),
        )));
    }

    frame.render_widget(Paragraph::new(lines), inner);
}

fn render_dashboard(frame: &mut Frame, area: Rect, state: &AppState) {
    let Some(data) = &state.dashboard else {
        let empty = Paragraph::new("No data yet. Press e to enter credentials.")
            .style(Style::default().fg(Color::DarkGray));
        frame.render_widget(empty, area);
        return;
    };

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(3),
            Constraint::Min(8),
            Constraint::Length(4),
        ])
        .split(area);

    render_profile(frame, rows[0], data);
    render_metrics(frame, rows[1], data);

    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(46), Constraint::Percentage(54)])
        .split(rows[2]);
    render_matches(frame, columns[0], data);

    let charts = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
        .split(columns[1]);
    render_map_chart(frame, charts[0], data);
    render_weapon_chart(frame, charts[1], data);

    render_logs(frame, rows[3], state);
}

fn render_profile(frame: &mut Frame, area: Rect, data: &DashboardData) {
    let view = &data.view;
    let lines = vec![
        Line::from(vec![
            Span::styled(
                view.display_name.clone(),
                Style::default()
                    .fg(Color::Yellow)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::raw("  "),
            Span::styled(view.sub_label.clone(), Style::default().fg(Color::DarkGray)),
        ]),
        Line::from(Span::styled(
            view.avatar_url.clone(),
            Style::default().fg(Color::DarkGray),
        )),
    ];
    let block = Block::default().borders(Borders::BOTTOM);
    frame.render_widget(Paragraph::new(lines).block(block), area);
}

fn render_metrics(frame: &mut Frame, area: Rect, data: &DashboardData) {
    let view = &data.view;
    let tiles = [
        ("K/D", fmt_ratio(view.kd)),
        ("Win rate", fmt_pct(view.win_rate)),
        ("Headshots", fmt_pct(view.headshot_pct)),
        ("Hours", fmt_hours(view.hours)),
    ];
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Ratio(1, 4); 4])
        .split(area);
    for (i, (title, value)) in tiles.iter().enumerate() {
        let style = if value == UNKNOWN_LABEL {
            Style::default().fg(Color::DarkGray)
        } else {
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD)
        };
        let line = Line::from(vec![
            Span::styled(format!("{title}: "), Style::default().fg(Color::DarkGray)),
            Span::styled(value.clone(), style),
        ]);
        frame.render_widget(Paragraph::new(line), columns[i]);
    }
}

fn render_matches(frame: &mut Frame, area: Rect, data: &DashboardData) {
    let block = Block::default().borders(Borders::ALL).title(format!(
        " recent matches ({} total, {:.1}% won) ",
        data.summary.total, data.summary.win_rate_pct
    ));

    if data.summary.recent.is_empty() {
        let empty = Paragraph::new("No match history")
            .style(Style::default().fg(Color::DarkGray))
            .block(block);
        frame.render_widget(empty, area);
        return;
    }

    let header = Row::new(vec!["Date", "Map", "K/D", "Score", "Result"])
        .style(Style::default().fg(Color::DarkGray));
    let rows: Vec<Row> = data
        .summary
        .recent
        .iter()
        .map(|record| {
            let (verdict, color) = verdict_cell(record);
            Row::new(vec![
                Cell::from(fmt_match_time(record.finished_at)),
                Cell::from(record.map.clone().unwrap_or_else(|| UNKNOWN_MAP.to_string())),
                Cell::from(fmt_ratio(per_match_kd(record))),
                Cell::from(fmt_score(record)),
                Cell::from(verdict).style(Style::default().fg(color)),
            ])
        })
        .collect();

    let table = Table::new(
        rows,
        [
            Constraint::Length(16),
            Constraint::Min(10),
            Constraint::Length(8),
            Constraint::Length(7),
            Constraint::Length(6),
        ],
    )
    .header(header)
    .block(block);
    frame.render_widget(table, area);
}

fn render_map_chart(frame: &mut Frame, area: Rect, data: &DashboardData) {
    let block = Block::default()
        .borders(Borders::ALL)
        .title(" win rate by map ");
    if data.summary.per_map.is_empty() {
        let empty = Paragraph::new("No map data")
            .style(Style::default().fg(Color::DarkGray))
            .block(block);
        frame.render_widget(empty, area);
        return;
    }

    let bars: Vec<Bar> = data
        .summary
        .per_map
        .iter()
        .map(|entry| {
            Bar::default()
                .value(u64::from(entry.win_rate_pct))
                .label(Line::from(short_map_name(&entry.map)))
                .text_value(format!("{}%", entry.win_rate_pct))
                .style(Style::default().fg(Color::Green))
        })
        .collect();

    let chart = BarChart::default()
        .data(BarGroup::default().bars(&bars))
        .bar_width(7)
        .bar_gap(1)
        .max(100)
        .block(block);
    frame.render_widget(chart, area);
}

fn render_weapon_chart(frame: &mut Frame, area: Rect, data: &DashboardData) {
    let block = Block::default()
        .borders(Borders::ALL)
        .title(" kills by weapon ");
    let mut weapons: Vec<_> = data
        .weapons
        .iter()
        .filter_map(|w| w.kills.map(|kills| (w.name.as_str(), kills.max(0) as u64)))
        .collect();
    if weapons.is_empty() {
        let empty = Paragraph::new("No weapon data")
            .style(Style::default().fg(Color::DarkGray))
            .block(block);
        frame.render_widget(empty, area);
        return;
    }
    weapons.sort_by(|a, b| b.1.cmp(&a.1));
    weapons.truncate(WEAPON_CHART_LIMIT);

    let bars: Vec<Bar> = weapons
        .iter()
        .map(|(name, kills)| {
            Bar::default()
                .value(*kills)
                .label(Line::from((*name).to_string()))
                .style(Style::default().fg(Color::Cyan))
        })
        .collect();

    let chart = BarChart::default()
        .data(BarGroup::default().bars(&bars))
        .bar_width(8)
        .bar_gap(1)
        .block(block);
    frame.render_widget(chart, area);
}

fn render_logs(frame: &mut Frame, area: Rect, state: &AppState) {
    let visible = area.height.saturating_sub(1) as usize;
    let lines: Vec<Line> = state
        .logs
        .iter()
        .rev()
        .take(visible.max(1))
        .rev()
        .map(|msg| {
            let color = if msg.starts_with("[WARN]") {
                Color::Red
            } else {
                Color::DarkGray
            };
            Line::from(Span::styled(msg.clone(), Style::default().fg(color)))
        })
        .collect();
    let block = Block::default().borders(Borders::TOP).title(" console ");
    frame.render_widget(Paragraph::new(lines).block(block), area);
}

fn render_help_overlay(frame: &mut Frame, area: Rect) {
    let card = centered_rect(area, 46, 10);
    frame.render_widget(Clear, card);
    let text = vec![
        Line::from("r        refresh both sources"),
        Line::from("e        edit credentials"),
        Line::from("q        quit"),
        Line::from(""),
        Line::from("Any key closes this overlay."),
    ];
    let block = Block::default().borders(Borders::ALL).title(" help ");
    frame.render_widget(Paragraph::new(text).block(block), card);
}

fn centered_rect(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height) / 2,
        width,
        height,
    }
}

// Numeric formatting belongs here, not in the reconciliation engine: the
// unknown sentinel passes through as-is, values get their display form.

fn fmt_ratio(v: Resolved) -> String {
    match v.value() {
        Some(v) => format!("{v:.2}"),
        None => UNKNOWN_LABEL.to_string(),
    }
}

fn fmt_pct(v: Resolved) -> String {
    match v.value() {
        Some(v) => format!("{v:.0}%"),
        None => UNKNOWN_LABEL.to_string(),
    }
}

fn fmt_hours(v: Resolved) -> String {
    match v.value() {
        Some(v) => format!("{v:.0}h"),
        None => UNKNOWN_LABEL.to_string(),
    }
}

fn fmt_match_time(finished_at: Option<i64>) -> String {
    finished_at
        .and_then(|ts| DateTime::from_timestamp(ts, 0))
        .map(|dt| dt.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| "-".to_string())
}

fn fmt_score(record: &MatchRecord) -> String {
    match (record.team_score, record.opponent_score) {
        (Some(team), Some(opponent)) => format!("{team}:{opponent}"),
        _ => "-".to_string(),
    }
}

fn verdict_cell(record: &MatchRecord) -> (&'static str, Color) {
    match classify_result(record) {
        MatchVerdict::Win => ("WIN", Color::Green),
        MatchVerdict::Loss => ("LOSS", Color::Red),
        MatchVerdict::Tie => ("TIE", Color::Yellow),
        MatchVerdict::Unknown => ("-", Color::DarkGray),
    }
}

fn short_map_name(map: &str) -> String {
    let stripped = map.strip_prefix("de_").unwrap_or(map);
    let mut short: String = stripped.chars().take(6).collect();
    if short.is_empty() {
        short.push('?');
    }
    short
}
