use std::fs::{self, OpenOptions};
use std::io;
use std::sync::Mutex;
use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::Context;
use crossterm::event::{
    self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind,
    KeyModifiers,
};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::layout::{Constraint, Direction, Layout};
use ratatui::prelude::*;
use ratatui::style::{Color, Modifier, Style};
use ratatui::widgets::{Block, Borders, Clear, Paragraph, Wrap};

use cmk_tipping::api::HttpApi;
use cmk_tipping::asset_cache::{
    AssetCache, CacheStore, HttpAssetFetcher, Served, default_db_path, manifest_name,
};
use cmk_tipping::config::{ClientConfig, app_cache_dir};
use cmk_tipping::leaderboard::{
    EMPTY_GROUP_MEMBERS_MESSAGE, EMPTY_GROUPS_MESSAGE, EMPTY_LEADERBOARD_MESSAGE,
    LeaderboardLine, leaderboard_lines,
};
use cmk_tipping::provider::spawn_provider;
use cmk_tipping::round_view::{FixtureView, NO_ROUNDS_MESSAGE, SideView, hex_rgb};
use cmk_tipping::session::{AuthState, CredentialStore, Session};
use cmk_tipping::state::{
    AppState, AuthField, AuthMode, Delta, PromptKind, ProviderCommand, Screen, apply_delta,
};

const LOG_FILE: &str = "tipping.log";

struct App {
    state: AppState,
    should_quit: bool,
    cmd_tx: mpsc::Sender<ProviderCommand>,
    toast_secs: u64,
}

impl App {
    fn new(config: &ClientConfig, cmd_tx: mpsc::Sender<ProviderCommand>) -> Self {
        Self {
            state: AppState::new(config.margin_mode, config.require_favorite_team),
            should_quit: false,
            cmd_tx,
            toast_secs: config.toast_secs,
        }
    }

    fn send(&mut self, cmd: Option<ProviderCommand>) {
        let Some(cmd) = cmd else {
            return;
        };
        if self.cmd_tx.send(cmd).is_err() {
            self.state.push_log("[WARN] Provider stopped; request dropped");
        }
    }

    fn send_all(&mut self, cmds: Vec<ProviderCommand>) {
        for cmd in cmds {
            self.send(Some(cmd));
        }
    }

    fn on_key(&mut self, key: KeyEvent) {
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            self.should_quit = true;
            return;
        }
        if self.state.prompt.is_some() {
            self.on_prompt_key(key);
            return;
        }
        if self.state.screen == Screen::Auth {
            self.on_auth_key(key);
            return;
        }

        match key.code {
            KeyCode::Char('q') => {
                self.should_quit = true;
                return;
            }
            KeyCode::Char('?') => {
                self.state.help_overlay = !self.state.help_overlay;
                return;
            }
            KeyCode::Char('1') => {
                let cmd = self.state.open_screen(Screen::Tips);
                self.send(cmd);
                return;
            }
            KeyCode::Char('2') => {
                let cmd = self.state.open_screen(Screen::Leaderboard);
                self.send(cmd);
                return;
            }
            KeyCode::Char('3') => {
                let cmd = self.state.open_screen(Screen::Groups);
                self.send(cmd);
                return;
            }
            KeyCode::Char('o') | KeyCode::Char('O') => {
                let cmd = self.state.logout();
                self.send(Some(cmd));
                return;
            }
            _ => {}
        }

        match self.state.screen {
            Screen::Auth => {}
            Screen::Tips => self.on_tips_key(key),
            Screen::Leaderboard => {
                if key.code == KeyCode::Char('r') {
                    self.send(Some(ProviderCommand::FetchLeaderboard));
                }
            }
            Screen::Groups => self.on_groups_key(key),
            Screen::GroupBoard => {
                if matches!(key.code, KeyCode::Char('b') | KeyCode::Esc) {
                    let cmd = self.state.close_group_board();
                    self.send(cmd);
                }
            }
        }
    }

    fn on_auth_key(&mut self, key: KeyEvent) {
        let require_fav = self.state.require_favorite_team;
        let team_count = self.state.teams.len();
        let form = &mut self.state.auth_form;
        match key.code {
            KeyCode::Esc => self.should_quit = true,
            KeyCode::F(2) => form.toggle_mode(),
            KeyCode::Tab | KeyCode::Down => form.focus_next(require_fav),
            KeyCode::BackTab | KeyCode::Up => form.focus_prev(require_fav),
            KeyCode::Left if form.focus == AuthField::FavoriteTeam => {
                form.cycle_favorite(team_count, false)
            }
            KeyCode::Right if form.focus == AuthField::FavoriteTeam => {
                form.cycle_favorite(team_count, true)
            }
            KeyCode::Backspace => form.backspace(),
            KeyCode::Enter => {
                let cmd = self.state.submit_auth();
                self.send(cmd);
            }
            KeyCode::Char(c) => form.input_char(c),
            _ => {}
        }
    }

    fn on_tips_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('[') => {
                let cmd = self.state.cycle_round(false);
                self.send(cmd);
            }
            KeyCode::Char(']') => {
                let cmd = self.state.cycle_round(true);
                self.send(cmd);
            }
            KeyCode::Char('j') | KeyCode::Down => self.state.select_fixture_next(),
            KeyCode::Char('k') | KeyCode::Up => self.state.select_fixture_prev(),
            KeyCode::Char('h') | KeyCode::Left => {
                self.state.pick_side(true);
            }
            KeyCode::Char('l') | KeyCode::Right => {
                self.state.pick_side(false);
            }
            KeyCode::Char('+') | KeyCode::Char('=') => {
                self.state.step_margin(true);
            }
            KeyCode::Char('-') => {
                self.state.step_margin(false);
            }
            KeyCode::Enter => {
                let cmd = self.state.submit_tips();
                if cmd.is_none() && self.state.can_tip() && self.state.tips.is_empty() {
                    self.state.push_log("[INFO] Pick at least one winner first");
                }
                self.send(cmd);
            }
            KeyCode::Char('r') => {
                self.send(Some(ProviderCommand::LoadRoundsAndTeams));
            }
            _ => {}
        }
    }

    fn on_groups_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('j') | KeyCode::Down => self.state.select_group_next(),
            KeyCode::Char('k') | KeyCode::Up => self.state.select_group_prev(),
            KeyCode::Char('n') => self.state.begin_prompt(PromptKind::GroupName),
            KeyCode::Char('g') => self.state.begin_prompt(PromptKind::GroupCode),
            KeyCode::Char('r') => self.send(Some(ProviderCommand::FetchGroups)),
            KeyCode::Enter => {
                let cmd = self.state.open_selected_group();
                self.send(cmd);
            }
            _ => {}
        }
    }

    fn on_prompt_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Esc => self.state.cancel_prompt(),
            KeyCode::Enter => {
                let cmd = self.state.submit_prompt();
                self.send(cmd);
            }
            KeyCode::Backspace => {
                if let Some(prompt) = self.state.prompt.as_mut() {
                    prompt.input.pop();
                }
            }
            KeyCode::Char(c) => {
                if let Some(prompt) = self.state.prompt.as_mut() {
                    prompt.input.push(c);
                }
            }
            _ => {}
        }
    }
}

fn main() -> anyhow::Result<()> {
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::from_filename(".env");

    let config = ClientConfig::from_env();
    init_tracing(config.log_level);
    tracing::info!(base_url = %config.base_url, margin_mode = ?config.margin_mode, "starting");

    let api = HttpApi::new(&config)?;
    let session = Session::new(
        CredentialStore::default_location(),
        config.require_favorite_team,
    );

    let (tx, rx) = mpsc::channel();
    let (cmd_tx, cmd_rx) = mpsc::channel();
    spawn_branding(&config, tx.clone());
    let _provider = spawn_provider(api, session, tx, cmd_rx);

    let mut app = App::new(&config, cmd_tx);
    app.state.auth = AuthState::Authenticating;
    app.send(Some(ProviderCommand::RestoreSession));

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = ratatui::backend::CrosstermBackend::new(stdout);
    let mut terminal = ratatui::Terminal::new(backend)?;

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

/// Log lines go to a file; the terminal belongs to the UI.
fn init_tracing(level: tracing::Level) {
    let Some(dir) = app_cache_dir() else {
        return;
    };
    if fs::create_dir_all(&dir).is_err() {
        return;
    }
    let Ok(file) = OpenOptions::new()
        .create(true)
        .append(true)
        .open(dir.join(LOG_FILE))
    else {
        return;
    };
    let _ = tracing_subscriber::fmt()
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .with_max_level(level)
        .try_init();
}

fn spawn_branding(config: &ClientConfig, tx: mpsc::Sender<Delta>) {
    let base_url = config.base_url.clone();
    let timeout = config.http_timeout;
    thread::spawn(move || {
        let delta = match load_branding(&base_url, timeout) {
            Ok(Some(name)) => Delta::SetBranding(name),
            Ok(None) => return,
            Err(err) => Delta::Log(format!("[WARN] Offline assets unavailable: {err:#}")),
        };
        let _ = tx.send(delta);
    });
}

fn load_branding(base_url: &str, timeout: Duration) -> anyhow::Result<Option<String>> {
    let db_path = default_db_path().context("no cache directory")?;
    let store = CacheStore::open(&db_path)?;
    let fetcher = HttpAssetFetcher::new(base_url, timeout)?;
    let mut cache = AssetCache::new(store, fetcher);

    if let Err(err) = cache.install() {
        tracing::info!(error = %err, "asset install failed, looking for an earlier copy");
        if !cache.resume()? {
            return Err(err);
        }
    }
    cache.activate()?;

    let resp = match cache.handle("/manifest.json")? {
        Served::Network(resp) | Served::Cache(resp) => resp,
        Served::PassThrough => return Ok(None),
    };
    cache.flush();
    Ok(manifest_name(&resp.body))
}

fn run_app<B: Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
    rx: mpsc::Receiver<Delta>,
) -> io::Result<()> {
    let tick_rate = Duration::from_millis(250);
    let mut last_tick = Instant::now();

    loop {
        while let Ok(delta) = rx.try_recv() {
            let follow_ups = apply_delta(&mut app.state, delta);
            app.send_all(follow_ups);
        }
        app.state.expire_toast(Instant::now(), app.toast_secs);

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
    let area = frame.size();
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(2),
            Constraint::Min(1),
            Constraint::Length(3),
            Constraint::Length(1),
        ])
        .split(area);

    let header = Paragraph::new(header_line(&app.state))
        .block(Block::default().borders(Borders::BOTTOM));
    frame.render_widget(header, chunks[0]);

    match app.state.screen {
        Screen::Auth => render_auth(frame, chunks[1], &app.state),
        Screen::Tips => render_tips(frame, chunks[1], &app.state),
        Screen::Leaderboard => render_leaderboard(frame, chunks[1], &app.state),
        Screen::Groups => render_groups(frame, chunks[1], &app.state),
        Screen::GroupBoard => render_group_board(frame, chunks[1], &app.state),
    }

    let console = Paragraph::new(console_text(&app.state))
        .style(Style::default().fg(Color::DarkGray))
        .block(Block::default().title("Console").borders(Borders::TOP));
    frame.render_widget(console, chunks[2]);

    let footer = Paragraph::new(footer_text(&app.state))
        .style(Style::default().fg(Color::DarkGray));
    frame.render_widget(footer, chunks[3]);

    if let Some(toast) = app.state.toast.as_ref() {
        render_toast(frame, area, &toast.message);
    }
    if let Some(prompt) = app.state.prompt.as_ref() {
        let title = match prompt.kind {
            PromptKind::GroupName => "New group name",
            PromptKind::GroupCode => "Invite code",
        };
        render_prompt(frame, area, title, &prompt.input);
    }
    if app.state.help_overlay {
        render_help_overlay(frame, area);
    }
}

fn header_line(state: &AppState) -> Line<'static> {
    let mut spans = vec![Span::styled(
        format!(" {} ", state.branding),
        Style::default().add_modifier(Modifier::BOLD),
    )];
    if let Some(user) = state.current_user() {
        for (screen, label) in [
            (Screen::Tips, "1 Tips"),
            (Screen::Leaderboard, "2 Leaderboard"),
            (Screen::Groups, "3 Groups"),
        ] {
            let active = state.screen == screen
                || (screen == Screen::Groups && state.screen == Screen::GroupBoard);
            let style = if active {
                Style::default().fg(Color::Black).bg(Color::Cyan)
            } else {
                Style::default().fg(Color::Gray)
            };
            spans.push(Span::raw(" "));
            spans.push(Span::styled(format!(" {label} "), style));
        }
        spans.push(Span::raw(format!("   {}", user.display_name)));
    }
    Line::from(spans)
}

fn footer_text(state: &AppState) -> &'static str {
    match state.screen {
        Screen::Auth => "Tab/↑/↓ Field | F2 Sign in/Sign up | ←/→ Team | Enter Submit | Esc Quit",
        Screen::Tips => {
            "[/] Round | j/k Fixture | h/l Pick | +/- Margin | Enter Lock in | o Logout | ? Help | q Quit"
        }
        Screen::Leaderboard => "1/2/3 Screens | r Refresh | o Logout | ? Help | q Quit",
        Screen::Groups => {
            "j/k Move | Enter Open | n New group | g Join | r Refresh | ? Help | q Quit"
        }
        Screen::GroupBoard => "b/Esc Back | ? Help | q Quit",
    }
}

fn render_auth(frame: &mut Frame, area: Rect, state: &AppState) {
    let popup = centered_rect(50, 70, area);
    let form = &state.auth_form;
    let title = match form.mode {
        AuthMode::SignIn => "Sign In",
        AuthMode::SignUp => "Create Account",
    };

    let mut lines = Vec::new();
    if state.auth == AuthState::Authenticating {
        lines.push(Line::from("Signing in..."));
    } else {
        for field in form.fields(state.require_favorite_team) {
            let focused = form.focus == field;
            let (label, value) = match field {
                AuthField::DisplayName => ("Name", form.display_name.clone()),
                AuthField::Email => ("Email", form.email.clone()),
                AuthField::Password => ("Password", "*".repeat(form.password.chars().count())),
                AuthField::FavoriteTeam => (
                    "Favourite team",
                    form.favorite
                        .and_then(|idx| state.teams.get(idx))
                        .map(|t| format!("< {} >", t.name))
                        .unwrap_or_else(|| "< pick one >".to_string()),
                ),
            };
            let marker = if focused { "> " } else { "  " };
            let style = if focused {
                Style::default().add_modifier(Modifier::BOLD)
            } else {
                Style::default()
            };
            lines.push(Line::styled(format!("{marker}{label:<15} {value}"), style));
        }
        lines.push(Line::from(""));
        let switch = match form.mode {
            AuthMode::SignIn => "No account? F2 to sign up",
            AuthMode::SignUp => "Have an account? F2 to sign in",
        };
        lines.push(Line::styled(switch, Style::default().fg(Color::DarkGray)));
    }
    if let Some(err) = form.error.as_ref() {
        lines.push(Line::from(""));
        lines.push(Line::styled(err.clone(), Style::default().fg(Color::Red)));
    }

    frame.render_widget(Clear, popup);
    let paragraph = Paragraph::new(lines)
        .wrap(Wrap { trim: false })
        .block(Block::default().title(title).borders(Borders::ALL));
    frame.render_widget(paragraph, popup);
}

fn render_tips(frame: &mut Frame, area: Rect, state: &AppState) {
    if state.rounds.is_empty() {
        let text = if state.rounds_loading {
            "Loading rounds..."
        } else {
            NO_ROUNDS_MESSAGE
        };
        let empty = Paragraph::new(text).style(Style::default().fg(Color::DarkGray));
        frame.render_widget(empty, area);
        return;
    }

    let sections = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Length(2),
            Constraint::Min(1),
            Constraint::Length(1),
        ])
        .split(area);

    let mut chips = Vec::new();
    for chip in state.round_chips() {
        let style = if chip.active {
            Style::default().fg(Color::Black).bg(Color::Yellow)
        } else {
            Style::default().fg(Color::Gray)
        };
        chips.push(Span::styled(format!(" {} ", chip.label), style));
        chips.push(Span::raw(" "));
    }
    frame.render_widget(Paragraph::new(Line::from(chips)), sections[0]);

    let Some(view) = state.round_view() else {
        return;
    };

    let mut title = vec![
        Span::styled(view.title.clone(), Style::default().add_modifier(Modifier::BOLD)),
        Span::raw("  "),
        Span::styled(
            format!("[{}]", view.status_label),
            Style::default().fg(if view.can_tip { Color::Green } else { Color::DarkGray }),
        ),
    ];
    if !view.deadline_label.is_empty() {
        title.push(Span::raw(format!("  Deadline: {}", view.deadline_label)));
    }
    frame.render_widget(Paragraph::new(Line::from(title)), sections[1]);

    let list_area = sections[2];
    if state.round_loading {
        let loading = Paragraph::new("Loading fixtures...").style(Style::default().fg(Color::DarkGray));
        frame.render_widget(loading, list_area);
    } else if let Some(message) = view.empty_message {
        let empty = Paragraph::new(message).style(Style::default().fg(Color::DarkGray));
        frame.render_widget(empty, list_area);
    } else {
        render_fixture_list(frame, list_area, &view.fixtures, state.fixture_cursor);
    }

    if view.submit.visible {
        let style = if view.submit.enabled && !state.submitting {
            Style::default().fg(Color::Black).bg(Color::Green)
        } else {
            Style::default().fg(Color::DarkGray)
        };
        let label = if state.submitting {
            "Submitting...".to_string()
        } else {
            format!(" Enter: {} ", view.submit.label)
        };
        frame.render_widget(Paragraph::new(Span::styled(label, style)), sections[3]);
    }
}

fn render_fixture_list(frame: &mut Frame, area: Rect, fixtures: &[FixtureView], cursor: usize) {
    const ROW_HEIGHT: u16 = 2;
    if area.height < ROW_HEIGHT {
        return;
    }
    let visible = (area.height / ROW_HEIGHT) as usize;
    let (start, end) = visible_range(cursor, fixtures.len(), visible);

    for (i, idx) in (start..end).enumerate() {
        let row_area = Rect {
            x: area.x,
            y: area.y + (i as u16) * ROW_HEIGHT,
            width: area.width,
            height: ROW_HEIGHT,
        };
        let fixture = &fixtures[idx];
        let row_style = if idx == cursor {
            Style::default().bg(Color::DarkGray)
        } else {
            Style::default()
        };

        let mut matchup = vec![Span::raw(if idx == cursor { "> " } else { "  " })];
        matchup.extend(side_spans(&fixture.home));
        matchup.push(Span::raw(format!(" {} ", fixture.separator)));
        matchup.extend(side_spans(&fixture.away));

        let mut details = Vec::new();
        if !fixture.kickoff_label.is_empty() {
            details.push(fixture.kickoff_label.clone());
        }
        if !fixture.venue.is_empty() {
            details.push(fixture.venue.clone());
        }
        if let Some(margin) = fixture.margin {
            details.push(format!("margin {}", margin.label()));
        } else if fixture.pickable {
            details.push("no pick".to_string());
        }

        let lines = vec![
            Line::from(matchup),
            Line::styled(
                format!("    {}", details.join(" · ")),
                Style::default().fg(Color::Gray),
            ),
        ];
        frame.render_widget(Paragraph::new(lines).style(row_style), row_area);
    }
}

fn side_spans(side: &SideView) -> Vec<Span<'static>> {
    let chip_style = Style::default().fg(Color::White).bg(team_color(&side.color));
    let mut name_style = Style::default();
    if side.picked {
        name_style = name_style.add_modifier(Modifier::BOLD | Modifier::UNDERLINED);
    }
    if side.won {
        name_style = name_style.fg(Color::Green);
    }

    let mut spans = vec![
        Span::styled(format!(" {} ", side.short_name), chip_style),
        Span::raw(" "),
        Span::styled(side.name.clone(), name_style),
    ];
    if side.picked {
        spans.push(Span::raw(" ✓"));
    }
    if let Some(score) = side.score {
        spans.push(Span::styled(
            format!(" {score}"),
            Style::default().add_modifier(Modifier::BOLD),
        ));
    }
    spans
}

fn team_color(hex: &str) -> Color {
    hex_rgb(hex)
        .map(|(r, g, b)| Color::Rgb(r, g, b))
        .unwrap_or(Color::DarkGray)
}

fn render_leaderboard(frame: &mut Frame, area: Rect, state: &AppState) {
    let sections = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(1)])
        .split(area);

    let summary = state.personal_summary();
    let summary_text = format!(
        "Rank {}   Points {}   Correct {}/{}",
        summary.rank_label(),
        summary.points,
        summary.correct,
        summary.total
    );
    let card = Paragraph::new(summary_text)
        .block(Block::default().title("Your season").borders(Borders::ALL));
    frame.render_widget(card, sections[0]);

    render_board_lines(
        frame,
        sections[1],
        &state.leaderboard_lines(),
        EMPTY_LEADERBOARD_MESSAGE,
    );
}

fn render_board_lines(frame: &mut Frame, area: Rect, lines: &[LeaderboardLine], empty: &str) {
    if lines.is_empty() {
        let paragraph = Paragraph::new(empty).style(Style::default().fg(Color::DarkGray));
        frame.render_widget(paragraph, area);
        return;
    }
    let rows = lines
        .iter()
        .map(|line| {
            let mut style = Style::default();
            if line.top_three {
                style = style.add_modifier(Modifier::BOLD);
            }
            if line.is_me {
                style = style.fg(Color::Cyan);
            }
            let name = if line.is_me {
                format!("{} (you)", line.name)
            } else {
                line.name.clone()
            };
            Line::styled(
                format!(
                    "{:>3}  {:<24} {:>8}  {}",
                    line.rank_label, name, line.points_label, line.detail_label
                ),
                style,
            )
        })
        .collect::<Vec<_>>();
    frame.render_widget(Paragraph::new(rows), area);
}

fn render_groups(frame: &mut Frame, area: Rect, state: &AppState) {
    let cards = state.group_cards();
    if cards.is_empty() {
        let empty = Paragraph::new(EMPTY_GROUPS_MESSAGE)
            .wrap(Wrap { trim: true })
            .style(Style::default().fg(Color::DarkGray));
        frame.render_widget(empty, area);
        return;
    }

    let visible = area.height.max(1) as usize;
    let (start, end) = visible_range(state.group_cursor, cards.len(), visible);
    let lines = cards[start..end]
        .iter()
        .enumerate()
        .map(|(offset, card)| {
            let selected = start + offset == state.group_cursor;
            let style = if selected {
                Style::default().bg(Color::DarkGray)
            } else {
                Style::default()
            };
            let prefix = if selected { "> " } else { "  " };
            Line::styled(
                format!(
                    "{prefix}{:<24} {:>12}   code {}",
                    card.name, card.members_label, card.code
                ),
                style,
            )
        })
        .collect::<Vec<_>>();
    frame.render_widget(Paragraph::new(lines), area);
}

fn render_group_board(frame: &mut Frame, area: Rect, state: &AppState) {
    let Some(board) = state.group_board.as_ref() else {
        return;
    };
    let block = Block::default()
        .title(format!("{} (code {})", board.name, board.code))
        .borders(Borders::ALL);
    let inner = block.inner(area);
    frame.render_widget(block, area);

    if board.loading {
        let loading = Paragraph::new("Loading...").style(Style::default().fg(Color::DarkGray));
        frame.render_widget(loading, inner);
        return;
    }
    let me = state.current_user().map(|u| u.id);
    render_board_lines(
        frame,
        inner,
        &leaderboard_lines(&board.rows, me),
        EMPTY_GROUP_MEMBERS_MESSAGE,
    );
}

fn console_text(state: &AppState) -> String {
    if state.logs.is_empty() {
        return String::new();
    }
    let start = state.logs.len().saturating_sub(2);
    state
        .logs
        .iter()
        .skip(start)
        .cloned()
        .collect::<Vec<_>>()
        .join("\n")
}

/// Top-right box sized to the message, kept inside `area`.
fn toast_rect(area: Rect, message: &str) -> Rect {
    let text_width = u16::try_from(message.chars().count()).unwrap_or(u16::MAX);
    let width = text_width.saturating_add(4).min(area.width);
    let top = area.height.min(1);
    Rect {
        x: area.x + area.width.saturating_sub(width.saturating_add(1)),
        y: area.y + top,
        width,
        height: 3.min(area.height - top),
    }
}

fn render_toast(frame: &mut Frame, area: Rect, message: &str) {
    let toast_area = toast_rect(area, message);
    frame.render_widget(Clear, toast_area);
    let style = if message.starts_with("Error") {
        Style::default().fg(Color::Red)
    } else {
        Style::default().fg(Color::Green)
    };
    let toast = Paragraph::new(message.to_string())
        .style(style)
        .block(Block::default().borders(Borders::ALL));
    frame.render_widget(toast, toast_area);
}

fn render_prompt(frame: &mut Frame, area: Rect, title: &str, input: &str) {
    let popup = centered_rect(50, 20, area);
    frame.render_widget(Clear, popup);
    let text = format!("{input}_\n\nEnter to confirm, Esc to cancel");
    let paragraph = Paragraph::new(text)
        .block(Block::default().title(title.to_string()).borders(Borders::ALL));
    frame.render_widget(paragraph, popup);
}

fn visible_range(selected: usize, total: usize, visible: usize) -> (usize, usize) {
    if total == 0 {
        return (0, 0);
    }
    if total <= visible {
        return (0, total);
    }

    let mut start = selected.saturating_sub(visible / 2);
    if start + visible > total {
        start = total - visible;
    }
    (start, start + visible)
}

fn render_help_overlay(frame: &mut Frame, area: Rect) {
    let popup_area = centered_rect(60, 70, area);
    frame.render_widget(Clear, popup_area);

    let text = [
        "CMK Tipping - Help",
        "",
        "Global:",
        "  1 / 2 / 3    Tips / Leaderboard / Groups",
        "  o            Log out",
        "  ?            Toggle help",
        "  q            Quit",
        "",
        "Tips:",
        "  [ / ]        Previous / next round",
        "  j/k or ↑/↓   Move between fixtures",
        "  h/l or ←/→   Pick home / away",
        "  + / -        Adjust margin",
        "  Enter        Lock in tips",
        "",
        "Groups:",
        "  n            Create group",
        "  g            Join with code",
        "  Enter        Group leaderboard",
        "  b / Esc      Back",
    ]
    .join("\n");

    let help = Paragraph::new(text)
        .block(Block::default().title("Help").borders(Borders::ALL))
        .style(Style::default());
    frame.render_widget(help, popup_area);
}

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);

    let horizontal = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(vertical[1]);

    horizontal[1]
}
