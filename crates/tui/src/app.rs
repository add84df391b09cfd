use std::{io, thread, time::Duration};

use anyhow::{Context, Result};
use chrono::Utc;
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
    Frame, Terminal,
};
use snakes_core::{
    AppConfig, Board, GameError, GameSession, Phase, SessionRegistry, TurnReport, FINAL_SQUARE,
    MAX_PLAYERS, MIN_PLAYERS,
};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::dice_art;

const TICK_RATE: Duration = Duration::from_millis(250);
const MAX_NAME_LEN: usize = 24;
const BOARD_SIDE: u8 = 10;
const CELL_WIDTH: usize = 8;
const SEAT_COLORS: [Color; MAX_PLAYERS] = [Color::Red, Color::Blue, Color::Green, Color::Magenta];

#[derive(Debug, Clone)]
struct Theme {
    accent: Color,
    muted: Color,
    success: Color,
    warning: Color,
    danger: Color,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            accent: Color::Cyan,
            muted: Color::DarkGray,
            success: Color::Green,
            warning: Color::Yellow,
            danger: Color::Red,
        }
    }
}

fn seat_color(seat: usize) -> Color {
    SEAT_COLORS[seat.saturating_sub(1) % MAX_PLAYERS]
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Screen {
    Lobby,
    Play,
    Finished,
}

#[derive(Debug, Clone, Default)]
struct NameInput {
    input: String,
}

impl NameInput {
    fn insert(&mut self, ch: char) {
        if self.input.chars().count() >= MAX_NAME_LEN {
            return;
        }
        if !ch.is_control() {
            self.input.push(ch);
        }
    }

    fn backspace(&mut self) {
        self.input.pop();
    }

    fn take(&mut self) -> Option<String> {
        let value = self.input.trim().to_string();
        self.input.clear();
        if value.is_empty() {
            None
        } else {
            Some(value)
        }
    }

    fn is_empty(&self) -> bool {
        self.input.trim().is_empty()
    }
}

enum AppEvent {
    Input(Event),
    Tick,
    TurnPaced,
}

/// Hot-seat front-end: every player shares one keyboard and presses their
/// seat number to roll.
pub struct SnakesApp {
    registry: SessionRegistry,
    config: AppConfig,
    board: Board,
    table_id: String,
    screen: Screen,
    name_input: NameInput,
    status: String,
    last_move: Option<TurnReport>,
    final_state: Option<GameSession>,
    pacing: bool,
    should_quit: bool,
    event_tx: Option<mpsc::Sender<AppEvent>>,
    theme: Theme,
}

impl SnakesApp {
    pub fn new(registry: SessionRegistry, config: AppConfig) -> Self {
        let board = registry.board();
        let table_id = config.table_id.clone();
        Self {
            registry,
            config,
            board,
            table_id,
            screen: Screen::Lobby,
            name_input: NameInput::default(),
            status: "Ready".to_string(),
            last_move: None,
            final_state: None,
            pacing: false,
            should_quit: false,
            event_tx: None,
            theme: Theme::default(),
        }
    }

    pub async fn run(&mut self) -> Result<()> {
        self.open_table();

        let mut stdout = io::stdout();
        enable_raw_mode().context("failed to enter raw mode")?;
        execute!(stdout, EnterAlternateScreen).context("failed to enter alternate screen")?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend).context("failed to create terminal")?;
        terminal.hide_cursor()?;
        terminal.clear()?;

        let (event_tx, mut event_rx) = mpsc::channel::<AppEvent>(128);
        spawn_input_thread(event_tx.clone());
        self.event_tx = Some(event_tx);

        loop {
            terminal.draw(|frame| self.draw(frame))?;
            if self.should_quit {
                break;
            }
            let maybe_event = event_rx.recv().await;
            if !self.process_app_event(maybe_event) {
                break;
            }
        }

        restore_terminal(&mut terminal)?;
        self.event_tx = None;
        self.close_table();
        Ok(())
    }

    fn open_table(&mut self) {
        self.screen = Screen::Lobby;
        self.last_move = None;
        self.final_state = None;
        self.pacing = false;
        match self.registry.create(&self.table_id) {
            Ok(artifact) => {
                info!(table = %self.table_id, %artifact, "Lobby opened");
                self.set_status("Welcome to Snakes & Ladders! Type a name and press Enter to join.");
            }
            Err(GameError::AlreadyStarted) => {
                self.set_status(
                    "Only one game per table. Press F5 to finish the current game first.",
                );
            }
            Err(err) => {
                error!(?err, "Failed to open lobby");
                self.set_status(format!("Failed to open lobby: {err}"));
            }
        }
    }

    fn close_table(&mut self) {
        match self.registry.end(&self.table_id) {
            Ok(()) | Err(GameError::UnknownSession(_)) => {}
            Err(err) => warn!(?err, "Failed to release table"),
        }
    }

    fn set_status(&mut self, message: impl Into<String>) {
        self.status = message.into();
    }

    fn session(&self) -> Option<GameSession> {
        match self.screen {
            Screen::Finished => self.final_state.clone(),
            _ => self.registry.snapshot(&self.table_id),
        }
    }

    fn process_app_event(&mut self, maybe_event: Option<AppEvent>) -> bool {
        match maybe_event {
            Some(AppEvent::Input(Event::Key(key))) => {
                if key.kind == KeyEventKind::Press {
                    self.handle_key(key);
                }
                true
            }
            Some(AppEvent::Input(_)) => true,
            Some(AppEvent::Tick) => {
                self.handle_tick();
                true
            }
            Some(AppEvent::TurnPaced) => {
                self.finish_turn();
                true
            }
            None => false,
        }
    }

    fn handle_tick(&mut self) {
        let expired = self.registry.expire_idle(Utc::now());
        if expired.iter().any(|id| id == &self.table_id) && self.screen != Screen::Finished {
            self.open_table();
            self.set_status("The idle game expired; a new lobby is open.");
        }
    }

    fn handle_key(&mut self, key: KeyEvent) {
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            self.should_quit = true;
            return;
        }
        match self.screen {
            Screen::Lobby => self.handle_lobby_key(key),
            Screen::Play => self.handle_play_key(key),
            Screen::Finished => self.handle_finished_key(key),
        }
    }

    fn handle_lobby_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Esc => self.should_quit = true,
            KeyCode::Backspace => self.name_input.backspace(),
            KeyCode::F(5) => self.finish_game(),
            KeyCode::Enter if self.name_input.is_empty() => self.start_game(),
            KeyCode::Enter => {
                if let Some(name) = self.name_input.take() {
                    self.join(name);
                }
            }
            KeyCode::Char(ch) => self.name_input.insert(ch),
            _ => {}
        }
    }

    fn join(&mut self, name: String) {
        let player_id = name.to_lowercase();
        match self.registry.join(&self.table_id, &player_id, &name) {
            Ok(player) => {
                let mut message = format!("Player {} - {} joined.", player.seat, player.name);
                if player.seat >= MIN_PLAYERS {
                    message.push_str(" Press Enter on an empty name to start.");
                }
                self.set_status(message);
            }
            Err(GameError::AlreadyJoined) => {
                self.set_status(format!("{name}! You have already joined!"));
            }
            Err(err) => self.set_status(format!("{name} can't join: {err}")),
        }
    }

    fn start_game(&mut self) {
        match self.registry.start(&self.table_id) {
            Ok(()) => {
                self.screen = Screen::Play;
                self.announce_turn();
            }
            Err(err) => self.set_status(format!("Can't start: {err}")),
        }
    }

    fn handle_play_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => self.should_quit = true,
            KeyCode::Char('f') | KeyCode::Char('F') => self.finish_game(),
            _ if self.pacing => {}
            KeyCode::Char(ch @ '1'..='4') => {
                let seat = ch.to_digit(10).map(|d| d as usize).unwrap_or_default();
                self.roll_for_seat(seat);
            }
            KeyCode::Char(' ') | KeyCode::Char('r') | KeyCode::Enter => {
                let current = self
                    .session()
                    .and_then(|session| session.current_player().map(|p| p.seat));
                if let Some(seat) = current {
                    self.roll_for_seat(seat);
                }
            }
            _ => {}
        }
    }

    fn handle_finished_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => self.should_quit = true,
            KeyCode::Enter | KeyCode::Char('n') => self.open_table(),
            _ => {}
        }
    }

    fn roll_for_seat(&mut self, seat: usize) {
        let Some(session) = self.session() else {
            return;
        };
        let Some(player) = session.players().iter().find(|p| p.seat == seat) else {
            self.set_status(format!("Nobody sits in seat {seat}."));
            return;
        };
        if !self.registry.is_players_turn(&self.table_id, &player.id) {
            self.set_status(format!("{}! It's not your turn!", player.name));
            return;
        }

        match self.registry.take_turn(&self.table_id, &player.id) {
            Ok(report) => {
                debug!(seat, roll = report.result.roll, to = report.result.to, "Move shown");
                self.set_status(report.result.to_string().replace('\n', " "));
                self.last_move = Some(report);
                self.schedule_pacing();
            }
            Err(err) => self.set_status(format!("Roll rejected: {err}")),
        }
    }

    /// Hold the board for the configured delay before the next turn starts.
    fn schedule_pacing(&mut self) {
        let Some(tx) = self.event_tx.clone() else {
            self.finish_turn();
            return;
        };
        self.pacing = true;
        let delay = self.config.turn_delay();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = tx.send(AppEvent::TurnPaced).await;
        });
    }

    fn finish_turn(&mut self) {
        if !self.pacing && self.event_tx.is_some() {
            return;
        }
        self.pacing = false;
        if self.screen != Screen::Play {
            return;
        }

        if self.registry.has_winner(&self.table_id) {
            let state = self.registry.snapshot(&self.table_id);
            let winner = state
                .as_ref()
                .and_then(|session| session.winner().map(|p| p.name.clone()))
                .unwrap_or_default();
            info!(table = %self.table_id, %winner, "Winner announced");
            self.final_state = state;
            self.screen = Screen::Finished;
            self.close_table();
            self.set_status(format!(
                "{winner} is the winner! Press Enter for a new game or Q to quit."
            ));
            return;
        }

        match self.registry.advance_turn(&self.table_id) {
            Ok(()) => self.announce_turn(),
            Err(err) => {
                error!(?err, "Failed to advance turn");
                self.set_status(format!("Failed to advance turn: {err}"));
            }
        }
    }

    fn announce_turn(&mut self) {
        if let Some(session) = self.session() {
            if let Some(player) = session.current_player() {
                self.set_status(format!(
                    "Turn #{}: {}, it's your turn! Press {} to roll.",
                    session.round(),
                    player.name,
                    player.seat
                ));
            }
        }
    }

    fn finish_game(&mut self) {
        self.close_table();
        self.open_table();
        self.set_status("Game exited. Type a name to start a new one!");
    }

    fn draw(&mut self, frame: &mut Frame) {
        let area = frame.size();
        let layout = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3),
                Constraint::Min(12),
                Constraint::Length(4),
            ])
            .split(area);

        let session = self.session();
        self.render_title(frame, layout[0], session.as_ref());

        let body = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([
                Constraint::Length((CELL_WIDTH * usize::from(BOARD_SIDE)) as u16 + 2),
                Constraint::Min(24),
            ])
            .split(layout[1]);
        self.render_board(frame, body[0], session.as_ref());
        self.render_side_panel(frame, body[1], session.as_ref());
        self.render_status(frame, layout[2]);
    }

    fn render_title(&self, frame: &mut Frame, area: Rect, session: Option<&GameSession>) {
        let title = match (self.screen, session) {
            (Screen::Lobby, _) => "Welcome to Snakes & Ladders".to_string(),
            (_, Some(session)) => format!("Turn #{}", session.round()),
            (_, None) => "Snakes & Ladders".to_string(),
        };
        let paragraph = Paragraph::new(Line::from(Span::styled(
            title,
            Style::default()
                .fg(self.theme.accent)
                .add_modifier(Modifier::BOLD),
        )))
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::ALL));
        frame.render_widget(paragraph, area);
    }

    fn render_board(&self, frame: &mut Frame, area: Rect, session: Option<&GameSession>) {
        let markers = session.map(GameSession::markers).unwrap_or_default();
        let mut lines = Vec::with_capacity(usize::from(BOARD_SIDE) * 2);
        for row in 0..BOARD_SIDE {
            let mut spans = Vec::new();
            for col in 0..BOARD_SIDE {
                let square = square_at(row, col);
                spans.push(Span::styled(
                    format!("{square:>3}"),
                    self.square_style(square),
                ));
                let mut used = 0;
                spans.push(Span::raw(" "));
                for &(seat, _) in markers.iter().filter(|(_, pos)| *pos == square) {
                    spans.push(Span::styled(
                        seat.to_string(),
                        Style::default()
                            .fg(seat_color(seat))
                            .add_modifier(Modifier::BOLD),
                    ));
                    used += 1;
                }
                spans.push(Span::raw(" ".repeat(CELL_WIDTH.saturating_sub(4 + used))));
            }
            lines.push(Line::from(spans));
            lines.push(Line::from(""));
        }

        let block = Block::default().borders(Borders::ALL).title("Board");
        frame.render_widget(Paragraph::new(lines).block(block), area);
    }

    fn square_style(&self, square: u8) -> Style {
        match self.board.redirect(square) {
            Some(to) if to < square => Style::default().fg(self.theme.danger),
            Some(_) => Style::default().fg(self.theme.success),
            None if square == FINAL_SQUARE => Style::default()
                .fg(self.theme.warning)
                .add_modifier(Modifier::BOLD),
            None => Style::default().fg(self.theme.muted),
        }
    }

    fn render_side_panel(&self, frame: &mut Frame, area: Rect, session: Option<&GameSession>) {
        let mut lines: Vec<Line> = Vec::new();

        if self.screen == Screen::Lobby {
            lines.push(Line::from(vec![
                Span::styled("Name: ", Style::default().fg(self.theme.accent)),
                Span::raw(format!("{}_", self.name_input.input)),
            ]));
            lines.push(Line::from(""));
        }

        let current = session
            .filter(|s| s.phase() == Phase::InProgress)
            .and_then(GameSession::current_player)
            .map(|p| p.seat);
        for player in session.map(GameSession::players).unwrap_or_default() {
            let pointer = if current == Some(player.seat) { "> " } else { "  " };
            lines.push(Line::from(vec![
                Span::raw(pointer),
                Span::styled(
                    format!("Player {} - {}", player.seat, player.name),
                    Style::default().fg(seat_color(player.seat)),
                ),
                Span::styled(
                    format!("  @ {}", player.position),
                    Style::default().fg(self.theme.muted),
                ),
            ]));
        }
        if session.map(|s| s.players().is_empty()).unwrap_or(true) {
            lines.push(Line::from(Span::styled(
                "No players yet",
                Style::default().fg(self.theme.muted),
            )));
        }

        if let Some(report) = &self.last_move {
            lines.push(Line::from(""));
            for row in dice_art::render(report.result.roll) {
                lines.push(Line::from(Span::styled(
                    row,
                    Style::default().fg(seat_color(report.result.seat)),
                )));
            }
        }

        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            "Ladders",
            Style::default().fg(self.theme.success),
        )));
        lines.push(Line::from(jump_list(self.board.ladders())));
        lines.push(Line::from(Span::styled(
            "Snakes",
            Style::default().fg(self.theme.danger),
        )));
        lines.push(Line::from(jump_list(self.board.snakes())));

        lines.push(Line::from(""));
        for hint in self.help_lines() {
            lines.push(Line::from(Span::styled(
                hint,
                Style::default().fg(self.theme.muted),
            )));
        }

        let block = Block::default().borders(Borders::ALL).title("Players");
        let paragraph = Paragraph::new(lines)
            .block(block)
            .wrap(Wrap { trim: false });
        frame.render_widget(paragraph, area);
    }

    fn help_lines(&self) -> Vec<String> {
        match self.screen {
            Screen::Lobby => vec![
                format!("Enter: join (up to {MAX_PLAYERS})"),
                format!("Enter on empty name: start ({MIN_PLAYERS}+ players)"),
                "F5: finish current game".to_string(),
                "Esc: quit".to_string(),
            ],
            Screen::Play => vec![
                "1-4: roll for that seat".to_string(),
                "Space: roll for current player".to_string(),
                "F: finish game  Q: quit".to_string(),
            ],
            Screen::Finished => vec!["Enter: new game  Q: quit".to_string()],
        }
    }

    fn render_status(&self, frame: &mut Frame, area: Rect) {
        let block = Block::default().borders(Borders::ALL).title("Status");
        let primary = Span::styled(self.status.clone(), Style::default());
        let secondary = match &self.last_move {
            Some(TurnReport {
                artifact: Some(artifact),
                ..
            }) => format!("Board: {artifact}"),
            Some(_) => "Board: not redrawn".to_string(),
            None => format!("Table: {}", self.table_id),
        };
        let paragraph = Paragraph::new(vec![
            Line::from(primary),
            Line::from(Span::styled(
                secondary,
                Style::default().fg(self.theme.muted),
            )),
        ])
        .block(block)
        .wrap(Wrap { trim: true });
        frame.render_widget(paragraph, area);
    }
}

/// Square shown at `row` (0 = top) and `col` (0 = left). Rows snake back and
/// forth with square 1 in the bottom-left corner.
fn square_at(row: u8, col: u8) -> u8 {
    let from_bottom = BOARD_SIDE - 1 - row;
    let offset = if from_bottom % 2 == 0 {
        col
    } else {
        BOARD_SIDE - 1 - col
    };
    from_bottom * BOARD_SIDE + offset + 1
}

fn jump_list(jumps: impl Iterator<Item = snakes_core::Jump>) -> String {
    jumps
        .map(|jump| format!("{}>{}", jump.from, jump.to))
        .collect::<Vec<_>>()
        .join(" ")
}

fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<io::Stdout>>) -> Result<()> {
    disable_raw_mode().context("failed to disable raw mode")?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)
        .context("failed to leave alternate screen")?;
    terminal.show_cursor()?;
    Ok(())
}

fn spawn_input_thread(sender: mpsc::Sender<AppEvent>) {
    thread::spawn(move || loop {
        match event::poll(TICK_RATE) {
            Ok(true) => match event::read() {
                Ok(evt) => {
                    if sender.blocking_send(AppEvent::Input(evt)).is_err() {
                        break;
                    }
                }
                Err(_) => break,
            },
            Ok(false) => {
                if sender.blocking_send(AppEvent::Tick).is_err() {
                    break;
                }
            }
            Err(_) => break,
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use snakes_core::ScriptedDice;

    #[test]
    fn grid_snakes_from_bottom_left() {
        assert_eq!(square_at(9, 0), 1);
        assert_eq!(square_at(9, 9), 10);
        assert_eq!(square_at(8, 9), 11);
        assert_eq!(square_at(8, 0), 20);
        assert_eq!(square_at(0, 0), 100);
        assert_eq!(square_at(0, 9), 91);
    }

    #[test]
    fn name_input_trims_and_caps_length() {
        let mut input = NameInput::default();
        for ch in "  Ann  ".chars() {
            input.insert(ch);
        }
        input.insert('\n');
        assert_eq!(input.take().as_deref(), Some("Ann"));
        assert!(input.take().is_none());

        for _ in 0..MAX_NAME_LEN + 5 {
            input.insert('x');
        }
        assert_eq!(input.input.chars().count(), MAX_NAME_LEN);
    }

    #[derive(Default)]
    struct NoBoards;

    impl snakes_core::BoardRenderer for NoBoards {
        fn render(
            &self,
            session_id: &str,
            _markers: &[(usize, u8)],
        ) -> Result<snakes_core::ArtifactRef> {
            Ok(snakes_core::ArtifactRef(session_id.to_string()))
        }

        fn exists(&self, _session_id: &str) -> bool {
            false
        }

        fn release(&self, _session_id: &str) -> Result<()> {
            Ok(())
        }

        fn purge(&self) -> Result<usize> {
            Ok(0)
        }
    }

    fn app(rolls: Vec<u8>) -> SnakesApp {
        let registry = SessionRegistry::new(
            NoBoards,
            ScriptedDice::new(rolls),
            chrono::Duration::hours(1),
        );
        let mut app = SnakesApp::new(registry, AppConfig::default());
        app.open_table();
        app
    }

    fn press(app: &mut SnakesApp, code: KeyCode) {
        app.handle_key(KeyEvent::new(code, KeyModifiers::NONE));
    }

    fn type_name(app: &mut SnakesApp, name: &str) {
        for ch in name.chars() {
            press(app, KeyCode::Char(ch));
        }
        press(app, KeyCode::Enter);
    }

    #[test]
    fn hot_seat_round_trip() {
        let mut app = app(vec![1, 2]);
        type_name(&mut app, "Ann");
        type_name(&mut app, "ann");
        assert!(app.status.contains("already joined"));
        type_name(&mut app, "Bob");
        press(&mut app, KeyCode::Enter);
        assert_eq!(app.screen, Screen::Play);

        press(&mut app, KeyCode::Char('2'));
        assert!(app.status.contains("not your turn"));

        // without an event loop the pacing delay is skipped
        press(&mut app, KeyCode::Char('1'));
        let session = app.session().unwrap();
        assert_eq!(session.players()[0].position, 38);
        assert!(session.is_players_turn("bob"));
        assert_eq!(session.round(), 2);
    }

    #[test]
    fn start_is_refused_with_one_player() {
        let mut app = app(vec![1]);
        type_name(&mut app, "Ann");
        press(&mut app, KeyCode::Enter);
        assert_eq!(app.screen, Screen::Lobby);
        assert!(app.status.contains("Can't start"));
    }

    struct BlankOnly;

    impl snakes_core::BoardRenderer for BlankOnly {
        fn render(
            &self,
            session_id: &str,
            markers: &[(usize, u8)],
        ) -> Result<snakes_core::ArtifactRef> {
            if !markers.is_empty() {
                anyhow::bail!("disk full");
            }
            Ok(snakes_core::ArtifactRef(session_id.to_string()))
        }

        fn exists(&self, _session_id: &str) -> bool {
            false
        }

        fn release(&self, _session_id: &str) -> Result<()> {
            Ok(())
        }

        fn purge(&self) -> Result<usize> {
            Ok(0)
        }
    }

    #[test]
    fn move_is_shown_when_the_board_cannot_be_redrawn() {
        let registry = SessionRegistry::new(
            BlankOnly,
            ScriptedDice::new(vec![1]),
            chrono::Duration::hours(1),
        );
        let mut app = SnakesApp::new(registry, AppConfig::default());
        app.open_table();
        type_name(&mut app, "Ann");
        type_name(&mut app, "Bob");
        press(&mut app, KeyCode::Enter);
        assert_eq!(app.screen, Screen::Play);

        press(&mut app, KeyCode::Char('1'));
        assert!(!app.status.contains("Roll rejected"));
        assert!(app
            .last_move
            .as_ref()
            .is_some_and(|report| report.artifact.is_none()));
        let session = app.session().unwrap();
        assert_eq!(session.players()[0].position, 38);
        assert!(session.is_players_turn("bob"));
    }
}
