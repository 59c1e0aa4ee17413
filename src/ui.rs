//! Terminal front end: view model, key handling and rendering.

use std::time::{Duration, Instant};

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::{prelude::*, widgets::*};
use tracing::debug;

use crate::{
    app::{App, InputField},
    clock::Clock,
    format::{format_time, format_timestamp},
    history::HistoryEntry,
    presenter::{Controls, Presenter},
    storage::Storage,
};

const FLASH_FOR: Duration = Duration::from_secs(5);
const FLASH_PHASE_MS: u128 = 400;
const ACCENT: Color = Color::Rgb(0, 200, 255);
const RUNNING: Color = Color::Rgb(100, 181, 246);
const EXPIRED: Color = Color::Rgb(255, 0, 100);

// ============================================================================
// View Model
// ============================================================================

#[derive(Debug)]
pub struct Screen {
    display: String,
    elapsed: String,
    controls: Controls,
    rows: Vec<HistoryEntry>,
    selected: usize,
    flash_started: Option<Instant>,
    alarm: bool,
    alert: Option<String>,
    focus: InputField,
    editing: bool,
    edit_buffer: String,
}

impl Default for Screen {
    fn default() -> Self {
        Self::new()
    }
}

impl Screen {
    pub fn new() -> Self {
        Self {
            display: format_time(0),
            elapsed: String::new(),
            controls: Controls::Stopped,
            rows: Vec::new(),
            selected: 0,
            flash_started: None,
            alarm: false,
            alert: None,
            focus: InputField::Minutes,
            editing: false,
            edit_buffer: String::new(),
        }
    }

    pub fn display(&self) -> &str {
        &self.display
    }

    pub fn controls(&self) -> Controls {
        self.controls
    }

    /// History rows, most recent first.
    pub fn rows(&self) -> &[HistoryEntry] {
        &self.rows
    }

    pub fn selected_id(&self) -> Option<u64> {
        self.rows.get(self.selected).map(|e| e.id)
    }

    pub fn select_next(&mut self) {
        if !self.rows.is_empty() {
            self.selected = (self.selected + 1).min(self.rows.len() - 1);
        }
    }

    pub fn select_prev(&mut self) {
        self.selected = self.selected.saturating_sub(1);
    }

    /// True once per expiry; used to fire the desktop notification.
    pub fn take_alarm(&mut self) -> bool {
        std::mem::take(&mut self.alarm)
    }

    /// `Some(on)` while the expiry flash is active.
    pub fn flash_phase(&self, now: Instant) -> Option<bool> {
        let started = self.flash_started?;
        let since = now.saturating_duration_since(started);
        if since >= FLASH_FOR {
            return None;
        }
        Some((since.as_millis() / FLASH_PHASE_MS) % 2 == 0)
    }

    pub fn alert_message(&self) -> Option<&str> {
        self.alert.as_deref()
    }

    pub fn focus(&self) -> InputField {
        self.focus
    }

    pub fn editing(&self) -> bool {
        self.editing
    }

    fn clamp_selection(&mut self) {
        self.selected = self.selected.min(self.rows.len().saturating_sub(1));
    }
}

impl Presenter for Screen {
    fn show_display(&mut self, text: String) {
        self.display = text;
    }

    fn show_elapsed(&mut self, text: String) {
        self.elapsed = text;
    }

    fn set_controls(&mut self, controls: Controls) {
        self.controls = controls;
    }

    fn prepend_entry(&mut self, entry: &HistoryEntry) {
        self.rows.insert(0, entry.clone());
    }

    fn remove_entry(&mut self, id: u64) {
        self.rows.retain(|e| e.id != id);
        self.clamp_selection();
    }

    fn clear_entries(&mut self) {
        self.rows.clear();
        self.selected = 0;
    }

    fn flash_expired(&mut self) {
        self.flash_started = Some(Instant::now());
        self.alarm = true;
    }

    fn alert(&mut self, message: &str) {
        self.alert = Some(message.to_string());
    }
}

// ============================================================================
// Event Handlers
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    None,
    Quit,
    Export,
}

pub fn handle_key<C, S>(key: KeyEvent, app: &mut App<C, S, Screen>) -> Action
where
    C: Clock + Clone,
    S: Storage,
{
    // Any key dismisses an alert
    if app.presenter_mut().alert.take().is_some() {
        return Action::None;
    }

    if app.clear_pending() {
        match key.code {
            KeyCode::Char('y') | KeyCode::Char('Y') => app.confirm_clear_history(true),
            KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => app.confirm_clear_history(false),
            _ => {}
        }
        return Action::None;
    }

    if app.presenter().editing {
        handle_edit_key(key, app);
        return Action::None;
    }

    handle_main_key(key, app)
}

fn handle_edit_key<C, S>(key: KeyEvent, app: &mut App<C, S, Screen>)
where
    C: Clock + Clone,
    S: Storage,
{
    let screen = app.presenter_mut();
    match key.code {
        KeyCode::Char(c) if !screen.focus.numeric() || c.is_ascii_digit() => screen.edit_buffer.push(c),
        KeyCode::Backspace => { screen.edit_buffer.pop(); }
        KeyCode::Enter => {
            screen.editing = false;
            let field = screen.focus;
            let value = std::mem::take(&mut screen.edit_buffer);
            app.set_input(field, &value);
        }
        KeyCode::Esc => {
            screen.editing = false;
            screen.edit_buffer.clear();
        }
        _ => {}
    }
}

fn handle_main_key<C, S>(key: KeyEvent, app: &mut App<C, S, Screen>) -> Action
where
    C: Clock + Clone,
    S: Storage,
{
    if matches!(key.code, KeyCode::Char('q') | KeyCode::Esc) ||
       (key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL)) {
        return Action::Quit;
    }

    let result = match key.code {
        KeyCode::Char(' ') | KeyCode::Enter => app.handle_start(),
        KeyCode::Char('p') => app.handle_pause(),
        KeyCode::Char('x') => app.handle_stop(),
        KeyCode::Tab => {
            let screen = app.presenter_mut();
            screen.focus = screen.focus.next();
            Ok(())
        }
        KeyCode::Char('e') => {
            let value = app.inputs().get(app.presenter().focus).to_string();
            let screen = app.presenter_mut();
            screen.edit_buffer = value;
            screen.editing = true;
            Ok(())
        }
        KeyCode::Down | KeyCode::Char('j') => {
            app.presenter_mut().select_next();
            Ok(())
        }
        KeyCode::Up | KeyCode::Char('k') => {
            app.presenter_mut().select_prev();
            Ok(())
        }
        KeyCode::Char('d') | KeyCode::Delete => {
            if let Some(id) = app.presenter().selected_id() {
                app.remove_history_entry(id);
            }
            Ok(())
        }
        KeyCode::Char('c') => {
            app.request_clear_history();
            Ok(())
        }
        KeyCode::Char('E') => return Action::Export,
        _ => Ok(()),
    };

    if let Err(e) = result {
        debug!("Key {:?} rejected: {}", key.code, e);
    }
    Action::None
}

// ============================================================================
// Rendering
// ============================================================================

pub fn render<C, S>(f: &mut Frame, app: &App<C, S, Screen>)
where
    C: Clock + Clone,
    S: Storage,
{
    let screen = app.presenter();
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(5),
            Constraint::Length(3),
            Constraint::Length(2),
            Constraint::Min(4),
            Constraint::Length(3),
        ])
        .split(f.size());

    let header = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(ACCENT))
        .title(Span::styled(" ⏱ RCOUNTDOWN ", Style::default()
            .fg(ACCENT).add_modifier(Modifier::BOLD)))
        .title_alignment(Alignment::Center);
    f.render_widget(header, chunks[0]);

    render_display(f, screen, chunks[1]);
    render_inputs(f, app, chunks[2]);
    render_controls(f, screen, chunks[3]);
    render_history(f, screen, chunks[4]);
    render_footer(f, screen, chunks[5]);

    if app.clear_pending() {
        render_confirm(f);
    }
}

fn render_display(f: &mut Frame, screen: &Screen, area: Rect) {
    let color = match (screen.flash_phase(Instant::now()), screen.controls) {
        (Some(true), _) => EXPIRED,
        (Some(false), _) => Color::DarkGray,
        (None, Controls::Running) => RUNNING,
        (None, Controls::Paused) => Color::Yellow,
        (None, Controls::Stopped) => Color::White,
    };

    let lines = vec![
        Line::from(""),
        Line::from(Span::styled(screen.display.as_str(), Style::default()
            .fg(color).add_modifier(Modifier::BOLD))),
        Line::from(Span::styled(screen.elapsed.as_str(), Style::default().fg(Color::Gray))),
    ];

    f.render_widget(
        Paragraph::new(lines)
            .alignment(Alignment::Center)
            .block(Block::default()
                .borders(Borders::ALL)
                .border_type(BorderType::Rounded)
                .border_style(Style::default().fg(color))),
        area
    );
}

fn render_inputs<C, S>(f: &mut Frame, app: &App<C, S, Screen>, area: Rect)
where
    C: Clock + Clone,
    S: Storage,
{
    let screen = app.presenter();
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(25), Constraint::Percentage(25), Constraint::Percentage(50)])
        .split(area);

    for (field, column) in [InputField::Minutes, InputField::Seconds, InputField::Label].into_iter().zip(columns.iter()) {
        let focused = screen.focus == field;
        let editing = focused && screen.editing;

        let content = if editing {
            Line::from(vec![
                Span::styled(screen.edit_buffer.as_str(), Style::default().fg(Color::Green).add_modifier(Modifier::BOLD)),
                Span::styled("█", Style::default().fg(Color::Green)),
            ])
        } else {
            Line::from(Span::raw(app.inputs().get(field)))
        };

        let border = if editing {
            Color::Green
        } else if focused {
            ACCENT
        } else {
            Color::DarkGray
        };

        f.render_widget(
            Paragraph::new(content).block(Block::default()
                .title(format!(" {} ", field.name()))
                .borders(Borders::ALL)
                .border_type(BorderType::Rounded)
                .border_style(Style::default().fg(border))),
            *column
        );
    }
}

fn render_controls(f: &mut Frame, screen: &Screen, area: Rect) {
    let controls = screen.controls;
    let line = Line::from(vec![
        control_span(&format!("[Space] {}", controls.start_label()), controls.start_enabled()),
        Span::raw("   "),
        control_span("[P] Pause", controls.pause_enabled()),
        Span::raw("   "),
        control_span("[X] Stop", controls.stop_enabled()),
    ]);

    f.render_widget(Paragraph::new(vec![Line::from(""), line]).alignment(Alignment::Center), area);
}

fn control_span(text: &str, enabled: bool) -> Span<'static> {
    let style = if enabled {
        Style::default().fg(Color::White).add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(Color::DarkGray)
    };
    Span::styled(text.to_string(), style)
}

fn render_history(f: &mut Frame, screen: &Screen, area: Rect) {
    let mut lines = Vec::new();

    if screen.rows.is_empty() {
        lines.push(Line::from(Span::styled("  No sessions yet!", Style::default().fg(Color::DarkGray))));
    }

    for (idx, entry) in screen.rows.iter().enumerate() {
        let selected = idx == screen.selected;
        let (prefix, style) = if selected {
            ("► ", Style::default().fg(Color::White).add_modifier(Modifier::BOLD))
        } else {
            ("  ", Style::default().fg(Color::Gray))
        };

        let mut spans = vec![
            Span::styled(prefix, Style::default().fg(ACCENT)),
            Span::styled(format_timestamp(entry.timestamp), style),
        ];
        if !entry.label.is_empty() {
            spans.push(Span::styled(format!(" ({})", entry.label), Style::default().fg(Color::Cyan)));
        }
        spans.push(Span::raw(" • "));
        spans.push(Span::styled(format!("Time Left: {}", format_time(entry.remaining)), style));
        spans.push(Span::raw(" • "));
        spans.push(Span::styled(format!("Elapsed: {}", format_time(entry.elapsed)), style));
        lines.push(Line::from(spans));
    }

    // keep the selected row visible
    let visible = area.height.saturating_sub(2) as usize;
    let scroll = screen.selected.saturating_sub(visible.saturating_sub(1));

    f.render_widget(
        Paragraph::new(lines)
            .scroll((scroll as u16, 0))
            .block(Block::default()
                .title(" History ")
                .title_alignment(Alignment::Center)
                .borders(Borders::ALL)
                .border_type(BorderType::Rounded)
                .border_style(Style::default().fg(ACCENT))),
        area
    );
}

fn render_footer(f: &mut Frame, screen: &Screen, area: Rect) {
    let line = match (&screen.alert, screen.editing) {
        (Some(message), _) => Line::from(vec![
            Span::styled(format!("⚠️  {}", message), Style::default().fg(Color::Red).add_modifier(Modifier::BOLD)),
            Span::styled("  (any key)", Style::default().fg(Color::DarkGray)),
        ]),
        (None, true) => Line::from(Span::styled(
            "Type value  •  Enter: Save  •  Esc: Cancel",
            Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC))),
        (None, false) => Line::from(Span::styled(
            "Tab: Field  •  E: Edit  •  ↑↓/jk: Select  •  D: Remove  •  C: Clear  •  Shift+E: Export  •  Q: Quit",
            Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC))),
    };

    f.render_widget(
        Paragraph::new(line)
            .alignment(Alignment::Center)
            .block(Block::default().borders(Borders::TOP).border_style(Style::default().fg(Color::DarkGray))),
        area
    );
}

fn render_confirm(f: &mut Frame) {
    let area = centered_rect(60, 25, f.size());
    let lines = vec![
        Line::from(""),
        Line::from(Span::styled("⚠️  Are you sure you want to clear the history?",
            Style::default().fg(Color::Red).add_modifier(Modifier::BOLD))),
        Line::from(""),
        Line::from(Span::styled("Y: Confirm  •  N/Esc: Cancel",
            Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC))),
    ];

    f.render_widget(Clear, area);
    f.render_widget(
        Paragraph::new(lines)
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true })
            .block(Block::default()
                .title(" Clear History ")
                .title_alignment(Alignment::Center)
                .borders(Borders::ALL)
                .border_type(BorderType::Rounded)
                .border_style(Style::default().fg(Color::Red))),
        area
    );
}

fn centered_rect(w: u16, h: u16, r: Rect) -> Rect {
    let v = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - h) / 2),
            Constraint::Percentage(h),
            Constraint::Percentage((100 - h) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - w) / 2),
            Constraint::Percentage(w),
            Constraint::Percentage((100 - w) / 2),
        ])
        .split(v[1])[1]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        app::Inputs,
        clock::ManualClock,
        history::HistoryStore,
        storage::MemoryStorage,
    };
    use ratatui::backend::TestBackend;

    type TestApp = App<ManualClock, MemoryStorage, Screen>;

    fn app() -> (TestApp, ManualClock) {
        let clock = ManualClock::new(1_700_000_000_000);
        let app = App::new(
            clock.clone(),
            10,
            HistoryStore::new(MemoryStorage::new()),
            Screen::new(),
            Inputs::new(0, 3, ""),
        );
        (app, clock)
    }

    fn press(app: &mut TestApp, code: KeyCode) -> Action {
        handle_key(KeyEvent::new(code, KeyModifiers::NONE), app)
    }

    fn type_text(app: &mut TestApp, text: &str) {
        for c in text.chars() {
            press(app, KeyCode::Char(c));
        }
    }

    fn screen_text(app: &TestApp) -> String {
        let mut terminal = Terminal::new(TestBackend::new(100, 30)).unwrap();
        terminal.draw(|f| render(f, app)).unwrap();
        terminal
            .backend()
            .buffer()
            .content
            .iter()
            .map(|cell| cell.symbol())
            .collect()
    }

    #[test]
    fn keys_drive_the_timer() {
        let (mut app, clock) = app();
        assert_eq!(press(&mut app, KeyCode::Char(' ')), Action::None);
        assert_eq!(app.presenter().controls(), Controls::Running);

        clock.advance(1_000);
        press(&mut app, KeyCode::Char('p'));
        assert_eq!(app.presenter().controls(), Controls::Paused);

        press(&mut app, KeyCode::Enter);
        assert_eq!(app.presenter().controls(), Controls::Running);

        press(&mut app, KeyCode::Char('x'));
        assert_eq!(app.presenter().controls(), Controls::Stopped);
        assert_eq!(app.presenter().rows().len(), 1);
        assert_eq!(app.presenter().rows()[0].elapsed, 1_000);
    }

    #[test]
    fn quit_and_export_actions() {
        let (mut app, _) = app();
        assert_eq!(press(&mut app, KeyCode::Char('E')), Action::Export);
        assert_eq!(press(&mut app, KeyCode::Char('q')), Action::Quit);
        assert_eq!(
            handle_key(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL), &mut app),
            Action::Quit
        );
    }

    #[test]
    fn editing_commits_on_enter_and_filters_digits() {
        let (mut app, _) = app();
        press(&mut app, KeyCode::Char('e'));
        assert!(app.presenter().editing());
        press(&mut app, KeyCode::Backspace);
        type_text(&mut app, "1a2");
        press(&mut app, KeyCode::Enter);

        assert!(!app.presenter().editing());
        assert_eq!(app.inputs().minutes, "12");
        assert_eq!(app.presenter().display(), "12:03.00");

        press(&mut app, KeyCode::Tab);
        press(&mut app, KeyCode::Tab);
        assert_eq!(app.presenter().focus(), InputField::Label);
        press(&mut app, KeyCode::Char('e'));
        type_text(&mut app, "tea x");
        press(&mut app, KeyCode::Enter);
        assert_eq!(app.inputs().label, "tea x");
    }

    #[test]
    fn escape_cancels_edit() {
        let (mut app, _) = app();
        press(&mut app, KeyCode::Char('e'));
        type_text(&mut app, "9");
        assert_eq!(press(&mut app, KeyCode::Esc), Action::None);
        assert_eq!(app.inputs().minutes, "0");
    }

    #[test]
    fn clearing_asks_first() {
        let (mut app, _) = app();
        press(&mut app, KeyCode::Char(' '));
        press(&mut app, KeyCode::Char('x'));

        press(&mut app, KeyCode::Char('c'));
        assert!(screen_text(&app).contains("clear the history"));
        press(&mut app, KeyCode::Char('n'));
        assert_eq!(app.presenter().rows().len(), 1);

        press(&mut app, KeyCode::Char('c'));
        press(&mut app, KeyCode::Char('y'));
        assert!(app.presenter().rows().is_empty());
        assert!(app.history().is_empty());
    }

    #[test]
    fn delete_removes_selected_row() {
        let (mut app, _) = app();
        for _ in 0..3 {
            press(&mut app, KeyCode::Char(' '));
            press(&mut app, KeyCode::Char('x'));
        }
        press(&mut app, KeyCode::Down);
        assert_eq!(app.presenter().selected_id(), Some(2));
        press(&mut app, KeyCode::Char('d'));

        let ids: Vec<u64> = app.presenter().rows().iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![3, 1]);

        press(&mut app, KeyCode::Down);
        press(&mut app, KeyCode::Down);
        press(&mut app, KeyCode::Char('d'));
        assert_eq!(app.presenter().selected_id(), Some(3));
    }

    #[test]
    fn alert_is_shown_and_dismissed() {
        let (mut app, _) = app();
        app.presenter_mut().alert("Please enter a valid time (minimum 1 second).");
        assert!(screen_text(&app).contains("minimum 1 second"));

        // the dismissing key is swallowed
        press(&mut app, KeyCode::Char(' '));
        assert!(app.presenter().alert_message().is_none());
        assert_eq!(app.presenter().controls(), Controls::Stopped);
    }

    #[test]
    fn expiry_raises_alarm_once_and_flashes() {
        let (mut app, clock) = app();
        press(&mut app, KeyCode::Char(' '));
        clock.advance(3_000);
        app.on_frame();

        assert!(app.presenter_mut().take_alarm());
        assert!(!app.presenter_mut().take_alarm());
        assert!(app.presenter().flash_phase(Instant::now()).is_some());
        assert!(app.presenter().flash_phase(Instant::now() + FLASH_FOR).is_none());
    }

    #[test]
    fn render_shows_controls_and_history() {
        let (mut app, _) = app();
        let idle = screen_text(&app);
        assert!(idle.contains("00:03.00"));
        assert!(idle.contains("[Space] Start"));
        assert!(idle.contains("No sessions yet!"));

        press(&mut app, KeyCode::Char(' '));
        press(&mut app, KeyCode::Char('p'));
        assert!(screen_text(&app).contains("[Space] Continue"));

        press(&mut app, KeyCode::Char('x'));
        let done = screen_text(&app);
        assert!(done.contains("Time Left: 00:03.00"));
        assert!(done.contains("Elapsed: 00:00.00"));
    }
}
