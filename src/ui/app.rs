use super::events::{key_to_app_event, AppEvent, InputMode};
use super::widgets::{self, DIALOG_TITLE_LIMIT, PROGRESS_WIDTH};
use super::Tui;
use crate::audio::{EngineEvent, PlaybackEngine, Player, PlayerError};
use crate::config::Config;
use crate::resolver::{Extractor, Resolution, ResolutionQueue, ResolveError, TrackResolver};
use anyhow::Result;
use crossterm::event::{Event, EventStream, KeyEvent};
use futures::StreamExt;
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Wrap},
    Frame,
};
use std::time::Instant;
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

const MAX_TOASTS: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Warning,
    Error,
}

impl Severity {
    fn color(self) -> Color {
        match self {
            Severity::Info => Color::Green,
            Severity::Warning => Color::Yellow,
            Severity::Error => Color::Red,
        }
    }
}

#[derive(Debug, Clone)]
struct Notification {
    message: String,
    severity: Severity,
    shown_at: Instant,
}

// One wake-up of the event loop
enum Step {
    Input(Option<std::io::Result<Event>>),
    Tick,
    Engine(EngineEvent),
    Resolved(Resolution),
}

pub struct App<E: PlaybackEngine, X: Extractor> {
    config: Config,
    player: Player<E>,
    resolutions: ResolutionQueue<X>,
    resolved_rx: mpsc::UnboundedReceiver<Resolution>,
    engine_rx: mpsc::UnboundedReceiver<EngineEvent>,

    // UI state
    mode: InputMode,
    url_input: String,
    notifications: Vec<Notification>,
    list_state: ListState,
    should_quit: bool,
}

impl<E: PlaybackEngine, X: Extractor> App<E, X> {
    pub fn new(
        config: Config,
        player: Player<E>,
        resolver: TrackResolver<X>,
        engine_rx: mpsc::UnboundedReceiver<EngineEvent>,
    ) -> Self {
        let (resolved_tx, resolved_rx) = mpsc::unbounded_channel();

        Self {
            config,
            player,
            resolutions: ResolutionQueue::new(resolver, resolved_tx),
            resolved_rx,
            engine_rx,
            mode: InputMode::Normal,
            url_input: String::new(),
            notifications: Vec::new(),
            list_state: ListState::default(),
            should_quit: false,
        }
    }

    pub async fn run(&mut self) -> Result<()> {
        let mut tui = Tui::enter()?;
        let mut input = EventStream::new();
        let mut tick = tokio::time::interval(self.config.player.refresh_interval());
        tick.set_missed_tick_behavior(MissedTickBehavior::Skip);

        info!("UI started");

        while !self.should_quit {
            tui.draw(|f| self.render(f))?;

            let step = tokio::select! {
                event = input.next() => Step::Input(event),
                _ = tick.tick() => Step::Tick,
                Some(event) = self.engine_rx.recv() => Step::Engine(event),
                Some(resolution) = self.resolved_rx.recv() => Step::Resolved(resolution),
            };

            match step {
                Step::Input(Some(Ok(Event::Key(key)))) => self.handle_key(key),
                Step::Input(Some(Ok(_))) => {} // resize and friends just redraw
                Step::Input(Some(Err(e))) => {
                    self.shutdown();
                    return Err(e.into());
                }
                Step::Input(None) => self.should_quit = true,
                Step::Tick => self.on_tick(),
                Step::Engine(event) => self.handle_engine_event(event),
                Step::Resolved(resolution) => self.handle_resolution(resolution),
            }
        }

        self.shutdown();
        tui.restore()
    }

    /// Start resolving a URL in the background and tell the user about it.
    pub fn enqueue(&mut self, url: &str) {
        match self.resolutions.submit(url) {
            Ok(()) => self.notify(Severity::Info, "Fetching video info..."),
            Err(ResolveError::AlreadyInProgress(_)) => {
                self.notify(Severity::Warning, "That URL is already being fetched")
            }
            Err(ResolveError::EmptyUrl) => self.notify(Severity::Warning, "Enter a URL"),
            Err(e) => self.notify(Severity::Warning, e.to_string()),
        }
    }

    fn handle_key(&mut self, key: KeyEvent) {
        if let Some(event) = key_to_app_event(self.mode, key) {
            self.handle_event(event);
        }
    }

    pub fn handle_event(&mut self, event: AppEvent) {
        debug!("Handling {:?}", event);

        match event {
            AppEvent::Quit => self.should_quit = true,

            AppEvent::TogglePlayPause => self.play_pause(),
            AppEvent::NextTrack => {
                let result = self.player.next();
                self.report_step(result);
            }
            AppEvent::PreviousTrack => {
                let result = self.player.previous();
                self.report_step(result);
            }
            AppEvent::SeekForward => self.seek(self.config.player.seek_step()),
            AppEvent::SeekBackward => self.seek(-self.config.player.seek_step()),

            AppEvent::OpenAddUrl => {
                self.url_input.clear();
                self.mode = InputMode::AddUrl;
            }
            AppEvent::RequestDelete => {
                if self.player.current_track().is_some() {
                    self.mode = InputMode::ConfirmDelete;
                } else {
                    self.notify(Severity::Warning, "Nothing to delete");
                }
            }
            AppEvent::ClearPlaylist => {
                if !self.player.is_empty() {
                    self.player.clear();
                    self.notify(Severity::Info, "Playlist cleared");
                }
            }

            AppEvent::Input(c) => self.url_input.push(c),
            AppEvent::Backspace => {
                self.url_input.pop();
            }
            AppEvent::SubmitUrl => {
                let url = self.url_input.trim().to_string();
                if url.is_empty() {
                    // Dialog stays open
                    self.notify(Severity::Warning, "Enter a URL");
                    return;
                }
                self.mode = InputMode::Normal;
                self.url_input.clear();
                self.enqueue(&url);
            }
            AppEvent::CancelUrl => {
                self.mode = InputMode::Normal;
                self.url_input.clear();
            }

            AppEvent::ConfirmDelete => {
                self.mode = InputMode::Normal;
                match self.player.remove_current() {
                    Ok(track) => self.notify(Severity::Info, format!("Removed: {}", track.title())),
                    Err(e) => self.notify(Severity::Error, e.to_string()),
                }
            }
            AppEvent::CancelDelete => self.mode = InputMode::Normal,
        }
    }

    fn play_pause(&mut self) {
        // A stopped engine (end of list, failed load) starts over from the cursor
        let result = if self.player.is_playing() || self.player.is_paused() {
            self.player.toggle_pause()
        } else {
            self.player.play_current()
        };

        match result {
            Ok(()) => {}
            Err(PlayerError::EmptyPlaylist) => self.notify(Severity::Warning, "Playlist is empty"),
            Err(e) => self.notify(Severity::Error, e.to_string()),
        }
    }

    fn report_step(&mut self, result: Result<(), PlayerError>) {
        match result {
            Ok(()) => {}
            Err(e @ (PlayerError::AtEnd | PlayerError::AtStart | PlayerError::EmptyPlaylist)) => {
                debug!("{}", e);
            }
            Err(e) => self.notify(Severity::Error, e.to_string()),
        }
    }

    fn seek(&mut self, delta: f64) {
        let target = self.player.position() + delta;
        if let Err(e) = self.player.set_position(target) {
            debug!("Seek ignored: {}", e);
        }
    }

    fn handle_engine_event(&mut self, event: EngineEvent) {
        if event.load() != self.player.engine().current_load() {
            debug!("Dropping stale {:?}", event);
            return;
        }

        match event {
            EngineEvent::EndReached { .. } => {
                debug!("Track finished");
                self.player.handle_end_reached();
            }
            EngineEvent::Error { reason, .. } => {
                warn!("Playback failed: {}", reason);
                let _ = self.player.stop();
                self.notify(Severity::Error, format!("Playback failed: {reason}"));
            }
        }
    }

    fn handle_resolution(&mut self, resolution: Resolution) {
        self.resolutions.finish(&resolution);

        match resolution.outcome {
            Ok(track) => {
                let title = track.title().to_string();
                match self.player.add(track) {
                    Ok(()) => self.notify(Severity::Info, format!("Added: {title}")),
                    Err(e) => {
                        warn!("Resolved {} but could not queue it: {}", resolution.url, e);
                        self.notify(Severity::Error, format!("Could not add {title}: {e}"));
                    }
                }
            }
            Err(e) => self.notify(Severity::Error, format!("Could not fetch video info: {e}")),
        }
    }

    fn on_tick(&mut self) {
        let ttl = self.config.ui.notification_duration();
        self.notifications.retain(|n| n.shown_at.elapsed() < ttl);
    }

    fn notify(&mut self, severity: Severity, message: impl Into<String>) {
        let message = message.into();
        debug!("Notification ({:?}): {}", severity, message);

        if !self.config.ui.show_notifications {
            return;
        }
        self.notifications.push(Notification {
            message,
            severity,
            shown_at: Instant::now(),
        });
        if self.notifications.len() > MAX_TOASTS {
            self.notifications.remove(0);
        }
    }

    fn shutdown(&mut self) {
        info!("Shutting down, {} resolution(s) abandoned", self.resolutions.pending_count());
        // stop() logs its own failure
        let _ = self.player.stop();
    }

    pub fn player(&self) -> &Player<E> {
        &self.player
    }

    pub fn mode(&self) -> InputMode {
        self.mode
    }

    fn render(&mut self, f: &mut Frame) {
        let size = f.area();

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3), // Banner
                Constraint::Min(8),    // Playlist + player
                Constraint::Length(3), // Key help
            ])
            .split(size);

        self.render_banner(f, chunks[0]);

        let body = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
            .split(chunks[1]);

        self.render_playlist(f, body[0]);
        self.render_player(f, body[1]);
        Self::render_help(f, chunks[2]);

        match self.mode {
            InputMode::Normal => {}
            InputMode::AddUrl => self.render_url_dialog(f, size),
            InputMode::ConfirmDelete => self.render_delete_dialog(f, size),
        }

        self.render_notifications(f, size);
    }

    fn render_banner(&self, f: &mut Frame, area: Rect) {
        let text = widgets::banner(self.player.len(), self.resolutions.pending_count());
        let banner = Paragraph::new(text)
            .style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD))
            .block(Block::default().borders(Borders::ALL));
        f.render_widget(banner, area);
    }

    fn render_playlist(&mut self, f: &mut Frame, area: Rect) {
        let block = Block::default().borders(Borders::ALL).title("Playlist");

        if self.player.is_empty() {
            let empty = Paragraph::new("empty playlist")
                .style(Style::default().fg(Color::DarkGray))
                .block(block);
            f.render_widget(empty, area);
            return;
        }

        let current = self.player.current_index();
        let items: Vec<ListItem> = self
            .player
            .tracks()
            .iter()
            .enumerate()
            .map(|(i, track)| {
                let is_current = i == current;
                let style = if is_current {
                    Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
                } else {
                    Style::default()
                };
                ListItem::new(widgets::playlist_line(track, is_current)).style(style)
            })
            .collect();

        self.list_state.select(Some(current));
        let list = List::new(items).block(block);
        f.render_stateful_widget(list, area, &mut self.list_state);
    }

    fn render_player(&self, f: &mut Frame, area: Rect) {
        let playing = self.player.is_playing();
        let status = widgets::status_line(self.player.now_playing(), playing);
        let status_color = if playing { Color::Green } else { Color::Yellow };

        let (elapsed, remaining) = if self.player.now_playing().is_some() {
            widgets::time_lines(self.player.elapsed_millis(), self.player.total_millis())
        } else {
            widgets::time_lines(0, 0)
        };
        let progress = if self.player.now_playing().is_some() {
            self.player.position()
        } else {
            0.0
        };

        let lines = vec![
            Line::from(Span::styled(
                status,
                Style::default().fg(status_color).add_modifier(Modifier::BOLD),
            )),
            Line::from(""),
            Line::from(Span::styled(
                widgets::progress_bar(progress, PROGRESS_WIDTH),
                Style::default().fg(Color::Red),
            )),
            Line::from(""),
            Line::from(elapsed),
            Line::from(Span::styled(remaining, Style::default().fg(Color::Gray))),
        ];

        let player = Paragraph::new(lines)
            .block(Block::default().borders(Borders::ALL).title("Player"))
            .wrap(Wrap { trim: false });
        f.render_widget(player, area);
    }

    fn render_help(f: &mut Frame, area: Rect) {
        let key = |k: &'static str| Span::styled(k, Style::default().fg(Color::Yellow));
        let help = Line::from(vec![
            key("a"),
            Span::raw("=Add "),
            key("Space"),
            Span::raw("=Play/Pause "),
            key("n"),
            Span::raw("=Next "),
            key("p"),
            Span::raw("=Prev "),
            key("←/→"),
            Span::raw("=Seek "),
            key("d"),
            Span::raw("=Delete "),
            key("c"),
            Span::raw("=Clear "),
            key("q"),
            Span::raw("=Quit"),
        ]);

        let footer = Paragraph::new(help).block(Block::default().borders(Borders::ALL));
        f.render_widget(footer, area);
    }

    fn render_url_dialog(&self, f: &mut Frame, area: Rect) {
        let popup_area = Self::centered_rect(70, 20, area);

        let lines = vec![
            Line::from(format!("URL: {}_", self.url_input)),
            Line::from(""),
            Line::from(Span::styled(
                "Enter to add, Esc to cancel",
                Style::default().fg(Color::Gray),
            )),
        ];

        let dialog = Paragraph::new(lines)
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .title("Add YouTube URL")
                    .border_style(Style::default().fg(Color::Green)),
            )
            .style(Style::default().fg(Color::White).bg(Color::Black));

        f.render_widget(Clear, popup_area);
        f.render_widget(dialog, popup_area);
    }

    fn render_delete_dialog(&self, f: &mut Frame, area: Rect) {
        let popup_area = Self::centered_rect(60, 20, area);
        let title = self
            .player
            .current_track()
            .map(|t| widgets::truncate(t.title(), DIALOG_TITLE_LIMIT))
            .unwrap_or_default();

        let lines = vec![
            Line::from("Remove this track from the playlist?"),
            Line::from(Span::styled(title, Style::default().add_modifier(Modifier::BOLD))),
            Line::from(""),
            Line::from(Span::styled(
                "Enter/y to delete, Esc/n to cancel",
                Style::default().fg(Color::Gray),
            )),
        ];

        let dialog = Paragraph::new(lines)
            .alignment(Alignment::Center)
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .title("Delete")
                    .border_style(Style::default().fg(Color::Red)),
            )
            .style(Style::default().fg(Color::White).bg(Color::Black));

        f.render_widget(Clear, popup_area);
        f.render_widget(dialog, popup_area);
    }

    fn render_notifications(&self, f: &mut Frame, area: Rect) {
        let width = (area.width / 2).max(20).min(area.width);
        let mut y = area.y + 1;

        for note in self.notifications.iter().rev() {
            if y + 3 > area.bottom() {
                break;
            }
            let toast_area = Rect::new(area.right().saturating_sub(width + 1), y, width, 3);
            let toast = Paragraph::new(note.message.as_str())
                .style(Style::default().fg(note.severity.color()))
                .block(
                    Block::default()
                        .borders(Borders::ALL)
                        .border_style(Style::default().fg(note.severity.color())),
                );

            f.render_widget(Clear, toast_area);
            f.render_widget(toast, toast_area);
            y += 3;
        }
    }

    fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
        let popup_layout = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Percentage((100 - percent_y) / 2),
                Constraint::Percentage(percent_y),
                Constraint::Percentage((100 - percent_y) / 2),
            ])
            .split(r);

        Layout::default()
            .direction(Direction::Horizontal)
            .constraints([
                Constraint::Percentage((100 - percent_x) / 2),
                Constraint::Percentage(percent_x),
                Constraint::Percentage((100 - percent_x) / 2),
            ])
            .split(popup_layout[1])[1]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::{EngineError, Track};
    use crate::resolver::{ExtractError, ExtractedInfo};
    use ratatui::backend::TestBackend;

    #[derive(Default)]
    struct QuietEngine {
        stops: usize,
        toggles: usize,
        seeks: Vec<f64>,
        position: f64,
        loads: u64,
    }

    impl PlaybackEngine for QuietEngine {
        fn load(&mut self, _address: &str) -> Result<(), EngineError> {
            self.loads += 1;
            Ok(())
        }
        fn play(&mut self) -> Result<(), EngineError> {
            Ok(())
        }
        fn toggle_pause(&mut self) -> Result<(), EngineError> {
            self.toggles += 1;
            Ok(())
        }
        fn stop(&mut self) -> Result<(), EngineError> {
            self.stops += 1;
            self.loads += 1;
            Ok(())
        }
        fn position(&self) -> Result<f64, EngineError> {
            Ok(self.position)
        }
        fn set_position(&mut self, fraction: f64) -> Result<(), EngineError> {
            self.seeks.push(fraction);
            Ok(())
        }
        fn elapsed_millis(&self) -> Result<u64, EngineError> {
            Ok(30_000)
        }
        fn total_millis(&self) -> Result<u64, EngineError> {
            Ok(120_000)
        }
        fn current_load(&self) -> u64 {
            self.loads
        }
    }

    struct StaticExtractor;

    impl Extractor for StaticExtractor {
        fn extract(&self, url: &str) -> Result<Option<ExtractedInfo>, ExtractError> {
            Ok(Some(ExtractedInfo {
                title: Some(format!("Title of {url}")),
                duration: Some(120.0),
                uploader: Some("Uploader".to_string()),
                channel: None,
                url: Some("https://cdn.example/audio.m4a".to_string()),
            }))
        }
    }

    fn app_with(titles: &[&str]) -> App<QuietEngine, StaticExtractor> {
        let mut player = Player::new(QuietEngine::default());
        for title in titles {
            player
                .add(Track::resolved(
                    format!("https://youtu.be/{title}"),
                    *title,
                    120,
                    "Channel",
                    "https://cdn.example/a.m4a",
                ))
                .unwrap();
        }
        let (_engine_tx, engine_rx) = mpsc::unbounded_channel();
        App::new(Config::default(), player, TrackResolver::new(StaticExtractor), engine_rx)
    }

    fn end_of_current(app: &App<QuietEngine, StaticExtractor>) -> EngineEvent {
        EngineEvent::EndReached {
            load: app.player().engine().current_load(),
        }
    }

    fn messages<E: PlaybackEngine, X: Extractor>(app: &App<E, X>) -> Vec<String> {
        app.notifications.iter().map(|n| n.message.clone()).collect()
    }

    #[test]
    fn test_play_pause_starts_then_toggles() {
        let mut app = app_with(&["a"]);

        app.handle_event(AppEvent::TogglePlayPause);
        assert!(app.player().is_playing());
        assert_eq!(app.player().engine().toggles, 0);

        app.handle_event(AppEvent::TogglePlayPause);
        assert!(!app.player().is_playing());

        // Paused with a track loaded resumes instead of reloading
        app.handle_event(AppEvent::TogglePlayPause);
        assert!(app.player().is_playing());
        assert_eq!(app.player().engine().toggles, 2);
    }

    #[test]
    fn test_play_pause_on_empty_playlist_warns() {
        let mut app = app_with(&[]);
        app.handle_event(AppEvent::TogglePlayPause);
        assert!(!app.player().is_playing());
        assert_eq!(messages(&app), vec!["Playlist is empty"]);
    }

    #[test]
    fn test_seek_moves_by_the_configured_step() {
        let mut app = app_with(&["a"]);
        app.player.engine_mut().position = 0.5;

        app.handle_event(AppEvent::SeekForward);
        app.handle_event(AppEvent::SeekBackward);
        app.player.engine_mut().position = 0.98;
        app.handle_event(AppEvent::SeekForward);

        let seeks = &app.player().engine().seeks;
        assert!((seeks[0] - 0.55).abs() < 1e-9);
        assert!((seeks[1] - 0.45).abs() < 1e-9);
        assert_eq!(seeks[2], 1.0);
    }

    #[test]
    fn test_empty_url_keeps_the_dialog_open() {
        let mut app = app_with(&[]);
        app.handle_event(AppEvent::OpenAddUrl);
        assert_eq!(app.mode(), InputMode::AddUrl);

        app.handle_event(AppEvent::Input(' '));
        app.handle_event(AppEvent::SubmitUrl);
        assert_eq!(app.mode(), InputMode::AddUrl);
        assert_eq!(messages(&app), vec!["Enter a URL"]);

        app.handle_event(AppEvent::Backspace);
        app.handle_event(AppEvent::CancelUrl);
        assert_eq!(app.mode(), InputMode::Normal);
    }

    #[tokio::test]
    async fn test_submitted_url_ends_up_in_the_playlist() {
        let mut app = app_with(&[]);
        app.handle_event(AppEvent::OpenAddUrl);
        for c in "https://youtu.be/xyz".chars() {
            app.handle_event(AppEvent::Input(c));
        }
        app.handle_event(AppEvent::SubmitUrl);
        assert_eq!(app.mode(), InputMode::Normal);
        assert_eq!(app.resolutions.pending_count(), 1);

        // Same URL again while the first is in flight
        app.enqueue("https://youtu.be/xyz");
        assert!(messages(&app).contains(&"That URL is already being fetched".to_string()));

        let resolution = app.resolved_rx.recv().await.unwrap();
        app.handle_resolution(resolution);
        assert_eq!(app.resolutions.pending_count(), 0);
        assert_eq!(app.player().len(), 1);
        assert_eq!(app.player().tracks()[0].title(), "Title of https://youtu.be/xyz");
    }

    #[tokio::test]
    async fn test_unsupported_url_is_reported() {
        let mut app = app_with(&[]);
        app.enqueue("https://vimeo.com/1");
        assert_eq!(app.resolutions.pending_count(), 0);
        assert!(messages(&app)[0].contains("not a YouTube URL"));
    }

    #[test]
    fn test_delete_needs_confirmation() {
        let mut app = app_with(&["a", "b"]);
        app.handle_event(AppEvent::TogglePlayPause);

        app.handle_event(AppEvent::RequestDelete);
        assert_eq!(app.mode(), InputMode::ConfirmDelete);
        app.handle_event(AppEvent::CancelDelete);
        assert_eq!(app.player().len(), 2);

        app.handle_event(AppEvent::RequestDelete);
        app.handle_event(AppEvent::ConfirmDelete);
        assert_eq!(app.mode(), InputMode::Normal);
        assert_eq!(app.player().len(), 1);
        assert_eq!(app.player().engine().stops, 1);
        assert!(app.player().now_playing().is_none());
    }

    #[test]
    fn test_delete_on_empty_playlist_is_refused() {
        let mut app = app_with(&[]);
        app.handle_event(AppEvent::RequestDelete);
        assert_eq!(app.mode(), InputMode::Normal);
        assert_eq!(messages(&app), vec!["Nothing to delete"]);
    }

    #[test]
    fn test_end_of_track_advances() {
        let mut app = app_with(&["a", "b"]);
        app.handle_event(AppEvent::TogglePlayPause);

        app.handle_engine_event(end_of_current(&app));
        assert_eq!(app.player().current_index(), 1);
        assert!(app.player().is_playing());

        app.handle_engine_event(end_of_current(&app));
        assert_eq!(app.player().current_index(), 1);
        assert!(!app.player().is_playing());
    }

    #[test]
    fn test_engine_error_stops_and_notifies() {
        let mut app = app_with(&["a"]);
        app.handle_event(AppEvent::TogglePlayPause);

        app.handle_engine_event(EngineEvent::Error {
            load: app.player().engine().current_load(),
            reason: "decoder gave up".to_string(),
        });
        assert!(!app.player().is_playing());
        assert!(messages(&app)[0].contains("decoder gave up"));
    }

    #[test]
    fn test_space_after_the_last_track_ends_plays_it_again() {
        let mut app = app_with(&["a"]);
        app.handle_event(AppEvent::TogglePlayPause);
        app.handle_engine_event(end_of_current(&app));
        assert!(!app.player().is_playing());

        let loads_before = app.player().engine().loads;
        app.handle_event(AppEvent::TogglePlayPause);
        assert!(app.player().is_playing());
        assert_eq!(app.player().engine().toggles, 0);
        assert_eq!(app.player().engine().loads, loads_before + 1);
    }

    #[test]
    fn test_space_after_a_failed_load_retries_it() {
        let mut app = app_with(&["a"]);
        app.handle_event(AppEvent::TogglePlayPause);
        app.handle_engine_event(EngineEvent::Error {
            load: app.player().engine().current_load(),
            reason: "connection reset".to_string(),
        });
        assert_eq!(app.player().engine().stops, 1);

        app.handle_event(AppEvent::TogglePlayPause);
        assert!(app.player().is_playing());
        assert_eq!(app.player().engine().toggles, 0);
        assert!(!app.player().is_paused());
    }

    #[test]
    fn test_events_from_an_abandoned_load_are_ignored() {
        let mut app = app_with(&["a", "b", "c"]);
        app.handle_event(AppEvent::TogglePlayPause);
        let stale_end = end_of_current(&app);
        let stale_error = EngineEvent::Error {
            load: app.player().engine().current_load(),
            reason: "late failure".to_string(),
        };

        // The user skips ahead before the first track's end is handled
        app.handle_event(AppEvent::NextTrack);
        app.handle_engine_event(stale_end);
        app.handle_engine_event(stale_error);

        assert_eq!(app.player().current_index(), 1);
        assert!(app.player().is_playing());
        assert_eq!(app.player().engine().stops, 0);
        assert!(app.notifications.is_empty());
    }

    #[test]
    fn test_notifications_are_capped_and_can_be_disabled() {
        let mut app = app_with(&[]);
        for i in 0..5 {
            app.notify(Severity::Info, format!("n{i}"));
        }
        assert_eq!(messages(&app), vec!["n2", "n3", "n4"]);

        app.config.ui.show_notifications = false;
        app.notifications.clear();
        app.notify(Severity::Error, "hidden");
        assert!(app.notifications.is_empty());
    }

    #[test]
    fn test_expired_notifications_are_dropped_on_tick() {
        let mut app = app_with(&[]);
        app.config.ui.notification_duration_ms = 0;
        app.notify(Severity::Info, "gone");
        app.on_tick();
        assert!(app.notifications.is_empty());
    }

    #[test]
    fn test_render_shows_playlist_and_dialog() {
        let mut app = app_with(&["First song"]);
        app.handle_event(AppEvent::TogglePlayPause);
        app.handle_event(AppEvent::RequestDelete);

        let mut tui = Tui::headless(TestBackend::new(120, 30)).unwrap();
        tui.draw(|f| app.render(f)).unwrap();

        let screen: String = tui
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|cell| cell.symbol())
            .collect();
        assert!(screen.contains("1 track in playlist"));
        assert!(screen.contains("First song - Channel [2:00]"));
        assert!(screen.contains("0:30 / 2:00"));
        assert!(screen.contains("Remove this track"));
    }

    #[test]
    fn test_quit() {
        let mut app = app_with(&[]);
        app.handle_event(AppEvent::Quit);
        assert!(app.should_quit);
    }
}
