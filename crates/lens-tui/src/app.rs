//! App — component-based event loop.
//!
//! Architecture:
//! - `App` owns all components and `AppState` (shared read-only data for components).
//! - A `tokio::mpsc` channel carries `AppMessage` events in from background tasks.
//! - The event loop draws each frame, then awaits the next message or tick.
//! - Components return `Vec<Action>`; App dispatches each Action.
//! - `App::dispatch` is the only writer of `AppState`.

use std::io;
use std::path::PathBuf;
use std::time::Duration;

use ratatui::crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Clear, Paragraph},
    Terminal,
};
use tokio::sync::mpsc;
use tracing::{info, warn};

use lens_core::config::Config;
use lens_core::history::HistoryStore;
use lens_core::recognize::RecognitionClient;
use lens_core::song::{AudioKind, AudioSource, SongMetadata};

use crate::{
    action::{Action, View},
    app_state::{AppState, Processing},
    component::Component,
    components::{
        error_panel::ErrorPanel,
        history_list::HistoryList,
        home::{audio_mime_for, Home},
        record_panel::RecordPanel,
        result_panel::ResultPanel,
    },
    recorder::{Recorder, RECORDING_MIME},
    spectrum::{SpectrumAnalyzer, NUM_BINS},
    theme,
    widgets::{status_bar, toast::ToastManager},
};

// ── Internal event bus ────────────────────────────────────────────────────────

enum AppMessage {
    Event(Event),
    /// A recognition task finished; Err carries the display message.
    RecognitionDone(Result<SongMetadata, String>),
}

/// Visualizer refresh rate while recording.
const VIZ_FPS: u64 = 30;

const SPINNER_FRAMES: &[&str] = &["⣾", "⣽", "⣻", "⢿", "⡿", "⣟", "⣯", "⣷"];

// ── App ───────────────────────────────────────────────────────────────────────

pub struct App {
    config: Config,

    // ── Shared state (passed read-only to components) ─────────────────────────
    state: AppState,

    // ── Components ────────────────────────────────────────────────────────────
    home: Home,
    record_panel: RecordPanel,
    result_panel: ResultPanel,
    history_list: HistoryList,
    error_panel: ErrorPanel,

    // ── Recording session ─────────────────────────────────────────────────────
    recorder: Option<Recorder>,
    analyzer: Option<SpectrumAnalyzer>,

    // ── Session bookkeeping ───────────────────────────────────────────────────
    toast: ToastManager,
    msg_tx: Option<mpsc::Sender<AppMessage>>,
    spinner_frame: usize,
    should_quit: bool,
}

impl App {
    pub fn new(config: Config, history_path: PathBuf) -> Self {
        let history = HistoryStore::load_with_limit(history_path, config.history.limit);
        let state = AppState::new(
            history,
            config.library.music_dir.clone(),
            config.library.max_upload_mb,
        );
        Self {
            config,
            state,
            home: Home::new(),
            record_panel: RecordPanel::new(),
            result_panel: ResultPanel::new(),
            history_list: HistoryList::new(),
            error_panel: ErrorPanel::new(),
            recorder: None,
            analyzer: None,
            toast: ToastManager::new(),
            msg_tx: None,
            spinner_frame: 0,
            should_quit: false,
        }
    }

    pub async fn run(mut self) -> anyhow::Result<()> {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen)?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;

        let (tx, mut rx) = mpsc::channel::<AppMessage>(256);
        self.msg_tx = Some(tx.clone());

        // ── Background task: keyboard events ──────────────────────────────────
        let event_tx = tx.clone();
        tokio::task::spawn_blocking(move || loop {
            match event::read() {
                Ok(ev) => {
                    if event_tx.blocking_send(AppMessage::Event(ev)).is_err() {
                        break;
                    }
                }
                Err(_) => break,
            }
        });

        // ── Periodic timers ───────────────────────────────────────────────────
        // Toast expiry + component maintenance.
        let mut ui_tick = tokio::time::interval(Duration::from_millis(100));
        ui_tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        // Visualizer frame tick; only does work while a recorder is live.
        let mut viz_tick = tokio::time::interval(Duration::from_millis(1000 / VIZ_FPS));
        viz_tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        // 1-second elapsed-time counter for the recording clock.
        let mut elapsed_tick = tokio::time::interval(Duration::from_secs(1));
        elapsed_tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        info!("lyriclens ready");

        // ── Main loop ─────────────────────────────────────────────────────────
        loop {
            terminal.draw(|f| self.draw(f))?;

            if self.should_quit {
                break;
            }

            tokio::select! {
                Some(msg) = rx.recv() => {
                    self.handle_message(msg).await;
                }

                _ = ui_tick.tick() => {
                    self.toast.tick();
                    if self.state.processing.active {
                        self.spinner_frame = (self.spinner_frame + 1) % SPINNER_FRAMES.len();
                    }
                    let actions = self.active_component_tick();
                    for action in actions {
                        self.dispatch(action).await;
                    }
                }

                _ = viz_tick.tick() => {
                    self.viz_frame();
                }

                _ = elapsed_tick.tick() => {
                    if let Some(rec) = &self.recorder {
                        self.state.recording_secs = rec.elapsed_secs();
                    }
                }
            }

            if self.should_quit {
                break;
            }
        }

        // ── Teardown ──────────────────────────────────────────────────────────
        self.stop_recording_discard();
        disable_raw_mode()?;
        execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
        terminal.show_cursor()?;

        Ok(())
    }

    // ── Message handling ──────────────────────────────────────────────────────

    async fn handle_message(&mut self, msg: AppMessage) {
        match msg {
            AppMessage::Event(Event::Key(key)) => {
                if key.kind == KeyEventKind::Release {
                    return;
                }
                self.handle_key(key).await;
            }
            AppMessage::Event(_) => {}
            AppMessage::RecognitionDone(result) => self.on_recognition_done(result),
        }
    }

    async fn handle_key(&mut self, key: KeyEvent) {
        // Ctrl+C always quits, even mid-processing.
        if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
            self.should_quit = true;
            return;
        }
        // An issued recognition request cannot be cancelled; ignore input
        // until it resolves.
        if self.state.processing.active {
            return;
        }

        let actions = match self.state.view {
            View::Home => self.home.handle_key(key, &self.state),
            View::Record => self.record_panel.handle_key(key, &self.state),
            View::Result => self.result_panel.handle_key(key, &self.state),
            View::History => self.history_list.handle_key(key, &self.state),
            View::Error => self.error_panel.handle_key(key, &self.state),
        };
        for action in actions {
            self.dispatch(action).await;
        }
    }

    fn active_component_tick(&mut self) -> Vec<Action> {
        match self.state.view {
            View::Home => self.home.tick(&self.state),
            View::Record => self.record_panel.tick(&self.state),
            View::Result => self.result_panel.tick(&self.state),
            View::History => self.history_list.tick(&self.state),
            View::Error => self.error_panel.tick(&self.state),
        }
    }

    // ── Action dispatch ───────────────────────────────────────────────────────

    async fn dispatch(&mut self, action: Action) {
        match action {
            Action::StartRecording => self.start_recording(),
            Action::StopAndIdentify => self.stop_and_identify(),
            Action::IdentifyFile(path) => self.identify_file(path),
            Action::OpenHistory => {
                self.state.view = View::History;
            }
            Action::OpenHistoryItem(id) => {
                if let Some(item) = self.state.history.get(&id) {
                    self.state.result = Some(item.song.clone());
                    // Stored items never carry audio.
                    self.state.audio_source = None;
                    self.result_panel.reset_scroll();
                    self.state.view = View::Result;
                }
            }
            Action::DeleteHistoryItem(id) => {
                if self.state.history.remove(&id) {
                    self.toast.info("Removed from history");
                }
            }
            Action::ClearHistory => {
                self.state.history.clear();
                self.toast.info("History cleared");
            }
            Action::CopyToClipboard(text) => self.copy_to_clipboard(&text),
            Action::Reset => self.reset(),
            Action::Quit => self.should_quit = true,
        }
    }

    // ── Recording flow ────────────────────────────────────────────────────────

    fn start_recording(&mut self) {
        match Recorder::start() {
            Ok(rec) => {
                self.analyzer = Some(SpectrumAnalyzer::new(rec.sample_rate()));
                self.state.spectrum_bins = vec![0.0; NUM_BINS];
                self.state.recording_secs = 0;
                self.state.recording = true;
                self.recorder = Some(rec);
                self.state.view = View::Record;
            }
            Err(e) => {
                // RECORD is never entered on denial.
                warn!("[app] recorder start failed: {}", e);
                self.show_error(e.to_string());
            }
        }
    }

    fn stop_and_identify(&mut self) {
        let Some(recorder) = self.recorder.take() else {
            return;
        };
        self.teardown_viz();
        let recording = recorder.stop();
        if recording.is_empty() {
            self.show_error("No audio was captured. Please try again.".to_string());
            return;
        }

        self.state.processing = Processing {
            active: true,
            message: "Encoding audio\u{2026}".to_string(),
        };
        let wav = match recording.to_wav_bytes() {
            Ok(wav) => wav,
            Err(e) => {
                warn!("[app] wav assembly failed: {}", e);
                self.show_error(format!("Failed to encode the recording: {}", e));
                return;
            }
        };

        let data = lens_core::encode::encode(&wav);
        self.state.audio_source = Some(AudioSource {
            kind: AudioKind::Recording,
            data: data.clone(),
            mime_type: RECORDING_MIME.to_string(),
            file_name: None,
        });
        self.spawn_identify(data, RECORDING_MIME.to_string(), "Analyzing the recording\u{2026}");
    }

    fn identify_file(&mut self, path: PathBuf) {
        // The browser validated already; the mime lookup cannot fail here
        // short of a race on the file itself.
        let Some(mime) = audio_mime_for(&path) else {
            self.show_error("Please choose a valid audio file.".to_string());
            return;
        };

        self.state.processing = Processing {
            active: true,
            message: "Encoding audio\u{2026}".to_string(),
        };
        let data = match lens_core::encode::read_and_encode(&path) {
            Ok(data) => data,
            Err(e) => {
                warn!("[app] encode failed for {}: {}", path.display(), e);
                self.show_error(e.to_string());
                return;
            }
        };

        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string());
        self.state.audio_source = Some(AudioSource {
            kind: AudioKind::File,
            data: data.clone(),
            mime_type: mime.to_string(),
            file_name,
        });
        self.spawn_identify(
            data,
            mime.to_string(),
            "Asking Gemini to identify the song & extract lyrics\u{2026}",
        );
    }

    /// Send the encoded payload off for recognition. The result comes back
    /// over the message bus; nothing else mutates state meanwhile.
    fn spawn_identify(&mut self, data: String, mime_type: String, message: &str) {
        let client = match RecognitionClient::from_config(&self.config) {
            Ok(client) => client,
            Err(e) => {
                self.show_error(e.to_string());
                return;
            }
        };
        let Some(tx) = self.msg_tx.clone() else {
            self.show_error("Internal error: message bus not ready.".to_string());
            return;
        };

        self.state.processing = Processing {
            active: true,
            message: message.to_string(),
        };
        tokio::spawn(async move {
            let result = client
                .identify(&data, &mime_type)
                .await
                .map_err(|e| e.to_string());
            let _ = tx.send(AppMessage::RecognitionDone(result)).await;
        });
    }

    fn on_recognition_done(&mut self, result: Result<SongMetadata, String>) {
        self.state.processing = Processing::default();
        match result {
            Ok(metadata) => {
                // History first, then the view flip — RESULT is only entered
                // once the record is (best-effort) durable.
                self.state.history.add(metadata.clone());
                self.state.result = Some(metadata);
                self.result_panel.reset_scroll();
                self.state.view = View::Result;
            }
            Err(message) => {
                warn!("[app] recognition failed: {}", message);
                self.show_error(message);
            }
        }
    }

    // ── Helpers ───────────────────────────────────────────────────────────────

    fn show_error(&mut self, message: String) {
        self.state.processing = Processing::default();
        self.state.error_message = Some(message);
        self.state.view = View::Error;
    }

    fn reset(&mut self) {
        self.stop_recording_discard();
        self.state.view = View::Home;
        self.state.result = None;
        self.state.audio_source = None;
        self.state.error_message = None;
        self.state.processing = Processing::default();
    }

    /// Drop the recording session without analyzing it. Releases the
    /// microphone and silences the visualizer.
    fn stop_recording_discard(&mut self) {
        if let Some(recorder) = self.recorder.take() {
            let _ = recorder.stop();
        }
        self.teardown_viz();
    }

    fn teardown_viz(&mut self) {
        if let Some(analyzer) = &mut self.analyzer {
            analyzer.reset();
        }
        self.analyzer = None;
        self.state.recording = false;
        self.state.recording_secs = 0;
        self.state.spectrum_bins = vec![0.0; NUM_BINS];
    }

    /// One visualizer frame: pull fresh samples off the live stream and
    /// recompute the bin magnitudes. No-op unless recording.
    fn viz_frame(&mut self) {
        if !self.state.recording {
            return;
        }
        let (Some(recorder), Some(analyzer)) = (&mut self.recorder, &mut self.analyzer) else {
            return;
        };
        let fresh = recorder.drain_new();
        analyzer.push_samples(&fresh);
        analyzer.update();
        self.state.spectrum_bins = analyzer.bins().to_vec();
    }

    fn copy_to_clipboard(&mut self, text: &str) {
        let copied = arboard::Clipboard::new().and_then(|mut cb| cb.set_text(text.to_string()));
        match copied {
            Ok(()) => self.toast.success("Lyrics copied to clipboard"),
            Err(e) => {
                warn!("[app] clipboard error: {}", e);
                self.toast.warning("Could not access the clipboard");
            }
        }
    }

    // ── Drawing ───────────────────────────────────────────────────────────────

    fn draw(&mut self, frame: &mut ratatui::Frame) {
        let area = frame.area();
        frame.render_widget(
            ratatui::widgets::Block::default().style(Style::default().bg(theme::C_BG)),
            area,
        );
        if area.height < 4 {
            return;
        }

        let header = Rect { height: 1, ..area };
        let status = Rect {
            x: area.x,
            y: area.y + area.height - 1,
            width: area.width,
            height: 1,
        };
        let body = Rect {
            x: area.x,
            y: area.y + 1,
            width: area.width,
            height: area.height - 2,
        };

        self.draw_header(frame, header);
        match self.state.view {
            View::Home => self.home.draw(frame, body, &self.state),
            View::Record => self.record_panel.draw(frame, body, &self.state),
            View::Result => self.result_panel.draw(frame, body, &self.state),
            View::History => self.history_list.draw(frame, body, &self.state),
            View::Error => self.error_panel.draw(frame, body, &self.state),
        }
        status_bar::draw(frame, status, self.state.view);
        self.toast.draw(frame, area);

        if self.state.processing.active {
            self.draw_processing_overlay(frame, area);
        }
    }

    fn draw_header(&self, frame: &mut ratatui::Frame, area: Rect) {
        let title = Span::styled(
            " \u{266a} LyricLens",
            Style::default()
                .fg(theme::C_ACCENT)
                .add_modifier(Modifier::BOLD),
        );
        let model = Span::styled(
            format!("powered by {} ", self.config.gemini.model),
            Style::default().fg(theme::C_MUTED),
        );
        frame.render_widget(Paragraph::new(Line::from(title)), area);
        frame.render_widget(
            Paragraph::new(Line::from(model)).right_aligned(),
            area,
        );
    }

    fn draw_processing_overlay(&self, frame: &mut ratatui::Frame, area: Rect) {
        let message = &self.state.processing.message;
        let w = (message.chars().count() as u16 + 8).min(area.width);
        let overlay = Rect {
            x: area.x + (area.width.saturating_sub(w)) / 2,
            y: area.y + area.height / 2,
            width: w,
            height: 1,
        };
        frame.render_widget(Clear, overlay);
        frame.render_widget(
            Paragraph::new(Line::from(Span::styled(
                format!(
                    " {} {} ",
                    SPINNER_FRAMES[self.spinner_frame % SPINNER_FRAMES.len()],
                    message
                ),
                Style::default()
                    .fg(theme::C_ACCENT)
                    .add_modifier(Modifier::BOLD),
            )))
            .centered(),
            overlay,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_app() -> (App, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let app = App::new(Config::default(), dir.path().join("history.json"));
        (app, dir)
    }

    fn metadata() -> SongMetadata {
        SongMetadata {
            title: "Test Song".into(),
            artist: "Test Artist".into(),
            album: None,
            year: None,
            genre: None,
            mood: None,
            lyrics: "Line1\nLine2".into(),
            language: None,
        }
    }

    #[tokio::test]
    async fn test_recognition_success_records_history_then_shows_result() {
        let (mut app, _dir) = test_app();
        app.state.processing = Processing {
            active: true,
            message: "working".into(),
        };
        app.on_recognition_done(Ok(metadata()));

        assert_eq!(app.state.view, View::Result);
        assert!(!app.state.processing.active);
        assert_eq!(app.state.history.len(), 1);
        let shown = app.state.result.as_ref().unwrap();
        assert_eq!(shown.title, "Test Song");
        assert_eq!(shown.artist, "Test Artist");
        assert_eq!(shown.lyrics, "Line1\nLine2");
    }

    #[tokio::test]
    async fn test_recognition_failure_carries_message_and_skips_history() {
        let (mut app, _dir) = test_app();
        app.on_recognition_done(Err("Network unreachable".into()));

        assert_eq!(app.state.view, View::Error);
        assert_eq!(app.state.error_message.as_deref(), Some("Network unreachable"));
        assert!(app.state.history.is_empty());
    }

    #[tokio::test]
    async fn test_reset_returns_home_and_clears_session() {
        let (mut app, _dir) = test_app();
        app.on_recognition_done(Ok(metadata()));
        app.dispatch(Action::Reset).await;

        assert_eq!(app.state.view, View::Home);
        assert!(app.state.result.is_none());
        assert!(app.state.audio_source.is_none());
        assert!(app.state.error_message.is_none());
        // History survives a reset.
        assert_eq!(app.state.history.len(), 1);
    }

    #[tokio::test]
    async fn test_history_item_opens_without_audio() {
        let (mut app, _dir) = test_app();
        let item = app.state.history.add(metadata());
        app.state.audio_source = Some(AudioSource {
            kind: AudioKind::Recording,
            data: "QUJD".into(),
            mime_type: RECORDING_MIME.into(),
            file_name: None,
        });

        app.dispatch(Action::OpenHistoryItem(item.id.clone())).await;

        assert_eq!(app.state.view, View::Result);
        assert!(app.state.audio_source.is_none());
        assert_eq!(app.state.result, Some(item.song));
    }

    #[tokio::test]
    async fn test_delete_and_clear_history() {
        let (mut app, _dir) = test_app();
        let item = app.state.history.add(metadata());
        app.state.history.add(metadata());

        app.dispatch(Action::DeleteHistoryItem(item.id)).await;
        assert_eq!(app.state.history.len(), 1);

        app.dispatch(Action::ClearHistory).await;
        assert!(app.state.history.is_empty());
    }

    #[tokio::test]
    async fn test_unreadable_file_lands_on_error_view() {
        let (mut app, dir) = test_app();
        app.dispatch(Action::IdentifyFile(dir.path().join("missing.mp3")))
            .await;

        assert_eq!(app.state.view, View::Error);
        assert!(!app.state.processing.active);
        assert!(app.state.error_message.is_some());
    }
}
