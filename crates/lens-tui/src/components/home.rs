//! Home view — entry menu plus the embedded audio-file browser.
//!
//! The browser is the upload surface: it lists audio files under the
//! configured music directory and validates type and size client-side
//! before anything is encoded or sent. Rejections stay inline here; they
//! never reach the recognition pipeline.

use std::path::{Path, PathBuf};

use ratatui::crossterm::event::{KeyCode, KeyEvent};
use unicode_width::UnicodeWidthChar;
use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};

use crate::action::Action;
use crate::app_state::AppState;
use crate::component::Component;
use crate::theme::{
    style_accent, style_default, style_error, style_muted, style_secondary, style_selected,
    C_ACCENT,
};

/// Audio extensions accepted by the upload browser, with the MIME type
/// declared to the recognition endpoint.
const AUDIO_TYPES: &[(&str, &str)] = &[
    ("mp3", "audio/mpeg"),
    ("wav", "audio/wav"),
    ("flac", "audio/flac"),
    ("m4a", "audio/mp4"),
    ("aac", "audio/aac"),
    ("ogg", "audio/ogg"),
    ("opus", "audio/opus"),
    ("webm", "audio/webm"),
];

/// How deep the browser walks under the music directory.
const SCAN_DEPTH: usize = 3;

/// MIME type for an accepted audio path, None for everything else.
pub fn audio_mime_for(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    AUDIO_TYPES
        .iter()
        .find(|(e, _)| *e == ext)
        .map(|(_, mime)| *mime)
}

/// Client-side validation: audio type and size ceiling. Returns the MIME
/// type on success, a user-facing message on rejection.
pub fn validate_upload(
    path: &Path,
    size_bytes: u64,
    max_bytes: u64,
) -> Result<&'static str, String> {
    let Some(mime) = audio_mime_for(path) else {
        return Err("Please choose a valid audio file.".to_string());
    };
    if size_bytes > max_bytes {
        return Err(format!(
            "File is too large. Max {}MB.",
            max_bytes / (1024 * 1024)
        ));
    }
    Ok(mime)
}

struct FileEntry {
    path: PathBuf,
    name: String,
    size_bytes: u64,
}

const MENU: &[&str] = &["Identify a file", "Start listening", "History"];

enum Mode {
    Menu,
    Browser,
}

pub struct Home {
    mode: Mode,
    menu_selected: usize,
    files: Vec<FileEntry>,
    file_selected: usize,
    scroll: usize,
    validation_error: Option<String>,
}

impl Home {
    pub fn new() -> Self {
        Self {
            mode: Mode::Menu,
            menu_selected: 0,
            files: Vec::new(),
            file_selected: 0,
            scroll: 0,
            validation_error: None,
        }
    }

    fn open_browser(&mut self, state: &AppState) {
        self.files = scan_audio_files(&state.music_dir);
        self.file_selected = 0;
        self.scroll = 0;
        self.validation_error = None;
        self.mode = Mode::Browser;
    }

    fn activate_menu_entry(&mut self, state: &AppState) -> Vec<Action> {
        match self.menu_selected {
            0 => {
                self.open_browser(state);
                Vec::new()
            }
            1 => vec![Action::StartRecording],
            _ => vec![Action::OpenHistory],
        }
    }

    fn pick_selected_file(&mut self, state: &AppState) -> Vec<Action> {
        let Some(entry) = self.files.get(self.file_selected) else {
            return Vec::new();
        };
        match validate_upload(&entry.path, entry.size_bytes, state.max_upload_bytes) {
            Ok(_) => {
                self.validation_error = None;
                vec![Action::IdentifyFile(entry.path.clone())]
            }
            Err(msg) => {
                self.validation_error = Some(msg);
                Vec::new()
            }
        }
    }

    fn draw_menu(&mut self, frame: &mut Frame, area: Rect) {
        let mut lines: Vec<Line> = vec![
            Line::from(Span::styled(
                "Identify songs instantly.",
                Style::default().fg(C_ACCENT).add_modifier(Modifier::BOLD),
            )),
            Line::from(Span::styled(
                "Pick a track or let the microphone listen; title, artist and lyrics follow.",
                style_secondary(),
            )),
            Line::default(),
        ];
        for (i, item) in MENU.iter().enumerate() {
            let style = if i == self.menu_selected {
                style_selected()
            } else {
                style_default()
            };
            let marker = if i == self.menu_selected { "\u{25b8} " } else { "  " };
            lines.push(Line::from(Span::styled(format!("{}{}", marker, item), style)));
        }
        frame.render_widget(Paragraph::new(lines), pad(area));
    }

    fn draw_browser(&mut self, frame: &mut Frame, area: Rect, state: &AppState) {
        let area = pad(area);
        let mut lines: Vec<Line> = vec![
            Line::from(vec![
                Span::styled("Choose an audio file  ", style_accent()),
                Span::styled(
                    format!(
                        "({}, up to {}MB)",
                        state.music_dir.display(),
                        state.max_upload_bytes / (1024 * 1024)
                    ),
                    style_muted(),
                ),
            ]),
            Line::default(),
        ];

        if self.files.is_empty() {
            lines.push(Line::from(Span::styled(
                "No audio files found here. Drop some music in and reopen.",
                style_secondary(),
            )));
        } else {
            let visible = (area.height as usize).saturating_sub(lines.len() + 2).max(1);
            if self.file_selected < self.scroll {
                self.scroll = self.file_selected;
            } else if self.file_selected >= self.scroll + visible {
                self.scroll = self.file_selected + 1 - visible;
            }
            for (i, entry) in self
                .files
                .iter()
                .enumerate()
                .skip(self.scroll)
                .take(visible)
            {
                let style = if i == self.file_selected {
                    style_selected()
                } else {
                    style_default()
                };
                lines.push(Line::from(vec![
                    Span::styled(format!(" {:<48} ", truncated(&entry.name, 48)), style),
                    Span::styled(format_size(entry.size_bytes), style_muted()),
                ]));
            }
        }

        if let Some(err) = &self.validation_error {
            lines.push(Line::default());
            lines.push(Line::from(Span::styled(format!("\u{2717} {}", err), style_error())));
        }

        frame.render_widget(Paragraph::new(lines), area);
    }
}

impl Component for Home {
    fn handle_key(&mut self, key: KeyEvent, state: &AppState) -> Vec<Action> {
        match self.mode {
            Mode::Menu => match key.code {
                KeyCode::Up | KeyCode::Char('k') => {
                    self.menu_selected = self.menu_selected.saturating_sub(1);
                    Vec::new()
                }
                KeyCode::Down | KeyCode::Char('j') => {
                    self.menu_selected = (self.menu_selected + 1).min(MENU.len() - 1);
                    Vec::new()
                }
                KeyCode::Enter => self.activate_menu_entry(state),
                KeyCode::Char('u') => {
                    self.open_browser(state);
                    Vec::new()
                }
                KeyCode::Char('r') => vec![Action::StartRecording],
                KeyCode::Char('h') => vec![Action::OpenHistory],
                KeyCode::Char('q') => vec![Action::Quit],
                _ => Vec::new(),
            },
            Mode::Browser => match key.code {
                KeyCode::Up | KeyCode::Char('k') => {
                    self.file_selected = self.file_selected.saturating_sub(1);
                    self.validation_error = None;
                    Vec::new()
                }
                KeyCode::Down | KeyCode::Char('j') => {
                    if !self.files.is_empty() {
                        self.file_selected = (self.file_selected + 1).min(self.files.len() - 1);
                    }
                    self.validation_error = None;
                    Vec::new()
                }
                KeyCode::Char('g') => {
                    self.file_selected = 0;
                    Vec::new()
                }
                KeyCode::Char('G') => {
                    self.file_selected = self.files.len().saturating_sub(1);
                    Vec::new()
                }
                KeyCode::Enter => self.pick_selected_file(state),
                KeyCode::Esc => {
                    self.mode = Mode::Menu;
                    self.validation_error = None;
                    Vec::new()
                }
                KeyCode::Char('q') => vec![Action::Quit],
                _ => Vec::new(),
            },
        }
    }

    fn draw(&mut self, frame: &mut Frame, area: Rect, state: &AppState) {
        match self.mode {
            Mode::Menu => self.draw_menu(frame, area),
            Mode::Browser => self.draw_browser(frame, area, state),
        }
    }
}

fn pad(area: Rect) -> Rect {
    Rect {
        x: area.x + 2,
        y: area.y + 1,
        width: area.width.saturating_sub(4),
        height: area.height.saturating_sub(2),
    }
}

/// Truncate to `max` display columns, ellipsis when anything was dropped.
fn truncated(s: &str, max: usize) -> String {
    let total: usize = s.chars().map(|c| c.width().unwrap_or(0)).sum();
    if total <= max {
        return s.to_string();
    }
    let mut width = 0;
    let mut out = String::new();
    for c in s.chars() {
        let w = c.width().unwrap_or(0);
        if width + w > max.saturating_sub(1) {
            break;
        }
        width += w;
        out.push(c);
    }
    out.push('\u{2026}');
    out
}

fn format_size(bytes: u64) -> String {
    if bytes >= 1024 * 1024 {
        format!("{:>6.1} MB", bytes as f64 / (1024.0 * 1024.0))
    } else {
        format!("{:>6.1} KB", bytes as f64 / 1024.0)
    }
}

/// Walk the music directory (bounded depth), collecting audio files sorted
/// by name. Unreadable directories just contribute nothing.
fn scan_audio_files(dir: &Path) -> Vec<FileEntry> {
    let mut files = Vec::new();
    collect_audio_files(dir, SCAN_DEPTH, &mut files);
    files.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()));
    files
}

fn collect_audio_files(dir: &Path, depth: usize, out: &mut Vec<FileEntry>) {
    let Ok(rd) = std::fs::read_dir(dir) else {
        return;
    };
    for entry in rd.filter_map(Result::ok) {
        let path = entry.path();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        if name.starts_with('.') {
            continue;
        }
        if path.is_dir() {
            if depth > 0 {
                collect_audio_files(&path, depth - 1, out);
            }
            continue;
        }
        if audio_mime_for(&path).is_none() {
            continue;
        }
        let Ok(meta) = entry.metadata() else {
            continue;
        };
        out.push(FileEntry {
            path,
            name,
            size_bytes: meta.len(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_audio_mime_mapping() {
        assert_eq!(audio_mime_for(Path::new("song.mp3")), Some("audio/mpeg"));
        assert_eq!(audio_mime_for(Path::new("SONG.MP3")), Some("audio/mpeg"));
        assert_eq!(audio_mime_for(Path::new("take.wav")), Some("audio/wav"));
        assert_eq!(audio_mime_for(Path::new("notes.txt")), None);
        assert_eq!(audio_mime_for(Path::new("noext")), None);
    }

    #[test]
    fn test_five_mb_mp3_passes() {
        let mime = validate_upload(
            Path::new("track.mp3"),
            5 * 1024 * 1024,
            100 * 1024 * 1024,
        )
        .unwrap();
        assert_eq!(mime, "audio/mpeg");
    }

    #[test]
    fn test_oversized_file_rejected_with_size_message() {
        let err = validate_upload(
            Path::new("track.mp3"),
            150 * 1024 * 1024,
            100 * 1024 * 1024,
        )
        .unwrap_err();
        assert!(err.contains("too large"), "{}", err);
        assert!(err.contains("100MB"), "{}", err);
    }

    #[test]
    fn test_non_audio_rejected_with_type_message() {
        let err = validate_upload(Path::new("notes.txt"), 10, 100 * 1024 * 1024).unwrap_err();
        assert!(err.contains("valid audio file"), "{}", err);
    }

    #[test]
    fn test_scan_finds_audio_recursively() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("sub")).unwrap();
        std::fs::write(dir.path().join("b.mp3"), b"x").unwrap();
        std::fs::write(dir.path().join("sub/a.flac"), b"x").unwrap();
        std::fs::write(dir.path().join("skip.txt"), b"x").unwrap();
        std::fs::write(dir.path().join(".hidden.mp3"), b"x").unwrap();

        let files = scan_audio_files(dir.path());
        let names: Vec<&str> = files.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, ["a.flac", "b.mp3"]);
    }
}
