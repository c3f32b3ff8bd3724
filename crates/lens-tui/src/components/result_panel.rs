//! Result view — identified metadata plus the scrollable lyrics body.

use ratatui::crossterm::event::{KeyCode, KeyEvent};
use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
    Frame,
};

use lens_core::song::AudioKind;

use crate::action::Action;
use crate::app_state::AppState;
use crate::component::Component;
use crate::theme::{
    style_border, style_muted, style_secondary, C_ACCENT, C_PRIMARY, C_TAG,
};

pub struct ResultPanel {
    scroll: u16,
}

impl ResultPanel {
    pub fn new() -> Self {
        Self { scroll: 0 }
    }

    /// Called by the App whenever a new result is shown.
    pub fn reset_scroll(&mut self) {
        self.scroll = 0;
    }
}

impl Component for ResultPanel {
    fn handle_key(&mut self, key: KeyEvent, state: &AppState) -> Vec<Action> {
        match key.code {
            KeyCode::Up | KeyCode::Char('k') => {
                self.scroll = self.scroll.saturating_sub(1);
                Vec::new()
            }
            KeyCode::Down | KeyCode::Char('j') => {
                self.scroll = self.scroll.saturating_add(1);
                Vec::new()
            }
            KeyCode::PageUp => {
                self.scroll = self.scroll.saturating_sub(10);
                Vec::new()
            }
            KeyCode::PageDown => {
                self.scroll = self.scroll.saturating_add(10);
                Vec::new()
            }
            KeyCode::Char('g') => {
                self.scroll = 0;
                Vec::new()
            }
            KeyCode::Char('y') => match &state.result {
                Some(song) => vec![Action::CopyToClipboard(song.lyrics.clone())],
                None => Vec::new(),
            },
            KeyCode::Esc | KeyCode::Backspace | KeyCode::Char('b') => vec![Action::Reset],
            KeyCode::Char('h') => vec![Action::OpenHistory],
            KeyCode::Char('q') => vec![Action::Quit],
            _ => Vec::new(),
        }
    }

    fn draw(&mut self, frame: &mut Frame, area: Rect, state: &AppState) {
        let Some(song) = &state.result else {
            return;
        };

        let header_h = 6u16.min(area.height);
        let header = Rect { height: header_h, ..area };
        let lyrics = Rect {
            x: area.x,
            y: area.y + header_h,
            width: area.width,
            height: area.height.saturating_sub(header_h),
        };

        let mut head_lines: Vec<Line> = vec![
            Line::from(Span::styled(
                format!("  {}", song.title),
                Style::default().fg(C_PRIMARY).add_modifier(Modifier::BOLD),
            )),
            Line::from(Span::styled(
                format!("  {}", song.artist),
                Style::default().fg(C_ACCENT),
            )),
        ];
        if let Some(album_line) = song.album_line() {
            head_lines.push(Line::from(Span::styled(
                format!("  {}", album_line),
                style_secondary(),
            )));
        }

        let mut tags: Vec<Span> = vec![Span::raw("  ")];
        for value in [&song.genre, &song.mood, &song.language].into_iter().flatten() {
            tags.push(Span::styled(
                format!("[{}] ", value),
                Style::default().fg(C_TAG),
            ));
        }
        if tags.len() > 1 {
            head_lines.push(Line::from(tags));
        }

        head_lines.push(Line::from(Span::styled(
            format!("  {}", source_label(state)),
            style_muted(),
        )));

        frame.render_widget(Paragraph::new(head_lines), header);

        let lyric_lines: Vec<Line> = song
            .lyrics
            .split('\n')
            .map(|l| Line::from(Span::styled(l.to_string(), style_secondary())))
            .collect();
        let max_scroll = (lyric_lines.len() as u16).saturating_sub(1);
        self.scroll = self.scroll.min(max_scroll);

        frame.render_widget(
            Paragraph::new(lyric_lines)
                .block(
                    Block::default()
                        .borders(Borders::TOP)
                        .border_style(style_border())
                        .title(Span::styled(" Lyrics ", style_secondary())),
                )
                .wrap(Wrap { trim: false })
                .scroll((self.scroll, 0)),
            lyrics,
        );
    }
}

fn source_label(state: &AppState) -> String {
    match &state.audio_source {
        Some(src) => match (src.kind, &src.file_name) {
            (AudioKind::File, Some(name)) => format!("from file: {}", name),
            (AudioKind::File, None) => "from file".to_string(),
            (AudioKind::Recording, _) => "from microphone recording".to_string(),
        },
        None => "from history".to_string(),
    }
}
