//! History view — past recognitions with delete/clear confirmation.

use ratatui::crossterm::event::{KeyCode, KeyEvent};
use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};

use lens_core::song::tile_color;
use unicode_width::UnicodeWidthChar;

use crate::action::Action;
use crate::app_state::AppState;
use crate::component::Component;
use crate::theme::{
    style_default, style_muted, style_secondary, style_selected, C_ACCENT, C_WARNING,
};

/// Pending destructive action awaiting a y/n answer.
enum Confirm {
    Delete(String),
    ClearAll,
}

pub struct HistoryList {
    selected: usize,
    scroll: usize,
    confirm: Option<Confirm>,
}

impl HistoryList {
    pub fn new() -> Self {
        Self {
            selected: 0,
            scroll: 0,
            confirm: None,
        }
    }

    fn clamp_selection(&mut self, state: &AppState) {
        let len = state.history.len();
        if len == 0 {
            self.selected = 0;
        } else if self.selected >= len {
            self.selected = len - 1;
        }
    }

    fn selected_id(&self, state: &AppState) -> Option<String> {
        state
            .history
            .items()
            .get(self.selected)
            .map(|i| i.id.clone())
    }

    fn handle_confirm_key(&mut self, key: KeyEvent) -> Vec<Action> {
        match key.code {
            KeyCode::Char('y') | KeyCode::Char('Y') => match self.confirm.take() {
                Some(Confirm::Delete(id)) => vec![Action::DeleteHistoryItem(id)],
                Some(Confirm::ClearAll) => vec![Action::ClearHistory],
                None => Vec::new(),
            },
            KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => {
                self.confirm = None;
                Vec::new()
            }
            _ => Vec::new(),
        }
    }
}

impl Component for HistoryList {
    fn handle_key(&mut self, key: KeyEvent, state: &AppState) -> Vec<Action> {
        if self.confirm.is_some() {
            return self.handle_confirm_key(key);
        }

        match key.code {
            KeyCode::Up | KeyCode::Char('k') => {
                self.selected = self.selected.saturating_sub(1);
                Vec::new()
            }
            KeyCode::Down | KeyCode::Char('j') => {
                if !state.history.is_empty() {
                    self.selected = (self.selected + 1).min(state.history.len() - 1);
                }
                Vec::new()
            }
            KeyCode::Char('g') => {
                self.selected = 0;
                Vec::new()
            }
            KeyCode::Char('G') => {
                self.selected = state.history.len().saturating_sub(1);
                Vec::new()
            }
            KeyCode::Enter => match self.selected_id(state) {
                Some(id) => vec![Action::OpenHistoryItem(id)],
                None => Vec::new(),
            },
            KeyCode::Char('x') | KeyCode::Char('d') | KeyCode::Delete => {
                if let Some(id) = self.selected_id(state) {
                    self.confirm = Some(Confirm::Delete(id));
                }
                Vec::new()
            }
            KeyCode::Char('C') => {
                if !state.history.is_empty() {
                    self.confirm = Some(Confirm::ClearAll);
                }
                Vec::new()
            }
            KeyCode::Esc | KeyCode::Backspace => vec![Action::Reset],
            KeyCode::Char('q') => vec![Action::Quit],
            _ => Vec::new(),
        }
    }

    fn tick(&mut self, state: &AppState) -> Vec<Action> {
        self.clamp_selection(state);
        Vec::new()
    }

    fn draw(&mut self, frame: &mut Frame, area: Rect, state: &AppState) {
        let area = Rect {
            x: area.x + 2,
            y: area.y + 1,
            width: area.width.saturating_sub(4),
            height: area.height.saturating_sub(2),
        };
        self.clamp_selection(state);

        if state.history.is_empty() {
            frame.render_widget(
                Paragraph::new(vec![
                    Line::from(Span::styled(
                        "No history yet",
                        Style::default().fg(C_ACCENT).add_modifier(Modifier::BOLD),
                    )),
                    Line::from(Span::styled(
                        "Songs you identify will appear here.",
                        style_secondary(),
                    )),
                ]),
                area,
            );
            return;
        }

        let mut lines: Vec<Line> = vec![
            Line::from(vec![
                Span::styled(
                    format!("History ({})", state.history.len()),
                    Style::default().fg(C_ACCENT).add_modifier(Modifier::BOLD),
                ),
            ]),
            Line::default(),
        ];

        let visible = (area.height as usize)
            .saturating_sub(lines.len() + 2)
            .max(1);
        if self.selected < self.scroll {
            self.scroll = self.selected;
        } else if self.selected >= self.scroll + visible {
            self.scroll = self.selected + 1 - visible;
        }

        for (i, item) in state
            .history
            .items()
            .iter()
            .enumerate()
            .skip(self.scroll)
            .take(visible)
        {
            let row_style = if i == self.selected {
                style_selected()
            } else {
                style_default()
            };
            let (tr, tg, tb) = tile_color(&item.song.title);
            let (ar, ag, ab) = tile_color(&item.song.artist);

            let mut spans = vec![
                Span::styled("\u{2588}", Style::default().fg(Color::Rgb(tr, tg, tb))),
                Span::styled("\u{2588} ", Style::default().fg(Color::Rgb(ar, ag, ab))),
                Span::styled(format!("{:<28}", clip(&item.song.title, 28)), row_style),
                Span::styled(
                    format!("  {:<22}", clip(&item.song.artist, 22)),
                    if i == self.selected {
                        row_style
                    } else {
                        style_secondary()
                    },
                ),
            ];
            if let Some(album) = &item.song.album {
                spans.push(Span::styled(
                    format!("  {:<18}", clip(album, 18)),
                    style_muted(),
                ));
            }
            spans.push(Span::styled(
                format!("  {}", item.timestamp.format("%b %e %H:%M")),
                style_muted(),
            ));
            lines.push(Line::from(spans));
        }

        if let Some(confirm) = &self.confirm {
            let prompt = match confirm {
                Confirm::Delete(_) => "Remove this song from history? (y/n)",
                Confirm::ClearAll => "Clear your entire song history? (y/n)",
            };
            lines.push(Line::default());
            lines.push(Line::from(Span::styled(
                prompt,
                Style::default().fg(C_WARNING).add_modifier(Modifier::BOLD),
            )));
        }

        frame.render_widget(Paragraph::new(lines), area);
    }
}

/// Truncate to `max` display columns (wide glyphs count double), with an
/// ellipsis when anything was dropped.
fn clip(s: &str, max: usize) -> String {
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clip_by_display_width() {
        assert_eq!(clip("short", 10), "short");
        assert_eq!(clip("a very long title indeed", 10), "a very lo\u{2026}");
        // Wide CJK glyphs take two columns each.
        assert_eq!(clip("\u{6b4c}\u{6b4c}\u{6b4c}\u{6b4c}", 5), "\u{6b4c}\u{6b4c}\u{2026}");
    }
}
