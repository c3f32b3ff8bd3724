//! Error view — one human-readable message, manual restart only.

use ratatui::crossterm::event::{KeyCode, KeyEvent};
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
use crate::theme::{style_secondary, C_ERROR};

const FALLBACK_MESSAGE: &str = "Something went wrong. Please try again.";

pub struct ErrorPanel;

impl ErrorPanel {
    pub fn new() -> Self {
        Self
    }
}

impl Component for ErrorPanel {
    fn handle_key(&mut self, key: KeyEvent, _state: &AppState) -> Vec<Action> {
        match key.code {
            KeyCode::Enter | KeyCode::Esc | KeyCode::Char('r') => vec![Action::Reset],
            KeyCode::Char('q') => vec![Action::Quit],
            _ => Vec::new(),
        }
    }

    fn draw(&mut self, frame: &mut Frame, area: Rect, state: &AppState) {
        let message = state
            .error_message
            .as_deref()
            .filter(|m| !m.trim().is_empty())
            .unwrap_or(FALLBACK_MESSAGE);

        let y = area.y + area.height / 3;
        let block = Rect {
            x: area.x + 2,
            y,
            width: area.width.saturating_sub(4),
            height: area.height.saturating_sub(y - area.y),
        };
        frame.render_widget(
            Paragraph::new(vec![
                Line::from(Span::styled(
                    "Oops!",
                    Style::default().fg(C_ERROR).add_modifier(Modifier::BOLD),
                )),
                Line::default(),
                Line::from(Span::styled(message.to_string(), style_secondary())),
                Line::default(),
                Line::from(Span::styled("Press enter to try again.", style_secondary())),
            ])
            .wrap(ratatui::widgets::Wrap { trim: false })
            .centered(),
            block,
        );
    }
}
