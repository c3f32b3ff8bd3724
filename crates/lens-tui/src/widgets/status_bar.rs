//! Bottom status bar — per-view key hints.

use ratatui::{
    layout::Rect,
    style::Style,
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};

use crate::action::View;
use crate::theme::{C_MUTED, C_SECONDARY};

fn hints_for(view: View) -> &'static [(&'static str, &'static str)] {
    match view {
        View::Home => &[
            ("u", "identify a file"),
            ("r", "start listening"),
            ("h", "history"),
            ("q", "quit"),
        ],
        View::Record => &[("enter", "stop & identify"), ("esc", "cancel")],
        View::Result => &[
            ("\u{2191}\u{2193}", "scroll lyrics"),
            ("y", "copy lyrics"),
            ("esc", "home"),
        ],
        View::History => &[
            ("enter", "open"),
            ("x", "delete"),
            ("C", "clear all"),
            ("esc", "home"),
        ],
        View::Error => &[("enter", "back home"), ("q", "quit")],
    }
}

pub fn draw(frame: &mut Frame, area: Rect, view: View) {
    if area.height == 0 {
        return;
    }
    let mut spans: Vec<Span> = vec![Span::raw(" ")];
    for (i, (key, label)) in hints_for(view).iter().enumerate() {
        if i > 0 {
            spans.push(Span::styled("  \u{2502}  ", Style::default().fg(C_MUTED)));
        }
        spans.push(Span::styled(*key, Style::default().fg(C_SECONDARY)));
        spans.push(Span::styled(
            format!(" {}", label),
            Style::default().fg(C_MUTED),
        ));
    }
    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}
