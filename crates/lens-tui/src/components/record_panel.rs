//! Recording view — live spectrum bars plus the elapsed-time counter.
//!
//! One bar column per terminal cell; each column takes the loudest of the
//! frequency bins it covers. Bars fill bottom-up with eighth-block
//! precision and a fixed low→high vertical color gradient.

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
use crate::theme::{lerp_color, style_accent, style_secondary, C_ACCENT, C_VIZ_HIGH, C_VIZ_LOW};

const PARTIAL_BLOCKS: [char; 7] = ['\u{2581}', '\u{2582}', '\u{2583}', '\u{2584}', '\u{2585}', '\u{2586}', '\u{2587}'];
const FULL_BLOCK: char = '\u{2588}';

pub struct RecordPanel;

impl RecordPanel {
    pub fn new() -> Self {
        Self
    }
}

impl Component for RecordPanel {
    fn handle_key(&mut self, key: KeyEvent, _state: &AppState) -> Vec<Action> {
        match key.code {
            KeyCode::Enter | KeyCode::Char('s') => vec![Action::StopAndIdentify],
            KeyCode::Esc => vec![Action::Reset],
            KeyCode::Char('q') => vec![Action::Quit],
            _ => Vec::new(),
        }
    }

    fn draw(&mut self, frame: &mut Frame, area: Rect, state: &AppState) {
        if area.height < 6 {
            return;
        }

        let header = Rect { height: 3, ..area };
        let clock_h = 2u16;
        let viz = Rect {
            x: area.x + 1,
            y: area.y + 3,
            width: area.width.saturating_sub(2),
            height: area.height.saturating_sub(3 + clock_h),
        };
        let clock = Rect {
            x: area.x,
            y: viz.y + viz.height,
            width: area.width,
            height: clock_h,
        };

        frame.render_widget(
            Paragraph::new(vec![
                Line::from(Span::styled(
                    "  \u{25cf} Listening\u{2026}",
                    Style::default().fg(C_ACCENT).add_modifier(Modifier::BOLD),
                )),
                Line::from(Span::styled("    Keep the music playing", style_secondary())),
            ]),
            header,
        );

        frame.render_widget(
            Paragraph::new(spectrum_lines(&state.spectrum_bins, viz.width, viz.height)),
            viz,
        );

        frame.render_widget(
            Paragraph::new(Line::from(Span::styled(
                format!("  {}", state.recording_clock()),
                style_accent().add_modifier(Modifier::BOLD),
            ))),
            clock,
        );
    }
}

/// Collapse `bins` onto `width` columns; each column is the loudest bin it
/// covers, so narrow terminals still show transients.
fn column_levels(bins: &[f32], width: usize) -> Vec<f32> {
    if bins.is_empty() || width == 0 {
        return vec![0.0; width];
    }
    (0..width)
        .map(|c| {
            let lo = c * bins.len() / width;
            let hi = (((c + 1) * bins.len()) / width).max(lo + 1).min(bins.len());
            bins[lo..hi].iter().copied().fold(0.0f32, f32::max)
        })
        .collect()
}

/// Render the bar field as styled lines, top row first.
fn spectrum_lines(bins: &[f32], width: u16, height: u16) -> Vec<Line<'static>> {
    let width = width as usize;
    let height = height as usize;
    if width == 0 || height == 0 {
        return Vec::new();
    }

    let levels = column_levels(bins, width);
    // Bar heights in eighths of a cell.
    let eighths: Vec<usize> = levels
        .iter()
        .map(|&l| (l.clamp(0.0, 1.0) * (height * 8) as f32).round() as usize)
        .collect();

    let mut lines = Vec::with_capacity(height);
    for row_from_top in 0..height {
        let row = height - 1 - row_from_top;
        // Vertical gradient position of this row: 0 at the bottom cell.
        let t = if height > 1 {
            row as f32 / (height - 1) as f32
        } else {
            0.0
        };
        let color = lerp_color(C_VIZ_LOW, C_VIZ_HIGH, t);
        let style = Style::default().fg(color);

        let spans: Vec<Span> = eighths
            .iter()
            .map(|&e| {
                let filled = e.saturating_sub(row * 8);
                let ch = if filled >= 8 {
                    FULL_BLOCK
                } else if filled > 0 {
                    PARTIAL_BLOCKS[filled - 1]
                } else {
                    ' '
                };
                Span::styled(ch.to_string(), style)
            })
            .collect();
        lines.push(Line::from(spans));
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_levels_downsample_takes_max() {
        let mut bins = vec![0.0f32; 128];
        bins[3] = 0.9;
        let cols = column_levels(&bins, 64);
        assert_eq!(cols.len(), 64);
        // Bins 2 and 3 fold into column 1.
        assert_eq!(cols[1], 0.9);
        assert_eq!(cols[0], 0.0);
    }

    #[test]
    fn test_column_levels_upsample_repeats() {
        let bins = vec![0.25, 0.75];
        let cols = column_levels(&bins, 4);
        assert_eq!(cols, vec![0.25, 0.25, 0.75, 0.75]);
    }

    #[test]
    fn test_spectrum_lines_shape_and_fill() {
        let bins = vec![1.0f32; 16];
        let lines = spectrum_lines(&bins, 16, 4);
        assert_eq!(lines.len(), 4);
        // Full-scale input fills every cell.
        for line in &lines {
            assert!(line
                .spans
                .iter()
                .all(|s| s.content.chars().next() == Some(FULL_BLOCK)));
        }

        let quiet = spectrum_lines(&vec![0.0f32; 16], 16, 4);
        for line in &quiet {
            assert!(line.spans.iter().all(|s| s.content == " "));
        }
    }

    #[test]
    fn test_half_height_bar_fills_bottom_half() {
        let lines = spectrum_lines(&[0.5], 1, 4);
        let chars: Vec<char> = lines
            .iter()
            .map(|l| l.spans[0].content.chars().next().unwrap())
            .collect();
        // Top two rows empty, bottom two full.
        assert_eq!(chars[0], ' ');
        assert_eq!(chars[1], ' ');
        assert_eq!(chars[2], FULL_BLOCK);
        assert_eq!(chars[3], FULL_BLOCK);
    }
}
