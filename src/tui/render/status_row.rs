use ratatui::Frame;
use ratatui::layout::Rect;
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;

use crate::service::TaskService;
use crate::sync::Connectivity;
use crate::tui::app::{App, Mode};
use crate::util::unicode::{display_width, truncate_to_width};

/// Render the status row (bottom of screen)
pub fn render_status_row<S: TaskService + 'static>(frame: &mut Frame, app: &App<S>, area: Rect) {
    let bg = app.theme.background;
    let width = area.width as usize;

    // Left: error banner > message > mode hint
    let mut spans: Vec<Span> = Vec::new();
    if let Some(err) = app.sync.last_error() {
        spans.push(Span::styled(
            format!(" ! {}", err),
            Style::default()
                .fg(app.theme.red)
                .bg(bg)
                .add_modifier(Modifier::BOLD),
        ));
        spans.push(Span::styled(
            "  r retry  x dismiss",
            Style::default().fg(app.theme.dim).bg(bg),
        ));
    } else if let Some(message) = &app.message {
        spans.push(Span::styled(
            format!(" {}", message),
            Style::default().fg(app.theme.text).bg(bg),
        ));
    } else if app.mode == Mode::Edit {
        spans.push(Span::styled(
            " -- EDIT --",
            Style::default().fg(app.theme.highlight).bg(bg),
        ));
    }

    // Right: sync state
    let mut hint = String::new();
    let pending = app.sync.pending();
    if pending > 0 {
        hint.push_str(&format!("syncing {}", pending));
    }
    if app.sync.connectivity() == Connectivity::Degraded {
        if !hint.is_empty() {
            hint.push_str("  ");
        }
        hint.push_str("offline");
    }
    if hint.is_empty() {
        hint = match app.mode {
            Mode::Navigate => "Enter edit  a add  q quit".to_string(),
            Mode::Edit => "Enter done  Esc cancel".to_string(),
        };
    }
    hint.push(' ');

    let hint_width = display_width(&hint);
    let content_width: usize = spans.iter().map(|s| display_width(&s.content)).sum();
    if content_width + hint_width < width {
        let padding = width - content_width - hint_width;
        spans.push(Span::styled(" ".repeat(padding), Style::default().bg(bg)));
        let hint_color = if app.sync.connectivity() == Connectivity::Degraded {
            app.theme.yellow
        } else {
            app.theme.dim
        };
        spans.push(Span::styled(hint, Style::default().fg(hint_color).bg(bg)));
    } else if let Some(last) = spans.last_mut() {
        // No room for the hint; keep the banner on one row
        let keep = width.saturating_sub(content_width - display_width(&last.content));
        last.content = truncate_to_width(&last.content, keep).into();
    }

    let paragraph = Paragraph::new(Line::from(spans)).style(Style::default().bg(bg));
    frame.render_widget(paragraph, area);
}
