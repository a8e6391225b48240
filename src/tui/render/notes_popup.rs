use ratatui::Frame;
use ratatui::layout::Rect;
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, Paragraph, Wrap};

use crate::service::TaskService;
use crate::tui::app::App;

/// Centered rect taking the given percentage of `area`
fn centered(area: Rect, percent_x: u16, percent_y: u16) -> Rect {
    let w = (area.width as u32 * percent_x as u32 / 100) as u16;
    let h = (area.height as u32 * percent_y as u32 / 100) as u16;
    Rect {
        x: area.x + (area.width - w) / 2,
        y: area.y + (area.height - h) / 2,
        width: w.max(1),
        height: h.max(1),
    }
}

/// Generated notes, drawn over the task list
pub fn render_notes_popup<S: TaskService + 'static>(frame: &mut Frame, app: &App<S>, area: Rect) {
    let Some(doc) = &app.notes else {
        return;
    };
    let popup = centered(area, 80, 70);
    let bg = app.theme.background;

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(app.theme.highlight).bg(bg))
        .title(Span::styled(
            format!(" {} ", doc.task_title),
            Style::default()
                .fg(app.theme.text_bright)
                .bg(bg)
                .add_modifier(Modifier::BOLD),
        ))
        .title_bottom(Line::from(Span::styled(
            " Esc close ",
            Style::default().fg(app.theme.dim).bg(bg),
        )))
        .style(Style::default().bg(bg));

    let mut lines: Vec<Line> = doc
        .notes
        .lines()
        .map(|l| Line::from(Span::styled(l.to_string(), Style::default().fg(app.theme.text))))
        .collect();
    if let Some(at) = &doc.generated_at {
        lines.push(Line::default());
        lines.push(Line::from(Span::styled(
            format!("generated {}", at),
            Style::default().fg(app.theme.dim),
        )));
    }

    frame.render_widget(Clear, popup);
    frame.render_widget(
        Paragraph::new(lines).block(block).wrap(Wrap { trim: false }),
        popup,
    );
}
