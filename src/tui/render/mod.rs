pub mod notes_popup;
pub mod status_row;
pub mod task_list;

#[cfg(test)]
pub mod test_helpers;

use ratatui::Frame;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Paragraph};

use crate::service::TaskService;

use super::app::App;

/// Main render function, dispatches to sub-renderers
pub fn render<S: TaskService + 'static>(frame: &mut Frame, app: &mut App<S>) {
    let area = frame.area();

    // Background fill
    let bg_style = Style::default().bg(app.theme.background);
    frame.render_widget(Block::default().style(bg_style), area);

    // Layout: header | content | status row
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1), // header
            Constraint::Min(1),    // task list
            Constraint::Length(1), // status row
        ])
        .split(area);

    render_header(frame, app, chunks[0]);
    task_list::render_task_list(frame, app, chunks[1]);

    // Notes popup (rendered on top of everything)
    if app.notes.is_some() {
        notes_popup::render_notes_popup(frame, app, chunks[1]);
    }

    status_row::render_status_row(frame, app, chunks[2]);
}

/// App name on the left, completion count on the right
fn render_header<S: TaskService + 'static>(frame: &mut Frame, app: &App<S>, area: Rect) {
    let bg = app.theme.background;
    let tree = app.sync.tree();
    let total = tree.len();
    let done = tree
        .iter_depth_first()
        .filter(|id| tree.find(id.as_str()).is_some_and(|e| e.completed))
        .count();

    let name = " stepwise";
    let count = format!("{} of {} done ", done, total);
    let padding = (area.width as usize).saturating_sub(name.len() + count.len());
    let line = Line::from(vec![
        Span::styled(
            name,
            Style::default()
                .fg(app.theme.highlight)
                .bg(bg)
                .add_modifier(Modifier::BOLD),
        ),
        Span::styled(" ".repeat(padding), Style::default().bg(bg)),
        Span::styled(count, Style::default().fg(app.theme.dim).bg(bg)),
    ]);
    frame.render_widget(Paragraph::new(line), area);
}
