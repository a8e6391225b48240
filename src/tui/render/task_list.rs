use ratatui::Frame;
use ratatui::layout::Rect;
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;

use crate::ops::tree_ops::VisibleRow;
use crate::service::TaskService;
use crate::tui::app::{App, Mode, RowHit};
use crate::util::unicode::{display_width, truncate_to_width};

/// Placeholder shown in an empty top-level title
pub const ROOT_PLACEHOLDER: &str = "Add task...";
/// Placeholder shown in an empty subtask title
pub const CHILD_PLACEHOLDER: &str = "Enter Subtask";

/// Columns before the tree prefix: the cursor bar
const GUTTER: u16 = 1;
/// "[ ] "
const CHECKBOX_WIDTH: u16 = 4;

/// Column where the title of a row at `depth` starts, relative to the area
pub fn title_column(depth: usize) -> u16 {
    GUTTER + (depth as u16) * 2 + CHECKBOX_WIDTH
}

/// Render the task tree, one row per task
pub fn render_task_list<S: TaskService + 'static>(frame: &mut Frame, app: &mut App<S>, area: Rect) {
    let rows = app.rows();
    app.row_hits.clear();

    let bg = app.theme.background;
    if rows.is_empty() {
        let empty = Paragraph::new(" No tasks")
            .style(Style::default().fg(app.theme.dim).bg(bg));
        frame.render_widget(empty, area);
        return;
    }

    let visible_height = area.height as usize;
    let cursor = app.cursor.min(rows.len() - 1);
    app.cursor = cursor;
    if cursor < app.scroll_offset {
        app.scroll_offset = cursor;
    } else if cursor >= app.scroll_offset + visible_height {
        app.scroll_offset = cursor.saturating_sub(visible_height - 1);
    }

    let scroll = app.scroll_offset;
    let end = rows.len().min(scroll + visible_height);
    let editing = match app.mode {
        Mode::Edit => app.sync.active_task_id().cloned(),
        Mode::Navigate => None,
    };
    let mut lines: Vec<Line> = Vec::with_capacity(visible_height);
    let mut caret: Option<(u16, u16)> = None;

    for (offset, row) in rows[scroll..end].iter().enumerate() {
        let y = area.y + offset as u16;
        let is_cursor = scroll + offset == cursor;
        let is_editing = editing.as_ref() == Some(&row.id);
        let title_x = area.x + title_column(row.depth);

        app.row_hits.push(RowHit {
            y,
            checkbox_x: title_x - CHECKBOX_WIDTH,
            title_x,
            id: row.id.clone(),
        });

        lines.push(render_row(app, row, is_cursor, is_editing, area.width as usize));

        if is_editing && let Some((_, title)) = app.editing_title() {
            let before = &title[..app.edit_cursor.min(title.len())];
            let x = title_x.saturating_add(display_width(before) as u16);
            caret = Some((x.min(area.right().saturating_sub(1)), y));
        }
    }

    let paragraph = Paragraph::new(lines).style(Style::default().bg(bg));
    frame.render_widget(paragraph, area);

    if let Some(position) = caret {
        frame.set_cursor_position(position);
    }
}

fn render_row<'a, S: TaskService + 'static>(
    app: &App<S>,
    row: &VisibleRow,
    is_cursor: bool,
    is_editing: bool,
    width: usize,
) -> Line<'a> {
    let theme = &app.theme;
    let row_bg = if is_cursor {
        theme.selection_bg
    } else {
        theme.background
    };
    let dim_style = Style::default().fg(theme.dim).bg(row_bg);
    let mut spans: Vec<Span> = Vec::new();

    // Column 0: cursor bar
    if is_cursor {
        spans.push(Span::styled(
            "\u{258E}",
            Style::default().fg(theme.selection_border).bg(row_bg),
        ));
    } else {
        spans.push(Span::styled(" ", Style::default().bg(row_bg)));
    }

    // Tree prefix, two columns per level
    if row.depth > 0 {
        for is_ancestor_last in row.ancestor_last.iter().skip(1) {
            let guide = if *is_ancestor_last { "  " } else { "\u{2502} " };
            spans.push(Span::styled(guide, dim_style));
        }
        let branch = if row.is_last_sibling {
            "\u{2514} "
        } else {
            "\u{251C} "
        };
        spans.push(Span::styled(branch, dim_style));
    }

    let Some(entry) = app.sync.tree().find(row.id.as_str()) else {
        return Line::from(spans);
    };

    let checkbox = if entry.completed { "[x] " } else { "[ ] " };
    let checkbox_color = if entry.completed {
        theme.green
    } else {
        theme.text
    };
    spans.push(Span::styled(
        checkbox,
        Style::default().fg(checkbox_color).bg(row_bg),
    ));

    let used = title_column(row.depth) as usize;
    let room = width.saturating_sub(used);
    if entry.title.is_empty() {
        let placeholder = if row.depth == 0 {
            ROOT_PLACEHOLDER
        } else {
            CHILD_PLACEHOLDER
        };
        spans.push(Span::styled(
            truncate_to_width(placeholder, room),
            dim_style.add_modifier(Modifier::ITALIC),
        ));
    } else {
        let mut style = Style::default().fg(theme.text).bg(row_bg);
        if is_editing {
            style = style.fg(theme.text_bright);
        } else if entry.completed {
            style = style.fg(theme.dim).add_modifier(Modifier::CROSSED_OUT);
        } else if is_cursor {
            style = style.fg(theme.text_bright);
        }
        spans.push(Span::styled(truncate_to_width(&entry.title, room), style));
    }

    // Fill the rest of a highlighted row
    if is_cursor {
        let content: usize = spans.iter().map(|s| display_width(&s.content)).sum();
        if content < width {
            spans.push(Span::styled(
                " ".repeat(width - content),
                Style::default().bg(row_bg),
            ));
        }
    }

    Line::from(spans)
}
