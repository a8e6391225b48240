use crossterm::event::{MouseButton, MouseEvent, MouseEventKind};

use crate::ops::cursor::{CellMetrics, locate_offset};
use crate::service::TaskService;
use crate::sync::Intent;
use crate::tui::app::App;

use super::toggle_completed;

/// A click on a title activates it with the caret under the pointer; a
/// click on the checkbox toggles it.
pub(super) fn handle_click<S: TaskService + 'static>(app: &mut App<S>, mouse: MouseEvent) {
    if app.notes.is_some() {
        return;
    }
    let MouseEventKind::Down(MouseButton::Left) = mouse.kind else {
        return;
    };
    let Some(hit) = app.row_hits.iter().find(|h| h.y == mouse.row).cloned() else {
        return;
    };

    app.message = None;
    app.select(&hit.id);

    if mouse.column >= hit.title_x {
        let title = app
            .sync
            .tree()
            .find(hit.id.as_str())
            .map(|e| e.title.clone())
            .unwrap_or_default();
        // Terminal clicks land on a whole cell; use its left edge
        let click_x = f32::from(mouse.column - hit.title_x);
        let caret = locate_offset(&title, &CellMetrics::default(), click_x);
        app.submit(Intent::Activate {
            id: hit.id,
            caret: Some(caret),
        });
    } else if (hit.checkbox_x..hit.checkbox_x + 3).contains(&mouse.column) {
        toggle_completed(app, hit.id);
    }
}
