mod edit;
mod mouse;
mod navigate;


use crossterm::event::{KeyCode, KeyEvent, MouseEvent};

use crate::model::task::TaskId;
use crate::service::TaskService;
use crate::sync::Intent;

use super::app::{App, Mode};

use edit::handle_edit;
use navigate::handle_navigate;

/// Handle a key event in the current mode
pub fn handle_key<S: TaskService + 'static>(app: &mut App<S>, key: KeyEvent) {
    // Ignore bare modifier key presses (Shift, Ctrl, Alt, etc.)
    if matches!(key.code, KeyCode::Modifier(_)) {
        return;
    }

    match app.mode {
        Mode::Navigate => handle_navigate(app, key),
        Mode::Edit => handle_edit(app, key),
    }
}

/// Handle a mouse event. Only left clicks on task rows do anything.
pub fn handle_mouse<S: TaskService + 'static>(app: &mut App<S>, mouse: MouseEvent) {
    mouse::handle_click(app, mouse);
}

/// Flip the completion flag of `id`, cascading to its subtasks
fn toggle_completed<S: TaskService + 'static>(app: &mut App<S>, id: TaskId) {
    let Some(completed) = app.sync.tree().find(id.as_str()).map(|e| e.completed) else {
        return;
    };
    app.submit(Intent::SetCompleted {
        id,
        value: !completed,
    });
}
