use crossterm::event::{KeyCode, KeyEvent};

use crate::service::TaskService;
use crate::sync::Intent;
use crate::tui::app::App;

use super::toggle_completed;

pub(super) fn handle_navigate<S: TaskService + 'static>(app: &mut App<S>, key: KeyEvent) {
    app.message = None;

    // Notes popup intercepts everything until closed
    if app.notes.is_some() {
        if matches!(key.code, KeyCode::Esc | KeyCode::Enter | KeyCode::Char('q')) {
            app.notes = None;
        }
        return;
    }

    match key.code {
        KeyCode::Char('q') => app.should_quit = true,

        // Movement
        KeyCode::Char('j') | KeyCode::Down => move_cursor(app, 1),
        KeyCode::Char('k') | KeyCode::Up => move_cursor(app, -1),
        KeyCode::Char('g') | KeyCode::Home => app.cursor = 0,
        KeyCode::Char('G') | KeyCode::End => {
            app.cursor = app.rows().len().saturating_sub(1);
        }

        // Editing
        KeyCode::Enter | KeyCode::Char('i') => {
            if let Some(id) = app.cursor_id() {
                app.submit(Intent::Activate { id, caret: None });
            }
        }
        KeyCode::Char(' ') => {
            if let Some(id) = app.cursor_id() {
                toggle_completed(app, id);
            }
        }
        KeyCode::Char('a') => {
            let parent = app.cursor_id();
            app.submit(Intent::Create {
                title: String::new(),
                parent,
                activate: true,
            });
        }
        KeyCode::Char('o') => app.submit(Intent::Create {
            title: String::new(),
            parent: None,
            activate: true,
        }),
        KeyCode::Char('d') => {
            if let Some(id) = app.cursor_id() {
                app.submit(Intent::Delete { id });
            }
        }

        // Remote helpers
        KeyCode::Char('s') => {
            if let Some(id) = app.cursor_id() {
                app.message = Some("splitting...".into());
                app.submit(Intent::Split { id, context: None });
            }
        }
        KeyCode::Char('n') => {
            if let Some(id) = app.cursor_id() {
                app.message = Some("writing notes...".into());
                app.submit(Intent::Notes { id });
            }
        }

        // Sync
        KeyCode::Char('r') => app.submit(Intent::Reload),
        KeyCode::Char('x') => app.sync.dismiss_error(),
        _ => {}
    }
}

fn move_cursor<S: TaskService + 'static>(app: &mut App<S>, delta: isize) {
    let len = app.rows().len();
    if len == 0 {
        return;
    }
    let next = app.cursor.saturating_add_signed(delta);
    app.cursor = next.min(len - 1);
}
