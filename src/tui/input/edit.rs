use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use crate::model::task::{TaskId, TaskPatch};
use crate::service::TaskService;
use crate::sync::Intent;
use crate::tui::app::App;
use crate::util::unicode::{clamp_to_char_boundary, next_grapheme_boundary, prev_grapheme_boundary};

/// Edit the active title in place. Every change is written through.
pub(super) fn handle_edit<S: TaskService + 'static>(app: &mut App<S>, key: KeyEvent) {
    let Some((id, title)) = app.editing_title() else {
        app.follow_session();
        return;
    };
    let caret = clamp_to_char_boundary(&title, app.edit_cursor);

    match (key.modifiers, key.code) {
        (_, KeyCode::Esc) => app.submit(Intent::Cancel { id }),
        // Titles are a single line
        (KeyModifiers::SHIFT, KeyCode::Enter) => {}
        (_, KeyCode::Enter) => app.submit(Intent::Commit { id }),

        // Caret movement
        (_, KeyCode::Left) => {
            if let Some(prev) = prev_grapheme_boundary(&title, caret) {
                app.edit_cursor = prev;
            }
        }
        (_, KeyCode::Right) => {
            if let Some(next) = next_grapheme_boundary(&title, caret) {
                app.edit_cursor = next;
            }
        }
        (_, KeyCode::Home) | (KeyModifiers::CONTROL, KeyCode::Char('a')) => app.edit_cursor = 0,
        (_, KeyCode::End) | (KeyModifiers::CONTROL, KeyCode::Char('e')) => {
            app.edit_cursor = title.len();
        }

        // Deletion
        (_, KeyCode::Backspace) => {
            if let Some(start) = prev_grapheme_boundary(&title, caret) {
                let mut text = title;
                text.replace_range(start..caret, "");
                app.edit_cursor = start;
                write_title(app, id, text);
            }
        }
        (_, KeyCode::Delete) => {
            if let Some(end) = next_grapheme_boundary(&title, caret) {
                let mut text = title;
                text.replace_range(caret..end, "");
                app.edit_cursor = caret;
                write_title(app, id, text);
            }
        }
        (KeyModifiers::CONTROL, KeyCode::Char('u')) => {
            if caret > 0 {
                app.edit_cursor = 0;
                write_title(app, id, title[caret..].to_string());
            }
        }

        (modifiers, KeyCode::Char(c))
            if !modifiers.intersects(KeyModifiers::CONTROL | KeyModifiers::ALT) =>
        {
            let mut text = title;
            text.insert(caret, c);
            app.edit_cursor = caret + c.len_utf8();
            write_title(app, id, text);
        }
        _ => {}
    }
}

fn write_title<S: TaskService + 'static>(app: &mut App<S>, id: TaskId, title: String) {
    app.submit(Intent::Update {
        id,
        patch: TaskPatch::title(title),
    });
}
