use std::io;
use std::sync::Arc;
use std::time::Duration;

use crossterm::event::{
    self, DisableMouseCapture, EnableMouseCapture, Event, KeyEventKind,
};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use tokio::runtime::Handle;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use crate::model::task::{NotesDocument, TaskId};
use crate::ops::cursor;
use crate::ops::tree_ops::VisibleRow;
use crate::service::TaskService;
use crate::sync::{Completion, Effect, Intent, Request, SyncController};
use crate::util::unicode;

use super::input;
use super::render;
use super::theme::Theme;

/// Current interaction mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Navigate,
    /// A title is being edited in place
    Edit,
}

/// Where a task title was drawn, for mapping mouse clicks back to tasks
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowHit {
    pub y: u16,
    /// First column of the checkbox
    pub checkbox_x: u16,
    /// First column of the title text
    pub title_x: u16,
    pub id: TaskId,
}

/// Main application state
pub struct App<S: TaskService + 'static> {
    pub sync: SyncController<S>,
    pub mode: Mode,
    pub should_quit: bool,
    pub theme: Theme,
    /// Cursor index into the visible rows
    pub cursor: usize,
    /// First visible row
    pub scroll_offset: usize,
    /// Caret position in the edited title (byte offset)
    pub edit_cursor: usize,
    /// Notes popup contents
    pub notes: Option<NotesDocument>,
    /// Transient status message, cleared on the next key
    pub message: Option<String>,
    /// Row positions from the last draw
    pub row_hits: Vec<RowHit>,
    runtime: Handle,
    tx: UnboundedSender<Completion>,
    rx: UnboundedReceiver<Completion>,
}

impl<S: TaskService + 'static> App<S> {
    pub fn new(sync: SyncController<S>, runtime: Handle) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        App {
            sync,
            mode: Mode::Navigate,
            should_quit: false,
            theme: Theme::default(),
            cursor: 0,
            scroll_offset: 0,
            edit_cursor: 0,
            notes: None,
            message: None,
            row_hits: Vec::new(),
            runtime,
            tx,
            rx,
        }
    }

    pub fn rows(&self) -> Vec<VisibleRow> {
        self.sync.tree().visible_rows()
    }

    /// Task under the cursor
    pub fn cursor_id(&self) -> Option<TaskId> {
        let rows = self.rows();
        rows.get(self.cursor.min(rows.len().saturating_sub(1)))
            .map(|r| r.id.clone())
    }

    /// Move the cursor onto `id` if it is visible
    pub fn select(&mut self, id: &TaskId) {
        if let Some(index) = self.rows().iter().position(|r| &r.id == id) {
            self.cursor = index;
        }
    }

    /// The task in edit mode and its current title
    pub fn editing_title(&self) -> Option<(TaskId, String)> {
        let id = self.sync.active_task_id()?;
        let title = self.sync.tree().find(id.as_str())?.title.clone();
        Some((id.clone(), title))
    }

    // -----------------------------------------------------------------------
    // Remote work
    // -----------------------------------------------------------------------

    /// Apply an intent locally and send its requests off to the runtime
    pub fn submit(&mut self, intent: Intent) {
        match self.sync.prepare(intent) {
            Ok(requests) => {
                for request in requests {
                    self.spawn(request);
                }
            }
            Err(e) => {
                tracing::debug!(error = %e, "intent rejected");
                self.message = Some(e.to_string());
            }
        }
        self.follow_session();
    }

    fn spawn(&self, request: Request) {
        let service = Arc::clone(self.sync.service());
        let tx = self.tx.clone();
        self.runtime.spawn(async move {
            let completion = request.execute(service.as_ref()).await;
            let _ = tx.send(completion);
        });
    }

    /// Apply every completion that has arrived. Returns how many there were.
    pub fn drain(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(completion) = self.rx.try_recv() {
            self.receive(completion);
            applied += 1;
        }
        applied
    }

    /// Wait until no request is outstanding
    pub async fn settle(&mut self) {
        while self.sync.pending() > 0 {
            match self.rx.recv().await {
                Some(completion) => self.receive(completion),
                None => break,
            }
        }
    }

    fn receive(&mut self, completion: Completion) {
        match self.sync.apply(completion) {
            Ok(Effect::None) => {}
            Ok(Effect::Created(id)) | Ok(Effect::Activated(id)) => self.select(&id),
            Ok(Effect::Split {
                response,
                activated,
            }) => {
                self.message = Some(format!("added {} subtasks", response.subtasks.len()));
                if let Some(id) = activated {
                    self.select(&id);
                }
            }
            Ok(Effect::Notes(doc)) => self.notes = Some(doc),
            Ok(Effect::FollowUp(intent)) => self.submit(intent),
            // Already recorded as the banner
            Err(e) => tracing::debug!(error = %e, "request failed"),
        }
        self.follow_session();
    }

    /// Keep the mode and the caret in step with the edit session. The caret
    /// from an activation is taken exactly once.
    pub fn follow_session(&mut self) {
        let Some((id, title)) = self.editing_title() else {
            self.mode = Mode::Navigate;
            return;
        };
        if let Some(caret) = self.sync.session_mut().take_caret(title.chars().count()) {
            self.edit_cursor = cursor::char_to_byte(&title, caret);
            self.select(&id);
        }
        self.edit_cursor = unicode::clamp_to_char_boundary(&title, self.edit_cursor);
        self.mode = Mode::Edit;
    }
}

// ---------------------------------------------------------------------------
// Terminal loop
// ---------------------------------------------------------------------------

/// Run the TUI until the user quits. Remote calls run on `runtime`.
pub fn run<S: TaskService + 'static>(
    sync: SyncController<S>,
    runtime: Handle,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut app = App::new(sync, runtime);
    app.submit(Intent::Bootstrap);

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;
    terminal.clear()?;

    // Install panic hook to restore terminal on panic
    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen, DisableMouseCapture);
        original_hook(panic_info);
    }));

    let result = run_event_loop(&mut terminal, &mut app);

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    result
}

fn run_event_loop<S: TaskService + 'static>(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App<S>,
) -> Result<(), Box<dyn std::error::Error>> {
    loop {
        app.drain();
        terminal.draw(|frame| render::render(frame, app))?;

        if event::poll(Duration::from_millis(50))? {
            match event::read()? {
                Event::Key(key) if key.kind == KeyEventKind::Press => input::handle_key(app, key),
                Event::Mouse(mouse) => input::handle_mouse(app, mouse),
                _ => {}
            }
        }

        if app.should_quit {
            break;
        }
    }
    Ok(())
}
