use crate::model::task::TaskId;

/// What Escape does to a title that was edited in place.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CancelPolicy {
    /// Leave whatever was typed; keystrokes were already written through.
    #[default]
    KeepText,
    /// Restore the title the task had when editing began.
    RevertText,
}

/// Which task, if any, is in edit mode.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum EditState {
    #[default]
    Idle,
    Editing {
        task_id: TaskId,
        /// Caret requested at activation (character index). None = end of text.
        requested_caret: Option<usize>,
        /// The caret has been handed to the editor for this activation.
        caret_applied: bool,
        /// Title when editing began, for cancel-with-revert.
        original_title: String,
    },
}

/// Result of leaving edit mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditExit {
    pub task_id: TaskId,
    /// Title to restore, when the exit was a reverting cancel.
    pub restore_title: Option<String>,
}

/// Page-wide edit session: at most one task is being edited at any time.
#[derive(Debug, Clone, Default)]
pub struct EditSession {
    state: EditState,
    policy: CancelPolicy,
}

impl EditSession {
    pub fn new(policy: CancelPolicy) -> Self {
        EditSession {
            state: EditState::Idle,
            policy,
        }
    }

    pub fn state(&self) -> &EditState {
        &self.state
    }

    pub fn policy(&self) -> CancelPolicy {
        self.policy
    }

    pub fn active_task_id(&self) -> Option<&TaskId> {
        match &self.state {
            EditState::Editing { task_id, .. } => Some(task_id),
            EditState::Idle => None,
        }
    }

    pub fn is_active(&self, id: &str) -> bool {
        self.active_task_id().is_some_and(|a| a.as_str() == id)
    }

    /// Put `task_id` in edit mode. Any other task that was being edited is
    /// implicitly deactivated and returned. Re-activating the task that is
    /// already active only updates the requested caret.
    pub fn activate(
        &mut self,
        task_id: TaskId,
        caret: Option<usize>,
        current_title: &str,
    ) -> Option<TaskId> {
        let previous = match std::mem::take(&mut self.state) {
            EditState::Editing {
                task_id: prev,
                original_title,
                ..
            } if prev == task_id => {
                self.state = EditState::Editing {
                    task_id,
                    requested_caret: caret,
                    caret_applied: false,
                    original_title,
                };
                return None;
            }
            EditState::Editing { task_id: prev, .. } => Some(prev),
            EditState::Idle => None,
        };
        self.state = EditState::Editing {
            task_id,
            requested_caret: caret,
            caret_applied: false,
            original_title: current_title.to_string(),
        };
        previous
    }

    /// Leave edit mode for `task_id`. Naming a task that is not the active
    /// one is a no-op and returns false.
    pub fn deactivate(&mut self, task_id: &str) -> bool {
        if !self.is_active(task_id) {
            return false;
        }
        self.state = EditState::Idle;
        true
    }

    /// Finish editing and keep the text.
    pub fn commit(&mut self, task_id: &str) -> Option<EditExit> {
        if !self.deactivate(task_id) {
            return None;
        }
        Some(EditExit {
            task_id: TaskId::from(task_id),
            restore_title: None,
        })
    }

    /// Abandon editing. Under `RevertText` the exit carries the pre-edit
    /// title for the caller to write back.
    pub fn cancel(&mut self, task_id: &str) -> Option<EditExit> {
        if !self.is_active(task_id) {
            return None;
        }
        let EditState::Editing {
            task_id,
            original_title,
            ..
        } = std::mem::take(&mut self.state)
        else {
            return None;
        };
        let restore_title = match self.policy {
            CancelPolicy::RevertText => Some(original_title),
            CancelPolicy::KeepText => None,
        };
        Some(EditExit {
            task_id,
            restore_title,
        })
    }

    /// Caret position for the editor, handed out exactly once per
    /// activation: the requested offset clamped to the text, or the end of
    /// the text when none was requested. Later calls return None so the
    /// user's own caret movement is never overwritten.
    pub fn take_caret(&mut self, text_len: usize) -> Option<usize> {
        match &mut self.state {
            EditState::Editing {
                requested_caret,
                caret_applied,
                ..
            } if !*caret_applied => {
                *caret_applied = true;
                Some(requested_caret.map_or(text_len, |c| c.min(text_len)))
            }
            _ => None,
        }
    }
}
