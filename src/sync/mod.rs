pub mod request;

#[cfg(test)]
pub(crate) mod fake;

use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use crate::io::snapshot;
use crate::model::config::EditingConfig;
use crate::model::task::{NotesDocument, SplitResponse, TaskId, TaskNode, TaskPatch};
use crate::ops::edit_session::{CancelPolicy, EditSession};
use crate::ops::tree_ops::{TaskTree, TreeError};
use crate::service::{ServiceError, TaskService};

pub use request::{Completion, Request, Seeded};

/// Class of remote operation, used to label failures and to decide which
/// success clears the banner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Load,
    Create,
    Update,
    Delete,
    Split,
    Notes,
    Clear,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Operation::Load => "load tasks",
            Operation::Create => "create task",
            Operation::Update => "update task",
            Operation::Delete => "delete task",
            Operation::Split => "split task",
            Operation::Notes => "generate notes",
            Operation::Clear => "clear tasks",
        };
        f.write_str(s)
    }
}

/// Error type for sync operations. None of these is fatal.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SyncError {
    #[error("task not found: {0}")]
    NotFound(TaskId),
    #[error("could not {op}: {message}")]
    RemoteFailure { op: Operation, message: String },
    #[error("could not {op}: invalid response: {message}")]
    ValidationFailure { op: Operation, message: String },
}

impl SyncError {
    pub fn from_service(op: Operation, err: ServiceError) -> Self {
        match err {
            ServiceError::Malformed(message) => SyncError::ValidationFailure { op, message },
            other => SyncError::RemoteFailure {
                op,
                message: other.to_string(),
            },
        }
    }

    pub fn op(&self) -> Option<Operation> {
        match self {
            SyncError::NotFound(_) => None,
            SyncError::RemoteFailure { op, .. } | SyncError::ValidationFailure { op, .. } => {
                Some(*op)
            }
        }
    }
}

/// Whether the local tree is backed by the service
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Connectivity {
    #[default]
    Online,
    /// Bootstrap failed; the tree holds a local placeholder the service has
    /// never seen. The next successful load returns to Online.
    Degraded,
}

/// What the user asked for
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    Bootstrap,
    Reload,
    Create {
        title: String,
        parent: Option<TaskId>,
        activate: bool,
    },
    Update { id: TaskId, patch: TaskPatch },
    /// Cascade completion over the subtree, one update per node
    SetCompleted { id: TaskId, value: bool },
    Delete { id: TaskId },
    Split { id: TaskId, context: Option<String> },
    Notes { id: TaskId },
    ClearAll,
    Activate { id: TaskId, caret: Option<usize> },
    Commit { id: TaskId },
    Cancel { id: TaskId },
}

/// What applying a completion means for the caller
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    None,
    Created(TaskId),
    /// The controller put this task in edit mode
    Activated(TaskId),
    Split {
        response: SplitResponse,
        activated: Option<TaskId>,
    },
    Notes(NotesDocument),
    /// Run this intent next
    FollowUp(Intent),
}

/// Drives the remote task service and keeps the local tree, the edit
/// session and the error banner in step with it.
///
/// Work flows in three stages so a UI never waits on the network:
/// [`prepare`](Self::prepare) applies optimistic local effects and returns
/// the requests to run, [`Request::execute`] performs them anywhere, and
/// [`apply`](Self::apply) folds each completion back in.
pub struct SyncController<S: TaskService + ?Sized> {
    service: Arc<S>,
    tree: TaskTree,
    session: EditSession,
    /// Latest update token issued per task
    inflight: HashMap<TaskId, u64>,
    next_token: u64,
    guard_stale: bool,
    pending: usize,
    last_error: Option<SyncError>,
    connectivity: Connectivity,
    snapshot_path: Option<PathBuf>,
}

impl<S: TaskService + ?Sized> SyncController<S> {
    pub fn new(service: Arc<S>, editing: &EditingConfig) -> Self {
        let policy = if editing.cancel_reverts {
            CancelPolicy::RevertText
        } else {
            CancelPolicy::KeepText
        };
        SyncController {
            service,
            tree: TaskTree::new(),
            session: EditSession::new(policy),
            inflight: HashMap::new(),
            next_token: 0,
            guard_stale: editing.guard_stale_responses,
            pending: 0,
            last_error: None,
            connectivity: Connectivity::Online,
            snapshot_path: None,
        }
    }

    /// Write the forest to `path` after every successful load
    pub fn with_snapshot(mut self, path: PathBuf) -> Self {
        self.snapshot_path = Some(path);
        self
    }

    pub fn service(&self) -> &Arc<S> {
        &self.service
    }

    pub fn tree(&self) -> &TaskTree {
        &self.tree
    }

    pub fn session(&self) -> &EditSession {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut EditSession {
        &mut self.session
    }

    pub fn active_task_id(&self) -> Option<&TaskId> {
        self.session.active_task_id()
    }

    pub fn last_error(&self) -> Option<&SyncError> {
        self.last_error.as_ref()
    }

    pub fn dismiss_error(&mut self) {
        self.last_error = None;
    }

    pub fn connectivity(&self) -> Connectivity {
        self.connectivity
    }

    /// Requests prepared but not yet applied
    pub fn pending(&self) -> usize {
        self.pending
    }

    // -----------------------------------------------------------------------
    // Stage 1: local effects
    // -----------------------------------------------------------------------

    /// Apply the intent's optimistic local effects and return the remote
    /// requests it needs. Fails only when the intent needs local data for a
    /// task the tree does not hold.
    pub fn prepare(&mut self, intent: Intent) -> Result<Vec<Request>, SyncError> {
        let requests = match intent {
            Intent::Bootstrap => vec![Request::Bootstrap],
            Intent::Reload => vec![Request::List],
            Intent::Create {
                title,
                parent,
                activate,
            } => vec![Request::Create {
                title,
                parent,
                activate,
            }],
            Intent::Update { id, patch } => {
                if let Err(e) = self.tree.replace(id.as_str(), &patch) {
                    tracing::debug!(%id, error = %e, "update for absent task ignored");
                    return Err(not_found(e));
                }
                vec![self.update_request(id, patch)]
            }
            Intent::SetCompleted { id, value } => {
                let touched = self
                    .tree
                    .cascade_complete(id.as_str(), value)
                    .map_err(not_found)?;
                touched
                    .into_iter()
                    .map(|t| self.update_request(t, TaskPatch::completed(value)))
                    .collect()
            }
            Intent::Delete { id } => vec![Request::Delete { id }],
            Intent::Split { id, context } => {
                let known = self
                    .tree
                    .find(id.as_str())
                    .map(|e| e.children.clone())
                    .unwrap_or_default();
                vec![Request::Split { id, context, known }]
            }
            Intent::Notes { id } => vec![Request::Notes { id }],
            Intent::ClearAll => vec![Request::Clear],
            Intent::Activate { id, caret } => {
                let title = self
                    .tree
                    .find(id.as_str())
                    .map(|e| e.title.clone())
                    .ok_or_else(|| SyncError::NotFound(id.clone()))?;
                if self.session.is_active(id.as_str()) {
                    self.session.activate(id, caret, &title);
                    Vec::new()
                } else {
                    let mut requests = Vec::new();
                    if let Some(previous) = self.session.activate(id.clone(), caret, &title) {
                        requests.push(self.update_request(previous, TaskPatch::editing(false)));
                    }
                    requests.push(self.update_request(id, TaskPatch::editing(true)));
                    requests
                }
            }
            Intent::Commit { id } => match self.session.commit(id.as_str()) {
                Some(exit) => vec![self.update_request(exit.task_id, TaskPatch::editing(false))],
                None => Vec::new(),
            },
            Intent::Cancel { id } => match self.session.cancel(id.as_str()) {
                Some(exit) => {
                    let mut patch = TaskPatch::editing(false);
                    if let Some(original) = exit.restore_title {
                        let restore = TaskPatch::title(original.clone());
                        if let Err(e) = self.tree.replace(exit.task_id.as_str(), &restore) {
                            tracing::debug!(error = %e, "revert skipped");
                        }
                        patch.title = Some(original);
                    }
                    vec![self.update_request(exit.task_id, patch)]
                }
                None => Vec::new(),
            },
        };
        self.pending += requests.len();
        Ok(requests)
    }

    fn update_request(&mut self, id: TaskId, patch: TaskPatch) -> Request {
        self.next_token += 1;
        let token = self.next_token;
        self.inflight.insert(id.clone(), token);
        Request::Update { id, patch, token }
    }

    // -----------------------------------------------------------------------
    // Stage 3: fold results back in
    // -----------------------------------------------------------------------

    /// Fold a completed request into local state. Failures are recorded as
    /// the banner and returned; the tree is never rolled back.
    pub fn apply(&mut self, completion: Completion) -> Result<Effect, SyncError> {
        self.pending = self.pending.saturating_sub(1);
        match completion {
            Completion::Bootstrapped(result) => {
                let installed = match result {
                    Ok(seeded) => self.install_forest(seeded.forest).map(|()| seeded.created),
                    Err(e) => Err(self.fail(Operation::Load, e)),
                };
                match installed {
                    Ok(Some(id)) => {
                        tracing::info!(%id, "empty task list, seeded a blank task");
                        self.session.activate(id.clone(), None, "");
                        Ok(Effect::Activated(id))
                    }
                    Ok(None) => Ok(Effect::None),
                    Err(err) => Ok(Effect::Activated(self.fall_back_to_local(&err))),
                }
            }
            Completion::Listed(result) => {
                let forest = result.map_err(|e| self.fail(Operation::Load, e))?;
                self.install_forest(forest)?;
                Ok(Effect::None)
            }
            Completion::Created {
                parent,
                activate,
                result,
            } => {
                let node = result.map_err(|e| self.fail(Operation::Create, e))?;
                self.succeed(Operation::Create);
                let id = node.id.clone();
                let title = node.title.clone();
                match self.tree.append(node, parent.as_ref()) {
                    Ok(()) => {}
                    Err(TreeError::NotFound(missing)) => {
                        tracing::debug!(%id, parent = %missing, "created under unknown parent, reloading");
                        return Ok(Effect::FollowUp(Intent::Reload));
                    }
                    Err(e) => tracing::debug!(%id, error = %e, "created task already present"),
                }
                if activate {
                    self.session.activate(id.clone(), None, &title);
                    Ok(Effect::Activated(id))
                } else {
                    Ok(Effect::Created(id))
                }
            }
            Completion::Updated { id, token, result } => {
                let latest = self.inflight.get(&id) == Some(&token);
                if latest {
                    self.inflight.remove(&id);
                }
                let node = result.map_err(|e| self.fail(Operation::Update, e))?;
                self.succeed(Operation::Update);
                if self.guard_stale && !latest {
                    tracing::debug!(%id, token, "stale update response dropped");
                    return Ok(Effect::None);
                }
                if let Err(e) = self.tree.merge_remote(&node) {
                    tracing::debug!(%id, error = %e, "update response for absent task ignored");
                }
                Ok(Effect::None)
            }
            Completion::Deleted {
                id,
                result,
                reloaded,
            } => {
                if self.session.is_active(id.as_str()) {
                    self.session.deactivate(id.as_str());
                }
                let deleted = match result {
                    Ok(()) => {
                        self.succeed(Operation::Delete);
                        Ok(Effect::None)
                    }
                    Err(e) => Err(self.fail(Operation::Delete, e)),
                };
                match reloaded {
                    Ok(forest) => self.install_forest(forest)?,
                    Err(e) => return Err(self.fail(Operation::Load, e)),
                }
                deleted
            }
            Completion::Split {
                id,
                known,
                result,
                reloaded,
            } => {
                let response = result.map_err(|e| self.fail(Operation::Split, e))?;
                self.succeed(Operation::Split);
                if let Some(reloaded) = reloaded {
                    let forest = reloaded.map_err(|e| self.fail(Operation::Load, e))?;
                    self.install_forest(forest)?;
                }
                let fresh = self.tree.find(id.as_str()).and_then(|parent| {
                    parent
                        .children
                        .iter()
                        .find(|c| !known.contains(c))
                        .cloned()
                });
                let activated = match fresh {
                    Some(child) => {
                        let title = self
                            .tree
                            .find(child.as_str())
                            .map(|e| e.title.clone())
                            .unwrap_or_default();
                        self.session.activate(child.clone(), None, &title);
                        Some(child)
                    }
                    None => None,
                };
                Ok(Effect::Split {
                    response,
                    activated,
                })
            }
            Completion::Notes { id, result } => {
                let doc = result.map_err(|e| self.fail(Operation::Notes, e))?;
                self.succeed(Operation::Notes);
                tracing::debug!(%id, "notes generated");
                Ok(Effect::Notes(doc))
            }
            Completion::Cleared(result) => {
                result.map_err(|e| self.fail(Operation::Clear, e))?;
                self.succeed(Operation::Clear);
                self.tree = TaskTree::new();
                self.session = EditSession::new(self.session.policy());
                self.inflight.clear();
                if let Some(path) = &self.snapshot_path
                    && let Err(e) = snapshot::clear_snapshot(path)
                {
                    tracing::warn!(error = %e, "could not remove snapshot cache");
                }
                Ok(Effect::FollowUp(Intent::Reload))
            }
        }
    }

    /// Degraded mode: a single client-generated task, active, that the
    /// service has never seen.
    fn fall_back_to_local(&mut self, cause: &SyncError) -> TaskId {
        let placeholder = TaskNode::new(TaskId::generate_local(), "");
        let id = placeholder.id.clone();
        self.tree = TaskTree::from_forest(vec![placeholder]).unwrap_or_default();
        self.session.activate(id.clone(), None, "");
        self.connectivity = Connectivity::Degraded;
        tracing::info!(%id, error = %cause, "task service unavailable, working locally");
        id
    }

    /// Replace the tree with a freshly listed forest
    fn install_forest(&mut self, forest: Vec<TaskNode>) -> Result<(), SyncError> {
        let tree = TaskTree::from_forest(forest).map_err(|e| {
            self.record(SyncError::ValidationFailure {
                op: Operation::Load,
                message: e.to_string(),
            })
        })?;
        self.tree = tree;
        self.connectivity = Connectivity::Online;
        self.succeed(Operation::Load);

        if let Some(active) = self.session.active_task_id().cloned()
            && !self.tree.contains(active.as_str())
        {
            tracing::debug!(id = %active, "active task vanished on reload");
            self.session.deactivate(active.as_str());
        }

        if let Some(path) = &self.snapshot_path
            && let Err(e) = snapshot::write_snapshot(path, &self.tree.to_forest())
        {
            tracing::warn!(error = %e, "could not write snapshot cache");
        }
        Ok(())
    }

    fn fail(&mut self, op: Operation, err: ServiceError) -> SyncError {
        tracing::debug!(%op, error = %err, "remote call failed");
        self.record(SyncError::from_service(op, err))
    }

    fn record(&mut self, err: SyncError) -> SyncError {
        self.last_error = Some(err.clone());
        err
    }

    fn succeed(&mut self, op: Operation) {
        if self.last_error.as_ref().and_then(SyncError::op) == Some(op) {
            self.last_error = None;
        }
    }

    // -----------------------------------------------------------------------
    // Sequential driving
    // -----------------------------------------------------------------------

    /// Run an intent to completion, including any follow-ups, awaiting each
    /// request in turn. Returns every effect produced, in order; the first
    /// failure is returned after all requests have been applied.
    pub async fn dispatch(&mut self, intent: Intent) -> Result<Vec<Effect>, SyncError> {
        let mut queue = VecDeque::from([intent]);
        let mut effects = Vec::new();
        let mut first_error = None;
        while let Some(intent) = queue.pop_front() {
            let requests = self.prepare(intent)?;
            for request in requests {
                let completion = request.execute(self.service.as_ref()).await;
                match self.apply(completion) {
                    Ok(Effect::FollowUp(next)) => queue.push_back(next),
                    Ok(Effect::None) => {}
                    Ok(effect) => effects.push(effect),
                    Err(e) => {
                        first_error.get_or_insert(e);
                    }
                }
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(effects),
        }
    }

    /// Load the tree; seed an empty list with one active blank task, or fall
    /// back to a local placeholder when the service is unreachable.
    pub async fn bootstrap(&mut self) -> Result<Option<TaskId>, SyncError> {
        let effects = self.dispatch(Intent::Bootstrap).await?;
        Ok(activated(&effects))
    }

    pub async fn reload(&mut self) -> Result<(), SyncError> {
        self.dispatch(Intent::Reload).await.map(|_| ())
    }

    /// Create a task. None means the service accepted it under a parent the
    /// local tree did not hold; the tree has been reloaded instead.
    pub async fn create_task(
        &mut self,
        title: &str,
        parent: Option<&TaskId>,
    ) -> Result<Option<TaskId>, SyncError> {
        let effects = self
            .dispatch(Intent::Create {
                title: title.to_string(),
                parent: parent.cloned(),
                activate: false,
            })
            .await?;
        Ok(effects.iter().find_map(|e| match e {
            Effect::Created(id) | Effect::Activated(id) => Some(id.clone()),
            _ => None,
        }))
    }

    pub async fn update_task(&mut self, id: &TaskId, patch: TaskPatch) -> Result<(), SyncError> {
        self.dispatch(Intent::Update {
            id: id.clone(),
            patch,
        })
        .await
        .map(|_| ())
    }

    pub async fn rename(&mut self, id: &TaskId, title: &str) -> Result<(), SyncError> {
        self.update_task(id, TaskPatch::title(title)).await
    }

    /// Cascade completion locally and mirror every touched node remotely
    pub async fn set_completed(&mut self, id: &TaskId, value: bool) -> Result<(), SyncError> {
        self.dispatch(Intent::SetCompleted {
            id: id.clone(),
            value,
        })
        .await
        .map(|_| ())
    }

    /// Delete remotely, then reload whatever the outcome
    pub async fn delete_task(&mut self, id: &TaskId) -> Result<(), SyncError> {
        self.dispatch(Intent::Delete { id: id.clone() })
            .await
            .map(|_| ())
    }

    pub async fn split_task(
        &mut self,
        id: &TaskId,
        context: Option<&str>,
    ) -> Result<SplitResponse, SyncError> {
        let effects = self
            .dispatch(Intent::Split {
                id: id.clone(),
                context: context.map(str::to_string),
            })
            .await?;
        effects
            .into_iter()
            .find_map(|e| match e {
                Effect::Split { response, .. } => Some(response),
                _ => None,
            })
            .ok_or_else(|| SyncError::NotFound(id.clone()))
    }

    pub async fn generate_notes(&mut self, id: &TaskId) -> Result<NotesDocument, SyncError> {
        let effects = self.dispatch(Intent::Notes { id: id.clone() }).await?;
        effects
            .into_iter()
            .find_map(|e| match e {
                Effect::Notes(doc) => Some(doc),
                _ => None,
            })
            .ok_or_else(|| SyncError::NotFound(id.clone()))
    }

    pub async fn clear_all(&mut self) -> Result<(), SyncError> {
        self.dispatch(Intent::ClearAll).await.map(|_| ())
    }

    pub async fn activate(&mut self, id: &TaskId, caret: Option<usize>) -> Result<(), SyncError> {
        self.dispatch(Intent::Activate {
            id: id.clone(),
            caret,
        })
        .await
        .map(|_| ())
    }

    pub async fn commit_edit(&mut self, id: &TaskId) -> Result<(), SyncError> {
        self.dispatch(Intent::Commit { id: id.clone() })
            .await
            .map(|_| ())
    }

    pub async fn cancel_edit(&mut self, id: &TaskId) -> Result<(), SyncError> {
        self.dispatch(Intent::Cancel { id: id.clone() })
            .await
            .map(|_| ())
    }
}

fn not_found(err: TreeError) -> SyncError {
    match err {
        TreeError::NotFound(id) | TreeError::DuplicateId(id) => SyncError::NotFound(id),
        TreeError::Malformed(message) => SyncError::ValidationFailure {
            op: Operation::Load,
            message,
        },
    }
}

fn activated(effects: &[Effect]) -> Option<TaskId> {
    effects.iter().find_map(|e| match e {
        Effect::Activated(id) => Some(id.clone()),
        Effect::Split { activated, .. } => activated.clone(),
        _ => None,
    })
}
