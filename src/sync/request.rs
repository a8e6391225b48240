use crate::model::task::{NotesDocument, SplitResponse, TaskId, TaskNode, TaskPatch};
use crate::service::{ServiceError, TaskService};

/// One remote call, carrying everything needed to run it away from the
/// controller and to fold its result back in afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    /// List, and seed an empty list with one blank task
    Bootstrap,
    List,
    Create {
        title: String,
        parent: Option<TaskId>,
        activate: bool,
    },
    Update {
        id: TaskId,
        patch: TaskPatch,
        token: u64,
    },
    /// Delete, then list regardless of the outcome
    Delete { id: TaskId },
    /// Split, then list on success
    Split {
        id: TaskId,
        context: Option<String>,
        /// Children the task had before the split
        known: Vec<TaskId>,
    },
    Notes { id: TaskId },
    Clear,
}

/// Forest returned by a bootstrap, and the blank task created to seed it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Seeded {
    pub forest: Vec<TaskNode>,
    pub created: Option<TaskId>,
}

/// Result of running a [`Request`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Completion {
    Bootstrapped(Result<Seeded, ServiceError>),
    Listed(Result<Vec<TaskNode>, ServiceError>),
    Created {
        parent: Option<TaskId>,
        activate: bool,
        result: Result<TaskNode, ServiceError>,
    },
    Updated {
        id: TaskId,
        token: u64,
        result: Result<TaskNode, ServiceError>,
    },
    Deleted {
        id: TaskId,
        result: Result<(), ServiceError>,
        reloaded: Result<Vec<TaskNode>, ServiceError>,
    },
    Split {
        id: TaskId,
        known: Vec<TaskId>,
        result: Result<SplitResponse, ServiceError>,
        /// Present only when the split itself succeeded
        reloaded: Option<Result<Vec<TaskNode>, ServiceError>>,
    },
    Notes {
        id: TaskId,
        result: Result<NotesDocument, ServiceError>,
    },
    Cleared(Result<(), ServiceError>),
}

impl Request {
    /// Perform the remote call(s). Touches no local state, so it can run on
    /// any task while the UI keeps going.
    pub async fn execute<S: TaskService + ?Sized>(self, service: &S) -> Completion {
        match self {
            Request::Bootstrap => Completion::Bootstrapped(bootstrap(service).await),
            Request::List => Completion::Listed(service.list_tasks().await),
            Request::Create {
                title,
                parent,
                activate,
            } => {
                let result = service.create_task(&title, parent.as_ref()).await;
                Completion::Created {
                    parent,
                    activate,
                    result,
                }
            }
            Request::Update { id, patch, token } => {
                let result = service.update_task(&id, &patch).await;
                Completion::Updated { id, token, result }
            }
            Request::Delete { id } => {
                let result = service.delete_task(&id).await;
                let reloaded = service.list_tasks().await;
                Completion::Deleted {
                    id,
                    result,
                    reloaded,
                }
            }
            Request::Split { id, context, known } => {
                let result = service.split_task(&id, context.as_deref()).await;
                let reloaded = match result {
                    Ok(_) => Some(service.list_tasks().await),
                    Err(_) => None,
                };
                Completion::Split {
                    id,
                    known,
                    result,
                    reloaded,
                }
            }
            Request::Notes { id } => {
                let result = service.generate_notes(&id).await;
                Completion::Notes { id, result }
            }
            Request::Clear => Completion::Cleared(service.clear_tasks().await),
        }
    }
}

async fn bootstrap<S: TaskService + ?Sized>(service: &S) -> Result<Seeded, ServiceError> {
    let forest = service.list_tasks().await?;
    if !forest.is_empty() {
        return Ok(Seeded {
            forest,
            created: None,
        });
    }
    let node = service.create_task("", None).await?;
    Ok(Seeded {
        created: Some(node.id.clone()),
        forest: vec![node],
    })
}
