pub mod http;

use async_trait::async_trait;

use crate::model::task::{HealthStatus, NotesDocument, SplitResponse, TaskId, TaskNode, TaskPatch};

pub use http::HttpTaskService;

/// Error type for calls to the remote task service
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ServiceError {
    /// The request never produced a response (connection refused, timeout, ...)
    #[error("could not reach task service: {0}")]
    Transport(String),
    /// The service answered with a non-success status
    #[error("{message}")]
    Status { status: u16, message: String },
    /// The service answered, but the body was not what we expected
    #[error("unexpected response from task service: {0}")]
    Malformed(String),
}

/// The remote task service. The server owns the authoritative task tree;
/// every method is a single request/response exchange.
#[async_trait]
pub trait TaskService: Send + Sync {
    /// Full forest in display order
    async fn list_tasks(&self) -> Result<Vec<TaskNode>, ServiceError>;

    /// Create a task as the last root, or as the last child of `parent_id`
    async fn create_task(
        &self,
        title: &str,
        parent_id: Option<&TaskId>,
    ) -> Result<TaskNode, ServiceError>;

    async fn update_task(&self, id: &TaskId, patch: &TaskPatch) -> Result<TaskNode, ServiceError>;

    /// Delete a task and its subtree
    async fn delete_task(&self, id: &TaskId) -> Result<(), ServiceError>;

    /// Delete every task
    async fn clear_tasks(&self) -> Result<(), ServiceError>;

    /// Ask the service to generate subtasks under `id`
    async fn split_task(
        &self,
        id: &TaskId,
        context: Option<&str>,
    ) -> Result<SplitResponse, ServiceError>;

    async fn generate_notes(&self, id: &TaskId) -> Result<NotesDocument, ServiceError>;

    async fn health(&self) -> Result<HealthStatus, ServiceError>;
}
