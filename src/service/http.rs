use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Method, Response};
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::model::config::ServiceConfig;
use crate::model::task::{
    HealthStatus, NewTask, NotesDocument, SplitResponse, TaskId, TaskNode, TaskPatch,
};

use super::{ServiceError, TaskService};

/// JSON-over-HTTP client for the task service.
#[derive(Debug, Clone)]
pub struct HttpTaskService {
    base_url: String,
    client: Client,
}

impl HttpTaskService {
    pub fn new(config: &ServiceConfig) -> Result<Self, ServiceError> {
        let mut builder = Client::builder();
        if config.timeout_secs > 0 {
            builder = builder.timeout(Duration::from_secs(config.timeout_secs));
        }
        let client = builder
            .build()
            .map_err(|e| ServiceError::Transport(e.to_string()))?;
        Ok(HttpTaskService {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn send<B: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<Response, ServiceError> {
        let mut request = self.client.request(method.clone(), self.url(path));
        if let Some(body) = body {
            request = request.json(body);
        }
        let response = request.send().await.map_err(|e| {
            tracing::debug!(%method, path, error = %e, "task service unreachable");
            ServiceError::Transport(e.to_string())
        })?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        let message = error_message(status.as_u16(), &body);
        tracing::debug!(%method, path, status = status.as_u16(), %message, "task service error");
        Err(ServiceError::Status {
            status: status.as_u16(),
            message,
        })
    }

    async fn send_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<T, ServiceError> {
        let response = self.send(method, path, body).await?;
        response
            .json::<T>()
            .await
            .map_err(|e| ServiceError::Malformed(e.to_string()))
    }
}

/// Human-readable message for a failed response: the service's `detail`
/// field when the body carries one, otherwise the bare status.
pub fn error_message(status: u16, body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| match v.get("detail") {
            Some(serde_json::Value::String(s)) => Some(s.clone()),
            Some(other) if !other.is_null() => Some(other.to_string()),
            _ => None,
        })
        .unwrap_or_else(|| format!("HTTP error! status: {}", status))
}

fn task_path(id: &TaskId) -> String {
    format!("/tasks/{}", id)
}

#[derive(Serialize)]
struct SplitRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    context: Option<&'a str>,
}

#[async_trait]
impl TaskService for HttpTaskService {
    async fn list_tasks(&self) -> Result<Vec<TaskNode>, ServiceError> {
        self.send_json::<(), _>(Method::GET, "/tasks", None).await
    }

    async fn create_task(
        &self,
        title: &str,
        parent_id: Option<&TaskId>,
    ) -> Result<TaskNode, ServiceError> {
        let body = NewTask { title, parent_id };
        self.send_json(Method::POST, "/tasks", Some(&body)).await
    }

    async fn update_task(&self, id: &TaskId, patch: &TaskPatch) -> Result<TaskNode, ServiceError> {
        self.send_json(Method::PUT, &task_path(id), Some(patch)).await
    }

    async fn delete_task(&self, id: &TaskId) -> Result<(), ServiceError> {
        self.send::<()>(Method::DELETE, &task_path(id), None)
            .await
            .map(|_| ())
    }

    async fn clear_tasks(&self) -> Result<(), ServiceError> {
        self.send::<()>(Method::DELETE, "/tasks", None)
            .await
            .map(|_| ())
    }

    async fn split_task(
        &self,
        id: &TaskId,
        context: Option<&str>,
    ) -> Result<SplitResponse, ServiceError> {
        let path = format!("{}/split", task_path(id));
        self.send_json(Method::POST, &path, Some(&SplitRequest { context }))
            .await
    }

    async fn generate_notes(&self, id: &TaskId) -> Result<NotesDocument, ServiceError> {
        let path = format!("{}/notes", task_path(id));
        self.send_json::<(), _>(Method::POST, &path, None).await
    }

    async fn health(&self) -> Result<HealthStatus, ServiceError> {
        self.send_json::<(), _>(Method::GET, "/", None).await
    }
}
