//! In-memory task service for tests. Behaves like the real service (ids are
//! assigned on create, splits append three children) and can be told to
//! fail individual calls.

use std::collections::HashSet;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::model::task::{
    HealthStatus, NotesDocument, SplitResponse, TaskId, TaskNode, TaskPatch,
};
use crate::service::{ServiceError, TaskService};

#[derive(Default)]
struct State {
    tasks: Vec<TaskNode>,
    failing: HashSet<&'static str>,
    calls: Vec<String>,
    next_id: u32,
}

#[derive(Default)]
pub(crate) struct FakeService {
    state: Mutex<State>,
}

impl FakeService {
    pub(crate) fn with_tasks(tasks: Vec<TaskNode>) -> Self {
        let service = FakeService::default();
        service.state.lock().unwrap().tasks = tasks;
        service
    }

    /// Make every call named `op` fail with a 500 until `heal` is called
    pub(crate) fn fail(&self, op: &'static str) {
        self.state.lock().unwrap().failing.insert(op);
    }

    pub(crate) fn heal(&self, op: &'static str) {
        self.state.lock().unwrap().failing.remove(op);
    }

    pub(crate) fn calls(&self) -> Vec<String> {
        self.state.lock().unwrap().calls.clone()
    }

    pub(crate) fn tasks(&self) -> Vec<TaskNode> {
        self.state.lock().unwrap().tasks.clone()
    }

    pub(crate) fn find(&self, id: &str) -> Option<TaskNode> {
        fn walk(nodes: &[TaskNode], id: &str) -> Option<TaskNode> {
            nodes.iter().find_map(|n| {
                if n.id.as_str() == id {
                    Some(n.clone())
                } else {
                    walk(&n.children, id)
                }
            })
        }
        walk(&self.state.lock().unwrap().tasks, id)
    }

    fn begin(&self, op: &'static str, detail: String) -> Result<std::sync::MutexGuard<'_, State>, ServiceError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(if detail.is_empty() {
            op.to_string()
        } else {
            format!("{op} {detail}")
        });
        if state.failing.contains(op) {
            return Err(ServiceError::Status {
                status: 500,
                message: format!("{op} is down"),
            });
        }
        Ok(state)
    }
}

fn find_mut<'a>(nodes: &'a mut [TaskNode], id: &str) -> Option<&'a mut TaskNode> {
    for node in nodes.iter_mut() {
        if node.id.as_str() == id {
            return Some(node);
        }
        if let Some(found) = find_mut(&mut node.children, id) {
            return Some(found);
        }
    }
    None
}

fn remove(nodes: &mut Vec<TaskNode>, id: &str) -> bool {
    let before = nodes.len();
    nodes.retain(|n| n.id.as_str() != id);
    if nodes.len() != before {
        return true;
    }
    nodes.iter_mut().any(|n| remove(&mut n.children, id))
}

fn not_found() -> ServiceError {
    ServiceError::Status {
        status: 404,
        message: "Task not found".into(),
    }
}

impl State {
    fn mint(&mut self, title: &str) -> TaskNode {
        self.next_id += 1;
        TaskNode::new(TaskId::new(format!("t{}", self.next_id)), title)
    }
}

#[async_trait]
impl TaskService for FakeService {
    async fn list_tasks(&self) -> Result<Vec<TaskNode>, ServiceError> {
        let state = self.begin("list", String::new())?;
        Ok(state.tasks.clone())
    }

    async fn create_task(
        &self,
        title: &str,
        parent_id: Option<&TaskId>,
    ) -> Result<TaskNode, ServiceError> {
        let mut state = self.begin("create", title.to_string())?;
        let node = state.mint(title);
        match parent_id {
            Some(p) => {
                let parent = find_mut(&mut state.tasks, p.as_str()).ok_or_else(not_found)?;
                parent.children.push(node.clone());
            }
            None => state.tasks.push(node.clone()),
        }
        Ok(node)
    }

    async fn update_task(&self, id: &TaskId, patch: &TaskPatch) -> Result<TaskNode, ServiceError> {
        let detail = format!("{} {}", id, serde_json::to_string(patch).unwrap());
        let mut state = self.begin("update", detail)?;
        let node = find_mut(&mut state.tasks, id.as_str()).ok_or_else(not_found)?;
        if let Some(title) = &patch.title {
            node.title = title.clone();
        }
        if let Some(completed) = patch.completed {
            node.completed = completed;
        }
        Ok(node.clone())
    }

    async fn delete_task(&self, id: &TaskId) -> Result<(), ServiceError> {
        let mut state = self.begin("delete", id.to_string())?;
        if remove(&mut state.tasks, id.as_str()) {
            Ok(())
        } else {
            Err(not_found())
        }
    }

    async fn clear_tasks(&self) -> Result<(), ServiceError> {
        let mut state = self.begin("clear", String::new())?;
        state.tasks.clear();
        Ok(())
    }

    async fn split_task(
        &self,
        id: &TaskId,
        context: Option<&str>,
    ) -> Result<SplitResponse, ServiceError> {
        let mut state = self.begin("split", id.to_string())?;
        let base = find_mut(&mut state.tasks, id.as_str())
            .ok_or_else(not_found)?
            .title
            .clone();
        let subtasks: Vec<String> = (1..=3)
            .map(|n| match context {
                Some(ctx) => format!("{base} step {n} ({ctx})"),
                None => format!("{base} step {n}"),
            })
            .collect();
        let minted: Vec<TaskNode> = subtasks.iter().map(|t| state.mint(t)).collect();
        if let Some(parent) = find_mut(&mut state.tasks, id.as_str()) {
            parent.children.extend(minted);
        }
        Ok(SplitResponse {
            subtasks,
            reasoning: Some("three even steps".into()),
        })
    }

    async fn generate_notes(&self, id: &TaskId) -> Result<NotesDocument, ServiceError> {
        let mut state = self.begin("notes", id.to_string())?;
        let node = find_mut(&mut state.tasks, id.as_str()).ok_or_else(not_found)?;
        Ok(NotesDocument {
            task_id: Some(node.id.clone()),
            task_title: node.title.clone(),
            notes: format!("## {}\n\n- start small", node.title),
            generated_at: None,
        })
    }

    async fn health(&self) -> Result<HealthStatus, ServiceError> {
        let _state = self.begin("health", String::new())?;
        Ok(HealthStatus {
            message: "Task service is running".into(),
            status: "healthy".into(),
        })
    }
}
