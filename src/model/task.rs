use std::borrow::Borrow;
use std::fmt;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Identifier assigned to a task by the task service (or generated locally
/// in degraded mode).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(String);

impl TaskId {
    pub fn new(id: impl Into<String>) -> Self {
        TaskId(id.into())
    }

    /// A client-side identifier for tasks the server has never seen.
    pub fn generate_local() -> Self {
        TaskId(uuid::Uuid::new_v4().simple().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for TaskId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for TaskId {
    fn from(s: &str) -> Self {
        TaskId(s.to_string())
    }
}

impl From<String> for TaskId {
    fn from(s: String) -> Self {
        TaskId(s)
    }
}

/// A task as it travels over the wire: a nested record with its children
/// in display order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskNode {
    pub id: TaskId,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub completed: bool,
    #[serde(with = "timestamp")]
    pub created_at: NaiveDateTime,
    /// Subtasks (recursive)
    #[serde(default)]
    pub children: Vec<TaskNode>,
}

impl TaskNode {
    /// Create a childless, incomplete task stamped with the current time
    pub fn new(id: TaskId, title: impl Into<String>) -> Self {
        TaskNode {
            id,
            title: title.into(),
            completed: false,
            created_at: chrono::Utc::now().naive_utc(),
            children: Vec::new(),
        }
    }

    /// Total number of nodes in this subtree, including self
    pub fn count(&self) -> usize {
        1 + self.children.iter().map(TaskNode::count).sum::<usize>()
    }
}

/// Partial update sent to the task service. Absent fields are left alone.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed: Option<bool>,
    /// Transport-only: tells the server whether a client is editing the task.
    #[serde(
        default,
        rename = "isEditing",
        skip_serializing_if = "Option::is_none"
    )]
    pub is_editing: Option<bool>,
}

impl TaskPatch {
    pub fn title(title: impl Into<String>) -> Self {
        TaskPatch {
            title: Some(title.into()),
            ..Default::default()
        }
    }

    pub fn completed(value: bool) -> Self {
        TaskPatch {
            completed: Some(value),
            ..Default::default()
        }
    }

    pub fn editing(value: bool) -> Self {
        TaskPatch {
            is_editing: Some(value),
            ..Default::default()
        }
    }
}

/// Body of a create request
#[derive(Debug, Clone, Serialize)]
pub struct NewTask<'a> {
    pub title: &'a str,
    pub parent_id: Option<&'a TaskId>,
}

/// Result of asking the service to split a task into subtasks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SplitResponse {
    /// Titles of the subtasks the service appended
    #[serde(default)]
    pub subtasks: Vec<String>,
    #[serde(default)]
    pub reasoning: Option<String>,
}

/// Generated guidance for a single task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotesDocument {
    #[serde(default)]
    pub task_id: Option<TaskId>,
    pub task_title: String,
    pub notes: String,
    #[serde(default)]
    pub generated_at: Option<String>,
}

/// Response of the service's health endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthStatus {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub status: String,
}

/// ISO-8601 timestamps. The service emits naive local times
/// (`2025-05-14T09:30:00.123456`); locally generated tasks carry RFC 3339
/// with an offset. Both are accepted; naive form is emitted.
pub mod timestamp {
    use chrono::{DateTime, NaiveDateTime};
    use serde::{Deserialize, Deserializer, Serializer};

    const FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

    pub fn serialize<S: Serializer>(value: &NaiveDateTime, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&value.format(FORMAT).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<NaiveDateTime, D::Error> {
        let raw = String::deserialize(d)?;
        parse(&raw).ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp: {raw}")))
    }

    pub fn parse(raw: &str) -> Option<NaiveDateTime> {
        if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
            return Some(dt.naive_utc());
        }
        NaiveDateTime::parse_from_str(raw, FORMAT).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn deserialize_service_record() {
        let json = r#"{
            "id": "a1",
            "title": "Write report",
            "completed": false,
            "created_at": "2025-05-14T09:30:00.123456",
            "children": [
                {"id": "b2", "title": "Outline", "completed": true,
                 "created_at": "2025-05-14T09:31:00", "children": []}
            ]
        }"#;
        let node: TaskNode = serde_json::from_str(json).unwrap();
        assert_eq!(node.id.as_str(), "a1");
        assert_eq!(node.children.len(), 1);
        assert!(node.children[0].completed);
        assert_eq!(node.count(), 2);
    }

    #[test]
    fn rfc3339_timestamp_is_accepted() {
        let parsed = timestamp::parse("2025-05-14T09:30:00.000Z").unwrap();
        assert_eq!(parsed.format("%H:%M").to_string(), "09:30");
    }

    #[test]
    fn garbage_timestamp_is_rejected() {
        let json = r#"{"id":"x","title":"","created_at":"yesterday"}"#;
        assert!(serde_json::from_str::<TaskNode>(json).is_err());
    }

    #[test]
    fn missing_children_default_to_empty() {
        let json = r#"{"id":"x","title":"t","created_at":"2025-01-01T00:00:00"}"#;
        let node: TaskNode = serde_json::from_str(json).unwrap();
        assert!(node.children.is_empty());
        assert!(!node.completed);
    }

    #[test]
    fn patch_serializes_only_present_fields() {
        let patch = TaskPatch::editing(true);
        assert_eq!(serde_json::to_string(&patch).unwrap(), r#"{"isEditing":true}"#);

        let patch = TaskPatch {
            title: Some("Buy milk".into()),
            completed: Some(false),
            is_editing: None,
        };
        assert_eq!(
            serde_json::to_string(&patch).unwrap(),
            r#"{"title":"Buy milk","completed":false}"#
        );
    }

    #[test]
    fn new_task_body_carries_null_parent() {
        let body = NewTask {
            title: "",
            parent_id: None,
        };
        assert_eq!(
            serde_json::to_string(&body).unwrap(),
            r#"{"title":"","parent_id":null}"#
        );
    }

    #[test]
    fn local_ids_are_unique() {
        assert_ne!(TaskId::generate_local(), TaskId::generate_local());
    }
}
