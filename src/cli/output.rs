use serde::Serialize;

use crate::model::task::{NotesDocument, SplitResponse, TaskNode};

// ---------------------------------------------------------------------------
// JSON output structs
// ---------------------------------------------------------------------------

#[derive(Serialize)]
pub struct StatusJson {
    pub base_url: String,
    pub reachable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    pub message: String,
}

#[derive(Serialize)]
pub struct SplitJson<'a> {
    pub task_id: &'a str,
    pub subtasks: &'a [String],
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<&'a str>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tasks: Vec<TaskNode>,
}

// ---------------------------------------------------------------------------
// Human-readable formatting
// ---------------------------------------------------------------------------

fn checkbox(completed: bool) -> &'static str {
    if completed { "[x]" } else { "[ ]" }
}

/// Format a single task as a one-line summary
pub fn format_task_line(task: &TaskNode) -> String {
    let title = if task.title.is_empty() {
        "(untitled)"
    } else {
        task.title.as_str()
    };
    format!("{} {}  {}", checkbox(task.completed), title, task.id)
}

/// Format a task with its subtasks, indented
pub fn format_task_tree(task: &TaskNode, indent: usize) -> Vec<String> {
    let mut lines = vec![format!("{}{}", "  ".repeat(indent), format_task_line(task))];
    for child in &task.children {
        lines.extend(format_task_tree(child, indent + 1));
    }
    lines
}

pub fn format_forest(forest: &[TaskNode]) -> Vec<String> {
    if forest.is_empty() {
        return vec!["no tasks".to_string()];
    }
    forest.iter().flat_map(|t| format_task_tree(t, 0)).collect()
}

/// Summary line for `list`: total and completed counts
pub fn format_totals(forest: &[TaskNode]) -> String {
    fn walk(nodes: &[TaskNode], total: &mut usize, done: &mut usize) {
        for n in nodes {
            *total += 1;
            if n.completed {
                *done += 1;
            }
            walk(&n.children, total, done);
        }
    }
    let (mut total, mut done) = (0, 0);
    walk(forest, &mut total, &mut done);
    format!("{} of {} done", done, total)
}

pub fn format_split(response: &SplitResponse) -> Vec<String> {
    let mut lines: Vec<String> = response
        .subtasks
        .iter()
        .map(|s| format!("+ {}", s))
        .collect();
    if let Some(reasoning) = response.reasoning.as_deref().filter(|r| !r.is_empty()) {
        lines.push(String::new());
        lines.push(reasoning.to_string());
    }
    lines
}

pub fn format_notes(doc: &NotesDocument) -> Vec<String> {
    let mut lines = vec![doc.task_title.clone(), "=".repeat(doc.task_title.chars().count().max(3))];
    lines.extend(doc.notes.lines().map(str::to_string));
    if let Some(at) = &doc.generated_at {
        lines.push(String::new());
        lines.push(format!("generated {}", at));
    }
    lines
}
