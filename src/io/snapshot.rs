use std::fs;
use std::path::{Path, PathBuf};

use chrono::{NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::task::{TaskNode, timestamp};

/// Error type for snapshot cache writes
#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    #[error("could not write {path}: {source}")]
    WriteError {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("could not serialize snapshot: {0}")]
    SerializeError(#[from] serde_json::Error),
}

/// Last forest fetched from the task service, kept on disk for `sw list --cached`.
/// Never authoritative and never merged back into a live tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(with = "timestamp")]
    pub saved_at: NaiveDateTime,
    #[serde(default)]
    pub tasks: Vec<TaskNode>,
}

/// Read the snapshot. Missing or unreadable files yield None.
pub fn read_snapshot(path: &Path) -> Option<Snapshot> {
    let content = fs::read_to_string(path).ok()?;
    serde_json::from_str(&content).ok()
}

/// Overwrite the snapshot with `tasks`, stamped with the current time
pub fn write_snapshot(path: &Path, tasks: &[TaskNode]) -> Result<(), SnapshotError> {
    let snapshot = Snapshot {
        saved_at: Utc::now().naive_utc(),
        tasks: tasks.to_vec(),
    };
    let content = serde_json::to_string_pretty(&snapshot)?;
    fs::write(path, content).map_err(|e| SnapshotError::WriteError {
        path: path.to_path_buf(),
        source: e,
    })
}

/// Remove the snapshot. A missing file is not an error.
pub fn clear_snapshot(path: &Path) -> Result<(), SnapshotError> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(SnapshotError::WriteError {
            path: path.to_path_buf(),
            source: e,
        }),
    }
}
