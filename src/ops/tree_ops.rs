use chrono::NaiveDateTime;
use indexmap::IndexMap;

use crate::model::task::{TaskId, TaskNode, TaskPatch};

/// Error type for tree operations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TreeError {
    #[error("task not found: {0}")]
    NotFound(TaskId),
    #[error("duplicate task id: {0}")]
    DuplicateId(TaskId),
    #[error("malformed task data: {0}")]
    Malformed(String),
}

/// One task as stored in the arena. Children are referenced by id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskEntry {
    pub id: TaskId,
    pub title: String,
    pub completed: bool,
    pub created_at: NaiveDateTime,
    pub parent: Option<TaskId>,
    pub children: Vec<TaskId>,
}

/// A row of the flattened forest, in display order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VisibleRow {
    pub id: TaskId,
    pub depth: usize,
    pub is_last_sibling: bool,
    /// For building tree continuation lines: whether each ancestor is the last sibling
    pub ancestor_last: Vec<bool>,
}

/// The task forest, held as an index arena: every node is reachable by id in
/// O(1), parents and children are linked by id, and root order is kept
/// separately. Each node has exactly one parent slot, so no node can appear
/// under two parents.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskTree {
    entries: IndexMap<TaskId, TaskEntry>,
    roots: Vec<TaskId>,
}

impl TaskTree {
    pub fn new() -> Self {
        Self::default()
    }

    // -----------------------------------------------------------------------
    // Construction and wire round-trip
    // -----------------------------------------------------------------------

    /// Build a tree from a nested forest. Fails if an id occurs twice.
    pub fn from_forest(forest: Vec<TaskNode>) -> Result<Self, TreeError> {
        let mut tree = TaskTree::new();
        for node in forest {
            tree.append(node, None)?;
        }
        Ok(tree)
    }

    /// Rebuild the nested forest, preserving child order.
    pub fn to_forest(&self) -> Vec<TaskNode> {
        self.roots
            .iter()
            .filter_map(|id| self.subtree(id.as_str()))
            .collect()
    }

    pub fn to_json(&self) -> Result<String, TreeError> {
        serde_json::to_string(&self.to_forest()).map_err(|e| TreeError::Malformed(e.to_string()))
    }

    pub fn from_json(json: &str) -> Result<Self, TreeError> {
        let forest: Vec<TaskNode> =
            serde_json::from_str(json).map_err(|e| TreeError::Malformed(e.to_string()))?;
        Self::from_forest(forest)
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    pub fn roots(&self) -> &[TaskId] {
        &self.roots
    }

    pub fn find(&self, id: &str) -> Option<&TaskEntry> {
        self.entries.get(id)
    }

    /// Materialize the subtree rooted at `id` as a nested record.
    pub fn subtree(&self, id: &str) -> Option<TaskNode> {
        let entry = self.entries.get(id)?;
        Some(TaskNode {
            id: entry.id.clone(),
            title: entry.title.clone(),
            completed: entry.completed,
            created_at: entry.created_at,
            children: entry
                .children
                .iter()
                .filter_map(|child| self.subtree(child.as_str()))
                .collect(),
        })
    }

    /// Ids of `id` and all of its descendants, parent before children.
    pub fn subtree_ids(&self, id: &str) -> Result<Vec<TaskId>, TreeError> {
        let root = self
            .entries
            .get(id)
            .ok_or_else(|| TreeError::NotFound(TaskId::from(id)))?;
        let mut out = Vec::new();
        let mut stack = vec![root.id.clone()];
        while let Some(next) = stack.pop() {
            if let Some(entry) = self.entries.get(&next) {
                stack.extend(entry.children.iter().rev().cloned());
            }
            out.push(next);
        }
        Ok(out)
    }

    /// Every id in display order: depth-first, parents before children.
    pub fn iter_depth_first(&self) -> impl Iterator<Item = &TaskId> + '_ {
        let mut stack: Vec<&TaskId> = self.roots.iter().rev().collect();
        std::iter::from_fn(move || {
            let next = stack.pop()?;
            if let Some(entry) = self.entries.get(next) {
                stack.extend(entry.children.iter().rev());
            }
            Some(next)
        })
    }

    /// Flatten the whole forest in display (depth-first, insertion) order.
    pub fn visible_rows(&self) -> Vec<VisibleRow> {
        let mut rows = Vec::with_capacity(self.entries.len());
        self.flatten_into(&self.roots, 0, &[], &mut rows);
        rows
    }

    fn flatten_into(
        &self,
        ids: &[TaskId],
        depth: usize,
        ancestor_last: &[bool],
        rows: &mut Vec<VisibleRow>,
    ) {
        let count = ids.len();
        for (i, id) in ids.iter().enumerate() {
            let Some(entry) = self.entries.get(id) else {
                continue;
            };
            let is_last = i + 1 == count;
            rows.push(VisibleRow {
                id: id.clone(),
                depth,
                is_last_sibling: is_last,
                ancestor_last: ancestor_last.to_vec(),
            });
            if !entry.children.is_empty() {
                let mut next_ancestors = ancestor_last.to_vec();
                next_ancestors.push(is_last);
                self.flatten_into(&entry.children, depth + 1, &next_ancestors, rows);
            }
        }
    }

    // -----------------------------------------------------------------------
    // Mutations
    // -----------------------------------------------------------------------

    /// Overwrite the node's fields that the patch carries. The editing flag
    /// is not a node field and is ignored here.
    pub fn replace(&mut self, id: &str, patch: &TaskPatch) -> Result<&TaskEntry, TreeError> {
        let entry = self
            .entries
            .get_mut(id)
            .ok_or_else(|| TreeError::NotFound(TaskId::from(id)))?;
        if let Some(title) = &patch.title {
            entry.title = title.clone();
        }
        if let Some(completed) = patch.completed {
            entry.completed = completed;
        }
        Ok(entry)
    }

    /// Set `completed` on the node and every descendant, overriding whatever
    /// they held. Ancestors and siblings are untouched. Returns the ids that
    /// were written.
    pub fn cascade_complete(&mut self, id: &str, value: bool) -> Result<Vec<TaskId>, TreeError> {
        let ids = self.subtree_ids(id)?;
        for touched in &ids {
            if let Some(entry) = self.entries.get_mut(touched) {
                entry.completed = value;
            }
        }
        Ok(ids)
    }

    /// Detach the node and its whole subtree, returning it as a nested record.
    pub fn remove(&mut self, id: &str) -> Result<TaskNode, TreeError> {
        let removed = self
            .subtree(id)
            .ok_or_else(|| TreeError::NotFound(TaskId::from(id)))?;
        let parent = self.entries.get(id).and_then(|e| e.parent.clone());
        let siblings = match parent {
            Some(p) => self.entries.get_mut(&p).map(|e| &mut e.children),
            None => Some(&mut self.roots),
        };
        if let Some(siblings) = siblings {
            siblings.retain(|c| c.as_str() != id);
        }
        for gone in self.subtree_ids(id)? {
            self.entries.shift_remove(&gone);
        }
        Ok(removed)
    }

    /// Insert a whole subtree as the last root (`parent = None`) or as the
    /// last child of `parent`. Nothing is inserted if any id collides.
    pub fn append(&mut self, node: TaskNode, parent: Option<&TaskId>) -> Result<(), TreeError> {
        if let Some(p) = parent
            && !self.entries.contains_key(p)
        {
            return Err(TreeError::NotFound(p.clone()));
        }
        let mut seen = std::collections::HashSet::new();
        check_unique(&node, &self.entries, &mut seen)?;

        let id = node.id.clone();
        self.insert_subtree(node, parent.cloned());
        match parent {
            Some(p) => {
                if let Some(parent_entry) = self.entries.get_mut(p) {
                    parent_entry.children.push(id);
                }
            }
            None => self.roots.push(id),
        }
        Ok(())
    }

    fn insert_subtree(&mut self, node: TaskNode, parent: Option<TaskId>) {
        let TaskNode {
            id,
            title,
            completed,
            created_at,
            children,
        } = node;
        let child_ids = children.iter().map(|c| c.id.clone()).collect();
        self.entries.insert(
            id.clone(),
            TaskEntry {
                id: id.clone(),
                title,
                completed,
                created_at,
                parent,
                children: child_ids,
            },
        );
        for child in children {
            self.insert_subtree(child, Some(id.clone()));
        }
    }

    /// Fold a server record into the local node: scalar fields are taken
    /// from the server, the child list stays as the local tree has it.
    pub fn merge_remote(&mut self, remote: &TaskNode) -> Result<(), TreeError> {
        let entry = self
            .entries
            .get_mut(&remote.id)
            .ok_or_else(|| TreeError::NotFound(remote.id.clone()))?;
        entry.title = remote.title.clone();
        entry.completed = remote.completed;
        entry.created_at = remote.created_at;
        Ok(())
    }
}

fn check_unique(
    node: &TaskNode,
    existing: &IndexMap<TaskId, TaskEntry>,
    seen: &mut std::collections::HashSet<TaskId>,
) -> Result<(), TreeError> {
    if existing.contains_key(&node.id) || !seen.insert(node.id.clone()) {
        return Err(TreeError::DuplicateId(node.id.clone()));
    }
    for child in &node.children {
        check_unique(child, existing, seen)?;
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn at(min: u32) -> NaiveDateTime {
        chrono::NaiveDate::from_ymd_opt(2025, 5, 14)
            .unwrap()
            .and_hms_opt(9, min, 0)
            .unwrap()
    }

    fn node(id: &str, title: &str, children: Vec<TaskNode>) -> TaskNode {
        TaskNode {
            id: id.into(),
            title: title.into(),
            completed: false,
            created_at: at(0),
            children,
        }
    }

    /// A: [A1: [A1a], A2], B
    fn sample_tree() -> TaskTree {
        TaskTree::from_forest(vec![
            node(
                "A",
                "Plan trip",
                vec![
                    node("A1", "Book flights", vec![node("A1a", "Compare fares", vec![])]),
                    node("A2", "Reserve hotel", vec![]),
                ],
            ),
            node("B", "Water plants", vec![]),
        ])
        .unwrap()
    }

    #[test]
    fn find_reaches_nested_nodes() {
        let tree = sample_tree();
        assert_eq!(tree.len(), 5);
        assert_eq!(tree.find("A1a").unwrap().title, "Compare fares");
        assert_eq!(tree.find("A1a").unwrap().parent, Some(TaskId::from("A1")));
        assert!(tree.find("missing").is_none());
    }

    #[test]
    fn replace_patches_only_target() {
        let mut tree = sample_tree();
        let before = tree.clone();
        tree.replace("A1", &TaskPatch::title("Book trains")).unwrap();

        assert_eq!(tree.find("A1").unwrap().title, "Book trains");
        for id in ["A", "A1a", "A2", "B"] {
            assert_eq!(tree.find(id), before.find(id));
        }
    }

    #[test]
    fn replace_absent_is_not_found() {
        let mut tree = sample_tree();
        let err = tree.replace("zzz", &TaskPatch::completed(true)).unwrap_err();
        assert_eq!(err, TreeError::NotFound("zzz".into()));
    }

    #[test]
    fn replace_ignores_editing_flag() {
        let mut tree = sample_tree();
        let before = tree.clone();
        tree.replace("A", &TaskPatch::editing(true)).unwrap();
        assert_eq!(tree, before);
    }

    #[test]
    fn cascade_sets_whole_subtree() {
        let mut tree = sample_tree();
        let touched = tree.cascade_complete("A", true).unwrap();
        assert_eq!(touched.len(), 4);
        for id in ["A", "A1", "A1a", "A2"] {
            assert!(tree.find(id).unwrap().completed, "{id} should be complete");
        }
        assert!(!tree.find("B").unwrap().completed);
    }

    #[test]
    fn cascade_leaves_ancestors_and_siblings() {
        let mut tree = sample_tree();
        tree.cascade_complete("A1", true).unwrap();
        assert!(tree.find("A1").unwrap().completed);
        assert!(tree.find("A1a").unwrap().completed);
        assert!(!tree.find("A").unwrap().completed);
        assert!(!tree.find("A2").unwrap().completed);
    }

    #[test]
    fn cascade_overrides_prior_values_both_ways() {
        let mut tree = sample_tree();
        tree.replace("A2", &TaskPatch::completed(true)).unwrap();
        tree.cascade_complete("A", false).unwrap();
        assert!(!tree.find("A2").unwrap().completed);

        tree.cascade_complete("A", true).unwrap();
        tree.cascade_complete("A", false).unwrap();
        for id in ["A", "A1", "A1a", "A2"] {
            assert!(!tree.find(id).unwrap().completed);
        }
    }

    #[test]
    fn cascade_on_leaf_is_single_update() {
        let mut tree = sample_tree();
        let touched = tree.cascade_complete("B", true).unwrap();
        assert_eq!(touched, vec![TaskId::from("B")]);
    }

    #[test]
    fn remove_drops_subtree_and_keeps_order() {
        let mut tree = sample_tree();
        let removed = tree.remove("A1").unwrap();
        assert_eq!(removed.count(), 2);
        assert!(tree.find("A1a").is_none());
        assert_eq!(tree.find("A").unwrap().children, vec![TaskId::from("A2")]);
        assert_eq!(tree.len(), 3);
    }

    #[test]
    fn remove_root() {
        let mut tree = sample_tree();
        tree.remove("A").unwrap();
        assert_eq!(tree.roots(), &[TaskId::from("B")]);
        assert_eq!(tree.len(), 1);
    }

    #[test]
    fn remove_absent_is_not_found() {
        let mut tree = sample_tree();
        assert!(matches!(tree.remove("nope"), Err(TreeError::NotFound(_))));
        assert_eq!(tree.len(), 5);
    }

    #[test]
    fn append_child_goes_last() {
        let mut tree = sample_tree();
        tree.append(node("A3", "Pack", vec![]), Some(&"A".into()))
            .unwrap();
        let children = &tree.find("A").unwrap().children;
        assert_eq!(children.last(), Some(&TaskId::from("A3")));
        assert_eq!(tree.find("A3").unwrap().parent, Some(TaskId::from("A")));
    }

    #[test]
    fn append_rejects_duplicate_without_partial_insert() {
        let mut tree = sample_tree();
        let clash = node("C", "New", vec![node("A2", "dup", vec![])]);
        assert_eq!(
            tree.append(clash, None),
            Err(TreeError::DuplicateId("A2".into()))
        );
        assert!(tree.find("C").is_none());
    }

    #[test]
    fn append_to_missing_parent_fails() {
        let mut tree = sample_tree();
        let err = tree
            .append(node("C", "", vec![]), Some(&"ghost".into()))
            .unwrap_err();
        assert_eq!(err, TreeError::NotFound("ghost".into()));
    }

    #[test]
    fn from_forest_rejects_duplicate_ids() {
        let forest = vec![node("X", "", vec![]), node("Y", "", vec![node("X", "", vec![])])];
        assert!(matches!(
            TaskTree::from_forest(forest),
            Err(TreeError::DuplicateId(_))
        ));
    }

    #[test]
    fn merge_remote_keeps_children() {
        let mut tree = sample_tree();
        let mut remote = node("A", "Plan holiday", vec![]);
        remote.completed = true;
        remote.created_at = at(5);
        tree.merge_remote(&remote).unwrap();

        let a = tree.find("A").unwrap();
        assert_eq!(a.title, "Plan holiday");
        assert!(a.completed);
        assert_eq!(a.created_at, at(5));
        assert_eq!(a.children.len(), 2);
    }

    #[test]
    fn json_round_trip_preserves_everything() {
        let mut tree = sample_tree();
        tree.replace("A1a", &TaskPatch::completed(true)).unwrap();
        let json = tree.to_json().unwrap();
        let back = TaskTree::from_json(&json).unwrap();
        assert_eq!(back.to_forest(), tree.to_forest());
    }

    #[test]
    fn visible_rows_are_depth_first() {
        let tree = sample_tree();
        let rows: Vec<(String, usize)> = tree
            .visible_rows()
            .into_iter()
            .map(|r| (r.id.to_string(), r.depth))
            .collect();
        assert_eq!(
            rows,
            vec![
                ("A".to_string(), 0),
                ("A1".to_string(), 1),
                ("A1a".to_string(), 2),
                ("A2".to_string(), 1),
                ("B".to_string(), 0),
            ]
        );
    }

    #[test]
    fn depth_first_ids_match_rows() {
        let tree = sample_tree();
        let ids: Vec<&str> = tree.iter_depth_first().map(TaskId::as_str).collect();
        assert_eq!(ids, vec!["A", "A1", "A1a", "A2", "B"]);
        assert_eq!(TaskTree::new().iter_depth_first().count(), 0);
    }

    #[test]
    fn visible_rows_track_last_siblings() {
        let tree = sample_tree();
        let rows = tree.visible_rows();
        let a1a = rows.iter().find(|r| r.id.as_str() == "A1a").unwrap();
        assert!(a1a.is_last_sibling);
        assert_eq!(a1a.ancestor_last, vec![false, false]);
        let a2 = rows.iter().find(|r| r.id.as_str() == "A2").unwrap();
        assert!(a2.is_last_sibling);
    }
}
