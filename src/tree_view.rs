//! Flattening of the task forest into display rows.
//!
//! Rows come out in pre-order. A node's subtasks are only visited when the node
//! is marked expanded, so a collapsed node contributes exactly one row. The
//! result depends on nothing but the forest and the expansion map.

use std::collections::HashMap;

use crate::task::Task;

pub const EXPANDED: &str = "▼";
pub const COLLAPSED: &str = "▶";
pub const LEAF: &str = "•";
pub const BRANCH: &str = "├─";
pub const LAST_BRANCH: &str = "└─";
pub const GUIDE: &str = "│  ";
pub const GAP: &str = "   ";

/// One visible line of the task tree.
#[derive(Debug, Clone, PartialEq)]
pub struct TreeRow<'a> {
    pub task: &'a Task,
    pub depth: usize,
    pub is_last_sibling: bool,
    /// True when the node has subtasks and they are shown below it.
    pub expanded: bool,
    // One entry per ancestor between the root and the parent: does its guide continue?
    guides: Vec<bool>,
}

impl TreeRow<'_> {
    pub fn id(&self) -> u64 {
        self.task.id
    }

    /// Tree-drawing prefix: ancestor guides, branch glyph and expand marker.
    pub fn prefix(&self) -> String {
        let mut out = String::new();
        for &continues in &self.guides {
            out.push_str(if continues { GUIDE } else { GAP });
        }
        if self.depth > 0 {
            out.push_str(if self.is_last_sibling { LAST_BRANCH } else { BRANCH });
        }
        let marker = if !self.task.has_subtasks() {
            LEAF
        } else if self.expanded {
            EXPANDED
        } else {
            COLLAPSED
        };
        out.push_str(marker);
        out.push(' ');
        out
    }

    /// `"2 subtasks"`, or empty for a leaf.
    pub fn subtask_label(&self) -> String {
        match self.task.subtasks.len() {
            0 => String::new(),
            1 => "1 subtask".to_string(),
            n => format!("{n} subtasks"),
        }
    }
}

/// Flatten the forest into the rows visible under the given expansion map.
pub fn flatten<'a>(forest: &'a [Task], expanded: &HashMap<u64, bool>) -> Vec<TreeRow<'a>> {
    let mut rows = Vec::new();
    let mut guides = Vec::new();
    push_rows(forest, 0, &mut guides, expanded, &mut rows);
    rows
}

fn push_rows<'a>(
    siblings: &'a [Task],
    depth: usize,
    guides: &mut Vec<bool>,
    expanded: &HashMap<u64, bool>,
    rows: &mut Vec<TreeRow<'a>>,
) {
    for (i, task) in siblings.iter().enumerate() {
        let is_last_sibling = i + 1 == siblings.len();
        let open = task.has_subtasks() && expanded.get(&task.id).copied().unwrap_or(false);
        rows.push(TreeRow {
            task,
            depth,
            is_last_sibling,
            expanded: open,
            guides: guides.clone(),
        });
        if open {
            if depth > 0 {
                guides.push(!is_last_sibling);
            }
            push_rows(&task.subtasks, depth + 1, guides, expanded, rows);
            if depth > 0 {
                guides.pop();
            }
        }
    }
}

/// Index of the row showing `id`, if it is visible.
pub fn position_of(rows: &[TreeRow<'_>], id: u64) -> Option<usize> {
    rows.iter().position(|r| r.task.id == id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::count_nodes;
    use crate::task::fixtures::*;
    use crate::tree_state::TreeState;

    fn ids(rows: &[TreeRow<'_>]) -> Vec<u64> {
        rows.iter().map(|r| r.id()).collect()
    }

    #[test]
    fn collapsed_forest_shows_roots_only() {
        let forest = sample_forest();
        let mut state = TreeState::new();
        state.collapse_all();
        let rows = flatten(&forest, &state.expanded);
        assert_eq!(ids(&rows), vec![1, 5]);
        assert!(!rows[0].is_last_sibling);
        assert!(rows[1].is_last_sibling);
    }

    #[test]
    fn expand_all_shows_every_node() {
        let forest = sample_forest();
        let mut state = TreeState::new();
        state.expand_all(&forest);
        let rows = flatten(&forest, &state.expanded);
        assert_eq!(rows.len(), count_nodes(&forest));
        assert_eq!(ids(&rows), vec![1, 2, 4, 3, 5]);
        let depths: Vec<usize> = rows.iter().map(|r| r.depth).collect();
        assert_eq!(depths, vec![0, 1, 2, 1, 0]);
    }

    #[test]
    fn collapsed_child_hides_its_subtree() {
        let forest = sample_forest();
        let mut state = TreeState::new();
        state.toggle_expanded(1);
        let rows = flatten(&forest, &state.expanded);
        assert_eq!(ids(&rows), vec![1, 2, 3, 5]);
        // Expanding a node under a collapsed parent shows nothing new.
        let mut state = TreeState::new();
        state.toggle_expanded(2);
        assert_eq!(ids(&flatten(&forest, &state.expanded)), vec![1, 5]);
    }

    #[test]
    fn glyphs_follow_position() {
        let forest = sample_forest();
        let mut state = TreeState::new();
        state.expand_all(&forest);
        let rows = flatten(&forest, &state.expanded);
        let prefixes: Vec<String> = rows.iter().map(|r| r.prefix()).collect();
        assert_eq!(prefixes, vec!["▼ ", "├─▼ ", "│  └─• ", "└─• ", "• "]);
        assert_eq!(rows[0].subtask_label(), "2 subtasks");
        assert_eq!(rows[1].subtask_label(), "1 subtask");
        assert_eq!(rows[2].subtask_label(), "");

        state.toggle_expanded(1);
        let rows = flatten(&forest, &state.expanded);
        assert_eq!(rows[0].prefix(), "▶ ");
    }

    #[test]
    fn stale_entries_are_harmless() {
        let mut forest = sample_forest();
        let mut state = TreeState::new();
        state.expand_all(&forest);
        state.set_editing(2, true);
        forest[0].subtasks.remove(0);
        let rows = flatten(&forest, &state.expanded);
        assert_eq!(ids(&rows), vec![1, 3, 5]);
        assert!(position_of(&rows, 2).is_none());
        assert_eq!(position_of(&rows, 3), Some(1));
        assert!(rows[1].is_last_sibling);
    }

    #[test]
    fn flattening_is_repeatable() {
        let forest = sample_forest();
        let mut state = TreeState::new();
        state.expand_all(&forest);
        assert_eq!(flatten(&forest, &state.expanded), flatten(&forest, &state.expanded));
    }
}
