//! Per-node UI state for the task tree, keyed by task id.
//!
//! The three maps are independent of the data: reloading the forest keeps them,
//! and entries for ids that no longer exist simply never match a row.

use std::collections::{HashMap, HashSet};

use crate::task::{ids_with_subtasks, walk, Task};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TreeState {
    pub expanded: HashMap<u64, bool>,
    pub editing: HashMap<u64, bool>,
    pub adding_subtask: HashMap<u64, bool>,
}

impl TreeState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_expanded(&self, id: u64) -> bool {
        self.expanded.get(&id).copied().unwrap_or(false)
    }

    pub fn is_editing(&self, id: u64) -> bool {
        self.editing.get(&id).copied().unwrap_or(false)
    }

    pub fn is_adding_subtask(&self, id: u64) -> bool {
        self.adding_subtask.get(&id).copied().unwrap_or(false)
    }

    pub fn toggle_expanded(&mut self, id: u64) {
        toggle(&mut self.expanded, id);
    }

    pub fn toggle_editing(&mut self, id: u64) {
        toggle(&mut self.editing, id);
    }

    pub fn toggle_adding_subtask(&mut self, id: u64) {
        toggle(&mut self.adding_subtask, id);
    }

    pub fn set_expanded(&mut self, id: u64, value: bool) {
        self.expanded.insert(id, value);
    }

    pub fn set_editing(&mut self, id: u64, value: bool) {
        self.editing.insert(id, value);
    }

    pub fn set_adding_subtask(&mut self, id: u64, value: bool) {
        self.adding_subtask.insert(id, value);
    }

    /// Replace the expansion map with every id that has at least one subtask.
    pub fn expand_all(&mut self, forest: &[Task]) {
        self.expanded = ids_with_subtasks(forest).into_iter().map(|id| (id, true)).collect();
    }

    pub fn collapse_all(&mut self) {
        self.expanded.clear();
    }

    /// Drop entries whose id is no longer in the forest.
    ///
    /// Not needed for correct rendering; keeps long sessions from accumulating
    /// stale keys.
    pub fn prune(&mut self, forest: &[Task]) {
        let live: HashSet<u64> = walk(forest).map(|t| t.id).collect();
        for map in [&mut self.expanded, &mut self.editing, &mut self.adding_subtask] {
            map.retain(|id, _| live.contains(id));
        }
    }
}

fn toggle(map: &mut HashMap<u64, bool>, id: u64) {
    let entry = map.entry(id).or_insert(false);
    *entry = !*entry;
}
