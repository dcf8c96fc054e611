//! Enumerations for TUI state management.

use crate::task::{ManpowerDraft, TaskDraft};

/// What the dashboard is currently showing or waiting on.
#[derive(Clone, Copy, PartialEq, Debug)]
pub enum AppState {
    Login,
    Browse,
    TaskForm,
    ManpowerForm,
    Help,
    Confirm,
}

/// Top-level pages, cycled with Tab.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Page {
    Overview,
    Tasks,
    Manpower,
}

impl Page {
    pub const ALL: [Page; 3] = [Page::Overview, Page::Tasks, Page::Manpower];

    pub fn title(self) -> &'static str {
        match self {
            Page::Overview => "Overview",
            Page::Tasks => "Tasks",
            Page::Manpower => "Manpower",
        }
    }

    pub fn next(self) -> Page {
        match self {
            Page::Overview => Page::Tasks,
            Page::Tasks => Page::Manpower,
            Page::Manpower => Page::Overview,
        }
    }

    pub fn index(self) -> usize {
        match self {
            Page::Overview => 0,
            Page::Tasks => 1,
            Page::Manpower => 2,
        }
    }
}

/// What a task form submits as.
#[derive(Clone, PartialEq, Debug)]
pub enum TaskFormMode {
    Add,
    AddSubtask { parent_id: u64, parent_name: String },
    Edit { id: u64 },
}

/// What a confirmed dialog deletes.
#[derive(Clone, PartialEq, Debug)]
pub enum PendingDelete {
    Task { id: u64, name: String, subtasks: usize },
    Manpower { id: u64, label: String },
}

/// A network call queued for the next loop turn, after "Loading..." is drawn.
#[derive(Clone, PartialEq, Debug)]
pub enum Job {
    Login,
    Reload,
    SaveTask(TaskDraft),
    SaveManpower(ManpowerDraft),
    Delete(PendingDelete),
}
