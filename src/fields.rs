//! Enumerations and field types shared by tasks, manpower records and the CLI.
//!
//! Wire names follow the backend exactly (`"Not Started"`, `"Brick Work"`, ...),
//! while the clap value names stay kebab-case for the command line.

use std::fmt;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Task completion status.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, ValueEnum, PartialEq, Eq, Hash, Default)]
pub enum TaskStatus {
    #[default]
    #[serde(rename = "Not Started")]
    NotStarted,
    #[serde(rename = "In Progress")]
    InProgress,
    #[serde(rename = "Completed")]
    Completed,
    #[serde(rename = "Stuck")]
    Stuck,
}

impl TaskStatus {
    pub const ALL: [TaskStatus; 4] = [
        TaskStatus::NotStarted,
        TaskStatus::InProgress,
        TaskStatus::Completed,
        TaskStatus::Stuck,
    ];

    pub fn label(self) -> &'static str {
        match self {
            TaskStatus::NotStarted => "Not Started",
            TaskStatus::InProgress => "In Progress",
            TaskStatus::Completed => "Completed",
            TaskStatus::Stuck => "Stuck",
        }
    }
}

/// Kind of manpower engaged on a given day.
#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, ValueEnum, PartialEq, Eq, Hash, PartialOrd, Ord, Default,
)]
pub enum ManpowerType {
    #[default]
    Admin,
    Engineer,
    Supervisor,
    Labour,
}

impl ManpowerType {
    pub const ALL: [ManpowerType; 4] = [
        ManpowerType::Admin,
        ManpowerType::Engineer,
        ManpowerType::Supervisor,
        ManpowerType::Labour,
    ];

    pub fn label(self) -> &'static str {
        match self {
            ManpowerType::Admin => "Admin",
            ManpowerType::Engineer => "Engineer",
            ManpowerType::Supervisor => "Supervisor",
            ManpowerType::Labour => "Labour",
        }
    }
}

/// Work category a manpower record is engaged to.
#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, ValueEnum, PartialEq, Eq, Hash, PartialOrd, Ord, Default,
)]
pub enum WorkCategory {
    #[default]
    General,
    #[serde(rename = "Brick Work")]
    BrickWork,
    #[serde(rename = "Structure Work")]
    StructureWork,
    #[serde(rename = "Plaster Work")]
    PlasterWork,
    #[serde(rename = "Electric Work")]
    ElectricWork,
    Painting,
}

impl WorkCategory {
    pub const ALL: [WorkCategory; 6] = [
        WorkCategory::General,
        WorkCategory::BrickWork,
        WorkCategory::StructureWork,
        WorkCategory::PlasterWork,
        WorkCategory::ElectricWork,
        WorkCategory::Painting,
    ];

    pub fn label(self) -> &'static str {
        match self {
            WorkCategory::General => "General",
            WorkCategory::BrickWork => "Brick Work",
            WorkCategory::StructureWork => "Structure Work",
            WorkCategory::PlasterWork => "Plaster Work",
            WorkCategory::ElectricWork => "Electric Work",
            WorkCategory::Painting => "Painting",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl fmt::Display for ManpowerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl fmt::Display for WorkCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Which tasks contribute `est_cost` to the project total.
///
/// `MainTasks` treats a main task's cost as inclusive of its subtasks and
/// ignores subtask costs. `AllTasks` sums every node in the forest.
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq, Default)]
pub enum CostPolicy {
    #[default]
    MainTasks,
    AllTasks,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_names_match_backend() {
        assert_eq!(serde_json::to_string(&TaskStatus::NotStarted).unwrap(), "\"Not Started\"");
        assert_eq!(serde_json::to_string(&WorkCategory::BrickWork).unwrap(), "\"Brick Work\"");
        let s: TaskStatus = serde_json::from_str("\"Stuck\"").unwrap();
        assert_eq!(s, TaskStatus::Stuck);
        let m: ManpowerType = serde_json::from_str("\"Labour\"").unwrap();
        assert_eq!(m, ManpowerType::Labour);
    }

    #[test]
    fn labels_match_wire_names() {
        for s in TaskStatus::ALL {
            assert_eq!(serde_json::to_string(&s).unwrap(), format!("\"{}\"", s.label()));
        }
        for w in WorkCategory::ALL {
            assert_eq!(serde_json::to_string(&w).unwrap(), format!("\"{}\"", w.label()));
        }
    }
}
