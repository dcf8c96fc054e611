//! Task and manpower data structures.
//!
//! This module defines the `Task` tree node as delivered by the backend (with its
//! subtasks nested inline), the flat `Manpower` record, the partial payloads used
//! for create and update calls, and the forest helpers the aggregator and the
//! tree view walk over.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::fields::*;

/// A node of the task forest.
///
/// `parent_task_id == None` marks a main task. Subtasks are owned by their parent
/// and keep the order the backend delivered them in.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Task {
    pub id: u64,
    #[serde(default)]
    pub parent_task_id: Option<u64>,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub status: TaskStatus,
    #[serde(default)]
    pub owner: Option<String>,
    #[serde(with = "wire_time")]
    pub start_time: NaiveDateTime,
    #[serde(with = "wire_time")]
    pub due_time: NaiveDateTime,
    #[serde(default)]
    pub est_duration: u32,
    #[serde(default)]
    pub est_cost: f64,
    #[serde(default)]
    pub total_job: u32,
    #[serde(default)]
    pub completed: u32,
    #[serde(default)]
    pub stuck: u32,
    #[serde(default, with = "wire_time::option")]
    pub created_at: Option<NaiveDateTime>,
    #[serde(default, with = "wire_time::option")]
    pub updated_at: Option<NaiveDateTime>,
    #[serde(default)]
    pub subtasks: Vec<Task>,
}

impl Task {
    pub fn is_main(&self) -> bool {
        self.parent_task_id.is_none()
    }

    pub fn has_subtasks(&self) -> bool {
        !self.subtasks.is_empty()
    }

    /// `total_job - completed - stuck`, unclamped.
    pub fn remaining(&self) -> i64 {
        i64::from(self.total_job) - i64::from(self.completed) - i64::from(self.stuck)
    }
}

/// A manpower engagement record. No relationship to tasks.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Manpower {
    pub id: u64,
    #[serde(with = "wire_time")]
    pub date: NaiveDateTime,
    pub manpower_type: ManpowerType,
    pub engaged_to: WorkCategory,
    #[serde(default = "default_headcount")]
    pub number_of_manpower: u32,
    #[serde(default)]
    pub perday_cost: Option<f64>,
    #[serde(default, with = "wire_time::option")]
    pub created_at: Option<NaiveDateTime>,
    #[serde(default, with = "wire_time::option")]
    pub updated_at: Option<NaiveDateTime>,
}

impl Manpower {
    /// Head count used for every aggregate; zero is read as one.
    pub fn headcount(&self) -> u32 {
        if self.number_of_manpower == 0 {
            1
        } else {
            self.number_of_manpower
        }
    }
}

fn default_headcount() -> u32 {
    1
}

/// Partial task payload for `POST /api/tasks/` and `PUT /api/tasks/{id}`.
///
/// Absent fields are left out of the JSON body so an update only touches what
/// was set. Dates are written as midnight timestamps.
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct TaskDraft {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<TaskStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", serialize_with = "wire_time::midnight")]
    pub start_time: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none", serialize_with = "wire_time::midnight")]
    pub due_time: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub est_duration: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub est_cost: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_job: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stuck: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_task_id: Option<u64>,
}

impl TaskDraft {
    /// Stamp the draft as a subtask of `parent_id`.
    pub fn under(mut self, parent_id: u64) -> Self {
        self.parent_task_id = Some(parent_id);
        self
    }

    /// Reject `completed + stuck > total_job`. Fields the draft leaves unset are
    /// taken from `base`, the task being edited.
    pub fn check_job_counts(&self, base: Option<&Task>) -> Result<(), String> {
        let total = self.total_job.or(base.map(|t| t.total_job)).unwrap_or(0);
        let completed = self.completed.or(base.map(|t| t.completed)).unwrap_or(0);
        let stuck = self.stuck.or(base.map(|t| t.stuck)).unwrap_or(0);
        if u64::from(completed) + u64::from(stuck) > u64::from(total) {
            return Err(format!(
                "Completed ({completed}) plus stuck ({stuck}) exceeds total job ({total})"
            ));
        }
        Ok(())
    }
}

impl ManpowerDraft {
    pub fn check_headcount(&self) -> Result<(), String> {
        match self.number_of_manpower {
            Some(0) => Err("Number of manpower must be at least 1".to_string()),
            _ => Ok(()),
        }
    }
}

/// Costs are stored as whole currency units by the backend.
pub fn check_amount(value: f64, label: &str) -> Result<f64, String> {
    if value >= 0.0 && value.fract() == 0.0 {
        Ok(value)
    } else {
        Err(format!("{label} must be a whole amount of 0 or more"))
    }
}

/// Partial manpower payload for create and update calls.
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct ManpowerDraft {
    #[serde(skip_serializing_if = "Option::is_none", serialize_with = "wire_time::midnight")]
    pub date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub manpower_type: Option<ManpowerType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub engaged_to: Option<WorkCategory>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub number_of_manpower: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub perday_cost: Option<f64>,
}

/// Pre-order iterator over every node of a forest.
pub struct Walk<'a> {
    stack: Vec<&'a Task>,
}

impl<'a> Iterator for Walk<'a> {
    type Item = &'a Task;

    fn next(&mut self) -> Option<&'a Task> {
        let task = self.stack.pop()?;
        self.stack.extend(task.subtasks.iter().rev());
        Some(task)
    }
}

/// Walk every node of the forest, parents before children, siblings in order.
pub fn walk(forest: &[Task]) -> Walk<'_> {
    Walk { stack: forest.iter().rev().collect() }
}

/// Total number of nodes, nested subtasks included.
pub fn count_nodes(forest: &[Task]) -> usize {
    walk(forest).count()
}

/// Ids of every node that has at least one subtask.
pub fn ids_with_subtasks(forest: &[Task]) -> Vec<u64> {
    walk(forest).filter(|t| t.has_subtasks()).map(|t| t.id).collect()
}

/// Find a task anywhere in the forest.
pub fn find_task(forest: &[Task], id: u64) -> Option<&Task> {
    walk(forest).find(|t| t.id == id)
}

/// Build a nested forest from a flat list linked by `parent_task_id`.
///
/// Siblings keep their input order. A task whose parent is absent from the list
/// becomes a root. Cycles are broken with a visited set: the first node of a
/// cycle (in input order) is emitted as a root and every node appears exactly once.
pub fn assemble_forest(flat: Vec<Task>) -> Vec<Task> {
    let mut slots: Vec<Option<Task>> = Vec::with_capacity(flat.len());
    let mut position: HashMap<u64, usize> = HashMap::new();
    for mut task in flat {
        // Any inline subtasks are folded into the flat list first.
        let nested = std::mem::take(&mut task.subtasks);
        position.entry(task.id).or_insert(slots.len());
        slots.push(Some(task));
        for child in walk(&nested) {
            let mut child = child.clone();
            child.subtasks.clear();
            position.entry(child.id).or_insert(slots.len());
            slots.push(Some(child));
        }
    }

    let mut children: HashMap<u64, Vec<usize>> = HashMap::new();
    let mut roots = Vec::new();
    for (idx, slot) in slots.iter().enumerate() {
        let Some(task) = slot else { continue };
        if position.get(&task.id) != Some(&idx) {
            // Duplicate id: the first occurrence wins.
            continue;
        }
        match task.parent_task_id {
            Some(pid) if pid != task.id && position.contains_key(&pid) => {
                children.entry(pid).or_default().push(idx)
            }
            _ => roots.push(idx),
        }
    }

    let mut visited = HashSet::new();
    let mut forest = Vec::new();
    for idx in roots {
        if let Some(task) = build_node(idx, &mut slots, &children, &mut visited) {
            forest.push(task);
        }
    }
    // Whatever is left sits on a parent cycle.
    for idx in 0..slots.len() {
        let unvisited = slots[idx]
            .as_ref()
            .is_some_and(|t| position.get(&t.id) == Some(&idx) && !visited.contains(&t.id));
        if unvisited {
            if let Some(task) = build_node(idx, &mut slots, &children, &mut visited) {
                forest.push(task);
            }
        }
    }
    forest
}

fn build_node(
    idx: usize,
    slots: &mut [Option<Task>],
    children: &HashMap<u64, Vec<usize>>,
    visited: &mut HashSet<u64>,
) -> Option<Task> {
    let mut task = slots.get_mut(idx)?.take()?;
    if !visited.insert(task.id) {
        return None;
    }
    if let Some(kids) = children.get(&task.id) {
        for &child in kids {
            if let Some(sub) = build_node(child, slots, children, visited) {
                task.subtasks.push(sub);
            }
        }
    }
    Some(task)
}

/// Timestamp (de)serialization for the backend's datetime fields.
///
/// Accepts `YYYY-MM-DDTHH:MM:SS[.f]`, RFC 3339 with an offset, or a bare date.
/// Writes `YYYY-MM-DDTHH:MM:SS`.
pub mod wire_time {
    use super::*;

    const FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

    pub fn parse(s: &str) -> Option<NaiveDateTime> {
        let s = s.trim();
        NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
            .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f"))
            .ok()
            .or_else(|| DateTime::parse_from_rfc3339(s).ok().map(|d| d.naive_utc()))
            .or_else(|| {
                NaiveDate::parse_from_str(s, "%Y-%m-%d")
                    .ok()
                    .and_then(|d| d.and_hms_opt(0, 0, 0))
            })
    }

    pub fn serialize<S: Serializer>(value: &NaiveDateTime, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&value.format(FORMAT).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<NaiveDateTime, D::Error> {
        let raw = String::deserialize(d)?;
        parse(&raw).ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp '{raw}'")))
    }

    /// Serialize a calendar date as its midnight timestamp.
    pub fn midnight<S: Serializer>(value: &Option<NaiveDate>, s: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(date) => s.serialize_str(&format!("{}T00:00:00", date.format("%Y-%m-%d"))),
            None => s.serialize_none(),
        }
    }

    pub mod option {
        use super::*;

        pub fn serialize<S: Serializer>(
            value: &Option<NaiveDateTime>,
            s: S,
        ) -> Result<S::Ok, S::Error> {
            match value {
                Some(v) => super::serialize(v, s),
                None => s.serialize_none(),
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(
            d: D,
        ) -> Result<Option<NaiveDateTime>, D::Error> {
            let raw: Option<String> = Option::deserialize(d)?;
            match raw {
                None => Ok(None),
                Some(raw) => parse(&raw).map(Some).ok_or_else(|| {
                    serde::de::Error::custom(format!("invalid timestamp '{raw}'"))
                }),
            }
        }
    }
}
