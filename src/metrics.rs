//! Aggregate progress, cost and manpower figures over the loaded data.
//!
//! Everything here is a pure function of the task forest and the manpower list.
//! Empty inputs yield all-zero results.

use std::collections::BTreeMap;

use chrono::NaiveDate;

use crate::fields::{CostPolicy, ManpowerType, WorkCategory};
use crate::task::{walk, Manpower, Task};

/// Job counts summed over every node of the forest.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProgressMetrics {
    pub total: i64,
    pub completed: i64,
    pub stuck: i64,
    /// `total - completed - stuck`; negative when upstream data breaks the soft invariant.
    pub remaining: i64,
}

impl ProgressMetrics {
    pub fn completed_percent(&self) -> f64 {
        percent(self.completed, self.total)
    }

    pub fn stuck_percent(&self) -> f64 {
        percent(self.stuck, self.total)
    }
}

/// Timeline and cost envelope of the project, computed from main tasks.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ProjectSummary {
    /// Days from the earliest main-task start to the latest main-task end, rounded up.
    pub total_duration: i64,
    pub total_cost: f64,
}

/// Manpower totals and breakdowns.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ManpowerSummary {
    pub total_records: usize,
    pub total_manpower: u64,
    pub total_cost: f64,
    pub by_type: BTreeMap<ManpowerType, u64>,
    pub by_work: BTreeMap<WorkCategory, u64>,
    /// Keyed by calendar day; iteration order is chronological.
    pub by_date: BTreeMap<NaiveDate, BTreeMap<ManpowerType, u64>>,
}

/// `part / whole * 100`, or 0 when `whole` is 0.
pub fn percent(part: i64, whole: i64) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 * 100.0 / whole as f64
    }
}

/// Per-task completion ratio for display.
pub fn task_percent(task: &Task) -> f64 {
    percent(i64::from(task.completed), i64::from(task.total_job))
}

pub fn progress(forest: &[Task]) -> ProgressMetrics {
    let mut m = ProgressMetrics::default();
    for task in walk(forest) {
        m.total += i64::from(task.total_job);
        m.completed += i64::from(task.completed);
        m.stuck += i64::from(task.stuck);
    }
    m.remaining = m.total - m.completed - m.stuck;
    m
}

/// Duration and cost over main tasks (no `parent_task_id`).
///
/// Main tasks are looked for across the whole forest, so a flat list works too.
/// With `CostPolicy::AllTasks` every node's cost counts.
pub fn project_summary(forest: &[Task], policy: CostPolicy) -> ProjectSummary {
    let mains: Vec<&Task> = walk(forest).filter(|t| t.is_main()).collect();
    let (Some(earliest), Some(latest)) = (
        mains.iter().map(|t| t.start_time).min(),
        mains.iter().map(|t| t.due_time).max(),
    ) else {
        return ProjectSummary::default();
    };

    let seconds = (latest - earliest).num_seconds();
    let total_duration = seconds.div_euclid(86_400) + i64::from(seconds.rem_euclid(86_400) != 0);
    let total_cost = match policy {
        CostPolicy::MainTasks => mains.iter().map(|t| t.est_cost).sum(),
        CostPolicy::AllTasks => walk(forest).map(|t| t.est_cost).sum(),
    };
    ProjectSummary { total_duration, total_cost }
}

pub fn manpower_summary(records: &[Manpower]) -> ManpowerSummary {
    let mut s = ManpowerSummary { total_records: records.len(), ..ManpowerSummary::default() };
    for record in records {
        let count = u64::from(record.headcount());
        *s.by_type.entry(record.manpower_type).or_default() += count;
        *s.by_work.entry(record.engaged_to).or_default() += count;
        *s.by_date
            .entry(record.date.date())
            .or_default()
            .entry(record.manpower_type)
            .or_default() += count;
        if let Some(cost) = record.perday_cost {
            s.total_cost += cost * count as f64;
        }
        s.total_manpower += count;
    }
    s
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::fixtures::*;

    #[test]
    fn empty_inputs_are_zero() {
        assert_eq!(progress(&[]), ProgressMetrics::default());
        assert_eq!(project_summary(&[], CostPolicy::MainTasks), ProjectSummary::default());
        assert_eq!(manpower_summary(&[]), ManpowerSummary::default());
        assert_eq!(progress(&[]).completed_percent(), 0.0);
    }

    #[test]
    fn progress_counts_every_nested_node() {
        let forest = vec![
            progress_fixture(1, None, 10, 4, 1, vec![
                progress_fixture(2, Some(1), 5, 2, 0, vec![progress_fixture(4, Some(2), 3, 3, 0, vec![])]),
            ]),
            progress_fixture(5, None, 2, 0, 2, vec![]),
        ];
        let m = progress(&forest);
        assert_eq!(m, ProgressMetrics { total: 20, completed: 9, stuck: 3, remaining: 8 });
        assert!(m.remaining >= 0);
        assert_eq!(m.completed_percent(), 45.0);
    }

    #[test]
    fn negative_remaining_is_kept() {
        let forest = vec![progress_fixture(1, None, 2, 3, 1, vec![])];
        assert_eq!(progress(&forest).remaining, -2);
    }

    #[test]
    fn summary_uses_main_tasks_only() {
        let mut a = task(1, None, vec![]);
        a.start_time = ts("2025-01-05");
        a.due_time = ts("2025-01-20");
        a.est_cost = 1000.0;
        let mut sub = task(2, Some(1), vec![]);
        sub.start_time = ts("2024-12-01");
        sub.due_time = ts("2025-06-01");
        sub.est_cost = 400.0;
        a.subtasks.push(sub);
        let mut b = task(3, None, vec![]);
        b.start_time = ts("2025-01-01");
        b.due_time = ts("2025-01-15T12:00:00");
        b.est_cost = 250.5;

        let forest = vec![a, b];
        let s = project_summary(&forest, CostPolicy::MainTasks);
        assert_eq!(s.total_duration, 19);
        assert_eq!(s.total_cost, 1250.5);
        assert_eq!(project_summary(&forest, CostPolicy::AllTasks).total_cost, 1650.5);
    }

    #[test]
    fn partial_day_rounds_up() {
        let mut a = task(1, None, vec![]);
        a.start_time = ts("2025-01-01T00:00:00");
        a.due_time = ts("2025-01-02T06:00:00");
        assert_eq!(project_summary(&[a], CostPolicy::MainTasks).total_duration, 2);
    }

    #[test]
    fn manpower_groups_by_date_in_order() {
        let records = vec![
            manpower(1, "2025-02-01T00:00:00", ManpowerType::Admin, 2),
            manpower(2, "2025-02-01T09:30:00", ManpowerType::Labour, 3),
            manpower(3, "2025-01-31", ManpowerType::Engineer, 1),
        ];
        let s = manpower_summary(&records);
        let days: Vec<String> = s.by_date.keys().map(|d| d.to_string()).collect();
        assert_eq!(days, vec!["2025-01-31", "2025-02-01"]);
        let feb = &s.by_date[&NaiveDate::from_ymd_opt(2025, 2, 1).unwrap()];
        assert_eq!(feb.len(), 2);
        assert_eq!(feb[&ManpowerType::Admin], 2);
        assert_eq!(feb[&ManpowerType::Labour], 3);
        assert_eq!(s.total_records, 3);
        assert_eq!(s.total_manpower, 6);
        assert_eq!(s.by_work[&WorkCategory::General], 6);
    }

    #[test]
    fn manpower_cost_skips_missing_rates() {
        let mut a = manpower(1, "2025-02-01", ManpowerType::Labour, 4);
        a.perday_cost = Some(50.0);
        let mut b = manpower(2, "2025-02-01", ManpowerType::Engineer, 0);
        b.perday_cost = Some(120.0);
        let c = manpower(3, "2025-02-02", ManpowerType::Admin, 2);
        let s = manpower_summary(&[a, b, c]);
        assert_eq!(s.total_cost, 320.0);
        assert_eq!(s.total_manpower, 7);
        assert_eq!(s.by_type[&ManpowerType::Engineer], 1);
    }

    #[test]
    fn percent_guards_zero() {
        assert_eq!(percent(5, 0), 0.0);
        assert_eq!(task_percent(&task(1, None, vec![])), 0.0);
        assert_eq!(task_percent(&progress_fixture(1, None, 4, 1, 0, vec![])), 25.0);
    }

    fn progress_fixture(
        id: u64,
        parent: Option<u64>,
        total: u32,
        completed: u32,
        stuck: u32,
        subtasks: Vec<Task>,
    ) -> Task {
        with_progress(task(id, parent, subtasks), total, completed, stuck)
    }
}
