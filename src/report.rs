//! Plain-text rendering for the command line, plus shared date and number helpers.
//!
//! Each function returns lines rather than printing so the output is testable;
//! the command handlers print them.

use chrono::{Duration, Local, NaiveDate, NaiveDateTime};

use crate::metrics::{
    manpower_summary, progress, project_summary, task_percent, ManpowerSummary,
};
use crate::fields::{CostPolicy, ManpowerType, WorkCategory};
use crate::task::{Manpower, Task};
use crate::tree_view::TreeRow;

/// Parse a date typed by the user.
///
/// Supports `today`, `tomorrow`, `yesterday`, `in Nd`, `in Nw` and `YYYY-MM-DD`.
pub fn parse_date_input(s: &str) -> Option<NaiveDate> {
    parse_date_relative(s, Local::now().date_naive())
}

pub fn parse_date_relative(s: &str, today: NaiveDate) -> Option<NaiveDate> {
    let s = s.trim().to_lowercase();
    match s.as_str() {
        "today" => return Some(today),
        "tomorrow" => return Some(today + Duration::days(1)),
        "yesterday" => return Some(today - Duration::days(1)),
        _ => {}
    }
    if let Some(rest) = s.strip_prefix("in ") {
        if let Some(n) = rest.strip_suffix('d').and_then(|n| n.trim().parse::<i64>().ok()) {
            return Some(today + Duration::days(n));
        }
        if let Some(n) = rest.strip_suffix('w').and_then(|n| n.trim().parse::<i64>().ok()) {
            return Some(today + Duration::weeks(n));
        }
    }
    NaiveDate::parse_from_str(&s, "%Y-%m-%d").ok()
}

pub fn format_date(dt: NaiveDateTime) -> String {
    dt.format("%Y-%m-%d").to_string()
}

/// Format a due date relative to today ("today", "tomorrow", "in 3d", "2d late").
pub fn format_due_relative(due: NaiveDate, today: NaiveDate) -> String {
    let days = (due - today).num_days();
    match days {
        0 => "today".into(),
        1 => "tomorrow".into(),
        d if d > 1 => format!("in {d}d"),
        d => format!("{}d late", -d),
    }
}

/// Thousands-separated amount with no fractional part when it is whole.
pub fn format_money(amount: f64) -> String {
    let cents = (amount.abs() * 100.0).round() as u64;
    let (whole, frac) = (cents / 100, cents % 100);
    let digits = whole.to_string();
    let mut grouped = String::new();
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    let mut out = if amount < 0.0 && cents > 0 { format!("-{grouped}") } else { grouped };
    if frac > 0 {
        out.push_str(&format!(".{frac:02}"));
    }
    out
}

pub fn truncate(s: &str, width: usize) -> String {
    if s.chars().count() <= width {
        s.to_string()
    } else {
        let mut out: String = s.chars().take(width.saturating_sub(1)).collect();
        out.push('…');
        out
    }
}

/// One line per visible tree row, with glyphs.
pub fn task_tree_lines(rows: &[TreeRow<'_>]) -> Vec<String> {
    let mut lines = vec![format!(
        "{:<5} {:<12} {:<10} {:<10} {:>5} {:>12} {:>6}  {}",
        "ID", "Status", "Start", "Due", "Days", "Est. cost", "Done", "Task"
    )];
    for row in rows {
        let t = row.task;
        let subtasks = row.subtask_label();
        let suffix = if subtasks.is_empty() { String::new() } else { format!(" ({subtasks})") };
        let owner = t.owner.as_deref().map(|o| format!(" @{o}")).unwrap_or_default();
        lines.push(format!(
            "{:<5} {:<12} {:<10} {:<10} {:>5} {:>12} {:>5.0}%  {}{}{}{}",
            t.id,
            t.status.label(),
            format_date(t.start_time),
            format_date(t.due_time),
            t.est_duration,
            format_money(t.est_cost),
            task_percent(t),
            row.prefix(),
            t.name,
            owner,
            suffix,
        ));
    }
    lines
}

/// Detail block for one task.
pub fn task_detail_lines(t: &Task, today: NaiveDate) -> Vec<String> {
    let mut lines = vec![
        format!("#{} {}", t.id, t.name),
        format!("  Status:      {}", t.status),
        format!("  Owner:       {}", t.owner.as_deref().unwrap_or("-")),
        format!(
            "  Schedule:    {} -> {} ({} days, due {})",
            format_date(t.start_time),
            format_date(t.due_time),
            t.est_duration,
            format_due_relative(t.due_time.date(), today)
        ),
        format!("  Est. cost:   {}", format_money(t.est_cost)),
        format!(
            "  Jobs:        {} total, {} completed, {} stuck, {} remaining",
            t.total_job,
            t.completed,
            t.stuck,
            t.remaining()
        ),
    ];
    if let Some(parent) = t.parent_task_id {
        lines.push(format!("  Parent:      #{parent}"));
    }
    if let Some(desc) = t.description.as_deref().filter(|d| !d.is_empty()) {
        lines.push(format!("  Description: {desc}"));
    }
    lines
}

pub fn manpower_lines(records: &[Manpower]) -> Vec<String> {
    let mut lines = vec![format!(
        "{:<5} {:<10} {:<11} {:<15} {:>6} {:>12}",
        "ID", "Date", "Type", "Engaged to", "Count", "Per day"
    )];
    for m in records {
        lines.push(format!(
            "{:<5} {:<10} {:<11} {:<15} {:>6} {:>12}",
            m.id,
            format_date(m.date),
            m.manpower_type.label(),
            m.engaged_to.label(),
            m.headcount(),
            m.perday_cost.map(format_money).unwrap_or_else(|| "-".into()),
        ));
    }
    lines
}

/// The overview page as text: progress, schedule, cost and manpower breakdowns.
pub fn overview_lines(tasks: &[Task], records: &[Manpower], policy: CostPolicy) -> Vec<String> {
    let p = progress(tasks);
    let s = project_summary(tasks, policy);
    let m = manpower_summary(records);
    let mut lines = vec![
        "Project overview".to_string(),
        format!("  Total jobs:      {}", p.total),
        format!("  Completed:       {} ({:.1}%)", p.completed, p.completed_percent()),
        format!("  Stuck:           {} ({:.1}%)", p.stuck, p.stuck_percent()),
        format!("  Remaining:       {}", p.remaining),
        format!("  Total duration:  {} days", s.total_duration),
        format!("  Total est. cost: {}", format_money(s.total_cost)),
        String::new(),
        "Manpower".to_string(),
        format!("  Records:         {}", m.total_records),
        format!("  Head count:      {}", m.total_manpower),
        format!("  Manpower cost:   {}", format_money(m.total_cost)),
    ];
    lines.extend(breakdown_lines(&m));
    lines
}

fn breakdown_lines(m: &ManpowerSummary) -> Vec<String> {
    let mut lines = Vec::new();
    if !m.by_type.is_empty() {
        lines.push(String::new());
        lines.push("  By type".to_string());
        for kind in ManpowerType::ALL {
            if let Some(n) = m.by_type.get(&kind) {
                lines.push(format!("    {:<15} {:>6}", kind.label(), n));
            }
        }
    }
    if !m.by_work.is_empty() {
        lines.push(String::new());
        lines.push("  By work".to_string());
        for work in WorkCategory::ALL {
            if let Some(n) = m.by_work.get(&work) {
                lines.push(format!("    {:<15} {:>6}", work.label(), n));
            }
        }
    }
    if !m.by_date.is_empty() {
        lines.push(String::new());
        lines.push("  By date".to_string());
        for (date, kinds) in &m.by_date {
            let parts: Vec<String> =
                kinds.iter().map(|(k, n)| format!("{} {}", k.label(), n)).collect();
            lines.push(format!("    {}  {}", date.format("%Y-%m-%d"), parts.join(", ")));
        }
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::fixtures::*;
    use crate::tree_state::TreeState;
    use crate::tree_view::flatten;

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn parses_relative_dates() {
        let today = d("2025-03-10");
        assert_eq!(parse_date_relative("today", today), Some(today));
        assert_eq!(parse_date_relative(" Tomorrow ", today), Some(d("2025-03-11")));
        assert_eq!(parse_date_relative("in 5d", today), Some(d("2025-03-15")));
        assert_eq!(parse_date_relative("in 2w", today), Some(d("2025-03-24")));
        assert_eq!(parse_date_relative("2025-01-01", today), Some(d("2025-01-01")));
        assert_eq!(parse_date_relative("soon", today), None);
    }

    #[test]
    fn formats_relative_due() {
        let today = d("2025-03-10");
        assert_eq!(format_due_relative(today, today), "today");
        assert_eq!(format_due_relative(d("2025-03-11"), today), "tomorrow");
        assert_eq!(format_due_relative(d("2025-03-13"), today), "in 3d");
        assert_eq!(format_due_relative(d("2025-03-08"), today), "2d late");
    }

    #[test]
    fn formats_money() {
        assert_eq!(format_money(0.0), "0");
        assert_eq!(format_money(1234567.0), "1,234,567");
        assert_eq!(format_money(999.5), "999.50");
        assert_eq!(format_money(-1500.0), "-1,500");
        assert_eq!(format_money(1.996), "2");
        assert_eq!(format_money(999.999), "1,000");
        assert_eq!(format_money(0.004), "0");
    }

    #[test]
    fn truncates_with_ellipsis() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("Foundation works", 8), "Foundat…");
    }

    #[test]
    fn tree_lines_carry_glyphs() {
        let forest = sample_forest();
        let mut state = TreeState::new();
        state.expand_all(&forest);
        let rows = flatten(&forest, &state.expanded);
        let lines = task_tree_lines(&rows);
        assert_eq!(lines.len(), 6);
        assert!(lines[1].ends_with("▼ task 1 (2 subtasks)"));
        assert!(lines[3].ends_with("│  └─• task 4"));
    }

    #[test]
    fn overview_on_empty_data_is_all_zero() {
        let lines = overview_lines(&[], &[], CostPolicy::MainTasks);
        assert!(lines.contains(&"  Total jobs:      0".to_string()));
        assert!(lines.contains(&"  Completed:       0 (0.0%)".to_string()));
        assert!(lines.contains(&"  Total duration:  0 days".to_string()));
        assert!(!lines.iter().any(|l| l.contains("By type")));
    }

    #[test]
    fn overview_lists_breakdowns() {
        let records = vec![
            manpower(1, "2025-01-02", ManpowerType::Labour, 4),
            manpower(2, "2025-01-01", ManpowerType::Engineer, 1),
        ];
        let lines = overview_lines(&[], &records, CostPolicy::MainTasks);
        let by_date = lines.iter().position(|l| l == "  By date").unwrap();
        assert_eq!(lines[by_date + 1], "    2025-01-01  Engineer 1");
        assert_eq!(lines[by_date + 2], "    2025-01-02  Labour 4");
    }
}
