//! Task form handling for the terminal user interface.
//!
//! One form serves add, add-subtask and edit. Start, end and duration are kept
//! consistent through `Schedule`: an edit to one of them is committed when the
//! cursor leaves the field (and before submit), and the derived field's text is
//! rewritten.

use chrono::NaiveDate;

use crate::fields::TaskStatus;
use crate::schedule::Schedule;
use crate::task::{check_amount, Task, TaskDraft};
use crate::tui::{enums::TaskFormMode, input::InputField};

/// Global order constants for task form fields.
pub const NAME_GLOBAL_ORDER: usize = 0;
pub const OWNER_GLOBAL_ORDER: usize = 1;
pub const DESCRIPTION_GLOBAL_ORDER: usize = 2;
pub const STATUS_GLOBAL_ORDER: usize = 3;
pub const START_GLOBAL_ORDER: usize = 4;
pub const DUE_GLOBAL_ORDER: usize = 5;
pub const DURATION_GLOBAL_ORDER: usize = 6;
pub const COST_GLOBAL_ORDER: usize = 7;
pub const TOTAL_JOB_GLOBAL_ORDER: usize = 8;
pub const COMPLETED_GLOBAL_ORDER: usize = 9;
pub const STUCK_GLOBAL_ORDER: usize = 10;

const FIELD_COUNT: usize = 11;

const DATE_FORMAT: &str = "%Y-%m-%d";

pub struct TaskForm {
    pub mode: TaskFormMode,
    pub name: InputField,
    pub owner: InputField,
    pub description: InputField,
    pub status: usize,
    pub start: InputField,
    pub due: InputField,
    pub duration: InputField,
    pub cost: InputField,
    pub total_job: InputField,
    pub completed: InputField,
    pub stuck: InputField,
    pub current_field: usize,
    schedule: Schedule,
}

fn format_day(d: Option<NaiveDate>) -> String {
    d.map(|d| d.format(DATE_FORMAT).to_string()).unwrap_or_default()
}

fn parse_day(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), DATE_FORMAT).ok()
}

impl TaskForm {
    /// An empty form for a new main task.
    pub fn new() -> Self {
        let mut form = Self {
            mode: TaskFormMode::Add,
            name: InputField::new(),
            owner: InputField::new(),
            description: InputField::new(),
            status: 0, // Not Started
            start: InputField::new(),
            due: InputField::new(),
            duration: InputField::with_value("0"),
            cost: InputField::with_value("0"),
            total_job: InputField::with_value("0"),
            completed: InputField::with_value("0"),
            stuck: InputField::with_value("0"),
            current_field: 0,
            schedule: Schedule::default(),
        };
        form.update_active_field();
        form
    }

    /// An empty form whose submit creates a subtask of `parent`.
    pub fn for_subtask(parent: &Task) -> Self {
        let mut form = Self::new();
        form.mode = TaskFormMode::AddSubtask {
            parent_id: parent.id,
            parent_name: parent.name.clone(),
        };
        form
    }

    /// A form populated from an existing task.
    pub fn from_task(task: &Task) -> Self {
        let mut form = Self::new();
        form.mode = TaskFormMode::Edit { id: task.id };
        form.name = InputField::with_value(&task.name);
        form.owner = InputField::with_value(task.owner.as_deref().unwrap_or_default());
        form.description = InputField::with_value(task.description.as_deref().unwrap_or_default());
        form.status = TaskStatus::ALL.iter().position(|&s| s == task.status).unwrap_or(0);
        form.schedule = Schedule::new(
            Some(task.start_time.date()),
            Some(task.due_time.date()),
            task.est_duration,
        );
        form.sync_schedule_fields();
        form.cost = InputField::with_value(&task.est_cost.to_string());
        form.total_job = InputField::with_value(&task.total_job.to_string());
        form.completed = InputField::with_value(&task.completed.to_string());
        form.stuck = InputField::with_value(&task.stuck.to_string());
        form.update_active_field();
        form
    }

    pub fn title(&self) -> String {
        match &self.mode {
            TaskFormMode::Add => "New Task".to_string(),
            TaskFormMode::AddSubtask { parent_name, .. } => format!("New Subtask of '{parent_name}'"),
            TaskFormMode::Edit { id } => format!("Edit Task {id}"),
        }
    }

    pub fn selected_status(&self) -> TaskStatus {
        TaskStatus::ALL[self.status % TaskStatus::ALL.len()]
    }

    /// Get mutable references to all text fields in visual order.
    pub fn fields_mut(&mut self) -> Vec<&mut InputField> {
        vec![
            &mut self.name,
            &mut self.owner,
            &mut self.description,
            // STATUS at 3 is a selector
            &mut self.start,
            &mut self.due,
            &mut self.duration,
            &mut self.cost,
            &mut self.total_job,
            &mut self.completed,
            &mut self.stuck,
        ]
    }

    fn current_input(&mut self) -> Option<&mut InputField> {
        match self.current_field {
            NAME_GLOBAL_ORDER => Some(&mut self.name),
            OWNER_GLOBAL_ORDER => Some(&mut self.owner),
            DESCRIPTION_GLOBAL_ORDER => Some(&mut self.description),
            START_GLOBAL_ORDER => Some(&mut self.start),
            DUE_GLOBAL_ORDER => Some(&mut self.due),
            DURATION_GLOBAL_ORDER => Some(&mut self.duration),
            COST_GLOBAL_ORDER => Some(&mut self.cost),
            TOTAL_JOB_GLOBAL_ORDER => Some(&mut self.total_job),
            COMPLETED_GLOBAL_ORDER => Some(&mut self.completed),
            STUCK_GLOBAL_ORDER => Some(&mut self.stuck),
            _ => None,
        }
    }

    pub fn next_field(&mut self) {
        self.commit_schedule_field();
        self.current_field = (self.current_field + 1) % FIELD_COUNT;
        self.update_active_field();
    }

    pub fn prev_field(&mut self) {
        self.commit_schedule_field();
        self.current_field = if self.current_field == 0 {
            FIELD_COUNT - 1
        } else {
            self.current_field - 1
        };
        self.update_active_field();
    }

    pub fn update_active_field(&mut self) {
        for field in self.fields_mut() {
            field.active = false;
        }
        if let Some(field) = self.current_input() {
            field.active = true;
        }
    }

    pub fn handle_char(&mut self, c: char) {
        if let Some(field) = self.current_input() {
            field.handle_char(c);
        }
    }

    pub fn handle_backspace(&mut self) {
        if let Some(field) = self.current_input() {
            field.handle_backspace();
        }
    }

    pub fn handle_delete(&mut self) {
        if let Some(field) = self.current_input() {
            field.handle_delete();
        }
    }

    /// Left/right move the cursor, or cycle the status selector.
    pub fn handle_left_right(&mut self, right: bool) {
        if self.current_field == STATUS_GLOBAL_ORDER {
            let n = TaskStatus::ALL.len();
            self.status = if right { (self.status + 1) % n } else { (self.status + n - 1) % n };
            return;
        }
        if let Some(field) = self.current_input() {
            if right {
                field.move_cursor_right()
            } else {
                field.move_cursor_left()
            }
        }
    }

    /// Apply the schedule rule for the field being left, if its value changed.
    pub fn commit_schedule_field(&mut self) {
        match self.current_field {
            START_GLOBAL_ORDER => {
                let typed = parse_day(&self.start.value);
                if typed != self.schedule.start && (typed.is_some() || self.start.trimmed().is_empty()) {
                    self.schedule.set_start(typed);
                    self.sync_schedule_fields();
                }
            }
            DUE_GLOBAL_ORDER => {
                let typed = parse_day(&self.due.value);
                if typed != self.schedule.due && (typed.is_some() || self.due.trimmed().is_empty()) {
                    self.schedule.set_due(typed);
                    self.sync_schedule_fields();
                }
            }
            DURATION_GLOBAL_ORDER => {
                if let Ok(days) = self.duration.trimmed().parse::<u32>() {
                    if days != self.schedule.duration {
                        self.schedule.set_duration(days);
                        self.sync_schedule_fields();
                    }
                }
            }
            _ => {}
        }
    }

    fn sync_schedule_fields(&mut self) {
        let start = format_day(self.schedule.start);
        let due = format_day(self.schedule.due);
        let duration = self.schedule.duration.to_string();
        if self.start.value != start {
            self.start.set(&start);
        }
        if self.due.value != due {
            self.due.set(&due);
        }
        if self.duration.value != duration {
            self.duration.set(&duration);
        }
    }

    /// Validate and build the payload. Errors are single user-facing messages.
    pub fn to_draft(&mut self) -> Result<TaskDraft, String> {
        self.commit_schedule_field();

        let name = self.name.trimmed().to_string();
        if name.is_empty() {
            return Err("Task name is required".into());
        }
        let start = parse_day(&self.start.value)
            .ok_or_else(|| "Start date is required (YYYY-MM-DD)".to_string())?;
        let due = parse_day(&self.due.value)
            .ok_or_else(|| "End date is required (YYYY-MM-DD)".to_string())?;
        let est_duration = parse_count(&self.duration, "Est. duration")?;
        let est_cost = match self.cost.trimmed() {
            "" => 0.0,
            raw => {
                let v = raw.parse::<f64>().map_err(|_| "Est. cost must be a number".to_string())?;
                check_amount(v, "Est. cost")?
            }
        };

        let editing = matches!(self.mode, TaskFormMode::Edit { .. });
        let optional = |field: &InputField| {
            let text = field.trimmed().to_string();
            if text.is_empty() && !editing {
                None
            } else {
                Some(text)
            }
        };

        let draft = TaskDraft {
            name: Some(name),
            description: optional(&self.description),
            status: Some(self.selected_status()),
            owner: optional(&self.owner),
            start_time: Some(start),
            due_time: Some(due),
            est_duration: Some(est_duration),
            est_cost: Some(est_cost),
            total_job: Some(parse_count(&self.total_job, "Total job")?),
            completed: Some(parse_count(&self.completed, "Completed")?),
            stuck: Some(parse_count(&self.stuck, "Stuck")?),
            parent_task_id: None,
        };
        draft.check_job_counts(None)?;
        Ok(draft)
    }
}

fn parse_count(field: &InputField, label: &str) -> Result<u32, String> {
    match field.trimmed() {
        "" => Ok(0),
        raw => raw
            .parse::<u32>()
            .map_err(|_| format!("{label} must be a whole number of 0 or more")),
    }
}

impl Default for TaskForm {
    fn default() -> Self {
        Self::new()
    }
}
