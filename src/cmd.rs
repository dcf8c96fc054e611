//! Command implementations for the CLI interface.
//!
//! Each handler opens the persisted session, builds a `Dashboard` over the HTTP
//! gateway and runs one operation. Handlers return `Result`; `main` reports the
//! error and sets the exit code.

use std::io::{self, BufRead, Write};

use chrono::{Local, NaiveDate};
use clap::{Args, Subcommand};
use clap_complete::{generate, Shell};

use crate::config::Config;
use crate::dashboard::{Dashboard, Outcome};
use crate::error::{Error, Result};
use crate::fields::*;
use crate::gateway::{Gateway, HttpGateway};
use crate::report::*;
use crate::schedule::Schedule;
use crate::session::Session;
use crate::task::{check_amount, find_task, ManpowerDraft, Task, TaskDraft};
use crate::tree_state::TreeState;
use crate::tree_view::flatten;
use crate::tui::run::run_tui;

#[derive(Subcommand)]
pub enum Commands {
    /// Launch the interactive dashboard.
    Ui,

    /// Log in and store the session token.
    Login {
        username: String,
        /// Password; read from stdin when omitted.
        #[arg(long)]
        password: Option<String>,
    },

    /// Forget the stored session.
    Logout,

    /// Show the logged-in user and role.
    Whoami,

    /// Print progress, schedule, cost and manpower summaries.
    Overview,

    /// Print the task tree.
    Tasks {
        /// Show main tasks only.
        #[arg(long)]
        collapsed: bool,
    },

    /// Show a single task.
    View {
        id: u64,
    },

    /// Add a task, or a subtask with --parent.
    Add {
        /// Task name.
        name: String,
        /// Parent task ID.
        #[arg(long)]
        parent: Option<u64>,
        #[command(flatten)]
        fields: TaskFields,
    },

    /// Update fields on a task.
    Update {
        id: u64,
        #[arg(long)]
        name: Option<String>,
        #[command(flatten)]
        fields: TaskFields,
    },

    /// Delete a task.
    Delete {
        id: u64,
        /// Confirm deleting a task that has subtasks; the backend removes them too.
        #[arg(long)]
        cascade: bool,
    },

    /// Manage manpower records.
    Manpower {
        #[command(subcommand)]
        action: ManpowerAction,
    },

    /// Generate shell completion scripts.
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Optional task fields shared by `add` and `update`.
#[derive(Args, Debug, Default)]
pub struct TaskFields {
    /// Longer description.
    #[arg(long)]
    pub desc: Option<String>,
    #[arg(long)]
    pub owner: Option<String>,
    #[arg(long, value_enum)]
    pub status: Option<TaskStatus>,
    /// Start date: YYYY-MM-DD, "today", "tomorrow" or "in Nd".
    #[arg(long)]
    pub start: Option<String>,
    /// End date; recomputes the duration.
    #[arg(long)]
    pub due: Option<String>,
    /// Estimated duration in days; recomputes the end date.
    #[arg(long)]
    pub duration: Option<u32>,
    /// Estimated cost.
    #[arg(long)]
    pub cost: Option<f64>,
    #[arg(long)]
    pub total_job: Option<u32>,
    #[arg(long)]
    pub completed: Option<u32>,
    #[arg(long)]
    pub stuck: Option<u32>,
}

#[derive(Subcommand)]
pub enum ManpowerAction {
    /// List records, oldest first.
    List,
    /// Add a record.
    Add {
        /// Date: YYYY-MM-DD, "today" or "yesterday".
        #[arg(long)]
        date: String,
        #[arg(long, value_enum)]
        kind: ManpowerType,
        #[arg(long, value_enum, default_value_t = WorkCategory::General)]
        work: WorkCategory,
        #[arg(long, default_value_t = 1)]
        count: u32,
        /// Cost per person per day.
        #[arg(long)]
        cost: Option<f64>,
    },
    /// Update fields on a record.
    Update {
        id: u64,
        #[arg(long)]
        date: Option<String>,
        #[arg(long, value_enum)]
        kind: Option<ManpowerType>,
        #[arg(long, value_enum)]
        work: Option<WorkCategory>,
        #[arg(long)]
        count: Option<u32>,
        #[arg(long)]
        cost: Option<f64>,
    },
    /// Delete a record.
    Delete {
        id: u64,
    },
}

impl TaskFields {
    /// Build a draft, running the start/end/duration rule.
    ///
    /// With `base` the draft is an update: the schedule is seeded from the stored
    /// task and only sent when one of its three fields was given. Without it the
    /// draft is a create and always carries both dates; the start defaults to `today`.
    pub fn to_draft(&self, base: Option<&Task>, today: NaiveDate) -> Result<TaskDraft> {
        let mut schedule = match base {
            Some(t) => Schedule::new(
                Some(t.start_time.date()),
                Some(t.due_time.date()),
                t.est_duration,
            ),
            None => Schedule::new(Some(today), None, 0),
        };
        if let Some(start) = &self.start {
            schedule.set_start(Some(parse_date_arg(start)?));
        }
        if let Some(due) = &self.due {
            schedule.set_due(Some(parse_date_arg(due)?));
        }
        if let Some(days) = self.duration {
            schedule.set_duration(days);
        }
        if schedule.due.is_none() {
            schedule.due = schedule.start;
        }
        if let Some(cost) = self.cost {
            check_amount(cost, "Estimated cost").map_err(Error::Invalid)?;
        }

        let touches_schedule =
            base.is_none() || self.start.is_some() || self.due.is_some() || self.duration.is_some();
        let mut draft = TaskDraft {
            description: self.desc.clone(),
            owner: self.owner.clone(),
            status: self.status,
            est_cost: self.cost,
            total_job: self.total_job,
            completed: self.completed,
            stuck: self.stuck,
            ..TaskDraft::default()
        };
        if touches_schedule {
            draft.start_time = schedule.start;
            draft.due_time = schedule.due;
            draft.est_duration = Some(schedule.duration);
        }
        draft.check_job_counts(base).map_err(Error::Invalid)?;
        Ok(draft)
    }
}

fn parse_date_arg(raw: &str) -> Result<NaiveDate> {
    parse_date_input(raw).ok_or_else(|| Error::Invalid(format!("Invalid date '{raw}'")))
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}

fn open_dashboard(config: &Config) -> Result<Dashboard<HttpGateway>> {
    let session = Session::load(&config.session_path)?;
    if !session.is_authenticated() {
        return Err(Error::NotLoggedIn);
    }
    Ok(Dashboard::new(HttpGateway::new(&config.api_url), session))
}

fn open_for_edit(config: &Config) -> Result<Dashboard<HttpGateway>> {
    let dashboard = open_dashboard(config)?;
    if !dashboard.session().can_edit() {
        return Err(Error::AdminRequired);
    }
    Ok(dashboard)
}

/// Turn a dashboard outcome into a `Result` carrying its message.
fn settle<G: Gateway>(dashboard: &mut Dashboard<G>, ok: bool) -> Result<()> {
    if ok {
        Ok(())
    } else {
        Err(Error::Failed(dashboard.take_error().unwrap_or_else(|| "Request failed".into())))
    }
}

/// Like `settle`, but a change the backend took is a success even if the
/// reload after it failed; that failure is only reported on stderr.
fn settle_change<G: Gateway>(dashboard: &mut Dashboard<G>, outcome: Outcome) -> Result<()> {
    if outcome == Outcome::AppliedStale {
        if let Some(err) = dashboard.take_error() {
            eprintln!("Warning: {err}");
        }
    }
    settle(dashboard, outcome.is_applied())
}

fn print_lines(lines: &[String]) {
    for line in lines {
        println!("{line}");
    }
}

/// Launch the terminal dashboard.
pub fn cmd_ui(config: &Config) -> Result<()> {
    run_tui(config)?;
    Ok(())
}

pub fn cmd_login(config: &Config, username: String, password: Option<String>) -> Result<()> {
    let password = match password {
        Some(p) => p,
        None => {
            eprint!("Password: ");
            io::stderr().flush()?;
            let mut line = String::new();
            io::stdin().lock().read_line(&mut line)?;
            line.trim_end_matches(['\r', '\n']).to_string()
        }
    };
    let mut dashboard = Dashboard::new(HttpGateway::new(&config.api_url), Session::anonymous());
    let ok = dashboard.login(&username, &password);
    settle(&mut dashboard, ok)?;
    let session = dashboard.session();
    session.save(&config.session_path)?;
    println!(
        "Logged in as {} ({})",
        session.username.as_deref().unwrap_or(&username),
        session.role.label()
    );
    Ok(())
}

pub fn cmd_logout(config: &Config) -> Result<()> {
    Session::clear(&config.session_path)?;
    println!("Logged out.");
    Ok(())
}

pub fn cmd_whoami(config: &Config) -> Result<()> {
    let session = Session::load(&config.session_path)?;
    match (&session.username, session.is_authenticated()) {
        (Some(name), true) => println!("{} ({})", name, session.role.label()),
        _ => println!("Not logged in."),
    }
    Ok(())
}

pub fn cmd_overview(config: &Config) -> Result<()> {
    let mut dashboard = open_dashboard(config)?;
    let ok = dashboard.load_all();
    settle(&mut dashboard, ok)?;
    print_lines(&overview_lines(dashboard.tasks(), dashboard.manpower(), config.cost_policy));
    Ok(())
}

pub fn cmd_tasks(config: &Config, collapsed: bool) -> Result<()> {
    let mut dashboard = open_dashboard(config)?;
    let ok = dashboard.load_tasks();
    settle(&mut dashboard, ok)?;
    if dashboard.tasks().is_empty() {
        println!("No tasks found.");
        return Ok(());
    }
    let mut state = TreeState::new();
    if !collapsed {
        state.expand_all(dashboard.tasks());
    }
    let rows = flatten(dashboard.tasks(), &state.expanded);
    print_lines(&task_tree_lines(&rows));
    Ok(())
}

pub fn cmd_view(config: &Config, id: u64) -> Result<()> {
    let mut dashboard = open_dashboard(config)?;
    let ok = dashboard.load_tasks();
    settle(&mut dashboard, ok)?;
    let task = find_task(dashboard.tasks(), id)
        .ok_or_else(|| Error::Invalid(format!("Task {id} not found.")))?;
    print_lines(&task_detail_lines(task, today()));
    if task.has_subtasks() {
        println!("  Subtasks:");
        for sub in &task.subtasks {
            println!("    #{} {} [{}]", sub.id, sub.name, sub.status);
        }
    }
    Ok(())
}

pub fn cmd_add(config: &Config, name: String, parent: Option<u64>, fields: TaskFields) -> Result<()> {
    let name = name.trim().to_string();
    if name.is_empty() {
        return Err(Error::Invalid("Task name is required".into()));
    }
    let mut dashboard = open_for_edit(config)?;
    let mut draft = fields.to_draft(None, today())?;
    draft.name = Some(name.clone());
    let ok = match parent {
        Some(pid) => dashboard.add_subtask(pid, draft),
        None => dashboard.add_task(&draft),
    };
    settle_change(&mut dashboard, ok)?;
    match parent {
        Some(pid) => println!("Added subtask '{name}' under task {pid}"),
        None => println!("Added task '{name}'"),
    }
    Ok(())
}

pub fn cmd_update(config: &Config, id: u64, name: Option<String>, fields: TaskFields) -> Result<()> {
    let mut dashboard = open_for_edit(config)?;
    let ok = dashboard.load_tasks();
    settle(&mut dashboard, ok)?;
    let base = find_task(dashboard.tasks(), id)
        .cloned()
        .ok_or_else(|| Error::Invalid(format!("Task {id} not found.")))?;
    let mut draft = fields.to_draft(Some(&base), today())?;
    if let Some(name) = name.map(|n| n.trim().to_string()) {
        if name.is_empty() {
            return Err(Error::Invalid("Task name is required".into()));
        }
        draft.name = Some(name);
    }
    if draft == TaskDraft::default() {
        println!("Nothing to update.");
        return Ok(());
    }
    let ok = dashboard.update_task(id, &draft);
    settle_change(&mut dashboard, ok)?;
    println!("Updated task {id}");
    Ok(())
}

pub fn cmd_delete(config: &Config, id: u64, cascade: bool) -> Result<()> {
    let mut dashboard = open_for_edit(config)?;
    let ok = dashboard.load_tasks();
    settle(&mut dashboard, ok)?;
    let Some(task) = find_task(dashboard.tasks(), id) else {
        return Err(Error::Invalid(format!("Task {id} not found.")));
    };
    if task.has_subtasks() && !cascade {
        return Err(Error::Invalid(format!(
            "Task {} has {} subtask(s) that will be deleted as well. Use --cascade to confirm.",
            id,
            task.subtasks.len()
        )));
    }
    let ok = dashboard.delete_task(id);
    settle_change(&mut dashboard, ok)?;
    println!("Deleted.");
    Ok(())
}

pub fn cmd_manpower(config: &Config, action: ManpowerAction) -> Result<()> {
    match action {
        ManpowerAction::List => {
            let mut dashboard = open_dashboard(config)?;
            let ok = dashboard.load_manpower();
            settle(&mut dashboard, ok)?;
            if dashboard.manpower().is_empty() {
                println!("No manpower records found.");
                return Ok(());
            }
            let mut records = dashboard.manpower().to_vec();
            records.sort_by_key(|m| (m.date, m.id));
            print_lines(&manpower_lines(&records));
        }
        ManpowerAction::Add { date, kind, work, count, cost } => {
            let draft = ManpowerDraft {
                date: Some(parse_date_arg(&date)?),
                manpower_type: Some(kind),
                engaged_to: Some(work),
                number_of_manpower: Some(count),
                perday_cost: checked_cost(cost)?,
            };
            draft.check_headcount().map_err(Error::Invalid)?;
            let mut dashboard = open_for_edit(config)?;
            let ok = dashboard.add_manpower(&draft);
            settle_change(&mut dashboard, ok)?;
            println!("Added manpower record.");
        }
        ManpowerAction::Update { id, date, kind, work, count, cost } => {
            let draft = ManpowerDraft {
                date: date.as_deref().map(parse_date_arg).transpose()?,
                manpower_type: kind,
                engaged_to: work,
                number_of_manpower: count,
                perday_cost: checked_cost(cost)?,
            };
            draft.check_headcount().map_err(Error::Invalid)?;
            if draft == ManpowerDraft::default() {
                println!("Nothing to update.");
                return Ok(());
            }
            let mut dashboard = open_for_edit(config)?;
            let ok = dashboard.update_manpower(id, &draft);
            settle_change(&mut dashboard, ok)?;
            println!("Updated manpower record {id}");
        }
        ManpowerAction::Delete { id } => {
            let mut dashboard = open_for_edit(config)?;
            let ok = dashboard.delete_manpower(id);
            settle_change(&mut dashboard, ok)?;
            println!("Deleted.");
        }
    }
    Ok(())
}

fn checked_cost(cost: Option<f64>) -> Result<Option<f64>> {
    cost.map(|c| check_amount(c, "Per-day cost")).transpose().map_err(Error::Invalid)
}

pub fn cmd_completions(shell: Shell) {
    use clap::CommandFactory;
    use crate::cli::Cli;

    let mut app = Cli::command();
    let app_name = app.get_name().to_string();
    generate(shell, &mut app, app_name, &mut std::io::stdout());
}
