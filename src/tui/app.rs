//! Main application logic for the terminal user interface.
//!
//! This module contains the `App` struct which manages the dashboard state,
//! handles key input, renders the pages (overview, task tree, manpower) and
//! coordinates forms, dialogs and the network calls made through `Dashboard`.

use std::io;
use std::path::PathBuf;
use std::time::Duration;

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use ratatui::{
    backend::Backend,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Clear, Gauge, Paragraph, Row, Table, TableState, Tabs, Wrap},
    Frame, Terminal,
};

use crate::dashboard::{Dashboard, Outcome};
use crate::fields::{CostPolicy, ManpowerType, TaskStatus, WorkCategory};
use crate::gateway::Gateway;
use crate::metrics::{manpower_summary, progress, project_summary, task_percent};
use crate::report::{format_date, format_money, truncate};
use crate::session::Session;
use crate::task::{count_nodes, find_task, Manpower, Task};
use crate::tree_state::TreeState;
use crate::tree_view::{flatten, position_of};
use crate::tui::{
    colors::{status_color, DARK_GREEN, DARK_PURPLE, DARK_RED, GOLD},
    enums::{AppState, Job, Page, PendingDelete, TaskFormMode},
    input::InputField,
    manpower_form::{
        ManpowerForm, COST_GLOBAL_ORDER as MP_COST, COUNT_GLOBAL_ORDER, DATE_GLOBAL_ORDER,
        TYPE_GLOBAL_ORDER, WORK_GLOBAL_ORDER,
    },
    task_form::{
        TaskForm, COMPLETED_GLOBAL_ORDER, COST_GLOBAL_ORDER, DESCRIPTION_GLOBAL_ORDER,
        DUE_GLOBAL_ORDER, DURATION_GLOBAL_ORDER, NAME_GLOBAL_ORDER, OWNER_GLOBAL_ORDER,
        START_GLOBAL_ORDER, STATUS_GLOBAL_ORDER, STUCK_GLOBAL_ORDER, TOTAL_JOB_GLOBAL_ORDER,
    },
    utils::{centered_rect, step_selection},
};

const LOADING: &str = "Loading...";

/// Main application state for the terminal dashboard.
pub struct App<G: Gateway> {
    state: AppState,
    page: Page,
    dashboard: Dashboard<G>,
    session_path: PathBuf,
    cost_policy: CostPolicy,
    tree: TreeState,
    task_table: TableState,
    manpower_table: TableState,
    selected_task: Option<u64>,
    task_form: TaskForm,
    manpower_form: ManpowerForm,
    login_user: InputField,
    login_password: InputField,
    pending_delete: Option<PendingDelete>,
    job: Option<Job>,
    status_message: String,
    status_is_error: bool,
}

impl<G: Gateway> App<G> {
    /// Open on the login screen, or queue the first load for a stored session.
    pub fn new(gateway: G, session: Session, session_path: PathBuf, cost_policy: CostPolicy) -> Self {
        let logged_in = session.is_authenticated();
        let mut login_user = InputField::with_value(session.username.as_deref().unwrap_or_default());
        login_user.active = true;
        App {
            state: if logged_in { AppState::Browse } else { AppState::Login },
            page: Page::Overview,
            dashboard: Dashboard::new(gateway, session),
            session_path,
            cost_policy,
            tree: TreeState::new(),
            task_table: TableState::default(),
            manpower_table: TableState::default(),
            selected_task: None,
            task_form: TaskForm::new(),
            manpower_form: ManpowerForm::new(),
            login_user,
            login_password: InputField::masked(),
            pending_delete: None,
            job: if logged_in { Some(Job::Reload) } else { None },
            status_message: String::new(),
            status_is_error: false,
        }
    }

    fn set_status_message(&mut self, msg: impl Into<String>) {
        self.status_message = msg.into();
        self.status_is_error = false;
    }

    pub fn set_error_message(&mut self, msg: impl Into<String>) {
        self.status_message = msg.into();
        self.status_is_error = true;
    }

    fn clear_status_message(&mut self) {
        self.status_message.clear();
        self.status_is_error = false;
    }

    /// Surface the dashboard's error, if the last call left one.
    fn report_dashboard_error(&mut self) {
        if let Some(err) = self.dashboard.take_error() {
            self.set_error_message(err);
        }
    }

    fn can_edit(&self) -> bool {
        self.dashboard.session().can_edit()
    }

    fn require_admin(&mut self) -> bool {
        if self.can_edit() {
            true
        } else {
            self.set_error_message("Admin role required");
            false
        }
    }

    fn is_loading(&self) -> bool {
        self.job.is_some() || self.dashboard.is_busy()
    }

    // ----- selection -------------------------------------------------------

    fn visible_ids(&self) -> Vec<u64> {
        flatten(self.dashboard.tasks(), &self.tree.expanded).iter().map(|r| r.id()).collect()
    }

    /// Keep the selection on a visible row: a hidden task hands it to its
    /// nearest visible ancestor, a vanished one to the first row.
    fn sync_task_selection(&mut self) {
        let ids = self.visible_ids();
        let mut cursor = self.selected_task;
        for _ in 0..=count_nodes(self.dashboard.tasks()) {
            match cursor {
                Some(id) if !ids.contains(&id) => {
                    cursor = find_task(self.dashboard.tasks(), id).and_then(|t| t.parent_task_id);
                }
                _ => break,
            }
        }
        self.selected_task = cursor.filter(|id| ids.contains(id)).or_else(|| ids.first().copied());
        let rows = flatten(self.dashboard.tasks(), &self.tree.expanded);
        self.task_table.select(self.selected_task.and_then(|id| position_of(&rows, id)));
    }

    fn move_task_selection(&mut self, delta: isize) {
        let ids = self.visible_ids();
        let current = self.selected_task.and_then(|id| ids.iter().position(|&x| x == id));
        self.selected_task = step_selection(current, delta, ids.len()).map(|i| ids[i]);
        self.sync_task_selection();
    }

    fn selected(&self) -> Option<&Task> {
        self.selected_task.and_then(|id| find_task(self.dashboard.tasks(), id))
    }

    fn sorted_manpower(&self) -> Vec<&Manpower> {
        let mut records: Vec<&Manpower> = self.dashboard.manpower().iter().collect();
        records.sort_by_key(|m| (m.date, m.id));
        records
    }

    fn move_manpower_selection(&mut self, delta: isize) {
        let len = self.dashboard.manpower().len();
        let next = step_selection(self.manpower_table.selected(), delta, len);
        self.manpower_table.select(next);
    }

    fn selected_manpower(&self) -> Option<&Manpower> {
        let idx = self.manpower_table.selected()?;
        self.sorted_manpower().get(idx).copied()
    }

    // ----- jobs ------------------------------------------------------------

    /// Run the queued network call, if any. Returns whether one ran.
    pub fn run_pending_job(&mut self) -> bool {
        let Some(job) = self.job.take() else {
            return false;
        };
        match job {
            Job::Login => self.perform_login(),
            Job::Reload => self.perform_reload(),
            Job::SaveTask(draft) => {
                let mode = self.task_form.mode.clone();
                let outcome = match &mode {
                    TaskFormMode::Add => self.dashboard.add_task(&draft),
                    TaskFormMode::AddSubtask { parent_id, .. } => {
                        self.dashboard.add_subtask(*parent_id, draft)
                    }
                    TaskFormMode::Edit { id } => self.dashboard.update_task(*id, &draft),
                };
                if outcome.is_applied() {
                    let done = match mode {
                        TaskFormMode::Add => "Task added",
                        TaskFormMode::AddSubtask { parent_id, .. } => {
                            self.tree.set_adding_subtask(parent_id, false);
                            self.tree.set_expanded(parent_id, true);
                            "Subtask added"
                        }
                        TaskFormMode::Edit { id } => {
                            self.tree.set_editing(id, false);
                            "Task updated"
                        }
                    };
                    self.state = AppState::Browse;
                    self.finish_change(outcome, done);
                } else {
                    self.report_dashboard_error();
                }
            }
            Job::SaveManpower(draft) => {
                let outcome = match self.manpower_form.editing {
                    Some(id) => self.dashboard.update_manpower(id, &draft),
                    None => self.dashboard.add_manpower(&draft),
                };
                if outcome.is_applied() {
                    self.state = AppState::Browse;
                    self.finish_change(outcome, "Manpower record saved");
                } else {
                    self.report_dashboard_error();
                }
            }
            Job::Delete(target) => {
                let outcome = match &target {
                    PendingDelete::Task { id, .. } => self.dashboard.delete_task(*id),
                    PendingDelete::Manpower { id, .. } => self.dashboard.delete_manpower(*id),
                };
                self.state = AppState::Browse;
                if outcome.is_applied() {
                    self.finish_change(outcome, "Deleted");
                } else {
                    self.report_dashboard_error();
                }
            }
        }
        true
    }

    /// Status after a change the backend took. A failed reload replaces the
    /// success message with its own error and leaves the old lists on screen.
    fn finish_change(&mut self, outcome: Outcome, done: &str) {
        if outcome == Outcome::Applied {
            self.set_status_message(done);
        } else {
            self.report_dashboard_error();
        }
        self.after_reload();
    }

    fn perform_login(&mut self) {
        let username = self.login_user.trimmed().to_string();
        let password = self.login_password.value.clone();
        self.login_password.clear();
        if !self.dashboard.login(&username, &password) {
            self.report_dashboard_error();
            return;
        }
        if let Err(e) = self.dashboard.session().save(&self.session_path) {
            self.set_error_message(format!("Logged in, but the session was not saved: {e}"));
        }
        self.state = AppState::Browse;
        self.page = Page::Overview;
        self.job = Some(Job::Reload);
    }

    fn perform_reload(&mut self) {
        self.dashboard.load_all();
        self.report_dashboard_error();
        self.after_reload();
    }

    fn after_reload(&mut self) {
        self.tree.prune(self.dashboard.tasks());
        self.sync_task_selection();
        let len = self.dashboard.manpower().len();
        let idx = match (self.manpower_table.selected(), len) {
            (_, 0) => None,
            (Some(i), n) => Some(i.min(n - 1)),
            (None, _) => Some(0),
        };
        self.manpower_table.select(idx);
    }

    fn logout(&mut self) {
        self.dashboard.logout();
        if let Err(e) = Session::clear(&self.session_path) {
            self.set_error_message(format!("Could not remove session file: {e}"));
        } else {
            self.set_status_message("Logged out");
        }
        self.tree = TreeState::new();
        self.selected_task = None;
        self.task_table.select(None);
        self.manpower_table.select(None);
        self.login_password.clear();
        self.state = AppState::Login;
    }

    // ----- input -----------------------------------------------------------

    /// Dispatch one key press. Returns true if the application should quit.
    pub fn handle_key(&mut self, key: KeyEvent) -> bool {
        if key.kind != KeyEventKind::Press {
            return false;
        }
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            return true;
        }
        if self.is_loading() {
            return false;
        }
        self.clear_status_message();
        match self.state {
            AppState::Login => self.handle_login_input(key.code),
            AppState::Browse => self.handle_browse_input(key.code),
            AppState::TaskForm => {
                self.handle_task_form_input(key.code);
                false
            }
            AppState::ManpowerForm => {
                self.handle_manpower_form_input(key.code);
                false
            }
            AppState::Help => {
                self.state = AppState::Browse;
                false
            }
            AppState::Confirm => {
                self.handle_confirm_input(key.code);
                false
            }
        }
    }

    fn handle_login_input(&mut self, key: KeyCode) -> bool {
        match key {
            KeyCode::Esc => return true,
            KeyCode::Tab | KeyCode::BackTab | KeyCode::Up | KeyCode::Down => {
                let to_password = self.login_user.active;
                self.login_user.active = !to_password;
                self.login_password.active = to_password;
            }
            KeyCode::Enter => {
                if self.login_user.trimmed().is_empty() || self.login_password.value.is_empty() {
                    self.set_error_message("Please enter username and password");
                } else {
                    self.job = Some(Job::Login);
                }
            }
            KeyCode::Backspace => self.active_login_field().handle_backspace(),
            KeyCode::Delete => self.active_login_field().handle_delete(),
            KeyCode::Left => self.active_login_field().move_cursor_left(),
            KeyCode::Right => self.active_login_field().move_cursor_right(),
            KeyCode::Char(c) => self.active_login_field().handle_char(c),
            _ => {}
        }
        false
    }

    fn active_login_field(&mut self) -> &mut InputField {
        if self.login_password.active {
            &mut self.login_password
        } else {
            &mut self.login_user
        }
    }

    fn handle_browse_input(&mut self, key: KeyCode) -> bool {
        match key {
            KeyCode::Char('q') | KeyCode::Esc => return true,
            KeyCode::Tab => self.page = self.page.next(),
            KeyCode::Char('h') | KeyCode::F(1) => self.state = AppState::Help,
            KeyCode::Char('L') => self.logout(),
            KeyCode::Char('r') => self.job = Some(Job::Reload),
            _ => match self.page {
                Page::Overview => {}
                Page::Tasks => self.handle_tasks_page_input(key),
                Page::Manpower => self.handle_manpower_page_input(key),
            },
        }
        false
    }

    fn handle_tasks_page_input(&mut self, key: KeyCode) {
        match key {
            KeyCode::Up | KeyCode::Char('k') => self.move_task_selection(-1),
            KeyCode::Down | KeyCode::Char('j') => self.move_task_selection(1),
            KeyCode::PageUp => self.move_task_selection(-10),
            KeyCode::PageDown => self.move_task_selection(10),
            KeyCode::Right => {
                if let Some(id) = self.selected().filter(|t| t.has_subtasks()).map(|t| t.id) {
                    self.tree.set_expanded(id, true);
                }
            }
            KeyCode::Left => {
                let Some(task) = self.selected() else { return };
                let (id, open, parent) =
                    (task.id, task.has_subtasks() && self.tree.is_expanded(task.id), task.parent_task_id);
                if open {
                    self.tree.set_expanded(id, false);
                } else if let Some(pid) = parent {
                    self.selected_task = Some(pid);
                }
                self.sync_task_selection();
            }
            KeyCode::Char(' ') | KeyCode::Enter => {
                if let Some(id) = self.selected().filter(|t| t.has_subtasks()).map(|t| t.id) {
                    self.tree.toggle_expanded(id);
                }
            }
            KeyCode::Char('E') => {
                self.tree.expand_all(self.dashboard.tasks());
                self.sync_task_selection();
            }
            KeyCode::Char('C') => {
                self.tree.collapse_all();
                self.sync_task_selection();
            }
            KeyCode::Char('a') => {
                if self.require_admin() {
                    self.task_form = TaskForm::new();
                    self.state = AppState::TaskForm;
                }
            }
            KeyCode::Char('s') => {
                if !self.require_admin() {
                    return;
                }
                if let Some(parent) = self.selected() {
                    let form = TaskForm::for_subtask(parent);
                    let id = parent.id;
                    self.task_form = form;
                    self.tree.set_adding_subtask(id, true);
                    self.state = AppState::TaskForm;
                }
            }
            KeyCode::Char('e') => {
                if !self.require_admin() {
                    return;
                }
                if let Some(task) = self.selected() {
                    let form = TaskForm::from_task(task);
                    let id = task.id;
                    self.task_form = form;
                    self.tree.set_editing(id, true);
                    self.state = AppState::TaskForm;
                }
            }
            KeyCode::Char('d') => {
                if !self.require_admin() {
                    return;
                }
                if let Some(task) = self.selected() {
                    self.pending_delete = Some(PendingDelete::Task {
                        id: task.id,
                        name: task.name.clone(),
                        subtasks: count_nodes(&task.subtasks),
                    });
                    self.state = AppState::Confirm;
                }
            }
            _ => {}
        }
    }

    fn handle_manpower_page_input(&mut self, key: KeyCode) {
        match key {
            KeyCode::Up | KeyCode::Char('k') => self.move_manpower_selection(-1),
            KeyCode::Down | KeyCode::Char('j') => self.move_manpower_selection(1),
            KeyCode::Char('a') => {
                if self.require_admin() {
                    self.manpower_form = ManpowerForm::new();
                    self.state = AppState::ManpowerForm;
                }
            }
            KeyCode::Char('e') => {
                if !self.require_admin() {
                    return;
                }
                if let Some(record) = self.selected_manpower() {
                    self.manpower_form = ManpowerForm::from_record(record);
                    self.state = AppState::ManpowerForm;
                }
            }
            KeyCode::Char('d') => {
                if !self.require_admin() {
                    return;
                }
                if let Some(record) = self.selected_manpower() {
                    self.pending_delete = Some(PendingDelete::Manpower {
                        id: record.id,
                        label: format!(
                            "{} on {}",
                            record.manpower_type.label(),
                            format_date(record.date)
                        ),
                    });
                    self.state = AppState::Confirm;
                }
            }
            _ => {}
        }
    }

    fn close_task_form(&mut self) {
        match self.task_form.mode {
            TaskFormMode::Edit { id } => self.tree.set_editing(id, false),
            TaskFormMode::AddSubtask { parent_id, .. } => {
                self.tree.set_adding_subtask(parent_id, false)
            }
            TaskFormMode::Add => {}
        }
        self.state = AppState::Browse;
    }

    fn handle_task_form_input(&mut self, key: KeyCode) {
        match key {
            KeyCode::Esc => self.close_task_form(),
            KeyCode::Tab | KeyCode::Down => self.task_form.next_field(),
            KeyCode::BackTab | KeyCode::Up => self.task_form.prev_field(),
            KeyCode::Left => self.task_form.handle_left_right(false),
            KeyCode::Right => self.task_form.handle_left_right(true),
            KeyCode::Backspace => self.task_form.handle_backspace(),
            KeyCode::Delete => self.task_form.handle_delete(),
            KeyCode::Enter => match self.task_form.to_draft() {
                Ok(draft) => self.job = Some(Job::SaveTask(draft)),
                Err(msg) => self.set_error_message(msg),
            },
            KeyCode::Char(c) => self.task_form.handle_char(c),
            _ => {}
        }
    }

    fn handle_manpower_form_input(&mut self, key: KeyCode) {
        match key {
            KeyCode::Esc => self.state = AppState::Browse,
            KeyCode::Tab | KeyCode::Down => self.manpower_form.next_field(),
            KeyCode::BackTab | KeyCode::Up => self.manpower_form.prev_field(),
            KeyCode::Left => self.manpower_form.handle_left_right(false),
            KeyCode::Right => self.manpower_form.handle_left_right(true),
            KeyCode::Backspace => self.manpower_form.handle_backspace(),
            KeyCode::Delete => self.manpower_form.handle_delete(),
            KeyCode::Enter => match self.manpower_form.to_draft() {
                Ok(draft) => self.job = Some(Job::SaveManpower(draft)),
                Err(msg) => self.set_error_message(msg),
            },
            KeyCode::Char(c) => self.manpower_form.handle_char(c),
            _ => {}
        }
    }

    fn handle_confirm_input(&mut self, key: KeyCode) {
        match key {
            KeyCode::Char('y') | KeyCode::Char('Y') | KeyCode::Enter => {
                match self.pending_delete.take() {
                    Some(target) => self.job = Some(Job::Delete(target)),
                    None => self.state = AppState::Browse,
                }
            }
            KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => {
                self.pending_delete = None;
                self.state = AppState::Browse;
            }
            _ => {}
        }
    }

    /// Poll for one keyboard event. Returns true if the application should quit.
    fn handle_input(&mut self) -> io::Result<bool> {
        if event::poll(Duration::from_millis(50))? {
            if let Event::Key(key) = event::read()? {
                return Ok(self.handle_key(key));
            }
        }
        Ok(false)
    }

    // ----- rendering -------------------------------------------------------

    fn render_header(&self, f: &mut Frame, area: Rect) {
        let session = self.dashboard.session();
        let who = format!(
            " {} ({}) ",
            session.username.as_deref().unwrap_or("-"),
            session.role.label()
        );
        let tabs = Tabs::new(Page::ALL.iter().map(|p| p.title()))
            .select(self.page.index())
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .title(Span::styled(
                        "PROJECT DASHBOARD",
                        Style::default().add_modifier(Modifier::BOLD),
                    ))
                    .title_bottom(Line::from(who).alignment(Alignment::Right)),
            )
            .highlight_style(Style::default().fg(Color::White).bg(DARK_PURPLE).add_modifier(Modifier::BOLD));
        f.render_widget(tabs, area);
    }

    fn card(title: &str, value: String, color: Color) -> Paragraph<'static> {
        Paragraph::new(Line::from(Span::styled(
            value,
            Style::default().fg(color).add_modifier(Modifier::BOLD),
        )))
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::ALL).title(title.to_string()))
    }

    fn render_overview(&self, f: &mut Frame, area: Rect) {
        let tasks = self.dashboard.tasks();
        let p = progress(tasks);
        let s = project_summary(tasks, self.cost_policy);
        let m = manpower_summary(self.dashboard.manpower());

        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3),
                Constraint::Length(3),
                Constraint::Length(3),
                Constraint::Min(6),
            ])
            .split(area);

        let quarter = [Constraint::Percentage(25); 4];
        let top = Layout::default().direction(Direction::Horizontal).constraints(quarter).split(rows[0]);
        f.render_widget(Self::card("Total Jobs", p.total.to_string(), Color::White), top[0]);
        f.render_widget(
            Self::card("Completed", format!("{} ({:.1}%)", p.completed, p.completed_percent()), Color::Green),
            top[1],
        );
        f.render_widget(
            Self::card("Stuck", format!("{} ({:.1}%)", p.stuck, p.stuck_percent()), Color::Red),
            top[2],
        );
        f.render_widget(Self::card("Remaining", p.remaining.to_string(), GOLD), top[3]);

        let ratio = (p.completed_percent() / 100.0).clamp(0.0, 1.0);
        let gauge = Gauge::default()
            .block(Block::default().borders(Borders::ALL).title("Progress"))
            .gauge_style(Style::default().fg(DARK_GREEN).bg(Color::Black))
            .ratio(ratio)
            .label(format!("{:.1}% complete", p.completed_percent()));
        f.render_widget(gauge, rows[1]);

        let mid = Layout::default().direction(Direction::Horizontal).constraints(quarter).split(rows[2]);
        f.render_widget(Self::card("Total Duration", format!("{} days", s.total_duration), Color::Cyan), mid[0]);
        f.render_widget(Self::card("Total Est. Cost", format_money(s.total_cost), GOLD), mid[1]);
        f.render_widget(Self::card("Manpower", m.total_manpower.to_string(), Color::White), mid[2]);
        f.render_widget(Self::card("Manpower Cost", format_money(m.total_cost), GOLD), mid[3]);

        let bottom = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(25), Constraint::Percentage(25), Constraint::Percentage(50)])
            .split(rows[3]);

        let bold = Style::default().add_modifier(Modifier::BOLD);
        let by_type: Vec<Row> = ManpowerType::ALL
            .iter()
            .filter_map(|k| m.by_type.get(k).map(|n| Row::new(vec![k.label().to_string(), n.to_string()])))
            .collect();
        let table = Table::new(by_type, [Constraint::Min(12), Constraint::Length(6)])
            .header(Row::new(vec!["Type", "Count"]).style(bold))
            .block(Block::default().borders(Borders::ALL).title("By Type"));
        f.render_widget(table, bottom[0]);

        let by_work: Vec<Row> = WorkCategory::ALL
            .iter()
            .filter_map(|w| m.by_work.get(w).map(|n| Row::new(vec![w.label().to_string(), n.to_string()])))
            .collect();
        let table = Table::new(by_work, [Constraint::Min(15), Constraint::Length(6)])
            .header(Row::new(vec!["Work", "Count"]).style(bold))
            .block(Block::default().borders(Borders::ALL).title("By Work"));
        f.render_widget(table, bottom[1]);

        let mut header = vec!["Date".to_string()];
        header.extend(ManpowerType::ALL.iter().map(|k| k.label().to_string()));
        let by_date: Vec<Row> = m
            .by_date
            .iter()
            .map(|(date, kinds)| {
                let mut cells = vec![date.format("%Y-%m-%d").to_string()];
                cells.extend(
                    ManpowerType::ALL.iter().map(|k| kinds.get(k).copied().unwrap_or(0).to_string()),
                );
                Row::new(cells)
            })
            .collect();
        let mut widths = vec![Constraint::Length(11)];
        widths.extend([Constraint::Length(10); 4]);
        let table = Table::new(by_date, widths)
            .header(Row::new(header).style(bold))
            .block(Block::default().borders(Borders::ALL).title("By Date"));
        f.render_widget(table, bottom[2]);
    }

    fn render_tasks(&mut self, f: &mut Frame, area: Rect) {
        let rows_view = flatten(self.dashboard.tasks(), &self.tree.expanded);
        let total = count_nodes(self.dashboard.tasks());

        let rows: Vec<Row> = rows_view
            .iter()
            .map(|row| {
                let t = row.task;
                let mut label = format!("{}{}", row.prefix(), t.name);
                let subtasks = row.subtask_label();
                if !subtasks.is_empty() {
                    label.push_str(&format!(" ({subtasks})"));
                }
                if self.tree.is_editing(t.id) {
                    label.push_str(" [editing]");
                }
                if self.tree.is_adding_subtask(t.id) {
                    label.push_str(" [+subtask]");
                }
                let style = match t.status {
                    TaskStatus::Completed => Style::default().fg(Color::DarkGray),
                    _ if row.depth == 0 => Style::default().add_modifier(Modifier::BOLD),
                    _ => Style::default(),
                };
                Row::new(vec![
                    Cell::from(label),
                    Cell::from(t.status.label()).style(Style::default().fg(status_color(t.status))),
                    Cell::from(truncate(t.owner.as_deref().unwrap_or("-"), 12)),
                    Cell::from(format!("{} → {}", format_date(t.start_time), format_date(t.due_time))),
                    Cell::from(format!("{}d", t.est_duration)),
                    Cell::from(format_money(t.est_cost)),
                    Cell::from(format!("{}/{}", t.completed, t.total_job)),
                    Cell::from(t.stuck.to_string()),
                    Cell::from(format!("{:.0}%", task_percent(t))),
                ])
                .style(style)
            })
            .collect();

        let header = Row::new(
            ["Task", "Status", "Owner", "Schedule", "Days", "Est. Cost", "Done", "Stuck", "%"]
                .iter()
                .map(|h| Cell::from(*h).style(Style::default().add_modifier(Modifier::BOLD))),
        )
        .style(Style::default().bg(DARK_PURPLE).fg(Color::White))
        .height(1);

        let widths = [
            Constraint::Min(30),
            Constraint::Length(12),
            Constraint::Length(12),
            Constraint::Length(25),
            Constraint::Length(5),
            Constraint::Length(12),
            Constraint::Length(9),
            Constraint::Length(6),
            Constraint::Length(5),
        ];

        let title = if total == 0 {
            "Tasks - no tasks yet".to_string()
        } else {
            format!("Tasks ({}/{} shown) - Press 'h' for help", rows_view.len(), total)
        };
        let table = Table::new(rows, widths)
            .header(header)
            .block(Block::default().borders(Borders::ALL).title(title))
            .row_highlight_style(Style::default().bg(Color::Gray).fg(Color::Black))
            .highlight_symbol(">> ");

        f.render_stateful_widget(table, area, &mut self.task_table);
    }

    fn render_manpower(&mut self, f: &mut Frame, area: Rect) {
        let records = {
            let mut records: Vec<&Manpower> = self.dashboard.manpower().iter().collect();
            records.sort_by_key(|m| (m.date, m.id));
            records
        };
        let rows: Vec<Row> = records
            .iter()
            .map(|m| {
                let daily = m.perday_cost.map(|c| c * f64::from(m.headcount()));
                Row::new(vec![
                    format_date(m.date),
                    m.manpower_type.label().to_string(),
                    m.engaged_to.label().to_string(),
                    m.headcount().to_string(),
                    m.perday_cost.map(format_money).unwrap_or_else(|| "-".into()),
                    daily.map(format_money).unwrap_or_else(|| "-".into()),
                ])
            })
            .collect();
        let header = Row::new(["Date", "Type", "Engaged To", "Count", "Per Day", "Daily Total"])
            .style(Style::default().bg(DARK_PURPLE).fg(Color::White).add_modifier(Modifier::BOLD));
        let widths = [
            Constraint::Length(11),
            Constraint::Length(11),
            Constraint::Length(15),
            Constraint::Length(6),
            Constraint::Length(12),
            Constraint::Min(12),
        ];
        let title = format!("Manpower ({} records) - Press 'h' for help", records.len());
        let table = Table::new(rows, widths)
            .header(header)
            .block(Block::default().borders(Borders::ALL).title(title))
            .row_highlight_style(Style::default().bg(Color::Gray).fg(Color::Black))
            .highlight_symbol(">> ");
        f.render_stateful_widget(table, area, &mut self.manpower_table);
    }

    fn input_box<'a>(label: &'a str, text: String, focused: bool) -> Paragraph<'a> {
        let style = if focused { Style::default().fg(GOLD) } else { Style::default() };
        Paragraph::new(text).block(Block::default().borders(Borders::ALL).title(label).border_style(style))
    }

    fn render_task_form(&self, f: &mut Frame, area: Rect) {
        let area = centered_rect(80, 90, area);
        f.render_widget(Clear, area);
        let outer = Block::default()
            .borders(Borders::ALL)
            .title(self.task_form.title())
            .border_style(Style::default().fg(GOLD));
        let inner = outer.inner(area);
        f.render_widget(outer, area);

        let columns = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
            .split(inner);
        let left = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(3); 6])
            .split(columns[0]);
        let right = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3),
                Constraint::Length(3),
                Constraint::Length(3),
                Constraint::Length(3),
                Constraint::Length(3),
                Constraint::Min(2),
            ])
            .split(columns[1]);

        let form = &self.task_form;
        let cur = form.current_field;
        f.render_widget(Self::input_box("Name *", form.name.value.clone(), cur == NAME_GLOBAL_ORDER), left[0]);
        f.render_widget(Self::input_box("Owner", form.owner.value.clone(), cur == OWNER_GLOBAL_ORDER), left[1]);
        f.render_widget(
            Self::input_box("Description", form.description.value.clone(), cur == DESCRIPTION_GLOBAL_ORDER),
            left[2],
        );
        f.render_widget(
            Self::input_box(
                "Status",
                format!("< {} >", form.selected_status().label()),
                cur == STATUS_GLOBAL_ORDER,
            ),
            left[3],
        );
        f.render_widget(
            Self::input_box("Start Date * (YYYY-MM-DD)", form.start.value.clone(), cur == START_GLOBAL_ORDER),
            left[4],
        );
        f.render_widget(
            Self::input_box("End Date * (YYYY-MM-DD)", form.due.value.clone(), cur == DUE_GLOBAL_ORDER),
            left[5],
        );
        f.render_widget(
            Self::input_box("Est. Duration (days)", form.duration.value.clone(), cur == DURATION_GLOBAL_ORDER),
            right[0],
        );
        f.render_widget(Self::input_box("Est. Cost", form.cost.value.clone(), cur == COST_GLOBAL_ORDER), right[1]);
        f.render_widget(
            Self::input_box("Total Job", form.total_job.value.clone(), cur == TOTAL_JOB_GLOBAL_ORDER),
            right[2],
        );
        f.render_widget(
            Self::input_box("Completed Qty", form.completed.value.clone(), cur == COMPLETED_GLOBAL_ORDER),
            right[3],
        );
        f.render_widget(Self::input_box("Stuck Qty", form.stuck.value.clone(), cur == STUCK_GLOBAL_ORDER), right[4]);
        let hint = Paragraph::new(vec![
            Line::from("Tab/↑↓ move  ←/→ cursor or status  Enter save  Esc cancel"),
            Line::from("Editing end date recomputes duration; editing duration recomputes end date."),
        ])
        .style(Style::default().fg(Color::DarkGray))
        .wrap(Wrap { trim: true });
        f.render_widget(hint, right[5]);
    }

    fn render_manpower_form(&self, f: &mut Frame, area: Rect) {
        let area = centered_rect(50, 70, area);
        f.render_widget(Clear, area);
        let outer = Block::default()
            .borders(Borders::ALL)
            .title(self.manpower_form.title())
            .border_style(Style::default().fg(GOLD));
        let inner = outer.inner(area);
        f.render_widget(outer, area);
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3),
                Constraint::Length(3),
                Constraint::Length(3),
                Constraint::Length(3),
                Constraint::Length(3),
                Constraint::Min(1),
            ])
            .split(inner);
        let form = &self.manpower_form;
        let cur = form.current_field;
        f.render_widget(
            Self::input_box("Date * (YYYY-MM-DD)", form.date.value.clone(), cur == DATE_GLOBAL_ORDER),
            chunks[0],
        );
        f.render_widget(
            Self::input_box(
                "Manpower Type",
                format!("< {} >", form.selected_type().label()),
                cur == TYPE_GLOBAL_ORDER,
            ),
            chunks[1],
        );
        f.render_widget(
            Self::input_box(
                "Engaged To",
                format!("< {} >", form.selected_work().label()),
                cur == WORK_GLOBAL_ORDER,
            ),
            chunks[2],
        );
        f.render_widget(
            Self::input_box("Number of Manpower", form.count.value.clone(), cur == COUNT_GLOBAL_ORDER),
            chunks[3],
        );
        f.render_widget(
            Self::input_box("Per-day Cost (optional)", form.cost.value.clone(), cur == MP_COST),
            chunks[4],
        );
        let hint = Paragraph::new("Tab/↑↓ move  ←/→ change selector  Enter save  Esc cancel")
            .style(Style::default().fg(Color::DarkGray));
        f.render_widget(hint, chunks[5]);
    }

    fn render_login(&self, f: &mut Frame, area: Rect) {
        let area = centered_rect(40, 50, area);
        f.render_widget(Clear, area);
        let outer = Block::default()
            .borders(Borders::ALL)
            .title("Sign in")
            .border_style(Style::default().fg(DARK_PURPLE));
        let inner = outer.inner(area);
        f.render_widget(outer, area);
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(2),
                Constraint::Length(3),
                Constraint::Length(3),
                Constraint::Min(1),
            ])
            .split(inner);
        let title = Paragraph::new(Span::styled(
            "PROJECT DASHBOARD",
            Style::default().add_modifier(Modifier::BOLD),
        ))
        .alignment(Alignment::Center);
        f.render_widget(title, chunks[0]);
        f.render_widget(
            Self::input_box("Username", self.login_user.display(), self.login_user.active),
            chunks[1],
        );
        f.render_widget(
            Self::input_box("Password", self.login_password.display(), self.login_password.active),
            chunks[2],
        );
        let hint = Paragraph::new("Tab switch field  Enter sign in  Esc quit")
            .style(Style::default().fg(Color::DarkGray))
            .alignment(Alignment::Center);
        f.render_widget(hint, chunks[3]);

        let field = if self.login_password.active { &self.login_password } else { &self.login_user };
        let chunk = if self.login_password.active { chunks[2] } else { chunks[1] };
        let x = chunk.x + 1 + (field.cursor as u16).min(chunk.width.saturating_sub(3));
        f.set_cursor_position((x, chunk.y + 1));
    }

    fn render_help(&self, f: &mut Frame, area: Rect) {
        let bold = Style::default().add_modifier(Modifier::BOLD);
        let mut help_text = vec![
            Line::from(Span::styled("Project Dashboard Help", bold)),
            Line::from(""),
            Line::from(Span::styled("Everywhere:", bold)),
            Line::from("  Tab          Next page (Overview, Tasks, Manpower)"),
            Line::from("  r            Reload from the server"),
            Line::from("  L            Log out"),
            Line::from("  h/F1         Show this help"),
            Line::from("  q/Esc        Quit"),
            Line::from(""),
            Line::from(Span::styled("Tasks page:", bold)),
            Line::from("  ↑/↓, k/j     Move selection"),
            Line::from("  →/←          Expand / collapse (← on a collapsed row jumps to its parent)"),
            Line::from("  Space/Enter  Toggle expand"),
            Line::from("  E / C        Expand all / collapse all"),
        ];
        if self.can_edit() {
            help_text.extend([
                Line::from("  a            Add main task"),
                Line::from("  s            Add subtask under selection"),
                Line::from("  e            Edit selected task"),
                Line::from("  d            Delete selected task (and its subtasks)"),
                Line::from(""),
                Line::from(Span::styled("Manpower page:", bold)),
                Line::from("  a / e / d    Add / edit / delete record"),
                Line::from(""),
                Line::from(Span::styled("Forms:", bold)),
                Line::from("  Tab/↑↓       Move between fields"),
                Line::from("  ←/→          Move cursor or change a selector"),
                Line::from("  Enter        Save"),
                Line::from("  Esc          Cancel"),
            ]);
        } else {
            help_text.extend([
                Line::from(""),
                Line::from("Guest accounts have read-only access."),
            ]);
        }
        let paragraph = Paragraph::new(help_text)
            .block(Block::default().borders(Borders::ALL).title("Help - Press any key to return"))
            .wrap(Wrap { trim: false });
        f.render_widget(paragraph, area);
    }

    fn render_confirm(&self, f: &mut Frame, area: Rect) {
        let block = Block::default()
            .title("Confirm Delete")
            .borders(Borders::ALL)
            .style(Style::default().bg(DARK_RED));
        let area = centered_rect(50, 30, area);
        f.render_widget(Clear, area);

        let mut text = vec![
            Line::from(""),
            Line::from(Span::styled(
                "Are you sure you want to delete:",
                Style::default().add_modifier(Modifier::BOLD),
            )),
        ];
        match &self.pending_delete {
            Some(PendingDelete::Task { name, subtasks, .. }) => {
                text.push(Line::from(format!("Task '{name}'")));
                if *subtasks > 0 {
                    text.push(Line::from(""));
                    text.push(Line::from(Span::styled(
                        format!("This will also delete all its subtasks! ({subtasks})"),
                        Style::default().fg(GOLD).add_modifier(Modifier::BOLD),
                    )));
                }
            }
            Some(PendingDelete::Manpower { label, .. }) => {
                text.push(Line::from(format!("Manpower record: {label}")));
            }
            None => {}
        }
        text.extend([
            Line::from(""),
            Line::from("This action cannot be undone."),
            Line::from(""),
            Line::from("Press 'y' to confirm, 'n' to cancel"),
        ]);
        let paragraph = Paragraph::new(text)
            .block(block)
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true });
        f.render_widget(paragraph, area);
    }

    /// Text for the status bar: loading, then any message, then key hints.
    pub fn status_text(&self) -> String {
        if self.is_loading() {
            return LOADING.to_string();
        }
        if !self.status_message.is_empty() {
            return self.status_message.clone();
        }
        let edit = self.can_edit();
        match (self.state, self.page) {
            (AppState::Login, _) => "Sign in to continue".to_string(),
            (AppState::Browse, Page::Overview) => "Tab pages | r reload | L logout | h help | q quit".to_string(),
            (AppState::Browse, Page::Tasks) if edit => {
                "←/→ collapse/expand | E/C all | a add | s subtask | e edit | d delete | h help".to_string()
            }
            (AppState::Browse, Page::Tasks) => "←/→ collapse/expand | E/C all | r reload | h help".to_string(),
            (AppState::Browse, Page::Manpower) if edit => {
                "↑/↓ select | a add | e edit | d delete | r reload | h help".to_string()
            }
            (AppState::Browse, Page::Manpower) => "↑/↓ select | r reload | h help".to_string(),
            (AppState::TaskForm, _) => self.task_form.title(),
            (AppState::ManpowerForm, _) => self.manpower_form.title(),
            (AppState::Help, _) => "Help".to_string(),
            (AppState::Confirm, _) => "Confirm Delete".to_string(),
        }
    }

    fn render_status_bar(&self, f: &mut Frame, area: Rect) {
        let (bg, fg) = if self.is_loading() {
            (GOLD, Color::Rgb(20, 20, 20))
        } else if self.status_is_error {
            (DARK_RED, Color::White)
        } else {
            (DARK_PURPLE, Color::White)
        };
        let status = Paragraph::new(self.status_text())
            .style(Style::default().bg(bg).fg(fg))
            .alignment(Alignment::Left);
        f.render_widget(status, area);
    }

    fn render_page(&mut self, f: &mut Frame, area: Rect) {
        match self.page {
            Page::Overview => self.render_overview(f, area),
            Page::Tasks => self.render_tasks(f, area),
            Page::Manpower => self.render_manpower(f, area),
        }
    }

    /// Main render function that dispatches to appropriate view renderers.
    fn render(&mut self, f: &mut Frame) {
        let area = f.area();
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(3), Constraint::Min(0), Constraint::Length(1)])
            .split(area);

        if self.state == AppState::Login {
            self.render_login(f, area);
            self.render_status_bar(f, chunks[2]);
            return;
        }

        self.render_header(f, chunks[0]);
        match self.state {
            AppState::Help => self.render_help(f, chunks[1]),
            AppState::TaskForm => {
                self.render_page(f, chunks[1]);
                self.render_task_form(f, chunks[1]);
            }
            AppState::ManpowerForm => {
                self.render_page(f, chunks[1]);
                self.render_manpower_form(f, chunks[1]);
            }
            AppState::Confirm => {
                self.render_page(f, chunks[1]);
                self.render_confirm(f, chunks[1]);
            }
            AppState::Browse | AppState::Login => self.render_page(f, chunks[1]),
        }
        self.render_status_bar(f, chunks[2]);
    }

    /// Main event loop: draw, run a queued network call if there is one, else read a key.
    pub fn run<B: Backend>(&mut self, terminal: &mut Terminal<B>) -> io::Result<()> {
        loop {
            terminal.draw(|f| self.render(f))?;

            if self.run_pending_job() {
                continue;
            }
            if self.handle_input()? {
                break;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dashboard::fake::FakeGateway;
    use crate::session::Role;
    use crate::task::fixtures::*;
    use ratatui::backend::TestBackend;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn press(app: &mut App<FakeGateway>, codes: &[KeyCode]) {
        for &code in codes {
            assert!(!app.handle_key(key(code)));
            while app.run_pending_job() {}
        }
    }

    fn type_text(app: &mut App<FakeGateway>, text: &str) {
        for c in text.chars() {
            app.handle_key(key(KeyCode::Char(c)));
        }
    }

    fn scratch_session(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("pd-app-{}-{name}", std::process::id())).join("session.json")
    }

    fn admin_app(name: &str) -> App<FakeGateway> {
        let gw = FakeGateway::admin();
        gw.tasks.borrow_mut().extend([
            task(1, None, vec![]),
            task(2, Some(1), vec![]),
            task(4, Some(2), vec![]),
            task(3, Some(1), vec![]),
            task(5, None, vec![]),
        ]);
        gw.manpower
            .borrow_mut()
            .extend([manpower(10, "2025-01-03", ManpowerType::Labour, 3), manpower(11, "2025-01-01", ManpowerType::Admin, 1)]);
        let session = Session::authenticated("token-boss".into(), "boss".into(), Role::Admin);
        let mut app = App::new(gw, session, scratch_session(name), CostPolicy::MainTasks);
        while app.run_pending_job() {}
        app
    }

    #[test]
    fn stored_session_loads_on_start() {
        let app = admin_app("start");
        assert_eq!(app.state, AppState::Browse);
        assert_eq!(app.dashboard.tasks().len(), 2);
        assert_eq!(app.selected_task, Some(1));
        assert_eq!(app.task_table.selected(), Some(0));
        assert_eq!(app.manpower_table.selected(), Some(0));
    }

    #[test]
    fn expand_collapse_moves_selection_to_visible_rows() {
        let mut app = admin_app("tree");
        press(&mut app, &[KeyCode::Tab, KeyCode::Char('E'), KeyCode::Down, KeyCode::Down]);
        assert_eq!(app.selected_task, Some(4));
        assert_eq!(app.task_table.selected(), Some(2));

        press(&mut app, &[KeyCode::Char('C')]);
        assert_eq!(app.selected_task, Some(1));
        assert_eq!(app.visible_ids(), vec![1, 5]);

        press(&mut app, &[KeyCode::Right, KeyCode::Down, KeyCode::Left]);
        assert_eq!(app.selected_task, Some(1));
        press(&mut app, &[KeyCode::Left]);
        assert_eq!(app.visible_ids(), vec![1, 5]);
    }

    #[test]
    fn add_subtask_round_trip() {
        let mut app = admin_app("subtask");
        press(&mut app, &[KeyCode::Tab, KeyCode::Char('s')]);
        assert_eq!(app.state, AppState::TaskForm);
        assert!(app.tree.is_adding_subtask(1));

        type_text(&mut app, "Wiring");
        press(&mut app, &[KeyCode::Tab, KeyCode::Tab, KeyCode::Tab, KeyCode::Tab]);
        type_text(&mut app, "2025-02-01");
        press(&mut app, &[KeyCode::Tab, KeyCode::Tab]);
        type_text(&mut app, "3");
        press(&mut app, &[KeyCode::Tab]);
        assert_eq!(app.task_form.due.value, "2025-02-04");
        press(&mut app, &[KeyCode::Enter]);

        assert_eq!(app.state, AppState::Browse);
        assert!(!app.tree.is_adding_subtask(1));
        assert!(app.tree.is_expanded(1));
        let parent = find_task(app.dashboard.tasks(), 1).unwrap();
        assert_eq!(parent.subtasks.last().map(|t| t.name.as_str()), Some("Wiring"));
        assert_eq!(app.status_text(), "Subtask added");
    }

    #[test]
    fn failed_save_keeps_form_open_with_one_message() {
        let mut app = admin_app("fail");
        app.dashboard_gateway().fail_on.set(Some("create_task"));
        press(&mut app, &[KeyCode::Tab, KeyCode::Char('a')]);
        type_text(&mut app, "Roof");
        app.task_form.start.set("2025-03-01");
        app.task_form.due.set("2025-03-02");
        press(&mut app, &[KeyCode::Enter]);
        assert_eq!(app.state, AppState::TaskForm);
        assert_eq!(app.status_text(), "Failed to add task");
        assert!(app.status_is_error);
        assert_eq!(count_nodes(app.dashboard.tasks()), 5);
    }

    #[test]
    fn saved_change_closes_form_even_if_reload_fails() {
        let mut app = admin_app("stale");
        app.dashboard_gateway().fail_on.set(Some("list_tasks"));
        press(&mut app, &[KeyCode::Tab, KeyCode::Char('a')]);
        type_text(&mut app, "Roof");
        app.task_form.start.set("2025-03-01");
        app.task_form.due.set("2025-03-02");
        press(&mut app, &[KeyCode::Enter]);
        assert_eq!(app.state, AppState::Browse);
        assert_eq!(app.status_text(), "Failed to fetch tasks");
        assert!(app.status_is_error);
        // The stale tree stays until the next successful reload.
        assert_eq!(count_nodes(app.dashboard.tasks()), 5);

        press(&mut app, &[KeyCode::Enter]);
        let roofs = app.dashboard_gateway().tasks.borrow().iter().filter(|t| t.name == "Roof").count();
        assert_eq!(roofs, 1);
    }

    #[test]
    fn stale_subtask_save_clears_marker() {
        let mut app = admin_app("stale-sub");
        press(&mut app, &[KeyCode::Tab, KeyCode::Char('s')]);
        assert!(app.tree.is_adding_subtask(1));
        app.dashboard_gateway().fail_on.set(Some("list_tasks"));
        type_text(&mut app, "Wiring");
        app.task_form.start.set("2025-03-01");
        app.task_form.due.set("2025-03-02");
        press(&mut app, &[KeyCode::Enter]);
        assert_eq!(app.state, AppState::Browse);
        assert!(!app.tree.is_adding_subtask(1));
    }

    #[test]
    fn delete_asks_for_confirmation() {
        let mut app = admin_app("delete");
        press(&mut app, &[KeyCode::Tab, KeyCode::Char('d')]);
        assert_eq!(app.state, AppState::Confirm);
        assert_eq!(
            app.pending_delete,
            Some(PendingDelete::Task { id: 1, name: "task 1".into(), subtasks: 3 })
        );
        press(&mut app, &[KeyCode::Char('n')]);
        assert_eq!(app.state, AppState::Browse);
        assert_eq!(app.dashboard.tasks().len(), 2);

        press(&mut app, &[KeyCode::Down, KeyCode::Char('d'), KeyCode::Char('y')]);
        assert_eq!(app.dashboard.tasks().len(), 1);
        assert_eq!(app.selected_task, Some(1));
    }

    #[test]
    fn guest_gets_no_mutations() {
        let gw = FakeGateway::default();
        gw.tasks.borrow_mut().push(task(1, None, vec![]));
        let session = Session::authenticated("t".into(), "viewer".into(), Role::Guest);
        let mut app = App::new(gw, session, scratch_session("guest"), CostPolicy::MainTasks);
        while app.run_pending_job() {}
        press(&mut app, &[KeyCode::Tab, KeyCode::Char('a')]);
        assert_eq!(app.state, AppState::Browse);
        assert_eq!(app.status_text(), "Admin role required");
        press(&mut app, &[KeyCode::Char('d')]);
        assert_eq!(app.state, AppState::Browse);
        assert!(!app.status_text().contains("a add"));
    }

    #[test]
    fn login_then_logout() {
        let path = scratch_session("login");
        let mut app = App::new(FakeGateway::admin(), Session::anonymous(), path.clone(), CostPolicy::MainTasks);
        assert_eq!(app.state, AppState::Login);
        press(&mut app, &[KeyCode::Enter]);
        assert_eq!(app.status_text(), "Please enter username and password");

        type_text(&mut app, "boss");
        press(&mut app, &[KeyCode::Tab]);
        type_text(&mut app, "pw");
        assert_eq!(app.login_password.display(), "••");
        press(&mut app, &[KeyCode::Enter]);
        assert_eq!(app.state, AppState::Browse);
        assert_eq!(Session::load(&path).unwrap().role, Role::Admin);

        press(&mut app, &[KeyCode::Char('L')]);
        assert_eq!(app.state, AppState::Login);
        assert!(app.dashboard.tasks().is_empty());
        assert!(!Session::load(&path).unwrap().is_authenticated());
    }

    #[test]
    fn loading_shows_before_the_call() {
        let mut app = admin_app("loading");
        app.handle_key(key(KeyCode::Char('r')));
        assert_eq!(app.status_text(), LOADING);
        // Keys are ignored while a call is queued.
        app.handle_key(key(KeyCode::Tab));
        assert_eq!(app.page, Page::Overview);
        assert!(app.run_pending_job());
        assert!(!app.is_loading());
    }

    #[test]
    fn renders_every_page() {
        let mut app = admin_app("render");
        let mut terminal = Terminal::new(TestBackend::new(140, 40)).unwrap();
        for _ in Page::ALL {
            terminal.draw(|f| app.render(f)).unwrap();
            press(&mut app, &[KeyCode::Tab]);
        }
        press(&mut app, &[KeyCode::Tab, KeyCode::Char('E')]);
        terminal.draw(|f| app.render(f)).unwrap();
        let text: String = terminal.backend().buffer().content.iter().map(|c| c.symbol()).collect();
        assert!(text.contains("├─▼ task 2"));
        assert!(text.contains("└─• task 3"));
    }

    #[test]
    fn overview_lists_days_in_date_order() {
        let mut app = admin_app("by-date");
        app.dashboard_gateway()
            .manpower
            .borrow_mut()
            .extend([manpower(12, "2025-02-01", ManpowerType::Admin, 2), manpower(13, "2025-01-31", ManpowerType::Engineer, 1)]);
        press(&mut app, &[KeyCode::Char('r')]);
        let mut terminal = Terminal::new(TestBackend::new(160, 40)).unwrap();
        terminal.draw(|f| app.render(f)).unwrap();
        let text: String = terminal.backend().buffer().content.iter().map(|c| c.symbol()).collect();
        let days: Vec<usize> = ["2025-01-01", "2025-01-03", "2025-01-31", "2025-02-01"]
            .iter()
            .map(|d| text.find(d).unwrap())
            .collect();
        assert!(days.windows(2).all(|w| w[0] < w[1]), "{days:?}");
        assert!(text.contains("By Date"));
        assert!(!text.contains("newest first"));
        assert!(text.contains("Manpower Cost"));
    }

    impl App<FakeGateway> {
        fn dashboard_gateway(&self) -> &FakeGateway {
            self.dashboard.gateway()
        }
    }
}
