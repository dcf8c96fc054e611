//! Dashboard orchestration over a `Gateway`.
//!
//! Holds the last fetched task forest and manpower list together with the session,
//! a busy flag and at most one error message. Every mutation runs the remote call,
//! refetches the affected collection on success, and on failure leaves the loaded
//! data untouched and records one generic message. The busy flag is cleared on
//! every exit path.

use crate::error::GatewayError;
use crate::gateway::Gateway;
use crate::session::{Role, Session};
use crate::task::{assemble_forest, Manpower, ManpowerDraft, Task, TaskDraft};

pub const FETCH_TASKS_FAILED: &str = "Failed to fetch tasks";
pub const FETCH_MANPOWER_FAILED: &str = "Failed to fetch manpower data";
pub const LOGIN_FAILED: &str = "Invalid username or password";
pub const ADMIN_REQUIRED: &str = "Admin role required";

/// Which collection a successful mutation invalidates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Refetch {
    Tasks,
    Manpower,
}

/// What a create, update or delete did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The backend took the change and the list was reloaded.
    Applied,
    /// The backend took the change but the reload failed; the list on hand is stale.
    AppliedStale,
    Failed,
}

impl Outcome {
    /// True when the backend holds the change, whether or not the reload worked.
    pub fn is_applied(self) -> bool {
        !matches!(self, Outcome::Failed)
    }
}

pub struct Dashboard<G: Gateway> {
    gateway: G,
    session: Session,
    tasks: Vec<Task>,
    manpower: Vec<Manpower>,
    busy: bool,
    error: Option<String>,
}

impl<G: Gateway> Dashboard<G> {
    pub fn new(mut gateway: G, session: Session) -> Self {
        gateway.set_token(session.token.clone());
        Dashboard {
            gateway,
            session,
            tasks: Vec::new(),
            manpower: Vec::new(),
            busy: false,
            error: None,
        }
    }

    #[cfg(test)]
    pub(crate) fn gateway(&self) -> &G {
        &self.gateway
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn manpower(&self) -> &[Manpower] {
        &self.manpower
    }

    pub fn is_busy(&self) -> bool {
        self.busy
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn take_error(&mut self) -> Option<String> {
        self.error.take()
    }

    /// Exchange credentials for a token, then resolve the role.
    ///
    /// If the user lookup fails after a successful login the session falls back
    /// to the guest role.
    pub fn login(&mut self, username: &str, password: &str) -> bool {
        if !self.begin() {
            return false;
        }
        let ok = match self.gateway.login(username, password) {
            Ok(token) => {
                let (name, role) = match self.gateway.current_user(&token) {
                    Ok(user) => (user.username, Role::from_is_admin(user.is_admin)),
                    Err(_) => (username.to_string(), Role::Guest),
                };
                self.gateway.set_token(Some(token.clone()));
                self.session = Session::authenticated(token, name, role);
                true
            }
            Err(_) => {
                self.error = Some(LOGIN_FAILED.to_string());
                false
            }
        };
        self.busy = false;
        ok
    }

    /// Forget the token and every loaded record.
    pub fn logout(&mut self) {
        self.gateway.set_token(None);
        self.session = Session::anonymous();
        self.tasks.clear();
        self.manpower.clear();
        self.error = None;
    }

    pub fn load_tasks(&mut self) -> bool {
        if !self.begin() {
            return false;
        }
        let ok = self.refetch(Refetch::Tasks);
        self.busy = false;
        ok
    }

    pub fn load_manpower(&mut self) -> bool {
        if !self.begin() {
            return false;
        }
        let ok = self.refetch(Refetch::Manpower);
        self.busy = false;
        ok
    }

    /// Reload both collections; stops at the first failure.
    pub fn load_all(&mut self) -> bool {
        self.load_tasks() && self.load_manpower()
    }

    pub fn add_task(&mut self, draft: &TaskDraft) -> Outcome {
        self.mutate("Failed to add task", Refetch::Tasks, |g| g.create_task(draft).map(drop))
    }

    pub fn add_subtask(&mut self, parent_id: u64, draft: TaskDraft) -> Outcome {
        let draft = draft.under(parent_id);
        self.mutate("Failed to add subtask", Refetch::Tasks, |g| g.create_task(&draft).map(drop))
    }

    pub fn update_task(&mut self, id: u64, draft: &TaskDraft) -> Outcome {
        self.mutate("Failed to update task", Refetch::Tasks, |g| {
            g.update_task(id, draft).map(drop)
        })
    }

    pub fn delete_task(&mut self, id: u64) -> Outcome {
        self.mutate("Failed to delete task", Refetch::Tasks, |g| g.delete_task(id).map(drop))
    }

    pub fn add_manpower(&mut self, draft: &ManpowerDraft) -> Outcome {
        self.mutate("Failed to add manpower record", Refetch::Manpower, |g| {
            g.create_manpower(draft).map(drop)
        })
    }

    pub fn update_manpower(&mut self, id: u64, draft: &ManpowerDraft) -> Outcome {
        self.mutate("Failed to update manpower record", Refetch::Manpower, |g| {
            g.update_manpower(id, draft).map(drop)
        })
    }

    pub fn delete_manpower(&mut self, id: u64) -> Outcome {
        self.mutate("Failed to delete manpower record", Refetch::Manpower, |g| {
            g.delete_manpower(id).map(drop)
        })
    }

    /// Mark busy and drop the previous message; refuses while a call is in flight.
    fn begin(&mut self) -> bool {
        if self.busy {
            return false;
        }
        self.busy = true;
        self.error = None;
        true
    }

    fn mutate<F>(&mut self, failure: &str, refetch: Refetch, call: F) -> Outcome
    where
        F: FnOnce(&G) -> Result<(), GatewayError>,
    {
        if !self.session.can_edit() {
            self.error = Some(ADMIN_REQUIRED.to_string());
            return Outcome::Failed;
        }
        if !self.begin() {
            return Outcome::Failed;
        }
        let outcome = match call(&self.gateway) {
            Ok(()) if self.refetch(refetch) => Outcome::Applied,
            Ok(()) => Outcome::AppliedStale,
            Err(_) => {
                self.error = Some(failure.to_string());
                Outcome::Failed
            }
        };
        self.busy = false;
        outcome
    }

    fn refetch(&mut self, which: Refetch) -> bool {
        match which {
            Refetch::Tasks => match self.gateway.list_tasks() {
                Ok(tasks) => {
                    self.tasks = assemble_forest(tasks);
                    true
                }
                Err(_) => {
                    self.error = Some(FETCH_TASKS_FAILED.to_string());
                    false
                }
            },
            Refetch::Manpower => match self.gateway.list_manpower() {
                Ok(records) => {
                    self.manpower = records;
                    true
                }
                Err(_) => {
                    self.error = Some(FETCH_MANPOWER_FAILED.to_string());
                    false
                }
            },
        }
    }
}

#[cfg(test)]
pub(crate) mod fake {
    use std::cell::{Cell, RefCell};

    use chrono::NaiveDate;

    use super::*;
    use crate::gateway::{Deleted, User};
    use crate::task::fixtures::{manpower, task};

    /// In-memory backend. `fail_on` names the operation that should error.
    #[derive(Default)]
    pub struct FakeGateway {
        pub tasks: RefCell<Vec<Task>>,
        pub manpower: RefCell<Vec<Manpower>>,
        pub token: Option<String>,
        pub admin: bool,
        pub fail_on: Cell<Option<&'static str>>,
        pub calls: RefCell<Vec<String>>,
        next_id: Cell<u64>,
    }

    impl FakeGateway {
        pub fn admin() -> Self {
            FakeGateway { admin: true, next_id: Cell::new(100), ..FakeGateway::default() }
        }

        pub fn failing(self, op: &'static str) -> Self {
            self.fail_on.set(Some(op));
            self
        }

        fn enter(&self, op: &'static str) -> Result<(), GatewayError> {
            self.calls.borrow_mut().push(op.to_string());
            if self.fail_on.get() == Some(op) {
                return Err(GatewayError { method: "GET", path: op.to_string() });
            }
            Ok(())
        }

        fn fresh_id(&self) -> u64 {
            let id = self.next_id.get();
            self.next_id.set(id + 1);
            id
        }
    }

    fn day(d: Option<NaiveDate>) -> Option<chrono::NaiveDateTime> {
        d.and_then(|d| d.and_hms_opt(0, 0, 0))
    }

    impl Gateway for FakeGateway {
        fn set_token(&mut self, token: Option<String>) {
            self.token = token;
        }

        fn list_tasks(&self) -> Result<Vec<Task>, GatewayError> {
            self.enter("list_tasks")?;
            Ok(self.tasks.borrow().clone())
        }

        fn create_task(&self, draft: &TaskDraft) -> Result<Task, GatewayError> {
            self.enter("create_task")?;
            let mut t = task(self.fresh_id(), draft.parent_task_id, vec![]);
            t.name = draft.name.clone().unwrap_or_default();
            if let Some(start) = day(draft.start_time) {
                t.start_time = start;
            }
            if let Some(due) = day(draft.due_time) {
                t.due_time = due;
            }
            self.tasks.borrow_mut().push(t.clone());
            Ok(t)
        }

        fn update_task(&self, id: u64, draft: &TaskDraft) -> Result<Task, GatewayError> {
            self.enter("update_task")?;
            let mut tasks = self.tasks.borrow_mut();
            let t = tasks
                .iter_mut()
                .find(|t| t.id == id)
                .ok_or(GatewayError { method: "PUT", path: format!("{id}") })?;
            if let Some(name) = &draft.name {
                t.name = name.clone();
            }
            if let Some(status) = draft.status {
                t.status = status;
            }
            Ok(t.clone())
        }

        fn delete_task(&self, id: u64) -> Result<Deleted, GatewayError> {
            self.enter("delete_task")?;
            self.tasks.borrow_mut().retain(|t| t.id != id && t.parent_task_id != Some(id));
            Ok(Deleted { message: "Task deleted successfully".into() })
        }

        fn list_manpower(&self) -> Result<Vec<Manpower>, GatewayError> {
            self.enter("list_manpower")?;
            Ok(self.manpower.borrow().clone())
        }

        fn create_manpower(&self, draft: &ManpowerDraft) -> Result<Manpower, GatewayError> {
            self.enter("create_manpower")?;
            let mut m = manpower(
                self.fresh_id(),
                "2025-01-01",
                draft.manpower_type.unwrap_or_default(),
                draft.number_of_manpower.unwrap_or(1),
            );
            if let Some(date) = day(draft.date) {
                m.date = date;
            }
            self.manpower.borrow_mut().push(m.clone());
            Ok(m)
        }

        fn update_manpower(&self, id: u64, draft: &ManpowerDraft) -> Result<Manpower, GatewayError> {
            self.enter("update_manpower")?;
            let mut records = self.manpower.borrow_mut();
            let m = records
                .iter_mut()
                .find(|m| m.id == id)
                .ok_or(GatewayError { method: "PUT", path: format!("{id}") })?;
            if let Some(n) = draft.number_of_manpower {
                m.number_of_manpower = n;
            }
            Ok(m.clone())
        }

        fn delete_manpower(&self, id: u64) -> Result<Deleted, GatewayError> {
            self.enter("delete_manpower")?;
            self.manpower.borrow_mut().retain(|m| m.id != id);
            Ok(Deleted::default())
        }

        fn login(&self, username: &str, password: &str) -> Result<String, GatewayError> {
            self.enter("login")?;
            if password == "wrong" {
                return Err(GatewayError { method: "POST", path: "/api/token".into() });
            }
            Ok(format!("token-{username}"))
        }

        fn current_user(&self, token: &str) -> Result<User, GatewayError> {
            self.enter("current_user")?;
            Ok(User {
                username: token.trim_start_matches("token-").to_string(),
                email: None,
                is_admin: self.admin,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use rstest::rstest;

    use super::fake::FakeGateway;
    use super::*;
    use crate::fields::{ManpowerType, TaskStatus};
    use crate::task::fixtures::{manpower, task};
    use crate::task::{count_nodes, find_task};

    fn admin_session() -> Session {
        Session::authenticated("token-boss".into(), "boss".into(), Role::Admin)
    }

    fn seeded() -> Dashboard<FakeGateway> {
        let gw = FakeGateway::admin();
        gw.tasks.borrow_mut().extend([task(1, None, vec![]), task(2, Some(1), vec![])]);
        gw.manpower
            .borrow_mut()
            .push(manpower(10, "2025-01-02", ManpowerType::Labour, 3));
        let mut d = Dashboard::new(gw, admin_session());
        assert!(d.load_all());
        d
    }

    #[test]
    fn load_assembles_forest() {
        let d = seeded();
        assert_eq!(d.tasks().len(), 1);
        assert_eq!(d.tasks()[0].subtasks[0].id, 2);
        assert_eq!(d.manpower().len(), 1);
        assert!(!d.is_busy());
        assert!(d.error().is_none());
    }

    #[test]
    fn failed_create_leaves_tasks_unchanged() {
        let mut d = seeded();
        let before = d.tasks().to_vec();
        d.gateway.fail_on.set(Some("create_task"));
        let draft = TaskDraft { name: Some("Roof".into()), ..TaskDraft::default() };
        assert_eq!(d.add_task(&draft), Outcome::Failed);
        assert_eq!(d.tasks(), before.as_slice());
        assert_eq!(d.error(), Some("Failed to add task"));
        assert!(!d.is_busy());
        // No refetch after a failed mutation.
        assert_eq!(d.gateway.calls.borrow().last().map(String::as_str), Some("create_task"));
    }

    #[test]
    fn subtask_is_stamped_with_parent_and_refetched() {
        let mut d = seeded();
        let draft = TaskDraft {
            name: Some("Wiring".into()),
            start_time: NaiveDate::from_ymd_opt(2025, 2, 1),
            ..TaskDraft::default()
        };
        assert_eq!(d.add_subtask(2, draft), Outcome::Applied);
        let parent = find_task(d.tasks(), 2).unwrap();
        assert_eq!(parent.subtasks.len(), 1);
        assert_eq!(parent.subtasks[0].name, "Wiring");
        assert_eq!(parent.subtasks[0].parent_task_id, Some(2));
        assert_eq!(count_nodes(d.tasks()), 3);
    }

    #[test]
    fn update_and_delete_refetch() {
        let mut d = seeded();
        let draft = TaskDraft { status: Some(TaskStatus::Completed), ..TaskDraft::default() };
        assert_eq!(d.update_task(1, &draft), Outcome::Applied);
        assert_eq!(d.tasks()[0].status, TaskStatus::Completed);
        assert_eq!(d.delete_task(1), Outcome::Applied);
        assert!(d.tasks().is_empty());
    }

    #[rstest]
    #[case("create_manpower", "Failed to add manpower record", Outcome::Failed)]
    #[case("update_manpower", "Failed to update manpower record", Outcome::Failed)]
    #[case("delete_manpower", "Failed to delete manpower record", Outcome::Failed)]
    #[case("list_manpower", FETCH_MANPOWER_FAILED, Outcome::AppliedStale)]
    fn manpower_failures_surface_one_message(
        #[case] op: &'static str,
        #[case] message: &str,
        #[case] expected: Outcome,
    ) {
        let mut d = seeded();
        d.gateway.fail_on.set(Some(op));
        let ok = match op {
            "create_manpower" => d.add_manpower(&ManpowerDraft::default()),
            "update_manpower" => {
                d.update_manpower(10, &ManpowerDraft { number_of_manpower: Some(5), ..Default::default() })
            }
            _ => d.delete_manpower(10),
        };
        assert_eq!(ok, expected);
        assert_eq!(d.error(), Some(message));
        assert!(!d.is_busy());
    }

    #[test]
    fn refetch_failure_after_success_reports_fetch() {
        let mut d = seeded();
        d.gateway.fail_on.set(Some("list_tasks"));
        let outcome = d.delete_task(2);
        assert_eq!(outcome, Outcome::AppliedStale);
        assert!(outcome.is_applied());
        assert_eq!(d.error(), Some(FETCH_TASKS_FAILED));
        // The stale forest stays on screen.
        assert_eq!(count_nodes(d.tasks()), 2);
    }

    #[test]
    fn guest_cannot_mutate() {
        let gw = FakeGateway::default();
        let guest = Session::authenticated("t".into(), "viewer".into(), Role::Guest);
        let mut d = Dashboard::new(gw, guest);
        assert_eq!(d.delete_task(1), Outcome::Failed);
        assert_eq!(d.error(), Some(ADMIN_REQUIRED));
        assert!(d.gateway.calls.borrow().is_empty());
    }

    #[test]
    fn login_resolves_role_and_sets_token() {
        let mut d = Dashboard::new(FakeGateway::admin(), Session::anonymous());
        assert!(d.login("boss", "pw"));
        assert_eq!(d.session().role, Role::Admin);
        assert_eq!(d.session().username.as_deref(), Some("boss"));
        assert_eq!(d.gateway.token.as_deref(), Some("token-boss"));
    }

    #[test]
    fn login_falls_back_to_guest_when_lookup_fails() {
        let gw = FakeGateway::admin().failing("current_user");
        let mut d = Dashboard::new(gw, Session::anonymous());
        assert!(d.login("boss", "pw"));
        assert!(d.session().is_authenticated());
        assert_eq!(d.session().role, Role::Guest);
        assert!(!d.session().can_edit());
    }

    #[test]
    fn bad_credentials_keep_anonymous_session() {
        let mut d = Dashboard::new(FakeGateway::admin(), Session::anonymous());
        assert!(!d.login("boss", "wrong"));
        assert!(!d.session().is_authenticated());
        assert_eq!(d.error(), Some(LOGIN_FAILED));
        assert!(!d.is_busy());
    }

    #[test]
    fn logout_clears_everything() {
        let mut d = seeded();
        d.logout();
        assert!(d.tasks().is_empty());
        assert!(d.manpower().is_empty());
        assert!(!d.session().is_authenticated());
        assert!(d.gateway.token.is_none());
    }
}
