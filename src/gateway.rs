//! The only component that talks to the network.
//!
//! Four calls per resource (list, create, partial update, delete) plus login.
//! Each call blocks its caller until the round trip completes, carries the bearer
//! token when one is set, and turns any failure into a single `GatewayError`.
//! There are no retries and no timeouts beyond the transport's own.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::GatewayError;
use crate::task::{Manpower, ManpowerDraft, Task, TaskDraft};

pub const TASKS_PATH: &str = "/api/tasks/";
pub const MANPOWER_PATH: &str = "/api/manpower/";
pub const TOKEN_PATH: &str = "/api/token";
pub const ME_PATH: &str = "/api/users/me/";

/// The user record returned by `GET /api/users/me/`.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct User {
    pub username: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub is_admin: bool,
}

/// Body of a successful delete.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Default)]
pub struct Deleted {
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

/// Backend operations used by the dashboard.
pub trait Gateway {
    fn set_token(&mut self, token: Option<String>);

    fn list_tasks(&self) -> Result<Vec<Task>, GatewayError>;
    fn create_task(&self, draft: &TaskDraft) -> Result<Task, GatewayError>;
    fn update_task(&self, id: u64, draft: &TaskDraft) -> Result<Task, GatewayError>;
    fn delete_task(&self, id: u64) -> Result<Deleted, GatewayError>;

    fn list_manpower(&self) -> Result<Vec<Manpower>, GatewayError>;
    fn create_manpower(&self, draft: &ManpowerDraft) -> Result<Manpower, GatewayError>;
    fn update_manpower(&self, id: u64, draft: &ManpowerDraft) -> Result<Manpower, GatewayError>;
    fn delete_manpower(&self, id: u64) -> Result<Deleted, GatewayError>;

    /// Exchange credentials for an access token.
    fn login(&self, username: &str, password: &str) -> Result<String, GatewayError>;
    fn current_user(&self, token: &str) -> Result<User, GatewayError>;
}

/// `Gateway` over HTTP with a blocking `ureq` agent.
pub struct HttpGateway {
    agent: ureq::Agent,
    base_url: String,
    token: Option<String>,
}

impl HttpGateway {
    pub fn new(base_url: &str) -> Self {
        HttpGateway {
            agent: ureq::AgentBuilder::new().build(),
            base_url: base_url.trim_end_matches('/').to_string(),
            token: None,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn request(&self, method: &str, path: &str) -> ureq::Request {
        let req = self.agent.request(method, &self.url(path));
        match &self.token {
            Some(token) => req.set("Authorization", &format!("Bearer {token}")),
            None => req,
        }
    }

    fn exchange<T: DeserializeOwned>(
        &self,
        method: &'static str,
        path: &str,
        body: Option<serde_json::Value>,
    ) -> Result<T, GatewayError> {
        let failed = || GatewayError { method, path: path.to_string() };
        let req = self.request(method, path);
        let response = match body {
            Some(json) => req.send_json(json),
            None => req.call(),
        }
        .map_err(|_| failed())?;
        response.into_json::<T>().map_err(|_| failed())
    }

    fn json_body<B: Serialize>(
        method: &'static str,
        path: &str,
        body: &B,
    ) -> Result<serde_json::Value, GatewayError> {
        serde_json::to_value(body).map_err(|_| GatewayError { method, path: path.to_string() })
    }
}

fn item_path(collection: &str, id: u64) -> String {
    format!("{}{}", collection, id)
}

impl Gateway for HttpGateway {
    fn set_token(&mut self, token: Option<String>) {
        self.token = token;
    }

    fn list_tasks(&self) -> Result<Vec<Task>, GatewayError> {
        self.exchange("GET", TASKS_PATH, None)
    }

    fn create_task(&self, draft: &TaskDraft) -> Result<Task, GatewayError> {
        let body = Self::json_body("POST", TASKS_PATH, draft)?;
        self.exchange("POST", TASKS_PATH, Some(body))
    }

    fn update_task(&self, id: u64, draft: &TaskDraft) -> Result<Task, GatewayError> {
        let path = item_path(TASKS_PATH, id);
        let body = Self::json_body("PUT", &path, draft)?;
        self.exchange("PUT", &path, Some(body))
    }

    fn delete_task(&self, id: u64) -> Result<Deleted, GatewayError> {
        self.exchange("DELETE", &item_path(TASKS_PATH, id), None)
    }

    fn list_manpower(&self) -> Result<Vec<Manpower>, GatewayError> {
        self.exchange("GET", MANPOWER_PATH, None)
    }

    fn create_manpower(&self, draft: &ManpowerDraft) -> Result<Manpower, GatewayError> {
        let body = Self::json_body("POST", MANPOWER_PATH, draft)?;
        self.exchange("POST", MANPOWER_PATH, Some(body))
    }

    fn update_manpower(&self, id: u64, draft: &ManpowerDraft) -> Result<Manpower, GatewayError> {
        let path = item_path(MANPOWER_PATH, id);
        let body = Self::json_body("PUT", &path, draft)?;
        self.exchange("PUT", &path, Some(body))
    }

    fn delete_manpower(&self, id: u64) -> Result<Deleted, GatewayError> {
        self.exchange("DELETE", &item_path(MANPOWER_PATH, id), None)
    }

    fn login(&self, username: &str, password: &str) -> Result<String, GatewayError> {
        let failed = || GatewayError { method: "POST", path: TOKEN_PATH.to_string() };
        let response = self
            .agent
            .post(&self.url(TOKEN_PATH))
            .send_form(&[("username", username), ("password", password)])
            .map_err(|_| failed())?;
        let token: TokenResponse = response.into_json().map_err(|_| failed())?;
        Ok(token.access_token)
    }

    fn current_user(&self, token: &str) -> Result<User, GatewayError> {
        let failed = || GatewayError { method: "GET", path: ME_PATH.to_string() };
        self.agent
            .get(&self.url(ME_PATH))
            .set("Authorization", &format!("Bearer {token}"))
            .call()
            .map_err(|_| failed())?
            .into_json()
            .map_err(|_| failed())
    }
}
