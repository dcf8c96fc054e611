//! Error types.
//!
//! Every failed backend call collapses into one opaque `GatewayError`: transport
//! failures, non-success statuses and rejected credentials are not told apart.

use thiserror::Error;

/// A backend call that did not complete with a success status.
#[derive(Debug, Error)]
#[error("{method} {path} failed")]
pub struct GatewayError {
    pub method: &'static str,
    pub path: String,
}

/// Failure reading or writing the persisted session.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("session file I/O: {0}")]
    Io(#[from] std::io::Error),
    #[error("session file is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Top-level error for command handlers.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Gateway(#[from] GatewayError),
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error("not logged in; run `pd login <username>` first")]
    NotLoggedIn,
    #[error("admin role required")]
    AdminRequired,
    #[error("{0}")]
    Invalid(String),
    /// A dashboard operation failed; carries its one user-facing message.
    #[error("{0}")]
    Failed(String),
    #[error("{0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
