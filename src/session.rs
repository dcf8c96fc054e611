//! Session context: bearer token, user name and role, persisted across runs.
//!
//! The session lives in a small JSON file (default `~/.pd/session.json`). A missing
//! file means an anonymous session. The role only decides which affordances are
//! shown; the backend enforces permissions on its own.

use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Read, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::SessionError;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    #[default]
    Guest,
}

impl Role {
    pub fn from_is_admin(is_admin: bool) -> Self {
        if is_admin {
            Role::Admin
        } else {
            Role::Guest
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Guest => "guest",
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Session {
    pub token: Option<String>,
    pub username: Option<String>,
    #[serde(default)]
    pub role: Role,
}

impl Session {
    pub fn anonymous() -> Self {
        Session::default()
    }

    pub fn authenticated(token: String, username: String, role: Role) -> Self {
        Session { token: Some(token), username: Some(username), role }
    }

    pub fn is_authenticated(&self) -> bool {
        self.token.as_deref().is_some_and(|t| !t.is_empty())
    }

    /// Whether mutation controls are offered.
    pub fn can_edit(&self) -> bool {
        self.is_authenticated() && self.role == Role::Admin
    }

    /// Load the session file; a missing file yields an anonymous session.
    pub fn load(path: &Path) -> Result<Self, SessionError> {
        let mut buf = String::new();
        match File::open(path) {
            Ok(mut f) => {
                f.read_to_string(&mut buf)?;
            }
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Session::anonymous()),
            Err(e) => return Err(e.into()),
        }
        Ok(serde_json::from_str(&buf)?)
    }

    /// Save via temp file + rename. The file holds the token, so on unix it is
    /// readable by the owner only.
    pub fn save(&self, path: &Path) -> Result<(), SessionError> {
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir)?;
        }
        let tmp = path.with_extension("json.tmp");
        let data = serde_json::to_string_pretty(self)?;
        // A leftover temp file would keep its old mode.
        match fs::remove_file(&tmp) {
            Err(e) if e.kind() != ErrorKind::NotFound => return Err(e.into()),
            _ => {}
        }
        let mut options = OpenOptions::new();
        options.write(true).create_new(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }
        let mut f = options.open(&tmp)?;
        f.write_all(data.as_bytes())?;
        f.flush()?;
        fs::rename(tmp, path)?;
        Ok(())
    }

    /// Remove the persisted session. Removing an absent file is not an error.
    pub fn clear(path: &Path) -> Result<(), SessionError> {
        match fs::remove_file(path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch(name: &str) -> std::path::PathBuf {
        let dir = std::env::temp_dir().join(format!("pd-session-{}-{name}", std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        dir.join("session.json")
    }

    #[test]
    fn missing_file_is_anonymous() {
        let path = scratch("missing");
        let s = Session::load(&path).unwrap();
        assert!(!s.is_authenticated());
        assert!(!s.can_edit());
        assert_eq!(s.role, Role::Guest);
    }

    #[test]
    fn save_load_clear() {
        let path = scratch("roundtrip");
        let s = Session::authenticated("abc".into(), "site-admin".into(), Role::Admin);
        s.save(&path).unwrap();
        let raw = fs::read_to_string(&path).unwrap();
        assert!(raw.contains("\"role\": \"admin\""));
        let loaded = Session::load(&path).unwrap();
        assert_eq!(loaded, s);
        assert!(loaded.can_edit());

        Session::clear(&path).unwrap();
        Session::clear(&path).unwrap();
        assert_eq!(Session::load(&path).unwrap(), Session::anonymous());
    }

    #[cfg(unix)]
    #[test]
    fn saved_file_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let path = scratch("mode");
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path.with_extension("json.tmp"), "stale").unwrap();
        Session::authenticated("abc".into(), "site-admin".into(), Role::Admin).save(&path).unwrap();
        let mode = fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[test]
    fn guest_cannot_edit() {
        let s = Session::authenticated("abc".into(), "viewer".into(), Role::from_is_admin(false));
        assert!(s.is_authenticated());
        assert!(!s.can_edit());
    }

    #[test]
    fn corrupt_file_is_an_error() {
        let path = scratch("corrupt");
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "{not json").unwrap();
        assert!(matches!(Session::load(&path), Err(SessionError::Json(_))));
    }
}
