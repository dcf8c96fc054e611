//! Runtime configuration: backend address, session location and cost policy.

use std::path::{Path, PathBuf};

use crate::fields::CostPolicy;

pub const DEFAULT_API_URL: &str = "http://localhost:8000";

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub api_url: String,
    pub session_path: PathBuf,
    pub cost_policy: CostPolicy,
}

impl Config {
    /// Resolve configuration from the parsed command line.
    ///
    /// `api_url` already carries the `PD_API_URL` fallback through clap.
    pub fn resolve(
        api_url: Option<&str>,
        session: Option<&Path>,
        cost_policy: CostPolicy,
    ) -> std::io::Result<Self> {
        let session_path = match session {
            Some(path) => path.to_path_buf(),
            None => {
                let dir = pd_dir();
                std::fs::create_dir_all(&dir)?;
                dir.join("session.json")
            }
        };
        Ok(Config {
            api_url: normalise_base_url(api_url.unwrap_or(DEFAULT_API_URL)),
            session_path,
            cost_policy,
        })
    }
}

/// `$HOME/.pd`, or `./.pd` when `HOME` is unset.
pub fn pd_dir() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    PathBuf::from(home).join(".pd")
}

/// Trim whitespace and any trailing slashes; empty input falls back to the default.
pub fn normalise_base_url(raw: &str) -> String {
    let trimmed = raw.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        DEFAULT_API_URL.to_string()
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalise_base_url() {
        assert_eq!(normalise_base_url("http://api.example.com/"), "http://api.example.com");
        assert_eq!(normalise_base_url(" http://h:9000// "), "http://h:9000");
        assert_eq!(normalise_base_url(""), DEFAULT_API_URL);
    }

    #[test]
    fn explicit_session_path_is_kept() {
        let cfg = Config::resolve(None, Some(Path::new("/tmp/pd-test/s.json")), CostPolicy::AllTasks)
            .unwrap();
        assert_eq!(cfg.api_url, DEFAULT_API_URL);
        assert_eq!(cfg.session_path, PathBuf::from("/tmp/pd-test/s.json"));
        assert_eq!(cfg.cost_policy, CostPolicy::AllTasks);
    }
}
