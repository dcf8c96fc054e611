use std::path::PathBuf;

use clap::Parser;

use crate::cmd::Commands;
use crate::fields::CostPolicy;

/// Project tracking dashboard backed by a remote task/manpower API.
/// The backend address defaults to http://localhost:8000 or `PD_API_URL`.
#[derive(Parser)]
#[command(name = "pd", version, about = "Project tracking dashboard CLI")]
pub struct Cli {
    /// Base URL of the backend.
    #[arg(long, global = true, env = "PD_API_URL")]
    pub api_url: Option<String>,

    /// Path to the session file (default: ~/.pd/session.json).
    #[arg(long, global = true)]
    pub session: Option<PathBuf>,

    /// Which tasks contribute estimated cost to the project total.
    #[arg(
        long,
        global = true,
        value_enum,
        env = "PD_COST_POLICY",
        default_value_t = CostPolicy::MainTasks
    )]
    pub cost_policy: CostPolicy,

    #[command(subcommand)]
    pub command: Commands,
}
