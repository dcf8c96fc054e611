//! # PD - Project Dashboard CLI
//!
//! A command-line and terminal dashboard for tracking a construction-style project
//! held by a remote backend: a hierarchy of tasks with job counts, dates and
//! estimated cost, plus daily manpower records.
//!
//! ## Key Features
//!
//! - **Task tree**: nested tasks rendered with expand/collapse glyphs
//! - **Progress metrics**: job totals, completed and stuck shares, project span and cost
//! - **Manpower summary**: head counts by type, by work category and by day
//! - **Schedule rule**: start, end and duration stay consistent on every edit
//! - **Roles**: admins get create/edit/delete, guests get a read-only view
//!
//! ## Quick Start
//!
//! ```bash
//! # Point at the backend (default http://localhost:8000)
//! export PD_API_URL=http://localhost:8000
//!
//! # Log in; the token is kept in ~/.pd/session.json
//! pd login admin
//!
//! # Launch the dashboard
//! pd ui
//!
//! # Or work from the shell
//! pd tasks
//! pd add "Foundation" --start 2025-01-01 --duration 9 --total-job 10
//! pd add "Excavation" --parent 1 --due "in 3d"
//! pd manpower add --date today --kind labour --work brick-work --count 6
//! pd overview
//! ```

use clap::Parser;

pub mod cli;
pub mod cmd;
pub mod config;
pub mod dashboard;
pub mod error;
pub mod fields;
pub mod gateway;
pub mod metrics;
pub mod report;
pub mod schedule;
pub mod session;
pub mod task;
pub mod tree_state;
pub mod tree_view;
pub mod tui {
    pub mod colors;
    pub mod app;
    pub mod enums;
    pub mod input;
    pub mod manpower_form;
    pub mod run;
    pub mod task_form;
    pub mod utils;
}

use cli::Cli;
use cmd::*;
use config::Config;

fn main() {
    let cli = Cli::parse();

    // Completions need neither config nor session.
    if let Commands::Completions { shell } = &cli.command {
        cmd_completions(*shell);
        return;
    }

    let config = match Config::resolve(
        cli.api_url.as_deref(),
        cli.session.as_deref(),
        cli.cost_policy,
    ) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to prepare pd directory: {e}");
            std::process::exit(1);
        }
    };

    let result = match cli.command {
        Commands::Ui => cmd_ui(&config),
        Commands::Login { username, password } => cmd_login(&config, username, password),
        Commands::Logout => cmd_logout(&config),
        Commands::Whoami => cmd_whoami(&config),
        Commands::Overview => cmd_overview(&config),
        Commands::Tasks { collapsed } => cmd_tasks(&config, collapsed),
        Commands::View { id } => cmd_view(&config, id),
        Commands::Add { name, parent, fields } => cmd_add(&config, name, parent, fields),
        Commands::Update { id, name, fields } => cmd_update(&config, id, name, fields),
        Commands::Delete { id, cascade } => cmd_delete(&config, id, cascade),
        Commands::Manpower { action } => cmd_manpower(&config, action),
        Commands::Completions { shell } => {
            cmd_completions(shell);
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
