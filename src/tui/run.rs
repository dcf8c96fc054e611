//! Dashboard TUI entry point and terminal setup.

use std::io;

use crossterm::{
    event::{DisableMouseCapture, EnableMouseCapture},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{prelude::CrosstermBackend, Terminal};

use crate::config::Config;
use crate::gateway::HttpGateway;
use crate::session::Session;
use crate::tui::app::App;

/// Initialise and run the dashboard terminal user interface.
///
/// A stored session opens straight onto the overview; otherwise the login
/// screen comes first. An unreadable session file is reported in the status
/// bar and treated as logged out.
pub fn run_tui(config: &Config) -> io::Result<()> {
    let (session, load_error) = match Session::load(&config.session_path) {
        Ok(session) => (session, None),
        Err(e) => (Session::anonymous(), Some(format!("Ignoring stored session: {e}"))),
    };

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let gateway = HttpGateway::new(&config.api_url);
    let mut app = App::new(gateway, session, config.session_path.clone(), config.cost_policy);
    if let Some(msg) = load_error {
        app.set_error_message(msg);
    }
    let result = app.run(&mut terminal);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen, DisableMouseCapture)?;
    terminal.show_cursor()?;

    result
}
