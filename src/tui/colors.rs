//! Color constants for the terminal user interface.

use ratatui::style::Color;

use crate::fields::TaskStatus;

/// Completed work and success messages
pub const DARK_GREEN: Color = Color::Rgb(0, 80, 0);
/// In-progress work and highlighted totals
pub const GOLD: Color = Color::Rgb(255, 215, 0);
/// Stuck work and error messages
pub const DARK_RED: Color = Color::Rgb(114, 0, 0);
/// Page tabs and headers
pub const DARK_PURPLE: Color = Color::Rgb(86, 60, 92);

pub fn status_color(status: TaskStatus) -> Color {
    match status {
        TaskStatus::NotStarted => Color::Gray,
        TaskStatus::InProgress => GOLD,
        TaskStatus::Completed => Color::Green,
        TaskStatus::Stuck => Color::Red,
    }
}
