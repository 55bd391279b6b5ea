//! Color constants for the terminal user interface.

use ratatui::style::Color;

/// Quest titles and the header bar
pub const GOLD: Color = Color::Rgb(255, 215, 0);
/// Ticked checkboxes and completed quests
pub const DONE_GREEN: Color = Color::Rgb(0, 160, 60);
/// Status bar when a write failed
pub const DARK_RED: Color = Color::Rgb(114, 0, 0);
/// Status bar background
pub const DARK_PURPLE: Color = Color::Rgb(86, 60, 92);
