//! Enumerations for TUI state management.

/// Application state for the terminal user interface.
#[derive(Clone, Copy, PartialEq, Debug)]
pub enum AppState {
    QuestList,
    Links,
    Help,
}

/// Tone of the status bar message.
#[derive(Clone, Copy, PartialEq, Debug)]
pub enum StatusTone {
    Info,
    Warning,
}
