//! TUI entry point and terminal setup.

use std::io;

use crossterm::{
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{prelude::CrosstermBackend, Terminal};

use crate::quest::QuestId;
use crate::store::{CompletionRecord, KeyValueStore};
use crate::tui::app::App;

/// Initialise the terminal, run the quest page until the user quits, and
/// restore the terminal afterwards.
pub fn run_tui<S>(app: &mut App<S>) -> io::Result<()>
where
    S: KeyValueStore<QuestId, CompletionRecord>,
{
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = app.run(&mut terminal);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}
