//! Command implementations for the CLI interface.
//!
//! This module contains the command handlers behind each subcommand, from
//! listing and viewing quests to completion toggles, HTML export and the TUI.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::{Local, TimeZone};
use clap::Subcommand;
use clap_complete::{generate, Shell};
use tracing::debug;

use crate::cli::Cli;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::html;
use crate::opener::open_link;
use crate::profile::{discover_profiles, most_recent_profile, Profile};
use crate::quest::{Quest, QuestBook, QuestId};
use crate::store::{CompletionRecord, CompletionStore, JsonFileStore, KeyValueStore};
use crate::tui::{app::App, render::layout, run::run_tui};
use crate::view::{DisclosureKey, QuestList, QuestView};

pub type FileStore = JsonFileStore<QuestId, CompletionRecord>;

#[derive(Subcommand)]
pub enum Commands {
    /// Launch the interactive quest page.
    Ui,

    /// List quests with their completion state.
    List {
        /// Only quests not yet completed.
        #[arg(long, conflicts_with = "done")]
        pending: bool,
        /// Only completed quests.
        #[arg(long)]
        done: bool,
    },

    /// Print a single quest by ID or name.
    View {
        /// Quest ID or name.
        quest: String,
        /// Show only the summary row.
        #[arg(long)]
        collapsed: bool,
        /// Show the quest content even if quests start collapsed.
        #[arg(long, conflicts_with = "collapsed")]
        expanded: bool,
        /// Expand every step as well.
        #[arg(long, conflicts_with = "collapsed")]
        steps: bool,
    },

    /// Mark a whole quest complete.
    Complete {
        /// Quest ID or name.
        quest: String,
    },

    /// Mark a whole quest incomplete, clearing its steps.
    Reopen {
        /// Quest ID or name.
        quest: String,
    },

    /// Mark a single step done (or not done with --undo).
    Step {
        /// Quest ID or name.
        quest: String,
        /// Step ID or title.
        step: String,
        /// Clear the step instead of marking it.
        #[arg(long)]
        undo: bool,
    },

    /// Open a quest's external link.
    Open {
        /// Quest ID or name.
        quest: String,
    },

    /// Export every quest as a standalone HTML page.
    Export {
        /// Output file; stdout when omitted.
        #[arg(long, short)]
        output: Option<PathBuf>,
        /// Start every quest collapsed.
        #[arg(long)]
        collapsed: bool,
        /// Start every quest expanded.
        #[arg(long, conflicts_with = "collapsed")]
        expanded: bool,
    },

    /// List progress profiles.
    Profiles,

    /// Generate shell completion scripts.
    Completions {
        /// Shell to generate completions for.
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Resolved locations and settings shared by every command.
#[derive(Debug, Clone)]
pub struct Context {
    pub dir: PathBuf,
    pub config: Config,
    pub content_path: PathBuf,
    pub profile: Profile,
}

impl Context {
    /// Resolve the data directory, config, content file and profile.
    /// Command-line flags take precedence over `config.toml`.
    pub fn resolve(cli: &Cli) -> Result<Self> {
        let dir = match cli.dir.as_ref() {
            Some(dir) => dir.clone(),
            None => {
                let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
                PathBuf::from(home).join(".sidequest")
            }
        };
        fs::create_dir_all(&dir)?;
        Self::from_dir(&dir, cli.content.clone(), cli.profile.clone())
    }

    pub fn from_dir(dir: &Path, content: Option<PathBuf>, profile: Option<String>) -> Result<Self> {
        let config = Config::load(dir);
        let content_path = content.unwrap_or_else(|| config.content_path(dir));
        let profile_name = profile.unwrap_or_else(|| config.profile.clone());
        let profile = Profile::new(&profile_name, dir);
        if profile.name.is_empty() {
            return Err(Error::InvalidArgument(format!(
                "profile name '{profile_name}' has no usable characters"
            )));
        }
        debug!(dir = %dir.display(), profile = %profile.name, "resolved context");

        Ok(Context {
            dir: dir.to_path_buf(),
            config,
            content_path,
            profile,
        })
    }

    pub fn load_book(&self) -> Result<QuestBook> {
        QuestBook::load(&self.content_path)
    }

    pub fn open_store(&self) -> CompletionStore<FileStore> {
        CompletionStore::new(JsonFileStore::open(&self.profile.file_path))
    }

    /// Initial quest disclosure state. Flags win over `open_by_default`.
    pub fn open_quests(&self, collapsed: bool, expanded: bool) -> bool {
        match (collapsed, expanded) {
            (true, _) => false,
            (_, true) => true,
            _ => self.config.open_by_default,
        }
    }
}

/// Launch the terminal user interface.
pub fn cmd_ui(ctx: &Context) -> Result<()> {
    let book = ctx.load_book()?;
    let mut app = App::new(book, ctx.open_store(), &ctx.config, &ctx.profile.display_name);
    run_tui(&mut app)?;
    Ok(())
}

/// Which quests `list` shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListFilter {
    All,
    Pending,
    Done,
}

/// List quests in a table.
pub fn cmd_list(ctx: &Context, pending: bool, done: bool) -> Result<()> {
    let filter = match (pending, done) {
        (true, _) => ListFilter::Pending,
        (_, true) => ListFilter::Done,
        _ => ListFilter::All,
    };
    let book = ctx.load_book()?;
    let store = ctx.open_store();
    write_list(&mut io::stdout().lock(), &book, &store, filter)?;
    Ok(())
}

/// Write the quest table for `list`.
pub fn write_list<W, S>(
    out: &mut W,
    book: &QuestBook,
    store: &CompletionStore<S>,
    filter: ListFilter,
) -> io::Result<()>
where
    W: Write,
    S: KeyValueStore<QuestId, CompletionRecord>,
{
    writeln!(out, "{:<5} {:<5} {:<7} {:<17} {}", "ID", "Done", "Steps", "Updated", "Name")?;
    for quest in &book.quests {
        let record = store.read(quest.id);
        let keep = match filter {
            ListFilter::All => true,
            ListFilter::Pending => !record.is_complete(),
            ListFilter::Done => record.is_complete(),
        };
        if !keep {
            continue;
        }
        let steps = quest
            .steps
            .iter()
            .filter(|s| record.is_step_done(s.id))
            .count();
        writeln!(
            out,
            "{:<5} {:<5} {:<7} {:<17} {}",
            quest.id,
            if record.is_complete() { "[x]" } else { "[ ]" },
            format!("{}/{}", steps, quest.steps.len()),
            format_updated(record.updated_at_utc),
            quest.name
        )?;
    }
    Ok(())
}

/// Format a record's last update in local time, or "-" if never written.
pub fn format_updated(updated_at_utc: i64) -> String {
    if updated_at_utc == 0 {
        return "-".into();
    }
    match Local.timestamp_opt(updated_at_utc, 0).single() {
        Some(dt) => dt.format("%Y-%m-%d %H:%M").to_string(),
        None => "-".into(),
    }
}

/// Print a single quest as text.
pub fn cmd_view(ctx: &Context, quest: String, collapsed: bool, expanded: bool, steps: bool) -> Result<()> {
    let book = ctx.load_book()?;
    let quest = book.resolve(&quest)?;
    let store = ctx.open_store();
    let open = ctx.open_quests(collapsed, expanded || steps);
    for line in render_quest_text(quest, &store, open, steps) {
        println!("{line}");
    }
    Ok(())
}

/// Render one quest to plain text lines.
pub fn render_quest_text<S>(
    quest: &Quest,
    store: &CompletionStore<S>,
    open: bool,
    open_steps: bool,
) -> Vec<String>
where
    S: KeyValueStore<QuestId, CompletionRecord>,
{
    let mut view = QuestView::new(quest, open);
    if open_steps {
        for step in &quest.steps {
            view.toggle(DisclosureKey::Step(quest.id, step.id));
        }
    }
    layout(&[view.render(quest, store)]).plain()
}

/// Mark a whole quest complete or incomplete.
pub fn cmd_set_complete(ctx: &Context, quest: String, state: bool) -> Result<()> {
    let book = ctx.load_book()?;
    let quest = book.resolve(&quest)?;
    let mut store = ctx.open_store();
    store.set_total(quest.id, state)?;
    if state {
        println!("Marked '{}' done.", quest.name);
    } else {
        println!("Reopened '{}'.", quest.name);
    }
    Ok(())
}

/// Mark or clear a single step.
pub fn cmd_step(ctx: &Context, quest: String, step: String, undo: bool) -> Result<()> {
    let book = ctx.load_book()?;
    let quest = book.resolve(&quest)?;
    let step = quest.resolve_step(&step)?;
    let mut store = ctx.open_store();
    let record = store.set_step(quest.id, step.id, !undo)?;
    println!(
        "{} step '{}' of '{}' ({}/{} steps done).",
        if undo { "Cleared" } else { "Marked" },
        step.title,
        quest.name,
        record.done_steps(),
        quest.steps.len()
    );
    Ok(())
}

/// Open a quest's external link.
pub fn cmd_open(ctx: &Context, quest: String) -> Result<()> {
    let book = ctx.load_book()?;
    let quest = book.resolve(&quest)?;
    open_link(&ctx.config.opener(), &quest.link)?;
    println!("Opened {}", quest.link);
    Ok(())
}

/// Export every quest as HTML.
pub fn cmd_export(ctx: &Context, output: Option<PathBuf>, collapsed: bool, expanded: bool) -> Result<()> {
    let book = ctx.load_book()?;
    let store = ctx.open_store();
    let open = ctx.open_quests(collapsed, expanded);
    let page = export_html(&book, &store, open, &ctx.profile.display_name);

    match output {
        Some(path) => {
            fs::write(&path, page)?;
            println!("Exported {} quests to {}", book.quests.len(), path.display());
        }
        None => io::stdout().lock().write_all(page.as_bytes())?,
    }
    Ok(())
}

/// Build the HTML export for a book.
pub fn export_html<S>(book: &QuestBook, store: &CompletionStore<S>, open: bool, profile: &str) -> String
where
    S: KeyValueStore<QuestId, CompletionRecord>,
{
    let list = QuestList::new(book, open);
    let elements = list.render(book, store, |_| true);
    html::document(&format!("Side quests ({profile})"), &elements)
}

/// List progress profiles.
pub fn cmd_profiles(ctx: &Context) -> Result<()> {
    let profiles = discover_profiles(&ctx.dir)?;
    if profiles.is_empty() {
        println!("No profiles yet. Progress is saved to '{}' on first change.", ctx.profile.name);
        return Ok(());
    }
    let recent = most_recent_profile(&ctx.dir)?;
    for profile in profiles {
        let current = if profile.name == ctx.profile.name { "*" } else { " " };
        let latest = if recent.as_ref().map(|r| &r.name) == Some(&profile.name) {
            " (most recent)"
        } else {
            ""
        };
        println!("{current} {}{latest}", profile.display_name);
    }
    Ok(())
}

/// Print a shell completion script.
pub fn cmd_completions(shell: Shell) {
    use clap::CommandFactory;

    let mut app = Cli::command();
    let app_name = app.get_name().to_string();
    generate(shell, &mut app, app_name, &mut io::stdout());
}
