//! # SQ - Side Quest Companion
//!
//! A command-line and terminal checklist for a game's side quests. Each quest
//! is a collapsible entry: a summary row with its name, description, completion
//! checkbox and external wiki link, expanding to failure conditions, rewards and
//! ordered steps. Steps collapse and tick independently.
//!
//! ## Key Features
//!
//! - **Collapsible Quests**: Quest and step disclosures expand independently;
//!   opening a step never touches its quest
//! - **Persistent Progress**: Completion is saved per quest to a local JSON file
//!   after every change
//! - **Profiles**: Separate progress files for separate playthroughs
//! - **Markdown Content**: Descriptions, failure conditions and step details are
//!   markdown; links always open outside the companion
//! - **HTML Export**: A standalone page with native `<details>` disclosures
//!
//! ## Quick Start
//!
//! ```bash
//! # Browse quests interactively
//! sq ui
//!
//! # List quests and progress
//! sq list --pending
//!
//! # Tick a step, or a whole quest
//! sq step "The Lost Ring" "Talk to Ava"
//! sq complete 12
//! ```
//!
//! Data is stored in `~/.sidequest/`: `config.toml`, the quest content file
//! (`quests.json` by default) and one `<profile>_progress.json` per profile.
//! Set `RUST_LOG=debug` to trace store writes.

use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

pub mod cli;
pub mod cmd;
pub mod config;
pub mod error;
pub mod html;
pub mod markdown;
pub mod opener;
pub mod profile;
pub mod quest;
pub mod store;
pub mod view;
pub mod tui {
    pub mod app;
    pub mod colors;
    pub mod enums;
    pub mod render;
    pub mod run;
    pub mod utils;
}

use cli::Cli;
use cmd::*;

fn main() {
    // Tracing is opt-in via RUST_LOG; invalid or huge filters are ignored.
    let filter = std::env::var("RUST_LOG")
        .ok()
        .and_then(|raw| {
            let raw = raw.trim();
            if raw.is_empty() || raw.len() > 4096 {
                return None;
            }
            EnvFilter::try_new(raw).ok()
        })
        .unwrap_or_else(|| EnvFilter::new("off"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    let cli = Cli::parse();

    if let Commands::Completions { shell } = cli.command {
        cmd_completions(shell);
        return;
    }

    let result = Context::resolve(&cli).and_then(|ctx| match cli.command {
        Commands::Ui => cmd_ui(&ctx),
        Commands::List { pending, done } => cmd_list(&ctx, pending, done),
        Commands::View {
            quest,
            collapsed,
            expanded,
            steps,
        } => cmd_view(&ctx, quest, collapsed, expanded, steps),
        Commands::Complete { quest } => cmd_set_complete(&ctx, quest, true),
        Commands::Reopen { quest } => cmd_set_complete(&ctx, quest, false),
        Commands::Step { quest, step, undo } => cmd_step(&ctx, quest, step, undo),
        Commands::Open { quest } => cmd_open(&ctx, quest),
        Commands::Export {
            output,
            collapsed,
            expanded,
        } => cmd_export(&ctx, output, collapsed, expanded),
        Commands::Profiles => cmd_profiles(&ctx),
        Commands::Completions { .. } => unreachable!("completions handled above"),
    });

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(e.exit_code());
    }
}
