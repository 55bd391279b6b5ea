use std::path::PathBuf;

use clap::Parser;

use crate::cmd::Commands;

/// Side quest checklist companion.
/// Data lives in ~/.sidequest or the directory passed via --dir.
#[derive(Parser)]
#[command(name = "sq", version, about = "Side quest checklist companion")]
pub struct Cli {
    /// Data directory holding config.toml, quest content and progress files.
    #[arg(long, global = true)]
    pub dir: Option<PathBuf>,

    /// Path to the JSON quest content file.
    #[arg(long, global = true)]
    pub content: Option<PathBuf>,

    /// Progress profile to read and write.
    #[arg(long, global = true)]
    pub profile: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn global_flags_parse_after_subcommand() {
        let cli = Cli::try_parse_from(["sq", "list", "--profile", "Second Run", "--dir", "/tmp/sq"]).unwrap();
        assert_eq!(cli.profile.as_deref(), Some("Second Run"));
        assert_eq!(cli.dir, Some(PathBuf::from("/tmp/sq")));
        assert!(matches!(cli.command, Commands::List { pending: false, done: false }));
    }

    #[test]
    fn pending_and_done_conflict() {
        assert!(Cli::try_parse_from(["sq", "list", "--pending", "--done"]).is_err());
    }

    #[test]
    fn export_disclosure_flags_conflict() {
        assert!(Cli::try_parse_from(["sq", "export", "--collapsed", "--expanded"]).is_err());
        let cli = Cli::try_parse_from(["sq", "export", "--expanded"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Export {
                collapsed: false,
                expanded: true,
                ..
            }
        ));
    }
}
