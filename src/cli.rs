use std::path::PathBuf;

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;

#[derive(Debug, Parser)]
#[command(
    name = "dossier",
    about = "Conversational search over a catalog of person folders"
)]
pub struct Cli {
    /// Override the XDG data directory
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    /// Path to the JSON configuration file
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Only log warnings and errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Increase log verbosity (can be repeated: -v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Chat with the bot on the console
    Chat(ChatArgs),
    /// Start MCP server exposing the conversation
    Mcp,
    /// Show catalog statistics
    Index(IndexArgs),
    /// Find person folders matching a query
    Search(SearchArgs),
    /// Show the summary and documents of a folder
    Show(ShowArgs),
    /// List surnames by category
    Surnames(SurnamesArgs),
    /// List birthdays for a day
    Birthdays(BirthdaysArgs),
    /// Manage the persisted access list
    Access {
        #[command(subcommand)]
        action: AccessAction,
    },
    /// Generate shell completions
    #[command(hide = true)]
    Completions(CompletionsArgs),
}

// -- Chat --

#[derive(Debug, Parser)]
pub struct ChatArgs {
    /// User id to chat as (defaults to the main admin, else 0)
    #[arg(long)]
    pub user: Option<u64>,
}

// -- Index --

#[derive(Debug, Parser)]
pub struct IndexArgs {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

// -- Search --

#[derive(Debug, Parser)]
pub struct SearchArgs {
    /// Name words or birth date to look for
    pub query: String,

    /// Output results as JSON
    #[arg(long)]
    pub json: bool,
}

// -- Show --

#[derive(Debug, Parser)]
pub struct ShowArgs {
    /// Folder path or a query matching exactly one folder
    pub folder: String,

    /// Print the full summary instead of the short form
    #[arg(long)]
    pub full: bool,
}

// -- Surnames --

#[derive(Debug, Parser)]
pub struct SurnamesArgs {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

// -- Birthdays --

#[derive(Debug, Parser)]
pub struct BirthdaysArgs {
    /// Day to list, as DD.MM (defaults to today)
    #[arg(long)]
    pub date: Option<String>,
}

// -- Access subcommands --

#[derive(Debug, Subcommand)]
pub enum AccessAction {
    /// Grant a user access
    Add {
        /// User id
        user: u64,
    },
    /// Revoke a user's access
    Remove {
        /// User id
        user: u64,
    },
    /// List users with access
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

// -- Completions --

#[derive(Debug, Parser)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    pub shell: Shell,
}

impl CompletionsArgs {
    /// Generate shell completions and print to stdout.
    pub fn generate(&self) {
        let mut cmd = Cli::command();
        clap_complete::generate(
            self.shell,
            &mut cmd,
            "dossier",
            &mut std::io::stdout(),
        );
    }
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::*;

    #[test]
    fn parse_show_defaults() {
        let cli = Cli::parse_from(["dossier", "show", "Ivanov"]);
        match cli.command {
            Command::Show(args) => {
                assert_eq!(args.folder, "Ivanov");
                assert!(!args.full);
            }
            _ => panic!("expected show command"),
        }
        assert!(cli.config.is_none());
        assert_eq!(cli.verbose, 0);
    }

    #[test]
    fn parse_global_options_after_subcommand() {
        let cli = Cli::parse_from([
            "dossier",
            "chat",
            "--user",
            "42",
            "--config",
            "/etc/dossier.json",
            "-vv",
        ]);
        match cli.command {
            Command::Chat(args) => assert_eq!(args.user, Some(42)),
            _ => panic!("expected chat command"),
        }
        assert_eq!(cli.config, Some(PathBuf::from("/etc/dossier.json")));
        assert_eq!(cli.verbose, 2);
    }

    #[test]
    fn parse_access_remove() {
        let cli = Cli::parse_from(["dossier", "access", "remove", "7"]);
        assert!(matches!(
            cli.command,
            Command::Access {
                action: AccessAction::Remove { user: 7 }
            }
        ));
    }
}
