//! CLI definitions for petty.
//!
//! Uses clap for argument parsing with derive macros.

use crate::model::SnapshotId;
use crate::query::RelationshipFilter;
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// petty - follower snapshots and diffs
#[derive(Parser, Debug)]
#[command(name = "petty")]
#[command(version = concat!(
    env!("CARGO_PKG_VERSION"),
    "\n  Built: ", env!("VERGEN_BUILD_TIMESTAMP"),
    "\n  Rustc: ", env!("VERGEN_RUSTC_SEMVER"),
    "\n  Target: ", env!("VERGEN_CARGO_TARGET_TRIPLE"),
))]
#[command(about = "Track who follows you, who you follow, and what changed")]
#[command(long_about = r#"
petty - keep local snapshots of your follower and following lists and see
who started or stopped following you between any two of them.

Quick start:
  1. Export your followers and following lists as JSON arrays
  2. Run: petty capture --followers followers.json --following following.json
  3. Later, capture again and run: petty diff <newest-id>
"#)]
pub struct Cli {
    /// Path to the database file
    #[arg(long, env = "PETTY_DB", global = true)]
    pub db: Option<PathBuf>,

    /// Output format
    #[arg(long, short = 'f', global = true)]
    pub format: Option<OutputFormat>,

    /// Be verbose (show debug info)
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    /// Be quiet (suppress non-error output)
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Capture a new snapshot from followers/following lists
    Capture(CaptureArgs),

    /// List snapshots, newest first
    List(ListArgs),

    /// Show the accounts of one snapshot
    Show(ShowArgs),

    /// Compare the followers of two snapshots
    Diff(DiffArgs),

    /// Delete a snapshot and all of its accounts
    Delete(DeleteArgs),

    /// Show or manage configuration
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

#[derive(Args, Debug)]
pub struct CaptureArgs {
    /// JSON file with the accounts that follow you
    #[arg(long)]
    pub followers: PathBuf,

    /// JSON file with the accounts you follow
    #[arg(long)]
    pub following: PathBuf,
}

#[derive(Args, Debug)]
pub struct ListArgs {
    /// Maximum number of snapshots to show
    #[arg(long, short = 'n')]
    pub limit: Option<usize>,
}

#[derive(Args, Debug)]
pub struct ShowArgs {
    /// Snapshot ID
    pub id: SnapshotId,

    /// Relationship category to show
    #[arg(long, short = 'F', default_value = "all")]
    pub filter: RelationshipFilter,
}

#[derive(Args, Debug)]
pub struct DiffArgs {
    /// Newer snapshot ID
    pub current: SnapshotId,

    /// Older snapshot ID (defaults to the snapshot captured just before CURRENT)
    pub previous: Option<SnapshotId>,
}

#[derive(Args, Debug)]
pub struct DeleteArgs {
    /// Snapshot ID
    pub id: SnapshotId,

    /// Do not ask for confirmation
    #[arg(long, short = 'y')]
    pub yes: bool,
}

#[derive(Args, Debug)]
#[group(required = true, multiple = false)]
pub struct ConfigArgs {
    /// Show current configuration
    #[arg(long)]
    pub show: bool,

    /// Write a sample configuration file
    #[arg(long)]
    pub init: bool,
}

#[derive(Args, Debug, Clone)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}

#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
    JsonPretty,
    Csv,
}

impl OutputFormat {
    /// Parse a format name from configuration, ignoring case.
    #[must_use]
    pub fn from_config(value: &str) -> Option<Self> {
        <Self as ValueEnum>::from_str(value, true).ok()
    }
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
    fn parses_show_with_snake_case_filter() {
        let cli = Cli::try_parse_from(["petty", "show", "3", "--filter", "not_following_back"])
            .unwrap();
        match cli.command {
            Commands::Show(args) => {
                assert_eq!(args.id, SnapshotId(3));
                assert_eq!(args.filter, RelationshipFilter::NotFollowingBack);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn diff_previous_is_optional() {
        let cli = Cli::try_parse_from(["petty", "diff", "5"]).unwrap();
        match cli.command {
            Commands::Diff(args) => {
                assert_eq!(args.current, SnapshotId(5));
                assert!(args.previous.is_none());
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn config_requires_exactly_one_action() {
        assert!(Cli::try_parse_from(["petty", "config"]).is_err());
        assert!(Cli::try_parse_from(["petty", "config", "--show", "--init"]).is_err());

        let cli = Cli::try_parse_from(["petty", "config", "--show"]).unwrap();
        match cli.command {
            Commands::Config(args) => assert!(args.show && !args.init),
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn output_format_from_config() {
        assert_eq!(OutputFormat::from_config("JSON"), Some(OutputFormat::Json));
        assert_eq!(
            OutputFormat::from_config("json-pretty"),
            Some(OutputFormat::JsonPretty)
        );
        assert_eq!(OutputFormat::from_config("yaml"), None);
    }
}
