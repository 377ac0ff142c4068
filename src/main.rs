//! petty - follower snapshot CLI
//!
//! Main entry point for the petty command-line tool.

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser};
use clap_complete::generate;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use serde_json::json;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;
use tracing::debug;

use petty::config::Config;
use petty::logging::init_cli_logging;
use petty::worker::{CapturePoll, spawn_capture};
use petty::*;

fn main() -> ExitCode {
    let cli = Cli::parse();
    let config = Config::load();

    if !config.output.colors {
        colored::control::set_override(false);
    }
    init_cli_logging(cli.quiet, cli.verbose, config.output.colors);

    match run(&cli, &config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            if let Some(petty_err) = err.downcast_ref::<PettyError>() {
                eprintln!("{}", format_petty_error(petty_err));
            } else {
                eprintln!("{} {err:#}", "Error:".red().bold());
            }
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli, config: &Config) -> Result<()> {
    let ctx = Settings::new(cli, config);
    debug!(db = %ctx.db_path.display(), format = ?ctx.format, "Resolved settings");

    match &cli.command {
        Commands::Capture(args) => cmd_capture(&ctx, args),
        Commands::List(args) => cmd_list(&ctx, args),
        Commands::Show(args) => cmd_show(&ctx, args),
        Commands::Diff(args) => cmd_diff(&ctx, args),
        Commands::Delete(args) => cmd_delete(&ctx, args),
        Commands::Config(args) => cmd_config(&ctx, config, args),
        Commands::Completions(args) => {
            cmd_completions(args);
            Ok(())
        }
    }
}

/// Settings resolved from CLI flags, environment and config file.
struct Settings {
    db_path: PathBuf,
    format: OutputFormat,
    quiet: bool,
}

impl Settings {
    fn new(cli: &Cli, config: &Config) -> Self {
        let format = cli
            .format
            .or_else(|| OutputFormat::from_config(&config.output.format))
            .unwrap_or_default();

        Self {
            db_path: cli.db.clone().unwrap_or_else(|| config.db_path()),
            format,
            quiet: cli.quiet,
        }
    }

    /// Open the store for reading, without creating a new database file.
    fn open_existing(&self) -> Result<Option<Storage>> {
        if !self.db_path.exists() {
            return Ok(None);
        }
        Ok(Some(Storage::open(&self.db_path)?))
    }

    /// Open the store, failing with `NotFound` for `id` when there is no database.
    fn open_for(&self, id: SnapshotId) -> Result<Storage> {
        self.open_existing()?
            .ok_or_else(|| PettyError::snapshot_not_found(id).into())
    }
}

fn print_json<T: serde::Serialize>(format: OutputFormat, value: &T) -> Result<()> {
    let out = if matches!(format, OutputFormat::JsonPretty) {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    println!("{out}");
    Ok(())
}

fn cmd_capture(ctx: &Settings, args: &CaptureArgs) -> Result<()> {
    let source = JsonFileSource::new(&args.followers, &args.following);
    let mut handle = spawn_capture(&ctx.db_path, source)?;

    let pb = if ctx.quiet || ctx.format != OutputFormat::Text {
        ProgressBar::hidden()
    } else {
        let pb = ProgressBar::new_spinner();
        pb.set_style(ProgressStyle::default_spinner().template("{spinner:.green} {msg}")?);
        pb.enable_steady_tick(Duration::from_millis(100));
        pb
    };

    let summary = loop {
        match handle.poll(Duration::from_millis(100)) {
            CapturePoll::Stage(stage) => pb.set_message(stage.message()),
            CapturePoll::Pending => {}
            CapturePoll::Done(result) => {
                pb.finish_and_clear();
                break result?;
            }
        }
    };

    match ctx.format {
        OutputFormat::Json | OutputFormat::JsonPretty => print_json(ctx.format, &summary)?,
        OutputFormat::Csv => {
            println!("snapshot_id,followers,following,accounts");
            println!(
                "{},{},{},{}",
                summary.snapshot_id,
                summary.followers_count,
                summary.following_count,
                summary.account_count
            );
        }
        OutputFormat::Text if ctx.quiet => {}
        OutputFormat::Text => {
            println!(
                "{} Snapshot {} created",
                "✓".green(),
                format!("#{}", summary.snapshot_id).bold()
            );
            println!(
                "  Followers: {}",
                format_number_usize(summary.followers_count).cyan()
            );
            println!(
                "  Following: {}",
                format_number_usize(summary.following_count).cyan()
            );
            println!(
                "  Accounts:  {}",
                format_number_usize(summary.account_count).cyan()
            );
        }
    }

    Ok(())
}

fn cmd_list(ctx: &Settings, args: &ListArgs) -> Result<()> {
    let mut snapshots = match ctx.open_existing()? {
        Some(storage) => storage.list_snapshots()?,
        None => Vec::new(),
    };
    if let Some(limit) = args.limit {
        snapshots.truncate(limit);
    }

    match ctx.format {
        OutputFormat::Json | OutputFormat::JsonPretty => print_json(ctx.format, &snapshots)?,
        OutputFormat::Csv => {
            println!("id,created_at,account_count");
            for s in &snapshots {
                println!("{},{},{}", s.id, s.created_at.to_rfc3339(), s.account_count);
            }
        }
        OutputFormat::Text => {
            if snapshots.is_empty() {
                println!("{}", "No snapshots found.".yellow());
                println!(
                    "Run {} to create your first one.",
                    "petty capture --followers <FILE> --following <FILE>".bold()
                );
                return Ok(());
            }

            println!("{}", "Snapshots".bold().cyan());
            println!("{}", "─".repeat(DIVIDER_WIDTH));
            for s in &snapshots {
                println!(
                    "  {:<6} {}  {:<12} {}",
                    format!("#{}", s.id).bold(),
                    s.created_at.format("%Y-%m-%d %H:%M:%S"),
                    format_relative_date(s.created_at).dimmed(),
                    format!("{} accounts", format_number_usize(s.account_count)).dimmed()
                );
            }
        }
    }

    Ok(())
}

fn cmd_show(ctx: &Settings, args: &ShowArgs) -> Result<()> {
    let storage = ctx.open_for(args.id)?;
    let snapshot = storage.get_snapshot(args.id)?;
    let rows = storage.get_relationship_rows(args.id, args.filter)?;
    let counts = storage.relationship_counts(args.id)?;

    match ctx.format {
        OutputFormat::Json | OutputFormat::JsonPretty => print_json(
            ctx.format,
            &json!({
                "snapshot": snapshot,
                "filter": args.filter,
                "counts": counts,
                "accounts": rows,
            }),
        )?,
        OutputFormat::Csv => {
            println!("account_id,username,display_name,url,is_follower,is_following");
            for r in &rows {
                println!(
                    "{},{},{},{},{},{}",
                    csv_field(&r.account.account_id),
                    csv_field(&r.account.username),
                    csv_field(&r.account.display_name),
                    csv_field(&r.account.url),
                    r.is_follower,
                    r.is_following
                );
            }
        }
        OutputFormat::Text => {
            println!(
                "{} {}  {}",
                format!("Snapshot #{}", snapshot.id).bold().cyan(),
                snapshot.created_at.format("%Y-%m-%d %H:%M:%S"),
                format_relative_date(snapshot.created_at).dimmed()
            );
            println!(
                "  {} followers · {} following · {} mutual · {} not following back · {} not followed back",
                counts.followers,
                counts.following,
                counts.mutuals,
                counts.not_following_back,
                counts.not_followed_back
            );
            println!("{}", "─".repeat(DIVIDER_WIDTH));
            println!(
                "{} ({})",
                args.filter.title().bold(),
                format_number_usize(rows.len())
            );

            if rows.is_empty() {
                println!("  {}", "No accounts in this category.".dimmed());
            }
            for r in &rows {
                print_row(r);
            }
        }
    }

    Ok(())
}

fn print_row(row: &RelationshipRow) {
    let badge = match (row.is_follower, row.is_following) {
        (true, true) => "MUTUAL".on_green(),
        (true, false) => "FOLLOWER".on_blue(),
        (false, true) => "FOLLOWING".on_magenta(),
        (false, false) => "NONE".dimmed(),
    };
    println!(
        "  {} @{} {}",
        badge,
        row.account.username.bold(),
        row.account.display_name
    );
    if !row.account.url.is_empty() {
        println!("    {}", row.account.url.dimmed());
    }
}

fn cmd_diff(ctx: &Settings, args: &DiffArgs) -> Result<()> {
    let storage = ctx.open_for(args.current)?;

    let previous = match args.previous {
        Some(id) => id,
        None => {
            if let Some(previous) = storage.previous_snapshot(args.current)? {
                previous.id
            } else {
                if matches!(ctx.format, OutputFormat::Json | OutputFormat::JsonPretty) {
                    println!("null");
                } else {
                    println!(
                        "{}",
                        format!(
                            "Snapshot #{} is the oldest snapshot; there is nothing to compare it with.",
                            args.current
                        )
                        .yellow()
                    );
                }
                return Ok(());
            }
        }
    };

    let diff = storage.diff(args.current, previous)?;

    match ctx.format {
        OutputFormat::Json | OutputFormat::JsonPretty => print_json(ctx.format, &diff)?,
        OutputFormat::Csv => {
            println!("change,account_id,username,display_name,url");
            let changes = diff
                .new_followers
                .iter()
                .map(|a| ("new_follower", a))
                .chain(diff.unfollowers.iter().map(|a| ("unfollower", a)));
            for (change, a) in changes {
                println!(
                    "{change},{},{},{},{}",
                    csv_field(&a.account_id),
                    csv_field(&a.username),
                    csv_field(&a.display_name),
                    csv_field(&a.url)
                );
            }
        }
        OutputFormat::Text => {
            println!(
                "{}",
                format!("Changes from #{} to #{}", diff.previous, diff.current)
                    .bold()
                    .cyan()
            );
            println!("{}", "─".repeat(DIVIDER_WIDTH));

            println!(
                "{} ({})",
                "New followers".green().bold(),
                diff.new_followers.len()
            );
            print_accounts(&diff.new_followers, &"+".green().to_string());
            println!();
            println!("{} ({})", "Unfollowers".red().bold(), diff.unfollowers.len());
            print_accounts(&diff.unfollowers, &"-".red().to_string());
        }
    }

    Ok(())
}

fn print_accounts(accounts: &[Account], marker: &str) {
    if accounts.is_empty() {
        println!("  {}", "None".dimmed());
    }
    for a in accounts {
        println!("  {marker} @{} {}", a.username.bold(), a.display_name.dimmed());
    }
}

fn cmd_delete(ctx: &Settings, args: &DeleteArgs) -> Result<()> {
    let mut storage = ctx.open_for(args.id)?;
    let snapshot = storage.get_snapshot(args.id)?;

    if !args.yes && !confirm_delete(&snapshot)? {
        if !ctx.quiet {
            println!("{}", "Cancelled.".yellow());
        }
        return Ok(());
    }

    let removed = storage.delete_snapshot(args.id)?;

    match ctx.format {
        OutputFormat::Json | OutputFormat::JsonPretty => print_json(
            ctx.format,
            &json!({ "deleted": snapshot.id, "accounts_removed": removed }),
        )?,
        OutputFormat::Csv => {
            println!("deleted,accounts_removed");
            println!("{},{removed}", snapshot.id);
        }
        OutputFormat::Text if ctx.quiet => {}
        OutputFormat::Text => {
            println!(
                "{} Snapshot #{} deleted ({} accounts)",
                "✓".green(),
                snapshot.id,
                format_number_usize(removed)
            );
        }
    }

    Ok(())
}

fn confirm_delete(snapshot: &Snapshot) -> Result<bool> {
    eprint!(
        "Delete snapshot #{} from {} ({} accounts)? [y/N] ",
        snapshot.id,
        snapshot.created_at.format("%Y-%m-%d %H:%M:%S"),
        snapshot.account_count
    );
    io::stderr().flush()?;

    let mut answer = String::new();
    io::stdin()
        .lock()
        .read_line(&mut answer)
        .context("Failed to read confirmation")?;
    Ok(matches!(answer.trim().to_lowercase().as_str(), "y" | "yes"))
}

fn cmd_config(ctx: &Settings, config: &Config, args: &ConfigArgs) -> Result<()> {
    let config_path = Config::user_config_path();

    if args.show {
        return show_config(ctx, config, config_path.as_deref());
    }

    // clap guarantees --init when --show is absent.
    let path = config_path.context("Could not determine config directory")?;
    Config::write_sample(&path)?;
    if !ctx.quiet {
        println!("{} Wrote sample config to {}", "✓".green(), path.display());
        println!("Edit it to add your server URL and access token.");
    }
    Ok(())
}

fn show_config(ctx: &Settings, config: &Config, config_path: Option<&Path>) -> Result<()> {
    let shown = config.redacted();
    match ctx.format {
        OutputFormat::Json | OutputFormat::JsonPretty => print_json(ctx.format, &shown)?,
        _ => {
            println!("{}", "Current Configuration".bold().cyan());
            println!("  Database: {}", ctx.db_path.display());
            println!(
                "  Config file: {}",
                config_path.map_or_else(|| "unavailable".to_string(), |p| p.display().to_string())
            );
            if let Err(e) = config.validate(false) {
                println!("  {} {e}", "!".yellow());
            }
            println!();
            print!("{}", toml::to_string_pretty(&shown)?);
        }
    }
    Ok(())
}

fn cmd_completions(args: &CompletionsArgs) {
    let mut cmd = Cli::command();
    generate(args.shell, &mut cmd, "petty", &mut io::stdout());
}
