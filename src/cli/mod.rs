//! CLI argument definitions.

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// koboswitch - Move a Kobo e-reader to another account without losing its library.
///
/// Backs up the device, wipes the signed-in account, waits for you to sign in
/// with the new account, restores the backup and carries the library over to
/// the new account.
#[derive(Parser, Debug)]
#[command(name = "koboswitch", version, about, long_about = None)]
#[command(propagate_version = true, args_conflicts_with_subcommands = true)]
pub struct Cli {
    /// Output format (text for humans, json for scripts)
    #[arg(
        long,
        short = 'f',
        default_value = "text",
        global = true,
        env = "KOBOSWITCH_FORMAT"
    )]
    pub format: OutputFormat,

    /// Robot mode: equivalent to --format=json
    #[arg(long, global = true)]
    pub robot: bool,

    /// Verbose output (-v debug, -vv trace)
    #[arg(long, short = 'v', global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Quiet mode (errors only)
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true, env = "NO_COLOR")]
    pub no_color: bool,

    /// Configuration file (default: <config dir>/koboswitch/config.toml)
    #[arg(long, global = true, env = "KOBOSWITCH_CONFIG", value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Directory the Kobo is mounted on (shorthand for `run`)
    #[arg(value_name = "MOUNT", requires = "backup")]
    pub mount: Option<PathBuf>,

    /// Backup destination; must not exist yet
    #[arg(value_name = "BACKUP")]
    pub backup: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Output format selection.
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text with optional color
    #[default]
    Text,
    /// JSON output for scripts
    Json,
    /// Compact JSON (single line)
    JsonCompact,
}

impl Cli {
    /// Returns true if output should be JSON (robot mode or explicit --format=json).
    pub const fn use_json(&self) -> bool {
        self.robot || matches!(self.format, OutputFormat::Json | OutputFormat::JsonCompact)
    }

    /// Returns true if output should be compact JSON.
    pub const fn use_compact_json(&self) -> bool {
        matches!(self.format, OutputFormat::JsonCompact)
    }

    /// The `run` arguments given as bare positionals, if any.
    pub fn shorthand_run(&self) -> Option<RunArgs> {
        match (&self.mount, &self.backup) {
            (Some(mount), Some(backup)) => Some(RunArgs {
                mount: mount.clone(),
                backup: backup.clone(),
                yes: false,
                no_symlinks: false,
            }),
            _ => None,
        }
    }
}

/// Available commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    // === Full sequence ===
    /// Back up, wipe the account, wait for the new sign-in, restore and merge
    Run(RunArgs),

    // === Single steps ===
    /// Copy the whole device into a new backup directory
    Backup(BackupArgs),

    /// Delete the signed-in account from the device database
    Truncate(TruncateArgs),

    /// Copy a backup back onto the device, leaving its private folder alone
    Restore(RestoreArgs),

    /// Build a database with the schema of --new and the account rows of --old
    Merge(MergeArgs),

    /// Show the account table's columns and row count
    Inspect(InspectArgs),

    // === Utilities ===
    /// Show version and build information
    Version,

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// === Argument Structs ===

#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    /// Directory the Kobo is mounted on
    #[arg(value_name = "MOUNT")]
    pub mount: PathBuf,

    /// Backup destination; must not exist yet
    #[arg(value_name = "BACKUP")]
    pub backup: PathBuf,

    /// Answer yes to every confirmation except the reconnect prompt
    #[arg(long, short = 'y')]
    pub yes: bool,

    /// Skip symbolic links instead of recreating them
    #[arg(long)]
    pub no_symlinks: bool,
}

#[derive(Args, Debug)]
pub struct BackupArgs {
    /// Directory the Kobo is mounted on
    #[arg(value_name = "MOUNT")]
    pub mount: PathBuf,

    /// Backup destination; must not exist yet
    #[arg(value_name = "BACKUP")]
    pub backup: PathBuf,

    /// Skip symbolic links instead of recreating them
    #[arg(long)]
    pub no_symlinks: bool,
}

#[derive(Args, Debug)]
pub struct TruncateArgs {
    /// Directory the Kobo is mounted on
    #[arg(value_name = "MOUNT")]
    pub mount: PathBuf,

    /// Do not ask for confirmation
    #[arg(long, short = 'y')]
    pub yes: bool,
}

#[derive(Args, Debug)]
pub struct RestoreArgs {
    /// Backup made by `koboswitch backup`
    #[arg(value_name = "BACKUP")]
    pub backup: PathBuf,

    /// Directory the Kobo is mounted on
    #[arg(value_name = "MOUNT")]
    pub mount: PathBuf,

    /// Skip symbolic links instead of recreating them
    #[arg(long)]
    pub no_symlinks: bool,
}

#[derive(Args, Debug)]
pub struct MergeArgs {
    /// Database holding the account rows to keep
    #[arg(long, value_name = "DB")]
    pub old: PathBuf,

    /// Database whose schema and other tables are kept
    #[arg(long, value_name = "DB")]
    pub new: PathBuf,

    /// Where to write the merged database; must not exist yet
    #[arg(long, short = 'o', value_name = "DB")]
    pub output: PathBuf,
}

#[derive(Args, Debug)]
pub struct InspectArgs {
    /// Database file to inspect
    #[arg(value_name = "DB")]
    pub database: PathBuf,

    /// Table to inspect (default: the configured account table)
    #[arg(long, short = 't')]
    pub table: Option<String>,
}

#[derive(Args, Debug)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
