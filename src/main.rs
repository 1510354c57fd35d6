//! koboswitch - Move a Kobo e-reader to another account without losing its library.
//!
//! Provides both human-friendly and script-friendly (robot mode) interfaces.
#![forbid(unsafe_code)]

use std::io::{self, IsTerminal};

use clap::Parser;
use serde::Serialize;
use tracing::{debug, info};

use koboswitch::cli::{self, Cli, Commands, RunArgs};
use koboswitch::config::Settings;
use koboswitch::database::{KoboDatabase, create_merged_copy};
use koboswitch::error::{Result, SwitchError};
use koboswitch::layout::{DeviceLayout, metadata_database};
use koboswitch::logging::init_logging;
use koboswitch::output::{Output, OutputMode};
use koboswitch::replicate::NativeCopier;
use koboswitch::workflow::{
    AssumeYes, Checkpoint, Confirm, Migration, Prompt, Stage, Steps, TerminalPrompt,
};

/// Build information embedded at compile time.
mod build_info {
    pub const VERSION: &str = env!("CARGO_PKG_VERSION");

    pub fn git_sha() -> &'static str {
        option_env!("VERGEN_GIT_SHA").unwrap_or("unknown")
    }

    pub fn git_dirty() -> &'static str {
        option_env!("VERGEN_GIT_DIRTY").unwrap_or("false")
    }

    pub fn build_timestamp() -> &'static str {
        option_env!("VERGEN_BUILD_TIMESTAMP").unwrap_or("unknown")
    }

    pub fn rustc_semver() -> &'static str {
        option_env!("VERGEN_RUSTC_SEMVER").unwrap_or("unknown")
    }

    pub fn target() -> &'static str {
        option_env!("VERGEN_CARGO_TARGET_TRIPLE").unwrap_or("unknown")
    }
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.use_json(), cli.verbose, cli.quiet);
    debug!(version = build_info::VERSION, "Starting koboswitch");

    let output = OutputMode::from_cli(&cli).into_output();

    if let Err(e) = run(&cli, output.as_ref()) {
        output_error(output.as_ref(), &e);
        std::process::exit(e.exit_code());
    }
}

fn run(cli: &Cli, output: &dyn Output) -> Result<()> {
    match &cli.command {
        None => match cli.shorthand_run() {
            Some(args) => cmd_run(cli, output, &args),
            None => print_quick_start(cli),
        },
        Some(Commands::Run(args)) => cmd_run(cli, output, args),
        Some(Commands::Backup(args)) => cmd_backup(cli, output, args),
        Some(Commands::Truncate(args)) => cmd_truncate(cli, output, args),
        Some(Commands::Restore(args)) => cmd_restore(cli, output, args),
        Some(Commands::Merge(args)) => cmd_merge(cli, output, args),
        Some(Commands::Inspect(args)) => cmd_inspect(cli, output, args),
        Some(Commands::Version) => cmd_version(cli, output),
        Some(Commands::Completions(args)) => cmd_completions(args),
    }
}

// === Quick Start ===

#[derive(Serialize)]
struct QuickStart {
    tool: &'static str,
    version: &'static str,
    usage: &'static str,
    commands: Vec<QuickCommand>,
}

#[derive(Serialize)]
struct QuickCommand {
    name: &'static str,
    usage: &'static str,
    description: &'static str,
}

const COMMANDS: &[(&str, &str, &str)] = &[
    ("run", "koboswitch run <MOUNT> <BACKUP> [--yes]", "Full account switch"),
    ("backup", "koboswitch backup <MOUNT> <BACKUP>", "Copy the device into a new backup"),
    ("truncate", "koboswitch truncate <MOUNT>", "Delete the signed-in account"),
    ("restore", "koboswitch restore <BACKUP> <MOUNT>", "Copy a backup back onto the device"),
    (
        "merge",
        "koboswitch merge --old <DB> --new <DB> --output <DB>",
        "Carry account rows between databases",
    ),
    ("inspect", "koboswitch inspect <DB>", "Show the account table"),
];

/// Prints quick-start help for both humans and scripts.
#[allow(clippy::unnecessary_wraps)] // Consistent return type with other commands
fn print_quick_start(cli: &Cli) -> Result<()> {
    if cli.use_json() {
        let help = QuickStart {
            tool: "koboswitch",
            version: build_info::VERSION,
            usage: "koboswitch <MOUNT> <BACKUP>",
            commands: COMMANDS
                .iter()
                .map(|&(name, usage, description)| QuickCommand {
                    name,
                    usage,
                    description,
                })
                .collect(),
        };
        output_json(cli, &help);
    } else {
        println!(
            "{} {}",
            console::style("koboswitch").bold(),
            build_info::VERSION
        );
        println!("Move a Kobo e-reader to another account without losing its library.\n");
        println!("  {}", console::style("koboswitch <MOUNT> <BACKUP>").cyan());
        println!();
        for (_, usage, description) in COMMANDS {
            println!("  {:<56} {}", console::style(usage).cyan(), console::style(description).dim());
        }
        println!("\nRun `koboswitch --help` for all options.");
    }
    Ok(())
}

// === Commands ===

fn load_settings(cli: &Cli, no_symlinks: bool) -> Result<Settings> {
    let mut settings = Settings::load(cli.config.as_deref())?;
    if no_symlinks {
        settings.preserve_symlinks = false;
    }
    Ok(settings)
}

/// Spinners only make sense for a person watching a terminal.
fn show_progress(cli: &Cli) -> bool {
    !cli.use_json() && !cli.quiet && io::stderr().is_terminal()
}

fn cmd_run(cli: &Cli, output: &dyn Output, args: &RunArgs) -> Result<()> {
    let settings = load_settings(cli, args.no_symlinks)?;
    let layout = DeviceLayout::new(&args.mount, &args.backup, &settings);
    info!(mount = %layout.mount.display(), backup = %layout.backup.display(), "Starting account switch");

    let mut terminal = TerminalPrompt::stdio();
    let mut assume;
    let prompt: &mut dyn Confirm = if args.yes {
        assume = AssumeYes::new(terminal);
        &mut assume
    } else {
        &mut terminal
    };

    let mut migration =
        Migration::new(&layout, &settings, &NativeCopier, prompt).with_progress(show_progress(cli));
    match migration.run() {
        Ok(report) => {
            output.migration(&report);
            Ok(())
        }
        Err(e) => {
            if migration.stage() >= Stage::BackedUp {
                output.warning(&format!(
                    "Stopped after '{}'. The backup at {} is intact; `koboswitch restore` puts it back on the device",
                    migration.stage(),
                    layout.backup.display()
                ));
            }
            Err(e)
        }
    }
}

fn cmd_backup(cli: &Cli, output: &dyn Output, args: &cli::BackupArgs) -> Result<()> {
    let settings = load_settings(cli, args.no_symlinks)?;
    let layout = DeviceLayout::new(&args.mount, &args.backup, &settings);
    let report = Steps::new(&layout, &settings, &NativeCopier)
        .with_progress(show_progress(cli))
        .backup()?;
    output.replication("Backup", &layout.mount, &layout.backup, &report);
    Ok(())
}

fn cmd_truncate(cli: &Cli, output: &dyn Output, args: &cli::TruncateArgs) -> Result<()> {
    let settings = load_settings(cli, false)?;
    if !args.mount.exists() {
        return Err(SwitchError::MountPointNotFound {
            path: args.mount.clone(),
        });
    }
    let database = metadata_database(&args.mount, &settings);

    if !args.yes {
        let prompt = Prompt::new(
            Checkpoint::Truncate,
            format!(
                "Delete the signed-in account from {}? The device will ask for an account on next start.",
                database.display()
            ),
        );
        if !TerminalPrompt::stdio().confirm(&prompt) {
            return Err(SwitchError::Aborted {
                checkpoint: Checkpoint::Truncate.name().to_string(),
            });
        }
    }

    let rows = KoboDatabase::open(&database)?.truncate(&settings.user_table)?;
    output.truncated(&database, &settings.user_table, rows);
    Ok(())
}

fn cmd_restore(cli: &Cli, output: &dyn Output, args: &cli::RestoreArgs) -> Result<()> {
    let settings = load_settings(cli, args.no_symlinks)?;
    let layout = DeviceLayout::new(&args.mount, &args.backup, &settings);
    let report = Steps::new(&layout, &settings, &NativeCopier)
        .with_progress(show_progress(cli))
        .restore()?;
    output.replication("Restore", &layout.backup, &layout.mount, &report);
    Ok(())
}

fn cmd_merge(cli: &Cli, output: &dyn Output, args: &cli::MergeArgs) -> Result<()> {
    let settings = load_settings(cli, false)?;
    let report = create_merged_copy(
        &NativeCopier,
        &args.old,
        &args.new,
        &args.output,
        &settings.user_table,
    )?;
    output.merge(&report);
    Ok(())
}

fn cmd_inspect(cli: &Cli, output: &dyn Output, args: &cli::InspectArgs) -> Result<()> {
    let settings = load_settings(cli, false)?;
    let table = args.table.as_deref().unwrap_or(&settings.user_table);
    let summary = KoboDatabase::open_read_only(&args.database)?.summary(table)?;
    output.table_summary(&summary);
    Ok(())
}

#[allow(clippy::unnecessary_wraps)] // Consistent return type with other commands
fn cmd_version(cli: &Cli, output: &dyn Output) -> Result<()> {
    if cli.use_json() {
        output_json(
            cli,
            &serde_json::json!({
                "version": build_info::VERSION,
                "git_sha": build_info::git_sha(),
                "git_dirty": build_info::git_dirty() == "true",
                "build_timestamp": build_info::build_timestamp(),
                "rustc_version": build_info::rustc_semver(),
                "target": build_info::target(),
            }),
        );
    } else {
        output.version_info(
            build_info::VERSION,
            Some(build_info::git_sha()),
            Some(build_info::build_timestamp()),
        );
    }
    Ok(())
}

#[allow(clippy::unnecessary_wraps)] // Consistent return type with other commands
fn cmd_completions(args: &cli::CompletionsArgs) -> Result<()> {
    use clap::CommandFactory;
    clap_complete::generate(args.shell, &mut Cli::command(), "koboswitch", &mut io::stdout());
    Ok(())
}

// === Utility Functions ===

fn output_json<T: Serialize>(cli: &Cli, data: &T) {
    let json = if cli.use_compact_json() {
        serde_json::to_string(data)
    } else {
        serde_json::to_string_pretty(data)
    };
    match json {
        Ok(json) => println!("{json}"),
        Err(e) => tracing::warn!(error = %e, "Failed to serialize output"),
    }
}

fn output_error(output: &dyn Output, error: &SwitchError) {
    debug!(code = error.code(), exit_code = error.exit_code(), "Command failed");
    output.error(error);
}
