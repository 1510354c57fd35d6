//! Output mode abstraction for robot and human output.

use std::path::Path;

use crate::cli::Cli;
use crate::database::{MergeReport, TableSummary};
use crate::error::SwitchError;
use crate::replicate::ReplicationReport;
use crate::workflow::MigrationReport;

pub mod human;
pub mod robot;

pub use human::HumanOutput;
pub use robot::RobotOutput;

/// JSON formatting options for robot mode.
#[derive(Debug, Clone, Copy)]
pub enum RobotFormat {
    /// Pretty-printed JSON (default for --robot).
    Json,
    /// Single-line JSON (--format=json-compact).
    JsonCompact,
}

/// Determines how command output is rendered.
#[derive(Debug, Clone, Copy)]
pub enum OutputMode {
    /// JSON output for scripts.
    Robot(RobotFormat),
    /// Styled terminal output for human users.
    Human { color: bool },
}

impl OutputMode {
    /// Create OutputMode from CLI arguments.
    #[must_use]
    pub fn from_cli(cli: &Cli) -> Self {
        if cli.use_json() {
            let format = if cli.use_compact_json() {
                RobotFormat::JsonCompact
            } else {
                RobotFormat::Json
            };
            Self::Robot(format)
        } else {
            Self::Human {
                color: !cli.no_color,
            }
        }
    }

    /// Convert into the appropriate Output implementation.
    #[must_use]
    pub fn into_output(self) -> Box<dyn Output> {
        match self {
            Self::Robot(format) => Box::new(RobotOutput::new(format)),
            Self::Human { color } => {
                if !color {
                    console::set_colors_enabled(false);
                    console::set_colors_enabled_stderr(false);
                }
                Box::new(HumanOutput::new())
            }
        }
    }
}

/// Trait for all output operations.
///
/// Commands call these methods without knowing the output mode.
pub trait Output {
    // Basic messages
    fn success(&self, message: &str);
    fn error(&self, error: &SwitchError);
    fn warning(&self, message: &str);

    // Steps
    /// A finished backup or restore copy.
    fn replication(&self, step: &str, src: &Path, dst: &Path, report: &ReplicationReport);
    fn truncated(&self, database: &Path, table: &str, rows: usize);
    fn merge(&self, report: &MergeReport);
    fn migration(&self, report: &MigrationReport);

    // Inspection
    fn table_summary(&self, summary: &TableSummary);

    // Metadata
    fn version_info(&self, version: &str, git_sha: Option<&str>, build_time: Option<&str>);
}
