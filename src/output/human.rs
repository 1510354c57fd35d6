//! Human-friendly output implementation using console.

use std::path::Path;

use console::Term;
use tracing::{debug, instrument, trace};

use crate::database::{MergeReport, TableSummary};
use crate::error::SwitchError;
use crate::replicate::ReplicationReport;
use crate::theme::SwitchTheme;
use crate::workflow::MigrationReport;

use super::Output;

/// Styled terminal output implementation for human users.
pub struct HumanOutput {
    out: Term,
    err: Term,
    theme: SwitchTheme,
}

impl HumanOutput {
    #[instrument]
    pub fn new() -> Self {
        debug!("Creating HumanOutput");
        Self {
            out: Term::stdout(),
            err: Term::stderr(),
            theme: SwitchTheme::default(),
        }
    }

    fn line(&self, text: &str) {
        let _ = self.out.write_line(text);
    }

    fn field(&self, name: &str, value: impl std::fmt::Display) {
        self.line(&format!(
            "  {} {value}",
            self.theme.label.apply_to(format!("{name:<12}"))
        ));
    }

    fn path_field(&self, name: &str, path: &Path) {
        self.field(name, self.theme.path.apply_to(path.display()));
    }

    fn header(&self, title: &str) {
        self.line(&self.theme.header.apply_to(title).to_string());
    }

    fn replication_counts(&self, report: &ReplicationReport) {
        self.field(
            "Files",
            format!(
                "{} copied, {} overwritten, {} skipped",
                report.files_copied, report.files_overwritten, report.files_skipped
            ),
        );
        self.field("Directories", report.directories_created);
        if report.symlinks_created + report.symlinks_skipped > 0 {
            self.field(
                "Symlinks",
                format!(
                    "{} created, {} skipped",
                    report.symlinks_created, report.symlinks_skipped
                ),
            );
        }
        if report.ignored > 0 {
            self.field("Ignored", report.ignored);
        }
        self.field("Bytes", report.bytes_copied);
    }
}

impl Default for HumanOutput {
    fn default() -> Self {
        Self::new()
    }
}

impl Output for HumanOutput {
    fn success(&self, message: &str) {
        self.line(&format!("{} {message}", self.theme.success.apply_to("[OK]")));
    }

    #[instrument(skip(self))]
    fn error(&self, error: &SwitchError) {
        debug!(
            error = %error,
            recoverable = error.is_user_recoverable(),
            "Outputting error"
        );
        let _ = self.err.write_line(&format!(
            "{} {}",
            self.theme.error.apply_to("[ERR]").for_stderr(),
            console::style(error).bold().for_stderr()
        ));
        if let Some(suggestion) = error.suggestion() {
            trace!(suggestion, "Adding suggestion");
            let _ = self.err.write_line(&format!(
                "      {}",
                self.theme.muted.apply_to(suggestion).for_stderr()
            ));
        }
    }

    fn warning(&self, message: &str) {
        let _ = self.err.write_line(&format!(
            "{} {message}",
            self.theme.warning.apply_to("[WARN]").for_stderr()
        ));
    }

    #[instrument(skip(self, report))]
    fn replication(&self, step: &str, src: &Path, dst: &Path, report: &ReplicationReport) {
        debug!("Outputting replication report");
        self.success(&format!("{step} complete"));
        self.path_field("From", src);
        self.path_field("To", dst);
        self.replication_counts(report);
    }

    fn truncated(&self, database: &Path, table: &str, rows: usize) {
        self.success(&format!("Deleted {rows} row(s) from '{table}'"));
        self.path_field("Database", database);
    }

    #[instrument(skip_all)]
    fn merge(&self, report: &MergeReport) {
        debug!(rows = report.rows_inserted, "Outputting merge report");
        self.success(&format!(
            "Merged {} row(s) into '{}'",
            report.rows_inserted, report.table
        ));
        self.path_field("Output", &report.working_path);
        self.path_field("Rows from", &report.rows_source);
        self.field("Replaced", report.rows_removed);
        self.field("Columns", report.columns.len());
    }

    #[instrument(skip_all)]
    fn migration(&self, report: &MigrationReport) {
        debug!(stage = %report.stage, "Outputting migration report");
        self.header("Account switch");
        self.path_field("Device", &report.layout.mount);
        self.path_field("Backup", &report.layout.backup);
        self.field("Stage", self.theme.accent.apply_to(report.stage));
        if let Some(backup) = &report.backup {
            self.field("Backed up", format!("{} files", backup.files_copied));
        }
        if let Some(rows) = report.truncated_rows {
            self.field("Wiped", format!("{rows} account row(s)"));
        }
        if let Some(restore) = &report.restore {
            self.field(
                "Restored",
                format!("{} files, {} ignored", restore.files_written(), restore.ignored),
            );
        }
        if let Some(files) = &report.merge_files {
            self.path_field("Saved", &files.device_copy);
        }
        if let Some(merge) = &report.merge {
            self.field("Merged", format!("{} account row(s)", merge.rows_inserted));
        }
        if let Some(installed) = &report.installed {
            self.path_field("Installed", installed);
        }
        self.success("The device now carries the new account with the old library");
    }

    fn table_summary(&self, summary: &TableSummary) {
        self.header(&summary.path.display().to_string());
        self.field("Table", &summary.table);
        self.field("Rows", summary.rows);
        self.field("Columns", summary.columns.len());
        for (idx, column) in summary.columns.iter().enumerate() {
            self.line(&format!(
                "    {} {}",
                self.theme.muted.apply_to(format!("{idx:>3}")),
                self.theme.column.apply_to(column)
            ));
        }
    }

    fn version_info(&self, version: &str, git_sha: Option<&str>, build_time: Option<&str>) {
        self.header("koboswitch");
        self.field("Version", self.theme.value.apply_to(version));

        if let Some(sha) = git_sha {
            let dirty =
                sha.contains("dirty") || matches!(option_env!("VERGEN_GIT_DIRTY"), Some("true"));
            let clean_sha = sha.replace("(dirty)", "").trim().to_string();
            let suffix = if dirty {
                self.theme.warning.apply_to(" (dirty)").to_string()
            } else {
                String::new()
            };
            self.field("Git SHA", format!("{}{suffix}", self.theme.value.apply_to(clean_sha)));
        }

        if let Some(time) = build_time {
            self.field("Built", self.theme.muted.apply_to(time));
        }
        if let Some(rustc) = option_env!("VERGEN_RUSTC_SEMVER") {
            self.field("Rust", self.theme.muted.apply_to(rustc));
        }
        if let Some(target) = option_env!("VERGEN_CARGO_TARGET_TRIPLE") {
            self.field("Target", self.theme.muted.apply_to(target));
        }
    }
}
