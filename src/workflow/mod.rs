//! The account-switch sequence.
//!
//! ```text
//! Pending ─backup─▶ BackedUp ─truncate─▶ Truncated ─disconnect─▶ AwaitingNewLogin
//!     ─reconnect + restore─▶ Restored ─merge─▶ Merged ─install─▶ Installed
//! ```
//!
//! Every arrow waits on the operator through [`Confirm`]. Nothing is undone
//! automatically: the backup root is left in place as the recovery artifact,
//! and a failed run is recovered by restoring from it.

mod prompt;
mod steps;

pub use prompt::{AssumeYes, Checkpoint, Confirm, Prompt, ScriptedPrompt, TerminalPrompt, parse_answer};
pub use steps::Steps;

use std::fmt;
use std::path::PathBuf;

use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use crate::config::Settings;
use crate::database::MergeReport;
use crate::error::{Result, SwitchError};
use crate::layout::{DeviceLayout, MergeFiles, RunStamp, is_mounted};
use crate::replicate::{FileCopier, ReplicationReport};

/// Progress through the sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Pending,
    BackedUp,
    Truncated,
    AwaitingNewLogin,
    Restored,
    Merged,
    Installed,
}

impl Stage {
    /// The only stage reachable from this one.
    pub const fn next(self) -> Option<Self> {
        match self {
            Self::Pending => Some(Self::BackedUp),
            Self::BackedUp => Some(Self::Truncated),
            Self::Truncated => Some(Self::AwaitingNewLogin),
            Self::AwaitingNewLogin => Some(Self::Restored),
            Self::Restored => Some(Self::Merged),
            Self::Merged => Some(Self::Installed),
            Self::Installed => None,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::BackedUp => "backed_up",
            Self::Truncated => "truncated",
            Self::AwaitingNewLogin => "awaiting_new_login",
            Self::Restored => "restored",
            Self::Merged => "merged",
            Self::Installed => "installed",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Everything a run did, filled in as stages complete.
#[derive(Debug, Clone, Serialize)]
pub struct MigrationReport {
    pub stage: Stage,
    pub layout: DeviceLayout,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backup: Option<ReplicationReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub truncated_rows: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub restore: Option<ReplicationReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub merge_files: Option<MergeFiles>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub merge: Option<MergeReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub installed: Option<PathBuf>,
}

impl MigrationReport {
    fn new(layout: DeviceLayout) -> Self {
        Self {
            stage: Stage::Pending,
            layout,
            backup: None,
            truncated_rows: None,
            restore: None,
            merge_files: None,
            merge: None,
            installed: None,
        }
    }
}

/// Drives one run through every stage.
pub struct Migration<'a, C: FileCopier + ?Sized, P: Confirm + ?Sized> {
    steps: Steps<'a, C>,
    prompt: &'a mut P,
    stamp: RunStamp,
    report: MigrationReport,
}

impl<'a, C: FileCopier + ?Sized, P: Confirm + ?Sized> Migration<'a, C, P> {
    pub fn new(
        layout: &'a DeviceLayout,
        settings: &'a Settings,
        copier: &'a C,
        prompt: &'a mut P,
    ) -> Self {
        Self {
            steps: Steps::new(layout, settings, copier),
            prompt,
            stamp: RunStamp::now(),
            report: MigrationReport::new(layout.clone()),
        }
    }

    /// Draw spinners during tree copies.
    #[must_use]
    pub fn with_progress(mut self, show: bool) -> Self {
        self.steps = self.steps.with_progress(show);
        self
    }

    /// Use a fixed timestamp for the per-run database files.
    #[must_use]
    pub fn with_stamp(mut self, stamp: RunStamp) -> Self {
        self.stamp = stamp;
        self
    }

    /// The stage reached so far.
    pub const fn stage(&self) -> Stage {
        self.report.stage
    }

    /// What has happened so far.
    pub const fn report(&self) -> &MigrationReport {
        &self.report
    }

    /// Run every remaining stage.
    #[instrument(skip_all, fields(mount = %self.steps.layout.mount.display(), backup = %self.steps.layout.backup.display()))]
    pub fn run(&mut self) -> Result<MigrationReport> {
        self.backup()?;
        self.truncate()?;
        self.await_new_login()?;
        self.restore()?;
        self.merge()?;
        self.install()?;
        info!("Account switch complete, the device can be disconnected");
        Ok(self.report.clone())
    }

    /// `Pending → BackedUp`
    pub fn backup(&mut self) -> Result<&ReplicationReport> {
        self.expect_next(Stage::BackedUp)?;
        // Checked before asking, so a bad path fails without a prompt.
        self.steps.require_mount()?;
        self.steps.require_fresh_backup()?;
        self.steps.require_separate_roots()?;
        let layout = self.steps.layout;
        self.gate(
            Checkpoint::Backup,
            format!(
                "Back up {} to {}?",
                layout.mount.display(),
                layout.backup.display()
            ),
        )?;

        let report = self.steps.backup()?;
        self.advance(Stage::BackedUp)?;
        Ok(self.report.backup.insert(report))
    }

    /// `BackedUp → Truncated`
    pub fn truncate(&mut self) -> Result<usize> {
        self.expect_next(Stage::Truncated)?;
        self.gate(
            Checkpoint::Truncate,
            format!(
                "Delete the signed-in account from {}? The device will ask for an account on next start.",
                self.steps.layout.device_database().display()
            ),
        )?;

        let deleted = self.steps.truncate()?;
        self.report.truncated_rows = Some(deleted);
        self.advance(Stage::Truncated)?;
        Ok(deleted)
    }

    /// `Truncated → AwaitingNewLogin`, then wait for the device to come back.
    ///
    /// Returns once the mount point is a directory again.
    pub fn await_new_login(&mut self) -> Result<()> {
        self.expect_next(Stage::AwaitingNewLogin)?;
        self.gate(
            Checkpoint::Disconnect,
            "Disconnect the Kobo now and sign in with the new account. Continue once you have?",
        )?;
        self.advance(Stage::AwaitingNewLogin)?;

        let mount = self.steps.layout.mount.clone();
        self.gate(
            Checkpoint::Reconnect,
            format!(
                "Once signed in with the new account, reconnect the Kobo so it is mounted at {}. Ready?",
                mount.display()
            ),
        )?;

        while !is_mounted(&mount) {
            warn!(mount = %mount.display(), "Mount point not available");
            let retry = Prompt::new(
                Checkpoint::RetryMount,
                format!("{} is not mounted yet. Check again?", mount.display()),
            );
            if !self.prompt.confirm(&retry) {
                return Err(SwitchError::MountPointUnavailable { path: mount });
            }
        }
        debug!(mount = %mount.display(), "Device mounted");
        Ok(())
    }

    /// `AwaitingNewLogin → Restored`
    pub fn restore(&mut self) -> Result<&ReplicationReport> {
        self.expect_next(Stage::Restored)?;
        let report = self.steps.restore()?;
        self.advance(Stage::Restored)?;
        Ok(self.report.restore.insert(report))
    }

    /// `Restored → Merged`
    pub fn merge(&mut self) -> Result<&MergeReport> {
        self.expect_next(Stage::Merged)?;
        self.gate(
            Checkpoint::Merge,
            "Backup restored. Build the merged database?",
        )?;

        let (files, report) = self.steps.merge(&self.stamp)?;
        self.report.merge_files = Some(files);
        self.advance(Stage::Merged)?;
        Ok(self.report.merge.insert(report))
    }

    /// `Merged → Installed`
    pub fn install(&mut self) -> Result<PathBuf> {
        self.expect_next(Stage::Installed)?;
        let working = self
            .report
            .merge_files
            .as_ref()
            .map(|files| files.working.clone())
            .ok_or_else(|| SwitchError::Other("No merged database to install".to_string()))?;
        self.gate(
            Checkpoint::Install,
            format!(
                "Replace {} with the merged database?",
                self.steps.layout.device_database().display()
            ),
        )?;

        let target = self.steps.install(&working)?;
        self.report.installed = Some(target.clone());
        self.advance(Stage::Installed)?;
        Ok(target)
    }

    fn gate(&mut self, checkpoint: Checkpoint, message: impl Into<String>) -> Result<()> {
        let prompt = Prompt::new(checkpoint, message);
        if self.prompt.confirm(&prompt) {
            debug!(%checkpoint, "Confirmed");
            Ok(())
        } else {
            info!(%checkpoint, "Declined by operator");
            Err(SwitchError::Aborted {
                checkpoint: checkpoint.name().to_string(),
            })
        }
    }

    fn expect_next(&self, to: Stage) -> Result<()> {
        if self.report.stage.next() == Some(to) {
            Ok(())
        } else {
            Err(SwitchError::InvalidTransition {
                from: self.report.stage.to_string(),
                to: to.to_string(),
            })
        }
    }

    fn advance(&mut self, to: Stage) -> Result<()> {
        self.expect_next(to)?;
        info!(from = %self.report.stage, to = %to, "Stage complete");
        self.report.stage = to;
        Ok(())
    }
}
