//! The individual migration steps, free of prompts and stage tracking.
//!
//! [`Migration`](super::Migration) chains these behind confirmation gates;
//! the single-step CLI commands call them directly.

use std::path::PathBuf;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, instrument};

use crate::config::Settings;
use crate::database::{KoboDatabase, MergeReport, create_merged_copy};
use crate::error::{Result, ResultExt, SwitchError};
use crate::layout::{DeviceLayout, MergeFiles, RunStamp, is_mounted, paths_overlap};
use crate::replicate::{CopyOptions, FileCopier, IgnoreSet, ReplicationReport, TreeReplicator};

/// Shared context for the steps of one run.
pub struct Steps<'a, C: FileCopier + ?Sized> {
    pub layout: &'a DeviceLayout,
    pub settings: &'a Settings,
    pub copier: &'a C,
    pub show_progress: bool,
}

impl<'a, C: FileCopier + ?Sized> Steps<'a, C> {
    pub fn new(layout: &'a DeviceLayout, settings: &'a Settings, copier: &'a C) -> Self {
        Self {
            layout,
            settings,
            copier,
            show_progress: false,
        }
    }

    /// Draw a spinner while copying trees.
    #[must_use]
    pub fn with_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    /// Fails unless the mount point exists.
    pub fn require_mount(&self) -> Result<()> {
        if self.layout.mount.exists() {
            Ok(())
        } else {
            Err(SwitchError::MountPointNotFound {
                path: self.layout.mount.clone(),
            })
        }
    }

    /// Fails if the backup destination already exists.
    pub fn require_fresh_backup(&self) -> Result<()> {
        if self.layout.backup.exists() {
            Err(SwitchError::BackupExists {
                path: self.layout.backup.clone(),
            })
        } else {
            Ok(())
        }
    }

    /// Fails if the backup root and the mount point contain one another.
    pub fn require_separate_roots(&self) -> Result<()> {
        let overlap = paths_overlap(&self.layout.mount, &self.layout.backup).with_context(|| {
            format!(
                "Failed to resolve {} and {}",
                self.layout.mount.display(),
                self.layout.backup.display()
            )
        })?;
        if overlap {
            Err(SwitchError::NestedRoots {
                mount: self.layout.mount.clone(),
                backup: self.layout.backup.clone(),
            })
        } else {
            Ok(())
        }
    }

    /// Copy the whole device into a new backup root.
    #[instrument(skip_all, fields(mount = %self.layout.mount.display(), backup = %self.layout.backup.display()))]
    pub fn backup(&self) -> Result<ReplicationReport> {
        self.require_mount()?;
        self.require_fresh_backup()?;
        self.require_separate_roots()?;

        info!("Backing up the device, this may take a while");
        let options = CopyOptions::new().with_symlinks(self.settings.preserve_symlinks);
        let report = self.copy_tree("Backing up", &self.layout.mount, &self.layout.backup, options)?;
        info!(files = report.files_copied, "Backup complete");
        Ok(report)
    }

    /// Delete every account row on the device, forcing a new sign-in.
    #[instrument(skip_all)]
    pub fn truncate(&self) -> Result<usize> {
        let db = KoboDatabase::open(self.layout.device_database())?;
        db.truncate(&self.settings.user_table)
    }

    /// Copy the backup back onto the device, leaving its private folder alone.
    #[instrument(skip_all, fields(mount = %self.layout.mount.display(), backup = %self.layout.backup.display()))]
    pub fn restore(&self) -> Result<ReplicationReport> {
        if !is_mounted(&self.layout.mount) {
            return Err(SwitchError::MountPointUnavailable {
                path: self.layout.mount.clone(),
            });
        }
        self.require_separate_roots()?;

        info!("Restoring the backup onto the device, this may take a while");
        let options = CopyOptions::new()
            .with_ignore(self.restore_ignore()?)
            .with_overwrite(true)
            .with_symlinks(self.settings.preserve_symlinks);
        self.copy_tree("Restoring", &self.layout.backup, &self.layout.mount, options)
    }

    /// Build the merged database inside the backup root.
    ///
    /// Keeps an untouched copy of the post-login device database, then makes
    /// the working copy from it and fills its account table with the rows
    /// saved in the backup.
    #[instrument(skip_all, fields(stamp = %stamp))]
    pub fn merge(&self, stamp: &RunStamp) -> Result<(MergeFiles, MergeReport)> {
        let device_db = self.layout.device_database();
        if !device_db.is_file() {
            return Err(SwitchError::DatabaseNotFound { path: device_db });
        }

        let files = self.layout.merge_files(stamp);
        std::fs::create_dir_all(self.layout.backup_private_dir())?;

        info!(path = %files.device_copy.display(), "Saving the post-login device database");
        self.copier.copy_file(&device_db, &files.device_copy)?;

        info!(path = %files.working.display(), "Merging account rows into a working copy");
        let report = create_merged_copy(
            self.copier,
            &self.layout.backup_database(),
            &files.device_copy,
            &files.working,
            &self.settings.user_table,
        )?;
        Ok((files, report))
    }

    /// Replace the device database with `merged`.
    #[instrument(skip_all, fields(merged = %merged.display()))]
    pub fn install(&self, merged: &std::path::Path) -> Result<PathBuf> {
        if !merged.is_file() {
            return Err(SwitchError::DatabaseNotFound {
                path: merged.to_path_buf(),
            });
        }
        let target = self.layout.device_database();
        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent)?;
        }
        self.copier.copy_file(merged, &target)?;
        info!(path = %target.display(), "Merged database installed");
        Ok(target)
    }

    fn restore_ignore(&self) -> Result<IgnoreSet> {
        self.settings.restore_ignore_set()
    }

    fn copy_tree(
        &self,
        label: &str,
        src: &std::path::Path,
        dst: &std::path::Path,
        options: CopyOptions,
    ) -> Result<ReplicationReport> {
        let progress = spinner(self.show_progress, label);
        let result = TreeReplicator::new(self.copier, options)
            .with_progress(progress.clone())
            .replicate(src, dst);
        progress.finish_and_clear();
        result
    }
}

fn spinner(enabled: bool, label: &str) -> ProgressBar {
    if !enabled {
        return ProgressBar::hidden();
    }
    let progress = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold} {pos} entries {wide_msg:.dim}") {
        progress.set_style(style);
    }
    progress.set_prefix(label.to_string());
    progress.enable_steady_tick(Duration::from_millis(120));
    progress
}
