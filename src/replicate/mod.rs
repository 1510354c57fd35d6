//! Recursive directory replication.
//!
//! Copies a source tree into a destination tree, merging into whatever the
//! destination already holds. Used both for the initial device backup and for
//! restoring that backup onto the freshly signed-in device.

mod copier;
pub mod mock;

pub use copier::{FileCopier, NativeCopier};

use std::ffi::OsStr;
use std::path::Path;

use globset::{Glob, GlobSet, GlobSetBuilder};
use indicatif::ProgressBar;
use serde::Serialize;
use tracing::{debug, info, instrument, trace};
use walkdir::WalkDir;

use crate::error::{Result, SwitchError};

/// Glob patterns matched against entry names at every depth.
#[derive(Debug, Clone, Default)]
pub struct IgnoreSet {
    patterns: Vec<String>,
    set: Option<GlobSet>,
}

impl IgnoreSet {
    /// Compile `patterns`.
    pub fn new<S: AsRef<str>>(patterns: &[S]) -> Result<Self> {
        if patterns.is_empty() {
            return Ok(Self::default());
        }

        let mut builder = GlobSetBuilder::new();
        for pattern in patterns {
            let pattern = pattern.as_ref();
            let glob = Glob::new(pattern).map_err(|e| SwitchError::InvalidPattern {
                pattern: pattern.to_string(),
                reason: e.to_string(),
            })?;
            builder.add(glob);
        }

        let set = builder.build().map_err(|e| SwitchError::InvalidPattern {
            pattern: patterns
                .iter()
                .map(AsRef::as_ref)
                .collect::<Vec<_>>()
                .join(", "),
            reason: e.to_string(),
        })?;

        Ok(Self {
            patterns: patterns.iter().map(|p| p.as_ref().to_string()).collect(),
            set: Some(set),
        })
    }

    /// An empty set that ignores nothing.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Returns true if an entry with this name should be skipped.
    pub fn is_match(&self, name: &OsStr) -> bool {
        self.set.as_ref().is_some_and(|set| set.is_match(name))
    }

    /// The patterns this set was built from.
    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }
}

/// How a tree copy treats existing files and symlinks.
#[derive(Debug, Clone, Default)]
pub struct CopyOptions {
    pub ignore: IgnoreSet,
    /// Replace files that already exist at the destination.
    pub overwrite: bool,
    /// Recreate symlinks; when false they are skipped.
    pub preserve_symlinks: bool,
}

impl CopyOptions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_ignore(mut self, ignore: IgnoreSet) -> Self {
        self.ignore = ignore;
        self
    }

    #[must_use]
    pub const fn with_overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = overwrite;
        self
    }

    #[must_use]
    pub const fn with_symlinks(mut self, preserve: bool) -> Self {
        self.preserve_symlinks = preserve;
        self
    }
}

/// Counts from one tree copy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReplicationReport {
    pub directories_created: usize,
    pub files_copied: usize,
    pub files_overwritten: usize,
    pub files_skipped: usize,
    pub symlinks_created: usize,
    pub symlinks_skipped: usize,
    pub ignored: usize,
    pub bytes_copied: u64,
}

impl ReplicationReport {
    /// Files written to the destination, new or replaced.
    #[must_use]
    pub const fn files_written(&self) -> usize {
        self.files_copied + self.files_overwritten
    }
}

/// Walks a source tree and mirrors it through a [`FileCopier`].
pub struct TreeReplicator<'a, C: FileCopier + ?Sized> {
    copier: &'a C,
    options: CopyOptions,
    progress: ProgressBar,
}

impl<'a, C: FileCopier + ?Sized> TreeReplicator<'a, C> {
    pub fn new(copier: &'a C, options: CopyOptions) -> Self {
        Self {
            copier,
            options,
            progress: ProgressBar::hidden(),
        }
    }

    /// Report each entry on `progress` as it is processed.
    #[must_use]
    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        self.progress = progress;
        self
    }

    /// Copy everything under `src` into `dst`.
    ///
    /// `dst` is created if absent. Entries whose name matches the ignore set
    /// are skipped, and ignored directories are not descended into.
    #[instrument(skip_all, fields(src = %src.display(), dst = %dst.display(), overwrite = self.options.overwrite))]
    pub fn replicate(&self, src: &Path, dst: &Path) -> Result<ReplicationReport> {
        if !src.exists() {
            return Err(SwitchError::SourceNotFound {
                path: src.to_path_buf(),
            });
        }
        if !src.is_dir() {
            return Err(SwitchError::NotADirectory {
                path: src.to_path_buf(),
            });
        }

        let mut report = ReplicationReport::default();
        if !dst.exists() {
            std::fs::create_dir_all(dst)?;
            report.directories_created += 1;
        }

        let mut walker = WalkDir::new(src)
            .min_depth(1)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter();

        while let Some(entry) = walker.next() {
            let entry = entry.map_err(|e| SwitchError::Walk {
                path: e.path().unwrap_or(src).to_path_buf(),
                reason: e.to_string(),
            })?;
            let file_type = entry.file_type();

            if self.options.ignore.is_match(entry.file_name()) {
                debug!(path = %entry.path().display(), "Ignoring entry");
                report.ignored += 1;
                if file_type.is_dir() {
                    walker.skip_current_dir();
                }
                continue;
            }

            let rel = entry
                .path()
                .strip_prefix(src)
                .map_err(|e| SwitchError::Other(format!("Path outside source tree: {e}")))?;
            let target = dst.join(rel);
            self.progress.set_message(rel.display().to_string());
            self.progress.inc(1);

            if file_type.is_symlink() {
                if self.options.preserve_symlinks {
                    self.copier.copy_symlink(entry.path(), &target)?;
                    report.symlinks_created += 1;
                } else {
                    trace!(path = %entry.path().display(), "Skipping symlink");
                    report.symlinks_skipped += 1;
                }
            } else if file_type.is_dir() {
                if !target.exists() {
                    std::fs::create_dir(&target)?;
                    report.directories_created += 1;
                }
            } else if target.is_file() {
                if self.options.overwrite {
                    debug!(path = %target.display(), "Overwriting destination");
                    report.bytes_copied += self.copier.copy_file(entry.path(), &target)?;
                    report.files_overwritten += 1;
                } else {
                    trace!(path = %target.display(), "Destination exists, skipping");
                    report.files_skipped += 1;
                }
            } else {
                trace!(path = %entry.path().display(), "Copying");
                report.bytes_copied += self.copier.copy_file(entry.path(), &target)?;
                report.files_copied += 1;
            }
        }

        info!(
            copied = report.files_copied,
            overwritten = report.files_overwritten,
            skipped = report.files_skipped,
            ignored = report.ignored,
            bytes = report.bytes_copied,
            "Tree copy complete"
        );
        Ok(report)
    }
}
