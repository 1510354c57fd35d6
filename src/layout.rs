//! Paths inside the device and backup roots.

use std::io;
use std::path::{Component, Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::config::Settings;

/// Where the device is mounted, where its backup lives, and the names of the
/// private folder and database inside both.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceLayout {
    pub mount: PathBuf,
    pub backup: PathBuf,
    pub private_dir: String,
    pub database_name: String,
}

impl DeviceLayout {
    pub fn new(mount: impl Into<PathBuf>, backup: impl Into<PathBuf>, settings: &Settings) -> Self {
        Self {
            mount: mount.into(),
            backup: backup.into(),
            private_dir: settings.private_dir.clone(),
            database_name: settings.database_name.clone(),
        }
    }

    /// `<mount>/.kobo`
    pub fn device_private_dir(&self) -> PathBuf {
        self.mount.join(&self.private_dir)
    }

    /// `<mount>/.kobo/KoboReader.sqlite`
    pub fn device_database(&self) -> PathBuf {
        self.device_private_dir().join(&self.database_name)
    }

    /// `<backup>/.kobo`
    pub fn backup_private_dir(&self) -> PathBuf {
        self.backup.join(&self.private_dir)
    }

    /// `<backup>/.kobo/KoboReader.sqlite`, the database as it was before the wipe.
    pub fn backup_database(&self) -> PathBuf {
        self.backup_private_dir().join(&self.database_name)
    }

    /// Paths of the two per-run database files kept in the backup root.
    pub fn merge_files(&self, stamp: &RunStamp) -> MergeFiles {
        let dir = self.backup_private_dir();
        MergeFiles {
            device_copy: dir.join(format!("{}.device-backup-{stamp}", self.database_name)),
            working: dir.join(format!("{}.temp-{stamp}", self.database_name)),
        }
    }
}

/// Database files created in the backup root during the merge step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MergeFiles {
    /// Untouched copy of the post-login device database.
    pub device_copy: PathBuf,
    /// Merge output, later installed on the device.
    pub working: PathBuf,
}

/// Timestamp suffix distinguishing files from different runs.
///
/// Rendered fixed-width as `<unix seconds>.<microseconds>`, the fraction
/// always zero-padded to six digits (`1700000000.500000`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunStamp(DateTime<Utc>);

impl RunStamp {
    #[must_use]
    pub fn now() -> Self {
        Self(Utc::now())
    }

    #[must_use]
    pub const fn at(time: DateTime<Utc>) -> Self {
        Self(time)
    }
}

impl std::fmt::Display for RunStamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{:06}", self.0.timestamp(), self.0.timestamp_subsec_micros())
    }
}

/// The metadata database under any device-shaped `root`.
pub fn metadata_database(root: &Path, settings: &Settings) -> PathBuf {
    root.join(&settings.private_dir).join(&settings.database_name)
}

/// Absolute form of `path` with symlinks resolved, for paths that may not
/// exist yet.
///
/// The deepest existing ancestor is canonicalized and the missing tail is
/// appended with `.` and `..` folded.
pub fn resolve_path(path: &Path) -> io::Result<PathBuf> {
    let absolute = std::path::absolute(path)?;
    let mut tail = Vec::new();
    let mut existing = absolute.as_path();
    let mut resolved = loop {
        match existing.canonicalize() {
            Ok(resolved) => break resolved,
            Err(e) => {
                let (Some(parent), Some(last)) = (existing.parent(), existing.components().next_back())
                else {
                    return Err(e);
                };
                tail.push(last.as_os_str().to_os_string());
                existing = parent;
            }
        }
    };
    for name in tail.into_iter().rev() {
        match Path::new(&name).components().next() {
            Some(Component::ParentDir) => {
                resolved.pop();
            }
            Some(Component::CurDir) => {}
            _ => resolved.push(name),
        }
    }
    Ok(resolved)
}

/// Returns true if one of the two paths lies inside the other, or they are
/// the same directory.
pub fn paths_overlap(a: &Path, b: &Path) -> io::Result<bool> {
    let (a, b) = (resolve_path(a)?, resolve_path(b)?);
    Ok(a.starts_with(&b) || b.starts_with(&a))
}

/// Returns true if `path` is an existing directory.
pub fn is_mounted(path: &Path) -> bool {
    path.is_dir()
}
