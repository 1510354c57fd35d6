//! Recording copier for tests.
//!
//! Wraps [`NativeCopier`] so files really land on disk, while logging every
//! operation and optionally failing on chosen file names.
//!
//! # Example
//!
//! ```rust,ignore
//! use koboswitch::replicate::mock::{CopyOp, RecordingCopier};
//!
//! let copier = RecordingCopier::new().fail_on("broken.epub");
//! let replicator = TreeReplicator::new(&copier, CopyOptions::default());
//! let _ = replicator.replicate(src, dst);
//! assert!(copier.operations().iter().any(|op| matches!(op, CopyOp::File { .. })));
//! ```

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing::debug;

use super::copier::{FileCopier, NativeCopier};
use crate::error::{Result, SwitchError};

/// Recorded copy operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CopyOp {
    File { src: PathBuf, dst: PathBuf },
    Symlink { src: PathBuf, dst: PathBuf },
}

impl CopyOp {
    /// Destination path of the operation.
    pub fn dst(&self) -> &Path {
        match self {
            Self::File { dst, .. } | Self::Symlink { dst, .. } => dst,
        }
    }
}

/// Copier that records operations and can inject failures.
#[derive(Debug, Default)]
pub struct RecordingCopier {
    log: Mutex<Vec<CopyOp>>,
    failing_names: Vec<OsString>,
}

impl RecordingCopier {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail any copy whose source file name equals `name`.
    #[must_use]
    pub fn fail_on(mut self, name: &str) -> Self {
        self.failing_names.push(OsString::from(name));
        self
    }

    /// Operations performed so far, in order.
    pub fn operations(&self) -> Vec<CopyOp> {
        self.log.lock().map(|log| log.clone()).unwrap_or_default()
    }

    /// Destinations of every file copy, in order.
    pub fn copied_files(&self) -> Vec<PathBuf> {
        self.operations()
            .into_iter()
            .filter_map(|op| match op {
                CopyOp::File { dst, .. } => Some(dst),
                CopyOp::Symlink { .. } => None,
            })
            .collect()
    }

    fn check_injected(&self, src: &Path) -> Result<()> {
        if src
            .file_name()
            .is_some_and(|name| self.failing_names.iter().any(|f| f == name))
        {
            debug!(src = %src.display(), "Injected copy failure");
            return Err(SwitchError::Other(format!(
                "injected failure copying {}",
                src.display()
            )));
        }
        Ok(())
    }

    fn record(&self, op: CopyOp) {
        if let Ok(mut log) = self.log.lock() {
            log.push(op);
        }
    }
}

impl FileCopier for RecordingCopier {
    fn copy_file(&self, src: &Path, dst: &Path) -> Result<u64> {
        self.check_injected(src)?;
        let bytes = NativeCopier.copy_file(src, dst)?;
        self.record(CopyOp::File {
            src: src.to_path_buf(),
            dst: dst.to_path_buf(),
        });
        Ok(bytes)
    }

    fn copy_symlink(&self, src: &Path, dst: &Path) -> Result<()> {
        self.check_injected(src)?;
        NativeCopier.copy_symlink(src, dst)?;
        self.record(CopyOp::Symlink {
            src: src.to_path_buf(),
            dst: dst.to_path_buf(),
        });
        Ok(())
    }
}
