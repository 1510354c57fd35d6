//! File-copy primitives used by the tree replicator.

use std::fs::File;
use std::io;
use std::path::Path;

use tracing::trace;

use crate::error::Result;

/// Low-level copy operations.
///
/// The replicator decides *what* to copy; implementations decide *how*.
/// Swapping the implementation lets tests observe or fail individual copies
/// without touching the walk logic.
pub trait FileCopier {
    /// Copy the contents of `src` to `dst`, replacing `dst` if it exists.
    ///
    /// Returns the number of bytes written.
    fn copy_file(&self, src: &Path, dst: &Path) -> Result<u64>;

    /// Recreate the symlink at `src` as `dst`, replacing any existing `dst`.
    fn copy_symlink(&self, src: &Path, dst: &Path) -> Result<()>;
}

/// Copier backed by the standard filesystem API.
///
/// Only file contents are copied. Permission bits are left to the
/// destination filesystem, which keeps copies onto FAT-formatted device
/// storage from failing on `chmod`.
#[derive(Debug, Clone, Copy, Default)]
pub struct NativeCopier;

impl FileCopier for NativeCopier {
    fn copy_file(&self, src: &Path, dst: &Path) -> Result<u64> {
        trace!(src = %src.display(), dst = %dst.display(), "Copying file contents");
        let mut reader = File::open(src)?;
        let mut writer = File::create(dst)?;
        let bytes = io::copy(&mut reader, &mut writer)?;
        // The device is unplugged between steps; data must be on disk.
        writer.sync_all()?;
        Ok(bytes)
    }

    fn copy_symlink(&self, src: &Path, dst: &Path) -> Result<()> {
        let target = std::fs::read_link(src)?;
        trace!(src = %src.display(), dst = %dst.display(), target = %target.display(), "Recreating symlink");

        if dst.symlink_metadata().is_ok() {
            std::fs::remove_file(dst)?;
        }
        create_symlink(src, &target, dst)
    }
}

#[cfg(unix)]
fn create_symlink(_src: &Path, target: &Path, dst: &Path) -> Result<()> {
    std::os::unix::fs::symlink(target, dst)?;
    Ok(())
}

#[cfg(windows)]
fn create_symlink(src: &Path, target: &Path, dst: &Path) -> Result<()> {
    if std::fs::metadata(src).is_ok_and(|m| m.is_dir()) {
        std::os::windows::fs::symlink_dir(target, dst)?;
    } else {
        std::os::windows::fs::symlink_file(target, dst)?;
    }
    Ok(())
}

#[cfg(not(any(unix, windows)))]
fn create_symlink(_src: &Path, _target: &Path, dst: &Path) -> Result<()> {
    Err(crate::error::SwitchError::Other(format!(
        "Symlinks are not supported on this platform: {}",
        dst.display()
    )))
}
