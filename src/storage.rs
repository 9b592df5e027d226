//! Filesystem helpers for the offline writers: atomic replacement and an
//! exclusive writer lock.

use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Name of the lock file placed in a locked directory.
pub const LOCK_FILE_NAME: &str = ".pdfoutline.lock";

/// Replace `path` with `bytes` so readers see either the old or the new file.
///
/// Writes a sibling temp file and renames it over the target.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    let tmp = path.with_file_name(format!(".{}.tmp.{}", file_name, std::process::id()));

    let result = (|| {
        let mut file = fs::File::create(&tmp)?;
        file.write_all(bytes)?;
        file.sync_all()?;
        fs::rename(&tmp, path)
    })();

    if result.is_err() {
        let _ = fs::remove_file(&tmp);
    }
    Ok(result?)
}

/// Exclusive lock on a directory, released on drop.
#[derive(Debug)]
pub struct WriterLock {
    path: PathBuf,
}

impl WriterLock {
    /// Take the lock on `dir`, creating the directory if needed.
    ///
    /// Fails with [`Error::Locked`] while another holder exists.
    pub fn acquire(dir: &Path) -> Result<Self> {
        fs::create_dir_all(dir)?;
        let path = dir.join(LOCK_FILE_NAME);
        match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(mut file) => {
                // Own the file before writing so a failed write still removes it
                let lock = Self { path };
                writeln!(file, "{}", std::process::id())?;
                log::debug!("acquired writer lock {}", lock.path.display());
                Ok(lock)
            }
            Err(e) if e.kind() == ErrorKind::AlreadyExists => Err(Error::Locked(dir.to_path_buf())),
            Err(e) => Err(e.into()),
        }
    }
}

impl Drop for WriterLock {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_file(&self.path) {
            log::warn!("failed to release lock {}: {}", self.path.display(), e);
        }
    }
}
