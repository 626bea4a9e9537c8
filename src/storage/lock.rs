use fs2::FileExt as _;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::{BuildError, Result};
use crate::logging::{operations, status};

/// Advisory lock held for the duration of one configure/build/install run.
///
/// Concurrent runs for the same signature block here; the lock is released when
/// the value is dropped.
#[derive(Debug)]
pub struct BuildLock {
    file: File,
    path: PathBuf,
}

impl BuildLock {
    /// Acquire an exclusive lock on `path`, creating the lockfile if needed.
    ///
    /// This call blocks until the lock is available.
    pub fn acquire(path: &Path) -> Result<Self> {
        let lock_err = |source| BuildError::Lock {
            path: path.to_path_buf(),
            source,
        };

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(lock_err)?;
        }

        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .read(true)
            .write(true)
            .open(path)
            .map_err(lock_err)?;

        if file.try_lock_exclusive().is_err() {
            debug!(
                operation = operations::LOCK,
                path = %path.display(),
                "waiting for another run to release the build lock"
            );
            file.lock_exclusive().map_err(lock_err)?;
        }

        debug!(
            operation = operations::LOCK,
            status = status::SUCCESS,
            path = %path.display(),
            "build lock acquired"
        );

        Ok(Self {
            file,
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for BuildLock {
    fn drop(&mut self) {
        let _ = self.file.unlock();
    }
}
