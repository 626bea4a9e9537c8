/// Build-system-visible symlinks into the persistent cache
///
/// The consuming build always refers to the same project-relative paths; this
/// module keeps those paths pointing at whichever persistent directory the
/// current signature resolves to.
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::error::{BuildError, Result};
use crate::logging::{operations, status};

/// What `ensure_symlink` had to do
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkAction {
    Unchanged,
    Created,
    Replaced,
}

/// Make `visible` a symlink to `target`.
///
/// A correct symlink is left alone. Anything else at `visible` (a stale
/// symlink, a file, a real directory) is replaced. The new link is created
/// under a temporary name and renamed into place, so a stale link or file is
/// swapped without a window where `visible` is missing.
pub fn ensure_symlink(visible: &Path, target: &Path) -> Result<LinkAction> {
    let action = match fs::symlink_metadata(visible) {
        Ok(meta) if meta.file_type().is_symlink() => {
            let current = fs::read_link(visible).map_err(|e| {
                BuildError::io(format!("Failed to read link {}", visible.display()), e)
            })?;
            if current == target {
                debug!(
                    operation = operations::LINK,
                    status = status::SKIPPED,
                    path = %visible.display(),
                    "link already points at target"
                );
                return Ok(LinkAction::Unchanged);
            }
            LinkAction::Replaced
        }
        Ok(meta) if meta.is_dir() => {
            // rename() cannot replace a non-empty directory
            fs::remove_dir_all(visible).map_err(|e| {
                BuildError::io(format!("Failed to remove {}", visible.display()), e)
            })?;
            LinkAction::Replaced
        }
        Ok(_) => LinkAction::Replaced,
        Err(e) if e.kind() == io::ErrorKind::NotFound => LinkAction::Created,
        Err(e) => {
            return Err(BuildError::io(
                format!("Failed to inspect {}", visible.display()),
                e,
            ))
        }
    };

    if let Some(parent) = visible.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(|e| {
                BuildError::io(format!("Failed to create {}", parent.display()), e)
            })?;
        }
    }

    let staging = staging_path(visible);
    let _ = fs::remove_file(&staging);
    symlink_dir(target, &staging).map_err(|e| {
        BuildError::io(
            format!(
                "Failed to create symlink {} -> {}",
                staging.display(),
                target.display()
            ),
            e,
        )
    })?;

    if let Err(e) = fs::rename(&staging, visible) {
        let _ = fs::remove_file(&staging);
        return Err(BuildError::io(
            format!("Failed to move symlink into place at {}", visible.display()),
            e,
        ));
    }

    info!(
        operation = operations::LINK,
        status = status::SUCCESS,
        path = %visible.display(),
        target = %target.display(),
        "visible path redirected"
    );
    Ok(action)
}

fn staging_path(visible: &Path) -> PathBuf {
    let name = visible
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "link".to_string());
    visible.with_file_name(format!(".{}.tmp-{}", name, std::process::id()))
}

#[cfg(unix)]
fn symlink_dir(target: &Path, link: &Path) -> io::Result<()> {
    std::os::unix::fs::symlink(target, link)
}

#[cfg(windows)]
fn symlink_dir(target: &Path, link: &Path) -> io::Result<()> {
    std::os::windows::fs::symlink_dir(target, link)
}
