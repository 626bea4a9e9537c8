/// Canonical shared-library entry in the install tree
///
/// `-l<name>` needs `lib<name>.so` (or `lib<name>.dylib`), but installs often
/// only carry versioned files such as `lib<name>.so.1.23.2`. This module picks
/// the newest versioned file and points the canonical name at it.
use std::cmp::Ordering;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::error::{list_dir, BuildError, Result};
use crate::logging::{operations, status};

/// Shared-library naming convention
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    /// `lib<name>.so`, versioned as `lib<name>.so.1.2.3`
    Linux,
    /// `lib<name>.dylib`, versioned as `lib<name>.1.2.3.dylib`
    MacOs,
}

impl Platform {
    pub fn current() -> Self {
        if cfg!(target_os = "macos") {
            Platform::MacOs
        } else {
            Platform::Linux
        }
    }

    pub fn canonical_name(self, library: &str) -> String {
        match self {
            Platform::Linux => format!("lib{}.so", library),
            Platform::MacOs => format!("lib{}.dylib", library),
        }
    }

    /// File-name glob for versioned shared libraries
    fn versioned_pattern(self, library: &str) -> String {
        match self {
            Platform::Linux => format!("lib{}.so.*", library),
            Platform::MacOs => format!("lib{}.*.dylib", library),
        }
    }
}

/// Result of [`ensure_canonical_library`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Normalized {
    /// Canonical entry was already there
    AlreadyPresent,
    /// Relative symlink to the named candidate
    Linked(String),
    /// Byte copy of the named candidate (symlink creation failed)
    Copied(String),
}

impl Normalized {
    /// File name the canonical entry now refers to, if this run created it
    pub fn source(&self) -> Option<&str> {
        match self {
            Normalized::AlreadyPresent => None,
            Normalized::Linked(name) | Normalized::Copied(name) => Some(name),
        }
    }
}

/// All numeric runs in `name`, in order (`libfoo.so.1.23.2` -> `[1, 23, 2]`).
pub fn natural_version_key(name: &str) -> Vec<u64> {
    name.split(|c: char| !c.is_ascii_digit())
        .filter(|run| !run.is_empty())
        .map(|run| run.parse().unwrap_or(u64::MAX))
        .collect()
}

fn compare_candidates(a: &str, b: &str) -> Ordering {
    natural_version_key(a)
        .cmp(&natural_version_key(b))
        .then_with(|| a.cmp(b))
}

/// Versioned shared libraries in `lib_dir`, excluding the canonical name and static archives.
pub fn find_candidates(lib_dir: &Path, library: &str, platform: Platform) -> Result<Vec<PathBuf>> {
    let canonical = platform.canonical_name(library);
    let pattern = lib_dir
        .join(platform.versioned_pattern(library))
        .to_string_lossy()
        .into_owned();
    let pattern = escape_dir(lib_dir, &pattern);

    let paths = glob::glob(&pattern).map_err(|e| {
        BuildError::io(
            format!("Invalid library pattern {}", pattern),
            io::Error::new(io::ErrorKind::InvalidInput, e.to_string()),
        )
    })?;

    let mut candidates: Vec<PathBuf> = paths
        .filter_map(|entry| entry.ok())
        .filter(|path| {
            let name = file_name(path);
            name != canonical && !name.ends_with(".a")
        })
        .collect();
    candidates.sort();
    Ok(candidates)
}

/// Escape glob metacharacters in the directory part of `pattern`.
fn escape_dir(dir: &Path, pattern: &str) -> String {
    let dir_str = dir.to_string_lossy();
    match pattern.strip_prefix(dir_str.as_ref()) {
        Some(rest) => format!("{}{}", glob::Pattern::escape(&dir_str), rest),
        None => pattern.to_string(),
    }
}

/// The candidate with the greatest natural version, ties broken by name.
pub fn select_candidate(candidates: &[PathBuf]) -> Option<&PathBuf> {
    candidates
        .iter()
        .max_by(|a, b| compare_candidates(&file_name(a), &file_name(b)))
}

/// Whether `lib_dir` already holds a shared library for `library`.
///
/// This is a presence check only; it does not verify the file's contents.
pub fn has_shared_library(lib_dir: &Path, library: &str, platform: Platform) -> bool {
    lib_dir.join(platform.canonical_name(library)).exists()
        || find_candidates(lib_dir, library, platform)
            .map(|c| !c.is_empty())
            .unwrap_or(false)
}

/// Make sure `lib_dir` contains the canonical unversioned library entry.
pub fn ensure_canonical_library(
    lib_dir: &Path,
    library: &str,
    platform: Platform,
) -> Result<Normalized> {
    normalize_with(lib_dir, library, platform, symlink_file)
}

/// [`ensure_canonical_library`] with the link step supplied by the caller.
///
/// `link(target, link_path)` must create `link_path` pointing at the relative
/// `target`; when it fails the chosen library is copied instead.
fn normalize_with<L>(lib_dir: &Path, library: &str, platform: Platform, link: L) -> Result<Normalized>
where
    L: FnOnce(&Path, &Path) -> io::Result<()>,
{
    let canonical = lib_dir.join(platform.canonical_name(library));

    match fs::symlink_metadata(&canonical) {
        Ok(meta) if meta.file_type().is_symlink() && !canonical.exists() => {
            warn!(
                operation = operations::NORMALIZE,
                path = %canonical.display(),
                "replacing dangling library symlink"
            );
            fs::remove_file(&canonical).map_err(|e| {
                BuildError::io(format!("Failed to remove {}", canonical.display()), e)
            })?;
        }
        Ok(_) => return Ok(Normalized::AlreadyPresent),
        Err(_) => {}
    }

    let candidates = find_candidates(lib_dir, library, platform)?;
    let Some(chosen) = select_candidate(&candidates) else {
        return Err(BuildError::NoSharedLibrary {
            pattern: format!("{}*", platform.canonical_name(library)),
            dir: lib_dir.to_path_buf(),
            listing: list_dir(lib_dir),
        });
    };
    let target = file_name(chosen);

    match link(Path::new(&target), &canonical) {
        Ok(()) => {
            info!(
                operation = operations::NORMALIZE,
                status = status::SUCCESS,
                path = %canonical.display(),
                target = %target,
                "created library symlink"
            );
            Ok(Normalized::Linked(target))
        }
        Err(e) => {
            warn!(
                operation = operations::NORMALIZE,
                path = %canonical.display(),
                error = %e,
                "symlink failed, copying library instead"
            );
            fs::copy(chosen, &canonical).map_err(|e| {
                BuildError::io(
                    format!("Failed to copy {} to {}", chosen.display(), canonical.display()),
                    e,
                )
            })?;
            Ok(Normalized::Copied(target))
        }
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

#[cfg(unix)]
fn symlink_file(target: &Path, link: &Path) -> io::Result<()> {
    std::os::unix::fs::symlink(target, link)
}

#[cfg(windows)]
fn symlink_file(target: &Path, link: &Path) -> io::Result<()> {
    std::os::windows::fs::symlink_file(target, link)
}
