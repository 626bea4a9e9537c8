use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use super::manifest::BuildManifest;
use crate::error::{BuildError, Result};
use crate::signature::{Signature, SIGNATURE_LEN, UNKNOWN_VERSION};

/// Persistent directories for one (version, signature) pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CacheLayout {
    pub root: PathBuf,
    /// Download cache, shared by every signature of a version
    pub fetch_dir: PathBuf,
    pub build_dir: PathBuf,
    pub install_dir: PathBuf,
}

impl CacheLayout {
    pub fn new(root: &Path, version: &str, signature: &Signature) -> Self {
        let version = path_component(version);
        Self {
            root: root.to_path_buf(),
            fetch_dir: root.join("fetchcontent").join(&version),
            build_dir: root.join("build").join(&version).join(signature.as_str()),
            install_dir: root
                .join("install")
                .join(&version)
                .join(signature.as_str()),
        }
    }

    /// Install library directory
    pub fn lib_dir(&self) -> PathBuf {
        self.install_dir.join("lib")
    }

    /// Lock file guarding the build tree.
    ///
    /// Lives next to the build directory so a forced wipe does not remove it.
    pub fn lock_path(&self) -> PathBuf {
        let mut name = self
            .build_dir
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".lock");
        self.build_dir.with_file_name(name)
    }

    pub fn ensure_dirs(&self) -> Result<()> {
        for dir in [&self.fetch_dir, &self.build_dir, &self.install_dir] {
            fs::create_dir_all(dir).map_err(|e| {
                BuildError::io(format!("Failed to create {}", dir.display()), e)
            })?;
        }
        Ok(())
    }

    /// Delete the build and install trees. The fetch cache is kept.
    pub fn invalidate(&self) -> Result<()> {
        for dir in [&self.build_dir, &self.install_dir] {
            if dir.exists() {
                fs::remove_dir_all(dir).map_err(|e| {
                    BuildError::io(format!("Failed to remove {}", dir.display()), e)
                })?;
            }
        }
        Ok(())
    }
}

/// Make a version string safe to use as a single path component.
fn path_component(version: &str) -> String {
    let cleaned: String = version
        .trim()
        .chars()
        .map(|c| if c == '/' || c == '\\' { '_' } else { c })
        .collect();

    match cleaned.as_str() {
        "" | "." | ".." => UNKNOWN_VERSION.to_string(),
        _ => cleaned,
    }
}

/// One cached install found under a cache root
#[derive(Debug, Clone, Serialize)]
pub struct CacheEntry {
    pub version: String,
    pub signature: String,
    pub install_dir: PathBuf,
    pub build_dir: PathBuf,
    pub size_bytes: u64,
    pub manifest: Option<BuildManifest>,
}

/// Enumerate `install/<version>/<signature>` entries, sorted by version then signature.
pub fn list_entries(root: &Path) -> Vec<CacheEntry> {
    let install_root = root.join("install");
    let mut entries = Vec::new();

    for version_dir in subdirs(&install_root) {
        let version = file_name(&version_dir);
        for install_dir in subdirs(&version_dir) {
            let signature = file_name(&install_dir);
            let build_dir = root.join("build").join(&version).join(&signature);
            let size_bytes = dir_size(&install_dir) + dir_size(&build_dir);
            let manifest = BuildManifest::load(&install_dir);

            entries.push(CacheEntry {
                version: version.clone(),
                signature,
                install_dir,
                build_dir,
                size_bytes,
                manifest,
            });
        }
    }

    entries.sort_by(|a, b| (&a.version, &a.signature).cmp(&(&b.version, &b.signature)));
    entries
}

/// Which cached trees [`clean`] removes
#[derive(Debug, Clone, Default)]
pub struct CleanFilter {
    pub version: Option<String>,
    pub signature: Option<String>,
    /// Also remove download caches (ignored when a signature is given)
    pub include_fetch: bool,
}

/// Remove cached build and install trees matching `filter`.
///
/// Returns the removed paths. Callers must not run this concurrently with a
/// build of the same entry.
pub fn clean(root: &Path, filter: &CleanFilter) -> Result<Vec<PathBuf>> {
    let signature = filter
        .signature
        .as_deref()
        .map(|sig| {
            Signature::parse(sig).ok_or_else(|| {
                BuildError::InvalidCacheFilter(format!(
                    "signature must be {} hex characters, got '{}'",
                    SIGNATURE_LEN, sig
                ))
            })
        })
        .transpose()?;
    let version = filter
        .version
        .as_deref()
        .map(|v| {
            validate_version_filter(v)
                .map(|v| v.to_string())
                .map_err(BuildError::InvalidCacheFilter)
        })
        .transpose()?;
    let mut kinds = vec!["build", "install"];
    if filter.include_fetch && signature.is_none() {
        kinds.push("fetchcontent");
    }

    let mut targets = Vec::new();
    for kind in kinds {
        for version_dir in subdirs(&root.join(kind)) {
            if version.as_deref().is_some_and(|v| file_name(&version_dir) != v) {
                continue;
            }
            match (&signature, kind) {
                (Some(_), "fetchcontent") => {}
                (Some(sig), _) => {
                    targets.push(version_dir.join(sig.as_str()));
                    if kind == "build" {
                        targets.push(version_dir.join(format!("{}.lock", sig)));
                    }
                }
                (None, _) => targets.push(version_dir),
            }
        }
    }

    let mut removed = Vec::new();
    for target in targets {
        let result = match fs::symlink_metadata(&target) {
            Ok(meta) if meta.is_dir() => fs::remove_dir_all(&target),
            Ok(_) => fs::remove_file(&target),
            Err(_) => continue,
        };
        result.map_err(|e| BuildError::io(format!("Failed to remove {}", target.display()), e))?;
        removed.push(target);
    }
    Ok(removed)
}

/// Check a user-supplied version names exactly one directory under a cache tree.
pub fn validate_version_filter(version: &str) -> std::result::Result<&str, String> {
    let version = version.trim();
    if version.is_empty() || version == "." || version == ".." || version.contains(['/', '\\']) {
        return Err(format!(
            "version must be a single path component, got '{}'",
            version
        ));
    }
    Ok(version)
}

fn subdirs(dir: &Path) -> Vec<PathBuf> {
    let Ok(read) = fs::read_dir(dir) else {
        return Vec::new();
    };
    read.filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().map(|t| t.is_dir()).unwrap_or(false))
        .map(|entry| entry.path())
        .collect()
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Total size of regular files under `dir` (symlinks are not followed)
pub fn dir_size(dir: &Path) -> u64 {
    WalkDir::new(dir)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .filter_map(|entry| entry.metadata().ok())
        .map(|meta| meta.len())
        .sum()
}
