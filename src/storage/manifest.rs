/// Build manifest written into each finished install tree
///
/// Records what produced the install so `depcache cache list` can describe it.
/// The skip-if-built decision does not consult it.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::build::Toggles;
use crate::error::{BuildError, Result};
use crate::toolchain::ToolchainEnv;

pub const MANIFEST_FILE: &str = ".depcache.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildManifest {
    pub dependency: String,
    pub version: String,
    pub signature: String,
    pub toggles: Toggles,
    pub extra: String,
    pub toolchain: ToolchainEnv,
    /// File name the canonical library entry resolves to
    pub library: Option<String>,
    /// True when the run reused an existing install
    pub reused: bool,
    pub finished_at: DateTime<Utc>,
}

impl BuildManifest {
    pub fn load(install_dir: &Path) -> Option<Self> {
        let content = fs::read_to_string(install_dir.join(MANIFEST_FILE)).ok()?;
        serde_json::from_str(&content).ok()
    }

    pub fn save(&self, install_dir: &Path) -> Result<()> {
        let path = install_dir.join(MANIFEST_FILE);
        let json = serde_json::to_string_pretty(self).map_err(|e| {
            BuildError::io(
                "Failed to serialize build manifest",
                std::io::Error::new(std::io::ErrorKind::InvalidData, e),
            )
        })?;
        fs::write(&path, json)
            .map_err(|e| BuildError::io(format!("Failed to write {}", path.display()), e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_save_then_load() {
        let temp = TempDir::new().unwrap();
        let manifest = BuildManifest {
            dependency: "onnxruntime".to_string(),
            version: "1.23.2".to_string(),
            signature: "0123456789ab".to_string(),
            toggles: Toggles {
                tests: false,
                acl: false,
                xnnpack: true,
            },
            extra: "FOO=1".to_string(),
            toolchain: ToolchainEnv {
                cxx: Some("clang++".to_string()),
                ..Default::default()
            },
            library: Some("libonnxruntime.so.1.23.2".to_string()),
            reused: false,
            finished_at: Utc::now(),
        };

        manifest.save(temp.path()).unwrap();
        assert_eq!(BuildManifest::load(temp.path()), Some(manifest));
    }

    #[test]
    fn test_load_missing_or_corrupt() {
        let temp = TempDir::new().unwrap();
        assert!(BuildManifest::load(temp.path()).is_none());

        fs::write(temp.path().join(MANIFEST_FILE), "{not json").unwrap();
        assert!(BuildManifest::load(temp.path()).is_none());
    }
}
