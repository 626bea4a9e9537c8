//! Native build orchestration
//!
//! A [`BuildRequest`] describes one invocation. [`orchestrator::Orchestrator`]
//! turns it into a signature and cache layout, redirects the visible links,
//! runs configure/build/install through a [`runner::ToolRunner`] and finishes
//! the install tree with [`normalize::ensure_canonical_library`].

pub mod defines;
pub mod normalize;
pub mod orchestrator;
pub mod runner;

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

pub use defines::{compute_defines, parse_extra_definitions, DefineInputs, Defines};
pub use normalize::{ensure_canonical_library, Normalized, Platform};
pub use orchestrator::{BuildOutcome, BuildPlan, Orchestrator};
pub use runner::{ProcessRunner, ToolCommand, ToolRunner};

use crate::config::{DependencyConfig, GeneratorChoice};
use crate::signature::UNKNOWN_VERSION;
use crate::toolchain::ToolchainEnv;

/// File at the source root carrying the dependency's release version
pub const VERSION_FILE: &str = "VERSION_NUMBER";

/// Feature switches that change what gets built
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Toggles {
    /// Unit tests and ONNX test runner
    pub tests: bool,
    /// Arm Compute Library execution provider
    pub acl: bool,
    /// XNNPACK execution provider
    pub xnnpack: bool,
}

impl Toggles {
    /// Literal form used in signatures
    pub fn literal(on: bool) -> &'static str {
        if on {
            "1"
        } else {
            "0"
        }
    }

    /// CMake boolean form
    pub fn cmake(on: bool) -> &'static str {
        if on {
            "ON"
        } else {
            "OFF"
        }
    }

    /// Parse a toggle value as passed on the command line.
    pub fn parse(value: &str) -> std::result::Result<bool, String> {
        match value.trim().to_ascii_lowercase().as_str() {
            "1" | "on" | "true" | "yes" | "enabled" => Ok(true),
            "0" | "off" | "false" | "no" | "disabled" => Ok(false),
            _ => Err(format!(
                "expected one of 1/0, on/off, true/false, yes/no, enabled/disabled, got '{}'",
                value
            )),
        }
    }
}

/// Everything one build invocation needs
#[derive(Debug, Clone)]
pub struct BuildRequest {
    pub dependency: DependencyConfig,
    /// Configure tool (cmake)
    pub cmake: PathBuf,
    pub source_root: PathBuf,
    pub version: String,
    pub toggles: Toggles,
    /// Raw `KEY=VALUE;KEY=VALUE` definitions, validated before any tool runs
    pub extra: String,
    pub cache_root: PathBuf,
    pub visible_build: PathBuf,
    pub visible_install: PathBuf,
    /// Touched only after a fully successful run
    pub stamp: PathBuf,
    pub force: bool,
    pub skip_if_built: bool,
    pub toolchain: ToolchainEnv,
    pub probe_runtime: bool,
    pub jobs: usize,
    pub generator: GeneratorChoice,
}

impl BuildRequest {
    /// Directory holding the dependency's CMakeLists.txt
    pub fn cmake_source_dir(&self) -> PathBuf {
        self.source_root.join(&self.dependency.source_subdir)
    }
}

/// Pick the version used in the signature and cache paths.
///
/// Explicit value first, then the source tree's `VERSION_NUMBER` file. Without
/// either, every unversioned build shares the `unknown` bucket.
pub fn resolve_version(explicit: Option<&str>, source_root: &Path) -> String {
    if let Some(version) = explicit.map(str::trim).filter(|v| !v.is_empty()) {
        return version.to_string();
    }

    if let Ok(content) = fs::read_to_string(source_root.join(VERSION_FILE)) {
        if let Some(version) = content.lines().next().map(str::trim).filter(|v| !v.is_empty()) {
            return version.to_string();
        }
    }

    warn!(
        source = %source_root.display(),
        "no dependency version given and no {} found, using '{}' bucket",
        VERSION_FILE,
        UNKNOWN_VERSION
    );
    UNKNOWN_VERSION.to_string()
}
