use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by the build pipeline.
///
/// Every variant is fatal: the run aborts and the stamp file is left untouched.
/// Toolchain probing never produces one of these; probe misses are logged and
/// the build continues without runtime-library flags.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("Bad extra definition entry (need KEY=VALUE): {0}")]
    InvalidExtraDefinition(String),

    #[error("Expected CMakeLists.txt at: {}", .0.display())]
    MissingSourceLayout(PathBuf),

    #[error("Failed to start {tool}: {source}")]
    ToolSpawn {
        tool: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{step} step failed with {status}: {command}")]
    ToolFailed {
        step: &'static str,
        command: String,
        status: String,
    },

    #[error("Install libdir not found: {}\n{listing}", .path.display())]
    MissingLibDir { path: PathBuf, listing: String },

    #[error("Shared build requested but no {pattern} found in {}\n{listing}", .dir.display())]
    NoSharedLibrary {
        pattern: String,
        dir: PathBuf,
        listing: String,
    },

    #[error("Invalid cache filter: {0}")]
    InvalidCacheFilter(String),

    #[error("Failed to lock {}: {source}", .path.display())]
    Lock {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },
}

impl BuildError {
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, BuildError>;

/// Render the entries of `dir` for error diagnostics, one per line.
pub fn list_dir(dir: &std::path::Path) -> String {
    let mut names: Vec<String> = match std::fs::read_dir(dir) {
        Ok(entries) => entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.file_name().to_string_lossy().into_owned())
            .collect(),
        Err(e) => return format!("  (cannot list {}: {})", dir.display(), e),
    };

    if names.is_empty() {
        return format!("  ({} is empty)", dir.display());
    }

    names.sort();
    names
        .iter()
        .map(|name| format!("  {}", name))
        .collect::<Vec<_>>()
        .join("\n")
}
