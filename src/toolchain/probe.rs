/// Compiler family detection and runtime library discovery
///
/// Locates the directory holding a runtime support library the way the
/// compiler itself resolves it, without assuming an install layout:
/// 1. `-print-file-name=<lib>` for each candidate
/// 2. the `libraries:` line of `-print-search-dirs`
/// 3. `lib`, `lib/c++` and `lib/unwind` under the compiler's install prefix
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use serde::Serialize;
use tracing::debug;

/// Compiler family as reported by `--version`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum CompilerFamily {
    /// Apple's clang, shipped with Xcode
    VendorClang,
    GenericClang,
    Gnu,
    Unknown,
}

impl fmt::Display for CompilerFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CompilerFamily::VendorClang => "vendor-clang",
            CompilerFamily::GenericClang => "clang",
            CompilerFamily::Gnu => "gnu",
            CompilerFamily::Unknown => "unknown",
        };
        f.write_str(name)
    }
}

/// Classify a compiler from its `--version` output.
pub fn parse_family(version_output: &str) -> CompilerFamily {
    let first_line = version_output.lines().next().unwrap_or_default();

    if first_line.contains("Apple clang") || first_line.contains("Apple LLVM") {
        CompilerFamily::VendorClang
    } else if version_output.contains("clang version") {
        CompilerFamily::GenericClang
    } else if first_line.contains("(GCC)")
        || first_line.starts_with("gcc")
        || first_line.starts_with("g++")
        || version_output.contains("Free Software Foundation")
    {
        CompilerFamily::Gnu
    } else {
        CompilerFamily::Unknown
    }
}

/// How a runtime library directory was located
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProbeMethod {
    PrintFileName,
    SearchDirs,
    InstallPrefix,
}

impl fmt::Display for ProbeMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ProbeMethod::PrintFileName => "print-file-name",
            ProbeMethod::SearchDirs => "search-dirs",
            ProbeMethod::InstallPrefix => "install-prefix",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RuntimeLibDir {
    pub dir: PathBuf,
    pub method: ProbeMethod,
}

/// Extract library directories from `-print-search-dirs` output.
///
/// The relevant line looks like `libraries: =/usr/lib/gcc/x86_64/13:/usr/lib`.
pub fn parse_search_dirs(output: &str) -> Vec<PathBuf> {
    output
        .lines()
        .find_map(|line| line.strip_prefix("libraries:"))
        .map(|dirs| {
            let dirs = dirs.trim().trim_start_matches('=');
            std::env::split_paths(dirs)
                .filter(|p| !p.as_os_str().is_empty())
                .collect()
        })
        .unwrap_or_default()
}

/// Directories under a compiler's install prefix that commonly hold its runtime.
pub fn prefix_candidate_dirs(compiler_binary: &Path) -> Vec<PathBuf> {
    let Some(prefix) = compiler_binary.parent().and_then(Path::parent) else {
        return Vec::new();
    };
    vec![
        prefix.join("lib"),
        prefix.join("lib").join("c++"),
        prefix.join("lib").join("unwind"),
    ]
}

fn dir_contains_any(dir: &Path, candidates: &[&str]) -> bool {
    dir.is_dir() && candidates.iter().any(|name| dir.join(name).exists())
}

/// A compiler executable that can be queried
#[derive(Debug, Clone)]
pub struct Compiler {
    path: PathBuf,
}

impl Compiler {
    /// Resolve a compiler name or path.
    ///
    /// Bare names are looked up on PATH; paths must exist.
    pub fn resolve(name: &str) -> Option<Self> {
        let candidate = Path::new(name);
        if candidate.components().count() > 1 {
            return candidate.is_file().then(|| Self {
                path: candidate.to_path_buf(),
            });
        }
        which::which(name).ok().map(|path| Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Run the compiler with `args`, returning stdout on success.
    fn query(&self, args: &[&str]) -> Option<String> {
        let output = Command::new(&self.path)
            .args(args)
            .stdin(Stdio::null())
            .stderr(Stdio::null())
            .output()
            .ok()?;

        if !output.status.success() {
            debug!(
                compiler = %self.path.display(),
                args = ?args,
                status = %output.status,
                "compiler query failed"
            );
            return None;
        }

        Some(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    pub fn version_output(&self) -> Option<String> {
        self.query(&["--version"])
    }

    pub fn family(&self) -> CompilerFamily {
        self.version_output()
            .map(|out| parse_family(&out))
            .unwrap_or(CompilerFamily::Unknown)
    }

    /// Find the directory holding any of `candidates`, or `None`.
    pub fn find_runtime_dir(&self, candidates: &[&str]) -> Option<RuntimeLibDir> {
        self.find_by_print_file_name(candidates)
            .map(|dir| RuntimeLibDir {
                dir,
                method: ProbeMethod::PrintFileName,
            })
            .or_else(|| {
                self.find_in_search_dirs(candidates).map(|dir| RuntimeLibDir {
                    dir,
                    method: ProbeMethod::SearchDirs,
                })
            })
            .or_else(|| {
                self.find_in_install_prefix(candidates)
                    .map(|dir| RuntimeLibDir {
                        dir,
                        method: ProbeMethod::InstallPrefix,
                    })
            })
    }

    fn find_by_print_file_name(&self, candidates: &[&str]) -> Option<PathBuf> {
        candidates.iter().find_map(|name| {
            let out = self.query(&[&format!("-print-file-name={}", name)])?;
            let resolved = PathBuf::from(out.trim());
            // Unresolved names are echoed back unchanged
            if resolved.is_absolute() && resolved.exists() {
                resolved.parent().map(Path::to_path_buf)
            } else {
                None
            }
        })
    }

    fn find_in_search_dirs(&self, candidates: &[&str]) -> Option<PathBuf> {
        let out = self.query(&["-print-search-dirs"])?;
        parse_search_dirs(&out)
            .into_iter()
            .find(|dir| dir_contains_any(dir, candidates))
    }

    fn find_in_install_prefix(&self, candidates: &[&str]) -> Option<PathBuf> {
        let binary = std::fs::canonicalize(&self.path).unwrap_or_else(|_| self.path.clone());
        prefix_candidate_dirs(&binary)
            .into_iter()
            .find(|dir| dir_contains_any(dir, candidates))
    }
}
