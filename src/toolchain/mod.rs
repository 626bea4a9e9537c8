//! Toolchain inputs and compiler probing
//!
//! `ToolchainEnv` is the only place process environment is read for compiler
//! selection; everything downstream receives it as a value.

pub mod probe;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

pub use probe::{parse_family, Compiler, CompilerFamily, ProbeMethod, RuntimeLibDir};

use crate::logging::{operations, status};

/// Compiler selection and flag overrides captured from the environment
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolchainEnv {
    pub cc: Option<String>,
    pub cxx: Option<String>,
    pub cflags: Option<String>,
    pub cxxflags: Option<String>,
    pub ldflags: Option<String>,
}

impl ToolchainEnv {
    /// Read `CC`, `CXX`, `CFLAGS`, `CXXFLAGS` and `LDFLAGS`.
    ///
    /// Unset and empty variables are both treated as absent.
    pub fn from_env() -> Self {
        fn var(name: &str) -> Option<String> {
            std::env::var(name)
                .ok()
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        }

        Self {
            cc: var("CC"),
            cxx: var("CXX"),
            cflags: var("CFLAGS"),
            cxxflags: var("CXXFLAGS"),
            ldflags: var("LDFLAGS"),
        }
    }

    /// The C++ compiler the configure step will pick up (`CXX`, else `c++` on PATH)
    pub fn cxx_compiler(&self) -> Option<Compiler> {
        Compiler::resolve(self.cxx.as_deref().unwrap_or("c++"))
    }
}

/// Runtime support libraries a clang toolchain links against
pub fn runtime_candidates() -> &'static [&'static str] {
    if cfg!(target_os = "macos") {
        &["libc++.1.dylib", "libc++.dylib"]
    } else {
        &["libc++.so.1", "libc++.so"]
    }
}

/// Linker flags pointing at the compiler's own runtime library directory.
///
/// Only generic clang installs need this; a vendor clang or GNU toolchain keeps
/// its runtime on the default linker path. Probe misses are logged and yield
/// no flags.
pub fn runtime_link_flags(env: &ToolchainEnv) -> Vec<String> {
    let Some(compiler) = env.cxx_compiler() else {
        warn!(
            operation = operations::PROBE,
            status = status::MISS,
            "C++ compiler not found, skipping runtime library probe"
        );
        return Vec::new();
    };

    let family = compiler.family();
    debug!(
        operation = operations::PROBE,
        compiler = %compiler.path().display(),
        family = %family,
        "detected compiler family"
    );

    if family != CompilerFamily::GenericClang {
        return Vec::new();
    }

    match compiler.find_runtime_dir(runtime_candidates()) {
        Some(found) => {
            info!(
                operation = operations::PROBE,
                status = status::SUCCESS,
                path = %found.dir.display(),
                method = %found.method,
                "runtime library directory found"
            );
            let dir = found.dir.display().to_string();
            vec![format!("-L{}", dir), format!("-Wl,-rpath,{}", dir)]
        }
        None => {
            warn!(
                operation = operations::PROBE,
                status = status::MISS,
                compiler = %compiler.path().display(),
                "runtime library directory not found, continuing without explicit runtime flags"
            );
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn test_from_env_reads_and_trims() {
        std::env::set_var("CC", " clang ");
        std::env::set_var("CXX", "clang++");
        std::env::set_var("CFLAGS", "");
        std::env::remove_var("CXXFLAGS");
        std::env::set_var("LDFLAGS", "-fuse-ld=lld");

        let env = ToolchainEnv::from_env();
        assert_eq!(env.cc.as_deref(), Some("clang"));
        assert_eq!(env.cxx.as_deref(), Some("clang++"));
        assert_eq!(env.cflags, None);
        assert_eq!(env.cxxflags, None);
        assert_eq!(env.ldflags.as_deref(), Some("-fuse-ld=lld"));

        for var in ["CC", "CXX", "CFLAGS", "LDFLAGS"] {
            std::env::remove_var(var);
        }
    }

    #[test]
    fn test_runtime_candidates_are_libcxx() {
        assert!(runtime_candidates()
            .iter()
            .all(|name| name.starts_with("libc++")));
    }

    #[test]
    fn test_runtime_link_flags_missing_compiler() {
        let env = ToolchainEnv {
            cxx: Some("/nonexistent/bin/clang++".to_string()),
            ..Default::default()
        };
        assert!(runtime_link_flags(&env).is_empty());
    }
}
