use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Complete depcache configuration (loaded from TOML file)
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct DepcacheConfig {
    #[serde(default)]
    pub dependency: DependencyConfig,

    #[serde(default)]
    pub cache: CacheConfig,

    #[serde(default)]
    pub build: BuildConfig,

    #[serde(default)]
    pub toolchain: ToolchainConfig,

    #[serde(default)]
    pub observability: ObservabilityConfig,
}

/// The native dependency being built
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DependencyConfig {
    /// Cache namespace and prefix of dependency-specific defines
    #[serde(default = "default_dependency_name")]
    pub name: String,

    /// Shared library stem (`lib<library>.so`)
    #[serde(default = "default_dependency_name")]
    pub library: String,

    /// Directory under the source root that holds CMakeLists.txt
    #[serde(default = "default_source_subdir")]
    pub source_subdir: String,
}

impl Default for DependencyConfig {
    fn default() -> Self {
        Self {
            name: default_dependency_name(),
            library: default_dependency_name(),
            source_subdir: default_source_subdir(),
        }
    }
}

/// Persistent cache configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct CacheConfig {
    /// Cache root (overridden by --cache-dir and DEPCACHE_CACHE_DIR)
    #[serde(default)]
    pub dir: Option<String>,
}

/// Build generator preference
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum GeneratorChoice {
    /// Ninja when it is on PATH, otherwise the CMake default
    #[default]
    Auto,
    Ninja,
    Default,
}

/// External build step configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct BuildConfig {
    /// Parallel jobs (0 = logical core count)
    #[serde(default)]
    pub jobs: usize,

    #[serde(default)]
    pub generator: GeneratorChoice,
}

impl BuildConfig {
    /// Effective parallelism for the build step
    pub fn effective_jobs(&self) -> usize {
        if self.jobs > 0 {
            self.jobs
        } else {
            match num_cpus::get() {
                0 => 4,
                n => n,
            }
        }
    }
}

/// Toolchain probing configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolchainConfig {
    /// Locate the compiler's runtime library directory for generic clang
    #[serde(default = "default_true")]
    pub probe_runtime: bool,
}

impl Default for ToolchainConfig {
    fn default() -> Self {
        Self {
            probe_runtime: true,
        }
    }
}

/// Observability configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct ObservabilityConfig {
    /// Log level used when RUST_LOG is unset
    #[serde(default)]
    pub log_level: Option<String>,
}

// Default value functions
fn default_dependency_name() -> String {
    "onnxruntime".to_string()
}

fn default_source_subdir() -> String {
    "cmake".to_string()
}

fn default_true() -> bool {
    true
}

impl DepcacheConfig {
    /// Load configuration from TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let mut config: DepcacheConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.as_ref().display()))?;

        if let Some(base) = path.as_ref().parent() {
            config.anchor_paths(base);
        }

        Ok(config)
    }

    /// Resolve a relative `cache.dir` against the directory holding the config file.
    pub fn anchor_paths(&mut self, base: &Path) {
        if let Some(dir) = &self.cache.dir {
            let dir_path = Path::new(dir);
            if !dir.trim().is_empty() && dir_path.is_relative() {
                self.cache.dir = Some(base.join(dir_path).display().to_string());
            }
        }
    }

    /// Generate example configuration as TOML string
    pub fn example() -> Result<String> {
        let config = DepcacheConfig {
            cache: CacheConfig {
                dir: Some("/var/cache/depcache/onnxruntime".to_string()),
            },
            build: BuildConfig {
                jobs: 0,
                generator: GeneratorChoice::Auto,
            },
            observability: ObservabilityConfig {
                log_level: Some("info".to_string()),
            },
            ..Default::default()
        };

        toml::to_string_pretty(&config).context("Failed to render example config")
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        for (field, value) in [
            ("dependency.name", &self.dependency.name),
            ("dependency.library", &self.dependency.library),
        ] {
            if value.trim().is_empty() {
                anyhow::bail!("{} must be set", field);
            }
            if value.contains('/') || value.contains('\\') {
                anyhow::bail!("{} must not contain path separators: {}", field, value);
            }
        }

        let subdir = Path::new(&self.dependency.source_subdir);
        if subdir.is_absolute() {
            anyhow::bail!(
                "dependency.source_subdir must be relative to the source root: {}",
                self.dependency.source_subdir
            );
        }

        if let Some(dir) = &self.cache.dir {
            if dir.trim().is_empty() {
                anyhow::bail!("cache.dir must not be empty when set");
            }
        }

        if let Some(level) = &self.observability.log_level {
            if !["trace", "debug", "info", "warn", "error"].contains(&level.as_str()) {
                anyhow::bail!(
                    "observability.log_level must be one of: trace, debug, info, warn, error"
                );
            }
        }

        Ok(())
    }
}
