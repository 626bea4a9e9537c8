pub mod build;
pub mod cache;
pub mod config;
pub mod probe;
pub mod signature;

use std::path::{Path, PathBuf};

use depcache::build::resolve_version;
use depcache::config::DepcacheConfig;
use depcache::storage::{resolve_cache_root, CACHE_DIR_ENV};

/// Cache root from `--cache-dir`, `DEPCACHE_CACHE_DIR`, the config file or the default
pub fn cache_root(explicit: Option<&str>, config: &DepcacheConfig) -> PathBuf {
    let env_override = std::env::var_os(CACHE_DIR_ENV).map(PathBuf::from);
    resolve_cache_root(
        explicit.map(Path::new),
        env_override.as_deref(),
        config.cache.dir.as_deref().map(Path::new),
        &config.dependency.name,
    )
}

/// Version for signature and cache paths
pub fn version(explicit: Option<&str>, source_root: &Path) -> String {
    resolve_version(explicit, source_root)
}
