use std::path::{Path, PathBuf};

/// Environment variable that relocates the cache root
pub const CACHE_DIR_ENV: &str = "DEPCACHE_CACHE_DIR";

const APP_NAMESPACE: &str = "depcache";

/// Get the default cache root for a dependency, following platform conventions
///
/// - Linux/Unix: $XDG_CACHE_HOME/depcache/<dependency> or ~/.cache/depcache/<dependency>
/// - macOS: ~/Library/Caches/depcache/<dependency>
/// - Windows: %LOCALAPPDATA%/depcache/<dependency>
pub fn default_cache_root(dependency: &str) -> PathBuf {
    if let Some(cache_dir) = dirs::cache_dir() {
        cache_dir.join(APP_NAMESPACE).join(dependency)
    } else {
        // Fallback to current directory if we can't determine cache dir
        PathBuf::from(".depcache/cache").join(dependency)
    }
}

/// Pick the cache root: explicit argument, then the environment override,
/// then the config file, then the platform default.
///
/// The result is always absolute. Visible links point at paths under it, and a
/// relative link target would resolve against the link's own directory.
pub fn resolve_cache_root(
    explicit: Option<&Path>,
    env_override: Option<&Path>,
    configured: Option<&Path>,
    dependency: &str,
) -> PathBuf {
    let root = [explicit, env_override, configured]
        .into_iter()
        .flatten()
        .find(|p| !p.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .unwrap_or_else(|| default_cache_root(dependency));
    absolutize(root)
}

/// Anchor a relative path at the current directory.
pub fn absolutize(path: PathBuf) -> PathBuf {
    std::path::absolute(&path).unwrap_or(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_cache_root() {
        let root = default_cache_root("onnxruntime");
        assert!(root.ends_with("depcache/onnxruntime"));
    }

    #[test]
    fn test_resolve_precedence() {
        let explicit = Path::new("/explicit");
        let env = Path::new("/from-env");
        let configured = Path::new("/from-config");

        assert_eq!(
            resolve_cache_root(Some(explicit), Some(env), Some(configured), "ort"),
            PathBuf::from("/explicit")
        );
        assert_eq!(
            resolve_cache_root(None, Some(env), Some(configured), "ort"),
            PathBuf::from("/from-env")
        );
        assert_eq!(
            resolve_cache_root(None, None, Some(configured), "ort"),
            PathBuf::from("/from-config")
        );
        assert_eq!(
            resolve_cache_root(None, None, None, "ort"),
            default_cache_root("ort")
        );
    }

    #[test]
    #[serial_test::serial]
    fn test_relative_root_is_anchored_at_cwd() {
        let root = resolve_cache_root(Some(Path::new("cache")), None, None, "ort");

        assert!(root.is_absolute());
        assert_eq!(root, std::env::current_dir().unwrap().join("cache"));
    }

    #[test]
    fn test_default_root_is_absolute() {
        assert!(resolve_cache_root(None, None, None, "ort").is_absolute());
    }
}
