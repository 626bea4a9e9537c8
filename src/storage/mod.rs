//! Persistent cache storage
//!
//! The cache root holds three trees:
//!
//! ```text
//! <root>/fetchcontent/<version>            shared download cache
//! <root>/build/<version>/<signature>       build tree
//! <root>/install/<version>/<signature>     install tree
//! ```
//!
//! Callers never see these paths directly; the build and install trees are
//! exposed through symlinks at fixed, project-relative locations.

pub mod cache_dir;
pub mod layout;
pub mod links;
pub mod lock;
pub mod manifest;

pub use cache_dir::{default_cache_root, resolve_cache_root, CACHE_DIR_ENV};
pub use layout::{
    clean, list_entries, validate_version_filter, CacheEntry, CacheLayout, CleanFilter,
};
pub use links::{ensure_symlink, LinkAction};
pub use lock::BuildLock;
pub use manifest::BuildManifest;
