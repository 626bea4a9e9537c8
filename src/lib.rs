// Library interface for depcache
// This allows integration tests and external code to use depcache's modules

pub mod build;
pub mod cli_utils;
pub mod config;
pub mod config_discovery;
pub mod error;
pub mod flags;
pub mod logging;
pub mod signature;
pub mod storage;
pub mod toolchain;

// Re-export commonly used types
pub use build::{BuildRequest, Orchestrator, ProcessRunner, Toggles};
pub use config::DepcacheConfig;
pub use error::BuildError;
pub use signature::{Signature, SignatureInputs};
pub use storage::{resolve_cache_root, CacheLayout};
