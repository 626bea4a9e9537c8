use clap::{ArgAction, Parser, Subcommand};

use depcache::build::Toggles;
use depcache::signature::{Signature, SIGNATURE_LEN};
use depcache::storage::validate_version_filter;

/// depcache - Toolchain-fingerprinted build cache for native dependencies
///
/// Builds a CMake-based native dependency once per (version, toolchain,
/// feature toggles, extra definitions) and points the consuming build's
/// directories at the cached result.
#[derive(Parser, Debug)]
#[command(name = "depcache")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Toolchain-fingerprinted native dependency build cache", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Configure, build and install the dependency into the cache
    Build(Box<BuildArgs>),

    /// Print the build signature and cache paths without building
    Signature(SignatureArgs),

    /// Probe the C++ compiler for its runtime library directory
    Probe(ProbeArgs),

    /// Inspect or clean the persistent cache
    Cache(CacheArgs),

    /// Configuration management utilities
    Config(ConfigArgs),
}

impl Commands {
    /// Explicit `-c/--config` path, if the command takes one
    pub fn config_path(&self) -> Option<&str> {
        match self {
            Commands::Build(args) => args.fingerprint.config.as_deref(),
            Commands::Signature(args) => args.fingerprint.config.as_deref(),
            Commands::Cache(args) => args.config.as_deref(),
            Commands::Probe(_) | Commands::Config(_) => None,
        }
    }
}

fn parse_toggle(value: &str) -> Result<bool, String> {
    Toggles::parse(value)
}

fn parse_signature(value: &str) -> Result<String, String> {
    Signature::parse(value)
        .map(|sig| sig.to_string())
        .ok_or_else(|| format!("expected {} hex characters", SIGNATURE_LEN))
}

fn parse_version_filter(value: &str) -> Result<String, String> {
    validate_version_filter(value).map(str::to_string)
}

/// Inputs that determine the signature
#[derive(Parser, Debug, Clone)]
pub struct FingerprintArgs {
    /// Dependency source root (contains the CMake source subdirectory)
    #[arg(long = "src")]
    pub source: String,

    /// Build unit tests (1/0, on/off, true/false, yes/no, enabled/disabled)
    #[arg(long, default_value = "0", action = ArgAction::Set, value_parser = parse_toggle)]
    pub tests: bool,

    /// Enable the Arm Compute Library execution provider
    #[arg(long, default_value = "0", action = ArgAction::Set, value_parser = parse_toggle)]
    pub acl: bool,

    /// Enable the XNNPACK execution provider
    #[arg(long, default_value = "0", action = ArgAction::Set, value_parser = parse_toggle)]
    pub xnnpack: bool,

    /// Extra CMake definitions, `KEY=VALUE;KEY=VALUE`
    #[arg(long, default_value = "", allow_hyphen_values = true)]
    pub extra: String,

    /// Dependency version (defaults to the source tree's VERSION_NUMBER)
    #[arg(long = "dep-version")]
    pub dep_version: Option<String>,

    /// Cache root override
    #[arg(long)]
    pub cache_dir: Option<String>,

    /// Config file path
    #[arg(short = 'c', long, env = "DEPCACHE_CONFIG")]
    pub config: Option<String>,
}

impl FingerprintArgs {
    pub fn toggles(&self) -> Toggles {
        Toggles {
            tests: self.tests,
            acl: self.acl,
            xnnpack: self.xnnpack,
        }
    }
}

#[derive(Parser, Debug)]
pub struct BuildArgs {
    /// Path to the cmake executable
    #[arg(long, default_value = "cmake")]
    pub cmake: String,

    #[command(flatten)]
    pub fingerprint: FingerprintArgs,

    /// Build directory path the consuming build refers to (becomes a symlink)
    #[arg(long)]
    pub build: String,

    /// Install directory path the consuming build refers to (becomes a symlink)
    #[arg(long)]
    pub install: String,

    /// Stamp file touched after a successful run
    #[arg(long)]
    pub stamp: String,

    /// Delete the cached build and install trees first
    #[arg(long)]
    pub force: bool,

    /// Skip configure/build/install when the shared library is already installed
    #[arg(long)]
    pub skip_if_built: bool,

    /// Parallel build jobs (default: config, then logical core count)
    #[arg(short = 'j', long)]
    pub jobs: Option<usize>,
}

#[derive(Parser, Debug)]
pub struct SignatureArgs {
    #[command(flatten)]
    pub fingerprint: FingerprintArgs,

    /// Print JSON instead of text
    #[arg(long)]
    pub json: bool,
}

#[derive(Parser, Debug)]
pub struct ProbeArgs {
    /// Compiler to probe (defaults to $CXX, then c++)
    #[arg(long)]
    pub compiler: Option<String>,
}

#[derive(Parser, Debug)]
pub struct CacheArgs {
    #[command(subcommand)]
    pub command: CacheCommands,

    /// Cache root override
    #[arg(long, global = true)]
    pub cache_dir: Option<String>,

    /// Config file path
    #[arg(short = 'c', long, env = "DEPCACHE_CONFIG", global = true)]
    pub config: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum CacheCommands {
    /// List cached installs
    List {
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Remove cached build and install trees
    Clean {
        /// Only entries of this version
        #[arg(long = "dep-version", value_parser = parse_version_filter)]
        version: Option<String>,

        /// Only the entry with this signature
        #[arg(long, value_parser = parse_signature)]
        signature: Option<String>,

        /// Also remove the download cache
        #[arg(long)]
        all: bool,
    },
}

#[derive(Parser, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommands,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Validate configuration file
    Validate {
        /// Path to config file
        path: String,
    },
    /// Generate example config file
    Generate,
    /// Show effective configuration
    Show {
        /// Config file path
        #[arg(short = 'c', long, env = "DEPCACHE_CONFIG")]
        config: Option<String>,
    },
}
