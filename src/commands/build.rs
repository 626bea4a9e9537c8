/// `depcache build` command implementation
///
/// Captures the toolchain environment once, assembles a [`BuildRequest`] and
/// hands it to the orchestrator with a real process runner.
use anyhow::{Context, Result};
use std::path::PathBuf;
use tracing::info;

use crate::cli::BuildArgs;
use crate::commands::{cache_root, version};
use depcache::build::{BuildRequest, Normalized, Orchestrator, ProcessRunner};
use depcache::cli_utils::depcache_prefix;
use depcache::config::DepcacheConfig;
use depcache::toolchain::ToolchainEnv;

pub fn run(args: BuildArgs, config: &DepcacheConfig) -> Result<()> {
    let request = request_from_args(args, config, ToolchainEnv::from_env());
    let dependency = request.dependency.name.clone();

    let mut orchestrator = Orchestrator::new(ProcessRunner::new());
    let outcome = orchestrator
        .run(&request)
        .with_context(|| format!("Failed to build {}", dependency))?;

    let verb = if outcome.built { "Built" } else { "Reused" };
    eprintln!(
        "{} {} {} {} ({})",
        depcache_prefix(),
        verb,
        dependency,
        request.version,
        outcome.signature
    );
    match &outcome.library {
        Normalized::Linked(name) => info!("linked {} -> {}", request.dependency.library, name),
        Normalized::Copied(name) => info!("copied {} from {}", request.dependency.library, name),
        Normalized::AlreadyPresent => {}
    }

    Ok(())
}

fn request_from_args(args: BuildArgs, config: &DepcacheConfig, toolchain: ToolchainEnv) -> BuildRequest {
    let fp = args.fingerprint;
    let source_root = PathBuf::from(&fp.source);
    let toggles = fp.toggles();

    BuildRequest {
        dependency: config.dependency.clone(),
        cmake: PathBuf::from(args.cmake),
        version: version(fp.dep_version.as_deref(), &source_root),
        source_root,
        toggles,
        extra: fp.extra,
        cache_root: cache_root(fp.cache_dir.as_deref(), config),
        visible_build: PathBuf::from(args.build),
        visible_install: PathBuf::from(args.install),
        stamp: PathBuf::from(args.stamp),
        force: args.force,
        skip_if_built: args.skip_if_built,
        toolchain,
        probe_runtime: config.toolchain.probe_runtime,
        jobs: args.jobs.filter(|j| *j > 0).unwrap_or_else(|| config.build.effective_jobs()),
        generator: config.build.generator,
    }
}
