/// `depcache signature` command implementation
///
/// Prints the signature and the cache directories a build with the same inputs
/// would use. Nothing is created.
use anyhow::{Context, Result};
use serde::Serialize;
use std::path::PathBuf;

use crate::cli::SignatureArgs;
use crate::commands::{cache_root, version};
use depcache::build::parse_extra_definitions;
use depcache::config::DepcacheConfig;
use depcache::signature::SignatureInputs;
use depcache::storage::CacheLayout;
use depcache::toolchain::ToolchainEnv;

#[derive(Debug, Serialize)]
struct SignatureReport {
    signature: String,
    version: String,
    canonical: String,
    fetch_dir: PathBuf,
    build_dir: PathBuf,
    install_dir: PathBuf,
}

pub fn run(args: SignatureArgs, config: &DepcacheConfig) -> Result<()> {
    let fp = &args.fingerprint;
    parse_extra_definitions(&fp.extra).context("Invalid --extra")?;

    let source_root = PathBuf::from(&fp.source);
    let version = version(fp.dep_version.as_deref(), &source_root);
    let env = ToolchainEnv::from_env();

    let inputs = SignatureInputs {
        version: &version,
        env: &env,
        toggles: fp.toggles(),
        extra: &fp.extra,
    };
    let signature = inputs.compute();
    let layout = CacheLayout::new(
        &cache_root(fp.cache_dir.as_deref(), config),
        &version,
        &signature,
    );

    let report = SignatureReport {
        signature: signature.to_string(),
        canonical: inputs.canonical(),
        version,
        fetch_dir: layout.fetch_dir,
        build_dir: layout.build_dir,
        install_dir: layout.install_dir,
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Signature: {}", report.signature);
        println!("Version:   {}", report.version);
        println!("Fetch:     {}", report.fetch_dir.display());
        println!("Build:     {}", report.build_dir.display());
        println!("Install:   {}", report.install_dir.display());
    }

    Ok(())
}
