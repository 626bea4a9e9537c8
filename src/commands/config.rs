use anyhow::Result;
use std::path::Path;
use tracing::info;

use crate::cli::ConfigCommands;
use depcache::config::DepcacheConfig;
use depcache::config_discovery::load_config_with_discovery;

pub fn run(command: ConfigCommands) -> Result<()> {
    match command {
        ConfigCommands::Validate { path } => validate(&path),
        ConfigCommands::Generate => generate(),
        ConfigCommands::Show { config } => show(config),
    }
}

fn validate(path: &str) -> Result<()> {
    info!("Validating config file: {}", path);

    let config = DepcacheConfig::from_file(path)?;
    config.validate()?;

    println!("✓ Configuration file is valid: {}", path);
    println!("\nSummary:");
    println!("  - Dependency: {}", config.dependency.name);
    println!("  - Library: lib{}", config.dependency.library);
    println!(
        "  - Cache directory: {}",
        config.cache.dir.as_deref().unwrap_or("(platform default)")
    );
    println!("  - Build jobs: {}", config.build.effective_jobs());
    println!("  - Runtime probe: {}", config.toolchain.probe_runtime);

    Ok(())
}

fn generate() -> Result<()> {
    info!("Generating example config");
    println!("{}", DepcacheConfig::example()?);
    Ok(())
}

fn show(config_path: Option<String>) -> Result<()> {
    info!("Showing effective configuration");

    let config = load_config_with_discovery(config_path.as_deref().map(Path::new))?;

    println!("Effective Configuration:\n");
    println!("{}", toml::to_string_pretty(&config)?);

    Ok(())
}
