mod cli;
mod commands;

use anyhow::Result;
use clap::Parser;
use std::path::Path;

use cli::{Cli, Commands};
use depcache::config_discovery::load_config_with_discovery;
use depcache::logging;

fn main() -> Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Config commands inspect files that may be invalid, so they run on defaults
    let command = match cli.command {
        Commands::Config(args) => {
            logging::init(None);
            return commands::config::run(args.command);
        }
        command => command,
    };

    let config = load_config_with_discovery(command.config_path().map(Path::new))?;

    // Initialize structured logging
    logging::init(config.observability.log_level.as_deref());

    // Dispatch to appropriate command handler
    match command {
        Commands::Build(args) => commands::build::run(*args, &config),
        Commands::Signature(args) => commands::signature::run(args, &config),
        Commands::Probe(args) => commands::probe::run(args),
        Commands::Cache(args) => commands::cache::run(args, &config),
        Commands::Config(args) => commands::config::run(args.command),
    }
}
