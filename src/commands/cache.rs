/// `depcache cache` command implementation
///
/// Lists and cleans entries under the persistent cache root.
use anyhow::{Context, Result};
use tracing::info;

use crate::cli::{CacheArgs, CacheCommands};
use crate::commands::cache_root;
use depcache::cli_utils::{depcache_prefix, format_size};
use depcache::config::DepcacheConfig;
use depcache::logging::{operations, status};
use depcache::storage::{clean, list_entries, CleanFilter};

pub fn run(args: CacheArgs, config: &DepcacheConfig) -> Result<()> {
    let root = cache_root(args.cache_dir.as_deref(), config);

    match args.command {
        CacheCommands::List { json } => {
            let entries = list_entries(&root);
            if json {
                println!("{}", serde_json::to_string_pretty(&entries)?);
                return Ok(());
            }

            println!("Cache root: {}", root.display());
            if entries.is_empty() {
                println!("No cached builds");
                return Ok(());
            }

            println!();
            println!("{:<12} {:<14} {:>10}  {}", "VERSION", "SIGNATURE", "SIZE", "LIBRARY");
            let mut total = 0;
            for entry in &entries {
                total += entry.size_bytes;
                let library = entry
                    .manifest
                    .as_ref()
                    .and_then(|m| m.library.clone())
                    .unwrap_or_else(|| "-".to_string());
                println!(
                    "{:<12} {:<14} {:>10}  {}",
                    entry.version,
                    entry.signature,
                    format_size(entry.size_bytes),
                    library
                );
            }
            println!();
            println!("{} entries, {}", entries.len(), format_size(total));
            Ok(())
        }
        CacheCommands::Clean {
            version,
            signature,
            all,
        } => {
            let filter = CleanFilter {
                version,
                signature,
                include_fetch: all,
            };
            let removed = clean(&root, &filter)
                .with_context(|| format!("Failed to clean cache at {}", root.display()))?;

            for path in &removed {
                info!(
                    operation = operations::CLEAN,
                    status = status::SUCCESS,
                    path = %path.display(),
                    "removed"
                );
            }
            eprintln!(
                "{} Removed {} cache paths under {}",
                depcache_prefix(),
                removed.len(),
                root.display()
            );
            Ok(())
        }
    }
}
