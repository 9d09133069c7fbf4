//! Aozora content server CLI
//!
//! Serves book renditions over HTTP, or renders one to a file for inspection.

use std::io::Write;
use std::path::PathBuf;

use aozora_content::{
    error::{AppError, Result},
    models::{Config, RepresentationKind},
    server::{self, AppState},
    storage::JsonCatalog,
};
use clap::{Parser, Subcommand};

/// Aozora Bunko content retrieval and cache layer
#[derive(Parser, Debug)]
#[command(
    name = "aozora-content",
    version,
    about = "Serve Aozora Bunko books as text, cards and XHTML"
)]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(short, long, default_value = "data/config.toml")]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Flush the cache and serve the HTTP API
    Serve,

    /// Render one book through the cache and write it out
    Render {
        book_id: u64,

        /// Rendition to produce: txt, card or html
        #[arg(short, long, default_value = "txt")]
        format: RepresentationKind,

        /// Write to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Validate the configuration and the catalog
    Validate,
}

/// Initialize logging based on verbosity flag.
fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = Config::load_or_default(&cli.config).with_env_overrides();
    config.validate()?;

    match cli.command {
        Command::Serve => {
            let state = AppState::from_config(&config).await?;
            if config.cache.flush_on_startup {
                match state.delivery.flush_cache().await {
                    Ok(()) => log::info!("Cache flushed"),
                    Err(e) => log::warn!("Cache flush failed: {}", e),
                }
            }
            server::serve(&config, state).await?;
        }

        Command::Render {
            book_id,
            format,
            output,
        } => {
            let state = AppState::from_config(&config).await?;
            let rendered = state.delivery.get_rendered(book_id, format).await?;

            match output {
                Some(path) => {
                    std::fs::write(&path, &rendered.payload)?;
                    log::info!("Wrote {} bytes to {}", rendered.payload.len(), path.display());
                }
                None => std::io::stdout().write_all(&rendered.payload)?,
            }
            log::info!("Fingerprint: {}", rendered.fingerprint);
        }

        Command::Validate => {
            log::info!("✓ Config OK");

            let catalog = JsonCatalog::load(&config.catalog.path)?;
            if catalog.is_empty() {
                return Err(AppError::validation(format!(
                    "catalog {} holds no books",
                    config.catalog.path.display()
                )));
            }
            log::info!("✓ Catalog OK ({} books)", catalog.len());

            log::info!("All validations passed!");
        }
    }

    Ok(())
}
