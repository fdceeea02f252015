mod cli;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use wikiofbabel::config::WikiConfig;

#[derive(Parser)]
#[command(name = "wikiofbabel", version, about = "The infinite library: every page is written on first visit")]
struct Cli {
    /// Config file (default: ~/.wikiofbabel/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Start the web server
    Serve,
    /// Full-text search over stored articles
    Search {
        query: String,
        /// Maximum number of results
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
    /// Check the database and generation credentials
    Doctor,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => WikiConfig::load_from(path)?,
        None => WikiConfig::load()?,
    };

    // Log to stderr so stdout stays clean for CLI output.
    let filter = EnvFilter::try_new(&config.server.log_level)
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Command::Serve => {
            wikiofbabel::server::serve(config).await?;
        }
        Command::Search { query, limit } => {
            cli::search::search(&config, &query, limit)?;
        }
        Command::Doctor => {
            cli::doctor::doctor(&config)?;
        }
    }

    Ok(())
}
