use anyhow::Result;
use clap::{Parser, Subcommand};
use infrastructure::{ConfigLoader, ConfigValidator};
use std::path::PathBuf;

mod bootstrap;
mod commands;
mod progress;

use commands::{CacheCommand, ConfigCommand, PendingCommand};

#[derive(Parser)]
#[command(name = "remindmine")]
#[command(about = "Watches Redmine for new issues and proposes AI advice")]
#[command(version)]
struct Cli {
    /// Configuration file (default: remindmine.toml, .remindmine.toml, then the user config dir)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the knowledge update and issue polling jobs until Ctrl-C
    Run,
    /// Refresh the retrieval index from Redmine now
    Update,
    /// Generate advice for one issue
    Advise {
        /// Redmine issue id
        id: u64,
        /// Drop cached summaries and replace any pending advice
        #[arg(long)]
        regenerate: bool,
    },
    /// Advice waiting for approval
    Pending(PendingCommand),
    /// Summary cache maintenance
    Cache(CacheCommand),
    /// Search past issues by similarity
    Search {
        query: String,
        #[arg(short, long, default_value = "5")]
        limit: usize,
    },
    /// Inspect the effective configuration
    Config(ConfigCommand),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut loader = ConfigLoader::new();
    if let Some(path) = cli.config {
        loader = loader.with_path(path);
    }
    let (config, source) = loader.load().await?;

    common::init_logging(&config.logging)?;
    ConfigValidator::new().validate(&config)?;
    tracing::debug!(?source, "Configuration ready");

    match cli.command {
        Commands::Run => commands::agent::run(&config).await,
        Commands::Update => commands::agent::update(&config).await,
        Commands::Advise { id, regenerate } => commands::agent::advise(&config, id, regenerate).await,
        Commands::Pending(cmd) => cmd.execute(&config).await,
        Commands::Cache(cmd) => cmd.execute(&config).await,
        Commands::Search { query, limit } => commands::agent::search(&config, &query, limit).await,
        Commands::Config(cmd) => cmd.execute(&config, &source),
    }
}
