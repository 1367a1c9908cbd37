use crate::bootstrap::build_service;
use anyhow::Result;
use clap::{Args, Subcommand};
use console::style;
use domain::config::AgentConfig;

#[derive(Debug, Args)]
pub struct CacheCommand {
    #[command(subcommand)]
    command: CacheSubcommand,
}

#[derive(Debug, Clone, Subcommand)]
enum CacheSubcommand {
    /// Summary cache and retrieval index statistics
    Stats {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
    /// Drop every cached summary
    Clear,
}

impl CacheCommand {
    pub async fn execute(self, config: &AgentConfig) -> Result<()> {
        let service = build_service(config).await?;

        match self.command {
            CacheSubcommand::Stats { json } => {
                let cache = service.cache_stats().await;
                let index = service.index_stats().await?;
                if json {
                    let value = serde_json::json!({
                        "summary_cache": cache,
                        "retrieval_index": index,
                        "checkpoint": service.checkpoint().await,
                    });
                    println!("{}", serde_json::to_string_pretty(&value)?);
                    return Ok(());
                }
                println!("{}", style("Summary cache").bold());
                println!("  entries:  {}", cache.count);
                println!("  storage:  {}", cache.storage_path);
                println!("{}", style("Retrieval index").bold());
                println!("  issues:   {}", index.items);
                println!("  chunks:   {}", index.documents);
                println!("  model:    {}", index.embedding_model);
                println!(
                    "{} {}",
                    style("Checkpoint").bold(),
                    service.checkpoint().await.to_rfc3339()
                );
            }
            CacheSubcommand::Clear => {
                let removed = service.clear_cache().await?;
                println!("{} {} cached summaries removed", style("✓").green(), removed);
            }
        }
        Ok(())
    }
}
