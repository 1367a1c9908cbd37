use crate::bootstrap::build_service;
use anyhow::Result;
use application::PostOutcome;
use clap::{Args, Subcommand};
use console::style;
use domain::config::AgentConfig;
use domain::services::content::truncate_chars;

#[derive(Debug, Args)]
pub struct PendingCommand {
    #[command(subcommand)]
    command: PendingSubcommand,
}

#[derive(Debug, Clone, Subcommand)]
enum PendingSubcommand {
    /// List advice awaiting approval, newest first
    List {
        /// Print the full advice text
        #[arg(short, long)]
        full: bool,
    },
    /// Post a pending advice to Redmine
    Approve { id: String },
    /// Discard a pending advice
    Reject { id: String },
    /// Discard every pending advice
    Clear,
}

impl PendingCommand {
    pub async fn execute(self, config: &AgentConfig) -> Result<()> {
        let service = build_service(config).await?;

        match self.command {
            PendingSubcommand::List { full } => {
                let pending = service.list_pending().await;
                if pending.is_empty() {
                    println!("No pending advice.");
                    return Ok(());
                }
                for entry in pending {
                    println!(
                        "{} #{} {} [{} / {}]",
                        style(&entry.id).bold(),
                        entry.item_id,
                        entry.item_snapshot.subject,
                        entry.item_snapshot.status,
                        entry.item_snapshot.priority
                    );
                    println!(
                        "    {}  {}",
                        style(entry.created_at.format("%Y-%m-%d %H:%M")).dim(),
                        entry.item_snapshot.url
                    );
                    let text = if full {
                        entry.advice_content
                    } else {
                        truncate_chars(&entry.advice_content.replace('\n', " "), 120)
                    };
                    println!("    {text}");
                }
            }
            PendingSubcommand::Approve { id } => {
                let approval = service.approve(&id).await?;
                match approval.outcome {
                    PostOutcome::Posted => println!(
                        "{} Advice posted to issue #{}",
                        style("✓").green(),
                        approval.item_id
                    ),
                    PostOutcome::AlreadyAdvised => println!(
                        "{} Issue #{} already has an AI comment, entry removed without posting",
                        style("•").yellow(),
                        approval.item_id
                    ),
                }
            }
            PendingSubcommand::Reject { id } => {
                let rejected = service.reject(&id).await?;
                println!(
                    "{} Advice for issue #{} discarded",
                    style("✓").green(),
                    rejected.item_id
                );
            }
            PendingSubcommand::Clear => {
                let removed = service.clear_pending().await?;
                println!("{} {} pending advice removed", style("✓").green(), removed);
            }
        }
        Ok(())
    }
}
