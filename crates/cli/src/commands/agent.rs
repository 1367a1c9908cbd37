use crate::bootstrap::build_service;
use crate::progress::Spinner;
use anyhow::Result;
use application::{AdviceOutcome, AgentRuntime};
use console::style;
use domain::config::AgentConfig;
use domain::services::content::truncate_chars;

pub async fn run(config: &AgentConfig) -> Result<()> {
    let service = build_service(config).await?;
    let runtime = AgentRuntime::new(service.clone(), config.schedule.clone());

    println!(
        "{} watching {} (auto-advice {})",
        style("[remindmine]").cyan().bold(),
        config.tracker.url,
        if service.auto_advice() { "on" } else { "off" }
    );
    runtime.start().await;

    tokio::signal::ctrl_c().await?;
    println!("{}", style("Shutting down...").yellow());
    runtime.shutdown().await;
    Ok(())
}

pub async fn update(config: &AgentConfig) -> Result<()> {
    let service = build_service(config).await?;
    let spinner = Spinner::start("Updating knowledge from Redmine...");
    let result = service.trigger_update().await;
    spinner.finish();

    let report = result?;
    println!(
        "{} {} issues indexed, {} re-embedded, {} removed",
        style("✓").green(),
        report.items,
        report.embedded,
        report.removed
    );
    if !report.complete {
        println!(
            "{} Issue list ended early; stale entries were kept",
            style("!").yellow()
        );
    }
    Ok(())
}

pub async fn advise(config: &AgentConfig, id: u64, regenerate: bool) -> Result<()> {
    let service = build_service(config).await?;
    let spinner = Spinner::start(&format!("Generating advice for issue #{id}..."));
    let result = service.generate_advice(id, regenerate).await;
    spinner.finish();

    match result? {
        AdviceOutcome::Posted => {
            println!("{} Advice posted to issue #{}", style("✓").green(), id);
        }
        AdviceOutcome::Staged { pending_id } => {
            println!(
                "{} Advice staged for approval: {}",
                style("✓").green(),
                style(&pending_id).bold()
            );
            println!("  approve with: remindmine pending approve {pending_id}");
        }
        AdviceOutcome::AlreadyAdvised => {
            println!(
                "{} Issue #{} already has an AI comment, nothing generated",
                style("•").yellow(),
                id
            );
        }
    }
    Ok(())
}

pub async fn search(config: &AgentConfig, query: &str, limit: usize) -> Result<()> {
    let service = build_service(config).await?;
    let stats = service.index_stats().await?;
    if stats.items == 0 {
        println!("Index is empty; run `remindmine update` first.");
        return Ok(());
    }

    let hits = service.search(query, limit).await?;
    if hits.is_empty() {
        println!("No similar issues found.");
        return Ok(());
    }
    for hit in hits {
        println!(
            "{} #{} {} {}",
            style(format!("{:.2}", hit.similarity)).cyan(),
            hit.item_id,
            style(&hit.subject).bold(),
            style(format!("({} chars)", hit.content.chars().count())).dim()
        );
        println!("    {}", truncate_chars(&hit.content.replace('\n', " "), 160));
    }
    Ok(())
}
