use anyhow::Result;
use clap::{Args, Subcommand};
use console::style;
use domain::config::AgentConfig;
use infrastructure::{ConfigLoader, ConfigSource};

#[derive(Debug, Args)]
pub struct ConfigCommand {
    #[command(subcommand)]
    command: ConfigSubcommand,
}

#[derive(Debug, Clone, Subcommand)]
enum ConfigSubcommand {
    /// Print the effective configuration with secrets masked
    Show,
}

impl ConfigCommand {
    pub fn execute(self, config: &AgentConfig, source: &ConfigSource) -> Result<()> {
        match self.command {
            ConfigSubcommand::Show => {
                let origin = match source {
                    ConfigSource::File(path) => path.display().to_string(),
                    ConfigSource::Default => "built-in defaults".to_string(),
                };
                println!("{}", style(format!("# source: {origin} + environment")).dim());
                print!("{}", ConfigLoader::render_redacted(config)?);
            }
        }
        Ok(())
    }
}
