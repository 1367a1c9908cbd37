use anyhow::{bail, Result};
use domain::config::*;
use tracing::warn;

pub struct ConfigValidator;

impl ConfigValidator {
    pub fn new() -> Self {
        Self
    }

    pub fn validate(&self, config: &AgentConfig) -> Result<()> {
        self.validate_tracker_config(&config.tracker)?;
        self.validate_ai_config(&config.ai)?;
        self.validate_schedule_config(&config.schedule)?;
        self.validate_advice_config(&config.advice)?;
        self.validate_retrieval_config(&config.retrieval)?;
        self.validate_logging_config(&config.logging)?;
        Ok(())
    }

    fn validate_tracker_config(&self, config: &TrackerConfig) -> Result<()> {
        if !config.url.starts_with("http://") && !config.url.starts_with("https://") {
            bail!("Redmine URL must start with http:// or https://, got '{}'", config.url);
        }
        if config.api_key.is_empty() {
            warn!("Redmine API key is empty; posting comments will fail");
        }
        if config.page_size == 0 {
            bail!("tracker.page_size must be greater than 0");
        }
        if config.request_timeout_secs == 0 {
            bail!("tracker.request_timeout_secs must be greater than 0");
        }
        Ok(())
    }

    fn validate_ai_config(&self, config: &AiConfig) -> Result<()> {
        match config.provider {
            ProviderKind::OpenAi => {
                if config.openai.api_key.as_deref().unwrap_or("").is_empty() {
                    bail!("OPENAI_API_KEY is required when the OpenAI provider is selected");
                }
            }
            ProviderKind::Ollama => {
                if config.ollama.base_url.is_empty() {
                    bail!("ai.ollama.base_url cannot be empty");
                }
            }
        }
        if config.request_timeout_secs == 0 {
            bail!("ai.request_timeout_secs must be greater than 0");
        }
        Ok(())
    }

    fn validate_schedule_config(&self, config: &ScheduleConfig) -> Result<()> {
        if config.update_interval_minutes == 0 {
            bail!("Update interval must be at least 1 minute");
        }
        if config.polling_interval_minutes == 0 {
            bail!("Polling interval must be at least 1 minute");
        }
        Ok(())
    }

    fn validate_advice_config(&self, config: &AdviceConfig) -> Result<()> {
        if config.signature.trim().is_empty() {
            bail!("AI comment signature cannot be empty");
        }
        if config.top_k == 0 {
            bail!("Retrieval top-K must be greater than 0");
        }
        if config.context_items > config.top_k {
            warn!(
                "advice.context_items ({}) exceeds top_k ({}); at most {} cases will be used",
                config.context_items, config.top_k, config.top_k
            );
        }
        Ok(())
    }

    fn validate_retrieval_config(&self, config: &RetrievalConfig) -> Result<()> {
        if config.chunk_size == 0 {
            bail!("retrieval.chunk_size must be greater than 0");
        }
        if config.chunk_overlap >= config.chunk_size {
            bail!(
                "retrieval.chunk_overlap ({}) must be smaller than chunk_size ({})",
                config.chunk_overlap,
                config.chunk_size
            );
        }
        Ok(())
    }

    fn validate_logging_config(&self, config: &LoggingConfig) -> Result<()> {
        let valid_levels = ["error", "warn", "info", "debug", "trace"];
        if !valid_levels.contains(&config.level.to_lowercase().as_str()) {
            warn!(
                "Log level '{}' is not a plain level; passing it to the filter as a directive",
                config.level
            );
        }
        Ok(())
    }
}

impl Default for ConfigValidator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(ConfigValidator::new().validate(&AgentConfig::default()).is_ok());
    }

    #[test]
    fn test_rejects_invalid_values() {
        let validator = ConfigValidator::new();

        let mut config = AgentConfig::default();
        config.schedule.polling_interval_minutes = 0;
        assert!(validator.validate(&config).is_err());

        let mut config = AgentConfig::default();
        config.advice.top_k = 0;
        assert!(validator.validate(&config).is_err());

        let mut config = AgentConfig::default();
        config.advice.signature = "  ".into();
        assert!(validator.validate(&config).is_err());

        let mut config = AgentConfig::default();
        config.retrieval.chunk_overlap = config.retrieval.chunk_size;
        assert!(validator.validate(&config).is_err());

        let mut config = AgentConfig::default();
        config.ai.provider = ProviderKind::OpenAi;
        assert!(validator.validate(&config).is_err());
        config.ai.openai.api_key = Some("sk-test".into());
        assert!(validator.validate(&config).is_ok());
    }
}
