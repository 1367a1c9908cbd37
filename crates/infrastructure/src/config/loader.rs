use anyhow::{anyhow, Context, Result};
use domain::config::*;
use std::env;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq)]
pub enum ConfigSource {
    File(PathBuf),
    Default,
}

pub struct ConfigLoader {
    config_paths: Vec<PathBuf>,
    explicit_path: Option<PathBuf>,
    load_dotenv: bool,
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self {
            config_paths: Self::default_config_paths(),
            explicit_path: None,
            load_dotenv: true,
        }
    }

    /// Use exactly this file; a missing file is an error
    pub fn with_path(mut self, path: PathBuf) -> Self {
        self.explicit_path = Some(path);
        self
    }

    /// Replace the search list (first existing file wins)
    pub fn with_search_paths(mut self, paths: Vec<PathBuf>) -> Self {
        self.config_paths = paths;
        self
    }

    pub fn without_dotenv(mut self) -> Self {
        self.load_dotenv = false;
        self
    }

    fn default_config_paths() -> Vec<PathBuf> {
        let mut paths = vec![
            PathBuf::from("remindmine.toml"),
            PathBuf::from(".remindmine.toml"),
        ];

        if let Some(config_dir) = dirs::config_dir() {
            paths.push(config_dir.join("remindmine").join("config.toml"));
        }

        paths
    }

    /// File (if any) then environment overrides
    pub async fn load(&self) -> Result<(AgentConfig, ConfigSource)> {
        if self.load_dotenv {
            match dotenv::dotenv() {
                Ok(path) => debug!("Loaded environment from {}", path.display()),
                Err(e) if e.not_found() => {}
                Err(e) => return Err(anyhow!("Failed to read .env file: {}", e)),
            }
        }

        let (config, source) = self.load_base_config().await?;
        let config = Self::apply_env_overrides(config, |key| env::var(key).ok())?;
        Ok((config, source))
    }

    async fn load_base_config(&self) -> Result<(AgentConfig, ConfigSource)> {
        if let Some(path) = &self.explicit_path {
            let config = self
                .load_file(path)
                .await
                .with_context(|| format!("Failed to load config from {}", path.display()))?;
            info!("Loaded configuration from: {}", path.display());
            return Ok((config, ConfigSource::File(path.clone())));
        }

        for path in &self.config_paths {
            if path.exists() {
                let config = self
                    .load_file(path)
                    .await
                    .with_context(|| format!("Failed to load config from {}", path.display()))?;
                info!("Loaded configuration from: {}", path.display());
                return Ok((config, ConfigSource::File(path.clone())));
            }
        }

        debug!("No configuration file found, using defaults");
        Ok((AgentConfig::default(), ConfigSource::Default))
    }

    async fn load_file(&self, path: &Path) -> Result<AgentConfig> {
        let content = fs::read_to_string(path)
            .await
            .context("Failed to read config file")?;

        let extension = path.extension().and_then(|ext| ext.to_str()).unwrap_or("");

        match extension {
            "json" => serde_json::from_str(&content).context("Failed to parse JSON config"),
            _ => toml::from_str(&content).context("Failed to parse TOML config"),
        }
    }

    /// Apply the environment variables the agent recognizes.
    /// `lookup` abstracts the environment so tests need not mutate it.
    pub fn apply_env_overrides<F>(mut config: AgentConfig, lookup: F) -> Result<AgentConfig>
    where
        F: Fn(&str) -> Option<String>,
    {
        // Tracker
        if let Some(url) = lookup("REDMINE_URL") {
            config.tracker.url = url;
        }
        if let Some(api_key) = lookup("REDMINE_API_KEY") {
            config.tracker.api_key = api_key;
        }
        if let Some(value) = lookup("DISABLE_PROXY") {
            config.tracker.disable_proxy = parse_bool("DISABLE_PROXY", &value)?;
        }

        // AI provider settings
        if let Some(provider) = lookup("AI_PROVIDER") {
            config.ai.provider = provider
                .parse()
                .map_err(|e: String| anyhow!("AI_PROVIDER: {}", e))?;
        }
        if let Some(url) = lookup("OLLAMA_BASE_URL") {
            config.ai.ollama.base_url = url;
        }
        if let Some(model) = lookup("OLLAMA_MODEL") {
            config.ai.ollama.model = model;
        }
        if let Some(model) = lookup("OLLAMA_EMBEDDING_MODEL") {
            config.ai.ollama.embedding_model = model;
        }
        if let Some(api_key) = lookup("OPENAI_API_KEY") {
            config.ai.openai.api_key = Some(api_key);
        }
        if let Some(model) = lookup("OPENAI_MODEL") {
            config.ai.openai.model = model;
        }
        if let Some(model) = lookup("OPENAI_EMBEDDING_MODEL") {
            config.ai.openai.embedding_model = model;
        }
        if let Some(url) = lookup("OPENAI_BASE_URL") {
            config.ai.openai.base_url = Some(url);
        }

        // Schedule
        if let Some(value) = lookup("UPDATE_INTERVAL_MINUTES") {
            config.schedule.update_interval_minutes = parse_number("UPDATE_INTERVAL_MINUTES", &value)?;
        }
        if let Some(value) = lookup("POLLING_INTERVAL_MINUTES") {
            config.schedule.polling_interval_minutes =
                parse_number("POLLING_INTERVAL_MINUTES", &value)?;
        }

        // Advice
        if let Some(signature) = lookup("AI_COMMENT_SIGNATURE") {
            config.advice.signature = signature;
        }
        if let Some(value) = lookup("AUTO_ADVICE_ENABLED") {
            config.advice.auto_advice_enabled = parse_bool("AUTO_ADVICE_ENABLED", &value)?;
        }
        if let Some(value) = lookup("RETRIEVAL_TOP_K") {
            config.advice.top_k = parse_number("RETRIEVAL_TOP_K", &value)?;
        }

        // Paths and logging
        if let Some(data_dir) = lookup("REMINDMINE_DATA_DIR") {
            config.storage.data_dir = PathBuf::from(data_dir);
        }
        if let Some(level) = lookup("REMINDMINE_LOG_LEVEL") {
            config.logging.level = level;
        }

        Ok(config)
    }

    pub async fn save_config(&self, config: &AgentConfig, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(config)?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }

        fs::write(path, content).await?;
        info!("Configuration saved to: {}", path.display());

        Ok(())
    }

    /// Rendered configuration with secrets masked, for `config show`
    pub fn render_redacted(config: &AgentConfig) -> Result<String> {
        let mut redacted = config.clone();
        if !redacted.tracker.api_key.is_empty() {
            redacted.tracker.api_key = "***".to_string();
        }
        if redacted.ai.openai.api_key.is_some() {
            redacted.ai.openai.api_key = Some("***".to_string());
        }
        Ok(toml::to_string_pretty(&redacted)?)
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        other => Err(anyhow!("{}: expected a boolean, got '{}'", key, other)),
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| anyhow!("{}: expected a non-negative integer, got '{}'", key, value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_env_overrides_apply() {
        let config = ConfigLoader::apply_env_overrides(
            AgentConfig::default(),
            lookup(&[
                ("REDMINE_URL", "https://redmine.example.com"),
                ("DISABLE_PROXY", "yes"),
                ("AI_PROVIDER", "openai"),
                ("OPENAI_API_KEY", "sk-test"),
                ("POLLING_INTERVAL_MINUTES", "2"),
                ("AUTO_ADVICE_ENABLED", "false"),
                ("AI_COMMENT_SIGNATURE", "Bot advice"),
                ("RETRIEVAL_TOP_K", "8"),
            ]),
        )
        .unwrap();

        assert_eq!(config.tracker.url, "https://redmine.example.com");
        assert!(config.tracker.disable_proxy);
        assert_eq!(config.ai.provider, ProviderKind::OpenAi);
        assert_eq!(config.ai.openai.api_key.as_deref(), Some("sk-test"));
        assert_eq!(config.schedule.polling_interval_minutes, 2);
        assert!(!config.advice.auto_advice_enabled);
        assert_eq!(config.advice.signature, "Bot advice");
        assert_eq!(config.advice.top_k, 8);
    }

    #[test]
    fn test_malformed_numbers_are_rejected() {
        let result = ConfigLoader::apply_env_overrides(
            AgentConfig::default(),
            lookup(&[("UPDATE_INTERVAL_MINUTES", "soon")]),
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_unknown_provider_is_rejected() {
        let result = ConfigLoader::apply_env_overrides(
            AgentConfig::default(),
            lookup(&[("AI_PROVIDER", "gemini")]),
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_redacted_rendering_hides_secrets() {
        let mut config = AgentConfig::default();
        config.tracker.api_key = "secret-key".into();
        config.ai.openai.api_key = Some("sk-secret".into());

        let rendered = ConfigLoader::render_redacted(&config).unwrap();
        assert!(!rendered.contains("secret-key"));
        assert!(!rendered.contains("sk-secret"));
        assert!(rendered.contains("[tracker]"));
    }
}
