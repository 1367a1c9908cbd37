//! Agent configuration
//!
//! Built once at startup (file + environment) and passed by value into
//! constructors. Every section has defaults so a partial file is valid.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Signature prefixed to every AI-authored comment
pub const DEFAULT_SIGNATURE: &str = "AI自動アドバイス";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AgentConfig {
    #[serde(default)]
    pub tracker: TrackerConfig,
    #[serde(default)]
    pub ai: AiConfig,
    #[serde(default)]
    pub schedule: ScheduleConfig,
    #[serde(default)]
    pub advice: AdviceConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackerConfig {
    #[serde(default = "default_tracker_url")]
    pub url: String,
    #[serde(default)]
    pub api_key: String,
    /// Connect directly even when HTTP(S)_PROXY is set
    #[serde(default)]
    pub disable_proxy: bool,
    #[serde(default = "default_page_size")]
    pub page_size: u32,
    #[serde(default = "default_tracker_timeout")]
    pub request_timeout_secs: u64,
}

impl TrackerConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            url: default_tracker_url(),
            api_key: String::new(),
            disable_proxy: false,
            page_size: default_page_size(),
            request_timeout_secs: default_tracker_timeout(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    #[default]
    Ollama,
    OpenAi,
}

impl ProviderKind {
    pub fn name(&self) -> &'static str {
        match self {
            ProviderKind::Ollama => "ollama",
            ProviderKind::OpenAi => "openai",
        }
    }
}

impl FromStr for ProviderKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "ollama" => Ok(ProviderKind::Ollama),
            "openai" => Ok(ProviderKind::OpenAi),
            other => Err(format!("unknown AI provider '{other}' (expected ollama or openai)")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OllamaConfig {
    #[serde(default = "default_ollama_url")]
    pub base_url: String,
    #[serde(default = "default_ollama_model")]
    pub model: String,
    #[serde(default = "default_ollama_embedding_model")]
    pub embedding_model: String,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            base_url: default_ollama_url(),
            model: default_ollama_model(),
            embedding_model: default_ollama_embedding_model(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAiConfig {
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_openai_model")]
    pub model: String,
    #[serde(default = "default_openai_embedding_model")]
    pub embedding_model: String,
    /// Custom endpoint for OpenAI-compatible servers
    #[serde(default)]
    pub base_url: Option<String>,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: default_openai_model(),
            embedding_model: default_openai_embedding_model(),
            base_url: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiConfig {
    #[serde(default)]
    pub provider: ProviderKind,
    #[serde(default)]
    pub ollama: OllamaConfig,
    #[serde(default)]
    pub openai: OpenAiConfig,
    #[serde(default = "default_ai_timeout")]
    pub request_timeout_secs: u64,
}

impl AiConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Embedding model of the active provider; recorded by the index
    pub fn embedding_model(&self) -> &str {
        match self.provider {
            ProviderKind::Ollama => &self.ollama.embedding_model,
            ProviderKind::OpenAi => &self.openai.embedding_model,
        }
    }
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            provider: ProviderKind::default(),
            ollama: OllamaConfig::default(),
            openai: OpenAiConfig::default(),
            request_timeout_secs: default_ai_timeout(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleConfig {
    #[serde(default = "default_update_interval")]
    pub update_interval_minutes: u64,
    #[serde(default = "default_polling_interval")]
    pub polling_interval_minutes: u64,
    #[serde(default = "default_shutdown_grace")]
    pub shutdown_grace_secs: u64,
}

impl ScheduleConfig {
    pub fn update_interval(&self) -> Duration {
        Duration::from_secs(self.update_interval_minutes * 60)
    }

    pub fn polling_interval(&self) -> Duration {
        Duration::from_secs(self.polling_interval_minutes * 60)
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_secs(self.shutdown_grace_secs)
    }
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            update_interval_minutes: default_update_interval(),
            polling_interval_minutes: default_polling_interval(),
            shutdown_grace_secs: default_shutdown_grace(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdviceConfig {
    /// Initial value of the runtime auto-advice flag
    #[serde(default = "default_true")]
    pub auto_advice_enabled: bool,
    #[serde(default = "default_signature")]
    pub signature: String,
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    /// How many retrieved matches make it into the prompt
    #[serde(default = "default_context_items")]
    pub context_items: usize,
}

impl Default for AdviceConfig {
    fn default() -> Self {
        Self {
            auto_advice_enabled: true,
            signature: default_signature(),
            top_k: default_top_k(),
            context_items: default_context_items(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Emit JSON lines instead of human-readable output
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

fn default_tracker_url() -> String {
    "http://localhost:3000".to_string()
}

fn default_page_size() -> u32 {
    100
}

fn default_tracker_timeout() -> u64 {
    30
}

fn default_ollama_url() -> String {
    "http://localhost:11434".to_string()
}

fn default_ollama_model() -> String {
    "llama3.2".to_string()
}

fn default_ollama_embedding_model() -> String {
    "nomic-embed-text".to_string()
}

fn default_openai_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_openai_embedding_model() -> String {
    "text-embedding-3-small".to_string()
}

fn default_ai_timeout() -> u64 {
    120
}

fn default_update_interval() -> u64 {
    60
}

fn default_polling_interval() -> u64 {
    5
}

fn default_shutdown_grace() -> u64 {
    10
}

fn default_true() -> bool {
    true
}

fn default_signature() -> String {
    DEFAULT_SIGNATURE.to_string()
}

fn default_top_k() -> usize {
    5
}

fn default_context_items() -> usize {
    3
}

fn default_chunk_size() -> usize {
    1000
}

fn default_chunk_overlap() -> usize {
    200
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./data")
}

fn default_log_level() -> String {
    "info".to_string()
}
