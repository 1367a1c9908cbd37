//! Language-model backends
//!
//! Each provider implements both [`domain::LanguageModel`] and
//! [`domain::Embedder`]; [`ProviderFactory`] picks one from configuration.

pub mod factory;
pub mod providers;

pub use factory::{AiBackend, ProviderFactory};
pub use providers::{GenerationOptions, OllamaProvider, OpenAIProvider};
