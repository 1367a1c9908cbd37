//! Domain Services - collaborator contracts for AI backends and pure text composition

pub mod content;
mod language_model;

pub use language_model::{Embedder, LanguageModel};
