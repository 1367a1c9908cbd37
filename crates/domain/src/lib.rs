//! Domain Layer - RemindMine agent business model
//!
//! Contains ONLY the business model and the contracts of the agent:
//! - Entities: tracker items, pending advice, summary cache entries, checkpoint
//! - Repository abstractions: tracker, retrieval index, key-value state
//! - Services: language model contract and pure text composition
//!
//! No dependencies on databases, HTTP clients or AI SDKs. Infrastructure crates
//! implement the contracts, the application crate orchestrates them.

pub mod config;
pub mod entities;
pub mod errors;
pub mod repositories;
pub mod services;

// Re-export core domain types
pub use entities::{
    Checkpoint, Item, ItemId, ItemSnapshot, ItemSummaries, Journal, PendingAdvice, RetrievalDocument,
    RetrievalMatch, SummaryEntry,
};
pub use errors::{Collaborator, DomainError, DomainResult};
pub use repositories::{
    IndexStats, ItemPage, RecordLock, RetrievalIndex, StateRepository, StateRepositoryExt, Tracker,
};
pub use services::{Embedder, LanguageModel};

/// Domain-specific type aliases
pub type SimilarityScore = f32;
pub type PendingAdviceId = String;
