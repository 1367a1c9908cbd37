//! Repository Abstractions - ports implemented by infrastructure and memory crates

mod retrieval_index;
mod state_repository;
mod tracker;

pub use retrieval_index::{IndexStats, RetrievalIndex};
pub use state_repository::{RecordLock, StateRepository, StateRepositoryExt};
pub use tracker::{ItemPage, Tracker};
