//! Persisted agent state and the embedded retrieval index
//!
//! Each store caches its record in memory, but the persisted record wins:
//! every mutation takes the repository's record lock, reloads, applies the
//! change and writes a full atomic replacement through a
//! [`domain::StateRepository`]. A daemon and a CLI invocation sharing one
//! data directory therefore never overwrite each other's changes.

pub mod advice_store;
pub mod checkpoint;
pub mod chunking;
pub mod state_store;
pub mod summary_cache;
pub mod vector_index;

pub use advice_store::{AdviceStagingStore, Approval, PostOutcome};
pub use checkpoint::CheckpointStore;
pub use chunking::TextChunker;
pub use state_store::{InMemoryStateStore, JsonFileStore};
pub use summary_cache::{CacheStats, SummaryCache};
pub use vector_index::VectorIndex;
