//! Domain entities

pub mod advice;
pub mod checkpoint;
pub mod item;
pub mod retrieval;
pub mod summary;

pub use advice::{ItemSnapshot, PendingAdvice};
pub use checkpoint::Checkpoint;
pub use item::{Item, ItemId, Journal};
pub use retrieval::{RetrievalDocument, RetrievalMatch};
pub use summary::{ItemSummaries, SummaryEntry};
