//! Periodic jobs driven by the agent runtime

pub mod knowledge;
pub mod polling;

pub use knowledge::{KnowledgeUpdateJob, UpdateReport};
pub use polling::{IssuePollingJob, PollReport};
