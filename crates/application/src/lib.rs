//! # Application Layer
//!
//! Orchestrates the agent on top of the domain contracts:
//! - Comment Guard and Advice Generator
//! - Issue Polling Job and Knowledge Update Job
//! - `AgentRuntime`, which schedules both jobs
//! - `AgentService`, the control facade for manual triggers
//!
//! ## Dependency Direction
//!
//! ```text
//! cli → application → memory / common → domain
//! infrastructure, llm → domain (implement the collaborator traits)
//! ```

pub mod advice_generator;
pub mod errors;
pub mod guard;
pub mod jobs;
pub mod runtime;
pub mod service;

pub use advice_generator::{AdviceGenerator, AdviceOutcome, GeneratorSettings};
pub use errors::{ApplicationError, ApplicationResult};
pub use guard::{has_ai_comment, CommentGuard};
pub use jobs::{IssuePollingJob, KnowledgeUpdateJob, PollReport, UpdateReport};
pub use runtime::AgentRuntime;
pub use memory::{Approval, PostOutcome};
pub use service::{AgentService, Collaborators, KNOWLEDGE_JOB, POLLING_JOB};
