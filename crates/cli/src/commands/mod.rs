pub mod agent;
pub mod cache;
pub mod config;
pub mod pending;

pub use cache::CacheCommand;
pub use config::ConfigCommand;
pub use pending::PendingCommand;
