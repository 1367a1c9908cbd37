//! Infrastructure adapters: configuration loading and the Redmine tracker client

pub mod config;
pub mod tracker;

pub use config::{ConfigLoader, ConfigSource, ConfigValidator};
pub use tracker::RedmineClient;
