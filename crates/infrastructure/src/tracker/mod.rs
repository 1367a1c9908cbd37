mod redmine;

pub use redmine::RedmineClient;
