pub mod logging;
pub mod scheduler;

pub use logging::{init_logging, LogEntry, OperationTimer};
pub use scheduler::{JobId, ScheduledJob, Scheduler, TickGate, TickPermit};
