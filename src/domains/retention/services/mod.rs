// Retention domain services
pub mod retention_scheduler;

pub use retention_scheduler::*;
