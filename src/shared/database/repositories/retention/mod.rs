// Retention repositories
pub mod retention_repository;

pub use retention_repository::*;
