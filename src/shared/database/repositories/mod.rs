// All repositories module
pub mod auth;
pub mod retention;

// Re-export all repositories for convenience
pub use auth::*;
pub use retention::*;
