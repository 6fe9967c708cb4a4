// Auth domain handlers
pub mod auth_handler;
pub mod session_handler;

pub use auth_handler::*;
pub use session_handler::*;
