// Auth domain services
pub mod activity_tracker;
pub mod auth_service;
pub mod jwt_service;
pub mod refresh_token_service;
pub mod session_service;
pub mod state;

pub use activity_tracker::*;
pub use auth_service::*;
pub use jwt_service::*;
pub use refresh_token_service::*;
pub use session_service::*;
pub use state::*;
