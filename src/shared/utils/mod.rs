// Shared utilities
pub mod clock;
pub mod hashing;
pub mod password;

pub use clock::*;
pub use hashing::*;
pub use password::*;
