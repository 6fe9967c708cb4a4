// Retention domain models
pub mod policy;

pub use policy::*;
