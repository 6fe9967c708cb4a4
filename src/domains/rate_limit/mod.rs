// Rate limit domain module
pub mod bucket;
pub mod limiter;

pub use bucket::*;
pub use limiter::*;
