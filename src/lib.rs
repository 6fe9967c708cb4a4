//! 인증/세션 코어
//! Authentication and session core for a multi-device snippet API:
//! access/refresh tokens, per-device sessions, request rate limiting and
//! the retention scheduler that prunes what they leave behind.

pub mod domains;
pub mod routes;
pub mod shared;
