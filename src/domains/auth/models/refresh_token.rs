use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Refresh Token 모델 (DB 저장용)
/// Refresh Token model (for database storage)
///
/// Only the SHA-256 of the secret is stored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshToken {
    pub id: i64,
    pub user_id: i64,
    pub session_id: Option<Uuid>,
    pub token_hash: String,
    pub device_info: Option<String>,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub revoked: bool,
}

/// Refresh Token 생성 요청 (새 토큰 발급 시)
/// Refresh Token creation request (when issuing new token)
#[derive(Debug, Clone)]
pub struct RefreshTokenCreate {
    pub user_id: i64,
    pub session_id: Option<Uuid>,
    pub token_hash: String,
    pub device_info: Option<String>,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

/// 토큰 소유자 (일괄 무효화 대상)
/// Owner reference used for bulk revocation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenOwner {
    User(i64),
    Session(Uuid),
}

/// 발급된 Refresh Token (원본 secret 포함, 응답 전용)
/// Freshly issued token: the clear secret exists only here
#[derive(Debug, Clone)]
pub struct IssuedRefreshToken {
    pub secret: String,
    pub record: RefreshToken,
}
