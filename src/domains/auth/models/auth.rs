use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};
use utoipa::ToSchema;
use uuid::Uuid;
use crate::domains::auth::models::session::SessionResponse;
use crate::domains::auth::models::user::UserResponse;

// 로그인 요청 모델
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[schema(as = LoginRequest)]
pub struct LoginRequest {
    /// Email address
    /// 이메일 주소
    #[schema(example = "user@example.com")]
    pub email: String,

    /// Password
    /// 비밀번호
    #[schema(example = "password123")]
    pub password: String,

    /// Device label shown in the session list
    /// 기기 정보 (선택사항)
    #[schema(example = "Pixel 8")]
    pub device_info: Option<String>,
}

// 로그인 응답 모델
#[derive(Debug, Serialize, ToSchema)]
#[schema(as = LoginResponse)]
pub struct LoginResponse {
    pub user: UserResponse,

    /// JWT Access Token (짧은 수명)
    /// JWT Access Token (short lifetime)
    #[schema(example = "eyJhbGciOiJIUzI1NiIsInR5cCI6IkpXVCJ9...")]
    pub access_token: String,

    pub access_token_expires_at: DateTime<Utc>,

    /// Refresh Token (긴 수명, 해시만 DB에 저장)
    /// Refresh Token (long lifetime, only its hash is stored)
    #[schema(example = "q3Zx0b...")]
    pub refresh_token: String,

    pub refresh_token_expires_at: DateTime<Utc>,

    pub session_id: Uuid,

    pub message: String,
}

// 토큰 갱신 요청 모델
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[schema(as = RefreshTokenRequest)]
pub struct RefreshTokenRequest {
    #[schema(example = "q3Zx0b...")]
    pub refresh_token: String,
}

// 토큰 갱신 응답 모델 (Refresh Token은 회전하지 않음)
#[derive(Debug, Serialize, ToSchema)]
#[schema(as = RefreshTokenResponse)]
pub struct RefreshTokenResponse {
    /// 새 Access Token
    /// New Access Token
    pub access_token: String,

    pub access_token_expires_at: DateTime<Utc>,

    pub message: String,
}

// 로그아웃 요청 모델
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[schema(as = LogoutRequest)]
pub struct LogoutRequest {
    #[schema(example = "q3Zx0b...")]
    pub refresh_token: String,
}

// 전체 기기 로그아웃 응답
#[derive(Debug, Serialize, ToSchema)]
#[schema(as = LogoutAllResponse)]
pub struct LogoutAllResponse {
    pub revoked_tokens: u64,
    pub closed_sessions: u64,
    pub message: String,
}

#[derive(Debug, Serialize, ToSchema)]
#[schema(as = SessionsResponse)]
pub struct SessionsResponse {
    pub sessions: Vec<SessionResponse>,
}
