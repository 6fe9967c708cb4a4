use thiserror::Error;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::error;

/// Access Token 검증 실패 원인
/// Why an access token was rejected. Every variant means "unauthenticated";
/// they stay distinct for logging and tests.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessTokenError {
    #[error("malformed access token")]
    Malformed,

    /// 헤더의 alg가 HS256이 아님 (alg=none 공격 등)
    #[error("unexpected signing algorithm")]
    AlgorithmMismatch,

    #[error("invalid access token signature")]
    SignatureInvalid,

    #[error("access token expired")]
    Expired,
}

/// Refresh Token 검증 실패 원인
/// Refresh token classification failures.
///
/// `Revoked` wins over `Expired` when both hold.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshTokenError {
    #[error("refresh token not found")]
    NotFound,

    #[error("refresh token revoked")]
    Revoked,

    #[error("refresh token expired")]
    Expired,
}

/// 인증 관련 에러
/// Authentication-related errors
#[derive(Error, Debug)]
pub enum AuthError {
    #[error(transparent)]
    AccessToken(#[from] AccessTokenError),

    #[error(transparent)]
    RefreshToken(#[from] RefreshTokenError),

    /// 세션을 찾을 수 없음
    /// Session not found
    #[error("Session not found")]
    SessionNotFound,

    /// 다른 사용자의 세션
    /// Caller does not own the session
    #[error("Session belongs to another user")]
    SessionForbidden,

    #[error("Too many requests")]
    RateLimited,

    /// 잘못된 이메일 또는 비밀번호
    /// Invalid email or password
    #[error("Invalid email or password")]
    InvalidCredentials,

    /// 토큰이 제공되지 않음
    /// Token not provided
    #[error("Token not provided")]
    MissingToken,

    /// 서명 키 설정 오류
    /// Signing key misconfiguration
    #[error("Signing key misconfigured: {0}")]
    SigningKey(String),

    /// CSPRNG 사용 불가 (치명적)
    /// Entropy source unavailable; callers must not fall back to weaker randomness
    #[error("Entropy source unavailable: {0}")]
    EntropyUnavailable(String),

    /// 데이터베이스 에러
    /// Database error
    #[error("Database error: {0}")]
    DatabaseError(String),

    /// 내부 서버 에러
    /// Internal server error
    #[error("Internal server error: {0}")]
    Internal(String),
}

impl AuthError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AuthError::AccessToken(_)
            | AuthError::RefreshToken(_)
            | AuthError::InvalidCredentials
            | AuthError::MissingToken => StatusCode::UNAUTHORIZED,
            AuthError::SessionNotFound => StatusCode::NOT_FOUND,
            AuthError::SessionForbidden => StatusCode::FORBIDDEN,
            AuthError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            AuthError::SigningKey(_)
            | AuthError::EntropyUnavailable(_)
            | AuthError::DatabaseError(_)
            | AuthError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// AuthError를 HTTP 응답으로 변환
impl From<AuthError> for (StatusCode, Json<serde_json::Value>) {
    fn from(err: AuthError) -> Self {
        let status = err.status_code();
        // 내부 오류 상세는 응답에 노출하지 않음
        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            error!(error = %err, "request failed");
            "Internal server error".to_string()
        } else {
            err.to_string()
        };

        (status, Json(json!({ "error": message })))
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        <(StatusCode, Json<serde_json::Value>)>::from(self).into_response()
    }
}
