use std::sync::Arc;
use chrono::Duration;
use tracing::debug;
use uuid::Uuid;
use crate::domains::auth::models::{
    IssuedRefreshToken, RefreshToken, RefreshTokenCreate, TokenOwner,
};
use crate::domains::auth::services::jwt_service::{JwtService, REFRESH_SECRET_BYTES};
use crate::shared::database::RefreshTokenStore;
use crate::shared::errors::{AuthError, RefreshTokenError};
use crate::shared::utils::{hash_refresh_token, SharedClock};

/// 폐기된 토큰을 보관하는 유예 기간
/// Revoked tokens older than this are deleted by the retention run
pub const REVOKED_TOKEN_GRACE_DAYS: i64 = 7;

/// Refresh Token 서비스
/// Issues, classifies and revokes long-lived refresh credentials.
///
/// 상태 변화:
/// 1. issue → revoked=false, expires_at = now + ttl
/// 2. revoke → revoked=true (되돌릴 수 없음)
/// 3. 보존 작업 → 만료 또는 (폐기 + 유예 기간 경과) 시 삭제
#[derive(Clone)]
pub struct RefreshTokenService {
    store: Arc<dyn RefreshTokenStore>,
    clock: SharedClock,
    ttl: Duration,
}

impl RefreshTokenService {
    pub fn new(store: Arc<dyn RefreshTokenStore>, clock: SharedClock, ttl: Duration) -> Self {
        Self { store, clock, ttl }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// 새 secret 생성 후 저장
    /// Generate a fresh 256-bit secret and persist its digest
    pub async fn issue(
        &self,
        user_id: i64,
        session_id: Option<Uuid>,
        device_info: Option<String>,
    ) -> Result<IssuedRefreshToken, AuthError> {
        let secret = JwtService::generate_opaque_secret(REFRESH_SECRET_BYTES)?;
        self.issue_with_secret(user_id, session_id, device_info, secret)
            .await
    }

    /// 주어진 secret으로 토큰 저장 (중복 검사 없음, 256비트 엔트로피에 의존)
    pub async fn issue_with_secret(
        &self,
        user_id: i64,
        session_id: Option<Uuid>,
        device_info: Option<String>,
        secret: String,
    ) -> Result<IssuedRefreshToken, AuthError> {
        let now = self.clock.now();
        let record = self
            .store
            .create_refresh_token(RefreshTokenCreate {
                user_id,
                session_id,
                token_hash: hash_refresh_token(&secret),
                device_info,
                expires_at: now + self.ttl,
                created_at: now,
            })
            .await
            .map_err(|e| AuthError::DatabaseError(format!("Failed to create refresh token: {}", e)))?;

        debug!(user_id, token_id = record.id, "refresh token issued");
        Ok(IssuedRefreshToken { secret, record })
    }

    /// 토큰 검증
    /// Classification order: not found, then revoked, then expired.
    pub async fn validate(&self, secret: &str) -> Result<RefreshToken, AuthError> {
        let record = self
            .store
            .find_refresh_token(&hash_refresh_token(secret))
            .await
            .map_err(|e| AuthError::DatabaseError(format!("Failed to find refresh token: {}", e)))?
            .ok_or(RefreshTokenError::NotFound)?;

        if record.revoked {
            return Err(RefreshTokenError::Revoked.into());
        }

        if record.expires_at < self.clock.now() {
            return Err(RefreshTokenError::Expired.into());
        }

        Ok(record)
    }

    /// 토큰 폐기 (이미 폐기된 토큰도 성공)
    /// Returns whether the secret matched any stored token.
    pub async fn revoke(&self, secret: &str) -> Result<bool, AuthError> {
        self.store
            .revoke_refresh_token(&hash_refresh_token(secret))
            .await
            .map_err(|e| AuthError::DatabaseError(format!("Failed to revoke refresh token: {}", e)))
    }

    /// 소유자의 모든 토큰 폐기 (모든 기기에서 로그아웃)
    pub async fn revoke_all_for_owner(&self, owner: TokenOwner) -> Result<u64, AuthError> {
        self.store
            .revoke_refresh_tokens(owner)
            .await
            .map_err(|e| AuthError::DatabaseError(format!("Failed to revoke refresh tokens: {}", e)))
    }

    /// 만료 토큰 + 유예 기간이 지난 폐기 토큰 삭제
    pub async fn purge_stale(&self) -> Result<u64, AuthError> {
        let now = self.clock.now();
        self.store
            .delete_stale_refresh_tokens(now, now - Duration::days(REVOKED_TOKEN_GRACE_DAYS))
            .await
            .map_err(|e| AuthError::DatabaseError(format!("Failed to purge refresh tokens: {}", e)))
    }
}
