use sqlx::{PgPool, Row};
use sqlx::postgres::PgRow;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use crate::domains::auth::models::refresh_token::{RefreshToken, RefreshTokenCreate, TokenOwner};
use crate::shared::database::store::RefreshTokenStore;

/// Refresh Token Repository
/// Refresh Token 데이터베이스 작업 처리
pub struct RefreshTokenRepository {
    pool: PgPool,
}

impl RefreshTokenRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn map_row(row: &PgRow) -> RefreshToken {
        RefreshToken {
            id: row.get("id"),
            user_id: row.get("user_id"),
            session_id: row.get("session_id"),
            token_hash: row.get("token_hash"),
            device_info: row.get("device_info"),
            expires_at: row.get("expires_at"),
            created_at: row.get("created_at"),
            revoked: row.get("revoked"),
        }
    }
}

#[async_trait]
impl RefreshTokenStore for RefreshTokenRepository {
    /// Refresh Token 생성 (저장)
    /// Create and store refresh token
    async fn create_refresh_token(&self, data: RefreshTokenCreate) -> Result<RefreshToken> {
        let row = sqlx::query(
            r#"
            INSERT INTO refresh_tokens (user_id, session_id, token_hash, device_info, expires_at, created_at, revoked)
            VALUES ($1, $2, $3, $4, $5, $6, FALSE)
            RETURNING id, user_id, session_id, token_hash, device_info, expires_at, created_at, revoked
            "#,
        )
        .bind(data.user_id)
        .bind(data.session_id)
        .bind(&data.token_hash)
        .bind(&data.device_info)
        .bind(data.expires_at)
        .bind(data.created_at)
        .fetch_one(&self.pool)
        .await
        .context("Failed to create refresh token")?;

        Ok(Self::map_row(&row))
    }

    /// Refresh Token 조회 (token_hash로)
    /// Find refresh token by token hash
    async fn find_refresh_token(&self, token_hash: &str) -> Result<Option<RefreshToken>> {
        let row = sqlx::query(
            r#"
            SELECT id, user_id, session_id, token_hash, device_info, expires_at, created_at, revoked
            FROM refresh_tokens
            WHERE token_hash = $1
            "#,
        )
        .bind(token_hash)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to find refresh token")?;

        Ok(row.as_ref().map(Self::map_row))
    }

    /// Refresh Token 무효화 (revoked = true, 이미 무효화된 경우도 성공)
    /// Revoke refresh token
    async fn revoke_refresh_token(&self, token_hash: &str) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE refresh_tokens
            SET revoked = TRUE
            WHERE token_hash = $1
            "#,
        )
        .bind(token_hash)
        .execute(&self.pool)
        .await
        .context("Failed to revoke refresh token")?;

        Ok(result.rows_affected() > 0)
    }

    /// 소유자의 모든 Refresh Token 무효화 (로그아웃 시)
    /// Revoke all refresh tokens for an owner
    async fn revoke_refresh_tokens(&self, owner: TokenOwner) -> Result<u64> {
        let result = match owner {
            TokenOwner::User(user_id) => {
                sqlx::query(
                    r#"
                    UPDATE refresh_tokens
                    SET revoked = TRUE
                    WHERE user_id = $1 AND revoked = FALSE
                    "#,
                )
                .bind(user_id)
                .execute(&self.pool)
                .await
            }
            TokenOwner::Session(session_id) => {
                sqlx::query(
                    r#"
                    UPDATE refresh_tokens
                    SET revoked = TRUE
                    WHERE session_id = $1 AND revoked = FALSE
                    "#,
                )
                .bind(session_id)
                .execute(&self.pool)
                .await
            }
        }
        .context("Failed to revoke refresh tokens for owner")?;

        Ok(result.rows_affected())
    }

    /// 만료되었거나 오래된 무효화 토큰 삭제 (정리 작업)
    /// Delete expired tokens and old revoked tokens (cleanup)
    async fn delete_stale_refresh_tokens(
        &self,
        now: DateTime<Utc>,
        revoked_before: DateTime<Utc>,
    ) -> Result<u64> {
        let result = sqlx::query(
            r#"
            DELETE FROM refresh_tokens
            WHERE expires_at < $1
               OR (revoked = TRUE AND created_at < $2)
            "#,
        )
        .bind(now)
        .bind(revoked_before)
        .execute(&self.pool)
        .await
        .context("Failed to delete stale refresh tokens")?;

        Ok(result.rows_affected())
    }
}
