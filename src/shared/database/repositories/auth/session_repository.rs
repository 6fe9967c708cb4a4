use sqlx::{PgPool, Row};
use sqlx::postgres::PgRow;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;
use crate::domains::auth::models::session::{Session, SessionCreate};
use crate::shared::database::store::SessionStore;

const SESSION_COLUMNS: &str = "id, user_id, device_info, ip_hash, user_agent, active, last_activity, created_at, expires_at, logged_out_at";

/// Session Repository
/// 세션 데이터베이스 작업 처리
pub struct SessionRepository {
    pool: PgPool,
}

impl SessionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn map_row(row: &PgRow) -> Session {
        Session {
            id: row.get("id"),
            user_id: row.get("user_id"),
            device_info: row.get("device_info"),
            ip_hash: row.get("ip_hash"),
            user_agent: row.get("user_agent"),
            active: row.get("active"),
            last_activity: row.get("last_activity"),
            created_at: row.get("created_at"),
            expires_at: row.get("expires_at"),
            logged_out_at: row.get("logged_out_at"),
        }
    }
}

#[async_trait]
impl SessionStore for SessionRepository {
    async fn create_session(&self, data: SessionCreate) -> Result<Session> {
        let sql = format!(
            r#"
            INSERT INTO sessions (id, user_id, device_info, ip_hash, user_agent, active, last_activity, created_at, expires_at)
            VALUES ($1, $2, $3, $4, $5, TRUE, $6, $6, $7)
            RETURNING {SESSION_COLUMNS}
            "#
        );
        let row = sqlx::query(&sql)
            .bind(data.id)
            .bind(data.user_id)
            .bind(&data.device_info)
            .bind(&data.ip_hash)
            .bind(&data.user_agent)
            .bind(data.created_at)
            .bind(data.expires_at)
            .fetch_one(&self.pool)
            .await
            .context("Failed to create session")?;

        Ok(Self::map_row(&row))
    }

    async fn find_session(&self, id: Uuid) -> Result<Option<Session>> {
        let sql = format!("SELECT {SESSION_COLUMNS} FROM sessions WHERE id = $1");
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to find session")?;

        Ok(row.as_ref().map(Self::map_row))
    }

    async fn list_active_sessions(&self, user_id: i64, now: DateTime<Utc>) -> Result<Vec<Session>> {
        let sql = format!(
            r#"
            SELECT {SESSION_COLUMNS}
            FROM sessions
            WHERE user_id = $1 AND active = TRUE AND expires_at > $2
            ORDER BY last_activity DESC
            "#
        );
        let rows = sqlx::query(&sql)
            .bind(user_id)
            .bind(now)
            .fetch_all(&self.pool)
            .await
            .context("Failed to list sessions")?;

        Ok(rows.iter().map(Self::map_row).collect())
    }

    // GREATEST: 동시 갱신에서도 last_activity는 뒤로 가지 않음
    async fn touch_session(&self, id: Uuid, now: DateTime<Utc>) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE sessions
            SET last_activity = GREATEST(last_activity, $2)
            WHERE id = $1 AND active = TRUE
            "#,
        )
        .bind(id)
        .bind(now)
        .execute(&self.pool)
        .await
        .context("Failed to touch session")?;

        Ok(result.rows_affected() > 0)
    }

    async fn close_session(&self, id: Uuid, now: DateTime<Utc>) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE sessions
            SET active = FALSE, logged_out_at = $2
            WHERE id = $1 AND active = TRUE
            "#,
        )
        .bind(id)
        .bind(now)
        .execute(&self.pool)
        .await
        .context("Failed to close session")?;

        Ok(result.rows_affected() > 0)
    }

    async fn close_sessions_for_user(&self, user_id: i64, now: DateTime<Utc>) -> Result<u64> {
        let result = sqlx::query(
            r#"
            UPDATE sessions
            SET active = FALSE, logged_out_at = $2
            WHERE user_id = $1 AND active = TRUE
            "#,
        )
        .bind(user_id)
        .bind(now)
        .execute(&self.pool)
        .await
        .context("Failed to close sessions for user")?;

        Ok(result.rows_affected())
    }

    async fn sweep_idle_sessions(
        &self,
        idle_before: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<u64> {
        let result = sqlx::query(
            r#"
            UPDATE sessions
            SET active = FALSE, logged_out_at = $2
            WHERE active = TRUE AND last_activity < $1
            "#,
        )
        .bind(idle_before)
        .bind(now)
        .execute(&self.pool)
        .await
        .context("Failed to sweep idle sessions")?;

        Ok(result.rows_affected())
    }

    async fn purge_sessions(
        &self,
        now: DateTime<Utc>,
        logged_out_before: DateTime<Utc>,
    ) -> Result<u64> {
        // refresh_tokens.session_id는 ON DELETE CASCADE
        let result = sqlx::query(
            r#"
            DELETE FROM sessions
            WHERE expires_at < $1
               OR (logged_out_at IS NOT NULL AND logged_out_at < $2)
            "#,
        )
        .bind(now)
        .bind(logged_out_before)
        .execute(&self.pool)
        .await
        .context("Failed to purge sessions")?;

        Ok(result.rows_affected())
    }
}
