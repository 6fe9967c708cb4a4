use sqlx::PgPool;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use crate::shared::database::store::{RetentionStore, SnippetPurge};

/// 보존 정책 Repository
/// Bulk deletes for the retention scheduler. Each method is a handful of
/// set-based statements, never a per-row loop.
pub struct RetentionRepository {
    pool: PgPool,
}

impl RetentionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RetentionStore for RetentionRepository {
    async fn delete_history_before(&self, cutoff: DateTime<Utc>) -> Result<u64> {
        let result = sqlx::query(
            r#"
            DELETE FROM snippet_history
            WHERE changed_at < $1
            "#,
        )
        .bind(cutoff)
        .execute(&self.pool)
        .await
        .context("Failed to delete snippet history")?;

        Ok(result.rows_affected())
    }

    async fn purge_deleted_snippets(&self, cutoff: DateTime<Utc>) -> Result<SnippetPurge> {
        let mut tx = self.pool.begin().await.context("Failed to begin transaction")?;

        // 1. 이력 먼저 삭제 (foreign key 순서)
        let history = sqlx::query(
            r#"
            DELETE FROM snippet_history
            WHERE snippet_id IN (
                SELECT id FROM snippets
                WHERE deleted_at IS NOT NULL AND deleted_at < $1
            )
            "#,
        )
        .bind(cutoff)
        .execute(&mut *tx)
        .await
        .context("Failed to delete history of soft-deleted snippets")?;

        // 2. 스니펫 삭제
        let snippets = sqlx::query(
            r#"
            DELETE FROM snippets
            WHERE deleted_at IS NOT NULL AND deleted_at < $1
            "#,
        )
        .bind(cutoff)
        .execute(&mut *tx)
        .await
        .context("Failed to delete soft-deleted snippets")?;

        tx.commit().await.context("Failed to commit snippet purge")?;

        Ok(SnippetPurge {
            snippets: snippets.rows_affected(),
            history: history.rows_affected(),
        })
    }

    async fn purge_deleted_users(&self, cutoff: DateTime<Utc>) -> Result<u64> {
        let mut tx = self.pool.begin().await.context("Failed to begin transaction")?;

        // 세션, 토큰, 역할 연결을 먼저 정리하고 나머지는 CASCADE에 맡김
        for statement in [
            "DELETE FROM refresh_tokens WHERE user_id IN (SELECT id FROM users WHERE deleted_at IS NOT NULL AND deleted_at < $1)",
            "DELETE FROM sessions WHERE user_id IN (SELECT id FROM users WHERE deleted_at IS NOT NULL AND deleted_at < $1)",
            "DELETE FROM user_roles WHERE user_id IN (SELECT id FROM users WHERE deleted_at IS NOT NULL AND deleted_at < $1)",
        ] {
            sqlx::query(statement)
                .bind(cutoff)
                .execute(&mut *tx)
                .await
                .context("Failed to delete associations of soft-deleted users")?;
        }

        let users = sqlx::query(
            r#"
            DELETE FROM users
            WHERE deleted_at IS NOT NULL AND deleted_at < $1
            "#,
        )
        .bind(cutoff)
        .execute(&mut *tx)
        .await
        .context("Failed to delete soft-deleted users")?;

        tx.commit().await.context("Failed to commit user purge")?;

        Ok(users.rows_affected())
    }
}
