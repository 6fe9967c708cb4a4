use sqlx::{PgPool, Row};
use sqlx::postgres::PgRow;
use anyhow::{Context, Result};
use async_trait::async_trait;
use crate::domains::auth::models::user::User;
use crate::shared::database::store::UserStore;

pub struct UserRepository {
    pool: PgPool
}

impl UserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn map_row(row: &PgRow) -> User {
        User {
            id: row.get("id"),
            email: row.get("email"),
            username: row.get("username"),
            password_hash: row.get("password_hash"),
            created_at: row.get("created_at"),
            deleted_at: row.get("deleted_at"),
        }
    }
}

#[async_trait]
impl UserStore for UserRepository {
    // 이메일로 사용자 조회 (로그인용)
    // Get user by email (for login)
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let row = sqlx::query(
            r#"
            SELECT id, email, username, password_hash, created_at, deleted_at
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch user by email")?;

        Ok(row.as_ref().map(Self::map_row))
    }

    // ID로 사용자 조회
    // Get user by ID
    async fn find_user_by_id(&self, id: i64) -> Result<Option<User>> {
        let row = sqlx::query(
            r#"
            SELECT id, email, username, password_hash, created_at, deleted_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch user by id")?;

        Ok(row.as_ref().map(Self::map_row))
    }
}
