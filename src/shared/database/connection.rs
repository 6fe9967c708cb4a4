use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use anyhow::{Context, Result};
use tracing::info;

// 데이터베이스 연결 풀
// Database connection pool for PostgreSQL
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    // 데이터베이스 연결 생성
    // Create a bounded connection pool; request traffic and the retention
    // scheduler share it.
    pub async fn new(db_url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(db_url)
            .await
            .context("Failed to connect to database")?;

        Ok(Self { pool })
    }

    // 연결 풀 반환
    // Get connection pool
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    // 마이그레이션 실행
    // Run migrations from migrations/ folder
    pub async fn initialize(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(self.pool())
            .await
            .context("Failed to run database migrations")?;

        info!("database migrations completed");
        Ok(())
    }
}
