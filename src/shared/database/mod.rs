// Database module
pub mod connection;
pub mod memory;
pub mod repositories;
pub mod store;

pub use connection::*;
pub use memory::*;
pub use repositories::*;
pub use store::*;

use std::sync::Arc;

/// 도메인 서비스에 주입되는 저장소 묶음
/// Store handles injected into the domain services
#[derive(Clone)]
pub struct Stores {
    pub users: Arc<dyn UserStore>,
    pub refresh_tokens: Arc<dyn RefreshTokenStore>,
    pub sessions: Arc<dyn SessionStore>,
    pub retention: Arc<dyn RetentionStore>,
}

impl Stores {
    /// PostgreSQL 저장소 (모든 Repository가 같은 연결 풀 공유)
    pub fn postgres(db: &Database) -> Self {
        let pool = db.pool().clone();
        Self {
            users: Arc::new(UserRepository::new(pool.clone())),
            refresh_tokens: Arc::new(RefreshTokenRepository::new(pool.clone())),
            sessions: Arc::new(SessionRepository::new(pool.clone())),
            retention: Arc::new(RetentionRepository::new(pool)),
        }
    }

    pub fn memory(store: MemoryStore) -> Self {
        Self {
            users: Arc::new(store.clone()),
            refresh_tokens: Arc::new(store.clone()),
            sessions: Arc::new(store.clone()),
            retention: Arc::new(store),
        }
    }
}
