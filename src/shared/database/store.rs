// 저장소 인터페이스
// Store seams consumed by the auth core and the retention scheduler.
//
// Every time-dependent write receives `now` (or a cutoff derived from it)
// from the caller's Clock instead of reading the database clock.
use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;
use crate::domains::auth::models::{
    RefreshToken, RefreshTokenCreate, Session, SessionCreate, TokenOwner, User,
};

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>>;
    async fn find_user_by_id(&self, id: i64) -> Result<Option<User>>;
}

#[async_trait]
pub trait RefreshTokenStore: Send + Sync {
    async fn create_refresh_token(&self, data: RefreshTokenCreate) -> Result<RefreshToken>;

    async fn find_refresh_token(&self, token_hash: &str) -> Result<Option<RefreshToken>>;

    /// Returns whether a row matched, revoked before or not.
    async fn revoke_refresh_token(&self, token_hash: &str) -> Result<bool>;

    /// Returns the number of tokens that flipped to revoked.
    async fn revoke_refresh_tokens(&self, owner: TokenOwner) -> Result<u64>;

    /// Deletes tokens expired at `now`, and revoked tokens created before
    /// `revoked_before`.
    async fn delete_stale_refresh_tokens(
        &self,
        now: DateTime<Utc>,
        revoked_before: DateTime<Utc>,
    ) -> Result<u64>;
}

#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn create_session(&self, data: SessionCreate) -> Result<Session>;

    async fn find_session(&self, id: Uuid) -> Result<Option<Session>>;

    async fn list_active_sessions(&self, user_id: i64, now: DateTime<Utc>) -> Result<Vec<Session>>;

    /// Moves `last_activity` forward to `now` on an active session. Never
    /// moves it backwards, never touches an inactive session.
    async fn touch_session(&self, id: Uuid, now: DateTime<Utc>) -> Result<bool>;

    /// Returns false when the session was already inactive or missing.
    async fn close_session(&self, id: Uuid, now: DateTime<Utc>) -> Result<bool>;

    async fn close_sessions_for_user(&self, user_id: i64, now: DateTime<Utc>) -> Result<u64>;

    /// Deactivates active sessions whose `last_activity` is before `idle_before`.
    async fn sweep_idle_sessions(
        &self,
        idle_before: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<u64>;

    /// Hard-deletes sessions expired at `now` or logged out before
    /// `logged_out_before`.
    async fn purge_sessions(
        &self,
        now: DateTime<Utc>,
        logged_out_before: DateTime<Utc>,
    ) -> Result<u64>;
}

/// 소프트 삭제 스니펫 정리 결과
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SnippetPurge {
    pub snippets: u64,
    pub history: u64,
}

#[async_trait]
pub trait RetentionStore: Send + Sync {
    async fn delete_history_before(&self, cutoff: DateTime<Utc>) -> Result<u64>;

    /// History rows go first, then the snippets soft-deleted before `cutoff`.
    async fn purge_deleted_snippets(&self, cutoff: DateTime<Utc>) -> Result<SnippetPurge>;

    /// Sessions, refresh tokens and role links go first, then the users
    /// soft-deleted before `cutoff`. Returns the number of users removed.
    async fn purge_deleted_users(&self, cutoff: DateTime<Utc>) -> Result<u64>;
}
