use std::sync::Arc;
use chrono::Duration;
use tracing::{debug, info};
use uuid::Uuid;
use crate::domains::auth::models::{ClientInfo, Session, SessionCreate};
use crate::shared::database::SessionStore;
use crate::shared::errors::AuthError;
use crate::shared::utils::{hash_ip, SharedClock};

/// 로그아웃된 세션을 보관하는 유예 기간
pub const LOGGED_OUT_SESSION_GRACE_DAYS: i64 = 30;

/// 세션 레지스트리
/// Per-device session records.
///
/// 상태 변화:
/// 1. open → active=true, last_activity = created_at
/// 2. touch → last_activity 전진 (활성 세션만, 절대 뒤로 가지 않음)
/// 3. close / 유휴 정리 → active=false, logged_out_at = now (재활성화 불가)
/// 4. purge → 만료 또는 로그아웃 후 유예 기간 경과 시 삭제
#[derive(Clone)]
pub struct SessionService {
    store: Arc<dyn SessionStore>,
    clock: SharedClock,
    ttl: Duration,
}

impl SessionService {
    /// `ttl` is the refresh token lifetime; a session never outlives its token.
    pub fn new(store: Arc<dyn SessionStore>, clock: SharedClock, ttl: Duration) -> Self {
        Self { store, clock, ttl }
    }

    /// 세션 생성 (IP는 해시로만 저장)
    pub async fn open(
        &self,
        user_id: i64,
        device_info: Option<String>,
        client: &ClientInfo,
    ) -> Result<Session, AuthError> {
        let now = self.clock.now();
        let session = self
            .store
            .create_session(SessionCreate {
                id: Uuid::new_v4(),
                user_id,
                device_info,
                ip_hash: hash_ip(&client.ip),
                user_agent: client.user_agent.clone(),
                created_at: now,
                expires_at: now + self.ttl,
            })
            .await
            .map_err(|e| AuthError::DatabaseError(format!("Failed to create session: {}", e)))?;

        info!(user_id, session_id = %session.id, "session opened");
        Ok(session)
    }

    pub async fn find(&self, session_id: Uuid) -> Result<Option<Session>, AuthError> {
        self.store
            .find_session(session_id)
            .await
            .map_err(|e| AuthError::DatabaseError(format!("Failed to fetch session: {}", e)))
    }

    pub async fn list_active(&self, user_id: i64) -> Result<Vec<Session>, AuthError> {
        self.store
            .list_active_sessions(user_id, self.clock.now())
            .await
            .map_err(|e| AuthError::DatabaseError(format!("Failed to list sessions: {}", e)))
    }

    /// 활동 시각 갱신
    /// Returns false for closed or unknown sessions, which stay untouched.
    pub async fn touch(&self, session_id: Uuid) -> Result<bool, AuthError> {
        self.store
            .touch_session(session_id, self.clock.now())
            .await
            .map_err(|e| AuthError::DatabaseError(format!("Failed to touch session: {}", e)))
    }

    /// 세션 종료 (이미 종료된 세션은 false, 에러 아님)
    pub async fn close(&self, session_id: Uuid) -> Result<bool, AuthError> {
        let closed = self
            .store
            .close_session(session_id, self.clock.now())
            .await
            .map_err(|e| AuthError::DatabaseError(format!("Failed to close session: {}", e)))?;

        if closed {
            info!(session_id = %session_id, "session closed");
        }
        Ok(closed)
    }

    pub async fn close_all_for_user(&self, user_id: i64) -> Result<u64, AuthError> {
        let closed = self
            .store
            .close_sessions_for_user(user_id, self.clock.now())
            .await
            .map_err(|e| AuthError::DatabaseError(format!("Failed to close sessions: {}", e)))?;

        info!(user_id, count = closed, "all sessions closed");
        Ok(closed)
    }

    /// 유휴 세션 정리
    /// Deactivates active sessions idle for longer than `idle_threshold`.
    /// Already inactive sessions never match, so re-running is a no-op.
    pub async fn sweep_idle(&self, idle_threshold: Duration) -> Result<u64, AuthError> {
        let now = self.clock.now();
        let idle_before = now
            .checked_sub_signed(idle_threshold)
            .ok_or_else(|| AuthError::Internal(format!("Idle threshold out of range: {}", idle_threshold)))?;
        let swept = self
            .store
            .sweep_idle_sessions(idle_before, now)
            .await
            .map_err(|e| AuthError::DatabaseError(format!("Failed to sweep idle sessions: {}", e)))?;

        debug!(count = swept, "idle sessions swept");
        Ok(swept)
    }

    /// 만료 세션 + 유예 기간이 지난 로그아웃 세션 삭제
    pub async fn purge_expired(&self) -> Result<u64, AuthError> {
        let now = self.clock.now();
        self.store
            .purge_sessions(now, now - Duration::days(LOGGED_OUT_SESSION_GRACE_DAYS))
            .await
            .map_err(|e| AuthError::DatabaseError(format!("Failed to purge sessions: {}", e)))
    }
}
