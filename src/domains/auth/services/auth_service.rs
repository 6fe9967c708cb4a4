use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;
use crate::domains::auth::models::{
    AccessIdentity, ClientInfo, IssuedAccessToken, IssuedRefreshToken, Session, TokenOwner, User,
};
use crate::domains::auth::services::{ActivityTracker, JwtService, RefreshTokenService, SessionService};
use crate::shared::database::UserStore;
use crate::shared::errors::{AuthError, RefreshTokenError};
use crate::shared::utils::verify_password;

/// 로그인 결과 (토큰 쌍 + 세션)
#[derive(Debug, Clone)]
pub struct LoginOutcome {
    pub user: User,
    pub access_token: IssuedAccessToken,
    pub refresh_token: IssuedRefreshToken,
    pub session: Session,
}

/// 전체 로그아웃 결과
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogoutEverywhere {
    pub revoked_tokens: u64,
    pub closed_sessions: u64,
}

// 인증 서비스
// AuthService: drives the login / refresh / logout flows over the token
// codec, the refresh token store and the session registry.
#[derive(Clone)]
pub struct AuthService {
    users: Arc<dyn UserStore>,
    jwt_service: JwtService,
    refresh_tokens: RefreshTokenService,
    sessions: SessionService,
    activity: ActivityTracker,
}

impl AuthService {
    pub fn new(
        users: Arc<dyn UserStore>,
        jwt_service: JwtService,
        refresh_tokens: RefreshTokenService,
        sessions: SessionService,
        activity: ActivityTracker,
    ) -> Self {
        Self {
            users,
            jwt_service,
            refresh_tokens,
            sessions,
            activity,
        }
    }

    // 로그인 (비즈니스 로직)
    // 1. 사용자 조회 + 비밀번호 검증 (소프트 삭제된 사용자 거부)
    // 2. 세션 생성
    // 3. 세션에 묶인 Refresh Token 발급
    // 4. sid를 담은 Access Token 발급
    // 다른 기기의 세션/토큰은 건드리지 않음
    pub async fn login(
        &self,
        email: &str,
        password: &str,
        device_info: Option<String>,
        client: &ClientInfo,
    ) -> Result<LoginOutcome, AuthError> {
        let user = self
            .users
            .find_user_by_email(email)
            .await
            .map_err(|e| AuthError::DatabaseError(format!("Failed to fetch user: {}", e)))?
            .filter(|u| !u.is_deleted())
            .ok_or(AuthError::InvalidCredentials)?;

        verify_password(password, &user.password_hash)?;

        let session = self
            .sessions
            .open(user.id, device_info.clone(), client)
            .await?;

        let (refresh_token, access_token) = match self.issue_credentials(&user, session.id, device_info).await {
            Ok(pair) => pair,
            Err(e) => {
                // 자격 증명 없는 세션은 남기지 않음
                if let Err(close_err) = self.sessions.close(session.id).await {
                    warn!(session_id = %session.id, error = %close_err, "failed to close session after login error");
                }
                return Err(e);
            }
        };

        info!(user_id = user.id, session_id = %session.id, "user logged in");

        Ok(LoginOutcome {
            user,
            access_token,
            refresh_token,
            session,
        })
    }

    /// Refresh Token으로 새 Access Token 발급 (Refresh Token은 회전하지 않음)
    /// Mint a new access token; the refresh secret stays valid unchanged.
    pub async fn refresh(&self, secret: &str) -> Result<IssuedAccessToken, AuthError> {
        let record = self.refresh_tokens.validate(secret).await?;

        // 종료된 세션의 토큰은 세션을 되살리지 못함
        if let Some(session_id) = record.session_id {
            let active = self
                .sessions
                .find(session_id)
                .await?
                .is_some_and(|s| s.active);
            if !active {
                self.refresh_tokens.revoke(secret).await?;
                warn!(user_id = record.user_id, session_id = %session_id, "refresh on closed session rejected");
                return Err(RefreshTokenError::Revoked.into());
            }
        }

        let user = self
            .users
            .find_user_by_id(record.user_id)
            .await
            .map_err(|e| AuthError::DatabaseError(format!("Failed to fetch user: {}", e)))?
            .filter(|u| !u.is_deleted())
            .ok_or(RefreshTokenError::NotFound)?;

        let access_token = self
            .jwt_service
            .issue_access_token(&identity_for(&user, record.session_id))?;

        // 활동 시각 갱신은 워커에 맡김 (응답을 지연시키지 않음)
        if let Some(session_id) = record.session_id {
            self.activity.record(session_id);
        }

        Ok(access_token)
    }

    /// 로그아웃 - Refresh Token 폐기 + 세션 종료
    /// Unknown or already revoked secrets are a successful no-op.
    pub async fn logout(&self, secret: &str) -> Result<(), AuthError> {
        let session_id = match self.refresh_tokens.validate(secret).await {
            Ok(record) => record.session_id,
            Err(AuthError::RefreshToken(_)) => None,
            Err(e) => return Err(e),
        };

        self.refresh_tokens.revoke(secret).await?;

        if let Some(session_id) = session_id {
            self.sessions.close(session_id).await?;
        }

        Ok(())
    }

    /// 모든 기기에서 로그아웃
    pub async fn logout_everywhere(&self, user_id: i64) -> Result<LogoutEverywhere, AuthError> {
        let revoked_tokens = self
            .refresh_tokens
            .revoke_all_for_owner(TokenOwner::User(user_id))
            .await?;
        let closed_sessions = self.sessions.close_all_for_user(user_id).await?;

        info!(user_id, revoked_tokens, closed_sessions, "logged out everywhere");

        Ok(LogoutEverywhere {
            revoked_tokens,
            closed_sessions,
        })
    }

    pub async fn list_sessions(&self, user_id: i64) -> Result<Vec<Session>, AuthError> {
        self.sessions.list_active(user_id).await
    }

    /// 특정 세션 종료 (본인 세션만)
    pub async fn close_session(&self, user_id: i64, session_id: Uuid) -> Result<(), AuthError> {
        let session = self
            .sessions
            .find(session_id)
            .await?
            .ok_or(AuthError::SessionNotFound)?;

        if session.user_id != user_id {
            return Err(AuthError::SessionForbidden);
        }

        self.refresh_tokens
            .revoke_all_for_owner(TokenOwner::Session(session_id))
            .await?;
        self.sessions.close(session_id).await?;

        Ok(())
    }

    async fn issue_credentials(
        &self,
        user: &User,
        session_id: Uuid,
        device_info: Option<String>,
    ) -> Result<(IssuedRefreshToken, IssuedAccessToken), AuthError> {
        let refresh_token = self
            .refresh_tokens
            .issue(user.id, Some(session_id), device_info)
            .await?;
        let access_token = self
            .jwt_service
            .issue_access_token(&identity_for(user, Some(session_id)))?;

        Ok((refresh_token, access_token))
    }

    /// 사용자 정보 조회 (소프트 삭제된 사용자 제외)
    pub async fn get_user_info(&self, user_id: i64) -> Result<User, AuthError> {
        self.users
            .find_user_by_id(user_id)
            .await
            .map_err(|e| AuthError::DatabaseError(format!("Failed to fetch user: {}", e)))?
            .filter(|u| !u.is_deleted())
            .ok_or(AuthError::InvalidCredentials)
    }
}

fn identity_for(user: &User, session_id: Option<Uuid>) -> AccessIdentity {
    AccessIdentity {
        user_id: user.id,
        username: user.username.clone(),
        email: user.email.clone(),
        session_id,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::{anyhow, Result};
    use async_trait::async_trait;
    use chrono::{DateTime, Duration, TimeZone, Utc};
    use tokio_util::sync::CancellationToken;
    use crate::domains::auth::models::{RefreshToken, RefreshTokenCreate, SessionCreate};
    use crate::domains::auth::services::{ACTIVITY_QUEUE_CAPACITY, TOUCH_TIMEOUT};
    use crate::shared::config::TokenConfig;
    use crate::shared::database::{MemoryStore, RefreshTokenStore, SessionStore};
    use crate::shared::utils::{hash_password, Clock, ManualClock, SharedClock};

    // 저장소 장애 주입
    #[derive(Debug, Clone, Copy, Default)]
    struct Faults {
        touch: bool,
        token_create: bool,
    }

    struct FaultyStore {
        inner: MemoryStore,
        faults: Faults,
    }

    #[async_trait]
    impl SessionStore for FaultyStore {
        async fn create_session(&self, data: SessionCreate) -> Result<Session> {
            self.inner.create_session(data).await
        }

        async fn find_session(&self, id: Uuid) -> Result<Option<Session>> {
            self.inner.find_session(id).await
        }

        async fn list_active_sessions(&self, user_id: i64, now: DateTime<Utc>) -> Result<Vec<Session>> {
            self.inner.list_active_sessions(user_id, now).await
        }

        async fn touch_session(&self, id: Uuid, now: DateTime<Utc>) -> Result<bool> {
            if self.faults.touch {
                return Err(anyhow!("store write timed out"));
            }
            self.inner.touch_session(id, now).await
        }

        async fn close_session(&self, id: Uuid, now: DateTime<Utc>) -> Result<bool> {
            self.inner.close_session(id, now).await
        }

        async fn close_sessions_for_user(&self, user_id: i64, now: DateTime<Utc>) -> Result<u64> {
            self.inner.close_sessions_for_user(user_id, now).await
        }

        async fn sweep_idle_sessions(&self, idle_before: DateTime<Utc>, now: DateTime<Utc>) -> Result<u64> {
            self.inner.sweep_idle_sessions(idle_before, now).await
        }

        async fn purge_sessions(&self, now: DateTime<Utc>, logged_out_before: DateTime<Utc>) -> Result<u64> {
            self.inner.purge_sessions(now, logged_out_before).await
        }
    }

    #[async_trait]
    impl RefreshTokenStore for FaultyStore {
        async fn create_refresh_token(&self, data: RefreshTokenCreate) -> Result<RefreshToken> {
            if self.faults.token_create {
                return Err(anyhow!("connection reset"));
            }
            self.inner.create_refresh_token(data).await
        }

        async fn find_refresh_token(&self, token_hash: &str) -> Result<Option<RefreshToken>> {
            self.inner.find_refresh_token(token_hash).await
        }

        async fn revoke_refresh_token(&self, token_hash: &str) -> Result<bool> {
            self.inner.revoke_refresh_token(token_hash).await
        }

        async fn revoke_refresh_tokens(&self, owner: TokenOwner) -> Result<u64> {
            self.inner.revoke_refresh_tokens(owner).await
        }

        async fn delete_stale_refresh_tokens(
            &self,
            now: DateTime<Utc>,
            revoked_before: DateTime<Utc>,
        ) -> Result<u64> {
            self.inner.delete_stale_refresh_tokens(now, revoked_before).await
        }
    }

    struct Fixture {
        service: AuthService,
        jwt: JwtService,
        clock: ManualClock,
        store: MemoryStore,
        user: User,
    }

    fn fixture() -> Fixture {
        fixture_with(Faults::default())
    }

    fn fixture_with(faults: Faults) -> Fixture {
        let store = MemoryStore::new();
        let clock = ManualClock::new(Utc.with_ymd_and_hms(2025, 3, 1, 9, 0, 0).unwrap());
        let shared: SharedClock = Arc::new(clock.clone());
        let config = TokenConfig {
            secret: "unit-test-secret".to_string(),
            access_ttl: Duration::minutes(15),
            refresh_ttl: Duration::days(90),
        };
        let user = store
            .insert_user("alice@example.com", "alice", &hash_password("correct horse").unwrap(), clock.now())
            .unwrap();

        let faulty = Arc::new(FaultyStore { inner: store.clone(), faults });
        let jwt = JwtService::new(&config, shared.clone()).unwrap();
        let sessions = SessionService::new(faulty.clone(), shared.clone(), config.refresh_ttl);
        let (activity, _worker) = ActivityTracker::spawn(
            sessions.clone(),
            ACTIVITY_QUEUE_CAPACITY,
            TOUCH_TIMEOUT,
            CancellationToken::new(),
        );
        let service = AuthService::new(
            Arc::new(store.clone()),
            jwt.clone(),
            RefreshTokenService::new(faulty, shared, config.refresh_ttl),
            sessions,
            activity,
        );

        Fixture { service, jwt, clock, store, user }
    }

    // 활동 워커가 큐를 비울 때까지 양보
    async fn wait_for_activity(store: &MemoryStore, user_id: i64, expected: DateTime<Utc>) -> DateTime<Utc> {
        let mut last = store.sessions_for_user(user_id)[0].last_activity;
        for _ in 0..100 {
            if last == expected {
                break;
            }
            tokio::task::yield_now().await;
            last = store.sessions_for_user(user_id)[0].last_activity;
        }
        last
    }

    fn client() -> ClientInfo {
        ClientInfo {
            ip: "192.0.2.10".to_string(),
            user_agent: Some("test".to_string()),
        }
    }

    #[tokio::test]
    async fn login_rejects_bad_credentials() {
        let f = fixture();

        let wrong = f.service.login("alice@example.com", "nope", None, &client()).await;
        assert!(matches!(wrong, Err(AuthError::InvalidCredentials)));

        let unknown = f.service.login("bob@example.com", "correct horse", None, &client()).await;
        assert!(matches!(unknown, Err(AuthError::InvalidCredentials)));

        f.store.soft_delete_user(f.user.id, f.clock.now()).unwrap();
        let deleted = f.service.login("alice@example.com", "correct horse", None, &client()).await;
        assert!(matches!(deleted, Err(AuthError::InvalidCredentials)));
    }

    #[tokio::test]
    async fn refresh_does_not_rotate_the_secret() {
        let f = fixture();
        let login = f.service.login("alice@example.com", "correct horse", None, &client()).await.unwrap();

        f.clock.advance(Duration::minutes(20));
        let first = f.service.refresh(&login.refresh_token.secret).await.unwrap();
        let second = f.service.refresh(&login.refresh_token.secret).await.unwrap();

        assert_eq!(first.expires_at, f.clock.now() + Duration::minutes(15));
        assert_eq!(second.expires_at, first.expires_at);

        let claims = f.jwt.validate_access_token(&first.token).unwrap();
        assert_eq!(claims.sid, Some(login.session.id));
        assert_eq!(f.store.refresh_tokens_for_user(f.user.id).len(), 1);

        let last_activity = wait_for_activity(&f.store, f.user.id, f.clock.now()).await;
        assert_eq!(last_activity, f.clock.now());
    }

    #[tokio::test]
    async fn failing_touch_does_not_fail_refresh() {
        let f = fixture_with(Faults { touch: true, ..Faults::default() });
        let login = f.service.login("alice@example.com", "correct horse", None, &client()).await.unwrap();

        f.clock.advance(Duration::minutes(20));
        let refreshed = f.service.refresh(&login.refresh_token.secret).await.unwrap();
        assert_eq!(refreshed.expires_at, f.clock.now() + Duration::minutes(15));

        // 워커가 실패를 기록만 하고 넘어감
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
        let session = f.store.sessions_for_user(f.user.id).remove(0);
        assert_eq!(session.last_activity, login.session.last_activity);
        assert!(session.active);
    }

    #[tokio::test]
    async fn failed_token_issue_closes_the_new_session() {
        let f = fixture_with(Faults { token_create: true, ..Faults::default() });

        let result = f.service.login("alice@example.com", "correct horse", None, &client()).await;
        assert!(matches!(result, Err(AuthError::DatabaseError(_))));

        let sessions = f.store.sessions_for_user(f.user.id);
        assert_eq!(sessions.len(), 1);
        assert!(!sessions[0].active);
        assert!(sessions[0].logged_out_at.is_some());
        assert!(f.service.list_sessions(f.user.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn logout_closes_the_session_and_is_idempotent() {
        let f = fixture();
        let login = f.service.login("alice@example.com", "correct horse", None, &client()).await.unwrap();

        f.service.logout(&login.refresh_token.secret).await.unwrap();
        f.service.logout(&login.refresh_token.secret).await.unwrap();
        f.service.logout("never-issued").await.unwrap();

        let err = f.service.refresh(&login.refresh_token.secret).await.unwrap_err();
        assert!(matches!(err, AuthError::RefreshToken(RefreshTokenError::Revoked)));
        assert!(f.service.list_sessions(f.user.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn swept_session_cannot_refresh() {
        let f = fixture();
        let login = f.service.login("alice@example.com", "correct horse", None, &client()).await.unwrap();

        f.clock.advance(Duration::days(8));
        let sessions = SessionService::new(
            Arc::new(f.store.clone()),
            Arc::new(f.clock.clone()),
            Duration::days(90),
        );
        assert_eq!(sessions.sweep_idle(Duration::days(7)).await.unwrap(), 1);

        let err = f.service.refresh(&login.refresh_token.secret).await.unwrap_err();
        assert!(matches!(err, AuthError::RefreshToken(RefreshTokenError::Revoked)));
        assert!(f.store.refresh_tokens_for_user(f.user.id)[0].revoked);
    }

    #[tokio::test]
    async fn close_session_checks_ownership() {
        let f = fixture();
        let mallory = f
            .store
            .insert_user("mallory@example.com", "mallory", &hash_password("pw").unwrap(), f.clock.now())
            .unwrap();
        let login = f.service.login("alice@example.com", "correct horse", None, &client()).await.unwrap();

        let missing = f.service.close_session(f.user.id, Uuid::new_v4()).await;
        assert!(matches!(missing, Err(AuthError::SessionNotFound)));

        let forbidden = f.service.close_session(mallory.id, login.session.id).await;
        assert!(matches!(forbidden, Err(AuthError::SessionForbidden)));
        assert!(f.service.refresh(&login.refresh_token.secret).await.is_ok());

        f.service.close_session(f.user.id, login.session.id).await.unwrap();
        let err = f.service.refresh(&login.refresh_token.secret).await.unwrap_err();
        assert!(matches!(err, AuthError::RefreshToken(RefreshTokenError::Revoked)));
    }
}
