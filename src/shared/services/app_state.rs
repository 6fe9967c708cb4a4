use std::sync::Arc;
use anyhow::Result;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::warn;
use crate::domains::auth::services::{
    ActivityTracker, AuthService, AuthState, JwtService, RefreshTokenService, SessionService,
    ACTIVITY_QUEUE_CAPACITY, TOUCH_TIMEOUT,
};
use crate::domains::rate_limit::RateLimiter;
use crate::domains::retention::services::RetentionScheduler;
use crate::shared::config::AppConfig;
use crate::shared::database::Stores;
use crate::shared::utils::SharedClock;

/// Application state (combines all domain states)
/// 애플리케이션 상태 (모든 도메인 상태를 조합)
///
/// 각 도메인의 State와 요청 경로의 속도 제한기를 묶어 Router에 주입합니다.
#[derive(Clone)]
pub struct AppState {
    pub auth_state: AuthState,
    /// 모든 요청에 적용되는 제한기
    pub general_limiter: Arc<RateLimiter>,
    /// 로그인/토큰 갱신에만 적용되는 엄격한 제한기
    pub strict_limiter: Arc<RateLimiter>,
    /// 데이터 보존 스케줄러
    pub retention_scheduler: RetentionScheduler,
    /// 신뢰할 수 있는 프록시 뒤에서만 X-Forwarded-For 사용
    pub trust_forwarded_for: bool,
}

/// 백그라운드 태스크 핸들 (종료 시 join)
#[derive(Default)]
pub struct BackgroundTasks {
    handles: Vec<JoinHandle<()>>,
}

impl BackgroundTasks {
    pub fn push(&mut self, handle: JoinHandle<()>) {
        self.handles.push(handle);
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// 모든 태스크 종료 대기 (취소 토큰을 먼저 cancel 해야 함)
    pub async fn join(self) {
        for handle in self.handles {
            if let Err(e) = handle.await {
                warn!(error = %e, "background task ended abnormally");
            }
        }
    }
}

impl AppState {
    /// 모든 서비스 생성 + 활동 워커 시작 (tokio 런타임 안에서 호출)
    /// Build every service from the injected config, stores and clock.
    pub fn new(
        config: &AppConfig,
        stores: Stores,
        clock: SharedClock,
        cancel: &CancellationToken,
    ) -> Result<(Self, BackgroundTasks)> {
        let mut tasks = BackgroundTasks::default();

        // 1. 공유 서비스 생성
        let jwt_service = JwtService::new(&config.token, clock.clone())?;
        let refresh_tokens = RefreshTokenService::new(
            stores.refresh_tokens.clone(),
            clock.clone(),
            config.token.refresh_ttl,
        );
        let sessions = SessionService::new(stores.sessions.clone(), clock.clone(), config.token.refresh_ttl);

        // 2. 세션 활동 워커
        let (activity, worker) = ActivityTracker::spawn(
            sessions.clone(),
            ACTIVITY_QUEUE_CAPACITY,
            TOUCH_TIMEOUT,
            cancel.child_token(),
        );
        tasks.push(worker);

        // 3. 도메인 State 조합
        let auth_service = AuthService::new(
            stores.users.clone(),
            jwt_service.clone(),
            refresh_tokens.clone(),
            sessions.clone(),
            activity.clone(),
        );
        let auth_state = AuthState::new(auth_service, jwt_service, activity);

        let retention_scheduler = RetentionScheduler::new(
            sessions,
            refresh_tokens,
            stores.retention.clone(),
            clock,
            config.retention,
            config.retention_interval,
        );

        Ok((
            Self {
                auth_state,
                general_limiter: Arc::new(RateLimiter::new("general", config.general_rate_limit)),
                strict_limiter: Arc::new(RateLimiter::new("strict", config.strict_rate_limit)),
                retention_scheduler,
                trust_forwarded_for: config.trust_forwarded_for,
            },
            tasks,
        ))
    }

    /// 주기 작업 시작 (제한기 GC ×2 + 보존 스케줄러)
    pub fn start_maintenance(&self, cancel: &CancellationToken, tasks: &mut BackgroundTasks) {
        tasks.push(self.general_limiter.clone().spawn_gc(cancel.child_token()));
        tasks.push(self.strict_limiter.clone().spawn_gc(cancel.child_token()));
        tasks.push(self.retention_scheduler.start(cancel.child_token()));
    }
}
