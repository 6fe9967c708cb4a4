use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use anyhow::anyhow;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use crate::domains::auth::services::{RefreshTokenService, SessionService};
use crate::domains::retention::models::RetentionPolicy;
use crate::shared::database::RetentionStore;
use crate::shared::utils::SharedClock;

/// 보존 작업 1회 실행 결과
/// Per-phase counts of one retention run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RetentionReport {
    pub idle_sessions_closed: u64,
    pub refresh_tokens_deleted: u64,
    pub sessions_deleted: u64,
    pub history_deleted: u64,
    pub snippets_deleted: u64,
    pub snippet_history_deleted: u64,
    pub users_deleted: u64,
    /// 실패한 단계 이름 (실패해도 다음 단계는 계속 실행)
    pub failed_phases: Vec<&'static str>,
}

impl RetentionReport {
    pub fn is_clean(&self) -> bool {
        self.failed_phases.is_empty()
    }
}

/// 데이터 보존 스케줄러
/// Retention Scheduler
///
/// 역할:
/// - 시작 직후 1회, 이후 `interval`마다 보존 정책 적용
/// - 각 단계는 독립적 (한 단계 실패가 이후 단계를 막지 않음)
///
/// 처리 순서:
/// 1. 유휴 세션 종료
/// 2. 만료/폐기된 Refresh Token 삭제
/// 3. 만료/오래 로그아웃된 세션 삭제
/// 4. 오래된 스니펫 이력 삭제
/// 5. 소프트 삭제된 스니펫 삭제 (이력 먼저)
/// 6. 소프트 삭제된 사용자 삭제 (세션/토큰/역할 먼저)
#[derive(Clone)]
pub struct RetentionScheduler {
    sessions: SessionService,
    refresh_tokens: RefreshTokenService,
    store: Arc<dyn RetentionStore>,
    clock: SharedClock,
    policy: RetentionPolicy,
    interval: Duration,
}

impl RetentionScheduler {
    pub fn new(
        sessions: SessionService,
        refresh_tokens: RefreshTokenService,
        store: Arc<dyn RetentionStore>,
        clock: SharedClock,
        policy: RetentionPolicy,
        interval: Duration,
    ) -> Self {
        Self {
            sessions,
            refresh_tokens,
            store,
            clock,
            policy,
            interval,
        }
    }

    pub fn policy(&self) -> RetentionPolicy {
        self.policy
    }

    /// 스케줄러 시작
    /// Start scheduler
    ///
    /// 첫 실행은 즉시, 이후 주기마다 실행합니다. 밀린 tick은 건너뜁니다.
    pub fn start(&self, cancel: CancellationToken) -> JoinHandle<()> {
        let scheduler = self.clone();

        tokio::spawn(async move {
            let mut ticker = interval(scheduler.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = ticker.tick() => {
                        scheduler.run_once().await;
                    }
                }
            }

            info!("retention scheduler stopped");
        })
    }

    /// 보존 작업 1회 실행
    pub async fn run_once(&self) -> RetentionReport {
        let mut report = RetentionReport::default();
        let now = self.clock.now();

        if let Some(count) = phase(&mut report, "sweep_idle_sessions", {
            self.sessions.sweep_idle(self.policy.idle_session_age())
        })
        .await
        {
            report.idle_sessions_closed = count;
        }

        if let Some(count) = phase(&mut report, "purge_refresh_tokens", self.refresh_tokens.purge_stale()).await {
            report.refresh_tokens_deleted = count;
        }

        if let Some(count) = phase(&mut report, "purge_sessions", self.sessions.purge_expired()).await {
            report.sessions_deleted = count;
        }

        if let Some(count) = phase(&mut report, "delete_snippet_history", async {
            self.store.delete_history_before(cutoff(now, self.policy.snippet_version_age())?).await
        })
        .await
        {
            report.history_deleted = count;
        }

        if let Some(purge) = phase(&mut report, "purge_deleted_snippets", async {
            self.store.purge_deleted_snippets(cutoff(now, self.policy.soft_deleted_snippet_age())?).await
        })
        .await
        {
            report.snippets_deleted = purge.snippets;
            report.snippet_history_deleted = purge.history;
        }

        if let Some(count) = phase(&mut report, "purge_deleted_users", async {
            self.store.purge_deleted_users(cutoff(now, self.policy.soft_deleted_user_age())?).await
        })
        .await
        {
            report.users_deleted = count;
        }

        info!(
            idle_sessions_closed = report.idle_sessions_closed,
            refresh_tokens_deleted = report.refresh_tokens_deleted,
            sessions_deleted = report.sessions_deleted,
            history_deleted = report.history_deleted,
            snippets_deleted = report.snippets_deleted,
            users_deleted = report.users_deleted,
            failed_phases = report.failed_phases.len(),
            "retention run finished"
        );

        report
    }
}

fn cutoff(now: DateTime<Utc>, age: ChronoDuration) -> anyhow::Result<DateTime<Utc>> {
    now.checked_sub_signed(age)
        .ok_or_else(|| anyhow!("retention age of {} days is out of range", age.num_days()))
}

// 단계 실행: 실패는 로그 후 보고서에 기록하고 삼킴
async fn phase<T, E, F>(report: &mut RetentionReport, name: &'static str, work: F) -> Option<T>
where
    F: Future<Output = Result<T, E>>,
    E: Display,
{
    match work.await {
        Ok(value) => Some(value),
        Err(e) => {
            error!(phase = name, error = %e, "retention phase failed");
            report.failed_phases.push(name);
            None
        }
    }
}
