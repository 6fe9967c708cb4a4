// =====================================================
// ActivityTracker - 세션 활동 시각 비동기 갱신
// =====================================================
// 요청 경로에서는 try_send만 수행 (절대 대기하지 않음)
// 워커 태스크 1개가 큐를 비우며 touch를 실행
//
// 처리 흐름:
// 1. AuthenticatedUser 추출 시 record(session_id)
// 2. 큐가 가득 차면 해당 ping은 버림 (debug 로그)
// 3. 워커: touch를 타임아웃(5초)으로 감싸 실행, 실패는 로그만 남김
// 4. 취소 토큰 또는 모든 sender drop 시 워커 종료
// =====================================================

use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use uuid::Uuid;
use crate::domains::auth::services::session_service::SessionService;

pub const ACTIVITY_QUEUE_CAPACITY: usize = 1024;
pub const TOUCH_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Clone)]
pub struct ActivityTracker {
    sender: mpsc::Sender<Uuid>,
}

impl ActivityTracker {
    /// 워커 시작
    /// Spawn the worker and return the handle used by the request path
    pub fn spawn(
        sessions: SessionService,
        capacity: usize,
        timeout: Duration,
        cancel: CancellationToken,
    ) -> (Self, JoinHandle<()>) {
        let (sender, receiver) = mpsc::channel(capacity);
        let handle = tokio::spawn(Self::run(sessions, receiver, timeout, cancel));
        (Self { sender }, handle)
    }

    /// 활동 기록 요청 (논블로킹)
    /// Returns false when the ping was dropped.
    pub fn record(&self, session_id: Uuid) -> bool {
        match self.sender.try_send(session_id) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                debug!(session_id = %session_id, "activity queue full, ping dropped");
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                debug!(session_id = %session_id, "activity worker stopped, ping dropped");
                false
            }
        }
    }

    async fn run(
        sessions: SessionService,
        mut receiver: mpsc::Receiver<Uuid>,
        timeout: Duration,
        cancel: CancellationToken,
    ) {
        loop {
            let session_id = tokio::select! {
                _ = cancel.cancelled() => break,
                next = receiver.recv() => match next {
                    Some(session_id) => session_id,
                    None => break,
                },
            };

            match tokio::time::timeout(timeout, sessions.touch(session_id)).await {
                Ok(Ok(_)) => {}
                Ok(Err(e)) => {
                    warn!(session_id = %session_id, error = %e, "failed to record session activity");
                }
                Err(_) => {
                    warn!(session_id = %session_id, timeout_ms = timeout.as_millis() as u64, "session touch timed out");
                }
            }
        }

        debug!("activity worker stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use anyhow::Result;
    use async_trait::async_trait;
    use chrono::{DateTime, Duration as ChronoDuration, TimeZone, Utc};
    use crate::domains::auth::models::{ClientInfo, Session, SessionCreate};
    use crate::shared::database::{MemoryStore, SessionStore};
    use crate::shared::utils::{Clock, ManualClock};

    // 특정 세션의 touch가 끝나지 않는 저장소
    struct StalledStore {
        inner: MemoryStore,
        stalled: Uuid,
    }

    #[async_trait]
    impl SessionStore for StalledStore {
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
            if id == self.stalled {
                std::future::pending::<()>().await;
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

    async fn setup() -> (SessionService, ManualClock, Uuid) {
        let store = MemoryStore::new();
        let clock = ManualClock::new(Utc.with_ymd_and_hms(2025, 3, 1, 9, 0, 0).unwrap());
        let user = store
            .insert_user("alice@example.com", "alice", "hash", clock.now())
            .unwrap();
        let sessions = SessionService::new(
            Arc::new(store),
            Arc::new(clock.clone()),
            ChronoDuration::days(90),
        );
        let client = ClientInfo {
            ip: "198.51.100.1".to_string(),
            user_agent: None,
        };
        let session = sessions.open(user.id, None, &client).await.unwrap();
        (sessions, clock, session.id)
    }

    #[tokio::test]
    async fn worker_applies_queued_touches() {
        let (sessions, clock, session_id) = setup().await;
        let (tracker, handle) = ActivityTracker::spawn(
            sessions.clone(),
            ACTIVITY_QUEUE_CAPACITY,
            TOUCH_TIMEOUT,
            CancellationToken::new(),
        );

        clock.advance(ChronoDuration::minutes(10));
        assert!(tracker.record(session_id));

        // sender drop → 남은 ping 처리 후 워커 종료
        drop(tracker);
        handle.await.unwrap();

        let session = sessions.find(session_id).await.unwrap().unwrap();
        assert_eq!(session.last_activity, clock.now());
    }

    #[tokio::test]
    async fn full_queue_drops_pings() {
        let (sessions, _, session_id) = setup().await;
        let cancel = CancellationToken::new();
        let (tracker, handle) = ActivityTracker::spawn(sessions, 1, TOUCH_TIMEOUT, cancel.clone());

        // current-thread 런타임: 워커는 아직 실행되지 않음
        assert!(tracker.record(session_id));
        assert!(!tracker.record(session_id));

        cancel.cancel();
        handle.await.unwrap();
        assert!(!tracker.record(session_id));
    }

    #[tokio::test(start_paused = true)]
    async fn stalled_touch_times_out_and_later_pings_still_apply() {
        let store = MemoryStore::new();
        let clock = ManualClock::new(Utc.with_ymd_and_hms(2025, 3, 1, 9, 0, 0).unwrap());
        let user = store
            .insert_user("alice@example.com", "alice", "hash", clock.now())
            .unwrap();
        let client = ClientInfo {
            ip: "198.51.100.1".to_string(),
            user_agent: None,
        };
        let plain = SessionService::new(Arc::new(store.clone()), Arc::new(clock.clone()), ChronoDuration::days(90));
        let stalled = plain.open(user.id, None, &client).await.unwrap();
        let healthy = plain.open(user.id, None, &client).await.unwrap();

        let sessions = SessionService::new(
            Arc::new(StalledStore { inner: store, stalled: stalled.id }),
            Arc::new(clock.clone()),
            ChronoDuration::days(90),
        );
        let started = tokio::time::Instant::now();
        let (tracker, handle) = ActivityTracker::spawn(
            sessions,
            ACTIVITY_QUEUE_CAPACITY,
            TOUCH_TIMEOUT,
            CancellationToken::new(),
        );

        clock.advance(ChronoDuration::minutes(10));
        assert!(tracker.record(stalled.id));
        assert!(tracker.record(healthy.id));

        drop(tracker);
        handle.await.unwrap();

        assert!(started.elapsed() >= TOUCH_TIMEOUT);
        let stalled_after = plain.find(stalled.id).await.unwrap().unwrap();
        assert_eq!(stalled_after.last_activity, stalled.last_activity);
        let healthy_after = plain.find(healthy.id).await.unwrap().unwrap();
        assert_eq!(healthy_after.last_activity, clock.now());
    }
}
