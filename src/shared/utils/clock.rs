use std::sync::Arc;
use chrono::{DateTime, Duration, Utc};
use parking_lot::RwLock;

/// 현재 시각 제공자
/// Source of "now" shared by every writer
///
/// 세션/토큰/보존 로직은 모두 이 Clock에서 시각을 받아
/// DB에 바인딩합니다 (SQL의 NOW() 대신).
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// 시스템 시계
/// Wall clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// 수동 시계 (테스트용)
/// Manually advanced clock, shared between clones
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Arc<RwLock<DateTime<Utc>>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Arc::new(RwLock::new(start)),
        }
    }

    /// 시각을 앞으로 이동
    /// Move time forward
    pub fn advance(&self, by: Duration) {
        let mut now = self.now.write();
        *now += by;
    }

    pub fn set(&self, to: DateTime<Utc>) {
        *self.now.write() = to;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.read()
    }
}

pub type SharedClock = Arc<dyn Clock>;
