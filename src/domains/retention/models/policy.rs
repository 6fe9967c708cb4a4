use chrono::Duration;

/// 보존 정책 (불변 값 객체)
/// Maximum ages after which historical or soft-deleted data is purged
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetentionPolicy {
    snippet_version_days: u32,
    soft_deleted_snippet_days: u32,
    soft_deleted_user_days: u32,
    idle_session_days: u32,
}

impl RetentionPolicy {
    pub fn new(
        snippet_version_days: u32,
        soft_deleted_snippet_days: u32,
        soft_deleted_user_days: u32,
        idle_session_days: u32,
    ) -> Self {
        Self {
            snippet_version_days,
            soft_deleted_snippet_days,
            soft_deleted_user_days,
            idle_session_days,
        }
    }

    pub fn snippet_version_age(&self) -> Duration {
        age(self.snippet_version_days)
    }

    pub fn soft_deleted_snippet_age(&self) -> Duration {
        age(self.soft_deleted_snippet_days)
    }

    pub fn soft_deleted_user_age(&self) -> Duration {
        age(self.soft_deleted_user_days)
    }

    pub fn idle_session_age(&self) -> Duration {
        age(self.idle_session_days)
    }
}

// 표현할 수 없는 기간은 최대값으로 포화, cutoff 계산 단계에서 오류가 됨
fn age(days: u32) -> Duration {
    Duration::try_days(i64::from(days)).unwrap_or(Duration::MAX)
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        Self::new(60, 30, 30, 7)
    }
}
