// =====================================================
// TokenBucket - 키별 토큰 버킷
// =====================================================
// 상태 변화:
// 1. 첫 요청 → 가득 찬 버킷 생성 (tokens = burst)
// 2. 요청마다 경과 시간만큼 리필 (최대 burst) 후 1개 소비
// 3. 토큰 부족 → 거부 (상태는 리필 외에 변하지 않음)
// =====================================================

use std::time::Instant;

/// 리밋 설정 (초당 리필 속도 + 최대 버스트)
/// Refill rate and burst capacity of one limiter instance
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RateLimitConfig {
    pub rate_per_sec: f64,
    pub burst: u32,
}

impl RateLimitConfig {
    pub fn per_second(rate: f64, burst: u32) -> Self {
        Self {
            rate_per_sec: rate,
            burst,
        }
    }

    pub fn per_minute(rate: f64, burst: u32) -> Self {
        Self {
            rate_per_sec: rate / 60.0,
            burst,
        }
    }
}

#[derive(Debug, Clone)]
pub struct TokenBucket {
    tokens: f64,
    last_refill: Instant,
    last_seen: Instant,
}

impl TokenBucket {
    /// 가득 찬 버킷 생성
    pub fn full(config: &RateLimitConfig, now: Instant) -> Self {
        Self {
            tokens: f64::from(config.burst),
            last_refill: now,
            last_seen: now,
        }
    }

    /// 토큰 1개 소비 시도
    /// Refill for the elapsed time, then take one token if available.
    pub fn try_consume(&mut self, config: &RateLimitConfig, now: Instant) -> bool {
        let elapsed = now.saturating_duration_since(self.last_refill).as_secs_f64();
        self.tokens = (self.tokens + elapsed * config.rate_per_sec).min(f64::from(config.burst));
        // 시계가 뒤로 가는 호출(동시 요청)은 last_refill을 되돌리지 않음
        self.last_refill = self.last_refill.max(now);
        self.last_seen = self.last_seen.max(now);

        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            true
        } else {
            false
        }
    }

    pub fn last_seen(&self) -> Instant {
        self.last_seen
    }
}
