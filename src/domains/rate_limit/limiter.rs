// =====================================================
// RateLimiter - 식별자별 요청 제한 (메모리 전용)
// =====================================================
// 핵심 설계:
// 1. 키 공간을 16개 샤드로 분할, 샤드마다 RwLock<HashMap>
// 2. 기존 키는 읽기 락 + 버킷 Mutex만 사용 (hot path)
// 3. 처음 보는 키와 GC만 쓰기 락 사용
// 4. 재시작 시 상태 소실 허용 (best-effort)
// =====================================================

use std::collections::HashMap;
use std::collections::hash_map::RandomState;
use std::hash::BuildHasher;
use std::sync::Arc;
use std::time::{Duration, Instant};
use parking_lot::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use crate::domains::rate_limit::bucket::{RateLimitConfig, TokenBucket};

const SHARD_COUNT: usize = 16;

/// GC 주기
pub const GC_INTERVAL: Duration = Duration::from_secs(60);

/// 이 시간 동안 요청이 없던 키는 GC 대상
pub const STALE_AFTER: Duration = Duration::from_secs(180);

type Shard = RwLock<HashMap<String, Mutex<TokenBucket>>>;

pub struct RateLimiter {
    name: &'static str,
    config: RateLimitConfig,
    hasher: RandomState,
    shards: Box<[Shard]>,
}

impl RateLimiter {
    pub fn new(name: &'static str, config: RateLimitConfig) -> Self {
        let shards = (0..SHARD_COUNT)
            .map(|_| RwLock::new(HashMap::new()))
            .collect::<Vec<_>>()
            .into_boxed_slice();

        Self {
            name,
            config,
            hasher: RandomState::new(),
            shards,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn config(&self) -> RateLimitConfig {
        self.config
    }

    /// 요청 허용 여부 (토큰 1개 소비)
    /// Whether `key` may proceed; consumes a token when it may
    pub fn allow(&self, key: &str) -> bool {
        self.allow_at(key, Instant::now())
    }

    pub fn allow_at(&self, key: &str, now: Instant) -> bool {
        let shard = self.shard(key);

        {
            let buckets = shard.read();
            if let Some(bucket) = buckets.get(key) {
                return bucket.lock().try_consume(&self.config, now);
            }
        }

        // 처음 보는 키: 쓰기 락으로 생성 (그 사이 다른 요청이 만들었을 수 있음)
        let mut buckets = shard.write();
        let bucket = buckets
            .entry(key.to_string())
            .or_insert_with(|| Mutex::new(TokenBucket::full(&self.config, now)));
        bucket.get_mut().try_consume(&self.config, now)
    }

    /// 오래된 버킷 제거
    /// Drop buckets idle for longer than `STALE_AFTER`; returns how many
    pub fn purge_stale_at(&self, now: Instant) -> usize {
        let mut removed = 0;
        for shard in self.shards.iter() {
            let mut buckets = shard.write();
            let before = buckets.len();
            buckets.retain(|_, bucket| {
                now.saturating_duration_since(bucket.get_mut().last_seen()) <= STALE_AFTER
            });
            removed += before - buckets.len();
        }
        removed
    }

    pub fn tracked_keys(&self) -> usize {
        self.shards.iter().map(|shard| shard.read().len()).sum()
    }

    /// GC 루프 시작 (취소 토큰으로 종료)
    /// Background loop bounding memory regardless of how many keys ever connected
    pub fn spawn_gc(self: Arc<Self>, cancel: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(GC_INTERVAL);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            // 첫 tick은 즉시 완료되므로 건너뜀
            interval.tick().await;

            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = interval.tick() => {
                        let removed = self.purge_stale_at(Instant::now());
                        if removed > 0 {
                            debug!(limiter = self.name, removed, "rate limiter gc");
                        }
                    }
                }
            }
        })
    }

    fn shard(&self, key: &str) -> &Shard {
        let index = (self.hasher.hash_one(key) as usize) % self.shards.len();
        &self.shards[index]
    }
}
