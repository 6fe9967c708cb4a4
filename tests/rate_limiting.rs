// =====================================================
// 속도 제한기 동시성 테스트
// =====================================================

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use snippet_auth::domains::rate_limit::{RateLimitConfig, RateLimiter};
use snippet_auth::shared::utils::hash_ip;

#[test]
fn concurrent_callers_never_exceed_the_burst() {
    let limiter = Arc::new(RateLimiter::new("general", RateLimitConfig::per_minute(1.0, 50)));
    let allowed = Arc::new(AtomicUsize::new(0));
    let key = hash_ip("203.0.113.50");
    let now = Instant::now();

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let limiter = limiter.clone();
            let allowed = allowed.clone();
            let key = key.clone();
            std::thread::spawn(move || {
                for _ in 0..100 {
                    if limiter.allow_at(&key, now) {
                        allowed.fetch_add(1, Ordering::Relaxed);
                    }
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(allowed.load(Ordering::Relaxed), 50);
}

#[test]
fn denied_key_does_not_affect_others() {
    let limiter = RateLimiter::new("strict", RateLimitConfig::per_minute(1.0, 1));
    let now = Instant::now();

    assert!(limiter.allow_at("k1", now));
    assert!(!limiter.allow_at("k1", now));
    assert!(limiter.allow_at("k2", now));
    assert!(!limiter.allow_at("k1", now + Duration::from_secs(30)));
    assert!(limiter.allow_at("k1", now + Duration::from_secs(61)));
}

#[test]
fn gc_bounds_memory() {
    let limiter = RateLimiter::new("general", RateLimitConfig::per_second(10.0, 30));
    let now = Instant::now();

    for i in 0..1000 {
        limiter.allow_at(&hash_ip(&format!("10.0.{}.{}", i / 256, i % 256)), now);
    }
    assert_eq!(limiter.tracked_keys(), 1000);

    assert_eq!(limiter.purge_stale_at(now + Duration::from_secs(181)), 1000);
    assert_eq!(limiter.tracked_keys(), 0);
}
