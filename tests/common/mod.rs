// =====================================================
// 통합 테스트 공통 헬퍼
// =====================================================
// 목적: 인메모리 저장소 + 수동 시계 위에 전체 AppState를 구성
//
// 사용법:
// ```rust
// mod common;
// use common::*;
//
// #[tokio::test]
// async fn test_something() {
//     let app = TestApp::new().await;
//     let user = app.seed_user("alice");
//     // 테스트 코드...
//     app.shutdown().await;
// }
// ```
// =====================================================
#![allow(dead_code)]

use std::sync::Arc;
use axum::body::{to_bytes, Body};
use axum::http::{header, Request, Response};
use axum::Router;
use chrono::{DateTime, TimeZone, Utc};
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use snippet_auth::domains::auth::models::{ClientInfo, User};
use snippet_auth::routes::create_app;
use snippet_auth::shared::config::AppConfig;
use snippet_auth::shared::database::{MemoryStore, Stores};
use snippet_auth::shared::services::{AppState, BackgroundTasks};
use snippet_auth::shared::utils::{hash_password, Clock, ManualClock, SharedClock};

// 테스트용 상수
pub const TEST_JWT_SECRET: &str = "integration-test-secret";
pub const TEST_PASSWORD: &str = "correct horse battery staple";

pub fn start_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 1, 15, 12, 0, 0).unwrap()
}

pub fn client() -> ClientInfo {
    ClientInfo {
        ip: "198.51.100.23".to_string(),
        user_agent: Some("integration-test".to_string()),
    }
}

/// 기본값 + 덮어쓸 환경 변수로 설정 생성
pub fn test_config(overrides: &[(&str, &str)]) -> AppConfig {
    let overrides: Vec<(String, String)> = overrides
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

    AppConfig::from_lookup(move |key: &str| {
        if let Some((_, v)) = overrides.iter().find(|(k, _)| k == key) {
            return Some(v.clone());
        }
        match key {
            "STORE" => Some("memory".to_string()),
            "JWT_SECRET" => Some(TEST_JWT_SECRET.to_string()),
            _ => None,
        }
    })
    .expect("test config must parse")
}

pub struct TestApp {
    pub state: AppState,
    pub store: MemoryStore,
    pub clock: ManualClock,
    pub config: AppConfig,
    cancel: CancellationToken,
    tasks: BackgroundTasks,
}

impl TestApp {
    pub async fn new() -> Self {
        Self::with_config(test_config(&[])).await
    }

    /// 주기 작업(GC, 보존 스케줄러)은 시작하지 않음, 활동 워커만 실행
    pub async fn with_config(config: AppConfig) -> Self {
        let store = MemoryStore::new();
        let clock = ManualClock::new(start_time());
        let shared: SharedClock = Arc::new(clock.clone());
        let cancel = CancellationToken::new();

        let (state, tasks) = AppState::new(&config, Stores::memory(store.clone()), shared, &cancel)
            .expect("Failed to build AppState");

        Self {
            state,
            store,
            clock,
            config,
            cancel,
            tasks,
        }
    }

    pub fn router(&self) -> Router {
        create_app(self.state.clone())
    }

    pub fn seed_user(&self, name: &str) -> User {
        let hash = hash_password(TEST_PASSWORD).expect("hash password");
        self.store
            .insert_user(&format!("{}@example.com", name), name, &hash, self.clock.now())
            .expect("seed user")
    }

    pub async fn shutdown(self) {
        self.cancel.cancel();
        self.tasks.join().await;
    }
}

pub fn json_request(method: &str, uri: &str, body: Value, bearer: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .header("x-forwarded-for", "198.51.100.23");
    if let Some(token) = bearer {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

pub fn empty_request(method: &str, uri: &str, bearer: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("x-forwarded-for", "198.51.100.23");
    if let Some(token) = bearer {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    builder.body(Body::empty()).unwrap()
}

pub async fn body_json(response: Response<Body>) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    if bytes.is_empty() {
        return Value::Null;
    }
    serde_json::from_slice(&bytes).unwrap()
}
