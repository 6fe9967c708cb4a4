// 요청 속도 제한 미들웨어
// general: 모든 라우트, strict: 로그인/토큰 갱신
use std::net::SocketAddr;
use axum::{
    extract::{ConnectInfo, Request, State},
    http::{header::RETRY_AFTER, HeaderMap, HeaderValue},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tracing::warn;
use crate::domains::rate_limit::RateLimiter;
use crate::shared::errors::AuthError;
use crate::shared::services::AppState;
use crate::shared::utils::hash_ip;

const FORWARDED_FOR: &str = "x-forwarded-for";

pub async fn general_rate_limit(State(state): State<AppState>, request: Request, next: Next) -> Response {
    enforce(&state.general_limiter, state.trust_forwarded_for, request, next).await
}

pub async fn strict_rate_limit(State(state): State<AppState>, request: Request, next: Next) -> Response {
    enforce(&state.strict_limiter, state.trust_forwarded_for, request, next).await
}

async fn enforce(limiter: &RateLimiter, trust_forwarded_for: bool, request: Request, next: Next) -> Response {
    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    // 원본 IP는 키로도 남기지 않음
    let key = hash_ip(&client_address(request.headers(), peer, trust_forwarded_for));

    if limiter.allow(&key) {
        return next.run(request).await;
    }

    warn!(limiter = limiter.name(), path = %request.uri().path(), "rate limit exceeded");
    let mut response = AuthError::RateLimited.into_response();
    response
        .headers_mut()
        .insert(RETRY_AFTER, HeaderValue::from_static("1"));
    response
}

/// 클라이언트 주소
///
/// 프록시 뒤에서만(`trust_forwarded_for`) X-Forwarded-For의 첫 번째 값을 사용하고,
/// 그 외에는 소켓 주소만 사용합니다. 헤더는 클라이언트가 마음대로 바꿀 수 있습니다.
pub fn client_address(headers: &HeaderMap, peer: Option<SocketAddr>, trust_forwarded_for: bool) -> String {
    let forwarded = if trust_forwarded_for { headers.get(FORWARDED_FOR) } else { None };

    forwarded
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .or_else(|| peer.map(|addr| addr.ip().to_string()))
        .unwrap_or_else(|| "unknown".to_string())
}
