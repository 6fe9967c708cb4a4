// Routes module: 라우팅 설정
// 역할: 모든 도메인의 라우터를 조합
// Routes module: combines all domain routers

pub mod openapi;

use axum::{middleware::from_fn_with_state, routing::get, Json, Router};
use serde_json::{json, Value};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;
use openapi::ApiDoc;
use crate::domains::auth::routes::create_auth_router;
use crate::shared::middleware::rate_limit::general_rate_limit;
use crate::shared::services::AppState;

/// Create main router (combines all domain routers)
/// 메인 라우터 생성 (모든 라우트에 일반 제한기 적용)
pub fn create_router(state: &AppState) -> Router<AppState> {
    Router::new()
        .nest("/api/auth", create_auth_router(state))
        .route("/health", get(health))
        .layer(from_fn_with_state(state.clone(), general_rate_limit))
}

/// 전체 애플리케이션 (Swagger UI + 요청 트레이싱 포함, state 주입 완료)
pub fn create_app(state: AppState) -> Router {
    Router::new()
        .merge(create_router(&state))
        .merge(SwaggerUi::new("/api").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service is up")
    ),
    tag = "Health"
)]
pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
