// Auth domain routes
// 인증 도메인 라우터
use axum::{
    middleware::from_fn_with_state,
    routing::{delete, get, post},
    Router,
};
use crate::domains::auth::handlers::{auth_handler, session_handler};
use crate::shared::middleware::rate_limit::strict_rate_limit;
use crate::shared::services::AppState;

/// Create authentication router
/// 인증 라우터 생성 (로그인/토큰 갱신은 엄격한 제한기 적용)
pub fn create_auth_router(state: &AppState) -> Router<AppState> {
    let strict = from_fn_with_state(state.clone(), strict_rate_limit);

    Router::new()
        .route("/login", post(auth_handler::login).route_layer(strict.clone()))
        .route("/refresh", post(auth_handler::refresh).route_layer(strict))
        .route("/logout", post(auth_handler::logout))
        .route("/logout-all", post(auth_handler::logout_all))
        .route("/me", get(auth_handler::get_me))
        .route("/sessions", get(session_handler::list_sessions))
        .route("/sessions/:id", delete(session_handler::close_session))
}
