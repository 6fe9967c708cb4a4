use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;
use crate::domains::auth::models::{SessionResponse, SessionsResponse};
use crate::shared::errors::AuthError;
use crate::shared::middleware::auth::AuthenticatedUser;
use crate::shared::services::AppState;

/// 내 활성 세션 목록
/// Active sessions of the caller, most recently used first
#[utoipa::path(
    get,
    path = "/api/auth/sessions",
    responses(
        (status = 200, description = "Active sessions", body = SessionsResponse),
        (status = 401, description = "Unauthorized"),
        (status = 500, description = "Internal server error")
    ),
    security(
        ("BearerAuth" = [])
    ),
    tag = "Sessions"
)]
pub async fn list_sessions(
    State(app_state): State<AppState>,
    authenticated_user: AuthenticatedUser,
) -> Result<Json<SessionsResponse>, (StatusCode, Json<serde_json::Value>)> {
    let sessions = app_state
        .auth_state
        .auth_service
        .list_sessions(authenticated_user.user_id)
        .await
        .map_err(|e: AuthError| -> (StatusCode, Json<serde_json::Value>) { e.into() })?;

    Ok(Json(SessionsResponse {
        sessions: sessions
            .into_iter()
            .map(|s| SessionResponse::from_session(s, authenticated_user.session_id))
            .collect(),
    }))
}

/// 세션 종료 (해당 세션의 Refresh Token도 폐기)
#[utoipa::path(
    delete,
    path = "/api/auth/sessions/{id}",
    params(
        ("id" = Uuid, Path, description = "Session ID")
    ),
    responses(
        (status = 204, description = "Session closed"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Session belongs to another user"),
        (status = 404, description = "Session not found"),
        (status = 500, description = "Internal server error")
    ),
    security(
        ("BearerAuth" = [])
    ),
    tag = "Sessions"
)]
pub async fn close_session(
    State(app_state): State<AppState>,
    authenticated_user: AuthenticatedUser,
    Path(session_id): Path<Uuid>,
) -> Result<StatusCode, (StatusCode, Json<serde_json::Value>)> {
    app_state
        .auth_state
        .auth_service
        .close_session(authenticated_user.user_id, session_id)
        .await
        .map_err(|e: AuthError| -> (StatusCode, Json<serde_json::Value>) { e.into() })?;

    Ok(StatusCode::NO_CONTENT)
}
