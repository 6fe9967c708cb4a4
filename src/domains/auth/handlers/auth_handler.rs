use std::net::SocketAddr;
use axum::{
    extract::{ConnectInfo, State},
    http::{header::USER_AGENT, HeaderMap, StatusCode},
    Json,
};
use crate::domains::auth::models::{
    ClientInfo, LoginRequest, LoginResponse, LogoutAllResponse, LogoutRequest,
    RefreshTokenRequest, RefreshTokenResponse, UserResponse,
};
use crate::shared::errors::AuthError;
use crate::shared::middleware::auth::AuthenticatedUser;
use crate::shared::middleware::rate_limit::client_address;
use crate::shared::services::AppState;

type ApiError = (StatusCode, Json<serde_json::Value>);

// 로그인 핸들러
#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = LoginResponse),
        (status = 401, description = "Invalid email or password"),
        (status = 429, description = "Too many requests"),
        (status = 500, description = "Internal server error")
    ),
    tag = "Auth"
)]
pub async fn login(
    State(app_state): State<AppState>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
    Json(request): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    let client = ClientInfo {
        ip: client_address(
            &headers,
            connect_info.map(|ConnectInfo(addr)| addr),
            app_state.trust_forwarded_for,
        ),
        user_agent: headers
            .get(USER_AGENT)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string),
    };

    // Service 호출 (세션 + 토큰 쌍 생성)
    let outcome = app_state
        .auth_state
        .auth_service
        .login(&request.email, &request.password, request.device_info, &client)
        .await
        .map_err(|e: AuthError| -> ApiError { e.into() })?;

    Ok(Json(LoginResponse {
        user: outcome.user.into(),
        access_token: outcome.access_token.token,
        access_token_expires_at: outcome.access_token.expires_at,
        refresh_token: outcome.refresh_token.secret,
        refresh_token_expires_at: outcome.refresh_token.record.expires_at,
        session_id: outcome.session.id,
        message: "Login successful".to_string(),
    }))
}

/// 토큰 갱신 핸들러
/// Refresh token handler
#[utoipa::path(
    post,
    path = "/api/auth/refresh",
    request_body = RefreshTokenRequest,
    responses(
        (status = 200, description = "Token refreshed successfully", body = RefreshTokenResponse),
        (status = 401, description = "Unknown, revoked or expired refresh token"),
        (status = 429, description = "Too many requests"),
        (status = 500, description = "Internal server error")
    ),
    tag = "Auth"
)]
pub async fn refresh(
    State(app_state): State<AppState>,
    Json(request): Json<RefreshTokenRequest>,
) -> Result<Json<RefreshTokenResponse>, ApiError> {
    let access_token = app_state
        .auth_state
        .auth_service
        .refresh(&request.refresh_token)
        .await
        .map_err(|e: AuthError| -> ApiError { e.into() })?;

    Ok(Json(RefreshTokenResponse {
        access_token: access_token.token,
        access_token_expires_at: access_token.expires_at,
        message: "Token refreshed successfully".to_string(),
    }))
}

/// 로그아웃 핸들러
/// Logout handler
#[utoipa::path(
    post,
    path = "/api/auth/logout",
    request_body = LogoutRequest,
    responses(
        (status = 200, description = "Logout successful"),
        (status = 500, description = "Internal server error")
    ),
    tag = "Auth"
)]
pub async fn logout(
    State(app_state): State<AppState>,
    Json(request): Json<LogoutRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    app_state
        .auth_state
        .auth_service
        .logout(&request.refresh_token)
        .await
        .map_err(|e: AuthError| -> ApiError { e.into() })?;

    Ok(Json(serde_json::json!({
        "message": "Logout successful"
    })))
}

/// 모든 기기에서 로그아웃
#[utoipa::path(
    post,
    path = "/api/auth/logout-all",
    responses(
        (status = 200, description = "Every session closed", body = LogoutAllResponse),
        (status = 401, description = "Unauthorized"),
        (status = 500, description = "Internal server error")
    ),
    security(
        ("BearerAuth" = [])
    ),
    tag = "Auth"
)]
pub async fn logout_all(
    State(app_state): State<AppState>,
    authenticated_user: AuthenticatedUser,
) -> Result<Json<LogoutAllResponse>, ApiError> {
    let result = app_state
        .auth_state
        .auth_service
        .logout_everywhere(authenticated_user.user_id)
        .await
        .map_err(|e: AuthError| -> ApiError { e.into() })?;

    Ok(Json(LogoutAllResponse {
        revoked_tokens: result.revoked_tokens,
        closed_sessions: result.closed_sessions,
        message: "Logged out from all devices".to_string(),
    }))
}

#[utoipa::path(
    get,
    path = "/api/auth/me",
    responses(
        (status = 200, description = "User info retrieved successfully", body = UserResponse),
        (status = 401, description = "Unauthorized"),
        (status = 500, description = "Internal server error")
    ),
    security(
        ("BearerAuth" = [])
    ),
    tag = "Auth"
)]
pub async fn get_me(
    State(app_state): State<AppState>,
    authenticated_user: AuthenticatedUser,
) -> Result<Json<UserResponse>, ApiError> {
    let user = app_state
        .auth_state
        .auth_service
        .get_user_info(authenticated_user.user_id)
        .await
        .map_err(|e: AuthError| -> ApiError { e.into() })?;

    Ok(Json(user.into()))
}
