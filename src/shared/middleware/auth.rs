use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts, StatusCode},
    Json,
};
use tracing::debug;
use uuid::Uuid;
use crate::shared::errors::{AccessTokenError, AuthError};
use crate::shared::services::AppState;

/// 인증된 사용자 정보 (JWT 토큰에서 추출)
/// Authenticated user information (extracted from JWT token)
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub user_id: i64,
    pub username: String,
    pub email: String,
    /// 토큰이 발급된 세션
    pub session_id: Option<Uuid>,
}

/// AuthenticatedUser를 Axum Extractor로 구현
///
/// 사용법:
/// ```rust,ignore
/// pub async fn list_sessions(
///     State(app_state): State<AppState>,
///     authenticated_user: AuthenticatedUser,  // <- 이렇게 사용!
/// ) -> Result<...> {
///     let user_id = authenticated_user.user_id;
///     // ...
/// }
/// ```
///
/// 검증에 성공하면 세션 활동 시각 갱신을 큐에 넣습니다 (응답을 기다리게 하지 않음).
#[async_trait]
impl FromRequestParts<AppState> for AuthenticatedUser {
    type Rejection = (StatusCode, Json<serde_json::Value>);

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        // 1. Authorization 헤더에서 토큰 추출
        let auth_header = parts
            .headers
            .get(AUTHORIZATION)
            .ok_or(AuthError::MissingToken)?
            .to_str()
            .map_err(|_| AuthError::from(AccessTokenError::Malformed))?;

        // 2. "Bearer <token>" 형식 파싱
        let token = auth_header
            .strip_prefix("Bearer ")
            .ok_or(AuthError::from(AccessTokenError::Malformed))?;

        // 3. 토큰 검증 (알고리즘 → 만료 → 서명)
        let claims = state
            .auth_state
            .jwt_service
            .validate_access_token(token.trim())
            .map_err(|e| {
                debug!(reason = ?e, "access token rejected");
                AuthError::from(e)
            })?;

        // 4. 세션 활동 기록 (비동기)
        if let Some(session_id) = claims.sid {
            state.auth_state.activity.record(session_id);
        }

        let identity = claims.identity();
        Ok(AuthenticatedUser {
            user_id: identity.user_id,
            username: identity.username,
            email: identity.email,
            session_id: identity.session_id,
        })
    }
}
