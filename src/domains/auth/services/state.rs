// Auth domain state
// 인증 도메인 상태
use crate::domains::auth::services::{ActivityTracker, AuthService, JwtService};

/// Auth domain state
/// 인증 도메인에서 필요한 서비스들을 포함하는 상태
#[derive(Clone)]
pub struct AuthState {
    pub auth_service: AuthService,
    pub jwt_service: JwtService,
    /// 세션 활동 시각 갱신 큐
    pub activity: ActivityTracker,
}

impl AuthState {
    pub fn new(auth_service: AuthService, jwt_service: JwtService, activity: ActivityTracker) -> Self {
        Self {
            auth_service,
            jwt_service,
            activity,
        }
    }
}
