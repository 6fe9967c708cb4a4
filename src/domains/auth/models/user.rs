use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};
use utoipa::ToSchema;

/// 사용자 모델 (DB)
/// User row as the auth core sees it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub email: String,
    pub username: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
    /// 소프트 삭제 시각
    /// Soft-delete marker; such users cannot log in or refresh
    pub deleted_at: Option<DateTime<Utc>>,
}

impl User {
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}

// 사용자 응답 모델 (비밀번호 제외)
#[derive(Debug, Serialize, ToSchema)]
#[schema(as = UserResponse)]
pub struct UserResponse {
    #[schema(example = 1)]
    pub id: i64,

    #[schema(example = "user@example.com")]
    pub email: String,

    #[schema(example = "johndoe")]
    pub username: String,

    pub created_at: DateTime<Utc>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            username: user.username,
            created_at: user.created_at,
        }
    }
}
