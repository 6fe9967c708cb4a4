use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};
use utoipa::ToSchema;
use uuid::Uuid;

/// 기기별 세션
/// Per-device session record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: Uuid,
    pub user_id: i64,
    pub device_info: Option<String>,
    /// IP 주소의 SHA-256 (원본은 저장하지 않음)
    pub ip_hash: String,
    pub user_agent: Option<String>,
    pub active: bool,
    pub last_activity: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub logged_out_at: Option<DateTime<Utc>>,
}

/// 요청 클라이언트 정보 (세션 생성 시 사용)
/// Raw client details; the address is hashed before it reaches the store
#[derive(Debug, Clone)]
pub struct ClientInfo {
    pub ip: String,
    pub user_agent: Option<String>,
}

#[derive(Debug, Clone)]
pub struct SessionCreate {
    pub id: Uuid,
    pub user_id: i64,
    pub device_info: Option<String>,
    pub ip_hash: String,
    pub user_agent: Option<String>,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

// 세션 응답 모델
#[derive(Debug, Serialize, ToSchema)]
#[schema(as = SessionResponse)]
pub struct SessionResponse {
    pub id: Uuid,
    #[schema(example = "Pixel 8")]
    pub device_info: Option<String>,
    pub user_agent: Option<String>,
    pub last_activity: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    /// 현재 요청의 세션 여부
    /// Whether this is the session of the calling token
    pub current: bool,
}

impl SessionResponse {
    pub fn from_session(session: Session, current_session: Option<Uuid>) -> Self {
        Self {
            current: current_session == Some(session.id),
            id: session.id,
            device_info: session.device_info,
            user_agent: session.user_agent,
            last_activity: session.last_activity,
            created_at: session.created_at,
            expires_at: session.expires_at,
        }
    }
}
