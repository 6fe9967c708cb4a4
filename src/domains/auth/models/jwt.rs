use serde::{Deserialize, Serialize};
use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

/// Access Token에 담길 사용자 정보
/// Identity an access token is minted for
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessIdentity {
    pub user_id: i64,
    pub username: String,
    pub email: String,
    /// 토큰이 발급된 세션 (활동 시각 갱신용)
    /// Session the token belongs to, used for activity tracking
    pub session_id: Option<Uuid>,
}

/// JWT Claims (토큰에 포함될 데이터)
/// JWT Claims (data to be included in token)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// 사용자 ID
    /// User ID
    pub sub: i64,

    pub username: String,

    /// 이메일
    /// Email
    pub email: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sid: Option<Uuid>,

    /// 발급 시간 (Unix timestamp)
    /// Issued at (Unix timestamp)
    pub iat: i64,

    /// 만료 시간 (Unix timestamp)
    /// Expiration time (Unix timestamp)
    pub exp: i64,
}

impl Claims {
    /// 새 Claims 생성 (만료 시간 = now + ttl)
    /// Create new Claims expiring `ttl` after `now`
    pub fn new(identity: &AccessIdentity, now: DateTime<Utc>, ttl: Duration) -> Self {
        let iat = now.timestamp();

        Self {
            sub: identity.user_id,
            username: identity.username.clone(),
            email: identity.email.clone(),
            sid: identity.session_id,
            iat,
            exp: iat + ttl.num_seconds(),
        }
    }

    pub fn identity(&self) -> AccessIdentity {
        AccessIdentity {
            user_id: self.sub,
            username: self.username.clone(),
            email: self.email.clone(),
            session_id: self.sid,
        }
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        DateTime::from_timestamp(self.exp, 0).unwrap_or(DateTime::<Utc>::MIN_UTC)
    }
}

/// 발급된 Access Token
/// Encoded access token plus its expiry
#[derive(Debug, Clone)]
pub struct IssuedAccessToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}
