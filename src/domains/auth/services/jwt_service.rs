// src/domains/auth/services/jwt_service.rs
use crate::shared::config::TokenConfig;
use crate::shared::errors::{AccessTokenError, AuthError};
use crate::shared::utils::SharedClock;
use crate::domains::auth::models::jwt::{AccessIdentity, Claims, IssuedAccessToken};
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use jsonwebtoken::errors::ErrorKind;
use rand::RngCore;
use rand::rngs::OsRng;
use serde::Deserialize;

/// Access Token 서명 알고리즘
/// The only algorithm access tokens may carry
pub const ACCESS_TOKEN_ALGORITHM: Algorithm = Algorithm::HS256;
const ACCESS_TOKEN_ALGORITHM_NAME: &str = "HS256";

/// Refresh Token secret 길이 (256 bits)
pub const REFRESH_SECRET_BYTES: usize = 32;

// 헤더의 alg를 문자열 그대로 읽기 위한 구조체
// jsonwebtoken::Header는 "none" 같은 값을 파싱 단계에서 거부하므로
// 알고리즘 불일치를 구분하려면 직접 읽어야 함
#[derive(Deserialize)]
struct RawHeader {
    alg: String,
}

/// JWT 서비스
/// Stateless signing and verification of access tokens
#[derive(Clone)]
pub struct JwtService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    access_ttl: Duration,
    clock: SharedClock,
}

impl JwtService {
    /// JWT Service 생성
    /// Create JWT Service; an empty secret is a misconfiguration
    pub fn new(config: &TokenConfig, clock: SharedClock) -> Result<Self, AuthError> {
        if config.secret.is_empty() {
            return Err(AuthError::SigningKey("JWT secret is empty".to_string()));
        }

        Ok(Self {
            encoding_key: EncodingKey::from_secret(config.secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(config.secret.as_bytes()),
            access_ttl: config.access_ttl,
            clock,
        })
    }

    pub fn access_ttl(&self) -> Duration {
        self.access_ttl
    }

    /// Access Token 발급 (짧은 수명)
    /// Generate Access Token (short lifetime)
    pub fn issue_access_token(&self, identity: &AccessIdentity) -> Result<IssuedAccessToken, AuthError> {
        self.issue_access_token_at(identity, self.clock.now())
    }

    pub fn issue_access_token_at(
        &self,
        identity: &AccessIdentity,
        now: DateTime<Utc>,
    ) -> Result<IssuedAccessToken, AuthError> {
        let claims = Claims::new(identity, now, self.access_ttl);
        let header = Header::new(ACCESS_TOKEN_ALGORITHM);

        let token = encode(&header, &claims, &self.encoding_key)
            .map_err(|e| AuthError::SigningKey(format!("Failed to sign access token: {}", e)))?;

        Ok(IssuedAccessToken {
            token,
            expires_at: claims.expires_at(),
        })
    }

    /// Access Token 검증
    /// Verify Access Token
    pub fn validate_access_token(&self, token: &str) -> Result<Claims, AccessTokenError> {
        self.validate_access_token_at(token, self.clock.now())
    }

    /// 검증 순서: 형식 → 알고리즘 → 만료 → 서명
    /// Nothing from the token is trusted before the algorithm check passes,
    /// and nothing is returned before the MAC verifies.
    pub fn validate_access_token_at(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<Claims, AccessTokenError> {
        let mut parts = token.split('.');
        let (Some(header), Some(payload), Some(_signature), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(AccessTokenError::Malformed);
        };

        // 1. 알고리즘 확인 (alg=none 등 치환 공격 차단)
        let header: RawHeader = decode_segment(header)?;
        if header.alg != ACCESS_TOKEN_ALGORITHM_NAME {
            return Err(AccessTokenError::AlgorithmMismatch);
        }

        // 2. 만료 확인 (서명 유효 여부와 무관)
        let unverified: Claims = decode_segment(payload)?;
        if unverified.exp <= now.timestamp() {
            return Err(AccessTokenError::Expired);
        }

        // 3. 서명 확인
        let mut validation = Validation::new(ACCESS_TOKEN_ALGORITHM);
        validation.validate_exp = false;
        validation.leeway = 0;

        decode::<Claims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::InvalidSignature => AccessTokenError::SignatureInvalid,
                ErrorKind::InvalidAlgorithm => AccessTokenError::AlgorithmMismatch,
                _ => AccessTokenError::Malformed,
            })
    }

    /// Refresh Token용 불투명 secret 생성 (CSPRNG, URL-safe base64)
    /// Opaque secret from the OS CSPRNG. An unavailable entropy source is an
    /// error for the caller, never a fallback to a weaker generator.
    pub fn generate_opaque_secret(byte_length: usize) -> Result<String, AuthError> {
        let mut bytes = vec![0u8; byte_length];
        OsRng
            .try_fill_bytes(&mut bytes)
            .map_err(|e| AuthError::EntropyUnavailable(e.to_string()))?;

        Ok(URL_SAFE_NO_PAD.encode(bytes))
    }
}

fn decode_segment<T: for<'de> Deserialize<'de>>(segment: &str) -> Result<T, AccessTokenError> {
    let bytes = URL_SAFE_NO_PAD
        .decode(segment)
        .map_err(|_| AccessTokenError::Malformed)?;
    serde_json::from_slice(&bytes).map_err(|_| AccessTokenError::Malformed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use crate::shared::utils::{Clock, ManualClock};

    fn service(secret: &str) -> (JwtService, ManualClock) {
        let clock = ManualClock::new(Utc::now());
        let config = TokenConfig {
            secret: secret.to_string(),
            access_ttl: Duration::minutes(15),
            refresh_ttl: Duration::days(90),
        };
        let service = JwtService::new(&config, Arc::new(clock.clone())).unwrap();
        (service, clock)
    }

    fn identity() -> AccessIdentity {
        AccessIdentity {
            user_id: 42,
            username: "alice".to_string(),
            email: "alice@example.com".to_string(),
            session_id: Some(uuid::Uuid::from_u128(7)),
        }
    }

    #[test]
    fn issued_token_validates_before_expiry() {
        let (jwt, clock) = service("test-secret");
        let issued = jwt.issue_access_token(&identity()).unwrap();

        let issued_at = DateTime::from_timestamp(clock.now().timestamp(), 0).unwrap();
        assert_eq!(issued.expires_at, issued_at + Duration::minutes(15));

        clock.advance(Duration::minutes(14));
        let claims = jwt.validate_access_token(&issued.token).unwrap();
        assert_eq!(claims.identity(), identity());
    }

    #[test]
    fn expired_token_is_rejected_even_with_valid_signature() {
        let (jwt, clock) = service("test-secret");
        let issued = jwt.issue_access_token(&identity()).unwrap();

        clock.advance(Duration::minutes(15));
        assert_eq!(
            jwt.validate_access_token(&issued.token).unwrap_err(),
            AccessTokenError::Expired
        );
    }

    #[test]
    fn expired_token_with_bad_signature_is_still_expired() {
        let (jwt, clock) = service("test-secret");
        let (other, _) = service("other-secret");
        let issued = other.issue_access_token_at(&identity(), clock.now()).unwrap();

        clock.advance(Duration::hours(1));
        assert_eq!(
            jwt.validate_access_token(&issued.token).unwrap_err(),
            AccessTokenError::Expired
        );
    }

    #[test]
    fn alg_none_is_an_algorithm_mismatch() {
        let (jwt, _) = service("test-secret");
        let issued = jwt.issue_access_token(&identity()).unwrap();
        let payload = issued.token.split('.').nth(1).unwrap();
        let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"none","typ":"JWT"}"#);

        for forged in [format!("{header}.{payload}."), format!("{header}.{payload}.AAAA")] {
            assert_eq!(
                jwt.validate_access_token(&forged).unwrap_err(),
                AccessTokenError::AlgorithmMismatch
            );
        }
    }

    #[test]
    fn other_mac_algorithm_is_an_algorithm_mismatch() {
        let (jwt, clock) = service("test-secret");
        let claims = Claims::new(&identity(), clock.now(), Duration::minutes(15));
        let token = encode(
            &Header::new(Algorithm::HS512),
            &claims,
            &EncodingKey::from_secret(b"test-secret"),
        )
        .unwrap();

        assert_eq!(
            jwt.validate_access_token(&token).unwrap_err(),
            AccessTokenError::AlgorithmMismatch
        );
    }

    #[test]
    fn wrong_key_is_a_signature_failure() {
        let (jwt, clock) = service("test-secret");
        let (other, _) = service("other-secret");
        let issued = other.issue_access_token_at(&identity(), clock.now()).unwrap();

        assert_eq!(
            jwt.validate_access_token(&issued.token).unwrap_err(),
            AccessTokenError::SignatureInvalid
        );
    }

    #[test]
    fn tampered_claims_fail_the_signature_check() {
        let (jwt, clock) = service("test-secret");
        let issued = jwt.issue_access_token(&identity()).unwrap();
        let mut forged = Claims::new(&identity(), clock.now(), Duration::minutes(15));
        forged.sub = 1;
        let forged_payload = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&forged).unwrap());
        let parts: Vec<&str> = issued.token.split('.').collect();
        let token = format!("{}.{}.{}", parts[0], forged_payload, parts[2]);

        assert_eq!(
            jwt.validate_access_token(&token).unwrap_err(),
            AccessTokenError::SignatureInvalid
        );
    }

    #[test]
    fn garbage_is_malformed() {
        let (jwt, _) = service("test-secret");
        for token in ["", "abc", "a.b", "a.b.c.d", "!!!.???.***"] {
            assert_eq!(
                jwt.validate_access_token(token).unwrap_err(),
                AccessTokenError::Malformed,
                "token {token:?}"
            );
        }
    }

    #[test]
    fn empty_secret_is_a_misconfiguration() {
        let config = TokenConfig {
            secret: String::new(),
            access_ttl: Duration::minutes(15),
            refresh_ttl: Duration::days(90),
        };
        assert!(matches!(
            JwtService::new(&config, Arc::new(ManualClock::new(Utc::now()))),
            Err(AuthError::SigningKey(_))
        ));
    }

    #[test]
    fn opaque_secret_is_url_safe_and_unique() {
        let a = JwtService::generate_opaque_secret(REFRESH_SECRET_BYTES).unwrap();
        let b = JwtService::generate_opaque_secret(REFRESH_SECRET_BYTES).unwrap();

        assert_eq!(a.len(), 43);
        assert_ne!(a, b);
        assert!(a.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
    }
}
