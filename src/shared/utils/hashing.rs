// 단방향 해시 유틸리티
// One-way digests for values that must never be stored in clear text
use sha2::{Digest, Sha256};

/// SHA-256 hex 다이제스트
/// Lower-case hex SHA-256 of the input
pub fn sha256_hex(input: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// IP 주소 해싱 (세션 저장 / Rate limit 키)
/// Pseudonymize a client address.
///
/// Unsalted, so the IPv4 space can be enumerated back; good enough to keep the
/// raw address out of the database and logs.
pub fn hash_ip(raw_ip: &str) -> String {
    sha256_hex(raw_ip.trim())
}

/// Refresh Token 해싱 (DB 저장용)
/// Hash a refresh token secret for storage and lookup
pub fn hash_refresh_token(secret: &str) -> String {
    sha256_hex(secret)
}
