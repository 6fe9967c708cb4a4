//! 애플리케이션 설정
//! Process configuration, read once at start-up and injected into
//! constructors. Parsing works over any key lookup so tests never touch the
//! real environment.

use std::fmt;
use std::net::SocketAddr;
use std::ops::RangeInclusive;
use std::str::FromStr;
use std::time::Duration as StdDuration;
use anyhow::{anyhow, bail, Context, Result};
use chrono::Duration;
use crate::domains::rate_limit::RateLimitConfig;
use crate::domains::retention::models::RetentionPolicy;

// 허용 범위 (범위 밖의 값은 설정 오류)
const ACCESS_TTL_MINUTES: RangeInclusive<i64> = 1..=24 * 60;
const REFRESH_TTL_DAYS: RangeInclusive<i64> = 1..=3650;
const RETENTION_DAYS: RangeInclusive<u32> = 1..=36500;
const RETENTION_INTERVAL_HOURS: RangeInclusive<u64> = 1..=24 * 365;

/// 토큰 설정 (서명 키 + 수명)
#[derive(Clone)]
pub struct TokenConfig {
    pub secret: String,
    pub access_ttl: Duration,
    pub refresh_ttl: Duration,
}

// 서명 키는 로그에 남기지 않음
impl fmt::Debug for TokenConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenConfig")
            .field("secret", &"<redacted>")
            .field("access_ttl", &self.access_ttl)
            .field("refresh_ttl", &self.refresh_ttl)
            .finish()
    }
}

#[derive(Clone, PartialEq, Eq)]
pub enum StoreBackend {
    Postgres { url: String, max_connections: u32 },
    Memory,
}

impl fmt::Debug for StoreBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreBackend::Postgres { max_connections, .. } => f
                .debug_struct("Postgres")
                .field("max_connections", max_connections)
                .finish_non_exhaustive(),
            StoreBackend::Memory => f.write_str("Memory"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    pub cors_origin: Option<String>,
    pub store: StoreBackend,
    pub token: TokenConfig,
    pub general_rate_limit: RateLimitConfig,
    pub strict_rate_limit: RateLimitConfig,
    pub retention: RetentionPolicy,
    pub retention_interval: StdDuration,
    pub log_format: LogFormat,
    /// X-Forwarded-For를 클라이언트 주소로 신뢰할지 여부 (프록시 뒤에서만 true)
    pub trust_forwarded_for: bool,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let store = match get("STORE").as_deref() {
            Some("memory") => StoreBackend::Memory,
            None | Some("postgres") => StoreBackend::Postgres {
                url: get("DATABASE_URL").ok_or_else(|| anyhow!("DATABASE_URL is required"))?,
                max_connections: parse_or(&get, "DB_MAX_CONNECTIONS", 25)?,
            },
            Some(other) => bail!("STORE must be 'postgres' or 'memory', got '{}'", other),
        };

        let secret = get("JWT_SECRET").ok_or_else(|| anyhow!("JWT_SECRET is required"))?;
        let token = TokenConfig {
            secret,
            access_ttl: Duration::minutes(parse_in(&get, "ACCESS_TOKEN_TTL_MINUTES", 15, ACCESS_TTL_MINUTES)?),
            refresh_ttl: Duration::days(parse_in(&get, "REFRESH_TOKEN_TTL_DAYS", 90, REFRESH_TTL_DAYS)?),
        };

        let general_rate_limit = RateLimitConfig::per_second(
            parse_or(&get, "RATE_LIMIT_GENERAL_PER_SEC", 10.0)?,
            parse_or(&get, "RATE_LIMIT_GENERAL_BURST", 30)?,
        );
        let strict_rate_limit = RateLimitConfig::per_minute(
            parse_or(&get, "RATE_LIMIT_STRICT_PER_MIN", 5.0)?,
            parse_or(&get, "RATE_LIMIT_STRICT_BURST", 5)?,
        );
        for (name, limit) in [("general", &general_rate_limit), ("strict", &strict_rate_limit)] {
            if limit.rate_per_sec <= 0.0 || limit.burst == 0 {
                bail!("{} rate limit needs a positive rate and burst", name);
            }
        }

        let retention = RetentionPolicy::new(
            parse_in(&get, "RETENTION_SNIPPET_VERSION_DAYS", 60, RETENTION_DAYS)?,
            parse_in(&get, "RETENTION_SOFT_DELETED_SNIPPET_DAYS", 30, RETENTION_DAYS)?,
            parse_in(&get, "RETENTION_SOFT_DELETED_USER_DAYS", 30, RETENTION_DAYS)?,
            parse_in(&get, "RETENTION_IDLE_SESSION_DAYS", 7, RETENTION_DAYS)?,
        );
        let interval_hours = parse_in(&get, "RETENTION_INTERVAL_HOURS", 24, RETENTION_INTERVAL_HOURS)?;

        let log_format = match get("LOG_FORMAT").as_deref() {
            Some("json") => LogFormat::Json,
            None | Some("text") => LogFormat::Text,
            Some(other) => bail!("LOG_FORMAT must be 'text' or 'json', got '{}'", other),
        };

        Ok(Self {
            bind_addr: parse_or(&get, "BIND_ADDR", SocketAddr::from(([0, 0, 0, 0], 3002)))?,
            cors_origin: get("CORS_ORIGIN"),
            store,
            token,
            general_rate_limit,
            strict_rate_limit,
            retention,
            retention_interval: StdDuration::from_secs(interval_hours * 3600),
            log_format,
            trust_forwarded_for: parse_or(&get, "TRUST_FORWARDED_FOR", false)?,
        })
    }
}

fn parse_or<T>(get: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match get(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("Invalid value for {}: '{}'", key, raw)),
        None => Ok(default),
    }
}

fn parse_in<T>(
    get: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
    range: RangeInclusive<T>,
) -> Result<T>
where
    T: FromStr + PartialOrd + fmt::Display,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let value = parse_or(get, key, default)?;
    if !range.contains(&value) {
        bail!("{} must be between {} and {}, got {}", key, range.start(), range.end(), value);
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn defaults_apply() {
        let config = AppConfig::from_lookup(lookup(&[
            ("DATABASE_URL", "postgres://localhost/snippets"),
            ("JWT_SECRET", "s3cret"),
        ]))
        .unwrap();

        assert_eq!(config.token.access_ttl, Duration::minutes(15));
        assert_eq!(config.token.refresh_ttl, Duration::days(90));
        assert_eq!(
            config.store,
            StoreBackend::Postgres {
                url: "postgres://localhost/snippets".to_string(),
                max_connections: 25
            }
        );
        assert_eq!(config.retention, RetentionPolicy::default());
        assert_eq!(config.retention_interval, StdDuration::from_secs(24 * 3600));
        assert_eq!(config.strict_rate_limit.burst, 5);
        assert_eq!(config.log_format, LogFormat::Text);
        assert!(!config.trust_forwarded_for);
    }

    #[test]
    fn secret_is_required_and_redacted() {
        assert!(AppConfig::from_lookup(lookup(&[("STORE", "memory")])).is_err());

        let config = AppConfig::from_lookup(lookup(&[("STORE", "memory"), ("JWT_SECRET", "hunter2")])).unwrap();
        assert!(!format!("{:?}", config).contains("hunter2"));
    }

    #[test]
    fn invalid_numbers_are_errors() {
        for (key, value) in [
            ("REFRESH_TOKEN_TTL_DAYS", "ninety"),
            ("RATE_LIMIT_STRICT_BURST", "0"),
            ("ACCESS_TOKEN_TTL_MINUTES", "0"),
            ("ACCESS_TOKEN_TTL_MINUTES", "-15"),
            ("ACCESS_TOKEN_TTL_MINUTES", "9223372036854775807"),
            ("REFRESH_TOKEN_TTL_DAYS", "-5"),
            ("REFRESH_TOKEN_TTL_DAYS", "0"),
            ("RETENTION_SNIPPET_VERSION_DAYS", "4000000000"),
            ("RETENTION_IDLE_SESSION_DAYS", "0"),
            ("RETENTION_INTERVAL_HOURS", "0"),
            ("RETENTION_INTERVAL_HOURS", "18446744073709551615"),
            ("TRUST_FORWARDED_FOR", "maybe"),
        ] {
            let result = AppConfig::from_lookup(lookup(&[
                ("STORE", "memory"),
                ("JWT_SECRET", "s"),
                (key, value),
            ]));
            assert!(result.is_err(), "{}={} should be rejected", key, value);
        }
    }

    #[test]
    fn bounds_are_inclusive() {
        let config = AppConfig::from_lookup(lookup(&[
            ("STORE", "memory"),
            ("JWT_SECRET", "s"),
            ("ACCESS_TOKEN_TTL_MINUTES", "1"),
            ("REFRESH_TOKEN_TTL_DAYS", "3650"),
            ("RETENTION_SNIPPET_VERSION_DAYS", "36500"),
            ("RETENTION_INTERVAL_HOURS", "8760"),
            ("TRUST_FORWARDED_FOR", "true"),
        ]))
        .unwrap();

        assert_eq!(config.token.access_ttl, Duration::minutes(1));
        assert_eq!(config.token.refresh_ttl, Duration::days(3650));
        assert_eq!(config.retention.snippet_version_age(), Duration::days(36500));
        assert_eq!(config.retention_interval, StdDuration::from_secs(8760 * 3600));
        assert!(config.trust_forwarded_for);
    }
}
