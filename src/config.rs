use anyhow::{bail, Context};
use serde::Deserialize;

const MAX_COOKIE_EXPIRE_DAYS: i64 = 3650;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_minutes: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FileHostConfig {
    pub endpoint: String,
    pub bucket: String,
    pub access_key: String,
    pub secret_key: String,
    pub region: String,
    /// Base used to build `secure_url` for uploaded objects.
    pub public_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub jwt: JwtConfig,
    pub cookie_expire_days: i64,
    pub file_host: FileHostConfig,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL")?;
        let jwt = JwtConfig {
            secret: std::env::var("JWT_SECRET")?,
            issuer: std::env::var("JWT_ISSUER").unwrap_or_else(|_| "job-portal".into()),
            audience: std::env::var("JWT_AUDIENCE").unwrap_or_else(|_| "job-portal-users".into()),
            ttl_minutes: std::env::var("JWT_TTL_MINUTES")
                .ok()
                .and_then(|v| v.parse::<i64>().ok())
                .unwrap_or(60 * 24 * 7),
        };
        let cookie_expire_days =
            cookie_expire_days(std::env::var("COOKIE_EXPIRE_DAYS").ok().as_deref())?;

        let endpoint = std::env::var("FILE_HOST_ENDPOINT")?;
        let bucket = std::env::var("FILE_HOST_BUCKET")?;
        let public_url = std::env::var("FILE_HOST_PUBLIC_URL")
            .unwrap_or_else(|_| format!("{}/{}", endpoint.trim_end_matches('/'), bucket));
        let file_host = FileHostConfig {
            access_key: std::env::var("FILE_HOST_ACCESS_KEY")?,
            secret_key: std::env::var("FILE_HOST_SECRET_KEY")?,
            region: std::env::var("FILE_HOST_REGION").unwrap_or_else(|_| "us-east-1".into()),
            endpoint,
            bucket,
            public_url,
        };

        Ok(Self {
            database_url,
            jwt,
            cookie_expire_days,
            file_host,
        })
    }
}

/// Session cookie lifetime in days; defaults to 7 and must lie in `1..=3650`.
fn cookie_expire_days(raw: Option<&str>) -> anyhow::Result<i64> {
    let Some(raw) = raw else {
        return Ok(7);
    };
    let days = raw
        .trim()
        .parse::<i64>()
        .with_context(|| format!("COOKIE_EXPIRE_DAYS is not a number: {:?}", raw))?;
    if !(1..=MAX_COOKIE_EXPIRE_DAYS).contains(&days) {
        bail!(
            "COOKIE_EXPIRE_DAYS must be between 1 and {}, got {}",
            MAX_COOKIE_EXPIRE_DAYS,
            days
        );
    }
    Ok(days)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cookie_days_default_and_parse() {
        assert_eq!(cookie_expire_days(None).unwrap(), 7);
        assert_eq!(cookie_expire_days(Some(" 30 ")).unwrap(), 30);
        assert_eq!(cookie_expire_days(Some("3650")).unwrap(), 3650);
    }

    #[test]
    fn cookie_days_out_of_range_are_rejected() {
        for raw in ["0", "-1", "3651", "100000000", "seven"] {
            assert!(cookie_expire_days(Some(raw)).is_err(), "{} accepted", raw);
        }
    }
}
