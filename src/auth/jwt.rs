use std::time::Duration;

use axum::{
    extract::FromRef,
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::Serialize;
use time::{macros::format_description, Duration as TimeDuration, OffsetDateTime, UtcOffset};
use tracing::debug;
use uuid::Uuid;

use super::claims::Claims;
use crate::{config::JwtConfig, error::AppError, state::AppState, users::User};

pub const TOKEN_COOKIE: &str = "token";

#[derive(Clone)]
pub struct JwtKeys {
    pub encoding: EncodingKey,
    pub decoding: DecodingKey,
    pub issuer: String,
    pub audience: String,
    pub ttl: Duration,
    pub cookie_ttl: TimeDuration,
}

impl FromRef<AppState> for JwtKeys {
    fn from_ref(state: &AppState) -> Self {
        let JwtConfig {
            secret,
            issuer,
            audience,
            ttl_minutes,
        } = state.config.jwt.clone();
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            issuer,
            audience,
            ttl: Duration::from_secs((ttl_minutes.max(0) as u64) * 60),
            cookie_ttl: TimeDuration::days(state.config.cookie_expire_days),
        }
    }
}

impl JwtKeys {
    pub fn sign(&self, user_id: Uuid) -> anyhow::Result<String> {
        let now = OffsetDateTime::now_utc();
        let exp = now + TimeDuration::seconds(self.ttl.as_secs() as i64);
        let claims = Claims {
            sub: user_id,
            iat: now.unix_timestamp() as usize,
            exp: exp.unix_timestamp() as usize,
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
        };
        let token = encode(&Header::default(), &claims, &self.encoding)?;
        debug!(user_id = %user_id, "jwt signed");
        Ok(token)
    }

    pub fn verify(&self, token: &str) -> anyhow::Result<Claims> {
        let mut validation = Validation::default();
        validation.set_audience(std::slice::from_ref(&self.audience));
        validation.set_issuer(std::slice::from_ref(&self.issuer));
        let data = decode::<Claims>(token, &self.decoding, &validation)?;
        debug!(user_id = %data.claims.sub, "jwt verified");
        Ok(data.claims)
    }
}

/// Body written alongside the session cookie.
#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub success: bool,
    pub message: String,
    pub user: User,
    pub token: String,
}

pub fn session_cookie(token: &str, expires: OffsetDateTime) -> anyhow::Result<String> {
    let expires = expires.to_offset(UtcOffset::UTC).format(format_description!(
        "[weekday repr:short], [day] [month repr:short] [year] [hour]:[minute]:[second] GMT"
    ))?;
    Ok(format!(
        "{}={}; Path=/; HttpOnly; Expires={}",
        TOKEN_COOKIE, token, expires
    ))
}

/// Cookie value that makes the browser drop the session immediately.
pub fn expired_cookie() -> anyhow::Result<String> {
    Ok(format!(
        "{}; Max-Age=0",
        session_cookie("", OffsetDateTime::now_utc())?
    ))
}

/// Signs a token for `user` and writes it both as the `token` cookie and in the JSON body.
pub fn send_token(
    keys: &JwtKeys,
    user: User,
    status: StatusCode,
    message: &str,
) -> Result<Response, AppError> {
    let token = keys.sign(user.id)?;
    let expires = OffsetDateTime::now_utc()
        .checked_add(keys.cookie_ttl)
        .ok_or_else(|| anyhow::anyhow!("cookie expiry out of range"))?;
    let cookie = session_cookie(&token, expires)?;
    let cookie = HeaderValue::from_str(&cookie).map_err(anyhow::Error::from)?;

    let body = TokenResponse {
        success: true,
        message: message.to_string(),
        user,
        token,
    };
    Ok((status, [(header::SET_COOKIE, cookie)], Json(body)).into_response())
}
