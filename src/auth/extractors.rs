use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::{header, request::Parts},
};
use tracing::warn;

use super::jwt::{JwtKeys, TOKEN_COOKIE};
use crate::{error::AppError, state::AppState, users::User};

/// Resolves the session token (cookie first, then `Authorization: Bearer`) to a stored user.
pub struct AuthUser(pub User);

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = token_from_parts(parts).ok_or_else(AppError::unauthenticated)?;

        let keys = JwtKeys::from_ref(state);
        let claims = keys.verify(&token).map_err(|e| {
            warn!(error = %e, "invalid or expired token");
            AppError::unauthenticated()
        })?;

        let user = state.store.find_by_id(claims.sub).await?.ok_or_else(|| {
            warn!(user_id = %claims.sub, "token for unknown user");
            AppError::unauthenticated()
        })?;

        Ok(AuthUser(user))
    }
}

fn token_from_parts(parts: &Parts) -> Option<String> {
    let from_cookie = parts
        .headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().strip_prefix(TOKEN_COOKIE)?.strip_prefix('='))
        .find(|t| !t.is_empty())
        .map(str::to_string);

    from_cookie.or_else(|| {
        let auth = parts.headers.get(header::AUTHORIZATION)?.to_str().ok()?;
        auth.strip_prefix("Bearer ")
            .or_else(|| auth.strip_prefix("bearer "))
            .filter(|t| !t.is_empty())
            .map(str::to_string)
    })
}
