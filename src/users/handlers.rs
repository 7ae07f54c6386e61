use axum::{
    extract::{DefaultBodyLimit, FromRef, State},
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use tracing::instrument;

use super::{
    dto::{
        LoginRequest, MessageResponse, RegisterRequest, UpdatePasswordRequest,
        UpdateProfileRequest, UserResponse,
    },
    form::AccountForm,
    services,
};
use crate::{
    auth::{
        jwt::{expired_cookie, send_token},
        AuthUser, JwtKeys,
    },
    error::AppError,
    state::AppState,
};

pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/logout", get(logout))
        .route("/getuser", get(get_user))
        .route("/update/profile", put(update_profile))
        .route("/update/password", put(update_password))
        .layer(DefaultBodyLimit::max(10 * 1024 * 1024)) // 10MB
}

#[instrument(skip(state, form))]
pub async fn register(
    State(state): State<AppState>,
    form: AccountForm<RegisterRequest>,
) -> Result<Response, AppError> {
    let user = services::register(&state, form.input, form.resume).await?;
    send_token(
        &JwtKeys::from_ref(&state),
        user,
        StatusCode::CREATED,
        "User Registered.",
    )
}

#[instrument(skip(state, form))]
pub async fn login(
    State(state): State<AppState>,
    form: AccountForm<LoginRequest>,
) -> Result<Response, AppError> {
    let user = services::login(&state, form.input).await?;
    send_token(
        &JwtKeys::from_ref(&state),
        user,
        StatusCode::OK,
        "User logged in successfully.",
    )
}

#[instrument]
pub async fn logout() -> Result<Response, AppError> {
    let cookie = HeaderValue::from_str(&expired_cookie()?).map_err(anyhow::Error::from)?;
    Ok((
        StatusCode::OK,
        [(header::SET_COOKIE, cookie)],
        Json(MessageResponse {
            success: true,
            message: "Logged out successfully.".into(),
        }),
    )
        .into_response())
}

#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn get_user(AuthUser(user): AuthUser) -> Json<UserResponse> {
    Json(UserResponse {
        success: true,
        user,
        message: None,
    })
}

#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn update_profile(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    form: AccountForm<UpdateProfileRequest>,
) -> Result<Json<UserResponse>, AppError> {
    let user = services::update_profile(&state, &user, form.input, form.resume).await?;
    Ok(Json(UserResponse {
        success: true,
        user,
        message: Some("Profile updated.".into()),
    }))
}

#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn update_password(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    form: AccountForm<UpdatePasswordRequest>,
) -> Result<Response, AppError> {
    let user = services::update_password(&state, &user, form.input).await?;
    send_token(
        &JwtKeys::from_ref(&state),
        user,
        StatusCode::OK,
        "Password updated successfully.",
    )
}
