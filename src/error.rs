use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::users::repo::StoreError;

/// Every failure a handler can produce, mapped to `{ success: false, message }`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    Auth(String),

    #[error("{0}")]
    Unauthenticated(String),

    #[error("{0}")]
    Upload(String),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub success: bool,
    pub message: String,
}

impl AppError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn auth(msg: impl Into<String>) -> Self {
        Self::Auth(msg.into())
    }

    pub fn unauthenticated() -> Self {
        Self::Unauthenticated("User is not authenticated.".into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_)
            | AppError::Conflict(_)
            | AppError::Auth(_)
            | AppError::Unauthenticated(_) => StatusCode::BAD_REQUEST,
            AppError::Upload(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<StoreError> for AppError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::DuplicateEmail => AppError::Conflict("Email is already registered.".into()),
            StoreError::Other(e) => AppError::Internal(e),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match self {
            AppError::Internal(ref e) => {
                tracing::error!(error = ?e, "unexpected error");
                "Internal Server Error".to_string()
            }
            AppError::Validation(msg)
            | AppError::Upload(msg)
            | AppError::Conflict(msg)
            | AppError::Auth(msg)
            | AppError::Unauthenticated(msg) => msg,
        };

        (
            status,
            Json(ErrorBody {
                success: false,
                message,
            }),
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn business_errors_are_bad_request() {
        assert_eq!(AppError::validation("x").status(), StatusCode::BAD_REQUEST);
        assert_eq!(AppError::auth("x").status(), StatusCode::BAD_REQUEST);
        assert_eq!(AppError::Conflict("x".into()).status(), StatusCode::BAD_REQUEST);
        assert_eq!(AppError::unauthenticated().status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn upload_and_internal_are_server_errors() {
        assert_eq!(
            AppError::Upload("x".into()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            AppError::from(anyhow::anyhow!("boom")).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[tokio::test]
    async fn upload_error_keeps_its_message() {
        let res = AppError::Upload("Failed to upload resume".into()).into_response();
        assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["success"], false);
        assert_eq!(body["message"], "Failed to upload resume");
    }

    #[test]
    fn duplicate_email_maps_to_conflict() {
        let err = AppError::from(StoreError::DuplicateEmail);
        assert!(matches!(err, AppError::Conflict(ref m) if m == "Email is already registered."));
    }
}
