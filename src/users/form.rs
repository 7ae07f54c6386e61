use axum::{
    async_trait,
    body::Bytes,
    extract::{FromRequest, Multipart, Request},
    http::header::CONTENT_TYPE,
};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use tracing::warn;

use crate::error::AppError;

/// Multipart field carrying the résumé upload.
pub const RESUME_FIELD: &str = "resume";

#[derive(Debug, Clone)]
pub struct ResumeFile {
    pub body: Bytes,
    pub content_type: String,
    pub file_name: Option<String>,
}

/// Typed request body accepted as either JSON or `multipart/form-data`.
///
/// Text fields are deserialized into `T`; a non-empty `resume` file part is
/// returned separately. Scalar JSON values are coerced to strings so that
/// `{"phone": 123}` and a form field `phone=123` read the same.
pub struct AccountForm<T> {
    pub input: T,
    pub resume: Option<ResumeFile>,
}

#[async_trait]
impl<S, T> FromRequest<S> for AccountForm<T>
where
    S: Send + Sync,
    T: DeserializeOwned,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let is_multipart = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.starts_with("multipart/form-data"));

        let (fields, resume) = if is_multipart {
            read_multipart(Multipart::from_request(req, state).await.map_err(|e| {
                warn!(error = %e.body_text(), "multipart rejected");
                AppError::validation("Invalid request body.")
            })?)
            .await?
        } else {
            let body = Bytes::from_request(req, state).await.map_err(|e| {
                warn!(error = %e.body_text(), "body rejected");
                AppError::validation("Invalid request body.")
            })?;
            (read_json(&body)?, None)
        };

        let input = serde_json::from_value(Value::Object(fields)).map_err(|e| {
            warn!(error = %e, "request body does not match form");
            AppError::validation("Invalid request body.")
        })?;
        Ok(Self { input, resume })
    }
}

async fn read_multipart(
    mut mp: Multipart,
) -> Result<(Map<String, Value>, Option<ResumeFile>), AppError> {
    let invalid = |e: axum::extract::multipart::MultipartError| {
        warn!(error = %e, "multipart read failed");
        AppError::validation("Invalid request body.")
    };

    let mut fields = Map::new();
    let mut resume = None;
    while let Some(field) = mp.next_field().await.map_err(invalid)? {
        let Some(name) = field.name().map(str::to_string) else {
            continue;
        };
        if name == RESUME_FIELD {
            let content_type = field
                .content_type()
                .map(str::to_string)
                .unwrap_or_else(|| "application/octet-stream".into());
            let file_name = field.file_name().map(str::to_string);
            let body = field.bytes().await.map_err(invalid)?;
            if !body.is_empty() {
                resume = Some(ResumeFile {
                    body,
                    content_type,
                    file_name,
                });
            }
        } else {
            let text = field.text().await.map_err(invalid)?;
            fields.insert(name, Value::String(text));
        }
    }
    Ok((fields, resume))
}

fn read_json(body: &[u8]) -> Result<Map<String, Value>, AppError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(Map::new());
    }
    let value: Value = serde_json::from_slice(body).map_err(|e| {
        warn!(error = %e, "malformed json body");
        AppError::validation("Invalid request body.")
    })?;
    let Value::Object(map) = value else {
        return Err(AppError::validation("Invalid request body."));
    };
    Ok(map
        .into_iter()
        .map(|(k, v)| {
            let v = match v {
                Value::Number(n) => Value::String(n.to_string()),
                Value::Bool(b) => Value::String(b.to_string()),
                other => other,
            };
            (k, v)
        })
        .collect())
}
