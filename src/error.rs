use axum::{
    extract::Request,
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use time::OffsetDateTime;

/// Every failure a handler can surface, mapped to exactly one status code.
/// Handlers and services return this; the `IntoResponse` impl below is the
/// single place where errors become HTTP responses.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("account not found: id {0}")]
    NotFound(i64),

    #[error("email already in use: {0}")]
    DuplicateEmail(String),

    #[error("{field}: {reason}")]
    InvalidData { field: &'static str, reason: String },

    #[error("{0}")]
    InvalidArgument(String),

    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("access denied")]
    AccessDenied,

    #[error(transparent)]
    Database(#[from] sqlx::Error),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    pub fn invalid_data(field: &'static str, reason: impl Into<String>) -> Self {
        ApiError::InvalidData {
            field,
            reason: reason.into(),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::DuplicateEmail(_) => StatusCode::CONFLICT,
            ApiError::InvalidData { .. } | ApiError::InvalidArgument(_) => StatusCode::BAD_REQUEST,
            ApiError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            ApiError::AccessDenied => StatusCode::FORBIDDEN,
            ApiError::Database(_) | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message safe to hand to clients. Internal error text stays in the logs.
    fn client_message(&self) -> String {
        match self {
            ApiError::Database(_) | ApiError::Internal(_) => {
                "An unexpected error occurred".to_string()
            }
            ApiError::InvalidCredentials => "Invalid credentials".to_string(),
            ApiError::AccessDenied => "Access denied".to_string(),
            other => other.to_string(),
        }
    }
}

/// Uniform JSON error body: {timestamp, status, error, message, path}.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorBody {
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
    pub status: u16,
    pub error: String,
    pub message: String,
    pub path: Option<String>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }
        let body = ErrorBody {
            timestamp: OffsetDateTime::now_utc(),
            status: status.as_u16(),
            error: status
                .canonical_reason()
                .unwrap_or("Unknown")
                .to_string(),
            message: self.client_message(),
            path: None,
        };
        // Stash the body as an extension so attach_error_path can fill in
        // the request path without every handler threading it through.
        let mut res = (status, Json(body.clone())).into_response();
        res.extensions_mut().insert(body);
        res
    }
}

/// Response middleware that rewrites error bodies with the request path.
pub async fn attach_error_path(req: Request, next: Next) -> Response {
    let path = req.uri().path().to_owned();
    let res = next.run(req).await;

    let (mut parts, body) = res.into_parts();
    if let Some(mut err) = parts.extensions.remove::<ErrorBody>() {
        err.path = Some(path);
        return (parts.status, Json(err)).into_response();
    }
    Response::from_parts(parts, body)
}
