use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use broadside_core::error::ArenaError;

#[derive(Debug)]
pub enum AppError {
    BadRequest(String),
    NotFound(String),
    Conflict(String),
    /// A collaborator (store, queue, player) failed.
    FailedDependency(String),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::FailedDependency(_) => StatusCode::FAILED_DEPENDENCY,
        }
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BadRequest(m)
            | Self::NotFound(m)
            | Self::Conflict(m)
            | Self::FailedDependency(m) => write!(f, "{m}"),
        }
    }
}

impl From<ArenaError> for AppError {
    fn from(err: ArenaError) -> Self {
        if err.is_lease_error() {
            Self::Conflict(err.to_string())
        } else {
            Self::FailedDependency(err.to_string())
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = serde_json::json!({
            "status": status.as_u16(),
            "title": status.canonical_reason().unwrap_or("Error"),
            "detail": self.to_string(),
        });
        (status, Json(body)).into_response()
    }
}
