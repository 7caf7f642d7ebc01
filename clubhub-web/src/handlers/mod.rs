//! HTTP handlers
//!
//! Submodules by surface: `auth` for the token lifecycle, `club` for
//! member-facing views, `admin` for the administration surface.
//! `ApiError` maps the application error taxonomy onto status codes;
//! a denial is always a 403 and never disguised as a 404.

pub mod admin;
pub mod auth;
pub mod club;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use chrono::Utc;
use serde_json::{json, Value};
use tracing::error;

use clubhub_app::{AppError, User};

/// Application errors mapped onto HTTP responses
#[derive(Debug)]
pub struct ApiError(AppError);

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match self.0 {
            AppError::NotFound { resource } => (
                StatusCode::NOT_FOUND,
                "not_found",
                format!("{resource} not found"),
            ),
            AppError::Denied(reason) => {
                (StatusCode::FORBIDDEN, "forbidden", reason.to_string())
            }
            AppError::Validation { message } => {
                (StatusCode::BAD_REQUEST, "validation_error", message)
            }
            AppError::Unauthenticated => (
                StatusCode::UNAUTHORIZED,
                "unauthenticated",
                "Authentication required".to_string(),
            ),
            AppError::InvalidCredentials => (
                StatusCode::UNAUTHORIZED,
                "invalid_credentials",
                "Invalid username or password".to_string(),
            ),
            err @ (AppError::Database(_) | AppError::Core(_) | AppError::Internal { .. }) => {
                error!("Request failed: {err}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "Internal server error".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": error_code,
            "message": message,
        }));

        (status, body).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;

/// Public shape of a user row. Never exposes the password hash.
pub(crate) fn user_json(user: &User) -> Value {
    json!({
        "id": user.id,
        "name": user.name,
        "email": user.email,
        "is_admin": user.is_admin,
        "birthdate": user.birthdate.format("%Y-%m-%d").to_string(),
        "created_at": user.created_at.to_rfc3339(),
    })
}

/// Health check endpoint
pub async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "service": "clubhub-web",
        "timestamp": Utc::now().to_rfc3339(),
    }))
}
