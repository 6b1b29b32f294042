use axum::{
    extract::{
        multipart::MultipartError,
        rejection::{JsonRejection, PathRejection, QueryRejection},
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

use crate::validation::FieldErrors;

/// Route a reset-token failure sends the client back to.
pub const RESET_REQUEST_ROUTE: &str = "/api/auth/reset-password";

#[derive(Error, Debug)]
pub enum AppError {
    #[error("validation failed")]
    Validation(FieldErrors),

    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("unauthenticated: {0}")]
    Unauthenticated(&'static str),

    #[error("forbidden")]
    Forbidden,

    #[error("invalid reset token")]
    TokenInvalid,

    #[error("expired reset token")]
    TokenExpired,

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("payload too large")]
    PayloadTooLarge,

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl From<FieldErrors> for AppError {
    fn from(errors: FieldErrors) -> Self {
        AppError::Validation(errors)
    }
}

fn malformed(field: &'static str, message: String) -> AppError {
    let mut errors = FieldErrors::default();
    errors.add(field, message);
    AppError::Validation(errors)
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            return AppError::PayloadTooLarge;
        }
        malformed("body", rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        malformed("query", rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        malformed("path", rejection.body_text())
    }
}

impl From<MultipartError> for AppError {
    fn from(e: MultipartError) -> Self {
        if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
            return AppError::PayloadTooLarge;
        }
        malformed("body", e.body_text())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            AppError::Validation(fields) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                json!({
                    "error": "validation_failed",
                    "message": "Please correct the highlighted fields",
                    "fields": fields,
                }),
            ),
            AppError::InvalidCredentials => (
                StatusCode::UNAUTHORIZED,
                json!({
                    "error": "invalid_credentials",
                    "message": "Login unsuccessful, please check email and password",
                }),
            ),
            AppError::Unauthenticated(reason) => (
                StatusCode::UNAUTHORIZED,
                json!({ "error": "unauthenticated", "message": reason }),
            ),
            AppError::Forbidden => (
                StatusCode::FORBIDDEN,
                json!({ "error": "forbidden", "message": "You do not own this resource" }),
            ),
            AppError::TokenInvalid => (
                StatusCode::BAD_REQUEST,
                json!({
                    "error": "token_invalid",
                    "message": "That is an invalid or expired token",
                    "redirect": RESET_REQUEST_ROUTE,
                }),
            ),
            AppError::TokenExpired => (
                StatusCode::BAD_REQUEST,
                json!({
                    "error": "token_expired",
                    "message": "That is an invalid or expired token",
                    "redirect": RESET_REQUEST_ROUTE,
                }),
            ),
            AppError::NotFound(what) => (
                StatusCode::NOT_FOUND,
                json!({ "error": "not_found", "message": format!("{what} not found") }),
            ),
            AppError::PayloadTooLarge => (
                StatusCode::PAYLOAD_TOO_LARGE,
                json!({
                    "error": "payload_too_large",
                    "message": "Request body is too large",
                }),
            ),
            AppError::Internal(e) => {
                error!(error = ?e, "internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "error": "internal", "message": "Internal server error" }),
                )
            }
        };

        (status, Json(body)).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_follow_error_kind() {
        let cases = [
            (AppError::InvalidCredentials, StatusCode::UNAUTHORIZED),
            (AppError::Unauthenticated("missing"), StatusCode::UNAUTHORIZED),
            (AppError::Forbidden, StatusCode::FORBIDDEN),
            (AppError::TokenInvalid, StatusCode::BAD_REQUEST),
            (AppError::TokenExpired, StatusCode::BAD_REQUEST),
            (AppError::NotFound("post"), StatusCode::NOT_FOUND),
            (AppError::PayloadTooLarge, StatusCode::PAYLOAD_TOO_LARGE),
            (
                AppError::Internal(anyhow::anyhow!("db down")),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, status) in cases {
            assert_eq!(err.into_response().status(), status);
        }
    }

    #[tokio::test]
    async fn validation_body_lists_fields() {
        let mut fields = FieldErrors::default();
        fields.add("email", "That email is already taken");
        let res = AppError::from(fields).into_response();
        assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
        let v: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(v["fields"][0]["field"], "email");
    }

    #[tokio::test]
    async fn internal_error_hides_details() {
        let res = AppError::Internal(anyhow::anyhow!("password=hunter2")).into_response();
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
        let text = String::from_utf8(bytes.to_vec()).unwrap();
        assert!(!text.contains("hunter2"));
    }
}
