// src/error.rs

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use std::fmt;

/// Every failure a request handler can report.
///
/// Each variant carries the message shown to the client, except
/// `InternalServerError`, whose message is only logged.
#[derive(Debug)]
pub enum AppError {
    /// 500. Database or hashing failures.
    InternalServerError(String),

    /// 400. Malformed or incomplete input.
    BadRequest(String),

    /// 401. Wrong email or password.
    AuthError(String),

    /// 404. Missing account, question, or image.
    NotFound(String),

    /// 409. Email or username already in use.
    Conflict(String),

    /// 502. The OAuth identity provider failed or refused.
    Upstream(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (kind, msg) = match self {
            AppError::InternalServerError(msg) => ("internal error", msg),
            AppError::BadRequest(msg) => ("bad request", msg),
            AppError::AuthError(msg) => ("authentication failed", msg),
            AppError::NotFound(msg) => ("not found", msg),
            AppError::Conflict(msg) => ("conflict", msg),
            AppError::Upstream(msg) => ("upstream failure", msg),
        };
        write!(f, "{}: {}", kind, msg)
    }
}

impl std::error::Error for AppError {}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::InternalServerError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::AuthError(_) => StatusCode::UNAUTHORIZED,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Upstream(_) => StatusCode::BAD_GATEWAY,
        }
    }

    /// Logs server-side failures and returns the client-facing message.
    fn into_public_message(self) -> String {
        match self {
            AppError::InternalServerError(msg) => {
                tracing::error!("Internal Server Error: {}", msg);
                "Internal Server Error".to_string()
            }
            AppError::Upstream(msg) => {
                tracing::warn!("Upstream failure: {}", msg);
                msg
            }
            AppError::BadRequest(msg)
            | AppError::AuthError(msg)
            | AppError::NotFound(msg)
            | AppError::Conflict(msg) => msg,
        }
    }

    /// Renders the error as a bare text body. Used by the image endpoints,
    /// whose consumers are `<img>` elements rather than JSON clients.
    pub fn into_plain_response(self) -> Response {
        let status = self.status();
        (status, self.into_public_message()).into_response()
    }
}

/// JSON body `{"error": message}` with the variant's status code.
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = Json(json!({ "error": self.into_public_message() }));

        (status, body).into_response()
    }
}

/// Lets handlers use `?` on database calls.
impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        AppError::InternalServerError(err.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::BadRequest(err.to_string())
    }
}

/// Failures talking to the OAuth identity provider.
impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        AppError::Upstream(format!("Identity provider request failed: {}", err))
    }
}
