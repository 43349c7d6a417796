//! Unified application error model and mapping helpers.
//! This module provides the common error enum used across the gateway and the
//! HTTP frontend, along with the fixed status mapping for each kind.
//!
//! Two kinds deliberately hide their detail from callers: `Unauthenticated`
//! always renders the same generic body regardless of which authentication
//! step failed, and `Fault` is logged internally then reported as a bare 500.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use std::fmt::{Display, Formatter};
use tracing::error;

use crate::storage::StoreFault;

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AppError {
    Unauthenticated,
    Forbidden { message: String },
    NotFound { message: String },
    InvalidInput { message: String },
    Conflict { message: String },
    Fault { message: String },
}

impl AppError {
    pub fn unauthenticated() -> Self { AppError::Unauthenticated }
    pub fn forbidden<S: Into<String>>(msg: S) -> Self { AppError::Forbidden { message: msg.into() } }
    pub fn not_found<S: Into<String>>(msg: S) -> Self { AppError::NotFound { message: msg.into() } }
    pub fn invalid<S: Into<String>>(msg: S) -> Self { AppError::InvalidInput { message: msg.into() } }
    pub fn conflict<S: Into<String>>(msg: S) -> Self { AppError::Conflict { message: msg.into() } }
    pub fn fault<S: Into<String>>(msg: S) -> Self { AppError::Fault { message: msg.into() } }

    pub fn code_str(&self) -> &'static str {
        match self {
            AppError::Unauthenticated => "unauthenticated",
            AppError::Forbidden { .. } => "forbidden",
            AppError::NotFound { .. } => "not_found",
            AppError::InvalidInput { .. } => "invalid_input",
            AppError::Conflict { .. } => "conflict",
            AppError::Fault { .. } => "fault",
        }
    }

    /// Message as rendered to the caller. `Unauthenticated` and `Fault` are
    /// fixed strings: the caller never learns which check failed or what broke.
    pub fn public_message(&self) -> &str {
        match self {
            AppError::Unauthenticated => "authentication required",
            AppError::Fault { .. } => "internal server error",
            AppError::Forbidden { message, .. }
            | AppError::NotFound { message, .. }
            | AppError::InvalidInput { message, .. }
            | AppError::Conflict { message, .. } => message.as_str(),
        }
    }

    /// Map to HTTP status code.
    pub fn http_status(&self) -> StatusCode {
        match self {
            AppError::Unauthenticated => StatusCode::UNAUTHORIZED,
            AppError::Forbidden { .. } => StatusCode::FORBIDDEN,
            AppError::NotFound { .. } => StatusCode::NOT_FOUND,
            AppError::InvalidInput { .. } => StatusCode::BAD_REQUEST,
            AppError::Conflict { .. } => StatusCode::CONFLICT,
            AppError::Fault { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl Display for AppError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            AppError::Fault { message } => write!(f, "{}: {}", self.code_str(), message),
            other => write!(f, "{}: {}", other.code_str(), other.public_message()),
        }
    }
}

impl std::error::Error for AppError {}

pub type AppResult<T> = Result<T, AppError>;

impl From<StoreFault> for AppError {
    fn from(err: StoreFault) -> Self {
        AppError::Fault { message: err.to_string() }
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Fault { message: err.to_string() }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if let AppError::Fault { message } = &self {
            // Internal detail stays in the log; the caller gets a generic body.
            error!(target: "fault", "unhandled fault: {}", message);
        }
        let body = serde_json::json!({
            "status": "error",
            "code": self.code_str(),
            "message": self.public_message(),
        });
        (self.http_status(), Json(body)).into_response()
    }
}
