// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application error types with consistent API responses.

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Application error type that converts to HTTP responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// No token record exists for the user and provider.
    #[error("Calendar not connected for this user")]
    NotAuthenticated,

    /// The provider refused to mint a new access token; the user has to
    /// go through the consent screen again.
    #[error("{0}")]
    RefreshFailed(String),

    #[error("Calendar provider request failed: {0}")]
    ProviderRequestFailed(String),

    #[error("Missing required configuration: {0}")]
    ConfigurationMissing(&'static str),

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Token store error: {0}")]
    Store(String),
}

impl AppError {
    /// Stable machine-readable code sent to the frontend.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::NotAuthenticated => "not_authenticated",
            AppError::RefreshFailed(_) => "refresh_failed",
            AppError::ProviderRequestFailed(_) => "provider_request_failed",
            AppError::ConfigurationMissing(_) => "configuration_missing",
            AppError::BadRequest(_) => "bad_request",
            AppError::Store(_) => "store_error",
        }
    }

    /// True when the only way forward is a new OAuth consent.
    pub fn requires_reconnect(&self) -> bool {
        matches!(self, AppError::NotAuthenticated | AppError::RefreshFailed(_))
    }
}

/// JSON error response body
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // The dashboard only distinguishes validation failures from
        // everything else; the `error` code carries the rest.
        let status = match &self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Store(msg) => {
                tracing::error!(error = %msg, "Token store error");
                StatusCode::INTERNAL_SERVER_ERROR
            }
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = ErrorResponse {
            error: self.code().to_string(),
            message: self.to_string(),
        };

        (status, Json(body)).into_response()
    }
}

/// Malformed or mistyped JSON bodies get the same error shape as
/// validation failures.
impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

/// Result type alias for handlers
pub type Result<T> = std::result::Result<T, AppError>;
