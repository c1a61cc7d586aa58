// SPDX-License-Identifier: MIT

//! Application error types with consistent API responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Application error type that converts to HTTP responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Refresh-token exchange was rejected by Spotify (revoked or expired).
    #[error("Spotify authorization failed")]
    AuthFailure,

    /// The requested record exists but belongs to another user.
    #[error("Requested playlist does not belong to user")]
    Unauthorized,

    #[error("Resource not found: {0}")]
    NotFound(String),

    /// A record was found in two mutually-exclusive states.
    #[error("Conflicting record state: {0}")]
    Conflict(String),

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Spotify API error: {0}")]
    SpotifyApi(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// Marker put into `SpotifyApi` errors when Spotify rejects the credential.
    pub const SPOTIFY_TOKEN_ERROR: &'static str = "spotify_token_invalid";
    /// Marker put into `SpotifyApi` errors when Spotify rate-limits us.
    pub const SPOTIFY_RATE_LIMIT: &'static str = "spotify_rate_limit";

    /// True if this error means the user's Spotify credential is no good.
    pub fn is_auth_failure(&self) -> bool {
        match self {
            AppError::AuthFailure => true,
            AppError::SpotifyApi(msg) => msg.contains(Self::SPOTIFY_TOKEN_ERROR),
            _ => false,
        }
    }
}

/// JSON error response body
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error, details) = match &self {
            AppError::AuthFailure => (StatusCode::UNAUTHORIZED, "auth_failure", None),
            AppError::Unauthorized => (StatusCode::FORBIDDEN, "unauthorized", None),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", Some(msg.clone())),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, "conflict", Some(msg.clone())),
            AppError::BadRequest(msg) => {
                (StatusCode::BAD_REQUEST, "bad_request", Some(msg.clone()))
            }
            AppError::SpotifyApi(msg) => {
                (StatusCode::BAD_GATEWAY, "spotify_error", Some(msg.clone()))
            }
            AppError::Database(msg) => {
                tracing::error!(error = %msg, "Database error");
                (StatusCode::INTERNAL_SERVER_ERROR, "database_error", None)
            }
            AppError::Internal(err) => {
                tracing::error!(error = %err, "Internal server error");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", None)
            }
        };

        let body = ErrorResponse {
            error: error.to_string(),
            details,
        };

        (status, Json(body)).into_response()
    }
}

/// Result type alias for handlers
pub type Result<T> = std::result::Result<T, AppError>;
