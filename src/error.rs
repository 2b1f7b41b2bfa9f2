//! Error types shared across the service.
//!
//! Errors are layered the same way the code is:
//!
//! - [`BackendError`] - a single statement or connection attempt failed
//! - [`ConnectionError`] - the retry budget was spent without a usable connection
//! - [`LinkError`] - what link store and service operations report to callers
//! - [`AppError`] - the HTTP-facing error rendered as a JSON body

use std::time::Duration;

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use serde_json::{Value, json};
use thiserror::Error;

use crate::domain::fingerprint::FullHash;
use crate::utils::url_normalizer::UrlNormalizationError;

/// Failure reported by a storage connection.
///
/// Only [`BackendError::ConnectionLost`] is considered transient; everything
/// else is surfaced to the caller without a retry.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BackendError {
    #[error("connection lost: {0}")]
    ConnectionLost(String),

    #[error("no connection slot became free within {0:?}")]
    PoolTimedOut(Duration),

    #[error("connection pool is closed")]
    PoolClosed,

    #[error("query failed: {0}")]
    Query(String),
}

impl BackendError {
    /// Returns `true` for faults that a fresh connection may cure.
    pub fn is_connectivity(&self) -> bool {
        matches!(self, BackendError::ConnectionLost(_))
    }
}

/// The connection manager gave up.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("database unreachable after {attempts} attempt(s): {last_fault}")]
pub struct ConnectionError {
    pub attempts: u32,
    pub last_fault: BackendError,
}

/// Errors reported by link store and link service operations.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LinkError {
    #[error(transparent)]
    Connection(#[from] ConnectionError),

    #[error("storage error: {0}")]
    Store(String),

    /// The fingerprint is already bound to a different URL.
    #[error("fingerprint {full_hash} is already bound to a different url than {url}")]
    Collision { full_hash: FullHash, url: String },

    #[error("url cannot be encoded for fingerprinting: {0}")]
    Encoding(String),

    #[error(transparent)]
    InvalidUrl(#[from] UrlNormalizationError),
}

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorInfo,
}

#[derive(Serialize)]
struct ErrorInfo {
    code: &'static str,
    message: String,
    details: Value,
}

/// HTTP-facing error type.
///
/// Rendered as:
///
/// ```json
/// { "error": { "code": "not_found", "message": "...", "details": {} } }
/// ```
#[derive(Debug, Error)]
pub enum AppError {
    #[error("{message}")]
    Validation { message: String, details: Value },

    #[error("{message}")]
    NotFound { message: String, details: Value },

    #[error("{message}")]
    Gone { message: String, details: Value },

    #[error("{message}")]
    Unavailable { message: String, details: Value },

    #[error("{message}")]
    Collision { message: String, details: Value },

    #[error("{message}")]
    Internal { message: String, details: Value },
}

impl AppError {
    pub fn bad_request(message: impl Into<String>, details: Value) -> Self {
        Self::Validation {
            message: message.into(),
            details,
        }
    }

    pub fn not_found(message: impl Into<String>, details: Value) -> Self {
        Self::NotFound {
            message: message.into(),
            details,
        }
    }

    pub fn gone(message: impl Into<String>, details: Value) -> Self {
        Self::Gone {
            message: message.into(),
            details,
        }
    }

    pub fn unavailable(message: impl Into<String>, details: Value) -> Self {
        Self::Unavailable {
            message: message.into(),
            details,
        }
    }

    pub fn internal(message: impl Into<String>, details: Value) -> Self {
        Self::Internal {
            message: message.into(),
            details,
        }
    }
}

impl From<LinkError> for AppError {
    fn from(err: LinkError) -> Self {
        match err {
            LinkError::Connection(e) => AppError::unavailable(
                "Database is unavailable",
                json!({ "attempts": e.attempts, "reason": e.last_fault.to_string() }),
            ),
            LinkError::Store(reason) => {
                tracing::error!(%reason, "Storage error");
                AppError::internal("Storage error", json!({}))
            }
            LinkError::Collision { full_hash, .. } => AppError::Collision {
                message: "URL fingerprint collides with an existing link".to_string(),
                details: json!({ "full_hash": full_hash.as_str() }),
            },
            LinkError::Encoding(reason) => {
                AppError::bad_request("URL cannot be encoded", json!({ "reason": reason }))
            }
            LinkError::InvalidUrl(e) => {
                AppError::bad_request("Invalid URL", json!({ "reason": e.to_string() }))
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message, details) = match self {
            AppError::Validation { message, details } => (
                StatusCode::BAD_REQUEST,
                "validation_error",
                message,
                details,
            ),
            AppError::NotFound { message, details } => {
                (StatusCode::NOT_FOUND, "not_found", message, details)
            }
            AppError::Gone { message, details } => (StatusCode::GONE, "blocked", message, details),
            AppError::Unavailable { message, details } => (
                StatusCode::SERVICE_UNAVAILABLE,
                "database_unavailable",
                message,
                details,
            ),
            AppError::Collision { message, details } => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "hash_collision",
                message,
                details,
            ),
            AppError::Internal { message, details } => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal_error",
                message,
                details,
            ),
        };

        let body = ErrorBody {
            error: ErrorInfo {
                code,
                message,
                details,
            },
        };

        (status, Json(body)).into_response()
    }
}
