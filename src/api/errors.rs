//! API Error Handling
//!
//! Structured error responses with HTTP status codes and request tracking.

use crate::errors::{ChainError, ConfigurationError, ErrorCategory, ResolutionError};
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::fmt;
use tracing::error;

/// Error body returned by every endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    /// Machine-readable code (bad_request, resolver_mismatch, ...)
    pub error: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
    pub request_id: String,
}

/// API error with request tracking
#[derive(Debug)]
pub struct ApiError {
    pub kind: ApiErrorKind,
    pub request_id: String,
}

#[derive(Debug)]
pub enum ApiErrorKind {
    BadRequest(String),
    /// Signer is not the contract resolver
    ResolverMismatch {
        message: String,
        details: Option<serde_json::Value>,
    },
    NotFound(String),
    AlreadyResolved(String),
    /// Contract reverted for any other reason
    Rejected(String),
    Configuration(String),
    ServiceUnavailable(String),
}

impl ApiError {
    pub fn bad_request(request_id: String, message: String) -> Self {
        Self {
            kind: ApiErrorKind::BadRequest(message),
            request_id,
        }
    }

    pub fn not_found(request_id: String, message: String) -> Self {
        Self {
            kind: ApiErrorKind::NotFound(message),
            request_id,
        }
    }

    pub fn service_unavailable(request_id: String, message: String) -> Self {
        Self {
            kind: ApiErrorKind::ServiceUnavailable(message),
            request_id,
        }
    }

    /// Map a resolver failure onto its HTTP status
    pub fn from_resolution(request_id: String, err: &ResolutionError) -> Self {
        let kind = match err {
            ResolutionError::InvalidRequest(msg) => ApiErrorKind::BadRequest(msg.clone()),
            ResolutionError::Configuration(ConfigurationError::ResolverMismatch { derived, expected }) => {
                ApiErrorKind::ResolverMismatch {
                    message: err.to_string(),
                    details: Some(json!({
                        "derivedAddress": derived,
                        "expectedAddress": expected,
                    })),
                }
            }
            ResolutionError::Configuration(inner) => {
                error!(request_id = %request_id, error = %inner, "Resolver configuration error");
                ApiErrorKind::Configuration(inner.to_string())
            }
            ResolutionError::Chain(ChainError::OnlyResolver) => ApiErrorKind::ResolverMismatch {
                message: err.to_string(),
                details: None,
            },
            ResolutionError::Chain(ChainError::AlreadyResolved(_)) => ApiErrorKind::AlreadyResolved(err.to_string()),
            ResolutionError::Chain(chain) if chain.category() == ErrorCategory::Transient => {
                ApiErrorKind::ServiceUnavailable(err.to_string())
            }
            ResolutionError::Chain(_) => ApiErrorKind::Rejected(err.to_string()),
            ResolutionError::Service { status: 409, message, .. } => ApiErrorKind::AlreadyResolved(message.clone()),
            ResolutionError::Service { status: 403, message, .. } => ApiErrorKind::ResolverMismatch {
                message: message.clone(),
                details: None,
            },
            ResolutionError::Service { message, .. } | ResolutionError::Network(message) => {
                ApiErrorKind::ServiceUnavailable(message.clone())
            }
        };
        Self { kind, request_id }
    }

    pub fn status(&self) -> StatusCode {
        match &self.kind {
            ApiErrorKind::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiErrorKind::ResolverMismatch { .. } => StatusCode::FORBIDDEN,
            ApiErrorKind::NotFound(_) => StatusCode::NOT_FOUND,
            ApiErrorKind::AlreadyResolved(_) => StatusCode::CONFLICT,
            ApiErrorKind::Rejected(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiErrorKind::Configuration(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiErrorKind::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    fn code(&self) -> &'static str {
        match &self.kind {
            ApiErrorKind::BadRequest(_) => "bad_request",
            ApiErrorKind::ResolverMismatch { .. } => "resolver_mismatch",
            ApiErrorKind::NotFound(_) => "not_found",
            ApiErrorKind::AlreadyResolved(_) => "already_resolved",
            ApiErrorKind::Rejected(_) => "transaction_reverted",
            ApiErrorKind::Configuration(_) => "configuration_error",
            ApiErrorKind::ServiceUnavailable(_) => "service_unavailable",
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            ApiErrorKind::BadRequest(msg) => write!(f, "[{}] Bad Request: {}", self.request_id, msg),
            ApiErrorKind::ResolverMismatch { message, .. } => {
                write!(f, "[{}] Resolver Mismatch: {}", self.request_id, message)
            }
            ApiErrorKind::NotFound(msg) => write!(f, "[{}] Not Found: {}", self.request_id, msg),
            ApiErrorKind::AlreadyResolved(msg) => write!(f, "[{}] Conflict: {}", self.request_id, msg),
            ApiErrorKind::Rejected(msg) => write!(f, "[{}] Reverted: {}", self.request_id, msg),
            ApiErrorKind::Configuration(msg) => write!(f, "[{}] Configuration: {}", self.request_id, msg),
            ApiErrorKind::ServiceUnavailable(msg) => {
                write!(f, "[{}] Service Unavailable: {}", self.request_id, msg)
            }
        }
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let code = self.code().to_string();
        let (message, details) = match self.kind {
            ApiErrorKind::ResolverMismatch { message, details } => (message, details),
            // Details stay in the server log
            ApiErrorKind::Configuration(_) => ("Resolver configuration error".to_string(), None),
            ApiErrorKind::BadRequest(msg)
            | ApiErrorKind::NotFound(msg)
            | ApiErrorKind::AlreadyResolved(msg)
            | ApiErrorKind::Rejected(msg)
            | ApiErrorKind::ServiceUnavailable(msg) => (msg, None),
        };

        let body = Json(ErrorResponse {
            error: code,
            message,
            details,
            request_id: self.request_id,
        });

        (status, body).into_response()
    }
}
