//! Error types for PaperLens services
//!
//! Provides a comprehensive error handling system with:
//! - Distinct error types for different failure modes
//! - HTTP status code mapping
//! - Structured error responses
//! - Error codes for client handling

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::llm::LlmError;

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;

/// Error codes for machine-readable error identification
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Validation errors (1xxx)
    ValidationError,
    MissingField,
    InvalidFormat,
    PayloadTooLarge,

    // Document errors (2xxx)
    UnsupportedFormat,
    CorruptDocument,
    InvalidEncoding,
    NoExtractableText,

    // Resource errors (4xxx)
    SessionNotFound,
    DocumentNotFound,
    AnalysisNotFound,

    // Conflict errors (5xxx)
    Conflict,
    LimitExceeded,

    // Request limits (6xxx)
    RateLimited,
    RequestTimeout,

    // External service errors (8xxx)
    AnalysisFailed,

    // Internal errors (9xxx)
    InternalError,
    ConfigurationError,
}

impl ErrorCode {
    /// Get the numeric code for this error
    pub fn as_code(&self) -> u16 {
        match self {
            ErrorCode::ValidationError => 1001,
            ErrorCode::MissingField => 1002,
            ErrorCode::InvalidFormat => 1003,
            ErrorCode::PayloadTooLarge => 1004,

            ErrorCode::UnsupportedFormat => 2001,
            ErrorCode::CorruptDocument => 2002,
            ErrorCode::InvalidEncoding => 2003,
            ErrorCode::NoExtractableText => 2004,

            ErrorCode::SessionNotFound => 4002,
            ErrorCode::DocumentNotFound => 4003,
            ErrorCode::AnalysisNotFound => 4004,

            ErrorCode::Conflict => 5001,
            ErrorCode::LimitExceeded => 5002,

            ErrorCode::RateLimited => 6001,
            ErrorCode::RequestTimeout => 6002,

            ErrorCode::AnalysisFailed => 8001,

            ErrorCode::InternalError => 9001,
            ErrorCode::ConfigurationError => 9002,
        }
    }
}

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    // Validation errors
    #[error("Validation failed: {message}")]
    Validation {
        message: String,
        field: Option<String>,
    },

    #[error("Required field missing: {field}")]
    MissingField { field: String },

    #[error("Invalid format: {message}")]
    InvalidFormat { message: String },

    #[error("Payload too large: {size} bytes exceeds limit of {limit} bytes")]
    PayloadTooLarge { size: usize, limit: usize },

    #[error("Request body exceeds the limit of {limit} bytes")]
    BodyTooLarge { limit: usize },

    // Document errors
    #[error("Unsupported document format: {declared}")]
    UnsupportedFormat { declared: String },

    #[error("Corrupt document {filename}: {message}")]
    CorruptDocument { filename: String, message: String },

    #[error("Document {filename} is not valid UTF-8 text")]
    InvalidEncoding { filename: String },

    #[error("No extractable text found in {filename}")]
    NoExtractableText { filename: String },

    // Resource errors
    #[error("Session not found: {id}")]
    SessionNotFound { id: String },

    #[error("Document not found: {id}")]
    DocumentNotFound { id: String },

    #[error("Document {id} has not been analysed yet")]
    AnalysisNotFound { id: String },

    // Conflict errors
    #[error("Conflict: {message}")]
    Conflict { message: String },

    #[error("Limit exceeded: {message}")]
    LimitExceeded { message: String },

    // Rate limiting
    #[error("Rate limit exceeded: {limit} requests per second")]
    RateLimited { limit: u32 },

    #[error("Request did not complete within {timeout_secs} seconds")]
    RequestTimeout { timeout_secs: u64 },

    // External service errors
    #[error("Analysis failed: {message}")]
    AnalysisFailed { message: String },

    // Internal errors
    #[error("Internal server error: {message}")]
    Internal { message: String },

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    // Generic
    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl AppError {
    /// Get the error code for this error
    pub fn code(&self) -> ErrorCode {
        match self {
            AppError::Validation { .. } => ErrorCode::ValidationError,
            AppError::MissingField { .. } => ErrorCode::MissingField,
            AppError::InvalidFormat { .. } => ErrorCode::InvalidFormat,
            AppError::PayloadTooLarge { .. } | AppError::BodyTooLarge { .. } => {
                ErrorCode::PayloadTooLarge
            }
            AppError::UnsupportedFormat { .. } => ErrorCode::UnsupportedFormat,
            AppError::CorruptDocument { .. } => ErrorCode::CorruptDocument,
            AppError::InvalidEncoding { .. } => ErrorCode::InvalidEncoding,
            AppError::NoExtractableText { .. } => ErrorCode::NoExtractableText,
            AppError::SessionNotFound { .. } => ErrorCode::SessionNotFound,
            AppError::DocumentNotFound { .. } => ErrorCode::DocumentNotFound,
            AppError::AnalysisNotFound { .. } => ErrorCode::AnalysisNotFound,
            AppError::Conflict { .. } => ErrorCode::Conflict,
            AppError::LimitExceeded { .. } => ErrorCode::LimitExceeded,
            AppError::RateLimited { .. } => ErrorCode::RateLimited,
            AppError::RequestTimeout { .. } => ErrorCode::RequestTimeout,
            AppError::AnalysisFailed { .. } => ErrorCode::AnalysisFailed,
            AppError::Internal { .. } => ErrorCode::InternalError,
            AppError::Configuration { .. } => ErrorCode::ConfigurationError,
            AppError::Other(_) => ErrorCode::InternalError,
        }
    }

    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            // 400 Bad Request
            AppError::Validation { .. }
            | AppError::MissingField { .. }
            | AppError::InvalidFormat { .. } => StatusCode::BAD_REQUEST,

            // 404 Not Found
            AppError::SessionNotFound { .. }
            | AppError::DocumentNotFound { .. }
            | AppError::AnalysisNotFound { .. } => StatusCode::NOT_FOUND,

            // 409 Conflict
            AppError::Conflict { .. } | AppError::LimitExceeded { .. } => StatusCode::CONFLICT,

            // 413 Payload Too Large
            AppError::PayloadTooLarge { .. } | AppError::BodyTooLarge { .. } => {
                StatusCode::PAYLOAD_TOO_LARGE
            }

            // 415 Unsupported Media Type
            AppError::UnsupportedFormat { .. } => StatusCode::UNSUPPORTED_MEDIA_TYPE,

            // 422 Unprocessable Entity
            AppError::CorruptDocument { .. }
            | AppError::InvalidEncoding { .. }
            | AppError::NoExtractableText { .. } => StatusCode::UNPROCESSABLE_ENTITY,

            // 408 Request Timeout
            AppError::RequestTimeout { .. } => StatusCode::REQUEST_TIMEOUT,

            // 429 Too Many Requests
            AppError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,

            // 500 Internal Server Error
            AppError::Internal { .. }
            | AppError::Configuration { .. }
            | AppError::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,

            // 502 Bad Gateway
            AppError::AnalysisFailed { .. } => StatusCode::BAD_GATEWAY,
        }
    }

    /// Check if this error should be logged at error level
    pub fn is_server_error(&self) -> bool {
        self.status_code().is_server_error()
    }

    /// Check if this error is a client error
    pub fn is_client_error(&self) -> bool {
        self.status_code().is_client_error()
    }
}

/// Structured error response for API
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorDetails,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorDetails {
    pub code: ErrorCode,
    pub numeric_code: u16,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let code = self.code();
        let message = self.to_string();

        if self.is_server_error() {
            tracing::error!(
                error = %message,
                code = ?code,
                status = status.as_u16(),
                "Server error"
            );
        } else if self.is_client_error() {
            tracing::warn!(
                error = %message,
                code = ?code,
                status = status.as_u16(),
                "Client error"
            );
        }

        let field = match &self {
            AppError::Validation { field, .. } => field.clone(),
            AppError::MissingField { field } => Some(field.clone()),
            _ => None,
        };

        let body = ErrorResponse {
            error: ErrorDetails {
                code,
                numeric_code: code.as_code(),
                message,
                field,
            },
        };

        (status, Json(body)).into_response()
    }
}

/// Every completion failure collapses into one analysis failure for callers.
impl From<LlmError> for AppError {
    fn from(err: LlmError) -> Self {
        AppError::AnalysisFailed {
            message: err.to_string(),
        }
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Internal {
            message: err.to_string(),
        }
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::Configuration {
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_mapping() {
        let err = AppError::DocumentNotFound { id: "test".into() };
        assert_eq!(err.code(), ErrorCode::DocumentNotFound);
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_validation_error() {
        let err = AppError::Validation {
            message: "question must not be empty".into(),
            field: Some("question".into()),
        };
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert!(!err.is_server_error());
        assert!(err.is_client_error());
    }

    #[test]
    fn test_document_errors_are_client_errors() {
        let unsupported = AppError::UnsupportedFormat {
            declared: "image/png".into(),
        };
        assert_eq!(unsupported.status_code(), StatusCode::UNSUPPORTED_MEDIA_TYPE);

        let empty = AppError::NoExtractableText {
            filename: "scan.pdf".into(),
        };
        assert_eq!(empty.status_code(), StatusCode::UNPROCESSABLE_ENTITY);
        assert!(empty.is_client_error());
    }

    #[test]
    fn test_completion_failures_collapse_to_analysis_failed() {
        let err: AppError = LlmError::RateLimited {
            message: "quota exhausted".into(),
        }
        .into();
        assert_eq!(err.code(), ErrorCode::AnalysisFailed);
        assert_eq!(err.status_code(), StatusCode::BAD_GATEWAY);
        assert!(err.to_string().contains("quota exhausted"));

        let err: AppError = LlmError::Timeout { timeout_secs: 30 }.into();
        assert_eq!(err.code(), ErrorCode::AnalysisFailed);
    }

    #[test]
    fn test_request_timeout_is_408() {
        let err = AppError::RequestTimeout { timeout_secs: 300 };
        assert_eq!(err.code(), ErrorCode::RequestTimeout);
        assert_eq!(err.status_code(), StatusCode::REQUEST_TIMEOUT);
        assert!(err.is_client_error());
    }

    #[test]
    fn test_numeric_codes_are_grouped() {
        assert_eq!(ErrorCode::SessionNotFound.as_code() / 1000, 4);
        assert_eq!(ErrorCode::AnalysisFailed.as_code() / 1000, 8);
    }
}
