//! Error types for ScholarGraph services
//!
//! Provides:
//! - Distinct error types for ingestion-fatal and query-degradable failures
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

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;

/// Error codes for machine-readable error identification
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Validation errors (1xxx)
    SchemaValidation,
    InvalidRequest,
    PayloadTooLarge,

    // Resource / lifecycle errors (2xxx)
    NotReady,
    EntityExtraction,

    // External capability errors (3xxx)
    EmbeddingError,
    VectorIndexError,
    GraphUnavailable,
    GraphQueryError,
    GenerationError,
    GenerationTimeout,

    // Internal errors (9xxx)
    InternalError,
    ConfigurationError,
    SerializationError,
}

impl ErrorCode {
    /// Get the numeric code for this error
    pub fn as_code(&self) -> u16 {
        match self {
            ErrorCode::SchemaValidation => 1001,
            ErrorCode::InvalidRequest => 1002,
            ErrorCode::PayloadTooLarge => 1003,

            ErrorCode::NotReady => 2001,
            ErrorCode::EntityExtraction => 2002,

            ErrorCode::EmbeddingError => 3001,
            ErrorCode::VectorIndexError => 3002,
            ErrorCode::GraphUnavailable => 3003,
            ErrorCode::GraphQueryError => 3004,
            ErrorCode::GenerationError => 3005,
            ErrorCode::GenerationTimeout => 3006,

            ErrorCode::InternalError => 9001,
            ErrorCode::ConfigurationError => 9002,
            ErrorCode::SerializationError => 9003,
        }
    }
}

/// Application error types
///
/// Ingestion errors are batch-fatal and surfaced whole; query-time errors
/// are request-scoped and degrade to a narrower but valid result before
/// they reach the serving boundary.
#[derive(Error, Debug)]
pub enum AppError {
    /// Required columns missing from an uploaded batch. Fatal to the batch;
    /// no indexing work is performed.
    #[error("Schema validation failed: missing required columns: {}", missing.join(", "))]
    SchemaValidation { missing: Vec<String> },

    #[error("Invalid request: {message}")]
    InvalidRequest { message: String },

    #[error("Payload too large: {size} bytes exceeds limit of {limit} bytes")]
    PayloadTooLarge { size: usize, limit: usize },

    /// No dataset has been uploaded yet.
    #[error("No dataset loaded: upload a bibliographic export first")]
    NotReady,

    /// Entity extraction found nothing usable for a query template. Not
    /// fatal; the caller skips the template and falls through.
    #[error("Could not extract a {kind} from the query")]
    EntityExtraction { kind: String },

    #[error("Embedding service error: {message}")]
    Embedding { message: String },

    #[error("Vector index error: {message}")]
    VectorIndex { message: String },

    /// Graph connection failed. The session degrades to vector-only mode;
    /// the error is not retried per-query.
    #[error("Graph store unavailable: {message}")]
    GraphUnavailable { message: String },

    #[error("Graph query failed: {message}")]
    GraphQuery { message: String },

    #[error("Generation failed: {message}")]
    Generation { message: String },

    #[error("Generation timed out after {timeout_ms}ms")]
    GenerationTimeout { timeout_ms: u64 },

    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    #[error("Internal error: {message}")]
    Internal { message: String },

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // Generic
    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl AppError {
    /// Get the error code for this error
    pub fn code(&self) -> ErrorCode {
        match self {
            AppError::SchemaValidation { .. } => ErrorCode::SchemaValidation,
            AppError::InvalidRequest { .. } => ErrorCode::InvalidRequest,
            AppError::PayloadTooLarge { .. } => ErrorCode::PayloadTooLarge,
            AppError::NotReady => ErrorCode::NotReady,
            AppError::EntityExtraction { .. } => ErrorCode::EntityExtraction,
            AppError::Embedding { .. } => ErrorCode::EmbeddingError,
            AppError::VectorIndex { .. } => ErrorCode::VectorIndexError,
            AppError::GraphUnavailable { .. } => ErrorCode::GraphUnavailable,
            AppError::GraphQuery { .. } => ErrorCode::GraphQueryError,
            AppError::Generation { .. } => ErrorCode::GenerationError,
            AppError::GenerationTimeout { .. } => ErrorCode::GenerationTimeout,
            AppError::HttpClient(_) => ErrorCode::InternalError,
            AppError::Internal { .. } => ErrorCode::InternalError,
            AppError::Configuration { .. } => ErrorCode::ConfigurationError,
            AppError::Serialization(_) => ErrorCode::SerializationError,
            AppError::Other(_) => ErrorCode::InternalError,
        }
    }

    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            // 400 Bad Request
            AppError::InvalidRequest { .. } => StatusCode::BAD_REQUEST,

            // 409 Conflict: nothing to search yet
            AppError::NotReady => StatusCode::CONFLICT,

            // 413 Payload Too Large
            AppError::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,

            // 422 Unprocessable: the batch itself is malformed
            AppError::SchemaValidation { .. } | AppError::EntityExtraction { .. } => {
                StatusCode::UNPROCESSABLE_ENTITY
            }

            // 502 Bad Gateway: an upstream capability failed
            AppError::Embedding { .. }
            | AppError::Generation { .. }
            | AppError::GenerationTimeout { .. }
            | AppError::HttpClient(_) => StatusCode::BAD_GATEWAY,

            // 503 Service Unavailable
            AppError::GraphUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,

            // 500 Internal Server Error
            AppError::VectorIndex { .. }
            | AppError::GraphQuery { .. }
            | AppError::Internal { .. }
            | AppError::Configuration { .. }
            | AppError::Serialization(_)
            | AppError::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,
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
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub missing_columns: Option<Vec<String>>,
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

        let missing_columns = match &self {
            AppError::SchemaValidation { missing } => Some(missing.clone()),
            _ => None,
        };

        let body = ErrorResponse {
            error: ErrorDetails {
                code,
                message,
                missing_columns,
            },
        };

        (status, Json(body)).into_response()
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Internal {
            message: err.to_string(),
        }
    }
}
