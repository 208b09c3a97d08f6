// src/error.rs
//! Application error types with structured error handling.
//!
//! Error types form the vocabulary for failure modes in the system.
//! Each variant tells what went wrong and where, which lets callers pick
//! a recovery: retry a flaky network, degrade a bad model answer, or stop.

use crate::constants::ERROR_BODY_PREVIEW_LENGTH;
use std::fmt;
use thiserror::Error;

/// Notion API error codes as a typed vocabulary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotionErrorCode {
    /// API rate limit exceeded
    RateLimited,
    /// The requested object does not exist or is not shared with the integration
    ObjectNotFound,
    /// Token is invalid or expired
    Unauthorized,
    /// Token lacks permission for this resource
    RestrictedResource,
    /// Request body contains invalid JSON
    InvalidJson,
    /// Request parameters failed Notion's validation (e.g. unknown property)
    ValidationFailed,
    /// Conflict with current state of the resource
    Conflict,
    /// Notion internal server error
    InternalError,
    /// Notion is temporarily unavailable
    ServiceUnavailable,
    /// An error code this client doesn't recognize yet
    Unknown(String),
}

impl NotionErrorCode {
    /// Parse a Notion API error code string into the typed vocabulary.
    pub fn from_api_response(code: &str) -> Self {
        match code {
            "rate_limited" => Self::RateLimited,
            "object_not_found" => Self::ObjectNotFound,
            "unauthorized" => Self::Unauthorized,
            "restricted_resource" => Self::RestrictedResource,
            "invalid_json" => Self::InvalidJson,
            "validation_error" => Self::ValidationFailed,
            "conflict_error" => Self::Conflict,
            "internal_server_error" => Self::InternalError,
            "service_unavailable" => Self::ServiceUnavailable,
            other => Self::Unknown(other.to_string()),
        }
    }

    /// Whether the failure points at the integration's credentials or sharing.
    pub fn is_access_problem(&self) -> bool {
        matches!(
            self,
            Self::Unauthorized | Self::RestrictedResource | Self::ObjectNotFound
        )
    }
}

impl fmt::Display for NotionErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RateLimited => write!(f, "rate_limited"),
            Self::ObjectNotFound => write!(f, "object_not_found"),
            Self::Unauthorized => write!(f, "unauthorized"),
            Self::RestrictedResource => write!(f, "restricted_resource"),
            Self::InvalidJson => write!(f, "invalid_json"),
            Self::ValidationFailed => write!(f, "validation_error"),
            Self::Conflict => write!(f, "conflict_error"),
            Self::InternalError => write!(f, "internal_server_error"),
            Self::ServiceUnavailable => write!(f, "service_unavailable"),
            Self::Unknown(code) => write!(f, "{}", code),
        }
    }
}

/// Main application error type.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Missing configuration: {0}")]
    MissingConfiguration(String),

    #[error("Network failure: {0}")]
    NetworkFailure(#[from] reqwest::Error),

    #[error("HTTP {status} from {url}: {}", preview(body))]
    HttpStatus {
        status: reqwest::StatusCode,
        url: String,
        body: String,
    },

    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error("{backend} returned no completion: {}", preview(body))]
    EmptyCompletion { backend: String, body: String },

    #[error("Model output is not valid JSON: {}", preview(content))]
    UnparseableOutput { content: String },

    #[error("Model output has an unexpected shape: expected an object, got {found}")]
    UnexpectedShape { found: String },

    #[error("Page {0} could not be retrieved")]
    PageNotFound(String),

    #[error("Filesystem IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    ValidationError(#[from] crate::types::ValidationError),
}

impl AppError {
    /// Whether the failure is a transient network problem worth retrying.
    ///
    /// Status errors are answers from the server and are never transient here.
    pub fn is_transient(&self) -> bool {
        match self {
            AppError::NetworkFailure(e) => !e.is_builder(),
            _ => false,
        }
    }

    /// Whether the failure came from reading the model's answer rather than
    /// from transport or configuration.
    pub fn is_model_data_error(&self) -> bool {
        matches!(
            self,
            AppError::EmptyCompletion { .. }
                | AppError::UnparseableOutput { .. }
                | AppError::UnexpectedShape { .. }
        )
    }

    /// HTTP status of a rejected request, if that is what this error is.
    pub fn status(&self) -> Option<reqwest::StatusCode> {
        match self {
            AppError::HttpStatus { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::MalformedResponse(err.to_string())
    }
}

/// Truncates a body for display, respecting char boundaries.
pub(crate) fn preview(body: &str) -> String {
    if body.chars().count() <= ERROR_BODY_PREVIEW_LENGTH {
        return body.to_string();
    }
    let cut: String = body.chars().take(ERROR_BODY_PREVIEW_LENGTH).collect();
    format!("{}...", cut)
}
