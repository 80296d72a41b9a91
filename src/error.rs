//! Error types for the SingleStore provider.

use reqwest::StatusCode;
use thiserror::Error;

use crate::schema::Diagnostic;

/// Errors that can occur while serving provider operations.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The requested object was not found in the Management API.
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// A validation error that is not tied to a single attribute.
    #[error("Validation error: {0}")]
    Validation(String),

    /// A validation error scoped to one attribute path.
    #[error("Invalid attribute '{attribute}': {message}")]
    InvalidAttribute {
        /// The attribute path, e.g. `member_users` or `team_ids.1`.
        attribute: String,
        /// What was wrong with the value.
        message: String,
    },

    /// An internal provider error occurred.
    #[error("Provider error: {0}")]
    Internal(String),

    /// The provider is misconfigured or not configured yet.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The requested resource or data source type is unknown.
    #[error("Unknown resource type: {0}")]
    UnknownResource(String),

    /// A serialization/deserialization error occurred.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A gRPC transport error occurred.
    #[error("Transport error: {0}")]
    Transport(#[from] tonic::transport::Error),

    /// The HTTP request to the Management API failed before a response arrived.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The object already exists (create conflict).
    #[error("Resource already exists: {0}")]
    AlreadyExists(String),

    /// Authentication or authorization failed.
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// Quota or rate limit exceeded.
    #[error("Resource exhausted: {0}")]
    ResourceExhausted(String),

    /// The Management API is temporarily unavailable.
    #[error("Service unavailable: {0}")]
    Unavailable(String),

    /// A wait for a remote state transition timed out.
    #[error("Deadline exceeded: {0}")]
    DeadlineExceeded(String),

    /// The remote object is in a state that does not allow the operation.
    #[error("Failed precondition: {0}")]
    FailedPrecondition(String),

    /// Operation not supported for this resource type.
    #[error("Unimplemented: {0}")]
    Unimplemented(String),

    /// The Management API rejected the request as malformed.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl ProviderError {
    /// Build a field-scoped validation error.
    pub fn invalid_attribute(attribute: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidAttribute {
            attribute: attribute.into(),
            message: message.into(),
        }
    }

    /// Map a non-success Management API response onto an error variant.
    ///
    /// `body` is the raw response body; it is included verbatim in the message
    /// because the API returns plain-text explanations.
    pub fn from_status(status: StatusCode, body: &str) -> Self {
        let body = body.trim();
        let msg = if body.is_empty() {
            format!("HTTP {}", status.as_u16())
        } else {
            format!("HTTP {}: {}", status.as_u16(), body)
        };

        match status {
            StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => Self::InvalidRequest(msg),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Self::PermissionDenied(msg),
            StatusCode::NOT_FOUND => Self::NotFound(msg),
            StatusCode::CONFLICT => Self::AlreadyExists(msg),
            StatusCode::TOO_MANY_REQUESTS => Self::ResourceExhausted(msg),
            StatusCode::PRECONDITION_FAILED => Self::FailedPrecondition(msg),
            StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT => {
                Self::DeadlineExceeded(msg)
            },
            s if s.is_server_error() => Self::Unavailable(msg),
            _ => Self::Internal(msg),
        }
    }

    /// Whether this error means the remote object no longer exists.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// Get the error message as a string.
    pub fn message(&self) -> &str {
        match self {
            Self::NotFound(msg) => msg,
            Self::Validation(msg) => msg,
            Self::InvalidAttribute { message, .. } => message,
            Self::Internal(msg) => msg,
            Self::Configuration(msg) => msg,
            Self::UnknownResource(msg) => msg,
            Self::Serialization(_err) => "serialization error (see Debug output)",
            Self::Transport(_err) => "transport error (see Debug output)",
            Self::Http(_err) => "http error (see Debug output)",
            Self::AlreadyExists(msg) => msg,
            Self::PermissionDenied(msg) => msg,
            Self::ResourceExhausted(msg) => msg,
            Self::Unavailable(msg) => msg,
            Self::DeadlineExceeded(msg) => msg,
            Self::FailedPrecondition(msg) => msg,
            Self::Unimplemented(msg) => msg,
            Self::InvalidRequest(msg) => msg,
        }
    }

    /// The attribute path this error is scoped to, if any.
    pub fn attribute(&self) -> Option<&str> {
        match self {
            Self::InvalidAttribute { attribute, .. } => Some(attribute),
            _ => None,
        }
    }

    /// Convert into an error diagnostic for the host.
    pub fn to_diagnostic(&self) -> Diagnostic {
        match self {
            Self::InvalidAttribute { attribute, message } => {
                Diagnostic::error(format!("Invalid value for '{}'", attribute))
                    .with_detail(message.clone())
                    .with_attribute(attribute.clone())
            },
            other => Diagnostic::error(other.to_string()),
        }
    }
}

impl From<ProviderError> for tonic::Status {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::NotFound(msg) => tonic::Status::not_found(msg),
            ProviderError::Validation(msg) => tonic::Status::invalid_argument(msg),
            ProviderError::InvalidAttribute { attribute, message } => {
                tonic::Status::invalid_argument(format!("{}: {}", attribute, message))
            },
            ProviderError::Configuration(msg) => tonic::Status::failed_precondition(msg),
            ProviderError::UnknownResource(msg) => tonic::Status::not_found(msg),
            ProviderError::Internal(msg) => tonic::Status::internal(msg),
            ProviderError::Serialization(err) => {
                tonic::Status::invalid_argument(format!("Serialization error: {}", err))
            },
            ProviderError::Transport(err) => {
                tonic::Status::unavailable(format!("Transport error: {}", err))
            },
            ProviderError::Http(err) => tonic::Status::unavailable(format!("HTTP error: {}", err)),
            ProviderError::AlreadyExists(msg) => tonic::Status::already_exists(msg),
            ProviderError::PermissionDenied(msg) => tonic::Status::permission_denied(msg),
            ProviderError::ResourceExhausted(msg) => tonic::Status::resource_exhausted(msg),
            ProviderError::Unavailable(msg) => tonic::Status::unavailable(msg),
            ProviderError::DeadlineExceeded(msg) => tonic::Status::deadline_exceeded(msg),
            ProviderError::FailedPrecondition(msg) => tonic::Status::failed_precondition(msg),
            ProviderError::Unimplemented(msg) => tonic::Status::unimplemented(msg),
            ProviderError::InvalidRequest(msg) => tonic::Status::invalid_argument(msg),
        }
    }
}
