use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

pub type GenAiResult<T> = std::result::Result<T, GenAiError>;

/// Failures of GenAI operations, with the HTTP status returned to API consumers.
#[derive(Debug, Error)]
pub enum GenAiError {
    /// Rejected before reaching the provider.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// The provider did not answer within the configured timeout.
    #[error("Request timed out: {0}")]
    Timeout(String),

    /// The provider could not be reached.
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Rate limit exceeded: {0}")]
    RateLimited(String),

    /// The provider rejected the request parameters.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// The provider failed with a 5xx status.
    #[error("Provider error ({status}): {message}")]
    ProviderInternal { status: u16, message: String },

    /// Any other non-success status from the provider.
    #[error("Provider API error ({status}): {message}")]
    ApiStatus { status: u16, message: String },

    /// The provider answered with a body we could not understand.
    #[error("Invalid provider response: {0}")]
    InvalidResponse(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl GenAiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequest(_) | Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Authentication(_) => StatusCode::UNAUTHORIZED,
            Self::PermissionDenied(_) => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::RateLimited(_) => StatusCode::TOO_MANY_REQUESTS,
            Self::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            Self::Connection(_)
            | Self::ProviderInternal { .. }
            | Self::ApiStatus { .. }
            | Self::InvalidResponse(_) => StatusCode::BAD_GATEWAY,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Exception class name recorded as `error_type` on failed operations.
    pub fn error_type(&self) -> &'static str {
        match self {
            Self::InvalidRequest(_) => "ValidationError",
            Self::Timeout(_) => "TimeoutError",
            Self::Connection(_) => "APIConnectionError",
            Self::Authentication(_) => "AuthenticationError",
            Self::PermissionDenied(_) => "PermissionDeniedError",
            Self::NotFound(_) => "NotFoundError",
            Self::RateLimited(_) => "RateLimitError",
            Self::BadRequest(_) => "BadRequestError",
            Self::ProviderInternal { .. } => "InternalServerError",
            Self::ApiStatus { .. } => "APIStatusError",
            Self::InvalidResponse(_) => "InvalidResponseError",
            Self::Internal(_) => "InternalError",
        }
    }

    /// Map a non-success provider status onto an error.
    pub(crate) fn from_status(status: u16, message: String) -> Self {
        match status {
            400 | 422 => Self::BadRequest(message),
            401 => Self::Authentication(message),
            403 => Self::PermissionDenied(message),
            404 => Self::NotFound(message),
            408 => Self::Timeout(message),
            429 => Self::RateLimited(message),
            500..=599 => Self::ProviderInternal { status, message },
            _ => Self::ApiStatus { status, message },
        }
    }
}

impl From<reqwest::Error> for GenAiError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            Self::Timeout(error.to_string())
        } else if error.is_connect() || error.is_request() {
            Self::Connection(error.to_string())
        } else if error.is_decode() || error.is_body() {
            Self::InvalidResponse(error.to_string())
        } else {
            Self::Connection(error.to_string())
        }
    }
}

impl crate::instrument::Error for GenAiError {
    fn error_type(&self) -> &str {
        GenAiError::error_type(self)
    }
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: ErrorDetails,
}

#[derive(Debug, Serialize)]
struct ErrorDetails {
    message: String,
    r#type: &'static str,
    code: u16,
}

impl IntoResponse for GenAiError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        let body = ErrorResponse {
            error: ErrorDetails {
                message: self.to_string(),
                r#type: self.error_type(),
                code: status.as_u16(),
            },
        };

        (status, Json(body)).into_response()
    }
}
