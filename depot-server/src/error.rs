//! # Error Handling and Response Types
//!
//! Every failure of a repository request is resolved into an [`AppError`] at the
//! handler boundary and rendered by its [`IntoResponse`] implementation. Errors
//! are classified by [`ErrorCode`], which decides the HTTP status and how loudly
//! the failure is logged:
//!
//! - **Auth Errors** (401 Unauthorized): expected traffic, logged at debug level
//! - **Policy Errors** (403 Forbidden): deployment to a read-only repository
//! - **Payload Too Large** (400 Bad Request): the artifact exceeded its size limit
//! - **Validation Errors** (400 Bad Request): bad methods and malformed paths
//! - **Not Found** (404 Not Found): unknown repositories
//! - **Internal Errors** (500 Internal Server Error): filesystem failures
//!
//! Bodies are short plain-text messages so command-line artifact clients can
//! print them verbatim.

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};

use crate::paths::PathError;
use crate::upload::UploadError;

/// Error code classification for failed repository requests
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    AuthError,       // Missing or invalid credentials
    PolicyError,     // Deployment disabled for the repository
    PayloadTooLarge, // Artifact exceeded max_artifact_size
    ValidationError, // Unsupported method or malformed path
    NotFound,        // Unknown repository
    InternalError,   // Server-side failures
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::AuthError => "auth_error",
            ErrorCode::PolicyError => "policy_error",
            ErrorCode::PayloadTooLarge => "payload_too_large",
            ErrorCode::ValidationError => "validation_error",
            ErrorCode::NotFound => "not_found",
            ErrorCode::InternalError => "internal_error",
        }
    }

    pub fn http_status(&self) -> StatusCode {
        match self {
            ErrorCode::AuthError => StatusCode::UNAUTHORIZED,
            ErrorCode::PolicyError => StatusCode::FORBIDDEN,
            // Clients must shrink the artifact rather than retry, so this is
            // reported as a client error.
            ErrorCode::PayloadTooLarge => StatusCode::BAD_REQUEST,
            ErrorCode::ValidationError => StatusCode::BAD_REQUEST,
            ErrorCode::NotFound => StatusCode::NOT_FOUND,
            ErrorCode::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Failure of a single repository request
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Carries the full `WWW-Authenticate` challenge for the failed protection.
    #[error("unauthorized")]
    Unauthorized { challenge: String },

    #[error("this repository does not allow deployments")]
    DeployDisabled,

    #[error("artifact too large (limit is {limit} bytes)")]
    ArtifactTooLarge { limit: u64 },

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    NotFound(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Get the appropriate error code for this error type
    pub fn error_code(&self) -> ErrorCode {
        match self {
            AppError::Unauthorized { .. } => ErrorCode::AuthError,
            AppError::DeployDisabled => ErrorCode::PolicyError,
            AppError::ArtifactTooLarge { .. } => ErrorCode::PayloadTooLarge,
            AppError::BadRequest(_) => ErrorCode::ValidationError,
            AppError::NotFound(_) => ErrorCode::NotFound,
            AppError::Internal(_) => ErrorCode::InternalError,
        }
    }

    /// Message sent to the client. Internal details stay in the log.
    pub fn public_message(&self) -> String {
        match self {
            AppError::ArtifactTooLarge { .. } => "artifact too large".to_string(),
            AppError::Internal(_) => "internal error".to_string(),
            other => other.to_string(),
        }
    }
}

impl From<PathError> for AppError {
    fn from(err: PathError) -> Self {
        AppError::BadRequest(err.to_string())
    }
}

impl From<UploadError> for AppError {
    fn from(err: UploadError) -> Self {
        match err {
            UploadError::TooLarge { limit } => AppError::ArtifactTooLarge { limit },
            other => AppError::Internal(other.to_string()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let code = self.error_code();
        let status = code.http_status();

        match code {
            ErrorCode::InternalError => tracing::error!(error = %self, "Request failed"),
            ErrorCode::PolicyError | ErrorCode::PayloadTooLarge => {
                tracing::warn!(error = %self, code = code.as_str(), "Request rejected")
            }
            _ => tracing::debug!(error = %self, code = code.as_str(), "Request rejected"),
        }

        let mut response = (status, self.public_message()).into_response();
        if let AppError::Unauthorized { challenge } = &self {
            match HeaderValue::from_str(challenge) {
                Ok(value) => {
                    response
                        .headers_mut()
                        .insert(header::WWW_AUTHENTICATE, value);
                }
                Err(e) => tracing::warn!(error = %e, "Challenge is not a valid header value"),
            }
        }
        response
    }
}

/// Convenient result type for repository request handling.
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes_map_to_statuses() {
        let cases = [
            (
                AppError::Unauthorized {
                    challenge: "Basic realm=\"x\"".to_string(),
                },
                StatusCode::UNAUTHORIZED,
            ),
            (AppError::DeployDisabled, StatusCode::FORBIDDEN),
            (
                AppError::ArtifactTooLarge { limit: 1 },
                StatusCode::BAD_REQUEST,
            ),
            (
                AppError::BadRequest("bad request".to_string()),
                StatusCode::BAD_REQUEST,
            ),
            (
                AppError::NotFound("no such repository".to_string()),
                StatusCode::NOT_FOUND,
            ),
            (
                AppError::Internal("disk full".to_string()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (err, status) in cases {
            assert_eq!(err.error_code().http_status(), status, "{err:?}");
        }
    }

    #[test]
    fn test_internal_details_are_not_exposed() {
        let err = AppError::Internal("failed to write /srv/secret/path".to_string());
        assert_eq!(err.public_message(), "internal error");
    }

    #[test]
    fn test_unauthorized_sets_challenge_header() {
        let response = AppError::Unauthorized {
            challenge: "Basic realm=\"Repository libs is protected\"".to_string(),
        }
        .into_response();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            response.headers()[header::WWW_AUTHENTICATE],
            "Basic realm=\"Repository libs is protected\""
        );
    }

    #[test]
    fn test_too_large_is_distinct_from_io_failure() {
        let too_large: AppError = UploadError::TooLarge { limit: 10 }.into();
        assert_eq!(too_large.error_code(), ErrorCode::PayloadTooLarge);

        let io: AppError = UploadError::Io {
            path: "a.jar".into(),
            source: std::io::Error::other("disk full"),
        }
        .into();
        assert_eq!(io.error_code(), ErrorCode::InternalError);
    }
}
