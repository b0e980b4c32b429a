//! API client error types.

use thiserror::Error;

pub type ApiResult<T> = Result<T, ApiError>;

/// Errors that can occur when talking to the generation backend.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Server returned {status}: {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("API error: {0}")]
    Api(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] aivid_models::MediaUrlError),
}

impl ApiError {
    /// Whether the failure is a transient server-side condition.
    ///
    /// Only HTTP 5xx responses qualify; the polling loop keeps ticking
    /// through these and surfaces everything else to the caller.
    pub fn is_transient(&self) -> bool {
        matches!(self, ApiError::Status { status, .. } if status.is_server_error())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode;

    #[test]
    fn test_server_errors_are_transient() {
        let err = ApiError::Status {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            body: String::new(),
        };
        assert!(err.is_transient());

        let err = ApiError::Status {
            status: StatusCode::BAD_GATEWAY,
            body: String::new(),
        };
        assert!(err.is_transient());
    }

    #[test]
    fn test_client_errors_are_not_transient() {
        let err = ApiError::Status {
            status: StatusCode::NOT_FOUND,
            body: String::new(),
        };
        assert!(!err.is_transient());

        let err = ApiError::Api("bad template".into());
        assert!(!err.is_transient());
    }
}
