//! Error types for the Graffiti gateway

use hyper::StatusCode;

/// Convenience result alias used throughout the crate
pub type Result<T> = std::result::Result<T, GraffitiError>;

/// Main error type for gateway operations
///
/// The first four variants carry messages that are shown to the caller
/// verbatim. `Store` and `Internal` details are logged but surfaced as an
/// opaque "internal error".
#[derive(Debug, thiserror::Error)]
pub enum GraffitiError {
    #[error("{0}")]
    InvalidInput(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    AccessDenied(String),

    #[error("{0}")]
    Conflict(String),

    #[error("not found")]
    NotFound,

    #[error("Store error: {0}")]
    Store(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl GraffitiError {
    /// Convert error to HTTP status code
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidInput(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::AccessDenied(_) => StatusCode::FORBIDDEN,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message safe to return to the caller
    ///
    /// Collaborator failures (store, serialization) stay opaque on the wire;
    /// the detail is available through `Display` for logging.
    pub fn client_message(&self) -> String {
        match self {
            Self::Store(_) | Self::Internal(_) => "internal error".to_string(),
            other => other.to_string(),
        }
    }
}

impl From<std::io::Error> for GraffitiError {
    fn from(err: std::io::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_match_taxonomy() {
        assert_eq!(
            GraffitiError::InvalidInput("x".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            GraffitiError::Unauthorized("x".into()).status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            GraffitiError::AccessDenied("x".into()).status_code(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            GraffitiError::Conflict("x".into()).status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(GraffitiError::NotFound.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(
            GraffitiError::Store("x".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn store_detail_is_not_leaked_to_clients() {
        let err = GraffitiError::Store("connection refused at 10.0.0.5".into());
        assert_eq!(err.client_message(), "internal error");
        assert!(err.to_string().contains("connection refused"));
    }
}
