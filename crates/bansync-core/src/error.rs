use thiserror::Error;

/// Result type alias for ban-sync operations
pub type Result<T> = std::result::Result<T, SyncError>;

/// Errors raised by remote collaborators (peer nodes, user lookups, sinks)
#[derive(Error, Debug)]
pub enum SyncError {
    /// Missing permission on the remote node or sink
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    /// Rate limit exceeded
    #[error("rate limit exceeded, retry after {retry_after:?} seconds")]
    RateLimited {
        /// Seconds to wait before retrying
        retry_after: Option<u64>,
    },

    /// Resource not found
    #[error("resource not found: {resource}")]
    NotFound {
        /// Description of the resource that wasn't found
        resource: String,
    },

    /// Remote API returned an error response
    #[error("API error ({code}): {message}")]
    Api {
        /// HTTP status code
        code: u16,
        /// Error message from the API
        message: String,
    },

    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    Http(String),

    /// Request timed out
    #[error("request timed out after {0} seconds")]
    Timeout(u64),

    /// Connection failed
    #[error("connection failed: {0}")]
    Connection(String),

    /// JSON parsing/serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Invalid sink URL
    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// A user could not be resolved to a display name
    #[error("user lookup failed for {user}: {reason}")]
    UserLookup {
        /// Raw user id
        user: u64,
        /// Underlying failure
        reason: String,
    },
}

impl SyncError {
    /// Returns true if the error is retryable
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::RateLimited { .. } | Self::Timeout(_) | Self::Connection(_)
        )
    }

    /// Returns true if the error is a permission problem
    #[must_use]
    pub const fn is_permission_error(&self) -> bool {
        matches!(self, Self::PermissionDenied(_))
    }

    /// Returns the HTTP status code if this error maps to one
    #[must_use]
    pub const fn status_code(&self) -> Option<u16> {
        match self {
            Self::PermissionDenied(_) => Some(403),
            Self::RateLimited { .. } => Some(429),
            Self::NotFound { .. } => Some(404),
            Self::Api { code, .. } => Some(*code),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classification() {
        assert!(SyncError::RateLimited { retry_after: Some(2) }.is_retryable());
        assert!(SyncError::Timeout(30).is_retryable());
        assert!(SyncError::Connection("reset".into()).is_retryable());
        assert!(!SyncError::PermissionDenied("missing BAN_MEMBERS".into()).is_retryable());
        assert!(!SyncError::NotFound { resource: "guild".into() }.is_retryable());
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(SyncError::PermissionDenied(String::new()).status_code(), Some(403));
        assert_eq!(SyncError::RateLimited { retry_after: None }.status_code(), Some(429));
        assert_eq!(
            SyncError::Api { code: 500, message: "boom".into() }.status_code(),
            Some(500)
        );
        assert_eq!(SyncError::Config("x".into()).status_code(), None);
    }
}
