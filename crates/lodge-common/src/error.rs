//! Common error types for Lodge components.

use thiserror::Error;

/// Common errors across Lodge components
///
/// Validation outcomes (mismatch, expiry, unknown subject) are not errors;
/// see [`crate::ValidationOutcome`].
#[derive(Debug, Error)]
pub enum LodgeError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Verification store could not be accessed
    #[error("Verification store unavailable: {0}")]
    StoreUnavailable(String),

    /// Code delivery channel failed
    #[error("Delivery error: {0}")]
    Delivery(String),

    /// Submission blocked by an active lockout
    #[error("Locked out for another {remaining_secs}s")]
    LockedOut { remaining_secs: u64 },

    /// Invalid input/request
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl LodgeError {
    /// Returns the HTTP status code for this error
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Config(_) => 500,
            Self::StoreUnavailable(_) => 503,
            Self::Delivery(_) => 502,
            Self::LockedOut { .. } => 429,
            Self::InvalidInput(_) => 400,
            Self::Internal(_) => 500,
        }
    }

    /// Returns true if this error should be retried
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::StoreUnavailable(_) | Self::Delivery(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_failure_is_distinct_server_error() {
        let err = LodgeError::StoreUnavailable("shard 3 poisoned".to_string());
        assert_eq!(err.status_code(), 503);
        assert!(err.is_retryable());
        assert!(err.to_string().contains("shard 3 poisoned"));
    }

    #[test]
    fn test_client_errors_are_not_retryable() {
        assert!(!LodgeError::InvalidInput("empty email".into()).is_retryable());
        assert!(!LodgeError::LockedOut { remaining_secs: 12 }.is_retryable());
        assert_eq!(LodgeError::LockedOut { remaining_secs: 12 }.status_code(), 429);
    }
}
