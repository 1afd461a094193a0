//! Backend error types.

use thiserror::Error;

/// Errors that can occur in backend operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BackendError {
    /// Failed to initialize the backend.
    #[error("backend initialization failed: {0}")]
    InitializationFailed(String),
    /// Failed to create a resource.
    #[error("resource creation failed: {0}")]
    ResourceCreationFailed(String),
    /// The requested feature is not supported.
    #[error("feature not supported: {0}")]
    FeatureNotSupported(String),
    /// Out of GPU memory.
    #[error("out of GPU memory")]
    OutOfMemory,
    /// The device was lost.
    #[error("GPU device lost")]
    DeviceLost,
    /// A handle passed to the backend does not refer to a live object.
    #[error("invalid handle: {0}")]
    InvalidHandle(String),
    /// Internal backend error.
    #[error("internal backend error: {0}")]
    Internal(String),
}

/// Result alias for backend operations.
pub type BackendResult<T> = Result<T, BackendError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        assert_eq!(BackendError::OutOfMemory.to_string(), "out of GPU memory");
        assert_eq!(
            BackendError::InvalidHandle("image".to_string()).to_string(),
            "invalid handle: image"
        );
    }
}
